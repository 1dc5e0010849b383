//! Editor configuration.

use crate::document::{DEFAULT_CANVAS_HEIGHT, DEFAULT_CANVAS_WIDTH};
use crate::style::DEFAULT_BACKGROUND_COLOR;
use kurbo::Size;
use serde::{Deserialize, Serialize};

/// Settings for an editing session. Missing fields take their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EditorConfig {
    /// Canvas size documents are loaded onto.
    pub canvas_width: f64,
    pub canvas_height: f64,
    /// Background color of new scenes.
    pub background_color: String,
    /// Maximum undo entries kept. `None` keeps every entry.
    pub history_limit: Option<usize>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            canvas_width: DEFAULT_CANVAS_WIDTH,
            canvas_height: DEFAULT_CANVAS_HEIGHT,
            background_color: DEFAULT_BACKGROUND_COLOR.to_string(),
            history_limit: None,
        }
    }
}

impl EditorConfig {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn canvas_size(&self) -> Size {
        Size::new(self.canvas_width, self.canvas_height)
    }
}
