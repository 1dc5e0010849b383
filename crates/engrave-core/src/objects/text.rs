//! Text objects.

use crate::style::{DEFAULT_TEXT_FILL, TextAlign, parse_color};
use kurbo::Rect;
use peniko::Color;

/// A run of text placed on the canvas.
#[derive(Debug, Clone, PartialEq)]
pub struct TextObject {
    pub text: String,
    pub font_family: String,
    /// Font size in pixels (always positive).
    pub font_size: f64,
    /// CSS weight: `normal`, `bold` or a numeric weight.
    pub font_weight: String,
    /// CSS style: `normal`, `italic` or `oblique`.
    pub font_style: String,
    pub underline: bool,
    pub overline: bool,
    pub strikethrough: bool,
    pub text_align: TextAlign,
    pub fill_color: String,
    /// Outline color, if the text is stroked.
    pub stroke_color: Option<String>,
    pub stroke_width: f64,
}

impl TextObject {
    pub const DEFAULT_FONT_FAMILY: &'static str = "Arial";
    pub const DEFAULT_FONT_SIZE: f64 = 40.0;
    pub const DEFAULT_FONT_WEIGHT: &'static str = "normal";
    pub const DEFAULT_FONT_STYLE: &'static str = "normal";
    pub const DEFAULT_STROKE_WIDTH: f64 = 1.0;

    /// Line height as a multiple of the font size.
    const LINE_HEIGHT: f64 = 1.16;
    /// Average glyph advance as a multiple of the font size.
    const CHAR_WIDTH: f64 = 0.6;

    /// Create text with all style attributes at their defaults.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            font_family: Self::DEFAULT_FONT_FAMILY.to_string(),
            font_size: Self::DEFAULT_FONT_SIZE,
            font_weight: Self::DEFAULT_FONT_WEIGHT.to_string(),
            font_style: Self::DEFAULT_FONT_STYLE.to_string(),
            underline: false,
            overline: false,
            strikethrough: false,
            text_align: TextAlign::default(),
            fill_color: DEFAULT_TEXT_FILL.to_string(),
            stroke_color: None,
            stroke_width: Self::DEFAULT_STROKE_WIDTH,
        }
    }

    pub fn with_font(mut self, family: impl Into<String>, size: f64) -> Self {
        self.font_family = family.into();
        self.font_size = size;
        self
    }

    pub fn with_fill(mut self, color: impl Into<String>) -> Self {
        self.fill_color = color.into();
        self
    }

    /// Approximate untransformed extent. Exact metrics need a shaping
    /// engine, which lives with the renderer.
    pub fn content_rect(&self) -> Rect {
        let line_count = self.text.lines().count().max(1);
        let widest = self
            .text
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0);
        Rect::new(
            0.0,
            0.0,
            widest as f64 * self.font_size * Self::CHAR_WIDTH,
            line_count as f64 * self.font_size * Self::LINE_HEIGHT,
        )
    }

    /// Fill as a concrete color, if it is a recognised color string.
    pub fn fill(&self) -> Option<Color> {
        parse_color(&self.fill_color)
    }

    pub fn is_bold(&self) -> bool {
        match self.font_weight.as_str() {
            "bold" | "bolder" => true,
            weight => weight.parse::<u32>().map(|w| w >= 600).unwrap_or(false),
        }
    }
}

impl Default for TextObject {
    fn default() -> Self {
        Self::new(String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let text = TextObject::new("Hello");
        assert_eq!(text.font_family, "Arial");
        assert_eq!(text.font_size, 40.0);
        assert_eq!(text.text_align, TextAlign::Left);
        assert_eq!(text.fill_color, "#000000");
        assert!(text.stroke_color.is_none());
    }

    #[test]
    fn test_content_rect_grows_with_lines() {
        let single = TextObject::new("abcd").with_font("Arial", 10.0);
        let double = TextObject::new("abcd\nab").with_font("Arial", 10.0);
        assert!((single.content_rect().width() - 24.0).abs() < 1e-9);
        assert!((double.content_rect().width() - 24.0).abs() < 1e-9);
        assert!(double.content_rect().height() > single.content_rect().height());
    }

    #[test]
    fn test_empty_text_has_one_line() {
        let text = TextObject::default();
        assert_eq!(text.content_rect().width(), 0.0);
        assert!(text.content_rect().height() > 0.0);
    }

    #[test]
    fn test_bold_detection() {
        let mut text = TextObject::new("x");
        assert!(!text.is_bold());
        text.font_weight = "700".to_string();
        assert!(text.is_bold());
        text.font_weight = "bold".to_string();
        assert!(text.is_bold());
    }
}
