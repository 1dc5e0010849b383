//! Project records as kept by the persistence gateway.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Length of a project code.
pub const PROJECT_CODE_LEN: usize = 8;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";

/// Bytes at or above this are dropped so every character is equally likely.
const UNBIASED_LIMIT: u8 = (256 / CODE_ALPHABET.len() * CODE_ALPHABET.len()) as u8;

/// Generate a random project code of uppercase letters and digits.
pub fn generate_project_code() -> String {
    let mut code = String::with_capacity(PROJECT_CODE_LEN);
    while code.len() < PROJECT_CODE_LEN {
        push_code_chars(&mut code, random_bytes(&Uuid::new_v4()));
    }
    code
}

/// Bytes of a v4 uuid, minus the two that carry version and variant bits.
fn random_bytes(uuid: &Uuid) -> impl Iterator<Item = u8> + '_ {
    uuid.as_bytes()
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != 6 && *i != 8)
        .map(|(_, byte)| *byte)
}

fn push_code_chars(code: &mut String, bytes: impl Iterator<Item = u8>) {
    for byte in bytes.filter(|&byte| byte < UNBIASED_LIMIT) {
        if code.len() == PROJECT_CODE_LEN {
            break;
        }
        code.push(CODE_ALPHABET[usize::from(byte) % CODE_ALPHABET.len()] as char);
    }
}

/// Whether `code` looks like a project code.
pub fn is_valid_project_code(code: &str) -> bool {
    code.len() == PROJECT_CODE_LEN && code.bytes().all(|b| CODE_ALPHABET.contains(&b))
}

/// Milliseconds since the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Where a project is in the engraving workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectStatus {
    #[default]
    Draft,
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectStatus::Draft => "draft",
            ProjectStatus::Pending => "pending",
            ProjectStatus::InProgress => "in-progress",
            ProjectStatus::Completed => "completed",
            ProjectStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "draft" => Some(ProjectStatus::Draft),
            "pending" => Some(ProjectStatus::Pending),
            "in-progress" | "in_progress" => Some(ProjectStatus::InProgress),
            "completed" => Some(ProjectStatus::Completed),
            "cancelled" | "canceled" => Some(ProjectStatus::Cancelled),
            _ => None,
        }
    }
}

/// One stored project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    pub code: String,
    #[serde(default)]
    pub status: ProjectStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_notes: Option<String>,
    /// Stored design. Older records hold it as a JSON string.
    #[serde(default)]
    pub canvas_state: Option<Value>,
    /// Preview image as a `data:` URI.
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub created_at: u64,
    #[serde(default)]
    pub updated_at: u64,
}

impl ProjectRecord {
    /// A new draft project with no design.
    pub fn new(code: impl Into<String>) -> Self {
        let now = now_millis();
        Self {
            code: code.into(),
            status: ProjectStatus::Draft,
            status_notes: None,
            canvas_state: None,
            thumbnail: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_design(&self) -> bool {
        self.canvas_state.as_ref().is_some_and(|state| !state.is_null())
    }

    pub fn touch(&mut self) {
        self.updated_at = now_millis().max(self.updated_at);
    }

    pub fn summary(&self) -> ProjectSummary {
        ProjectSummary {
            code: self.code.clone(),
            status: self.status,
            updated_at: self.updated_at,
            has_design: self.has_design(),
        }
    }
}

/// What an admin project list shows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectSummary {
    pub code: String,
    pub status: ProjectStatus,
    pub updated_at: u64,
    pub has_design: bool,
}
