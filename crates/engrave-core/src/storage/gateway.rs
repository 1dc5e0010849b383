//! Project-level persistence on top of a storage backend.

use crate::document::SceneDocument;
use crate::objects::ImageFormat;
use crate::project::{ProjectRecord, ProjectStatus, ProjectSummary, generate_project_code};
use crate::storage::{Storage, StorageError, StorageResult};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::Value;
use std::sync::Arc;

/// Attempts at finding an unused project code before giving up.
const MAX_CODE_ATTEMPTS: usize = 16;

/// Reads and writes designs by project code.
///
/// Every `put` replaces the stored design wholesale. There is no version
/// check, so concurrent writers to one project overwrite each other.
pub struct ProjectGateway<S: Storage> {
    storage: Arc<S>,
}

impl<S: Storage> Clone for ProjectGateway<S> {
    fn clone(&self) -> Self {
        Self {
            storage: Arc::clone(&self.storage),
        }
    }
}

impl<S: Storage> ProjectGateway<S> {
    pub fn new(storage: Arc<S>) -> Self {
        Self { storage }
    }

    /// Get a reference to the storage backend.
    pub fn storage(&self) -> &Arc<S> {
        &self.storage
    }

    /// Create an empty draft project under a fresh code.
    pub async fn create_project(&self) -> StorageResult<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_project_code();
            if self.storage.exists(&code).await? {
                continue;
            }
            self.storage.save(&code, &ProjectRecord::new(&code)).await?;
            log::info!("Created project {}", code);
            return Ok(code);
        }
        Err(StorageError::Other(
            "could not allocate an unused project code".to_string(),
        ))
    }

    /// The full stored record.
    pub async fn project(&self, code: &str) -> StorageResult<ProjectRecord> {
        self.storage.load(code).await
    }

    /// The stored design in its raw form, or `None` if the project has no
    /// design yet.
    pub async fn get(&self, code: &str) -> StorageResult<Option<Value>> {
        let record = self.storage.load(code).await?;
        match record.canvas_state {
            None | Some(Value::Null) => Ok(None),
            // Designs saved by older editors are JSON text.
            Some(Value::String(text)) => serde_json::from_str(&text).map(Some).map_err(|e| {
                StorageError::Serialization(format!("stored design for {} is not JSON: {}", code, e))
            }),
            Some(value) => Ok(Some(value)),
        }
    }

    /// Store a design, replacing whatever was there. Creates the project if
    /// it does not exist. A preview image, if given, replaces the thumbnail.
    pub async fn put(
        &self,
        code: &str,
        document: &SceneDocument,
        preview: Option<&[u8]>,
    ) -> StorageResult<()> {
        let mut record = match self.storage.load(code).await {
            Ok(record) => record,
            Err(StorageError::NotFound(_)) => ProjectRecord::new(code),
            Err(e) => return Err(e),
        };
        record.canvas_state = Some(document.to_value());
        if let Some(preview) = preview {
            record.thumbnail = Some(preview_uri(preview));
        }
        record.touch();
        self.storage.save(code, &record).await?;
        log::info!(
            "Saved design for {} ({} objects)",
            code,
            document.objects.len()
        );
        Ok(())
    }

    /// Update a project's workflow status.
    pub async fn set_status(
        &self,
        code: &str,
        status: ProjectStatus,
        notes: Option<String>,
    ) -> StorageResult<ProjectRecord> {
        let mut record = self.storage.load(code).await?;
        record.status = status;
        record.status_notes = notes;
        record.touch();
        self.storage.save(code, &record).await?;
        log::info!("Project {} is now {}", code, status.as_str());
        Ok(record)
    }

    /// Summaries of all projects, most recently updated first.
    pub async fn list(&self) -> StorageResult<Vec<ProjectSummary>> {
        let mut summaries = Vec::new();
        for code in self.storage.list().await? {
            match self.storage.load(&code).await {
                Ok(record) => summaries.push(record.summary()),
                Err(e) => log::warn!("Skipping unreadable project {}: {}", code, e),
            }
        }
        summaries.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.code.cmp(&b.code))
        });
        Ok(summaries)
    }

    pub async fn delete(&self, code: &str) -> StorageResult<()> {
        self.storage.delete(code).await
    }
}

/// Encode preview bytes as a `data:` URI.
fn preview_uri(bytes: &[u8]) -> String {
    let mime = ImageFormat::from_magic_bytes(bytes)
        .map(|format| format.mime_type())
        .unwrap_or("application/octet-stream");
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}
