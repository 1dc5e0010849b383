//! File-based storage: one JSON file per project.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::project::ProjectRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Stores project records as JSON files in a directory.
pub struct FileStorage {
    /// Base directory for project files.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a file storage rooted at `base_path`, creating the directory
    /// if it doesn't exist.
    pub fn new(base_path: impl Into<PathBuf>) -> StorageResult<Self> {
        let base_path = base_path.into();
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Default directory for project files.
    ///
    /// On Linux: `~/.local/share/engrave/projects/`
    /// On Windows: `%LOCALAPPDATA%\engrave\projects\`
    pub fn default_path() -> StorageResult<PathBuf> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;
        Ok(base.join("engrave").join("projects"))
    }

    /// Create file storage in the default location.
    pub fn default_location() -> StorageResult<Self> {
        Self::new(Self::default_path()?)
    }

    /// File path for a project code. Codes are sanitized to be safe file names.
    fn record_path(&self, code: &str) -> PathBuf {
        let safe: String = code
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.base_path.join(format!("{}.json", safe))
    }

    pub fn base_path(&self) -> &Path {
        &self.base_path
    }
}

/// Write through a temporary file so readers never see a partial record.
fn write_atomically(path: &Path, contents: &str) -> StorageResult<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, contents)
        .map_err(|e| StorageError::Io(format!("Failed to write {}: {}", tmp.display(), e)))?;
    fs::rename(&tmp, path).map_err(|e| {
        StorageError::Io(format!("Failed to replace {}: {}", path.display(), e))
    })
}

impl Storage for FileStorage {
    fn save(&self, code: &str, record: &ProjectRecord) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.record_path(code);
        let json = serde_json::to_string_pretty(record);
        Box::pin(async move {
            let json = json.map_err(|e| StorageError::Serialization(e.to_string()))?;
            write_atomically(&path, &json)
        })
    }

    fn load(&self, code: &str) -> BoxFuture<'_, StorageResult<ProjectRecord>> {
        let path = self.record_path(code);
        let code = code.to_string();
        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(code));
            }
            let json = fs::read_to_string(&path).map_err(|e| {
                StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
            })?;
            serde_json::from_str(&json).map_err(|e| {
                StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
            })
        })
    }

    fn delete(&self, code: &str) -> BoxFuture<'_, StorageResult<()>> {
        let path = self.record_path(code);
        Box::pin(async move {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| {
                    StorageError::Io(format!("Failed to delete {}: {}", path.display(), e))
                })?;
            }
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        let base = self.base_path.clone();
        Box::pin(async move {
            if !base.exists() {
                return Ok(Vec::new());
            }
            let entries = fs::read_dir(&base)
                .map_err(|e| StorageError::Io(format!("Failed to read directory: {}", e)))?;
            let codes = entries
                .flatten()
                .map(|entry| entry.path())
                .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
                .filter_map(|path| {
                    path.file_stem()
                        .and_then(|stem| stem.to_str())
                        .map(str::to_string)
                })
                .collect();
            Ok(codes)
        })
    }

    fn exists(&self, code: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let path = self.record_path(code);
        Box::pin(async move { Ok(path.exists()) })
    }
}
