//! Storage abstraction for project persistence.

mod file;
mod gateway;
mod memory;

pub use file::FileStorage;
pub use gateway::ProjectGateway;
pub use memory::MemoryStorage;

use crate::project::ProjectRecord;
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Project not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for project storage backends.
///
/// Implementations can keep records in memory or on the filesystem. A save
/// replaces the whole record; the last writer wins.
pub trait Storage: Send + Sync {
    /// Save a project record.
    fn save(&self, code: &str, record: &ProjectRecord) -> BoxFuture<'_, StorageResult<()>>;

    /// Load a project record.
    fn load(&self, code: &str) -> BoxFuture<'_, StorageResult<ProjectRecord>>;

    /// Delete a project record.
    fn delete(&self, code: &str) -> BoxFuture<'_, StorageResult<()>>;

    /// List all project codes.
    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>>;

    /// Check if a project exists.
    fn exists(&self, code: &str) -> BoxFuture<'_, StorageResult<bool>>;
}
