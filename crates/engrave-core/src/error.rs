//! Error types for loading, reconstruction and editing sessions.

use crate::storage::StorageError;
use thiserror::Error;

/// Fatal failure of a whole document load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LoadError {
    /// The document failed structural validation; nothing was reconstructed.
    #[error("Malformed document: {0}")]
    MalformedDocument(String),
}

/// Failure to rebuild a single object. Never aborts a load.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AssetError {
    #[error("Image has no source reference")]
    MissingSource,
    #[error("Asset unreachable: {0}")]
    Unreachable(String),
    #[error("Failed to decode asset: {0}")]
    Decode(String),
    #[error("Unparseable path data: {0}")]
    InvalidPath(String),
    #[error("Vector group has no reconstructible paths")]
    EmptyGroup,
    #[error("Unrecognized object kind: {0}")]
    UnknownKind(String),
    #[error("Invalid object record: {0}")]
    InvalidRecord(String),
    #[error("Unsupported asset source: {0}")]
    Unsupported(String),
}

/// An object that could not be reconstructed, with its position in the
/// source document.
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedObject {
    /// Index of the record in the document's `objects` sequence.
    pub index: usize,
    /// Kind as written in the record (may be empty if unreadable).
    pub kind: String,
    pub reason: AssetError,
}

/// Errors surfaced by an editing session.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error("Persistence failure: {0}")]
    Persistence(#[from] StorageError),
}
