//! Engrave Core Library
//!
//! Scene model, document persistence and reconstruction, and undo history
//! for the engraving design editor.

mod canonical;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod history;
pub mod loader;
pub mod objects;
pub mod project;
pub mod scene;
pub mod serializer;
pub mod session;
pub mod storage;
pub mod style;

#[cfg(test)]
mod testing;

pub use config::EditorConfig;
pub use document::{ObjectRecord, RecordBody, SceneDocument};
pub use error::{AssetError, LoadError, SessionError, SkippedObject};
pub use geometry::{OriginX, OriginY, Transform};
pub use history::{History, HistoryEntry};
pub use loader::{AssetFetcher, LoadReport, LocalAssetFetcher, SceneLoader};
pub use objects::{ImageObject, ObjectId, ObjectKind, SceneObject, TextObject, VectorObject};
pub use project::{ProjectRecord, ProjectStatus, ProjectSummary};
pub use scene::Scene;
pub use serializer::{serialize, snapshot};
pub use session::{EditingSession, NullRenderer, RenderTarget, SceneEvent};
pub use storage::{FileStorage, MemoryStorage, ProjectGateway, Storage, StorageError};
