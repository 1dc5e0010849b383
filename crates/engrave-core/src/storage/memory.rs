//! In-memory storage implementation.

use super::{BoxFuture, Storage, StorageError, StorageResult};
use crate::project::ProjectRecord;
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory storage for tests and ephemeral servers.
#[derive(Default)]
pub struct MemoryStorage {
    records: RwLock<HashMap<String, ProjectRecord>>,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_error(e: impl std::fmt::Display) -> StorageError {
        StorageError::Other(format!("Lock error: {}", e))
    }
}

impl Storage for MemoryStorage {
    fn save(&self, code: &str, record: &ProjectRecord) -> BoxFuture<'_, StorageResult<()>> {
        let code = code.to_string();
        let record = record.clone();
        Box::pin(async move {
            let mut records = self.records.write().map_err(Self::lock_error)?;
            records.insert(code, record);
            Ok(())
        })
    }

    fn load(&self, code: &str) -> BoxFuture<'_, StorageResult<ProjectRecord>> {
        let code = code.to_string();
        Box::pin(async move {
            let records = self.records.read().map_err(Self::lock_error)?;
            records
                .get(&code)
                .cloned()
                .ok_or(StorageError::NotFound(code))
        })
    }

    fn delete(&self, code: &str) -> BoxFuture<'_, StorageResult<()>> {
        let code = code.to_string();
        Box::pin(async move {
            let mut records = self.records.write().map_err(Self::lock_error)?;
            records.remove(&code);
            Ok(())
        })
    }

    fn list(&self) -> BoxFuture<'_, StorageResult<Vec<String>>> {
        Box::pin(async move {
            let records = self.records.read().map_err(Self::lock_error)?;
            Ok(records.keys().cloned().collect())
        })
    }

    fn exists(&self, code: &str) -> BoxFuture<'_, StorageResult<bool>> {
        let code = code.to_string();
        Box::pin(async move {
            let records = self.records.read().map_err(Self::lock_error)?;
            Ok(records.contains_key(&code))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::block_on;

    #[test]
    fn test_save_and_load() {
        let storage = MemoryStorage::new();
        let record = ProjectRecord::new("AAAA1111");

        block_on(storage.save("AAAA1111", &record)).unwrap();
        let loaded = block_on(storage.load("AAAA1111")).unwrap();

        assert_eq!(loaded, record);
    }

    #[test]
    fn test_not_found() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.load("NOPE0000"));
        assert!(matches!(result, Err(StorageError::NotFound(code)) if code == "NOPE0000"));
    }

    #[test]
    fn test_save_replaces_record() {
        let storage = MemoryStorage::new();
        let mut record = ProjectRecord::new("AAAA1111");
        block_on(storage.save("AAAA1111", &record)).unwrap();

        record.thumbnail = Some("data:image/png;base64,AA==".to_string());
        block_on(storage.save("AAAA1111", &record)).unwrap();

        let loaded = block_on(storage.load("AAAA1111")).unwrap();
        assert_eq!(loaded.thumbnail, record.thumbnail);
        assert_eq!(block_on(storage.list()).unwrap().len(), 1);
    }

    #[test]
    fn test_exists_and_delete() {
        let storage = MemoryStorage::new();
        assert!(!block_on(storage.exists("AAAA1111")).unwrap());

        block_on(storage.save("AAAA1111", &ProjectRecord::new("AAAA1111"))).unwrap();
        assert!(block_on(storage.exists("AAAA1111")).unwrap());

        block_on(storage.delete("AAAA1111")).unwrap();
        assert!(!block_on(storage.exists("AAAA1111")).unwrap());
    }
}
