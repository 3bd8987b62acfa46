use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::{storage_key, FileStore, StorageError, StoredObject};

/// In-process object store with the same key policy as the S3 backend.
#[derive(Default)]
pub struct MemoryFileStore {
    objects: Mutex<HashMap<String, (Option<String>, Bytes)>>,
}

#[async_trait]
impl FileStore for MemoryFileStore {
    async fn put(
        &self,
        logical_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<String, StorageError> {
        let key = storage_key(logical_name)?;
        self.objects
            .lock()
            .unwrap()
            .insert(key.clone(), (content_type.map(str::to_owned), bytes));
        Ok(key)
    }

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError> {
        let objects = self.objects.lock().unwrap();
        let (content_type, bytes) = objects
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;
        Ok(StoredObject {
            key: key.to_string(),
            bytes,
            content_type,
        })
    }
}
