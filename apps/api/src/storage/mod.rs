//! File Store — resume bytes live in S3-compatible object storage.
//!
//! Keys are deterministic: `resumes/` followed by the uploaded file's base
//! name. A second upload with the same name replaces the first.
//!
//! `AppState` holds an `Arc<dyn FileStore>`; the S3 backend is the only
//! production implementation.

use async_trait::async_trait;
use bytes::Bytes;
use thiserror::Error;

mod s3;

#[cfg(test)]
pub mod memory;

pub use s3::S3FileStore;

pub const KEY_PREFIX: &str = "resumes/";

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("object storage is not configured: {0} is missing")]
    NotConfigured(&'static str),

    #[error("object '{0}' does not exist")]
    NotFound(String),

    #[error("invalid file name '{0}'")]
    InvalidName(String),

    #[error("object storage request failed: {0}")]
    Backend(String),
}

/// A downloaded object.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key: String,
    pub bytes: Bytes,
    pub content_type: Option<String>,
}

#[async_trait]
pub trait FileStore: Send + Sync {
    /// Stores `bytes` under the key derived from `logical_name` and returns
    /// that key.
    async fn put(
        &self,
        logical_name: &str,
        content_type: Option<&str>,
        bytes: Bytes,
    ) -> Result<String, StorageError>;

    async fn get(&self, key: &str) -> Result<StoredObject, StorageError>;
}

/// Derives the storage key for an uploaded file name. Any directory
/// components sent by the client are dropped.
pub fn storage_key(logical_name: &str) -> Result<String, StorageError> {
    let base = logical_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();
    if base.is_empty() || base == "." || base == ".." {
        return Err(StorageError::InvalidName(logical_name.to_string()));
    }
    Ok(format!("{KEY_PREFIX}{base}"))
}
