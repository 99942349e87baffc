/// Image blob storage
///
/// Moves image bytes into and out of the binary object store and enforces
/// the upload safety policy. Bytes live in a pluggable backend; metadata
/// lives in the database.
pub mod disk;
pub mod store;

pub use store::{BlobStore, BlobStoreConfig};

use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// MIME types accepted for upload, and served back on download.
pub const ALLOWED_IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/gif"];

/// Blob storage backend trait
///
/// Implementations handle the actual storage and retrieval of blob bytes.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Store a blob under its filename
    async fn put(&self, filename: &str, data: Vec<u8>) -> AppResult<()>;

    /// Open a blob for streamed reading, with its size in bytes
    async fn open(&self, filename: &str) -> AppResult<Option<(tokio::fs::File, u64)>>;

    /// Read a whole blob into memory
    async fn get(&self, filename: &str) -> AppResult<Option<Vec<u8>>>;

    /// Delete a blob; missing blobs are not an error
    async fn delete(&self, filename: &str) -> AppResult<()>;

    /// Check if a blob exists
    async fn exists(&self, filename: &str) -> AppResult<bool>;
}

/// Metadata row kept for each stored blob
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobMetadata {
    pub filename: String,
    pub mime_type: String,
    pub size: i64,
    pub uploader_id: String,
    pub created_at: DateTime<Utc>,
}
