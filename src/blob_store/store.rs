/// Blob store adapter
///
/// Coordinates the byte backend with database metadata tracking and
/// enforces the upload safety policy: magic-byte sniffing, an image
/// allow-list, and generated filenames that never trust client input.
use crate::{
    blob_store::{disk::DiskBackend, BlobBackend, BlobMetadata, ALLOWED_IMAGE_TYPES},
    error::{AppError, AppResult},
};
use chrono::{DateTime, Utc};
use rand::RngCore;
use sqlx::{Row, SqlitePool};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Blob store configuration
#[derive(Debug, Clone)]
pub struct BlobStoreConfig {
    /// Directory for the disk backend
    pub location: PathBuf,
    /// Maximum accepted upload size in bytes
    pub max_blob_size: usize,
}

impl Default for BlobStoreConfig {
    fn default() -> Self {
        Self {
            location: PathBuf::from("./data/blobs"),
            max_blob_size: 10 * 1024 * 1024,
        }
    }
}

/// An opened blob ready for streaming to a client
pub struct BlobDownload {
    pub file: tokio::fs::File,
    pub mime_type: String,
    pub size: u64,
}

/// Main blob store adapter
#[derive(Clone)]
pub struct BlobStore {
    config: BlobStoreConfig,
    backend: Arc<dyn BlobBackend>,
    db: SqlitePool,
}

impl BlobStore {
    /// Create a new blob store over the disk backend
    pub fn new(config: BlobStoreConfig, db: SqlitePool) -> Self {
        let backend: Arc<dyn BlobBackend> = Arc::new(DiskBackend::new(config.location.clone()));
        Self { config, backend, db }
    }

    /// Sniff the image format from the leading bytes of the payload
    ///
    /// Returns the detected MIME type, or None when the signature does not
    /// match any format the store can decode.
    fn sniff_mime_type(data: &[u8]) -> Option<&'static str> {
        image::guess_format(data).ok().map(|f| f.to_mime_type())
    }

    /// Generate an unguessable filename: 16 random bytes hex-encoded plus
    /// the original extension. Client-supplied names are never stored.
    fn generate_filename(original_filename: &str) -> String {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);

        let ext = Path::new(original_filename)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty() && e.chars().all(|c| c.is_ascii_alphanumeric()))
            .map(|e| e.to_ascii_lowercase());

        match ext {
            Some(ext) => format!("{}.{}", hex::encode(bytes), ext),
            None => hex::encode(bytes),
        }
    }

    /// Upload a blob
    ///
    /// The payload must sniff to one of the allowed image formats, and the
    /// declared MIME type must also be in the allow-list; the declared type
    /// is what gets recorded as metadata. Returns the generated filename
    /// only after the backend write has completed.
    pub async fn upload(
        &self,
        data: Vec<u8>,
        declared_mime: &str,
        original_filename: &str,
        uploader_id: &str,
    ) -> AppResult<String> {
        if data.is_empty() {
            return Err(AppError::Validation("No file supplied".to_string()));
        }

        if data.len() > self.config.max_blob_size {
            return Err(AppError::Validation(format!(
                "File exceeds maximum size of {} bytes",
                self.config.max_blob_size
            )));
        }

        // Browsers can lie about Content-Type; check the file signature too
        let sniffed = Self::sniff_mime_type(&data);
        let signature_ok = sniffed.map_or(false, |m| ALLOWED_IMAGE_TYPES.contains(&m));
        let declared_ok = ALLOWED_IMAGE_TYPES.contains(&declared_mime);

        if !signature_ok || !declared_ok {
            return Err(AppError::Validation(format!(
                "Invalid file type: only jpeg, png and gif images are accepted (declared {})",
                declared_mime
            )));
        }

        let filename = Self::generate_filename(original_filename);
        let size = data.len() as i64;

        // Bytes first, metadata second: readers go through the metadata
        // table, so a failed write leaves no partial record visible.
        self.backend.put(&filename, data).await?;

        sqlx::query(
            r#"
            INSERT INTO blob_metadata (filename, mime_type, size, uploader_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&filename)
        .bind(declared_mime)
        .bind(size)
        .bind(uploader_id)
        .bind(Utc::now().to_rfc3339())
        .execute(&self.db)
        .await
        .map_err(AppError::Database)?;

        tracing::info!(filename = %filename, size, "stored blob");

        Ok(filename)
    }

    /// Open a blob for streamed download
    ///
    /// Fails with NotFound when the filename is unknown, and refuses to
    /// serve blobs whose recorded content type falls outside the image
    /// allow-list (defense in depth against mis-tagged legacy objects).
    pub async fn download(&self, filename: &str) -> AppResult<BlobDownload> {
        let metadata = self
            .metadata(filename)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Blob not found: {}", filename)))?;

        if !ALLOWED_IMAGE_TYPES.contains(&metadata.mime_type.as_str()) {
            return Err(AppError::UnsupportedContentType(metadata.mime_type));
        }

        let (file, size) = self
            .backend
            .open(filename)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Blob not found: {}", filename)))?;

        Ok(BlobDownload {
            file,
            mime_type: metadata.mime_type,
            size,
        })
    }

    /// Read a whole blob into memory (metadata checks as in download)
    pub async fn get(&self, filename: &str) -> AppResult<(Vec<u8>, String)> {
        let metadata = self
            .metadata(filename)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Blob not found: {}", filename)))?;

        if !ALLOWED_IMAGE_TYPES.contains(&metadata.mime_type.as_str()) {
            return Err(AppError::UnsupportedContentType(metadata.mime_type));
        }

        let data = self
            .backend
            .get(filename)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Blob not found: {}", filename)))?;

        Ok((data, metadata.mime_type))
    }

    /// Delete a blob
    ///
    /// Idempotent: deleting a nonexistent filename is not an error here;
    /// callers that need existence guarantees check first.
    pub async fn delete(&self, filename: &str) -> AppResult<()> {
        self.backend.delete(filename).await?;

        sqlx::query("DELETE FROM blob_metadata WHERE filename = ?1")
            .bind(filename)
            .execute(&self.db)
            .await
            .map_err(AppError::Database)?;

        Ok(())
    }

    /// Check if a blob exists (metadata and bytes)
    pub async fn exists(&self, filename: &str) -> AppResult<bool> {
        Ok(self.metadata(filename).await?.is_some() && self.backend.exists(filename).await?)
    }

    /// Get blob metadata
    pub async fn metadata(&self, filename: &str) -> AppResult<Option<BlobMetadata>> {
        let row = sqlx::query(
            r#"
            SELECT filename, mime_type, size, uploader_id, created_at
            FROM blob_metadata
            WHERE filename = ?1
            "#,
        )
        .bind(filename)
        .fetch_optional(&self.db)
        .await
        .map_err(AppError::Database)?;

        row.map(Self::row_to_metadata).transpose()
    }

    /// List blobs uploaded by a user, newest first
    pub async fn list_for_uploader(&self, uploader_id: &str, limit: i64) -> AppResult<Vec<BlobMetadata>> {
        let rows = sqlx::query(
            r#"
            SELECT filename, mime_type, size, uploader_id, created_at
            FROM blob_metadata
            WHERE uploader_id = ?1
            ORDER BY created_at DESC
            LIMIT ?2
            "#,
        )
        .bind(uploader_id)
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .map_err(AppError::Database)?;

        rows.into_iter().map(Self::row_to_metadata).collect()
    }

    fn row_to_metadata(row: sqlx::sqlite::SqliteRow) -> AppResult<BlobMetadata> {
        let created_at_str: String = row.try_get("created_at")?;
        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map_err(|e| AppError::Internal(format!("Invalid timestamp: {}", e)))?
            .with_timezone(&Utc);

        Ok(BlobMetadata {
            filename: row.try_get("filename")?,
            mime_type: row.try_get("mime_type")?,
            size: row.try_get("size")?,
            uploader_id: row.try_get("uploader_id")?,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use tempfile::{tempdir, TempDir};

    async fn create_test_store() -> (BlobStore, TempDir) {
        let dir = tempdir().unwrap();
        let config = BlobStoreConfig {
            location: dir.path().to_path_buf(),
            max_blob_size: 1024 * 1024,
        };

        let db = SqlitePool::connect(":memory:").await.unwrap();
        crate::db::run_migrations(&db).await.unwrap();

        (BlobStore::new(config, db), dir)
    }

    fn png_bytes() -> Vec<u8> {
        let img = image::RgbImage::new(4, 4);
        let mut buf = Vec::new();
        let mut cursor = std::io::Cursor::new(&mut buf);
        img.write_to(&mut cursor, ImageFormat::Png).unwrap();
        buf
    }

    #[tokio::test]
    async fn test_upload_and_download_round_trip() {
        let (store, _dir) = create_test_store().await;

        let data = png_bytes();
        let filename = store
            .upload(data.clone(), "image/png", "a.png", "user-1")
            .await
            .unwrap();

        assert!(filename.ends_with(".png"));

        let (retrieved, mime_type) = store.get(&filename).await.unwrap();
        assert_eq!(retrieved, data);
        assert_eq!(mime_type, "image/png");
    }

    #[tokio::test]
    async fn test_upload_rejects_forged_content_type() {
        let (store, _dir) = create_test_store().await;

        // Declared type lies; the signature is not an image
        let result = store
            .upload(b"not an image at all".to_vec(), "image/png", "a.png", "user-1")
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_disallowed_declared_type() {
        let (store, _dir) = create_test_store().await;

        // Real png bytes but the declared type is outside the allow-list
        let result = store
            .upload(png_bytes(), "text/plain", "a.png", "user-1")
            .await;

        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_empty_payload() {
        let (store, _dir) = create_test_store().await;

        let result = store.upload(Vec::new(), "image/png", "a.png", "user-1").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_upload_rejects_oversized_payload() {
        let (store, _dir) = create_test_store().await;

        let large = vec![0u8; 2 * 1024 * 1024];
        let result = store.upload(large, "image/png", "a.png", "user-1").await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_identical_uploads_get_distinct_filenames() {
        let (store, _dir) = create_test_store().await;

        let data = png_bytes();
        let first = store
            .upload(data.clone(), "image/png", "a.png", "user-1")
            .await
            .unwrap();
        let second = store
            .upload(data, "image/png", "a.png", "user-1")
            .await
            .unwrap();

        // Names are random, not content-derived
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_download_missing_blob() {
        let (store, _dir) = create_test_store().await;

        let result = store.download("0011223344556677.png").await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_download_refuses_mistagged_blob() {
        let (store, _dir) = create_test_store().await;

        // Legacy row with a content type outside the allow-list
        sqlx::query(
            "INSERT INTO blob_metadata (filename, mime_type, size, uploader_id, created_at)
             VALUES ('legacy.bin', 'application/pdf', 3, 'user-1', ?1)",
        )
        .bind(Utc::now().to_rfc3339())
        .execute(&store.db)
        .await
        .unwrap();

        let result = store.download("legacy.bin").await;
        assert!(matches!(result, Err(AppError::UnsupportedContentType(_))));
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let (store, _dir) = create_test_store().await;

        let filename = store
            .upload(png_bytes(), "image/png", "a.png", "user-1")
            .await
            .unwrap();

        store.delete(&filename).await.unwrap();
        assert!(!store.exists(&filename).await.unwrap());

        // Second delete is still Ok
        store.delete(&filename).await.unwrap();
    }

    #[tokio::test]
    async fn test_filename_extension_is_sanitized() {
        let name = BlobStore::generate_filename("../../../etc/passwd");
        // No extension survives; just the hex prefix
        assert_eq!(name.len(), 32);
        assert!(name.chars().all(|c| c.is_ascii_hexdigit()));

        let name = BlobStore::generate_filename("photo.JPG");
        assert!(name.ends_with(".jpg"));
        assert_eq!(name.len(), 32 + 4);
    }

    #[tokio::test]
    async fn test_list_for_uploader() {
        let (store, _dir) = create_test_store().await;

        store
            .upload(png_bytes(), "image/png", "a.png", "user-1")
            .await
            .unwrap();
        store
            .upload(png_bytes(), "image/png", "b.png", "user-1")
            .await
            .unwrap();
        store
            .upload(png_bytes(), "image/png", "c.png", "user-2")
            .await
            .unwrap();

        let blobs = store.list_for_uploader("user-1", 10).await.unwrap();
        assert_eq!(blobs.len(), 2);
    }
}
