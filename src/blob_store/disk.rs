/// Disk-based blob storage backend
use crate::{
    blob_store::BlobBackend,
    error::{AppError, AppResult},
};
use async_trait::async_trait;
use std::path::PathBuf;
use tokio::fs;

/// Disk storage backend
///
/// Stores blobs on the local filesystem with directory sharding based on
/// filename prefixes to prevent too many files in one directory.
#[derive(Clone)]
pub struct DiskBackend {
    base_path: PathBuf,
}

impl DiskBackend {
    /// Create a new disk storage backend
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    /// Get the file path for a blob
    ///
    /// Uses directory sharding: {base}/{first2chars}/{filename}
    /// For example, "a3f9...e2.png" -> {base}/a3/a3f9...e2.png
    fn blob_path(&self, filename: &str) -> PathBuf {
        if filename.len() >= 2 {
            let shard = &filename[0..2];
            self.base_path.join(shard).join(filename)
        } else {
            self.base_path.join("_").join(filename)
        }
    }

    /// Ensure the directory for a blob exists
    async fn ensure_blob_dir(&self, filename: &str) -> AppResult<PathBuf> {
        let blob_path = self.blob_path(filename);
        if let Some(parent) = blob_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::BlobStorage(format!("Failed to create blob directory: {}", e))
            })?;
        }
        Ok(blob_path)
    }
}

#[async_trait]
impl BlobBackend for DiskBackend {
    async fn put(&self, filename: &str, data: Vec<u8>) -> AppResult<()> {
        let blob_path = self.ensure_blob_dir(filename).await?;

        // Write to a temp name first so readers never see a partial blob
        let tmp_path = blob_path.with_extension("tmp");
        fs::write(&tmp_path, data).await.map_err(|e| {
            AppError::BlobStorage(format!("Failed to write blob {}: {}", filename, e))
        })?;
        fs::rename(&tmp_path, &blob_path).await.map_err(|e| {
            AppError::BlobStorage(format!("Failed to finalize blob {}: {}", filename, e))
        })?;

        Ok(())
    }

    async fn open(&self, filename: &str) -> AppResult<Option<(tokio::fs::File, u64)>> {
        let blob_path = self.blob_path(filename);

        match fs::File::open(&blob_path).await {
            Ok(file) => {
                let size = file
                    .metadata()
                    .await
                    .map_err(|e| {
                        AppError::BlobStorage(format!(
                            "Failed to stat blob {}: {}",
                            filename, e
                        ))
                    })?
                    .len();
                Ok(Some((file, size)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::BlobStorage(format!(
                "Failed to open blob {}: {}",
                filename, e
            ))),
        }
    }

    async fn get(&self, filename: &str) -> AppResult<Option<Vec<u8>>> {
        let blob_path = self.blob_path(filename);

        match fs::read(&blob_path).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::BlobStorage(format!(
                "Failed to read blob {}: {}",
                filename, e
            ))),
        }
    }

    async fn delete(&self, filename: &str) -> AppResult<()> {
        let blob_path = self.blob_path(filename);

        match fs::remove_file(&blob_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::BlobStorage(format!(
                "Failed to delete blob {}: {}",
                filename, e
            ))),
        }
    }

    async fn exists(&self, filename: &str) -> AppResult<bool> {
        let blob_path = self.blob_path(filename);
        Ok(blob_path.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_put_and_get_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        let filename = "a3f9001122334455.png";
        let data = b"test blob data".to_vec();

        backend.put(filename, data.clone()).await.unwrap();

        let retrieved = backend.get(filename).await.unwrap();
        assert_eq!(retrieved, Some(data));
    }

    #[tokio::test]
    async fn test_get_nonexistent_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        let result = backend.get("nonexistent.png").await.unwrap();
        assert_eq!(result, None);
    }

    #[tokio::test]
    async fn test_delete_blob() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        let filename = "deadbeefcafe0001.jpg";
        backend.put(filename, b"to be deleted".to_vec()).await.unwrap();
        assert!(backend.exists(filename).await.unwrap());

        backend.delete(filename).await.unwrap();
        assert!(!backend.exists(filename).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_missing_is_ok() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        // Idempotent at this layer
        assert!(backend.delete("never-existed.png").await.is_ok());
    }

    #[tokio::test]
    async fn test_open_reports_size() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        let filename = "0011223344556677.gif";
        backend.put(filename, b"12345".to_vec()).await.unwrap();

        let (_file, size) = backend.open(filename).await.unwrap().unwrap();
        assert_eq!(size, 5);
    }

    #[tokio::test]
    async fn test_directory_sharding() {
        let dir = tempdir().unwrap();
        let backend = DiskBackend::new(dir.path().to_path_buf());

        let path = backend.blob_path("a3f9001122334455.png");
        assert!(path.to_string_lossy().contains("/a3/"));
    }
}
