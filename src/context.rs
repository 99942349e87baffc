/// Application context and dependency injection
///
/// Every shared service is constructed once here, after the database
/// connection is confirmed open, and handed to route handlers by
/// reference; no handler reaches for lazily-initialized globals.
use crate::{
    blob_store::{BlobStore, BlobStoreConfig},
    config::ServerConfig,
    db,
    error::{AppError, AppResult},
    posts::PostRepository,
    rate_limit::RateLimiter,
    users::UserRepository,
};
use sqlx::SqlitePool;
use std::sync::Arc;

/// Application context holding all shared services
#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<ServerConfig>,
    pub db: SqlitePool,
    pub posts: Arc<PostRepository>,
    pub users: Arc<UserRepository>,
    pub blob_store: Arc<BlobStore>,
    pub rate_limiter: Arc<RateLimiter>,
    pub http: reqwest::Client,
}

impl AppContext {
    /// Create a new application context from configuration
    pub async fn new(config: ServerConfig) -> AppResult<Self> {
        config.validate()?;

        Self::ensure_directories(&config).await?;

        let pool = db::create_pool(&config.storage.database, db::DatabaseOptions::default()).await?;
        db::run_migrations(&pool).await?;
        db::test_connection(&pool).await?;

        let posts = Arc::new(PostRepository::new(pool.clone()));
        let users = Arc::new(UserRepository::new(pool.clone()));

        let blob_store = Arc::new(BlobStore::new(
            BlobStoreConfig {
                location: config.storage.blob_directory.clone(),
                max_blob_size: config.service.blob_upload_limit,
            },
            pool.clone(),
        ));

        let rate_limiter = Arc::new(RateLimiter::new(&config.rate_limit));

        let http = reqwest::Client::new();

        Ok(Self {
            config: Arc::new(config),
            db: pool,
            posts,
            users,
            blob_store,
            rate_limiter,
            http,
        })
    }

    /// Ensure required directories exist
    async fn ensure_directories(config: &ServerConfig) -> AppResult<()> {
        for dir in [&config.storage.data_directory, &config.storage.blob_directory] {
            if !dir.exists() {
                tokio::fs::create_dir_all(dir).await.map_err(|e| {
                    AppError::Internal(format!("Failed to create directory {:?}: {}", dir, e))
                })?;
            }
        }

        Ok(())
    }

    /// Get service URL
    pub fn service_url(&self) -> String {
        format!(
            "http://{}:{}",
            self.config.service.hostname, self.config.service.port
        )
    }
}
