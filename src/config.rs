/// Configuration management for the WildTrack backend
use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

/// Main server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub service: ServiceConfig,
    pub storage: StorageConfig,
    pub authentication: AuthConfig,
    pub rate_limit: RateLimitSettings,
    pub logging: LoggingConfig,
}

/// Service-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub hostname: String,
    pub port: u16,
    /// Maximum serialized size of a create/update post body
    pub post_body_limit: usize,
    /// Maximum accepted image upload size
    pub blob_upload_limit: usize,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_directory: PathBuf,
    pub database: PathBuf,
    pub blob_directory: PathBuf,
}

/// Authentication configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Secret used to sign session tokens
    pub session_secret: String,
    /// Session lifetime in hours
    pub session_ttl_hours: i64,
    /// Google OAuth client id that incoming ID tokens must be issued for
    pub google_client_id: String,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSettings {
    pub enabled: bool,
    pub authenticated_rps: u32,
    pub unauthenticated_rps: u32,
    pub admin_rps: u32,
    pub burst_size: u32,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
}

impl ServerConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> AppResult<Self> {
        dotenv::dotenv().ok();

        let hostname = env::var("WT_HOSTNAME").unwrap_or_else(|_| "localhost".to_string());
        let port = env::var("WT_PORT")
            .unwrap_or_else(|_| "4000".to_string())
            .parse()
            .map_err(|_| AppError::Validation("Invalid port number".to_string()))?;

        let post_body_limit = env::var("WT_POST_BODY_LIMIT")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .unwrap_or(10 * 1024 * 1024);
        let blob_upload_limit = env::var("WT_BLOB_UPLOAD_LIMIT")
            .unwrap_or_else(|_| "10485760".to_string())
            .parse()
            .unwrap_or(10 * 1024 * 1024);

        let data_directory: PathBuf = env::var("WT_DATA_DIRECTORY")
            .unwrap_or_else(|_| "./data".to_string())
            .into();
        let database = env::var("WT_DATABASE_LOCATION")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("wildtrack.sqlite"));
        let blob_directory = env::var("WT_BLOB_DIRECTORY")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_directory.join("blobs"));

        let session_secret = env::var("WT_SESSION_SECRET")
            .map_err(|_| AppError::Validation("Session secret required".to_string()))?;
        let session_ttl_hours = env::var("WT_SESSION_TTL_HOURS")
            .unwrap_or_else(|_| "72".to_string())
            .parse()
            .unwrap_or(72);
        let google_client_id = env::var("WT_GOOGLE_CLIENT_ID")
            .map_err(|_| AppError::Validation("Google client id required".to_string()))?;

        let rate_limit_enabled = env::var("WT_RATE_LIMITS_ENABLED")
            .unwrap_or_else(|_| "true".to_string())
            .parse()
            .unwrap_or(true);
        let authenticated_rps = env::var("WT_RATE_LIMIT_AUTHENTICATED_RPS")
            .unwrap_or_else(|_| "100".to_string())
            .parse()
            .unwrap_or(100);
        let unauthenticated_rps = env::var("WT_RATE_LIMIT_UNAUTHENTICATED_RPS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .unwrap_or(10);
        let admin_rps = env::var("WT_RATE_LIMIT_ADMIN_RPS")
            .unwrap_or_else(|_| "1000".to_string())
            .parse()
            .unwrap_or(1000);
        let burst_size = env::var("WT_RATE_LIMIT_BURST")
            .unwrap_or_else(|_| "50".to_string())
            .parse()
            .unwrap_or(50);

        let log_level = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        Ok(ServerConfig {
            service: ServiceConfig {
                hostname,
                port,
                post_body_limit,
                blob_upload_limit,
            },
            storage: StorageConfig {
                data_directory,
                database,
                blob_directory,
            },
            authentication: AuthConfig {
                session_secret,
                session_ttl_hours,
                google_client_id,
            },
            rate_limit: RateLimitSettings {
                enabled: rate_limit_enabled,
                authenticated_rps,
                unauthenticated_rps,
                admin_rps,
                burst_size,
            },
            logging: LoggingConfig { level: log_level },
        })
    }

    /// Validate configuration
    pub fn validate(&self) -> AppResult<()> {
        if self.service.hostname.is_empty() {
            return Err(AppError::Validation("Hostname cannot be empty".to_string()));
        }

        if self.authentication.session_secret.len() < 32 {
            return Err(AppError::Validation(
                "Session secret must be at least 32 characters".to_string(),
            ));
        }

        if self.service.blob_upload_limit == 0 {
            return Err(AppError::Validation(
                "Blob upload limit must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
