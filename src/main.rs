/// WildTrack - wildlife tracking profile backend
///
/// REST API for animal profile posts, image attachments, bookmarks, and
/// admin moderation, backed by SQLite and a disk blob store.

mod api;
mod auth;
mod blob_store;
mod config;
mod context;
mod db;
mod error;
mod posts;
mod rate_limit;
mod server;
mod users;

use config::ServerConfig;
use context::AppContext;
use error::AppResult;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> AppResult<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wildtrack=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    print_banner();

    // Load configuration
    let config = ServerConfig::from_env()?;

    // Create application context once the database is confirmed open
    let ctx = AppContext::new(config).await?;

    // Start server
    server::serve(ctx).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
 _      ___ __    ____                  __
| | /| / (_) /___/ /_  ____ _____ ____/ /__
| |/ |/ / / / __  / _ \/ __/ _ '/ __/  '_/
|__/|__/_/_/\__,_/\___/_/  \__,_/\__/_/\_\

        WildTrack backend v{}
        "#,
        env!("CARGO_PKG_VERSION")
    );
}
