//! HTTP server for Stowage.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;

use crate::config::Config;
use crate::db::Database;
use crate::file::BlobStore;
use crate::{Result, StowageError};

use super::handlers::AppState;
use super::middleware::JwtState;
use super::router::{create_health_router, create_router, create_swagger_router};

/// Interval of the blob store maintenance task.
const SHARD_CLEANUP_INTERVAL_SECS: u64 = 3600;

/// Web server for the API.
pub struct WebServer {
    addr: SocketAddr,
    app_state: Arc<AppState>,
    jwt_state: Arc<JwtState>,
    cors_origins: Vec<String>,
}

impl WebServer {
    /// Create a new web server.
    pub fn new(config: &Config, db: Database, storage: BlobStore) -> Result<Self> {
        let addr = format!("{}:{}", config.server.host, config.server.port)
            .parse()
            .map_err(|e| {
                StowageError::Config(format!(
                    "invalid server address {}:{}: {e}",
                    config.server.host, config.server.port
                ))
            })?;

        Ok(Self {
            addr,
            app_state: Arc::new(AppState::new(db, storage, config)),
            jwt_state: Arc::new(JwtState::new(&config.auth.jwt_secret)),
            cors_origins: config.server.cors_origins.clone(),
        })
    }

    /// Get the configured server address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Build the complete application router.
    pub fn router(&self) -> Router {
        create_router(
            self.app_state.clone(),
            self.jwt_state.clone(),
            &self.cors_origins,
        )
        .merge(create_health_router())
        .merge(create_swagger_router())
    }

    /// Periodically remove empty blob shard directories.
    fn start_shard_cleanup_task(storage: BlobStore) {
        tokio::spawn(async move {
            let mut interval =
                tokio::time::interval(Duration::from_secs(SHARD_CLEANUP_INTERVAL_SECS));

            // Skip the first immediate tick
            interval.tick().await;

            loop {
                interval.tick().await;

                match storage.cleanup_empty_shards().await {
                    Ok(0) => tracing::debug!("No empty blob shards to remove"),
                    Ok(count) => tracing::info!(removed = count, "Removed empty blob shards"),
                    Err(e) => tracing::warn!(error = %e, "Blob shard cleanup failed"),
                }
            }
        });
    }

    /// Run the web server until it fails.
    pub async fn run(self) -> std::io::Result<()> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        Self::start_shard_cleanup_task(self.app_state.storage.clone());

        tracing::info!("Web server listening on http://{}", local_addr);

        axum::serve(listener, router).await
    }

    /// Run the server in the background and return the bound address.
    ///
    /// Useful for tests that bind to port 0.
    pub async fn run_with_addr(self) -> std::io::Result<SocketAddr> {
        let router = self.router();

        let listener = TcpListener::bind(self.addr).await?;
        let local_addr = listener.local_addr()?;

        tracing::info!("Web server listening on http://{}", local_addr);

        tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router).await {
                tracing::error!(error = %e, "Web server error");
            }
        });

        Ok(local_addr)
    }
}
