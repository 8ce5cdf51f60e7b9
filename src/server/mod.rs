//! HTTP API.
//!
//! | Method | Path | Response |
//! |---|---|---|
//! | GET | `/` | service banner |
//! | GET | `/health` | liveness probe |
//! | GET | `/generate?max_value=` | [`GenerationResult`](crate::GenerationResult) |
//! | GET | `/generate-stream?count=&max_value=` | array of numbers |
//! | POST | `/statistics[?max_value=]` | [`StatisticsResult`](crate::StatisticsResult) |
//! | POST | `/verify` | [`VerificationResult`](crate::VerificationResult) |
//! | GET | `/entropy-sources` | collector catalogue |
//! | GET | `/metrics` | Prometheus text format |

mod handlers;

pub use handlers::{router, ApiError};

use crate::config::ServerConfig;
use crate::service::RandomTrust;
use std::sync::Arc;
use thiserror::Error;

/// Errors that can occur while running the API server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// HTTP server exposing a [`RandomTrust`] service.
pub struct ApiServer {
    config: ServerConfig,
    service: Arc<RandomTrust>,
}

impl ApiServer {
    /// Creates a new API server.
    pub fn new(config: ServerConfig, service: Arc<RandomTrust>) -> Self {
        Self { config, service }
    }

    /// Returns the shared service.
    pub fn service(&self) -> Arc<RandomTrust> {
        Arc::clone(&self.service)
    }

    /// Starts the HTTP server.
    ///
    /// Runs until Ctrl-C, then drains in-flight requests and returns.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = router(self.service);
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(addr = %self.config.bind_addr, "API server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("API server stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Shutdown signal received"),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
