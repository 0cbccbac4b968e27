//! HTTP server
//!
//! One `POST` route per entry in [`OPERATIONS`], plus `GET /` and `GET /health`.
//! Uploads are multipart forms with the image in the `image` field.

pub mod error;
pub mod handlers;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::operations::{DispatchContext, OPERATIONS};
use crate::processor::ForegroundProcessor;
use axum::extract::multipart::{Multipart, MultipartRejection};
use axum::extract::{DefaultBodyLimit, State};
use axum::routing::{get, post};
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use error::ApiError;

/// Multipart extractor that lets handlers report rejections as JSON
type MultipartUpload = std::result::Result<Multipart, MultipartRejection>;

/// State shared by every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub context: Arc<DispatchContext>,
}

impl AppState {
    #[must_use]
    pub fn new(foreground: Option<Arc<ForegroundProcessor>>, jpeg_quality_override: Option<u8>) -> Self {
        Self {
            context: Arc::new(DispatchContext {
                foreground,
                jpeg_quality_override,
            }),
        }
    }
}

/// Build the router for `config`
pub fn create_router(state: AppState, config: &ServerConfig) -> Router {
    let mut router = Router::new()
        .route("/", get(handlers::index))
        .route("/health", get(handlers::health));

    for spec in OPERATIONS {
        let operation = spec.operation;
        router = router.route(
            spec.route,
            post(move |State(state): State<AppState>, multipart: MultipartUpload| {
                handlers::process(operation, state, multipart)
            }),
        );
    }

    let mut router = router
        .layer(DefaultBodyLimit::max(config.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state);
    if config.cors_permissive {
        router = router.layer(CorsLayer::permissive());
    }
    router
}

/// Bind and serve until Ctrl-C
///
/// # Errors
/// - Invalid bind address
/// - Bind or accept failures
pub async fn serve(config: ServerConfig, foreground: Option<ForegroundProcessor>) -> Result<()> {
    let addr = config.socket_addr()?;
    let background_removal = foreground.is_some();
    let state = AppState::new(foreground.map(Arc::new), config.jpeg_quality_override);
    let app = create_router(state, &config);

    let listener = TcpListener::bind(addr).await?;
    info!(
        %addr,
        operations = OPERATIONS.len(),
        background_removal,
        "photo editor backend listening"
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    wait_for_shutdown(tokio::signal::ctrl_c()).await;
}

/// Resolve once `signal` fires; a failed signal handler never resolves
async fn wait_for_shutdown<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    match signal.await {
        Ok(()) => info!("shutdown requested"),
        Err(e) => {
            warn!(error = %e, "could not listen for ctrl-c; graceful shutdown disabled");
            std::future::pending::<()>().await;
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_shutdown_waits_when_signal_fails() {
        let failed = async { Err(std::io::Error::new(std::io::ErrorKind::Other, "no handler")) };
        let waited = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(failed)).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_shutdown_resolves_on_signal() {
        let fired = async { Ok(()) };
        let waited = tokio::time::timeout(Duration::from_millis(50), wait_for_shutdown(fired)).await;
        assert!(waited.is_ok());
    }
}
