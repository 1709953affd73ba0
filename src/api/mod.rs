//! HTTP API
//!
//! Provides:
//! - Chain snapshot reads and validated writes
//! - Live Server-Sent Events stream of the chain
//! - Whole-chain verification and a health check
//! - The live viewer page

pub mod error;
pub mod routes;

use axum::{routing::get, Router};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tower_http::services::ServeFile;

use crate::chain::ChainStore;

pub use error::ApiError;

/// State shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: ChainStore,
    pub stream_interval: Duration,
    pub static_dir: PathBuf,
    shutdown_tx: Arc<watch::Sender<bool>>,
}

impl AppState {
    pub fn new(store: ChainStore) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            store,
            stream_interval: Duration::from_secs(1),
            static_dir: PathBuf::from("static"),
            shutdown_tx: Arc::new(shutdown_tx),
        }
    }

    pub fn with_stream_interval(mut self, interval: Duration) -> Self {
        self.stream_interval = interval;
        self
    }

    pub fn with_static_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.static_dir = dir.as_ref().to_path_buf();
        self
    }

    /// End every open `/stream` response so graceful shutdown can complete.
    /// Streams opened afterwards end right away.
    pub fn close_streams(&self) {
        self.shutdown_tx.send_replace(true);
    }

    pub(crate) fn subscribe_shutdown(&self) -> watch::Receiver<bool> {
        self.shutdown_tx.subscribe()
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let viewer = ServeFile::new(state.static_dir.join("index.html"));

    Router::new()
        .route("/", get(routes::get_chain).post(routes::write_record))
        .route("/stream", get(routes::stream_chain))
        .route("/verify", get(routes::verify))
        .route("/health", get(routes::health))
        // Live viewer
        .route_service("/view", viewer)
        .with_state(state)
}
