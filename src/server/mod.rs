//! HTTP surface.
//!
//! The route table is built explicitly by [`router`] from a
//! [`ServerConfig`] and handed to [`serve`]; there is no global
//! registration.
//!
//! | mode          | route                | response                      |
//! |---------------|----------------------|-------------------------------|
//! | `archive`     | `GET /`              | upload form                   |
//! | `archive`     | `GET /oldhello`      | `Hello, World!`               |
//! | `archive`     | `POST /process_file` | `files.zip` (application/zip) |
//! | `placeholder` | `GET /`              | `Hello, World!`               |
//! | `placeholder` | `GET /input`         | upload form                   |
//! | `placeholder` | `POST /process_file` | `file.txt` (text/plain)       |

mod error;
mod response;
mod routes;
mod trace;
mod upload;

pub use error::AppError;
pub use response::stream;
pub use routes::{
    ARCHIVE_FILE_NAME, ARCHIVE_MIME, PLACEHOLDER_DATA, PLACEHOLDER_FILE_NAME, PLACEHOLDER_MIME,
};
pub use trace::{TRACE_HEADER, trace_id};
pub use upload::{FILE_FIELD, UploadedFile, receive};

use std::future::Future;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tracing::info;

use crate::audit::RecordProcessor;
use crate::cli::Mode;
use crate::lifecycle::ShutdownSignal;

/// Settings that shape the router.
#[derive(Debug, Clone, Default)]
pub struct ServerConfig {
    pub mode: Mode,
    /// Upload size limit in bytes, `None` for unlimited.
    pub max_upload_bytes: Option<usize>,
    /// Cloud project for trace correlation.
    pub project: Option<String>,
}

/// Per-process state shared by every request. Immutable.
#[derive(Clone)]
pub struct AppState {
    pub processor: Arc<dyn RecordProcessor>,
    pub project: Option<Arc<str>>,
}

pub fn router(config: &ServerConfig, processor: Arc<dyn RecordProcessor>) -> Router {
    let state = AppState {
        processor,
        project: config.project.as_deref().map(Arc::from),
    };

    let routes = match config.mode {
        Mode::Archive => Router::new()
            .route("/", get(routes::upload_form))
            .route("/oldhello", get(routes::hello))
            .route("/process_file", post(routes::process_archive)),
        Mode::Placeholder => Router::new()
            .route("/", get(routes::hello))
            .route("/input", get(routes::upload_form))
            .route("/process_file", post(routes::process_placeholder)),
    };

    let body_limit = match config.max_upload_bytes {
        Some(limit) => DefaultBodyLimit::max(limit),
        None => DefaultBodyLimit::disable(),
    };

    routes
        .layer(body_limit)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            trace::trace_request,
        ))
        .with_state(state)
}

/// Serve `app` until `shutdown` resolves, then drain open connections.
///
/// # Returns
///
/// The signal that stopped the server.
pub async fn serve<F>(listener: TcpListener, app: Router, shutdown: F) -> Result<ShutdownSignal>
where
    F: Future<Output = ShutdownSignal> + Send + 'static,
{
    let (tx, rx) = oneshot::channel();

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let signal = shutdown.await;
            info!(%signal, "shutting down");
            let _ = tx.send(signal);
        })
        .await
        .context("Server error")?;

    rx.await.context("Server stopped without a shutdown signal")
}
