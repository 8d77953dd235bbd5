//! axum server exposing one [`Forecaster`].

mod handlers;

use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tracing::info;

use super::{AdapterError, EnvironmentInfo, ForecastRequest, Forecaster, ModelInfo};
use crate::frame::Frame;

/// Request body limit applied when none is configured.
pub const DEFAULT_BODY_LIMIT: usize = 64 * 1024 * 1024;

/// Shared state of a model server: the model and its cached descriptions.
///
/// The model sits behind a `Mutex`, so at most one forecast touches it at a
/// time. `info` and `environment` are captured once at construction.
pub struct ModelServer {
    model: Mutex<Box<dyn Forecaster>>,
    info: ModelInfo,
    environment: EnvironmentInfo,
    body_limit: usize,
}

impl ModelServer {
    pub fn new(model: impl Forecaster + 'static) -> Self {
        Self::from_boxed(Box::new(model))
    }

    pub fn from_boxed(model: Box<dyn Forecaster>) -> Self {
        let info = model.info();
        let environment = model.environment();
        Self {
            model: Mutex::new(model),
            info,
            environment,
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }

    /// Caps the size of `/predict` bodies.
    pub fn with_body_limit(mut self, bytes: usize) -> Self {
        self.body_limit = bytes;
        self
    }

    pub fn info(&self) -> &ModelInfo {
        &self.info
    }

    pub fn environment(&self) -> &EnvironmentInfo {
        &self.environment
    }

    /// Runs the model on one request, holding the model lock throughout.
    ///
    /// A request whose adapter panicked leaves the lock poisoned; later
    /// requests still reach the model.
    pub fn forecast(&self, request: &ForecastRequest) -> Result<Frame, AdapterError> {
        let mut model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        model.forecast(request)
    }
}

/// Builds the axum router with all protocol routes.
///
/// # Arguments
///
/// * `server` - Shared model server
///
/// # Returns
///
/// Configured `Router` ready to serve.
pub fn router(server: Arc<ModelServer>) -> Router {
    let body_limit = server.body_limit;
    Router::new()
        .route("/info", get(handlers::get_info))
        .route("/environment", get(handlers::get_environment))
        .route("/predict", post(handlers::predict))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(server)
}

/// Binds to `addr` and serves until Ctrl-C.
///
/// # Errors
///
/// Returns an `io::Error` if the listener cannot bind or the server fails.
pub async fn serve(server: Arc<ModelServer>, addr: SocketAddr) -> io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    serve_listener(server, listener).await
}

/// Serves on an already-bound listener until Ctrl-C.
pub async fn serve_listener(
    server: Arc<ModelServer>,
    listener: tokio::net::TcpListener,
) -> io::Result<()> {
    info!(
        addr = %listener.local_addr()?,
        model = %server.info().name,
        "forecast server listening"
    );
    axum::serve(listener, router(server))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // no signal handler available: run until the process is killed
        std::future::pending::<()>().await;
    }
    info!("shutting down");
}
