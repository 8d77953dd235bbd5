use thiserror::Error;

use crate::evaluation::MetricError;
use crate::frame::FrameError;

/// Malformed requests or responses.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ProtocolError {
    #[error("horizon must be a positive integer")]
    ZeroHorizon,
    #[error("quantile level {0} is outside 0..=100")]
    InvalidLevel(u32),
    #[error("invalid query: {0}")]
    InvalidQuery(String),
    #[error("missing field `{0}`")]
    MissingField(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error("invalid JSON: {0}")]
    Json(String),
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        ProtocolError::Json(err.to_string())
    }
}

/// Failures raised by a [`super::Forecaster`] implementation.
///
/// The server reports every variant as HTTP 500.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AdapterError {
    #[error("insufficient history: {0}")]
    InsufficientHistory(String),
    #[error(transparent)]
    Frame(#[from] FrameError),
    #[error(transparent)]
    Metric(#[from] MetricError),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error("forecast failed: {0}")]
    Failed(String),
}
