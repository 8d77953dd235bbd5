//! Request handlers for the protocol endpoints.

use std::sync::Arc;
use std::time::Instant;

use axum::Json;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{debug, info, warn};

use super::ModelServer;
use crate::frame::{Frame, FrameError};
use crate::io::parquet;
use crate::protocol::{
    AdapterError, EnvironmentInfo, ErrorResponse, ForecastRequest, ForecastResponse, Metadata,
    ModelInfo, ProtocolError, parse_levels,
};

/// `GET /info` → 200 + `ModelInfo` JSON
pub async fn get_info(State(server): State<Arc<ModelServer>>) -> Json<ModelInfo> {
    Json(server.info().clone())
}

/// `GET /environment` → 200 + `EnvironmentInfo` JSON
pub async fn get_environment(State(server): State<Arc<ModelServer>>) -> Json<EnvironmentInfo> {
    Json(server.environment().clone())
}

/// Runs the model on an uploaded history.
///
/// `POST /predict?horizon=24&level=10,90` with multipart fields `y`
/// (required), `past_covariates`, `future_covariates` and `metadata`
/// → 200 + `ForecastResponse` JSON
///
/// Malformed input → 400, model failure → 500, both with `ErrorResponse`.
pub async fn predict(
    State(server): State<Arc<ModelServer>>,
    Query(params): Query<Vec<(String, String)>>,
    multipart: Multipart,
) -> Result<Json<ForecastResponse>, ApiError> {
    let (horizon, levels) = parse_query(&params)?;
    let upload = Upload::read(multipart).await?;

    let history = upload
        .y
        .ok_or_else(|| ProtocolError::MissingField("y".into()))?;
    let mut request = ForecastRequest::new(horizon, history)?.with_levels(levels)?;
    if let Some(frame) = upload.past_covariates {
        request = request.with_past_covariates(frame);
    }
    if let Some(frame) = upload.future_covariates {
        request = request.with_future_covariates(frame);
    }
    if let Some(metadata) = upload.metadata {
        request = request.with_metadata(metadata);
    }

    let rows = request.history().len();
    let started = Instant::now();
    let forecast = tokio::task::spawn_blocking(move || server.forecast(&request))
        .await
        .map_err(|e| ApiError::Internal(format!("forecast task failed: {e}")))??;
    let response = ForecastResponse::from_frame(&forecast)
        .map_err(|e| ApiError::Adapter(AdapterError::Failed(e.to_string())))?;

    info!(
        horizon,
        history_rows = rows,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "forecast served"
    );
    Ok(Json(response))
}

fn parse_query(params: &[(String, String)]) -> Result<(usize, Vec<u32>), ProtocolError> {
    let horizon = params
        .iter()
        .find(|(key, _)| key == "horizon")
        .ok_or_else(|| ProtocolError::MissingField("horizon".into()))?;
    let horizon: usize = horizon.1.trim().parse().map_err(|_| {
        ProtocolError::InvalidQuery(format!("horizon `{}` is not a non-negative integer", horizon.1))
    })?;
    let levels = parse_levels(
        params
            .iter()
            .filter(|(key, _)| key == "level")
            .map(|(_, value)| value.as_str()),
    )?;
    Ok((horizon, levels))
}

#[derive(Default)]
struct Upload {
    y: Option<Frame>,
    past_covariates: Option<Frame>,
    future_covariates: Option<Frame>,
    metadata: Option<Metadata>,
}

impl Upload {
    async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut upload = Upload::default();
        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::BadRequest(e.body_text()))?
        {
            let name = field.name().unwrap_or_default().to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| ApiError::BadRequest(e.body_text()))?;
            match name.as_str() {
                "y" => upload.y = Some(decode_field(&name, &bytes)?),
                "past_covariates" => upload.past_covariates = Some(decode_field(&name, &bytes)?),
                "future_covariates" => {
                    upload.future_covariates = Some(decode_field(&name, &bytes)?)
                }
                "metadata" => {
                    upload.metadata =
                        Some(serde_json::from_slice(&bytes).map_err(ProtocolError::from)?)
                }
                other => debug!(field = other, "ignoring unknown multipart field"),
            }
        }
        Ok(upload)
    }
}

fn decode_field(name: &str, bytes: &[u8]) -> Result<Frame, ApiError> {
    parquet::decode(bytes).map_err(|e| ApiError::BadRequest(format!("field `{name}`: {e}")))
}

/// Failure of a protocol request.
#[derive(Debug)]
pub enum ApiError {
    /// Malformed query or body (400).
    BadRequest(String),
    /// The model failed or broke its contract (500).
    Adapter(AdapterError),
    /// The server itself failed (500).
    Internal(String),
}

impl From<ProtocolError> for ApiError {
    fn from(err: ProtocolError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<FrameError> for ApiError {
    fn from(err: FrameError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<AdapterError> for ApiError {
    fn from(err: AdapterError) -> Self {
        ApiError::Adapter(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            ApiError::Adapter(err) => (StatusCode::INTERNAL_SERVER_ERROR, err.to_string()),
            ApiError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };
        warn!(status = status.as_u16(), %error, "predict request failed");
        (status, Json(ErrorResponse { error })).into_response()
    }
}
