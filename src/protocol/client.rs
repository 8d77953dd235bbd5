//! Blocking client for forecast model servers.

use std::time::Duration;

use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use thiserror::Error;
use tracing::debug;

use super::{EnvironmentInfo, ForecastRequest, ForecastResponse, ModelInfo, ProtocolError};
use crate::config::ClientConfig;
use crate::frame::{Frame, FrameError};
use crate::io::parquet;

/// Failures of a client call.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server answered with a non-2xx status.
    #[error("server responded with HTTP {status}: {body}")]
    Transport { status: u16, body: String },
    /// The request never completed (connection, timeout, body decoding).
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

impl ClientError {
    /// HTTP status of a [`ClientError::Transport`] failure.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Transport { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Talks to one model server. Every call is a single blocking round trip
/// with no retry.
///
/// # Examples
///
/// ```no_run
/// use forecast_bench::protocol::client::ForecastClient;
///
/// let client = ForecastClient::new("localhost", 3000, false)?;
/// println!("{}", client.info()?.name);
/// # Ok::<(), forecast_bench::protocol::client::ClientError>(())
/// ```
#[derive(Debug, Clone)]
pub struct ForecastClient {
    base_url: String,
    http: Client,
}

impl ForecastClient {
    /// Creates a client for `http(s)://host:port` without a timeout.
    pub fn new(host: &str, port: u16, secure: bool) -> Result<Self, ClientError> {
        Self::from_config(&ClientConfig {
            host: host.to_string(),
            port,
            secure,
            timeout_secs: None,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self, ClientError> {
        let scheme = if config.secure { "https" } else { "http" };
        let http = Client::builder()
            .timeout(config.timeout_secs.map(Duration::from_secs))
            .build()?;
        Ok(Self {
            base_url: format!("{scheme}://{}:{}", config.host, config.port),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    /// `GET /info`
    pub fn info(&self) -> Result<ModelInfo, ClientError> {
        let response = self.http.get(self.url("info")).send()?;
        Ok(check_status(response)?.json()?)
    }

    /// `GET /environment`
    pub fn environment(&self) -> Result<EnvironmentInfo, ClientError> {
        let response = self.http.get(self.url("environment")).send()?;
        Ok(check_status(response)?.json()?)
    }

    /// Forecasts `horizon` periods after the end of `y`.
    ///
    /// # Arguments
    ///
    /// * `horizon` - Number of periods to forecast
    /// * `y` - History frame; its target column is `y` or its only column
    /// * `level` - Optional quantile levels in `0..=100`
    pub fn predict(
        &self,
        horizon: usize,
        y: &Frame,
        level: Option<&[u32]>,
    ) -> Result<Frame, ClientError> {
        let mut request = ForecastRequest::new(horizon, y.clone())?;
        if let Some(levels) = level {
            request = request.with_levels(levels.to_vec())?;
        }
        self.predict_request(&request)
    }

    /// Sends a full request, including covariates and metadata.
    pub fn predict_request(&self, request: &ForecastRequest) -> Result<Frame, ClientError> {
        let mut query = vec![("horizon", request.horizon().to_string())];
        if let Some(levels) = request.levels() {
            query.extend(levels.iter().map(|l| ("level", l.to_string())));
        }

        let mut form = Form::new().part("y", parquet_part(request.history())?);
        if let Some(frame) = request.past_covariates() {
            form = form.part("past_covariates", parquet_part(frame)?);
        }
        if let Some(frame) = request.future_covariates() {
            form = form.part("future_covariates", parquet_part(frame)?);
        }
        if let Some(metadata) = request.metadata() {
            let json = serde_json::to_string(metadata).map_err(ProtocolError::from)?;
            form = form.text("metadata", json);
        }

        debug!(url = %self.url("predict"), horizon = request.horizon(), "sending forecast request");
        let response = self
            .http
            .post(self.url("predict"))
            .query(&query)
            .multipart(form)
            .send()?;
        let body: ForecastResponse = check_status(response)?.json()?;
        Ok(body.into_frame()?)
    }
}

fn parquet_part(frame: &Frame) -> Result<Part, ClientError> {
    Ok(Part::bytes(parquet::encode(frame)?)
        .file_name("data.parquet")
        .mime_str("application/octet-stream")?)
}

fn check_status(response: Response) -> Result<Response, ClientError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().unwrap_or_default();
    Err(ClientError::Transport {
        status: status.as_u16(),
        body,
    })
}
