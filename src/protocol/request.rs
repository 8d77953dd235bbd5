//! The request handed to a forecaster.

use chrono::NaiveDateTime;
use serde_json::{Map, Value};

use super::error::ProtocolError;
use crate::frame::{Frame, shared_columns};

/// Free-form JSON object forwarded to the model untouched.
pub type Metadata = Map<String, Value>;

/// Highest accepted quantile level.
pub const MAX_LEVEL: u32 = 100;

/// Everything a model needs to produce one forecast.
///
/// Constructed through [`ForecastRequest::new`] so the horizon and level
/// invariants always hold.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRequest {
    horizon: usize,
    history: Frame,
    past_covariates: Option<Frame>,
    future_covariates: Option<Frame>,
    metadata: Option<Metadata>,
    levels: Option<Vec<u32>>,
}

impl ForecastRequest {
    /// Creates a request for `horizon` periods after the end of `history`.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::ZeroHorizon`] when `horizon` is zero.
    pub fn new(horizon: usize, history: Frame) -> Result<Self, ProtocolError> {
        if horizon == 0 {
            return Err(ProtocolError::ZeroHorizon);
        }
        Ok(Self {
            horizon,
            history,
            past_covariates: None,
            future_covariates: None,
            metadata: None,
            levels: None,
        })
    }

    pub fn with_past_covariates(mut self, frame: Frame) -> Self {
        self.past_covariates = Some(frame);
        self
    }

    pub fn with_future_covariates(mut self, frame: Frame) -> Self {
        self.future_covariates = Some(frame);
        self
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Requests quantile levels. Levels are sorted and deduplicated; an empty
    /// list means no quantiles.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::InvalidLevel`] for a level above [`MAX_LEVEL`].
    pub fn with_levels(mut self, mut levels: Vec<u32>) -> Result<Self, ProtocolError> {
        if let Some(bad) = levels.iter().find(|l| **l > MAX_LEVEL) {
            return Err(ProtocolError::InvalidLevel(*bad));
        }
        levels.sort_unstable();
        levels.dedup();
        self.levels = (!levels.is_empty()).then_some(levels);
        Ok(self)
    }

    pub fn horizon(&self) -> usize {
        self.horizon
    }

    pub fn history(&self) -> &Frame {
        &self.history
    }

    pub fn past_covariates(&self) -> Option<&Frame> {
        self.past_covariates.as_ref()
    }

    pub fn future_covariates(&self) -> Option<&Frame> {
        self.future_covariates.as_ref()
    }

    pub fn metadata(&self) -> Option<&Metadata> {
        self.metadata.as_ref()
    }

    pub fn levels(&self) -> Option<&[u32]> {
        self.levels.as_deref()
    }

    /// Covariate columns usable for prediction: present in both the past and
    /// the future frames.
    pub fn shared_covariates(&self) -> Vec<String> {
        match (&self.past_covariates, &self.future_covariates) {
            (Some(past), Some(future)) => shared_columns(past, future),
            _ => Vec::new(),
        }
    }

    /// Timestamps the forecast must cover.
    pub fn forecast_index(&self) -> Result<Vec<NaiveDateTime>, ProtocolError> {
        Ok(self.history.forecast_index(self.horizon)?)
    }
}

/// Parses `level` query values: repeated keys and comma-separated lists are
/// both accepted.
pub fn parse_levels<'a>(values: impl IntoIterator<Item = &'a str>) -> Result<Vec<u32>, ProtocolError> {
    let mut levels = Vec::new();
    for value in values {
        for part in value.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let level: u32 = part
                .parse()
                .map_err(|_| ProtocolError::InvalidQuery(format!("level `{part}` is not an integer")))?;
            levels.push(level);
        }
    }
    Ok(levels)
}
