//! The seam between the HTTP server and a forecasting model.

use super::error::AdapterError;
use super::request::ForecastRequest;
use super::types::{EnvironmentInfo, ModelInfo};
use crate::frame::Frame;

/// A forecasting model the server can expose.
///
/// `forecast` takes `&mut self` so adapters may keep state between calls
/// (for example the time of their last recalibration). The server serializes
/// calls, so implementations need no internal locking.
pub trait Forecaster: Send {
    /// Static description returned by `GET /info`.
    fn info(&self) -> ModelInfo;

    /// Runtime snapshot returned by `GET /environment`.
    fn environment(&self) -> EnvironmentInfo {
        EnvironmentInfo::current()
    }

    /// Produces a forecast frame indexed by [`ForecastRequest::forecast_index`]
    /// with at least a `yhat` column, plus `q{level}` columns when the model
    /// supports quantiles and levels were requested.
    fn forecast(&mut self, request: &ForecastRequest) -> Result<Frame, AdapterError>;
}

impl<F: Forecaster + ?Sized> Forecaster for Box<F> {
    fn info(&self) -> ModelInfo {
        (**self).info()
    }

    fn environment(&self) -> EnvironmentInfo {
        (**self).environment()
    }

    fn forecast(&mut self, request: &ForecastRequest) -> Result<Frame, AdapterError> {
        (**self).forecast(request)
    }
}
