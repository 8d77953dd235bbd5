//! Uniform HTTP contract for forecasting models.
//!
//! A model server exposes three endpoints:
//! - `GET /info`: [`ModelInfo`]
//! - `GET /environment`: [`EnvironmentInfo`]
//! - `POST /predict?horizon=H&level=L`: multipart Parquet upload of the
//!   history (and optional covariates), answered with a [`ForecastResponse`]
//!
//! The [`server`] module wraps any [`Forecaster`] in that contract; the
//! [`client`] module calls it.

mod adapter;
mod error;
mod request;
mod types;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
pub mod server;

pub use adapter::Forecaster;
pub use error::{AdapterError, ProtocolError};
pub use request::{ForecastRequest, MAX_LEVEL, Metadata, parse_levels};
pub use types::{
    AuthorInfo, EnvironmentInfo, ErrorResponse, ForecastRecord, ForecastResponse, ForecasterType,
    ModelInfo, quantile_column,
};
