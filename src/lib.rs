//! Forecast benchmarking toolkit: accuracy metrics, forecast comparison
//! tests, and an HTTP protocol for serving forecasting models.

pub mod config;
pub mod evaluation;
pub mod frame;
pub mod io;
pub mod logging;
pub mod models;
pub mod protocol;
#[cfg(feature = "tui")]
pub mod tui;
