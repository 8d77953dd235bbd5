//! Forecast accuracy metrics and significance tests.
//!
//! Every entry point accepts real and predicted series in any [`Prices`]
//! shape. Inputs are reconciled by [`normalize`] (or [`normalize_daily`] for
//! the tests) before anything is computed, so a day × period matrix and its
//! row-major flattening always score the same.

pub mod error;
pub mod metrics;
pub mod normalize;
pub mod report;
pub mod significance;

pub use error::MetricError;
pub use metrics::{NaiveBaseline, Seasonality, mae, mape, mase, naive_forecast, rmae, rmse, smape};
pub use normalize::{DayMatrix, Prices, normalize, normalize_daily};
pub use report::MetricReport;
pub use significance::{
    Alternative, MIN_TEST_OBSERVATIONS, Norm, SignificanceMatrix, SignificanceTest, TestConfig,
    TestOutcome, TestVersion, diebold_mariano, diebold_mariano_errors, giacomini_white,
    giacomini_white_errors, significance_matrix,
};
