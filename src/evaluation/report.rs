//! Aggregate accuracy report for one forecast.

use std::fmt;

use serde::Serialize;

use super::error::MetricError;
use super::metrics::{self, Seasonality, paired};
use super::normalize::Prices;

/// Point-forecast accuracy summary.
///
/// Percentage and relative metrics are `None` when their denominator is zero
/// (an actual of zero for MAPE, a flat series for rMAE). Shape and data-size
/// errors are not swallowed.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    /// Number of scored observations.
    pub observations: usize,
    pub rmse: f64,
    pub mae: f64,
    pub mape: Option<f64>,
    pub smape: Option<f64>,
    /// Relative MAE against the seasonal naive forecast, when a seasonality
    /// was supplied.
    pub rmae: Option<f64>,
}

impl MetricReport {
    /// Computes every metric on the normalized pair.
    ///
    /// # Arguments
    ///
    /// * `real` - Observed values
    /// * `pred` - Forecast values, in any shape that normalizes against `real`
    /// * `seasonality` - Naive baseline for rMAE; `None` skips it
    pub fn compute<'a>(
        real: impl Into<Prices<'a>>,
        pred: impl Into<Prices<'a>>,
        seasonality: Option<Seasonality>,
    ) -> Result<Self, MetricError> {
        let (real, pred) = paired(real, pred)?;
        let (real, pred) = (Prices::Flat(&real), Prices::Flat(&pred));
        let rmae = match seasonality {
            Some(s) => undefined_as_none(metrics::rmae(real, pred, s))?,
            None => None,
        };
        Ok(Self {
            observations: real.len(),
            rmse: metrics::rmse(real, pred)?,
            mae: metrics::mae(real, pred)?,
            mape: undefined_as_none(metrics::mape(real, pred))?,
            smape: undefined_as_none(metrics::smape(real, pred))?,
            rmae,
        })
    }
}

fn undefined_as_none(result: Result<f64, MetricError>) -> Result<Option<f64>, MetricError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(MetricError::DivisionByZero { .. }) => Ok(None),
        Err(err) => Err(err),
    }
}

fn write_optional(f: &mut fmt::Formatter<'_>, label: &str, value: Option<f64>, percent: bool) -> fmt::Result {
    match value {
        Some(v) if percent => writeln!(f, "{label:<12}{:>10.2} %", v * 100.0),
        Some(v) => writeln!(f, "{label:<12}{v:>10.4}"),
        None => writeln!(f, "{label:<12}{:>10}", "n/a"),
    }
}

impl fmt::Display for MetricReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "=== Forecast Accuracy ({} observations) ===", self.observations)?;
        writeln!(f, "{:<12}{:>10.4}", "RMSE", self.rmse)?;
        writeln!(f, "{:<12}{:>10.4}", "MAE", self.mae)?;
        write_optional(f, "MAPE", self.mape, true)?;
        write_optional(f, "sMAPE", self.smape, true)?;
        write_optional(f, "rMAE", self.rmae, false)
    }
}
