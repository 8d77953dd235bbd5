//! Point-forecast accuracy metrics.
//!
//! All metrics normalize their inputs first and then require a non-empty,
//! all-finite pair. Percentage and scaled metrics raise
//! [`MetricError::DivisionByZero`] instead of returning an infinity.

use chrono::Weekday;

use super::error::{MetricError, ensure_finite};
use super::normalize::{Prices, normalize};

/// Which earlier observation the naive forecast repeats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seasonality {
    /// The value `n` observations earlier.
    Lag(usize),
    /// Electricity-price convention: Mondays, Saturdays and Sundays repeat the
    /// same period one week earlier, other days the same period one day
    /// earlier. `first_day` is the weekday of the first observation.
    Epf {
        periods_per_day: usize,
        first_day: Weekday,
    },
}

impl Seasonality {
    /// Same period on the previous day.
    pub fn daily(periods_per_day: usize) -> Self {
        Seasonality::Lag(periods_per_day)
    }

    /// Same period on the same weekday of the previous week.
    pub fn weekly(periods_per_day: usize) -> Self {
        Seasonality::Lag(7 * periods_per_day)
    }

    /// Leading observations that have no naive forecast.
    pub fn warm_up(&self) -> usize {
        match *self {
            Seasonality::Lag(n) => n,
            Seasonality::Epf {
                periods_per_day, ..
            } => 7 * periods_per_day,
        }
    }

    fn validate(&self) -> Result<(), MetricError> {
        match *self {
            Seasonality::Lag(0) => Err(MetricError::InvalidParameter(
                "seasonal lag must be positive".into(),
            )),
            Seasonality::Epf {
                periods_per_day: 0, ..
            } => Err(MetricError::InvalidParameter(
                "periods per day must be positive".into(),
            )),
            _ => Ok(()),
        }
    }

    fn lag_at(&self, position: usize) -> usize {
        match *self {
            Seasonality::Lag(n) => n,
            Seasonality::Epf {
                periods_per_day,
                first_day,
            } => {
                let day = position / periods_per_day;
                let weekday = (first_day.num_days_from_monday() as usize + day) % 7;
                match weekday {
                    // Monday, Saturday, Sunday
                    0 | 5 | 6 => 7 * periods_per_day,
                    _ => periods_per_day,
                }
            }
        }
    }
}

/// A naive forecast aligned to the series it was built from.
///
/// `values[i]` forecasts observation `offset + i`.
#[derive(Debug, Clone, PartialEq)]
pub struct NaiveBaseline {
    pub offset: usize,
    pub values: Vec<f64>,
}

/// Builds the seasonal naive forecast of `real`.
///
/// # Errors
///
/// [`MetricError::InsufficientData`] unless the series is longer than the
/// warm-up, [`MetricError::InvalidParameter`] for a zero lag.
pub fn naive_forecast<'a>(
    real: impl Into<Prices<'a>>,
    seasonality: Seasonality,
) -> Result<NaiveBaseline, MetricError> {
    seasonality.validate()?;
    let series = real.into().flatten()?;
    ensure_finite(&series)?;
    let warm_up = seasonality.warm_up();
    if series.len() <= warm_up {
        return Err(MetricError::InsufficientData {
            needed: warm_up + 1,
            got: series.len(),
        });
    }
    let values = (warm_up..series.len())
        .map(|t| series[t - seasonality.lag_at(t)])
        .collect();
    Ok(NaiveBaseline {
        offset: warm_up,
        values,
    })
}

pub(crate) fn paired<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
) -> Result<(Vec<f64>, Vec<f64>), MetricError> {
    let (real, pred) = normalize(real, pred)?;
    if real.is_empty() {
        return Err(MetricError::InsufficientData { needed: 1, got: 0 });
    }
    ensure_finite(&real)?;
    ensure_finite(&pred)?;
    Ok((real, pred))
}

fn mean_absolute(real: &[f64], pred: &[f64]) -> f64 {
    let sum: f64 = real.iter().zip(pred).map(|(r, p)| (r - p).abs()).sum();
    sum / real.len() as f64
}

/// Root mean squared error.
///
/// # Examples
///
/// ```
/// use forecast_bench::evaluation::rmse;
///
/// let real = [0.0, 2.0, 4.0, 6.0];
/// let pred = [1.0, 1.0, 5.0, 5.0];
/// assert_eq!(rmse(&real, &pred).unwrap(), 1.0);
/// ```
pub fn rmse<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
) -> Result<f64, MetricError> {
    let (real, pred) = paired(real, pred)?;
    let sq_sum: f64 = real.iter().zip(&pred).map(|(r, p)| (r - p).powi(2)).sum();
    Ok((sq_sum / real.len() as f64).sqrt())
}

/// Mean absolute error.
pub fn mae<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
) -> Result<f64, MetricError> {
    let (real, pred) = paired(real, pred)?;
    Ok(mean_absolute(&real, &pred))
}

/// Mean absolute percentage error, as a fraction.
///
/// Any zero in `real` raises [`MetricError::DivisionByZero`] with its index.
pub fn mape<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
) -> Result<f64, MetricError> {
    let (real, pred) = paired(real, pred)?;
    let mut sum = 0.0;
    for (index, (r, p)) in real.iter().zip(&pred).enumerate() {
        if *r == 0.0 {
            return Err(MetricError::DivisionByZero {
                metric: "MAPE",
                index: Some(index),
            });
        }
        sum += (r - p).abs() / r.abs();
    }
    Ok(sum / real.len() as f64)
}

/// Symmetric mean absolute percentage error, in `[0, 2]`.
///
/// An observation where both real and predicted are zero raises
/// [`MetricError::DivisionByZero`].
pub fn smape<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
) -> Result<f64, MetricError> {
    let (real, pred) = paired(real, pred)?;
    let mut sum = 0.0;
    for (index, (r, p)) in real.iter().zip(&pred).enumerate() {
        let denominator = r.abs() + p.abs();
        if denominator == 0.0 {
            return Err(MetricError::DivisionByZero {
                metric: "sMAPE",
                index: Some(index),
            });
        }
        sum += 2.0 * (r - p).abs() / denominator;
    }
    Ok(sum / real.len() as f64)
}

/// Mean absolute scaled error.
///
/// The scale is the MAE of the naive forecast over `in_sample`, after its
/// warm-up.
pub fn mase<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
    in_sample: impl Into<Prices<'a>>,
    seasonality: Seasonality,
) -> Result<f64, MetricError> {
    let (real, pred) = paired(real, pred)?;
    let in_sample = in_sample.into().flatten()?;
    let baseline = naive_forecast(Prices::Flat(&in_sample), seasonality)?;
    let scale = mean_absolute(&in_sample[baseline.offset..], &baseline.values);
    if scale == 0.0 {
        return Err(MetricError::DivisionByZero {
            metric: "MASE",
            index: None,
        });
    }
    Ok(mean_absolute(&real, &pred) / scale)
}

/// Relative MAE against the seasonal naive forecast of `real`.
///
/// Both MAEs are taken over the observations after the naive warm-up, so the
/// forecast and its baseline are scored on the same window.
pub fn rmae<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
    seasonality: Seasonality,
) -> Result<f64, MetricError> {
    let (real, pred) = paired(real, pred)?;
    let baseline = naive_forecast(Prices::Flat(&real), seasonality)?;
    let window = baseline.offset;
    let scale = mean_absolute(&real[window..], &baseline.values);
    if scale == 0.0 {
        return Err(MetricError::DivisionByZero {
            metric: "rMAE",
            index: None,
        });
    }
    Ok(mean_absolute(&real[window..], &pred[window..]) / scale)
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    #[test]
    fn rmse_and_mae_on_known_pair() {
        let real = [0.0, 2.0, 4.0, 6.0];
        let pred = [1.0, 1.0, 5.0, 5.0];
        assert_relative_eq!(rmse(&real, &pred).unwrap(), 1.0);
        assert_relative_eq!(mae(&real, &pred).unwrap(), 1.0);
    }

    #[test]
    fn empty_input_is_insufficient() {
        let empty: [f64; 0] = [];
        assert_eq!(
            rmse(&empty, &empty),
            Err(MetricError::InsufficientData { needed: 1, got: 0 })
        );
    }

    #[test]
    fn non_finite_input_is_rejected() {
        assert_eq!(
            mae(&[1.0, f64::NAN], &[1.0, 2.0]),
            Err(MetricError::NonFinite { index: 1 })
        );
    }

    #[test]
    fn mape_raises_on_zero_actual() {
        assert_eq!(
            mape(&[1.0, 0.0, 2.0], &[1.0, 1.0, 1.0]),
            Err(MetricError::DivisionByZero {
                metric: "MAPE",
                index: Some(1)
            })
        );
        assert_relative_eq!(mape(&[2.0, 4.0], &[1.0, 5.0]).unwrap(), 0.375);
    }

    #[test]
    fn smape_is_bounded_and_raises_on_double_zero() {
        assert_relative_eq!(smape(&[1.0], &[-1.0]).unwrap(), 2.0);
        assert!(matches!(
            smape(&[0.0], &[0.0]),
            Err(MetricError::DivisionByZero { .. })
        ));
    }

    #[test]
    fn naive_lag_repeats_earlier_values() {
        let series = [1.0, 2.0, 3.0, 4.0, 5.0];
        let baseline = naive_forecast(&series, Seasonality::Lag(2)).unwrap();
        assert_eq!(baseline.offset, 2);
        assert_eq!(baseline.values, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn naive_needs_more_than_warm_up() {
        assert_eq!(
            naive_forecast(&[1.0, 2.0], Seasonality::daily(2)),
            Err(MetricError::InsufficientData { needed: 3, got: 2 })
        );
        assert!(matches!(
            naive_forecast(&[1.0, 2.0], Seasonality::Lag(0)),
            Err(MetricError::InvalidParameter(_))
        ));
    }

    #[test]
    fn epf_naive_uses_weekly_lag_on_mondays_and_weekends() {
        // two periods per day, nine days starting on a Monday
        let series: Vec<f64> = (0..18).map(f64::from).collect();
        let seasonality = Seasonality::Epf {
            periods_per_day: 2,
            first_day: Weekday::Mon,
        };
        let baseline = naive_forecast(&series, seasonality).unwrap();
        assert_eq!(baseline.offset, 14);
        // day 7 is a Monday: one week back; day 8 is a Tuesday: one day back
        assert_eq!(baseline.values, vec![0.0, 1.0, 14.0, 15.0]);
    }

    #[test]
    fn mase_scales_by_in_sample_naive_error() {
        let in_sample = [1.0, 2.0, 4.0, 7.0];
        // naive lag 1 errors: 1, 2, 3 -> scale 2
        let value = mase(&[10.0, 10.0], &[12.0, 8.0], &in_sample, Seasonality::Lag(1)).unwrap();
        assert_relative_eq!(value, 1.0);
    }

    #[test]
    fn mase_rejects_flat_in_sample() {
        assert_eq!(
            mase(&[1.0], &[2.0], &[3.0, 3.0, 3.0], Seasonality::Lag(1)),
            Err(MetricError::DivisionByZero {
                metric: "MASE",
                index: None
            })
        );
    }

    #[test]
    fn rmae_of_naive_forecast_is_one() {
        let real = [1.0, 3.0, 2.0, 5.0, 4.0, 8.0];
        let baseline = naive_forecast(&real, Seasonality::Lag(1)).unwrap();
        let mut pred = real.to_vec();
        pred[1..].copy_from_slice(&baseline.values);
        assert_relative_eq!(rmae(&real, &pred, Seasonality::Lag(1)).unwrap(), 1.0);
    }

    #[test]
    fn rmae_is_shape_invariant() {
        let wide = vec![vec![1.0, 2.0], vec![2.0, 4.0], vec![3.0, 3.0]];
        let flat: Vec<f64> = wide.iter().flatten().copied().collect();
        let pred = [1.0, 1.0, 2.5, 3.5, 2.0, 4.0];
        let a = rmae(&wide, &pred, Seasonality::daily(2)).unwrap();
        let b = rmae(&flat, &pred, Seasonality::daily(2)).unwrap();
        assert_relative_eq!(a, b);
    }
}
