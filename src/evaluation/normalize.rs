//! Shape reconciliation for real and predicted series.

use super::error::MetricError;

/// A borrowed series in one of the layouts forecast pipelines produce.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Prices<'a> {
    /// One row per day, one column per intra-day period. Must be rectangular.
    Wide(&'a [Vec<f64>]),
    /// A single-column table, one observation per row.
    Column(&'a [f64]),
    /// A flat sequence.
    Flat(&'a [f64]),
}

impl<'a> Prices<'a> {
    /// Periods per row for tabular layouts, `None` for flat input.
    pub fn periods(&self) -> Option<usize> {
        match self {
            Prices::Wide(rows) => rows.first().map(Vec::len),
            Prices::Column(_) => Some(1),
            Prices::Flat(_) => None,
        }
    }

    /// Total number of observations.
    pub fn len(&self) -> usize {
        match self {
            Prices::Wide(rows) => rows.iter().map(Vec::len).sum(),
            Prices::Column(values) | Prices::Flat(values) => values.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Row-major flattening (day, then period).
    ///
    /// # Errors
    ///
    /// Returns [`MetricError::ShapeMismatch`] for a ragged `Wide` table.
    pub fn flatten(&self) -> Result<Vec<f64>, MetricError> {
        match *self {
            Prices::Wide(rows) => {
                let width = rows.first().map_or(0, Vec::len);
                if let Some(day) = rows.iter().position(|row| row.len() != width) {
                    return Err(MetricError::ShapeMismatch(format!(
                        "row {day} has {} periods, expected {width}",
                        rows[day].len()
                    )));
                }
                Ok(rows.iter().flatten().copied().collect())
            }
            Prices::Column(values) | Prices::Flat(values) => Ok(values.to_vec()),
        }
    }
}

impl<'a> From<&'a [f64]> for Prices<'a> {
    fn from(values: &'a [f64]) -> Self {
        Prices::Flat(values)
    }
}

impl<'a> From<&'a Vec<f64>> for Prices<'a> {
    fn from(values: &'a Vec<f64>) -> Self {
        Prices::Flat(values)
    }
}

impl<'a, const N: usize> From<&'a [f64; N]> for Prices<'a> {
    fn from(values: &'a [f64; N]) -> Self {
        Prices::Flat(values)
    }
}

impl<'a> From<&'a [Vec<f64>]> for Prices<'a> {
    fn from(rows: &'a [Vec<f64>]) -> Self {
        Prices::Wide(rows)
    }
}

impl<'a> From<&'a Vec<Vec<f64>>> for Prices<'a> {
    fn from(rows: &'a Vec<Vec<f64>>) -> Self {
        Prices::Wide(rows)
    }
}

/// Reconciles `real` and `pred` into two flat series of equal length.
///
/// # Errors
///
/// [`MetricError::ShapeMismatch`] when both inputs are multi-column tables
/// with different widths, when a table is ragged, or when the flattened
/// lengths differ.
///
/// # Examples
///
/// ```
/// use forecast_bench::evaluation::normalize;
///
/// let wide = vec![vec![1.0, 2.0], vec![3.0, 4.0]];
/// let flat = [1.5, 2.5, 3.5, 4.5];
/// let (real, pred) = normalize(&wide, &flat).unwrap();
/// assert_eq!(real, vec![1.0, 2.0, 3.0, 4.0]);
/// assert_eq!(pred.len(), 4);
/// ```
pub fn normalize<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
) -> Result<(Vec<f64>, Vec<f64>), MetricError> {
    let (real, pred) = (real.into(), pred.into());
    if let (Prices::Wide(_), Prices::Wide(_)) = (real, pred) {
        if let (Some(r), Some(p)) = (real.periods(), pred.periods()) {
            if r > 1 && p > 1 && r != p {
                return Err(MetricError::ShapeMismatch(format!(
                    "real has {r} columns, pred has {p}"
                )));
            }
        }
    }
    let real = real.flatten()?;
    let pred = pred.flatten()?;
    if real.len() != pred.len() {
        return Err(MetricError::ShapeMismatch(format!(
            "real has {} observations, pred has {}",
            real.len(),
            pred.len()
        )));
    }
    Ok((real, pred))
}

/// A series arranged as days × periods, stored row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct DayMatrix {
    periods: usize,
    values: Vec<f64>,
}

impl DayMatrix {
    /// Wraps a flat series as rows of `periods` values.
    pub fn new(values: Vec<f64>, periods: usize) -> Result<Self, MetricError> {
        if periods == 0 {
            return Err(MetricError::InvalidParameter(
                "periods per day must be positive".into(),
            ));
        }
        if values.len() % periods != 0 {
            return Err(MetricError::ShapeMismatch(format!(
                "{} observations do not split into days of {periods} periods",
                values.len()
            )));
        }
        Ok(Self { periods, values })
    }

    pub fn periods(&self) -> usize {
        self.periods
    }

    pub fn days(&self) -> usize {
        self.values.len() / self.periods
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn rows(&self) -> std::slice::Chunks<'_, f64> {
        self.values.chunks(self.periods)
    }

    /// Values of one intra-day period across all days.
    pub fn column(&self, period: usize) -> impl Iterator<Item = f64> {
        self.values
            .iter()
            .skip(period)
            .step_by(self.periods)
            .copied()
    }
}

/// Reconciles `real` and `pred` into two day × period matrices.
///
/// The period count comes from a `Wide` input with more than one column and
/// must agree with `periods_per_day` when both are given. Flat input without
/// an explicit count is treated as one observation per day.
pub fn normalize_daily<'a>(
    real: impl Into<Prices<'a>>,
    pred: impl Into<Prices<'a>>,
    periods_per_day: Option<usize>,
) -> Result<(DayMatrix, DayMatrix), MetricError> {
    let (real, pred) = (real.into(), pred.into());
    let implied = [real, pred].iter().find_map(|p| match p {
        Prices::Wide(_) => p.periods().filter(|&n| n > 1),
        _ => None,
    });
    let (real, pred) = normalize(real, pred)?;
    let periods = match (implied, periods_per_day) {
        (Some(table), Some(explicit)) if table != explicit => {
            return Err(MetricError::ShapeMismatch(format!(
                "table has {table} periods per day, {explicit} requested"
            )));
        }
        (Some(table), _) => table,
        (None, Some(explicit)) => explicit,
        (None, None) => 1,
    };
    Ok((DayMatrix::new(real, periods)?, DayMatrix::new(pred, periods)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattens_row_major() {
        let wide = vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]];
        assert_eq!(
            Prices::from(&wide).flatten(),
            Ok(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        );
    }

    #[test]
    fn ragged_table_is_rejected() {
        let wide = vec![vec![1.0, 2.0], vec![3.0]];
        assert!(matches!(
            Prices::from(&wide).flatten(),
            Err(MetricError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn wide_widths_must_agree() {
        let a = vec![vec![0.0; 4]; 6];
        let b = vec![vec![0.0; 6]; 4];
        assert!(matches!(normalize(&a, &b), Err(MetricError::ShapeMismatch(_))));
    }

    #[test]
    fn single_column_table_matches_flat() {
        let column = [1.0, 2.0, 3.0];
        let wide = vec![vec![1.0], vec![2.0], vec![3.0]];
        let (a, b) = normalize(Prices::Column(&column), &wide).expect("same length");
        assert_eq!(a, b);
    }

    #[test]
    fn lengths_must_agree_after_flattening() {
        assert!(matches!(
            normalize(&[1.0, 2.0], &[1.0, 2.0, 3.0]),
            Err(MetricError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn daily_takes_periods_from_table() {
        let wide = vec![vec![1.0, 2.0], vec![3.0, 4.0], vec![5.0, 6.0]];
        let flat = [0.0; 6];
        let (real, pred) = normalize_daily(&wide, &flat, None).expect("reshapes");
        assert_eq!(real.periods(), 2);
        assert_eq!(pred.days(), 3);
        assert_eq!(real.column(1).collect::<Vec<_>>(), vec![2.0, 4.0, 6.0]);
    }

    #[test]
    fn daily_rejects_conflicting_period_counts() {
        let wide = vec![vec![0.0; 4]; 2];
        assert!(matches!(
            normalize_daily(&wide, &wide, Some(24)),
            Err(MetricError::ShapeMismatch(_))
        ));
    }

    #[test]
    fn daily_requires_whole_days() {
        let flat = [0.0; 25];
        assert!(matches!(
            normalize_daily(&flat, &flat, Some(24)),
            Err(MetricError::ShapeMismatch(_))
        ));
    }
}
