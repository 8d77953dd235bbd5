use thiserror::Error;

/// Errors raised by normalization, metrics and significance tests.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum MetricError {
    /// Real and predicted series cannot be reconciled into the same shape.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
    /// Too few observations for the requested computation.
    #[error("insufficient data: need at least {needed} observations, got {got}")]
    InsufficientData { needed: usize, got: usize },
    /// A metric denominator is zero.
    #[error(
        "division by zero in {metric}{}",
        .index.map(|i| format!(" at index {i}")).unwrap_or_default()
    )]
    DivisionByZero {
        metric: &'static str,
        index: Option<usize>,
    },
    /// An input contains `NaN` or an infinity.
    #[error("non-finite value at index {index}")]
    NonFinite { index: usize },
    /// An argument is out of its domain.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

pub(crate) fn ensure_finite(values: &[f64]) -> Result<(), MetricError> {
    match values.iter().position(|v| !v.is_finite()) {
        Some(index) => Err(MetricError::NonFinite { index }),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn division_by_zero_message_names_index() {
        let err = MetricError::DivisionByZero {
            metric: "MAPE",
            index: Some(3),
        };
        assert_eq!(err.to_string(), "division by zero in MAPE at index 3");
        let err = MetricError::DivisionByZero {
            metric: "MASE",
            index: None,
        };
        assert_eq!(err.to_string(), "division by zero in MASE");
    }

    #[test]
    fn ensure_finite_reports_first_offender() {
        assert_eq!(ensure_finite(&[1.0, 2.0]), Ok(()));
        assert_eq!(
            ensure_finite(&[1.0, f64::NAN, f64::INFINITY]),
            Err(MetricError::NonFinite { index: 1 })
        );
    }
}
