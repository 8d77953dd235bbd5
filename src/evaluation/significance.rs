//! Diebold-Mariano and Giacomini-White forecast comparison tests.
//!
//! Both tests compare the losses of two forecasts of the same series. The
//! loss differential is `d = L(e_A) - L(e_B)`, so a positive mean favours
//! forecast B. With [`Alternative::Greater`] a small p-value therefore means
//! "B is significantly more accurate than A", which is the one-sided
//! convention of the electricity price forecasting literature.

use std::fmt;

use serde::Serialize;
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

use super::error::{MetricError, ensure_finite};
use super::normalize::{DayMatrix, Prices, normalize_daily};

/// Fewest loss-differential observations a single test accepts.
pub const MIN_TEST_OBSERVATIONS: usize = 10;

/// Loss applied to forecast errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Norm {
    /// `|e|`
    #[default]
    Absolute,
    /// `e²`
    Squared,
}

impl Norm {
    /// Maps the conventional order (1 or 2) to a norm.
    pub fn from_order(order: u8) -> Result<Self, MetricError> {
        match order {
            1 => Ok(Norm::Absolute),
            2 => Ok(Norm::Squared),
            other => Err(MetricError::InvalidParameter(format!(
                "norm must be 1 or 2, got {other}"
            ))),
        }
    }

    fn loss(self, error: f64) -> f64 {
        match self {
            Norm::Absolute => error.abs(),
            Norm::Squared => error * error,
        }
    }
}

/// Alternative hypothesis of a test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Alternative {
    /// The forecasts differ in accuracy.
    TwoSided,
    /// Forecast A is more accurate than forecast B.
    Less,
    /// Forecast B is more accurate than forecast A.
    #[default]
    Greater,
}

/// How the day × period structure is tested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum TestVersion {
    /// One test per intra-day period, each over the days.
    Univariate,
    /// One test on the daily mean loss differential.
    #[default]
    Multivariate,
}

/// Options shared by both tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TestConfig {
    pub norm: Norm,
    pub alternative: Alternative,
    pub version: TestVersion,
    /// Newey-West truncation lag. `None` picks `floor(4 (N/100)^(2/9))` for
    /// Diebold-Mariano and zero for Giacomini-White.
    pub lags: Option<usize>,
    /// Periods per day for flat input. Ignored when a table supplies it.
    pub periods_per_day: Option<usize>,
}

/// Result of one test.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TestOutcome {
    pub statistic: f64,
    pub p_value: f64,
}

impl TestOutcome {
    fn no_difference() -> Self {
        Self {
            statistic: 0.0,
            p_value: 1.0,
        }
    }
}

/// Diebold-Mariano test of forecast A against forecast B.
///
/// Returns one outcome per intra-day period for
/// [`TestVersion::Univariate`], a single outcome otherwise.
///
/// # Errors
///
/// Shape errors from normalization, [`MetricError::NonFinite`] for `NaN`
/// input, and [`MetricError::InsufficientData`] with fewer than
/// [`MIN_TEST_OBSERVATIONS`] differentials per test.
pub fn diebold_mariano<'a>(
    real: impl Into<Prices<'a>>,
    pred_a: impl Into<Prices<'a>>,
    pred_b: impl Into<Prices<'a>>,
    config: &TestConfig,
) -> Result<Vec<TestOutcome>, MetricError> {
    let (errors_a, errors_b) = forecast_errors(real.into(), pred_a.into(), pred_b.into(), config)?;
    run_tests(dm_statistic, &errors_a, &errors_b, config)
}

/// Diebold-Mariano test on precomputed forecast errors.
pub fn diebold_mariano_errors<'a>(
    errors_a: impl Into<Prices<'a>>,
    errors_b: impl Into<Prices<'a>>,
    config: &TestConfig,
) -> Result<Vec<TestOutcome>, MetricError> {
    let (errors_a, errors_b) = normalize_daily(errors_a, errors_b, config.periods_per_day)?;
    ensure_finite(errors_a.values())?;
    ensure_finite(errors_b.values())?;
    run_tests(dm_statistic, &errors_a, &errors_b, config)
}

/// Conditional Giacomini-White test (τ = 1) of forecast A against forecast B.
///
/// Uses the instruments `(1, d_{t-1})`. See [`diebold_mariano`] for errors.
pub fn giacomini_white<'a>(
    real: impl Into<Prices<'a>>,
    pred_a: impl Into<Prices<'a>>,
    pred_b: impl Into<Prices<'a>>,
    config: &TestConfig,
) -> Result<Vec<TestOutcome>, MetricError> {
    let (errors_a, errors_b) = forecast_errors(real.into(), pred_a.into(), pred_b.into(), config)?;
    run_tests(gw_statistic, &errors_a, &errors_b, config)
}

/// Giacomini-White test on precomputed forecast errors.
pub fn giacomini_white_errors<'a>(
    errors_a: impl Into<Prices<'a>>,
    errors_b: impl Into<Prices<'a>>,
    config: &TestConfig,
) -> Result<Vec<TestOutcome>, MetricError> {
    let (errors_a, errors_b) = normalize_daily(errors_a, errors_b, config.periods_per_day)?;
    ensure_finite(errors_a.values())?;
    ensure_finite(errors_b.values())?;
    run_tests(gw_statistic, &errors_a, &errors_b, config)
}

type Statistic = fn(&[f64], Alternative, Option<usize>) -> Result<TestOutcome, MetricError>;

fn forecast_errors(
    real: Prices<'_>,
    pred_a: Prices<'_>,
    pred_b: Prices<'_>,
    config: &TestConfig,
) -> Result<(DayMatrix, DayMatrix), MetricError> {
    let (real_a, pred_a) = normalize_daily(real, pred_a, config.periods_per_day)?;
    let (real_b, pred_b) = normalize_daily(real, pred_b, config.periods_per_day)?;
    if real_a.periods() != real_b.periods() {
        return Err(MetricError::ShapeMismatch(format!(
            "forecast A has {} periods per day, forecast B has {}",
            real_a.periods(),
            real_b.periods()
        )));
    }
    ensure_finite(real_a.values())?;
    ensure_finite(pred_a.values())?;
    ensure_finite(pred_b.values())?;
    let periods = real_a.periods();
    let errors = |pred: &DayMatrix| -> Vec<f64> {
        real_a
            .values()
            .iter()
            .zip(pred.values())
            .map(|(r, p)| r - p)
            .collect()
    };
    Ok((
        DayMatrix::new(errors(&pred_a), periods)?,
        DayMatrix::new(errors(&pred_b), periods)?,
    ))
}

fn run_tests(
    statistic: Statistic,
    errors_a: &DayMatrix,
    errors_b: &DayMatrix,
    config: &TestConfig,
) -> Result<Vec<TestOutcome>, MetricError> {
    let norm = config.norm;
    let differential: Vec<f64> = errors_a
        .values()
        .iter()
        .zip(errors_b.values())
        .map(|(a, b)| norm.loss(*a) - norm.loss(*b))
        .collect();
    let differential = DayMatrix::new(differential, errors_a.periods())?;
    match config.version {
        TestVersion::Univariate => (0..differential.periods())
            .map(|period| {
                let d: Vec<f64> = differential.column(period).collect();
                statistic(&d, config.alternative, config.lags)
            })
            .collect(),
        TestVersion::Multivariate => {
            let d: Vec<f64> = differential
                .rows()
                .map(|day| day.iter().sum::<f64>() / day.len() as f64)
                .collect();
            Ok(vec![statistic(&d, config.alternative, config.lags)?])
        }
    }
}

fn ensure_sample(n: usize) -> Result<(), MetricError> {
    if n < MIN_TEST_OBSERVATIONS {
        return Err(MetricError::InsufficientData {
            needed: MIN_TEST_OBSERVATIONS,
            got: n,
        });
    }
    Ok(())
}

/// Newey-West truncation lag for `n` observations, capped at `n - 1`.
pub fn bandwidth(n: usize, lags: Option<usize>) -> usize {
    let automatic = (4.0 * (n as f64 / 100.0).powf(2.0 / 9.0)).floor() as usize;
    lags.unwrap_or(automatic).min(n.saturating_sub(1))
}

/// Newey-West long-run variance of `d` around `center` with Bartlett weights.
pub fn newey_west(d: &[f64], center: f64, lags: usize) -> f64 {
    let n = d.len() as f64;
    let deviations: Vec<f64> = d.iter().map(|v| v - center).collect();
    let autocovariance = |k: usize| -> f64 {
        deviations[k..]
            .iter()
            .zip(&deviations)
            .map(|(a, b)| a * b)
            .sum::<f64>()
            / n
    };
    let mut lrv = autocovariance(0);
    for k in 1..=lags.min(deviations.len().saturating_sub(1)) {
        let weight = 1.0 - k as f64 / (lags as f64 + 1.0);
        lrv += 2.0 * weight * autocovariance(k);
    }
    lrv
}

/// Diebold-Mariano statistic and p-value for one loss-differential series.
pub fn dm_statistic(
    d: &[f64],
    alternative: Alternative,
    lags: Option<usize>,
) -> Result<TestOutcome, MetricError> {
    ensure_sample(d.len())?;
    ensure_finite(d)?;
    if d.iter().all(|v| *v == 0.0) {
        return Ok(TestOutcome::no_difference());
    }
    let n = d.len() as f64;
    let mean = d.iter().sum::<f64>() / n;
    let lrv = newey_west(d, mean, bandwidth(d.len(), lags));
    let statistic = if lrv > 0.0 {
        mean / (lrv / n).sqrt()
    } else {
        f64::INFINITY.copysign(mean)
    };
    Ok(TestOutcome {
        statistic,
        p_value: normal_p_value(statistic, alternative)?,
    })
}

fn normal_p_value(statistic: f64, alternative: Alternative) -> Result<f64, MetricError> {
    let normal =
        Normal::new(0.0, 1.0).map_err(|e| MetricError::InvalidParameter(e.to_string()))?;
    let cdf = |x: f64| {
        if x == f64::INFINITY {
            1.0
        } else if x == f64::NEG_INFINITY {
            0.0
        } else {
            normal.cdf(x)
        }
    };
    let p = match alternative {
        Alternative::Greater => 1.0 - cdf(statistic),
        Alternative::Less => cdf(statistic),
        Alternative::TwoSided => 2.0 * (1.0 - cdf(statistic.abs())),
    };
    Ok(p.clamp(0.0, 1.0))
}

/// Conditional Giacomini-White statistic and p-value for one
/// loss-differential series.
///
/// `lags` defaults to zero, which makes the statistic `T` times the
/// uncentered R² of regressing a constant on the instruments.
pub fn gw_statistic(
    d: &[f64],
    alternative: Alternative,
    lags: Option<usize>,
) -> Result<TestOutcome, MetricError> {
    ensure_sample(d.len())?;
    ensure_finite(d)?;
    if d.iter().all(|v| *v == 0.0) {
        return Ok(TestOutcome::no_difference());
    }

    // z_t = (d_t, d_{t-1} d_t) for t = 1..N-1
    let z: Vec<[f64; 2]> = d.windows(2).map(|w| [w[1], w[0] * w[1]]).collect();
    let t = z.len() as f64;
    // one-step differentials are a martingale difference under the null
    let lags = lags.unwrap_or(0).min(z.len() - 1);
    let z_bar = [
        z.iter().map(|row| row[0]).sum::<f64>() / t,
        z.iter().map(|row| row[1]).sum::<f64>() / t,
    ];
    if z_bar == [0.0, 0.0] {
        return Ok(TestOutcome::no_difference());
    }
    let omega = uncentered_hac(&z, lags);

    let (raw, dof) = match quadratic_form(z_bar, omega) {
        Some(q) => (t * q, 2.0),
        None => {
            let variance = omega[0][0];
            let raw = if variance > 0.0 {
                t * z_bar[0] * z_bar[0] / variance
            } else {
                f64::INFINITY
            };
            (raw, 1.0)
        }
    };

    let mean = d.iter().sum::<f64>() / d.len() as f64;
    let direction = if mean > 0.0 {
        1.0
    } else if mean < 0.0 {
        -1.0
    } else {
        0.0
    };
    let statistic = match alternative {
        Alternative::TwoSided => raw,
        Alternative::Greater if direction == 0.0 => 0.0,
        Alternative::Less if direction == 0.0 => 0.0,
        Alternative::Greater => raw * direction,
        Alternative::Less => -raw * direction,
    };

    let chi2 = ChiSquared::new(dof).map_err(|e| MetricError::InvalidParameter(e.to_string()))?;
    let p_value = if statistic <= 0.0 {
        1.0
    } else if statistic.is_infinite() {
        0.0
    } else {
        (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0)
    };
    Ok(TestOutcome { statistic, p_value })
}

fn uncentered_hac(z: &[[f64; 2]], lags: usize) -> [[f64; 2]; 2] {
    let n = z.len() as f64;
    let gamma = |k: usize| -> [[f64; 2]; 2] {
        let mut g = [[0.0; 2]; 2];
        for t in k..z.len() {
            for i in 0..2 {
                for j in 0..2 {
                    g[i][j] += z[t][i] * z[t - k][j];
                }
            }
        }
        g.map(|row| row.map(|v| v / n))
    };
    let mut omega = gamma(0);
    for k in 1..=lags {
        let weight = 1.0 - k as f64 / (lags as f64 + 1.0);
        let g = gamma(k);
        for i in 0..2 {
            for j in 0..2 {
                omega[i][j] += weight * (g[i][j] + g[j][i]);
            }
        }
    }
    omega
}

/// `v' M⁻¹ v`, or `None` when `M` is numerically singular.
fn quadratic_form(v: [f64; 2], m: [[f64; 2]; 2]) -> Option<f64> {
    let det = m[0][0] * m[1][1] - m[0][1] * m[1][0];
    let scale = m[0][0].abs().max(m[1][1].abs());
    if !(det.abs() > 1e-12 * scale * scale) {
        return None;
    }
    let inverse = [
        [m[1][1] / det, -m[0][1] / det],
        [-m[1][0] / det, m[0][0] / det],
    ];
    let mv = [
        inverse[0][0] * v[0] + inverse[0][1] * v[1],
        inverse[1][0] * v[0] + inverse[1][1] * v[1],
    ];
    Some(v[0] * mv[0] + v[1] * mv[1])
}

/// Which test fills a [`SignificanceMatrix`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SignificanceTest {
    DieboldMariano,
    GiacominiWhite,
}

impl SignificanceTest {
    pub fn name(&self) -> &'static str {
        match self {
            SignificanceTest::DieboldMariano => "DM",
            SignificanceTest::GiacominiWhite => "GW",
        }
    }

    /// Parses `dm` or `gw` (case-insensitive).
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "dm" => Some(SignificanceTest::DieboldMariano),
            "gw" => Some(SignificanceTest::GiacominiWhite),
            _ => None,
        }
    }
}

/// Pairwise multivariate p-values for a set of named forecasts.
///
/// `p_values[i][j]` is the p-value of H1 "model `j` (column) is more
/// accurate than model `i` (row)". The diagonal is `None`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SignificanceMatrix {
    pub test: SignificanceTest,
    pub models: Vec<String>,
    pub p_values: Vec<Vec<Option<f64>>>,
}

impl SignificanceMatrix {
    pub fn get(&self, row: usize, column: usize) -> Option<f64> {
        self.p_values.get(row)?.get(column).copied().flatten()
    }

    /// Models whose column p-value is below `alpha` against every other model.
    pub fn dominant_models(&self, alpha: f64) -> Vec<&str> {
        (0..self.models.len())
            .filter(|&column| {
                self.models.len() > 1
                    && (0..self.models.len())
                        .filter(|&row| row != column)
                        .all(|row| self.get(row, column).is_some_and(|p| p < alpha))
            })
            .map(|column| self.models[column].as_str())
            .collect()
    }
}

impl fmt::Display for SignificanceMatrix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let width = self.models.iter().map(String::len).max().unwrap_or(0).max(8);
        writeln!(f, "=== {} p-values (row vs better column) ===", self.test.name())?;
        write!(f, "{:width$}", "")?;
        for model in &self.models {
            write!(f, "  {model:>width$}")?;
        }
        writeln!(f)?;
        for (row, model) in self.models.iter().enumerate() {
            write!(f, "{model:width$}")?;
            for column in 0..self.models.len() {
                match self.get(row, column) {
                    Some(p) => write!(f, "  {p:>width$.4}")?,
                    None => write!(f, "  {:>width$}", "-")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Runs `test` on every ordered pair of forecasts.
///
/// The configuration's version and alternative are overridden with
/// [`TestVersion::Multivariate`] and [`Alternative::Greater`].
pub fn significance_matrix<'a, S: AsRef<str>>(
    real: impl Into<Prices<'a>>,
    forecasts: &[(S, Prices<'a>)],
    test: SignificanceTest,
    config: &TestConfig,
) -> Result<SignificanceMatrix, MetricError> {
    let real = real.into();
    let config = TestConfig {
        version: TestVersion::Multivariate,
        alternative: Alternative::Greater,
        ..*config
    };
    let mut p_values = vec![vec![None; forecasts.len()]; forecasts.len()];
    for (row, (_, pred_row)) in forecasts.iter().enumerate() {
        for (column, (_, pred_column)) in forecasts.iter().enumerate() {
            if row == column {
                continue;
            }
            let outcomes = match test {
                SignificanceTest::DieboldMariano => {
                    diebold_mariano(real, *pred_row, *pred_column, &config)?
                }
                SignificanceTest::GiacominiWhite => {
                    giacomini_white(real, *pred_row, *pred_column, &config)?
                }
            };
            p_values[row][column] = outcomes.first().map(|o| o.p_value);
        }
    }
    Ok(SignificanceMatrix {
        test,
        models: forecasts.iter().map(|(name, _)| name.as_ref().to_string()).collect(),
        p_values,
    })
}
