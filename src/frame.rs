//! Timestamp-indexed tables of numeric columns.
//!
//! [`Frame`] is the in-process shape of every series that crosses the
//! forecast protocol: request histories, covariates and returned forecasts.
//! Missing observations are stored as `NaN`.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeDelta};
use thiserror::Error;

/// Name of the timestamp column on the wire.
pub const INDEX_COLUMN: &str = "ds";
/// Name of the target column in a history frame.
pub const TARGET_COLUMN: &str = "y";
/// Name of the point-forecast column in a forecast frame.
pub const FORECAST_COLUMN: &str = "yhat";

/// Errors raised while building, transforming or decoding a [`Frame`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FrameError {
    /// Timestamps are not strictly increasing.
    #[error("index must be strictly increasing (violated at row {position})")]
    UnorderedIndex { position: usize },
    /// A column does not have one value per index entry.
    #[error("column `{column}` has {got} values but the index has {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        got: usize,
    },
    /// A column name is already taken.
    #[error("duplicate column `{0}`")]
    DuplicateColumn(String),
    /// A required column is absent.
    #[error("missing column `{0}`")]
    MissingColumn(String),
    /// No timestamp column could be found in an encoded table.
    #[error("no timestamp column found")]
    MissingIndex,
    /// Fewer than two timestamps, so no sampling frequency exists.
    #[error("cannot infer a frequency from fewer than two timestamps")]
    UnknownFrequency,
    /// A duration string could not be parsed.
    #[error("invalid duration `{0}`")]
    InvalidDuration(String),
    /// Encoding or decoding failed in the Parquet or CSV layer.
    #[error("codec error: {0}")]
    Codec(String),
}

/// A named column of observations.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    values: Vec<f64>,
}

impl Column {
    /// Column name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Column values, one per index entry.
    pub fn values(&self) -> &[f64] {
        &self.values
    }
}

/// A table indexed by strictly increasing timestamps.
///
/// # Examples
///
/// ```
/// use chrono::NaiveDate;
/// use forecast_bench::frame::Frame;
///
/// let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap().and_hms_opt(0, 0, 0).unwrap();
/// let index = (0..3).map(|h| start + chrono::TimeDelta::hours(h)).collect();
/// let frame = Frame::new(index).unwrap().with_column("y", vec![1.0, 2.0, 3.0]).unwrap();
///
/// assert_eq!(frame.frequency(), Some(chrono::TimeDelta::hours(1)));
/// assert_eq!(frame.forecast_index(2).unwrap()[0], start + chrono::TimeDelta::hours(3));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Frame {
    index: Vec<NaiveDateTime>,
    columns: Vec<Column>,
}

impl Frame {
    /// Creates a frame with the given index and no columns.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnorderedIndex`] unless the index is strictly
    /// increasing.
    pub fn new(index: Vec<NaiveDateTime>) -> Result<Self, FrameError> {
        if let Some(position) = index.windows(2).position(|pair| pair[1] <= pair[0]) {
            return Err(FrameError::UnorderedIndex {
                position: position + 1,
            });
        }
        Ok(Self {
            index,
            columns: Vec::new(),
        })
    }

    /// Builder form of [`Frame::insert_column`].
    pub fn with_column(
        mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<Self, FrameError> {
        self.insert_column(name, values)?;
        Ok(self)
    }

    /// Appends a column.
    ///
    /// # Errors
    ///
    /// Fails on a length mismatch with the index or a duplicate name.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<f64>,
    ) -> Result<(), FrameError> {
        let name = name.into();
        if values.len() != self.index.len() {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.index.len(),
                got: values.len(),
            });
        }
        if self.columns.iter().any(|c| c.name == name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        self.columns.push(Column { name, values });
        Ok(())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether the frame has no rows.
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(Column::name)
    }

    /// Values of the named column, if present.
    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(Column::values)
    }

    /// Values of the named column, or [`FrameError::MissingColumn`].
    pub fn require(&self, name: &str) -> Result<&[f64], FrameError> {
        self.column(name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))
    }

    /// The target series: column `y`, or the only column of a one-column frame.
    pub fn target(&self) -> Result<&[f64], FrameError> {
        let name = self.target_name()?;
        self.require(name)
    }

    /// Name of the column [`Frame::target`] reads.
    pub fn target_name(&self) -> Result<&str, FrameError> {
        if self.column(TARGET_COLUMN).is_some() {
            return Ok(TARGET_COLUMN);
        }
        match self.columns.as_slice() {
            [only] => Ok(&only.name),
            _ => Err(FrameError::MissingColumn(TARGET_COLUMN.to_string())),
        }
    }

    /// Copies the index and the named columns, in the order given.
    pub fn select(&self, names: &[&str]) -> Result<Frame, FrameError> {
        let mut selected = Frame {
            index: self.index.clone(),
            columns: Vec::with_capacity(names.len()),
        };
        for name in names {
            selected.insert_column(*name, self.require(name)?.to_vec())?;
        }
        Ok(selected)
    }

    pub fn first_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.first().copied()
    }

    pub fn last_timestamp(&self) -> Option<NaiveDateTime> {
        self.index.last().copied()
    }

    /// Sampling step of the index.
    ///
    /// The most common step between consecutive timestamps wins, so isolated
    /// gaps do not change the answer. Ties resolve to the smaller step.
    pub fn frequency(&self) -> Option<TimeDelta> {
        let mut counts: BTreeMap<TimeDelta, usize> = BTreeMap::new();
        for pair in self.index.windows(2) {
            *counts.entry(pair[1] - pair[0]).or_default() += 1;
        }
        let mut best: Option<(TimeDelta, usize)> = None;
        for (step, count) in counts {
            if best.is_none_or(|(_, top)| count > top) {
                best = Some((step, count));
            }
        }
        best.map(|(step, _)| step)
    }

    /// The `horizon` timestamps that follow the last row at the frame frequency.
    ///
    /// # Errors
    ///
    /// Returns [`FrameError::UnknownFrequency`] for frames with fewer than two rows.
    pub fn forecast_index(&self, horizon: usize) -> Result<Vec<NaiveDateTime>, FrameError> {
        let step = self.frequency().ok_or(FrameError::UnknownFrequency)?;
        let last = self.last_timestamp().ok_or(FrameError::UnknownFrequency)?;
        Ok(std::iter::successors(Some(last + step), |ts| Some(*ts + step))
            .take(horizon)
            .collect())
    }

    /// Whole sampling periods that fit in `duration`.
    pub fn periods_in_duration(&self, duration: TimeDelta) -> Result<usize, FrameError> {
        let step = self.frequency().ok_or(FrameError::UnknownFrequency)?;
        let step_ns = step.num_nanoseconds().unwrap_or(i64::MAX).max(1);
        let span_ns = duration.num_nanoseconds().unwrap_or(i64::MAX).max(0);
        Ok((span_ns / step_ns) as usize)
    }

    /// Rows with timestamps strictly after `start`.
    pub fn after(&self, start: NaiveDateTime) -> Frame {
        let first = self.index.partition_point(|ts| *ts <= start);
        Frame {
            index: self.index[first..].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[first..].to_vec(),
                })
                .collect(),
        }
    }

    /// Mean of the finite values in a column (`NaN` if there are none).
    pub fn column_mean(&self, name: &str) -> Result<f64, FrameError> {
        Ok(nan_mean(self.require(name)?).unwrap_or(f64::NAN))
    }

    /// Replaces `NaN`s in a column with `value`, returning how many were filled.
    pub fn fill_nan(&mut self, name: &str, value: f64) -> Result<usize, FrameError> {
        let column = self
            .columns
            .iter_mut()
            .find(|c| c.name == name)
            .ok_or_else(|| FrameError::MissingColumn(name.to_string()))?;
        let mut filled = 0;
        for v in column.values.iter_mut().filter(|v| v.is_nan()) {
            *v = value;
            filled += 1;
        }
        Ok(filled)
    }

    /// Linearly interpolates interior `NaN` runs in every column.
    ///
    /// Leading and trailing gaps have no anchor on one side and are left as-is.
    pub fn interpolate_linear(&mut self) {
        for column in &mut self.columns {
            interpolate_gaps(&mut column.values);
        }
    }
}

fn interpolate_gaps(values: &mut [f64]) {
    let mut last_known: Option<usize> = None;
    for i in 0..values.len() {
        if values[i].is_nan() {
            continue;
        }
        if let Some(start) = last_known {
            if i - start > 1 {
                let (from, to) = (values[start], values[i]);
                let span = (i - start) as f64;
                for (offset, v) in values[start + 1..i].iter_mut().enumerate() {
                    *v = from + (to - from) * (offset + 1) as f64 / span;
                }
            }
        }
        last_known = Some(i);
    }
}

/// Mean of the finite values, `None` when there are none.
pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (sum, count) = values
        .iter()
        .filter(|v| v.is_finite())
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    (count > 0).then(|| sum / count as f64)
}

/// Column names present in both frames, in the order of `past`.
///
/// Covariates whose future values are unknown cannot be used for prediction,
/// so only the intersection is kept.
pub fn shared_columns(past: &Frame, future: &Frame) -> Vec<String> {
    past.column_names()
        .filter(|name| future.column(name).is_some())
        .map(str::to_string)
        .collect()
}

/// Parses a pandas-style offset such as `7D`, `1h`, `15min`, `15T`, `30s` or `2W`.
///
/// A missing count means one unit. Zero and negative spans are rejected.
pub fn parse_duration(text: &str) -> Result<TimeDelta, FrameError> {
    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (digits, unit) = trimmed.split_at(split);
    let count: i64 = if digits.is_empty() {
        1
    } else {
        digits
            .parse()
            .map_err(|_| FrameError::InvalidDuration(text.to_string()))?
    };
    let span = match unit.trim() {
        "W" | "w" => TimeDelta::try_weeks(count),
        "D" | "d" => TimeDelta::try_days(count),
        "h" | "H" => TimeDelta::try_hours(count),
        "min" | "T" | "m" => TimeDelta::try_minutes(count),
        "s" | "S" => TimeDelta::try_seconds(count),
        _ => None,
    };
    span.filter(|d| *d > TimeDelta::zero())
        .ok_or_else(|| FrameError::InvalidDuration(text.to_string()))
}

/// Formats a span with the largest whole pandas unit (`7D`, `36h`, `15min`, `30s`).
pub fn format_duration(span: TimeDelta) -> String {
    let seconds = span.num_seconds();
    if seconds != 0 && seconds % 86_400 == 0 {
        format!("{}D", seconds / 86_400)
    } else if seconds != 0 && seconds % 3_600 == 0 {
        format!("{}h", seconds / 3_600)
    } else if seconds != 0 && seconds % 60 == 0 {
        format!("{}min", seconds / 60)
    } else {
        format!("{seconds}s")
    }
}

/// Parses ISO-8601 timestamps as written by pandas, chrono and most JSON encoders.
///
/// Offsets are converted to UTC; date-only strings map to midnight.
pub fn parse_timestamp(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.naive_utc());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, format) {
            return Some(ts);
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}

/// Formats a timestamp the way [`parse_timestamp`] reads it back.
pub fn format_timestamp(ts: &NaiveDateTime) -> String {
    ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string()
}
