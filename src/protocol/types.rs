//! Wire types of the forecast protocol.
//!
//! JSON field names match what existing model servers emit, so Rust and
//! non-Rust servers are interchangeable behind [`crate::protocol`] clients.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::error::ProtocolError;
use crate::frame::{FORECAST_COLUMN, Frame};

/// A model author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorInfo {
    pub name: String,
    pub email: String,
}

/// Whether a model produces point forecasts or also quantiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ForecasterType {
    Point,
    Quantile,
}

/// Immutable description of a served model, returned by `GET /info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub name: String,
    #[serde(default)]
    pub authors: Vec<AuthorInfo>,
    #[serde(rename = "type")]
    pub forecaster_type: ForecasterType,
    #[serde(default)]
    pub params: BTreeMap<String, Value>,
}

/// Runtime snapshot of the serving process, returned by `GET /environment`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    #[serde(default)]
    pub packages: BTreeMap<String, String>,
    #[serde(default)]
    pub os: String,
    #[serde(default)]
    pub arch: String,
}

impl EnvironmentInfo {
    /// Describes the current process.
    pub fn current() -> Self {
        let mut packages = BTreeMap::new();
        packages.insert(
            env!("CARGO_PKG_NAME").to_string(),
            env!("CARGO_PKG_VERSION").to_string(),
        );
        Self {
            packages,
            os: std::env::consts::OS.to_string(),
            arch: std::env::consts::ARCH.to_string(),
        }
    }
}

/// Name of the column holding the `level`-th percentile.
pub fn quantile_column(level: u32) -> String {
    format!("q{level}")
}

/// One row of a forecast: the timestamp plus every forecast column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastRecord {
    #[serde(with = "wire_timestamp")]
    pub ds: NaiveDateTime,
    #[serde(flatten)]
    pub values: BTreeMap<String, Value>,
}

/// Body of a successful `POST /predict`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastResponse {
    pub forecast: Vec<ForecastRecord>,
}

/// Body of every failed request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ForecastResponse {
    /// Converts an adapter's forecast frame into wire records.
    ///
    /// # Errors
    ///
    /// [`ProtocolError::MissingField`] when the frame has no `yhat` column.
    pub fn from_frame(frame: &Frame) -> Result<Self, ProtocolError> {
        if frame.column(FORECAST_COLUMN).is_none() {
            return Err(ProtocolError::MissingField(FORECAST_COLUMN.to_string()));
        }
        let forecast = frame
            .index()
            .iter()
            .enumerate()
            .map(|(row, ds)| ForecastRecord {
                ds: *ds,
                values: frame
                    .columns()
                    .iter()
                    .map(|c| (c.name().to_string(), number(c.values()[row])))
                    .collect(),
            })
            .collect();
        Ok(Self { forecast })
    }

    /// Rebuilds a frame from wire records.
    ///
    /// `yhat` comes first, then the other numeric columns in name order.
    /// Nulls and absent keys become `NaN`; non-numeric columns are dropped.
    pub fn into_frame(self) -> Result<Frame, ProtocolError> {
        let mut names: Vec<String> = Vec::new();
        for record in &self.forecast {
            for (key, value) in &record.values {
                if !names.contains(key) && (value.is_number() || value.is_null()) {
                    names.push(key.clone());
                }
            }
        }
        if !names.iter().any(|n| n == FORECAST_COLUMN) {
            return Err(ProtocolError::MissingField(FORECAST_COLUMN.to_string()));
        }
        names.sort_by_key(|n| (n != FORECAST_COLUMN, n.clone()));
        names.retain(|name| {
            self.forecast.iter().all(|r| {
                r.values
                    .get(name)
                    .is_none_or(|v| v.is_number() || v.is_null())
            })
        });

        let mut frame = Frame::new(self.forecast.iter().map(|r| r.ds).collect())?;
        for name in names {
            let values = self
                .forecast
                .iter()
                .map(|r| r.values.get(&name).and_then(Value::as_f64).unwrap_or(f64::NAN))
                .collect();
            frame.insert_column(name, values)?;
        }
        Ok(frame)
    }
}

fn number(value: f64) -> Value {
    serde_json::Number::from_f64(value).map_or(Value::Null, Value::Number)
}

/// Timestamps are written as ISO-8601 strings; epoch milliseconds are also
/// accepted on read.
mod wire_timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::de::Error;
    use serde::{Deserialize, Deserializer, Serializer};
    use serde_json::Value;

    use crate::frame::{format_timestamp, parse_timestamp};

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_timestamp(ts))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(text) => {
                parse_timestamp(&text).ok_or_else(|| D::Error::custom(format!("invalid timestamp `{text}`")))
            }
            Value::Number(n) => n
                .as_i64()
                .and_then(DateTime::from_timestamp_millis)
                .map(|ts| ts.naive_utc())
                .ok_or_else(|| D::Error::custom(format!("invalid epoch timestamp {n}"))),
            other => Err(D::Error::custom(format!("expected a timestamp, got {other}"))),
        }
    }
}
