//! Shared test fixtures for integration tests.
#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime, TimeDelta};
use forecast_bench::frame::Frame;

/// Midnight of 2024-01-01, a Monday.
pub fn monday() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

/// Hourly frame starting at [`monday`] with the given columns.
pub fn hourly_frame(columns: &[(&str, Vec<f64>)]) -> Frame {
    let n = columns.first().map_or(0, |(_, values)| values.len());
    let start = monday();
    let index = (0..n).map(|h| start + TimeDelta::hours(h as i64)).collect();
    columns
        .iter()
        .try_fold(Frame::new(index).expect("ordered index"), |frame, (name, values)| {
            frame.with_column(*name, values.clone())
        })
        .expect("valid frame")
}

/// `days` of an hourly price curve: `hour of day` plus `10 * day`.
pub fn hourly_history(days: usize) -> Frame {
    let values = (0..days * 24)
        .map(|h| (h % 24) as f64 + 10.0 * (h / 24) as f64)
        .collect();
    hourly_frame(&[("y", values)])
}

/// Unique scratch path under the system temp directory.
pub fn scratch_path(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("forecast-bench-{}-{name}", std::process::id()))
}
