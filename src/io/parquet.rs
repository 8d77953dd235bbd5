//! Parquet encoding of frames for the `/predict` multipart body.
//!
//! The index travels as a `ds` datetime column (microsecond precision, no
//! timezone); every other column is `Float64`. Decoding is lenient: any
//! datetime column may serve as the index when `ds` is absent, numeric
//! columns of any width are widened to `f64` with nulls as `NaN`, and
//! non-numeric columns are dropped.

use std::io::Cursor;

use chrono::{DateTime, NaiveDateTime};
use polars::prelude::{
    DataFrame, DataType, NamedFrom, ParquetReader, ParquetWriter, PolarsError, SerReader, Series,
    TimeUnit,
};

use crate::frame::{Frame, FrameError, INDEX_COLUMN};

impl From<PolarsError> for FrameError {
    fn from(err: PolarsError) -> Self {
        FrameError::Codec(err.to_string())
    }
}

/// Serializes a frame to an in-memory Parquet file.
pub fn encode(frame: &Frame) -> Result<Vec<u8>, FrameError> {
    let micros: Vec<i64> = frame
        .index()
        .iter()
        .map(|ts| ts.and_utc().timestamp_micros())
        .collect();
    let mut columns = Vec::with_capacity(frame.columns().len() + 1);
    columns.push(
        Series::new(INDEX_COLUMN, micros)
            .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?,
    );
    for column in frame.columns() {
        columns.push(Series::new(column.name(), column.values()));
    }
    let mut table = DataFrame::new(columns)?;
    let mut buffer = Vec::new();
    ParquetWriter::new(&mut buffer).finish(&mut table)?;
    Ok(buffer)
}

/// Deserializes a Parquet file into a frame.
///
/// # Errors
///
/// [`FrameError::MissingIndex`] when the table has no datetime column,
/// [`FrameError::UnorderedIndex`] when its timestamps are not strictly
/// increasing, [`FrameError::Codec`] for unreadable input.
pub fn decode(bytes: &[u8]) -> Result<Frame, FrameError> {
    let table = ParquetReader::new(Cursor::new(bytes)).finish()?;
    from_table(&table)
}

fn from_table(table: &DataFrame) -> Result<Frame, FrameError> {
    let columns = table.get_columns();
    let index_column = columns
        .iter()
        .find(|s| s.name() == INDEX_COLUMN && is_datetime(s.dtype()))
        .or_else(|| columns.iter().find(|s| is_datetime(s.dtype())))
        .ok_or(FrameError::MissingIndex)?;

    let mut frame = Frame::new(timestamps(index_column)?)?;
    for series in columns {
        if series.name() == index_column.name() || !series.dtype().is_numeric() {
            continue;
        }
        let widened = series.cast(&DataType::Float64)?;
        let values = widened
            .f64()?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        frame.insert_column(series.name(), values)?;
    }
    Ok(frame)
}

fn is_datetime(dtype: &DataType) -> bool {
    matches!(dtype, DataType::Datetime(_, _))
}

fn timestamps(series: &Series) -> Result<Vec<NaiveDateTime>, FrameError> {
    let DataType::Datetime(unit, _) = series.dtype() else {
        return Err(FrameError::MissingIndex);
    };
    let per_second: i64 = match unit {
        TimeUnit::Nanoseconds => 1_000_000_000,
        TimeUnit::Microseconds => 1_000_000,
        TimeUnit::Milliseconds => 1_000,
    };
    let physical = series.cast(&DataType::Int64)?;
    physical
        .i64()?
        .into_iter()
        .enumerate()
        .map(|(row, value)| {
            let value =
                value.ok_or_else(|| FrameError::Codec(format!("null timestamp at row {row}")))?;
            let seconds = value.div_euclid(per_second);
            let nanos = value.rem_euclid(per_second) * (1_000_000_000 / per_second);
            DateTime::from_timestamp(seconds, nanos as u32)
                .map(|ts| ts.naive_utc())
                .ok_or_else(|| FrameError::Codec(format!("timestamp out of range at row {row}")))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, TimeDelta};

    use super::*;

    fn sample() -> Frame {
        let start = NaiveDate::from_ymd_opt(2023, 10, 1)
            .and_then(|d| d.and_hms_opt(0, 0, 0))
            .expect("valid date");
        let index = (0..4).map(|h| start + TimeDelta::minutes(15 * h)).collect();
        Frame::new(index)
            .and_then(|f| f.with_column("y", vec![1.0, f64::NAN, 3.5, -2.0]))
            .and_then(|f| f.with_column("temperature", vec![10.0, 11.0, 12.0, 13.0]))
            .expect("valid frame")
    }

    #[test]
    fn encoded_frame_decodes_with_same_index_and_columns() {
        let frame = sample();
        let bytes = encode(&frame).expect("encodes");
        let decoded = decode(&bytes).expect("decodes");
        assert_eq!(decoded.index(), frame.index());
        assert_eq!(
            decoded.column_names().collect::<Vec<_>>(),
            vec!["y", "temperature"]
        );
        let y = decoded.target().expect("target");
        assert_eq!(y[0], 1.0);
        assert!(y[1].is_nan());
        assert_eq!(y[3], -2.0);
    }

    #[test]
    fn non_datetime_table_has_no_index() {
        let mut table = DataFrame::new(vec![Series::new("y", &[1.0f64, 2.0])]).expect("table");
        let mut buffer = Vec::new();
        ParquetWriter::new(&mut buffer)
            .finish(&mut table)
            .expect("writes");
        assert_eq!(decode(&buffer), Err(FrameError::MissingIndex));
    }

    #[test]
    fn integer_columns_are_widened_and_text_is_dropped() {
        let ds = Series::new("timestamp", &[0i64, 3_600_000])
            .cast(&DataType::Datetime(TimeUnit::Milliseconds, None))
            .expect("datetime cast");
        let mut table = DataFrame::new(vec![
            ds,
            Series::new("load", &[5i32, 7]),
            Series::new("zone", &["north", "south"]),
        ])
        .expect("table");
        let mut buffer = Vec::new();
        ParquetWriter::new(&mut buffer)
            .finish(&mut table)
            .expect("writes");

        let frame = decode(&buffer).expect("decodes");
        assert_eq!(frame.column_names().collect::<Vec<_>>(), vec!["load"]);
        assert_eq!(frame.target(), Ok(&[5.0, 7.0][..]));
        assert_eq!(frame.frequency(), Some(TimeDelta::hours(1)));
    }

    #[test]
    fn garbage_is_a_codec_error() {
        assert!(matches!(
            decode(b"definitely not parquet"),
            Err(FrameError::Codec(_))
        ));
    }
}
