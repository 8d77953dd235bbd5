//! CSV reading of series and CSV export of forecasts and p-value matrices.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::evaluation::SignificanceMatrix;
use crate::frame::{Frame, FrameError, INDEX_COLUMN, format_timestamp, parse_timestamp};

impl From<csv::Error> for FrameError {
    fn from(err: csv::Error) -> Self {
        FrameError::Codec(err.to_string())
    }
}

/// Reads a frame from a CSV file.
///
/// The index is the `ds` column when present, otherwise the first column.
/// Every other column must hold numbers; empty cells and `NaN` become `NaN`.
pub fn read_frame_file(path: &Path) -> Result<Frame, FrameError> {
    let file = File::open(path)
        .map_err(|e| FrameError::Codec(format!("{}: {e}", path.display())))?;
    read_frame(io::BufReader::new(file))
}

/// Reads a frame from any CSV source. See [`read_frame_file`].
pub fn read_frame(reader: impl Read) -> Result<Frame, FrameError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();
    if headers.is_empty() {
        return Err(FrameError::MissingIndex);
    }
    let index_at = headers.iter().position(|h| h == INDEX_COLUMN).unwrap_or(0);

    let mut index = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); headers.len()];
    for (row, record) in rdr.records().enumerate() {
        let record = record?;
        let stamp = record.get(index_at).unwrap_or_default();
        let ts = parse_timestamp(stamp).ok_or_else(|| {
            FrameError::Codec(format!("row {}: invalid timestamp `{stamp}`", row + 1))
        })?;
        index.push(ts);
        for (col, cell) in record.iter().enumerate() {
            if col == index_at {
                continue;
            }
            columns[col].push(parse_cell(cell).ok_or_else(|| {
                FrameError::Codec(format!(
                    "row {}, column `{}`: invalid number `{cell}`",
                    row + 1,
                    &headers[col]
                ))
            })?);
        }
    }

    let mut frame = Frame::new(index)?;
    for (col, values) in columns.into_iter().enumerate() {
        if col != index_at {
            frame.insert_column(&headers[col], values)?;
        }
    }
    Ok(frame)
}

fn parse_cell(cell: &str) -> Option<f64> {
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") || cell.eq_ignore_ascii_case("null") {
        return Some(f64::NAN);
    }
    cell.parse().ok()
}

/// Writes a frame as CSV with a leading `ds` column. `NaN` is written as an
/// empty cell.
pub fn write_frame(frame: &Frame, writer: impl Write) -> Result<(), FrameError> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec![INDEX_COLUMN];
    header.extend(frame.column_names());
    wtr.write_record(&header)?;

    for (row, ts) in frame.index().iter().enumerate() {
        let mut record = Vec::with_capacity(header.len());
        record.push(format_timestamp(ts));
        for column in frame.columns() {
            let v = column.values()[row];
            record.push(if v.is_nan() { String::new() } else { v.to_string() });
        }
        wtr.write_record(&record)?;
    }

    wtr.flush()
        .map_err(|e| FrameError::Codec(e.to_string()))?;
    Ok(())
}

/// Exports a frame to a CSV file at the given path.
pub fn export_frame_csv(frame: &Frame, path: &Path) -> Result<(), FrameError> {
    let file = File::create(path)
        .map_err(|e| FrameError::Codec(format!("{}: {e}", path.display())))?;
    write_frame(frame, io::BufWriter::new(file))
}

/// Writes a significance matrix as CSV: a `model` column followed by one
/// column per model. Diagonal cells are empty.
///
/// # Errors
///
/// Returns an `io::Error` if writing fails.
pub fn write_matrix(matrix: &SignificanceMatrix, writer: impl Write) -> io::Result<()> {
    let mut wtr = csv::WriterBuilder::new().from_writer(writer);

    let mut header = vec!["model"];
    header.extend(matrix.models.iter().map(String::as_str));
    wtr.write_record(&header)?;

    for (row, model) in matrix.models.iter().enumerate() {
        let mut record = vec![model.clone()];
        record.extend(
            (0..matrix.models.len())
                .map(|column| matrix.get(row, column).map_or_else(String::new, |p| format!("{p:.6}"))),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush()?;
    Ok(())
}

/// Exports a significance matrix to a CSV file at the given path.
pub fn export_matrix_csv(matrix: &SignificanceMatrix, path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    write_matrix(matrix, io::BufWriter::new(file))
}
