//! Frame codecs: Parquet for the wire, CSV for files on disk.

pub mod csv;
pub mod parquet;
