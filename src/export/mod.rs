//! Result sinks: CSV accumulation and spreadsheet export.

pub mod csv;
pub mod xlsx;
