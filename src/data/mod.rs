//! Data ingestion pipeline: raw file read, timestamp validation, and
//! comprehensive schema/domain validation
//!
//! Flow is strictly one-directional:
//! `RawRecordSet` → [`TimestampValidator`] → [`TimeIndexedTable`] →
//! [`DataValidator`] → [`ValidatedTable`]

pub mod errors;
pub mod timestamp;
pub mod validation;

// Re-export commonly used types
pub use errors::{PipelineError, PipelineResult};
pub use timestamp::{
    GapAnnotation, TimeIndexedTable, TimedRow, TimestampDiagnostics, TimestampValidator,
};
pub use validation::{
    Candle, DataValidator, DomainPolicy, HardViolationPolicy, ValidatedTable, ValidationPolicy,
    ValidationReport,
};

use std::path::Path;

/// Unvalidated tabular input as read from the source file.
///
/// No invariants are guaranteed: rows may be ragged, values are raw strings,
/// timestamps unparsed. Constructed once from a file read and consumed
/// immediately by the timestamp validator.
#[derive(Debug, Clone)]
pub struct RawRecordSet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl RawRecordSet {
    /// Read a headered CSV file into a raw record set.
    pub fn from_csv<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(path.as_ref())?;

        let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

        let mut rows = Vec::new();
        for record in reader.records() {
            let record = record?;
            rows.push(record.iter().map(|f| f.to_string()).collect());
        }

        if headers.is_empty() {
            return Err(PipelineError::integrity("source file has no header row"));
        }

        Ok(Self { headers, rows })
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of a column by case-insensitive name.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
    }
}
