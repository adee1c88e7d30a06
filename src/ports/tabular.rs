//! Tabular port: Traits for batch input and output.
//!
//! A batch is delimited text with a header row. The original cells are kept
//! so results can be written back next to the input columns.

use crate::application::BatchReport;
use crate::domain::PatientRecord;

/// A parsed batch: raw cells plus typed records, row-aligned.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RecordTable {
    /// Header names as they appeared in the input
    pub headers: Vec<String>,
    /// Raw cells per row
    pub rows: Vec<Vec<String>>,
    /// Parsed records, one per row
    pub records: Vec<PatientRecord>,
}

impl RecordTable {
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Source of batch records.
pub trait RecordSource {
    /// Read the whole batch.
    ///
    /// # Errors
    /// Returns `CardioriskError::Validation` when columns are missing or cells
    /// cannot be parsed (all such problems together), or an I/O / format error.
    fn read_table(&mut self) -> crate::Result<RecordTable>;
}

/// Destination for scored batches.
pub trait ResultSink {
    /// Write every input row followed by its prediction columns.
    ///
    /// # Errors
    /// Returns an I/O / format error if writing fails.
    fn write_results(&mut self, table: &RecordTable, report: &BatchReport) -> crate::Result<()>;
}
