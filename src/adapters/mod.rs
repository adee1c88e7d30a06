//! Adapters layer: Concrete implementations of ports.
//!
//! These modules contain the actual integration with the outside world:
//! - `artifact_file`: model artifact on disk, with optional signed manifest
//! - `csv_table`: CSV batch input and scored output

pub mod artifact_file;
pub mod csv_table;

pub use artifact_file::{decode_verifying_key, ArtifactFile};
pub use csv_table::{CsvRecordSource, CsvResultSink};
