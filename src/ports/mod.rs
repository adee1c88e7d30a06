//! Ports layer: Trait definitions for external operations.
//!
//! Following Hexagonal Architecture, these traits define the boundaries
//! between the scoring pipeline and its inputs and outputs (artifact storage,
//! tabular batch files).

mod artifact_source;
mod tabular;

pub use artifact_source::ArtifactSource;
pub use tabular::{RecordSource, RecordTable, ResultSink};
