//! Domain layer: Core business types.
//!
//! This module contains pure Rust types with no I/O. The schema is the
//! single source of truth for field domains and encoding order.

pub mod artifact;
mod error;
mod patient;
mod prediction;
pub mod schema;

pub use artifact::{CategoryMapping, ModelArtifact, Standardization};
pub use error::{ConfigurationError, Constraint, EncodingError, ValidationError, Violation};
pub use patient::{parse_code, PatientRecord, Sex};
pub use prediction::{Label, PredictionResult, DECISION_THRESHOLD};
pub use schema::{Field, FieldKind, FieldSpec, RangeProfile, Schema};
