//! # Cardiorisk
//!
//! Heart-disease risk scoring from thirteen clinical attributes.
//!
//! This crate provides:
//! - Schema-driven validation of patient records, one at a time or as a batch
//! - Feature encoding (standardization + one-hot) against an immutable model artifact
//! - Logistic scoring with a fixed `>= 0.5` decision threshold
//! - CSV batch input/output and a signed on-disk artifact format
//!
//! ## Architecture
//!
//! The crate follows Hexagonal Architecture:
//! - `domain`: Core types (Schema, PatientRecord, ModelArtifact, PredictionResult)
//! - `ports`: Trait definitions for artifact loading and tabular I/O
//! - `adapters`: Concrete implementations (artifact files, CSV)
//! - `application`: The Validator -> Encoder -> Scorer pipeline and batch runner
//! - `config`: Environment-driven runtime settings

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;

pub use application::{BatchReport, BatchRunner, RiskService, Validator};
pub use domain::{
    ConfigurationError, EncodingError, Label, ModelArtifact, PatientRecord, PredictionResult,
    RangeProfile, Schema, ValidationError,
};

/// Result type for Cardiorisk operations
pub type Result<T> = std::result::Result<T, CardioriskError>;

/// Main error type for Cardiorisk
#[derive(Debug, thiserror::Error)]
pub enum CardioriskError {
    #[error("Invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("Encoding failed: {0}")]
    Encoding(#[from] EncodingError),

    #[error("Model configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::domain::{ModelArtifact, PatientRecord, Schema};

    /// The bundled model artifact.
    pub const FIXTURE_JSON: &[u8] = include_bytes!("../models/heart_model.json");

    pub fn fixture_artifact() -> ModelArtifact {
        ModelArtifact::from_json(FIXTURE_JSON, &Schema::standard()).expect("fixture artifact is valid")
    }

    /// Low-risk reference patient (p ~ 0.0586 against the bundled artifact).
    pub fn reference_record() -> PatientRecord {
        PatientRecord {
            age: 52,
            sex: 1,
            cp: 3,
            trestbps: 130,
            chol: 180,
            fbs: 0,
            restecg: 0,
            thalach: 170,
            exang: 0,
            oldpeak: 0.0,
            slope: 1,
            ca: 0,
            thal: 3,
        }
    }
}
