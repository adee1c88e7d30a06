//! Artifact source port: Trait for obtaining a trained model artifact.
//!
//! This trait abstracts where the artifact lives (file, directory with signed
//! manifest, embedded bytes) from the scoring pipeline.

use crate::domain::{ConfigurationError, ModelArtifact, Schema};

/// Trait for loading a model artifact once at startup.
///
/// Implementations must validate the artifact against `schema`; every failure
/// is a `ConfigurationError` and should abort startup.
pub trait ArtifactSource {
    /// Load and validate the artifact.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if the artifact is missing, corrupt, fails an
    /// integrity check, or disagrees with the schema.
    fn load(&self, schema: &Schema) -> Result<ModelArtifact, ConfigurationError>;

    /// Human-readable location, for logs.
    fn describe(&self) -> String;
}

/// In-memory JSON bytes.
impl ArtifactSource for [u8] {
    fn load(&self, schema: &Schema) -> Result<ModelArtifact, ConfigurationError> {
        ModelArtifact::from_json(self, schema)
    }

    fn describe(&self) -> String {
        format!("<{} bytes in memory>", self.len())
    }
}
