//! Risk service: the explicit entry point to the scoring pipeline.
//!
//! This service coordinates:
//! - One-time artifact loading (startup)
//! - Single-record prediction (validate, encode, score)
//! - Batch prediction (column-range gate, per-record isolation)
//! - Reading and writing tabular batches through the ports
//!
//! The artifact is held behind an `Arc` and never mutated, so a service can be
//! cloned into worker threads, and several services with different artifacts
//! can coexist in one process.

use std::sync::Arc;

use crate::domain::{ModelArtifact, PatientRecord, PredictionResult, Schema, ValidationError};
use crate::ports::{ArtifactSource, RecordSource, ResultSink};
use crate::CardioriskError;

use super::batch::{BatchReport, BatchRunner};
use super::encoder::encode;
use super::scorer::score;
use super::validator::Validator;

/// Scoring service bound to one immutable artifact.
#[derive(Debug, Clone)]
pub struct RiskService {
    artifact: Arc<ModelArtifact>,
    schema: Schema,
    parallel: bool,
}

impl RiskService {
    /// Create a service around an already loaded artifact.
    #[must_use]
    pub fn new(artifact: Arc<ModelArtifact>, schema: Schema) -> Self {
        Self {
            artifact,
            schema,
            parallel: cfg!(feature = "parallel"),
        }
    }

    /// Load the artifact from `source` and build the service.
    ///
    /// # Errors
    /// Returns `CardioriskError::Configuration` if the artifact cannot be loaded
    /// or does not match the schema. Callers should treat this as fatal.
    pub fn initialize<S>(source: &S, schema: Schema) -> Result<Self, CardioriskError>
    where
        S: ArtifactSource + ?Sized,
    {
        tracing::info!("Loading model artifact from {}", source.describe());
        let artifact = source.load(&schema)?;
        tracing::info!(
            "Risk service ready: {} encoded columns, range profile {}",
            artifact.width(),
            schema.profile()
        );
        Ok(Self::new(Arc::new(artifact), schema))
    }

    /// Enable or disable parallel batch scoring.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    #[must_use]
    pub fn artifact(&self) -> &Arc<ModelArtifact> {
        &self.artifact
    }

    #[must_use]
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Score one record.
    ///
    /// Any failure is returned to the caller: validation errors list every
    /// offending field, and an encoding error is fatal for this record.
    ///
    /// # Errors
    /// Returns `CardioriskError::Validation`, `Encoding`, or `Configuration`.
    pub fn predict(&self, record: &PatientRecord) -> Result<PredictionResult, CardioriskError> {
        Validator::new(&self.schema).validate(record)?;

        tracing::debug!("Encoding record...");
        let vector = encode(record, &self.artifact)?;

        tracing::debug!("Scoring {} columns...", vector.len());
        let probability = score(&vector, &self.artifact)?;

        let result = PredictionResult::new(0, probability);
        tracing::debug!("Prediction complete: label={}", result.label);
        Ok(result)
    }

    /// Score a batch.
    ///
    /// # Errors
    /// Returns the aggregated `ValidationError` if the batch is rejected.
    pub fn predict_batch(&self, records: &[PatientRecord]) -> Result<BatchReport, ValidationError> {
        BatchRunner::new(&self.schema)
            .with_parallel(self.parallel)
            .run_batch(records, &self.artifact)
    }

    /// Read a batch from `source`, score it, and write the results to `sink`.
    ///
    /// Nothing is written if the batch is rejected.
    ///
    /// # Errors
    /// Returns `CardioriskError::Validation` for a rejected batch, or an I/O /
    /// format error from either port.
    pub fn score_table<R, W>(&self, source: &mut R, sink: &mut W) -> Result<BatchReport, CardioriskError>
    where
        R: RecordSource + ?Sized,
        W: ResultSink + ?Sized,
    {
        let table = source.read_table()?;
        tracing::info!("Read batch of {} record(s)", table.len());

        let report = self.predict_batch(&table.records)?;
        sink.write_results(&table, &report)?;

        tracing::info!(
            "Batch complete: {} scored, {} failed",
            report.scored_count(),
            report.len() - report.scored_count()
        );
        Ok(report)
    }
}
