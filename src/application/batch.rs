//! Batch scoring: Validator -> Encoder -> Scorer over many records.
//!
//! The batch is validated once as a whole. If that fails nothing is scored.
//! Otherwise each record is encoded and scored independently, and a failure on
//! one record is attached to that record without affecting the others.
//!
//! With the `parallel` feature, records are scored on the rayon pool. Output
//! order is by input index either way.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::domain::{
    ConfigurationError, EncodingError, ModelArtifact, PatientRecord, PredictionResult, Schema,
    ValidationError,
};

use super::encoder::encode;
use super::scorer::score;
use super::validator::Validator;

/// Why a single record could not be scored.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RecordFailure {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Scoring(#[from] ConfigurationError),
}

/// Per-record failure with its input position.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("row {row}: {failure}")]
pub struct RecordError {
    /// Zero-based index of the record in the batch
    pub row: usize,
    pub failure: RecordFailure,
}

/// Outcome of one record in an accepted batch.
pub type RecordOutcome = Result<PredictionResult, RecordError>;

/// Outcomes of an accepted batch, parallel to the input.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BatchReport {
    outcomes: Vec<RecordOutcome>,
}

impl BatchReport {
    #[must_use]
    pub fn outcomes(&self) -> &[RecordOutcome] {
        &self.outcomes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    /// Successful predictions in input order.
    pub fn predictions(&self) -> impl Iterator<Item = &PredictionResult> {
        self.outcomes.iter().filter_map(|o| o.as_ref().ok())
    }

    /// Per-record failures in input order.
    pub fn failures(&self) -> impl Iterator<Item = &RecordError> {
        self.outcomes.iter().filter_map(|o| o.as_ref().err())
    }

    #[must_use]
    pub fn scored_count(&self) -> usize {
        self.predictions().count()
    }
}

/// Runs validation and scoring over a batch.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner<'a> {
    validator: Validator<'a>,
    parallel: bool,
}

impl<'a> BatchRunner<'a> {
    /// Create a runner. Parallel scoring is on when the `parallel` feature is enabled.
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self {
            validator: Validator::new(schema),
            parallel: cfg!(feature = "parallel"),
        }
    }

    /// Enable or disable parallel scoring. Has no effect without the `parallel` feature.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Validate the batch, then encode and score every record.
    ///
    /// # Errors
    /// Returns the aggregated `ValidationError` if the batch is rejected; in that
    /// case no record is scored.
    pub fn run_batch(
        &self,
        records: &[PatientRecord],
        artifact: &ModelArtifact,
    ) -> Result<BatchReport, ValidationError> {
        self.validator.validate_batch(records)?;

        let outcomes = self.score_all(records, artifact);
        let report = BatchReport { outcomes };

        let failed = report.len() - report.scored_count();
        if failed > 0 {
            tracing::warn!("Batch scored with {} of {} record(s) failing", failed, report.len());
        } else {
            tracing::debug!("Batch scored: {} record(s)", report.len());
        }

        Ok(report)
    }

    #[cfg(feature = "parallel")]
    fn score_all(&self, records: &[PatientRecord], artifact: &ModelArtifact) -> Vec<RecordOutcome> {
        if self.parallel {
            records
                .par_iter()
                .enumerate()
                .map(|(row, record)| score_record(row, record, artifact))
                .collect()
        } else {
            score_sequential(records, artifact)
        }
    }

    #[cfg(not(feature = "parallel"))]
    fn score_all(&self, records: &[PatientRecord], artifact: &ModelArtifact) -> Vec<RecordOutcome> {
        score_sequential(records, artifact)
    }
}

fn score_sequential(records: &[PatientRecord], artifact: &ModelArtifact) -> Vec<RecordOutcome> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| score_record(row, record, artifact))
        .collect()
}

fn score_record(row: usize, record: &PatientRecord, artifact: &ModelArtifact) -> RecordOutcome {
    let attach = |failure: RecordFailure| RecordError { row, failure };

    let vector = encode(record, artifact).map_err(|e| attach(e.into()))?;
    let probability = score(&vector, artifact).map_err(|e| attach(e.into()))?;
    Ok(PredictionResult::new(row, probability))
}
