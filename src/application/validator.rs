//! Record and batch validation against the schema.
//!
//! Single records are checked field by field. Batches are checked per numeric
//! column: the observed minimum and maximum must lie inside the declared
//! interval, otherwise the whole batch is rejected with one violation per
//! offending column. Categorical batch values are left to the encoder.

use crate::domain::{Constraint, Field, FieldKind, PatientRecord, Schema, ValidationError, Violation};

/// Success, or every violation found.
pub type ValidationOutcome = Result<(), ValidationError>;

/// Checks records against a schema. Collects all errors rather than stopping at the first.
#[derive(Debug, Clone, Copy)]
pub struct Validator<'a> {
    schema: &'a Schema,
}

impl<'a> Validator<'a> {
    #[must_use]
    pub fn new(schema: &'a Schema) -> Self {
        Self { schema }
    }

    /// Validate one record.
    ///
    /// # Errors
    /// Returns a `ValidationError` listing every field outside its domain.
    pub fn validate(&self, record: &PatientRecord) -> ValidationOutcome {
        let violations = self
            .schema
            .fields()
            .iter()
            .filter_map(|spec| check_value(spec.field, spec.kind, record))
            .collect();
        ValidationError::check(violations)
    }

    /// Validate a batch by numeric column range.
    ///
    /// An empty batch is valid.
    ///
    /// # Errors
    /// Returns a `ValidationError` with one `ColumnOutOfRange` per breached column.
    pub fn validate_batch(&self, records: &[PatientRecord]) -> ValidationOutcome {
        if records.is_empty() {
            return Ok(());
        }

        let mut violations = Vec::new();
        for &field in self.schema.numeric_fields() {
            let FieldKind::Numeric { min, max, .. } = self.schema.kind(field) else {
                continue;
            };
            let (observed_min, observed_max) = column_range(records, field);
            let inside = (min..=max).contains(&observed_min) && (min..=max).contains(&observed_max);
            if !inside {
                violations.push(Violation::new(
                    field,
                    Constraint::ColumnOutOfRange {
                        observed_min,
                        observed_max,
                        min,
                        max,
                    },
                ));
            }
        }

        if !violations.is_empty() {
            tracing::debug!(
                "Batch of {} rejected on {} column(s)",
                records.len(),
                violations.len()
            );
        }
        ValidationError::check(violations)
    }
}

fn check_value(field: Field, kind: FieldKind, record: &PatientRecord) -> Option<Violation> {
    match kind {
        FieldKind::Numeric { min, max, .. } => {
            let value = record.value(field);
            (!(min..=max).contains(&value))
                .then(|| Violation::new(field, Constraint::OutOfRange { value, min, max }))
        }
        FieldKind::Categorical { categories } => {
            let value = record.code(field)?;
            (!categories.contains(&value)).then(|| {
                Violation::new(
                    field,
                    Constraint::NotInCategorySet {
                        value,
                        allowed: categories,
                    },
                )
            })
        }
    }
}

/// Column minimum and maximum. A NaN anywhere makes both bounds NaN.
fn column_range(records: &[PatientRecord], field: Field) -> (f64, f64) {
    records
        .iter()
        .map(|r| r.value(field))
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
            if v.is_nan() || lo.is_nan() {
                (f64::NAN, f64::NAN)
            } else {
                (lo.min(v), hi.max(v))
            }
        })
}
