//! Error taxonomy for the scoring pipeline.
//!
//! - [`ValidationError`]: input violates the declared domain. Recoverable; all
//!   violations are reported together.
//! - [`EncodingError`]: a domain-valid value has no column in the model's trained
//!   mapping. Per-record in batch mode, fatal for a single record.
//! - [`ConfigurationError`]: the model artifact disagrees with the schema or is
//!   unreadable. Fatal at startup.

use std::fmt;

use super::schema::Field;

/// The constraint a field or column violated.
#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// A single value fell outside the declared closed interval.
    OutOfRange { value: f64, min: f64, max: f64 },
    /// A categorical code is not in the declared set.
    NotInCategorySet { value: i64, allowed: &'static [i64] },
    /// The observed column range of a batch breaches the declared interval.
    ColumnOutOfRange {
        observed_min: f64,
        observed_max: f64,
        min: f64,
        max: f64,
    },
    /// A required column is absent from the batch header.
    MissingColumn,
    /// A cell could not be parsed as the field's type. `row` is 1-based.
    Unparseable { row: usize, raw: String },
}

/// One field-level problem.
#[derive(Debug, Clone, PartialEq)]
pub struct Violation {
    pub field: Field,
    pub constraint: Constraint,
}

impl Violation {
    #[must_use]
    pub fn new(field: Field, constraint: Constraint) -> Self {
        Self { field, constraint }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let field = self.field;
        match &self.constraint {
            Constraint::OutOfRange { value, min, max } => {
                write!(f, "{field}: {value} out of range [{min}, {max}]")
            }
            Constraint::NotInCategorySet { value, allowed } => {
                write!(f, "{field}: {value} must be one of {allowed:?}")
            }
            Constraint::ColumnOutOfRange {
                observed_min,
                observed_max,
                min,
                max,
            } => write!(
                f,
                "{field}: column values span [{observed_min}, {observed_max}], allowed [{min}, {max}]"
            ),
            Constraint::MissingColumn => write!(f, "{field}: required column is missing"),
            Constraint::Unparseable { row, raw } => {
                write!(f, "{field}: row {row}: cannot parse '{raw}'")
            }
        }
    }
}

/// Every violation found in a record or batch.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{} validation error(s): {}", .violations.len(), join(.violations))]
pub struct ValidationError {
    violations: Vec<Violation>,
}

fn join(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl ValidationError {
    /// Wrap collected violations. Returns `Ok(())` when there are none.
    ///
    /// # Errors
    /// Returns the violations as a `ValidationError` if the list is non-empty.
    pub fn check(violations: Vec<Violation>) -> Result<(), Self> {
        if violations.is_empty() {
            Ok(())
        } else {
            Err(Self { violations })
        }
    }

    #[must_use]
    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }

    /// Fields named by the violations, in report order (may repeat).
    #[must_use]
    pub fn fields(&self) -> Vec<Field> {
        self.violations.iter().map(|v| v.field).collect()
    }
}

/// A domain-valid value the artifact cannot encode.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EncodingError {
    #[error("{field}: category {value} has no column in the trained mapping")]
    UnmappedCategory { field: Field, value: i64 },

    #[error("{field}: standardization divisor {std} is degenerate")]
    DegenerateScale { field: Field, std: f64 },
}

/// The model artifact is unusable with this schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Cannot read model artifact: {0}")]
    Unreadable(String),

    #[error("Unsupported artifact format version {found} (expected {expected})")]
    UnsupportedVersion { found: u32, expected: u32 },

    #[error("Artifact {section} fields {found:?} do not match schema order {expected:?}")]
    FieldOrder {
        section: &'static str,
        expected: Vec<String>,
        found: Vec<String>,
    },

    #[error("Artifact statistics for {field} are invalid: {detail}")]
    InvalidStatistic { field: Field, detail: String },

    #[error("Artifact category table for {field} is invalid: {detail}")]
    CategoryTable { field: Field, detail: String },

    #[error("Artifact column {position} is '{found}', expected '{expected}'")]
    ColumnMismatch {
        position: usize,
        expected: String,
        found: String,
    },

    #[error("{what} length mismatch: expected {expected}, got {actual}")]
    LengthMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("Artifact parameter {0} is not finite")]
    NonFinite(String),

    #[error("Artifact integrity check failed: {0}")]
    Integrity(String),

    #[error("Invalid setting {name}: {detail}")]
    Setting { name: String, detail: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_empty_is_ok() {
        assert!(ValidationError::check(Vec::new()).is_ok());
    }

    #[test]
    fn test_display_lists_every_violation() {
        let err = ValidationError::check(vec![
            Violation::new(
                Field::Age,
                Constraint::OutOfRange {
                    value: 17.0,
                    min: 18.0,
                    max: 100.0,
                },
            ),
            Violation::new(
                Field::Thal,
                Constraint::NotInCategorySet {
                    value: 5,
                    allowed: &[3, 6, 7],
                },
            ),
        ])
        .expect_err("must fail");

        let msg = err.to_string();
        assert!(msg.starts_with("2 validation error(s)"));
        assert!(msg.contains("age: 17 out of range [18, 100]"));
        assert!(msg.contains("thal: 5 must be one of [3, 6, 7]"));
        assert_eq!(err.fields(), vec![Field::Age, Field::Thal]);
    }

    #[test]
    fn test_encoding_error_names_field() {
        let err = EncodingError::UnmappedCategory {
            field: Field::Restecg,
            value: 1,
        };
        assert_eq!(
            err.to_string(),
            "restecg: category 1 has no column in the trained mapping"
        );
    }
}
