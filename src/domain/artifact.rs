//! Trained model artifact.
//!
//! The artifact is produced once by the offline training process and is
//! immutable after load. It carries the standardization statistics, the
//! one-hot category tables, and the linear model parameters, all in the exact
//! column order the encoder reproduces.
//!
//! [`ModelArtifact::from_document`] is the only way to build one, and it
//! rejects anything that disagrees with the [`Schema`]. A loaded artifact can
//! therefore be encoded against without further shape checks.

use std::collections::HashSet;
use std::ops::Range;

use serde::{Deserialize, Serialize};

use super::error::ConfigurationError;
use super::schema::{Field, Schema};

/// Serialized artifact layout (JSON).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactDocument {
    pub format_version: u32,
    pub numeric: Vec<NumericStatsDoc>,
    pub categorical: Vec<CategoryTableDoc>,
    pub columns: Vec<String>,
    pub weights: Vec<f64>,
    pub bias: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericStatsDoc {
    pub name: String,
    pub mean: f64,
    pub std: f64,
}

/// Ordered categories of one field. The first entry is the dropped reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryTableDoc {
    pub name: String,
    pub categories: Vec<i64>,
}

/// Mean and standard deviation of one numeric field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Standardization {
    pub field: Field,
    pub mean: f64,
    pub std: f64,
}

impl Standardization {
    #[must_use]
    pub fn apply(&self, value: f64) -> f64 {
        (value - self.mean) / self.std
    }
}

/// Category-to-column table of one categorical field.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryMapping {
    pub field: Field,
    categories: Vec<i64>,
}

impl CategoryMapping {
    /// All categories, reference first.
    #[must_use]
    pub fn categories(&self) -> &[i64] {
        &self.categories
    }

    /// The dropped reference category (encoded as an all-zero block).
    #[must_use]
    pub fn reference(&self) -> i64 {
        self.categories[0]
    }

    /// Index of `value` in the table, reference = 0.
    #[must_use]
    pub fn index_of(&self, value: i64) -> Option<usize> {
        self.categories.iter().position(|&c| c == value)
    }

    /// Number of encoded columns (category count minus the reference).
    #[must_use]
    pub fn width(&self) -> usize {
        self.categories.len() - 1
    }

    fn column_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories
            .iter()
            .skip(1)
            .map(move |c| format!("{}_{c}", self.field.name()))
    }
}

/// Validated, immutable model parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelArtifact {
    numeric: Vec<Standardization>,
    categorical: Vec<CategoryMapping>,
    columns: Vec<String>,
    weights: Vec<f64>,
    bias: f64,
}

impl ModelArtifact {
    /// Artifact format version understood by this build.
    pub const FORMAT_VERSION: u32 = 1;

    /// Parse and validate an artifact from JSON bytes.
    ///
    /// # Errors
    /// Returns `ConfigurationError` if the bytes are not a valid artifact document
    /// or the document disagrees with `schema`.
    pub fn from_json(bytes: &[u8], schema: &Schema) -> Result<Self, ConfigurationError> {
        let doc: ArtifactDocument = serde_json::from_slice(bytes)
            .map_err(|e| ConfigurationError::Unreadable(format!("invalid artifact JSON: {e}")))?;
        Self::from_document(doc, schema)
    }

    /// Validate a document against the schema.
    ///
    /// # Errors
    /// Returns `ConfigurationError` describing the first inconsistency found.
    pub fn from_document(doc: ArtifactDocument, schema: &Schema) -> Result<Self, ConfigurationError> {
        if doc.format_version != Self::FORMAT_VERSION {
            return Err(ConfigurationError::UnsupportedVersion {
                found: doc.format_version,
                expected: Self::FORMAT_VERSION,
            });
        }

        check_field_order(
            "numeric",
            schema.numeric_fields(),
            doc.numeric.iter().map(|n| n.name.as_str()),
        )?;
        check_field_order(
            "categorical",
            schema.categorical_fields(),
            doc.categorical.iter().map(|c| c.name.as_str()),
        )?;

        let numeric = schema
            .numeric_fields()
            .iter()
            .zip(doc.numeric)
            .map(|(&field, stats)| {
                if !stats.mean.is_finite() {
                    return Err(ConfigurationError::InvalidStatistic {
                        field,
                        detail: format!("mean {} is not finite", stats.mean),
                    });
                }
                if !(stats.std.is_finite() && stats.std > 0.0) {
                    return Err(ConfigurationError::InvalidStatistic {
                        field,
                        detail: format!("std {} must be finite and > 0", stats.std),
                    });
                }
                Ok(Standardization {
                    field,
                    mean: stats.mean,
                    std: stats.std,
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let categorical = schema
            .categorical_fields()
            .iter()
            .zip(doc.categorical)
            .map(|(&field, table)| check_category_table(schema, field, table.categories))
            .collect::<Result<Vec<_>, _>>()?;

        let expected_columns: Vec<String> = numeric
            .iter()
            .map(|s| s.field.name().to_string())
            .chain(categorical.iter().flat_map(CategoryMapping::column_names))
            .collect();

        for (position, (expected, found)) in expected_columns.iter().zip(&doc.columns).enumerate() {
            if expected != found {
                return Err(ConfigurationError::ColumnMismatch {
                    position,
                    expected: expected.clone(),
                    found: found.clone(),
                });
            }
        }
        if doc.columns.len() != expected_columns.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "column list",
                expected: expected_columns.len(),
                actual: doc.columns.len(),
            });
        }
        if doc.weights.len() != expected_columns.len() {
            return Err(ConfigurationError::LengthMismatch {
                what: "weight vector",
                expected: expected_columns.len(),
                actual: doc.weights.len(),
            });
        }
        if let Some(i) = doc.weights.iter().position(|w| !w.is_finite()) {
            return Err(ConfigurationError::NonFinite(format!(
                "weight for '{}'",
                expected_columns[i]
            )));
        }
        if !doc.bias.is_finite() {
            return Err(ConfigurationError::NonFinite("bias".into()));
        }

        Ok(Self {
            numeric,
            categorical,
            columns: expected_columns,
            weights: doc.weights,
            bias: doc.bias,
        })
    }

    /// Convert back into the serialized layout.
    #[must_use]
    pub fn to_document(&self) -> ArtifactDocument {
        ArtifactDocument {
            format_version: Self::FORMAT_VERSION,
            numeric: self
                .numeric
                .iter()
                .map(|s| NumericStatsDoc {
                    name: s.field.name().to_string(),
                    mean: s.mean,
                    std: s.std,
                })
                .collect(),
            categorical: self
                .categorical
                .iter()
                .map(|m| CategoryTableDoc {
                    name: m.field.name().to_string(),
                    categories: m.categories.clone(),
                })
                .collect(),
            columns: self.columns.clone(),
            weights: self.weights.clone(),
            bias: self.bias,
        }
    }

    /// Standardization statistics in encoding order.
    #[must_use]
    pub fn numeric(&self) -> &[Standardization] {
        &self.numeric
    }

    /// Category tables in encoding order.
    #[must_use]
    pub fn categorical(&self) -> &[CategoryMapping] {
        &self.categorical
    }

    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Length of the encoded vector.
    #[must_use]
    pub fn width(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    #[must_use]
    pub fn bias(&self) -> f64 {
        self.bias
    }

    #[must_use]
    pub fn mapping(&self, field: Field) -> Option<&CategoryMapping> {
        self.categorical.iter().find(|m| m.field == field)
    }

    /// Encoded column range occupied by a categorical field's one-hot block.
    #[must_use]
    pub fn column_range(&self, field: Field) -> Option<Range<usize>> {
        let mut start = self.numeric.len();
        for mapping in &self.categorical {
            if mapping.field == field {
                return Some(start..start + mapping.width());
            }
            start += mapping.width();
        }
        None
    }
}

fn check_field_order<'a>(
    section: &'static str,
    expected: &[Field],
    found: impl Iterator<Item = &'a str>,
) -> Result<(), ConfigurationError> {
    let found: Vec<String> = found.map(str::to_string).collect();
    let matches = found.len() == expected.len()
        && expected.iter().zip(&found).all(|(f, name)| f.name() == name);
    if matches {
        Ok(())
    } else {
        Err(ConfigurationError::FieldOrder {
            section,
            expected: expected.iter().map(|f| f.name().to_string()).collect(),
            found,
        })
    }
}

fn check_category_table(
    schema: &Schema,
    field: Field,
    categories: Vec<i64>,
) -> Result<CategoryMapping, ConfigurationError> {
    let invalid = |detail: String| ConfigurationError::CategoryTable { field, detail };

    if categories.is_empty() {
        return Err(invalid("no categories".into()));
    }

    let mut seen = HashSet::new();
    let mut last_position = None;
    for &c in &categories {
        if !seen.insert(c) {
            return Err(invalid(format!("duplicate category {c}")));
        }
        let position = schema
            .category_position(field, c)
            .ok_or_else(|| invalid(format!("category {c} is outside the declared set")))?;
        // Categories must appear in canonical schema order.
        if last_position.is_some_and(|last| position < last) {
            return Err(invalid(format!("category {c} is out of canonical order")));
        }
        last_position = Some(position);
    }

    Ok(CategoryMapping { field, categories })
}
