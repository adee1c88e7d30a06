//! Static schema for the 13 clinical input fields.
//!
//! The schema is the single source of truth for field domains and encoding
//! order. Both the validator and the encoder read from it, and model artifacts
//! are checked against it at load time.

use std::fmt;
use std::str::FromStr;

/// One of the 13 raw clinical fields.
///
/// Discriminants follow the record (input file) column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    /// Age in years
    Age = 0,
    /// Sex (Female = 0, Male = 1)
    Sex = 1,
    /// Chest pain type (1-4)
    Cp = 2,
    /// Resting blood pressure in mm Hg
    Trestbps = 3,
    /// Serum cholesterol in mg/dl
    Chol = 4,
    /// Fasting blood sugar > 120 mg/dl
    Fbs = 5,
    /// Resting ECG result
    Restecg = 6,
    /// Maximum heart rate achieved
    Thalach = 7,
    /// Exercise induced angina
    Exang = 8,
    /// ST depression induced by exercise relative to rest
    Oldpeak = 9,
    /// Slope of the peak exercise ST segment
    Slope = 10,
    /// Number of major vessels colored by fluoroscopy
    Ca = 11,
    /// Thallium stress test result
    Thal = 12,
}

impl Field {
    /// All fields in record column order.
    pub const ALL: [Field; 13] = [
        Field::Age,
        Field::Sex,
        Field::Cp,
        Field::Trestbps,
        Field::Chol,
        Field::Fbs,
        Field::Restecg,
        Field::Thalach,
        Field::Exang,
        Field::Oldpeak,
        Field::Slope,
        Field::Ca,
        Field::Thal,
    ];

    /// Column name used in batch files and model artifacts.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Age => "age",
            Self::Sex => "sex",
            Self::Cp => "cp",
            Self::Trestbps => "trestbps",
            Self::Chol => "chol",
            Self::Fbs => "fbs",
            Self::Restecg => "restecg",
            Self::Thalach => "thalach",
            Self::Exang => "exang",
            Self::Oldpeak => "oldpeak",
            Self::Slope => "slope",
            Self::Ca => "ca",
            Self::Thal => "thal",
        }
    }

    /// Look up a field by its exact column name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

/// Numeric fields in encoded-vector order.
pub const NUMERIC_FIELDS: [Field; 5] = [
    Field::Age,
    Field::Trestbps,
    Field::Chol,
    Field::Thalach,
    Field::Oldpeak,
];

/// Categorical fields in encoded-vector order (after the numeric block).
pub const CATEGORICAL_FIELDS: [Field; 8] = [
    Field::Sex,
    Field::Cp,
    Field::Fbs,
    Field::Restecg,
    Field::Exang,
    Field::Slope,
    Field::Ca,
    Field::Thal,
];

/// Semantic domain of a field.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Closed interval `[min, max]`.
    Numeric { min: f64, max: f64 },
    /// Finite set of integer codes, listed in canonical one-hot order.
    Categorical { categories: &'static [i64] },
}

/// Field together with its declared domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub field: Field,
    pub kind: FieldKind,
}

/// Which set of numeric bounds to apply.
///
/// `Extended` widens `chol` to 100-600 and `oldpeak` to 0.0-10.0, matching
/// the wider intake form. Categorical domains are identical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeProfile {
    #[default]
    Standard,
    Extended,
}

impl FromStr for RangeProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "standard" => Ok(Self::Standard),
            "extended" => Ok(Self::Extended),
            other => Err(format!(
                "unknown range profile '{other}' (expected 'standard' or 'extended')"
            )),
        }
    }
}

impl fmt::Display for RangeProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard => f.write_str("standard"),
            Self::Extended => f.write_str("extended"),
        }
    }
}

const SEX: &[i64] = &[0, 1];
const CP: &[i64] = &[1, 2, 3, 4];
const BINARY: &[i64] = &[0, 1];
const RESTECG: &[i64] = &[0, 1, 2];
const SLOPE: &[i64] = &[1, 2, 3];
const CA: &[i64] = &[0, 1, 2, 3];
const THAL: &[i64] = &[3, 6, 7];

const fn range(min: f64, max: f64) -> FieldKind {
    FieldKind::Numeric { min, max }
}

/// Immutable field table.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    profile: RangeProfile,
    specs: [FieldSpec; 13],
}

impl Schema {
    /// Build the schema for a range profile.
    #[must_use]
    pub fn new(profile: RangeProfile) -> Self {
        let (chol_max, oldpeak_max) = match profile {
            RangeProfile::Standard => (400.0, 7.0),
            RangeProfile::Extended => (600.0, 10.0),
        };

        let kind = |field: Field| match field {
            Field::Age => range(18.0, 100.0),
            Field::Trestbps => range(80.0, 200.0),
            Field::Chol => range(100.0, chol_max),
            Field::Thalach => range(60.0, 220.0),
            Field::Oldpeak => range(0.0, oldpeak_max),
            Field::Sex => FieldKind::Categorical { categories: SEX },
            Field::Cp => FieldKind::Categorical { categories: CP },
            Field::Fbs | Field::Exang => FieldKind::Categorical { categories: BINARY },
            Field::Restecg => FieldKind::Categorical {
                categories: RESTECG,
            },
            Field::Slope => FieldKind::Categorical { categories: SLOPE },
            Field::Ca => FieldKind::Categorical { categories: CA },
            Field::Thal => FieldKind::Categorical { categories: THAL },
        };

        let specs = Field::ALL.map(|field| FieldSpec {
            field,
            kind: kind(field),
        });

        Self { profile, specs }
    }

    /// Schema with the standard bounds.
    #[must_use]
    pub fn standard() -> Self {
        Self::new(RangeProfile::Standard)
    }

    #[must_use]
    pub fn profile(&self) -> RangeProfile {
        self.profile
    }

    /// All field specs in record column order.
    #[must_use]
    pub fn fields(&self) -> &[FieldSpec] {
        &self.specs
    }

    #[must_use]
    pub fn spec(&self, field: Field) -> &FieldSpec {
        &self.specs[field.index()]
    }

    #[must_use]
    pub fn kind(&self, field: Field) -> FieldKind {
        self.spec(field).kind
    }

    /// Numeric fields in encoding order.
    #[must_use]
    pub fn numeric_fields(&self) -> &'static [Field] {
        &NUMERIC_FIELDS
    }

    /// Categorical fields in encoding order.
    #[must_use]
    pub fn categorical_fields(&self) -> &'static [Field] {
        &CATEGORICAL_FIELDS
    }

    /// Declared category set, or `None` for numeric fields.
    #[must_use]
    pub fn categories(&self, field: Field) -> Option<&'static [i64]> {
        match self.kind(field) {
            FieldKind::Categorical { categories } => Some(categories),
            FieldKind::Numeric { .. } => None,
        }
    }

    /// Canonical zero-based position of `value` within a categorical field.
    #[must_use]
    pub fn category_position(&self, field: Field, value: i64) -> Option<usize> {
        self.categories(field)?.iter().position(|&c| c == value)
    }

    /// Column names of a full one-hot layout (every declared category, first
    /// dropped). Artifacts trained on all categories produce exactly this.
    #[must_use]
    pub fn full_column_names(&self) -> Vec<String> {
        let numeric = NUMERIC_FIELDS.iter().map(|f| f.name().to_string());
        let categorical = CATEGORICAL_FIELDS.iter().flat_map(|&f| {
            self.categories(f)
                .unwrap_or(&[])
                .iter()
                .skip(1)
                .map(move |c| format!("{}_{c}", f.name()))
        });
        numeric.chain(categorical).collect()
    }
}

impl Default for Schema {
    fn default() -> Self {
        Self::standard()
    }
}
