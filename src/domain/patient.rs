//! Patient record for heart-disease risk prediction.
//!
//! Fields follow the Cleveland heart-disease dataset. Categorical values are
//! kept as raw machine codes so out-of-domain input can be represented and
//! reported by the validator instead of being rejected at parse time.

use serde::{Deserialize, Deserializer};

use super::schema::Field;

/// One patient observation with the 13 raw clinical fields.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct PatientRecord {
    /// Age in years (18-100)
    #[serde(deserialize_with = "integral")]
    pub age: i64,

    /// Sex code: 0 = female, 1 = male
    #[serde(deserialize_with = "integral")]
    pub sex: i64,

    /// Chest pain type (1 typical angina .. 4 asymptomatic)
    #[serde(deserialize_with = "integral")]
    pub cp: i64,

    /// Resting blood pressure in mm Hg (80-200)
    #[serde(deserialize_with = "integral")]
    pub trestbps: i64,

    /// Serum cholesterol in mg/dl (100-400, or 100-600 in the extended profile)
    #[serde(deserialize_with = "integral")]
    pub chol: i64,

    /// Fasting blood sugar > 120 mg/dl: 0 = no, 1 = yes
    #[serde(deserialize_with = "integral")]
    pub fbs: i64,

    /// Resting ECG: 0 normal, 1 ST-T abnormality, 2 LV hypertrophy
    #[serde(deserialize_with = "integral")]
    pub restecg: i64,

    /// Maximum heart rate achieved (60-220)
    #[serde(deserialize_with = "integral")]
    pub thalach: i64,

    /// Exercise induced angina: 0 = no, 1 = yes
    #[serde(deserialize_with = "integral")]
    pub exang: i64,

    /// ST depression (0.0-7.0, or 0.0-10.0 in the extended profile)
    pub oldpeak: f64,

    /// Slope of peak exercise ST segment (1-3)
    #[serde(deserialize_with = "integral")]
    pub slope: i64,

    /// Major vessels colored by fluoroscopy (0-3)
    #[serde(deserialize_with = "integral")]
    pub ca: i64,

    /// Thallium result: 3 normal, 6 fixed defect, 7 reversible defect
    #[serde(deserialize_with = "integral")]
    pub thal: i64,
}

impl PatientRecord {
    /// Numeric view of a field, as used by range checks and standardization.
    #[must_use]
    pub fn value(&self, field: Field) -> f64 {
        match field {
            Field::Oldpeak => self.oldpeak,
            other => self.code(other).map_or(f64::NAN, |c| c as f64),
        }
    }

    /// Integer code of a field. `None` only for `oldpeak`, the one real-valued field.
    #[must_use]
    pub fn code(&self, field: Field) -> Option<i64> {
        let code = match field {
            Field::Age => self.age,
            Field::Sex => self.sex,
            Field::Cp => self.cp,
            Field::Trestbps => self.trestbps,
            Field::Chol => self.chol,
            Field::Fbs => self.fbs,
            Field::Restecg => self.restecg,
            Field::Thalach => self.thalach,
            Field::Exang => self.exang,
            Field::Oldpeak => return None,
            Field::Slope => self.slope,
            Field::Ca => self.ca,
            Field::Thal => self.thal,
        };
        Some(code)
    }

    /// Decoded sex, if the code is one of the two defined values.
    #[must_use]
    pub fn sex(&self) -> Option<Sex> {
        Sex::from_code(self.sex)
    }
}

/// Sex as recorded in the dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sex {
    Female,
    Male,
}

impl Sex {
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::Female => 0,
            Self::Male => 1,
        }
    }

    #[must_use]
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::Female),
            1 => Some(Self::Male),
            _ => None,
        }
    }
}

/// Parse an integer code, accepting integral float spellings such as `"63.0"`.
///
/// Exported clinical datasets frequently write every column as a float.
#[must_use]
pub fn parse_code(raw: &str) -> Option<i64> {
    let raw = raw.trim();
    if let Ok(v) = raw.parse::<i64>() {
        return Some(v);
    }
    raw.parse::<f64>().ok().and_then(integral_f64)
}

fn integral_f64(v: f64) -> Option<i64> {
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if v.is_finite() && v.fract() == 0.0 && v >= i64::MIN as f64 && v < i64::MAX as f64 {
        Some(v as i64)
    } else {
        None
    }
}

fn integral<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = f64::deserialize(deserializer)?;
    integral_f64(v).ok_or_else(|| serde::de::Error::custom(format!("expected an integer code, got {v}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> PatientRecord {
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

    #[test]
    fn test_value_and_code_views() {
        let r = sample();
        assert_eq!(r.code(Field::Chol), Some(180));
        assert_eq!(r.code(Field::Oldpeak), None);
        assert!((r.value(Field::Thalach) - 170.0).abs() < f64::EPSILON);
        assert!((r.value(Field::Oldpeak) - 0.0).abs() < f64::EPSILON);
        assert_eq!(r.sex(), Some(Sex::Male));
    }

    #[test]
    fn test_parse_code_accepts_integral_floats() {
        assert_eq!(parse_code("63"), Some(63));
        assert_eq!(parse_code(" 63.0 "), Some(63));
        assert_eq!(parse_code("-1"), Some(-1));
        assert_eq!(parse_code("2.5"), None);
        assert_eq!(parse_code("?"), None);
        assert_eq!(parse_code("NaN"), None);
        assert_eq!(parse_code(""), None);
    }

    #[test]
    fn test_deserialize_from_json() {
        let json = r#"{"age":52.0,"sex":1,"cp":3,"trestbps":130,"chol":180,"fbs":0,
            "restecg":0,"thalach":170,"exang":0,"oldpeak":0.0,"slope":1,"ca":0,"thal":3}"#;
        let r: PatientRecord = serde_json::from_str(json).expect("Should parse");
        assert_eq!(r, sample());
    }

    #[test]
    fn test_deserialize_rejects_fractional_code() {
        let json = r#"{"age":52.5,"sex":1,"cp":3,"trestbps":130,"chol":180,"fbs":0,
            "restecg":0,"thalach":170,"exang":0,"oldpeak":0.0,"slope":1,"ca":0,"thal":3}"#;
        let err = serde_json::from_str::<PatientRecord>(json).expect_err("must fail");
        assert!(err.to_string().contains("integer code"));
    }

    #[test]
    fn test_sex_codes() {
        assert_eq!(Sex::from_code(0), Some(Sex::Female));
        assert_eq!(Sex::Male.code(), 1);
        assert_eq!(Sex::from_code(2), None);
    }
}
