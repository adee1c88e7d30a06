//! Feature encoding: raw record to the model's numeric vector.
//!
//! Layout: standardized numeric block (`age, trestbps, chol, thalach, oldpeak`)
//! followed by one one-hot block per categorical field, each with its reference
//! category dropped. The artifact fixes both order and width.
//!
//! Encoding is pure: identical record and artifact give bit-identical output.

use crate::domain::{EncodingError, Field, ModelArtifact, PatientRecord};

/// Encoded feature vector, one value per artifact column.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedVector(Vec<f64>);

impl EncodedVector {
    #[must_use]
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<f64> {
        self.0
    }
}

impl From<Vec<f64>> for EncodedVector {
    fn from(values: Vec<f64>) -> Self {
        Self(values)
    }
}

/// Encode a record that has already passed validation.
///
/// # Errors
/// Returns `EncodingError::UnmappedCategory` if a categorical value has no entry
/// in the artifact's category table, or `EncodingError::DegenerateScale` if a
/// standard deviation cannot be divided by.
pub fn encode(record: &PatientRecord, artifact: &ModelArtifact) -> Result<EncodedVector, EncodingError> {
    let mut out = Vec::with_capacity(artifact.width());

    for stats in artifact.numeric() {
        if !(stats.std.is_finite() && stats.std != 0.0) {
            return Err(EncodingError::DegenerateScale {
                field: stats.field,
                std: stats.std,
            });
        }
        out.push(stats.apply(record.value(stats.field)));
    }

    for mapping in artifact.categorical() {
        let field = mapping.field;
        let value = record.code(field).ok_or(EncodingError::UnmappedCategory {
            field,
            value: record.value(field) as i64,
        })?;
        let index = mapping
            .index_of(value)
            .ok_or(EncodingError::UnmappedCategory { field, value })?;

        let start = out.len();
        out.resize(start + mapping.width(), 0.0);
        if index > 0 {
            out[start + index - 1] = 1.0;
        }
    }

    debug_assert_eq!(out.len(), artifact.width());
    Ok(EncodedVector(out))
}

/// Recover the category of `field` from its one-hot block.
///
/// Returns `None` if `field` is not categorical or the block is not a valid
/// one-hot pattern (more than one set column, or a value other than 0/1).
#[must_use]
pub fn decode_category(vector: &EncodedVector, artifact: &ModelArtifact, field: Field) -> Option<i64> {
    let mapping = artifact.mapping(field)?;
    let block = vector.as_slice().get(artifact.column_range(field)?)?;

    let mut hot = None;
    for (i, &v) in block.iter().enumerate() {
        if v == 1.0 {
            if hot.is_some() {
                return None;
            }
            hot = Some(i);
        } else if v != 0.0 {
            return None;
        }
    }

    match hot {
        Some(i) => mapping.categories().get(i + 1).copied(),
        None => Some(mapping.reference()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ModelArtifact, Schema};
    use crate::test_support::{fixture_artifact, reference_record};

    #[test]
    fn test_reference_record_layout() {
        let artifact = fixture_artifact();
        let v = encode(&reference_record(), &artifact).expect("Should encode");
        assert_eq!(v.len(), 20);

        // age: (52 - 54.438944) / 9.023722
        let expected_age: f64 = (52.0 - 54.438944) / 9.023722;
        assert_eq!(v.as_slice()[0].to_bits(), expected_age.to_bits());

        // sex=1 -> sex_1 set; cp=3 -> cp_3 set; everything else reference.
        let onehot = &v.as_slice()[5..];
        let mut expected = [0.0; 15];
        expected[0] = 1.0; // sex_1
        expected[2] = 1.0; // cp_3
        assert_eq!(onehot, &expected);
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let artifact = fixture_artifact();
        let a = encode(&reference_record(), &artifact).expect("Should encode");
        let b = encode(&reference_record(), &artifact).expect("Should encode");
        let bits = |v: &EncodedVector| v.as_slice().iter().map(|x| x.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn test_reference_category_is_all_zero() {
        let artifact = fixture_artifact();
        let r = PatientRecord {
            thal: 3,
            ..reference_record()
        };
        let v = encode(&r, &artifact).expect("Should encode");
        let range = artifact.column_range(Field::Thal).expect("categorical");
        assert!(v.as_slice()[range].iter().all(|&x| x == 0.0));
    }

    #[test]
    fn test_decode_recovers_every_mapped_category() {
        let artifact = fixture_artifact();
        let schema = Schema::standard();

        for &field in schema.categorical_fields() {
            let mapping = artifact.mapping(field).expect("mapped");
            for &category in mapping.categories() {
                let mut r = reference_record();
                set_code(&mut r, field, category);
                let v = encode(&r, &artifact).expect("Should encode");
                assert_eq!(decode_category(&v, &artifact, field), Some(category), "{field}");
            }
        }
    }

    #[test]
    fn test_decode_rejects_invalid_block() {
        let artifact = fixture_artifact();
        let mut values = encode(&reference_record(), &artifact)
            .expect("Should encode")
            .into_inner();
        // cp block = 6..9: set two columns.
        values[6] = 1.0;
        values[7] = 1.0;
        let v = EncodedVector::from(values);
        assert_eq!(decode_category(&v, &artifact, Field::Cp), None);
        assert_eq!(decode_category(&v, &artifact, Field::Age), None);
    }

    #[test]
    fn test_unmapped_category_is_encoding_error() {
        // Artifact trained without restecg = 1 (domain-valid, but no column).
        let schema = Schema::standard();
        let mut doc = fixture_artifact().to_document();
        doc.categorical[3].categories = vec![0, 2];
        doc.columns.retain(|c| c != "restecg_1");
        doc.weights.remove(10);
        let artifact = ModelArtifact::from_document(doc, &schema).expect("valid");

        let r = PatientRecord {
            restecg: 1,
            ..reference_record()
        };
        let err = encode(&r, &artifact).expect_err("must fail");
        assert_eq!(
            err,
            EncodingError::UnmappedCategory {
                field: Field::Restecg,
                value: 1
            }
        );
    }

    #[test]
    fn test_out_of_domain_category_is_encoding_error() {
        let artifact = fixture_artifact();
        let r = PatientRecord {
            cp: 9,
            ..reference_record()
        };
        assert!(matches!(
            encode(&r, &artifact),
            Err(EncodingError::UnmappedCategory { field: Field::Cp, value: 9 })
        ));
    }

    fn set_code(r: &mut PatientRecord, field: Field, code: i64) {
        match field {
            Field::Sex => r.sex = code,
            Field::Cp => r.cp = code,
            Field::Fbs => r.fbs = code,
            Field::Restecg => r.restecg = code,
            Field::Exang => r.exang = code,
            Field::Slope => r.slope = code,
            Field::Ca => r.ca = code,
            Field::Thal => r.thal = code,
            other => panic!("{other} is not categorical"),
        }
    }
}
