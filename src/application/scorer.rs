//! Logistic scoring of encoded vectors.
//!
//! `probability = 1 / (1 + exp(-(w · x + b)))`, no clamping beyond what f64
//! arithmetic does on its own. The label threshold is `>= 0.5`.

use crate::domain::{ConfigurationError, Label, ModelArtifact};

use super::encoder::EncodedVector;

/// Standard logistic link.
#[must_use]
pub fn logistic(logit: f64) -> f64 {
    1.0 / (1.0 + (-logit).exp())
}

/// Probability from raw linear parameters.
///
/// The dot product is summed left to right so results are reproducible.
///
/// # Errors
/// Returns `ConfigurationError::LengthMismatch` if `values` and `weights` differ in length.
pub fn linear_probability(weights: &[f64], bias: f64, values: &[f64]) -> Result<f64, ConfigurationError> {
    if weights.len() != values.len() {
        return Err(ConfigurationError::LengthMismatch {
            what: "encoded vector",
            expected: weights.len(),
            actual: values.len(),
        });
    }
    let dot = weights
        .iter()
        .zip(values)
        .fold(0.0, |acc, (w, x)| acc + w * x);
    Ok(logistic(dot + bias))
}

/// Score an encoded vector with the artifact's weights and bias.
///
/// # Errors
/// Returns `ConfigurationError::LengthMismatch` if the vector width does not
/// match the weight vector.
pub fn score(vector: &EncodedVector, artifact: &ModelArtifact) -> Result<f64, ConfigurationError> {
    linear_probability(artifact.weights(), artifact.bias(), vector.as_slice())
}

/// Score and threshold in one step.
///
/// # Errors
/// See [`score`].
pub fn classify(vector: &EncodedVector, artifact: &ModelArtifact) -> Result<(f64, Label), ConfigurationError> {
    let probability = score(vector, artifact)?;
    Ok((probability, Label::from_probability(probability)))
}
