//! Prediction result types.
//!
//! Represents the output of the logistic model for one record.

use std::fmt;

/// Probability at or above which a record is labelled positive.
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary outcome label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Label {
    /// No heart disease predicted (0)
    Negative,
    /// Heart disease predicted (1)
    Positive,
}

impl Label {
    /// Threshold a probability. Ties at exactly 0.5 are positive.
    #[must_use]
    pub fn from_probability(probability: f64) -> Self {
        if probability >= DECISION_THRESHOLD {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    #[must_use]
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_u8())
    }
}

/// Scored record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionResult {
    /// Zero-based index of the record in its input (0 for single predictions)
    pub row: usize,

    /// Probability of the positive class, in [0, 1]
    pub probability: f64,

    /// Thresholded label
    pub label: Label,
}

impl PredictionResult {
    /// Create a result, deriving the label from the probability.
    #[must_use]
    pub fn new(row: usize, probability: f64) -> Self {
        Self {
            row,
            probability,
            label: Label::from_probability(probability),
        }
    }

    /// Probability as a percentage, rounded to one decimal place.
    #[must_use]
    pub fn risk_percent(&self) -> f64 {
        (self.probability * 1000.0).round() / 10.0
    }
}
