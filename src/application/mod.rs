//! Application layer: Use cases and services.
//!
//! This module implements the scoring pipeline on top of the domain types:
//! validation, encoding, logistic scoring, and batch orchestration.

pub mod batch;
pub mod encoder;
pub mod scorer;
mod service;
pub mod validator;

pub use batch::{BatchReport, BatchRunner, RecordError, RecordFailure, RecordOutcome};
pub use encoder::{decode_category, encode, EncodedVector};
pub use scorer::{classify, linear_probability, logistic, score};
pub use service::RiskService;
pub use validator::{ValidationOutcome, Validator};
