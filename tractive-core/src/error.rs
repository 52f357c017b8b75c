//! Custom error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// The locomotive cannot keep the train moving under a positive speed limit.
    #[error("insufficient power: train stalls at coordinate {coordinate} km")]
    InsufficientPower { coordinate: f64 },
    #[error("invalid input: {0}")]
    Validation(String),
    #[error("inconsistent data: {0}")]
    DataConsistency(String),
    #[error("`Init::init` failed: {0}")]
    Init(String),
    #[error("`SerdeAPI` failed: {0}")]
    Serde(String),
}
