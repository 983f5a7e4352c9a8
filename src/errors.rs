// Copyright (c) 2025 - Cowboy AI, Inc.
//! Error types for emitter operations

use thiserror::Error;

/// Errors that can occur while configuring or running the emitter
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EmitterError {
    /// Distribution tag is not one the catalog knows
    #[error("Unknown distribution: {0}")]
    UnknownDistribution(String),

    /// Frequency is zero, negative, non-finite or too high to schedule
    #[error("Invalid frequency: {0} (must be a finite number of samples per second > 0)")]
    InvalidFrequency(f64),

    /// Lower bound exceeds upper bound
    #[error("Invalid bounds: min {min} is greater than max {max}")]
    InvalidBounds { min: f64, max: f64 },

    /// A distribution parameter is out of range or non-finite
    #[error("Invalid parameter {name}: {value}")]
    InvalidParameter { name: &'static str, value: f64 },

    /// Generic configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Configuration snapshot could not be decoded
    #[error("Deserialization error: {0}")]
    Deserialization(String),

    /// No async runtime is available to drive the timer
    #[error("Runtime error: {0}")]
    Runtime(String),

    /// The engine has been shut down and accepts no further configuration
    #[error("Engine is shut down")]
    Shutdown,
}

impl EmitterError {
    /// Whether this error describes a rejected configuration snapshot
    pub fn is_configuration(&self) -> bool {
        !matches!(self, EmitterError::Runtime(_) | EmitterError::Shutdown)
    }
}

/// Result type for emitter operations
pub type EmitterResult<T> = Result<T, EmitterError>;

impl From<serde_json::Error> for EmitterError {
    fn from(err: serde_json::Error) -> Self {
        EmitterError::Deserialization(err.to_string())
    }
}

impl From<rand_distr::NormalError> for EmitterError {
    fn from(err: rand_distr::NormalError) -> Self {
        EmitterError::Configuration(format!("normal distribution: {}", err))
    }
}
