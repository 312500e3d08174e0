//! Error types for RatePivot.

use thiserror::Error;

/// Main error type for RatePivot storage and configuration.
#[derive(Error, Debug)]
pub enum RatePivotError {
    /// Reading or writing the backing store failed.
    #[error("Storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A stored blob could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store file exists but is not a flat key-value object.
    #[error("Corrupt store at {path}: {reason}")]
    CorruptStore { path: String, reason: String },

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl RatePivotError {
    /// Get a stable error code for log fields.
    pub fn error_code(&self) -> &'static str {
        match self {
            RatePivotError::Storage(_) => "STORAGE_ERROR",
            RatePivotError::Serialization(_) => "SERIALIZATION_ERROR",
            RatePivotError::CorruptStore { .. } => "CORRUPT_STORE",
            RatePivotError::Configuration(_) => "CONFIGURATION_ERROR",
        }
    }
}

/// Result type alias for RatePivot operations.
pub type Result<T> = std::result::Result<T, RatePivotError>;
