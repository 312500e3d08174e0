//! Rate source error types.

use thiserror::Error;

/// Errors from a single rate-source attempt.
///
/// These never escape [`crate::RateLoader::load`]; each one only moves the
/// loader on to the next endpoint.
#[derive(Debug, Error)]
pub enum FxError {
    /// Transport-level failure (DNS, TLS, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status.
    #[error("Endpoint returned status {0}")]
    HttpStatus(u16),

    /// Body was not JSON or not a flat numeric mapping.
    #[error("Malformed rate payload: {0}")]
    Parse(String),

    /// Mapping parsed but held no usable positive rates.
    #[error("Rate payload contained no usable rates")]
    EmptyRates,

    /// Endpoint URL could not be used.
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl FxError {
    /// Whether the failure happened before any response was received.
    pub fn is_network(&self) -> bool {
        matches!(self, FxError::Http(_) | FxError::InvalidEndpoint(_))
    }
}

impl From<serde_json::Error> for FxError {
    fn from(e: serde_json::Error) -> Self {
        FxError::Parse(e.to_string())
    }
}

/// Result type for rate-source operations.
pub type FxResult<T> = Result<T, FxError>;
