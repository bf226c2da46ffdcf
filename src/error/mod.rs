//! Error handling for the cohort query and risk prediction engine.
//!
//! All fallible operations in this crate return [`Result`] with a single
//! typed error enum. Components fail fast: malformed input is rejected
//! before any computation, and no component falls back to an alternative
//! policy or model on error.

/// Specialized error type for cohort queries and risk predictions.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed query input: inconsistent toggles, unknown names,
    /// probabilities outside their valid range.
    #[error("validation error: {0}")]
    Validation(String),

    /// The requested regions and the model's graph disagree.
    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// The model store failed to produce the requested handle. Retryable
    /// by the caller; the engine itself never retries.
    #[error("model '{0}' unavailable: {1}")]
    ModelUnavailable(String, String),

    /// The diagnosis has zero probability under the model's prior, so no
    /// normalizable posterior exists.
    #[error("degenerate posterior: {0}")]
    DegeneratePosterior(String),

    /// Invariant breach inside the engine, e.g. a poisoned lock.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Error reading a configuration or model file.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Error decoding a configuration or model file.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::Validation`] with a formatted message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
