//! Error types for coachtrace

use thiserror::Error;

/// Errors that can occur at the data-loading and CLI boundaries.
///
/// The derivation core itself is total: missing or malformed values
/// degrade to `None`/`Na` results rather than erroring (a dashboard must
/// always render something for a given day or decision).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Unknown metric id: {0}")]
    UnknownMetric(String),
}
