//! Error types for pumpr-core.

use thiserror::Error;

/// Core error types.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid trading pair: {0}")]
    InvalidTradingPair(String),
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
