//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Market feed error: {0}")]
    Feed(String),

    #[error("Quote error: {0}")]
    Quote(#[from] pumpr_mm::QuoteError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] pumpr_telemetry::TelemetryError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
