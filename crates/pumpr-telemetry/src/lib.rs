//! Prometheus metrics and structured logging for pumpr.
//!
//! - Structured logging with tracing (JSON in production, pretty otherwise)
//! - Prometheus counters and histograms for the quoting loop

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::init_logging;
pub use metrics::Metrics;
