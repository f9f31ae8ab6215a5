//! Quoting error types.

use pumpr_core::{OrderSide, Price};
use thiserror::Error;

/// Errors raised while computing quotes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QuoteError {
    /// Price or tick size lookup returned nothing usable.
    #[error("Stale market data: {0}")]
    StaleMarketData(String),

    #[error("Market connector not ready")]
    NotReady,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Spreads pushed a proposal to or below zero.
    #[error("Non-positive {0} price {1}")]
    NonPositivePrice(OrderSide, Price),
}

pub type QuoteResult<T> = Result<T, QuoteError>;

/// Errors reported by the exchange layer for submit/cancel.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("Order rejected: {0}")]
    Rejected(String),

    #[error("Order not found: {0}")]
    OrderNotFound(String),

    #[error("Exchange disconnected")]
    Disconnected,
}

pub type GatewayResult<T> = Result<T, GatewayError>;
