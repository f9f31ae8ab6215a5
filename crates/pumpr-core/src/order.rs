//! Order-related types and identifiers.
//!
//! Provides order side, order kind, client order IDs and the read-only
//! snapshots of live orders and fills reported by the exchange layer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::{Price, Size, TradingPair};

/// Order side: buy or sell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    /// Returns the opposite side.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }

    pub fn is_buy(&self) -> bool {
        matches!(self, Self::Buy)
    }

    /// Upper-case label used in fill notifications ("BUY" / "SELL").
    pub fn label(&self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    /// Plain limit order (may take liquidity).
    Limit,
    /// Maker-only limit order; rejected if it would cross the book.
    #[default]
    LimitMaker,
    /// Market order.
    Market,
}

impl OrderType {
    /// Whether the order is required to rest on the book.
    pub fn is_maker_only(&self) -> bool {
        matches!(self, Self::LimitMaker)
    }
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Limit => write!(f, "limit"),
            Self::LimitMaker => write!(f, "limit_maker"),
            Self::Market => write!(f, "market"),
        }
    }
}

/// Client order ID.
///
/// Every submission gets a fresh id; a replacement order never reuses the
/// id of the order it replaces.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ClientOrderId(String);

impl ClientOrderId {
    /// Create a new unique client order ID.
    ///
    /// Format: `pumpr_{timestamp_ms}_{uuid_short}`
    pub fn new() -> Self {
        let ts = Utc::now().timestamp_millis();
        let uuid_short = &Uuid::new_v4().to_string()[..8];
        Self(format!("pumpr_{ts}_{uuid_short}"))
    }

    /// Create from an existing string (for parsing responses).
    pub fn from_string(s: String) -> Self {
        Self(s)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ClientOrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ClientOrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for ClientOrderId {
    fn from(s: String) -> Self {
        Self::from_string(s)
    }
}

impl From<&str> for ClientOrderId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for ClientOrderId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Snapshot of an order resting on the venue.
///
/// Owned by the exchange layer. Callers read a fresh snapshot every tick
/// and never keep one across ticks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiveOrder {
    pub client_order_id: ClientOrderId,
    pub trading_pair: TradingPair,
    pub side: OrderSide,
    pub price: Price,
    /// Originally requested quantity.
    pub quantity: Size,
    /// Filled quantity, `None` when the venue has not reported it.
    pub filled_quantity: Option<Size>,
    /// Creation time (Unix milliseconds).
    pub created_at_ms: u64,
}

impl LiveOrder {
    /// Quantity still open: requested minus filled, never negative.
    ///
    /// An unknown fill is treated as nothing filled.
    pub fn remaining_quantity(&self) -> Size {
        match self.filled_quantity {
            Some(filled) => self.quantity.saturating_sub(filled),
            None => self.quantity,
        }
    }

    /// Age in whole seconds relative to `now_ms`.
    pub fn age_secs(&self, now_ms: u64) -> u64 {
        now_ms.saturating_sub(self.created_at_ms) / 1000
    }
}

/// Fill reported by the exchange layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillEvent {
    pub client_order_id: ClientOrderId,
    pub trading_pair: TradingPair,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Size,
    pub timestamp: DateTime<Utc>,
}
