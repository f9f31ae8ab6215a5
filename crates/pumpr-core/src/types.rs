//! Market data types.
//!
//! Contains the BBO (best bid/offer) snapshot and the reference price
//! selector used for deviation checks.

use crate::{OrderSide, Price, Size, BPS_PER_UNIT};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// BBO state (null side detection).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BboState {
    /// Both bid and ask are present and valid.
    Valid,
    /// No bid side (bid price is zero or missing).
    NoBid,
    /// No ask side (ask price is zero or missing).
    NoAsk,
    /// Both sides missing.
    Empty,
    /// Crossed book (bid > ask).
    Crossed,
}

impl BboState {
    /// Both prices are present; a locked book (bid == ask) still counts.
    pub fn has_both_sides(&self) -> bool {
        matches!(self, Self::Valid | Self::Crossed)
    }
}

impl std::fmt::Display for BboState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Valid => write!(f, "VALID"),
            Self::NoBid => write!(f, "NO_BID"),
            Self::NoAsk => write!(f, "NO_ASK"),
            Self::Empty => write!(f, "EMPTY"),
            Self::Crossed => write!(f, "CROSSED"),
        }
    }
}

/// Best Bid and Offer (BBO).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bbo {
    pub bid_price: Price,
    pub bid_size: Size,
    pub ask_price: Price,
    pub ask_size: Size,
    /// Timestamp when this BBO was received.
    pub received_at: DateTime<Utc>,
}

impl Bbo {
    /// Create a new BBO.
    pub fn new(bid_price: Price, bid_size: Size, ask_price: Price, ask_size: Size) -> Self {
        Self {
            bid_price,
            bid_size,
            ask_price,
            ask_size,
            received_at: Utc::now(),
        }
    }

    /// Best price on one side: bid for buys, ask for sells.
    pub fn best(&self, side: OrderSide) -> Option<Price> {
        let price = match side {
            OrderSide::Buy => self.bid_price,
            OrderSide::Sell => self.ask_price,
        };
        price.is_positive().then_some(price)
    }

    /// Mid price: (bid + ask) / 2. `None` unless both sides are present.
    pub fn mid_price(&self) -> Option<Price> {
        if !self.state().has_both_sides() {
            return None;
        }
        Some(Price::new(
            (self.bid_price.inner() + self.ask_price.inner()) / Decimal::TWO,
        ))
    }

    /// Spread: ask - bid.
    pub fn spread(&self) -> Price {
        self.ask_price - self.bid_price
    }

    /// Spread in basis points relative to mid.
    pub fn spread_bps(&self) -> Option<Decimal> {
        let mid = self.mid_price()?;
        if mid.is_zero() {
            return None;
        }
        Some(self.spread().inner() / mid.inner() * BPS_PER_UNIT)
    }

    /// Get BBO state.
    ///
    /// Sizes are not considered: ticker feeds may report a price with an
    /// unknown size.
    pub fn state(&self) -> BboState {
        let has_bid = self.bid_price.is_positive();
        let has_ask = self.ask_price.is_positive();

        match (has_bid, has_ask) {
            (false, false) => BboState::Empty,
            (true, false) => BboState::NoAsk,
            (false, true) => BboState::NoBid,
            (true, true) => {
                if self.bid_price <= self.ask_price {
                    BboState::Valid
                } else {
                    BboState::Crossed
                }
            }
        }
    }

    /// Age of this BBO in milliseconds.
    pub fn age_ms(&self) -> i64 {
        (Utc::now() - self.received_at).num_milliseconds()
    }
}

/// Reference price source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PriceType {
    #[default]
    MidPrice,
    BestBid,
    BestAsk,
}

impl PriceType {
    /// Resolve the reference price from a BBO.
    pub fn resolve(&self, bbo: &Bbo) -> Option<Price> {
        match self {
            Self::MidPrice => bbo.mid_price(),
            Self::BestBid => bbo.best(OrderSide::Buy),
            Self::BestAsk => bbo.best(OrderSide::Sell),
        }
    }
}

impl std::fmt::Display for PriceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MidPrice => write!(f, "mid_price"),
            Self::BestBid => write!(f, "best_bid"),
            Self::BestAsk => write!(f, "best_ask"),
        }
    }
}
