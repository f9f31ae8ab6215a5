//! Market identification and trading rules.
//!
//! `TradingPair` names the instrument (e.g. `BTC-BUSD`); `TradingRule`
//! carries the venue's price/size grid for it.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;
use crate::{Price, Size};

/// Base/quote asset pair, written `BASE-QUOTE`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TradingPair {
    base: String,
    quote: String,
}

impl TradingPair {
    /// Create a trading pair. Symbols are upper-cased.
    pub fn new(base: impl AsRef<str>, quote: impl AsRef<str>) -> Self {
        Self {
            base: base.as_ref().to_ascii_uppercase(),
            quote: quote.as_ref().to_ascii_uppercase(),
        }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn quote(&self) -> &str {
        &self.quote
    }

    /// Exchange symbol without separator (e.g. `BTCBUSD`).
    pub fn exchange_symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

impl fmt::Display for TradingPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.base, self.quote)
    }
}

impl FromStr for TradingPair {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('-') {
            Some((base, quote))
                if !base.is_empty() && !quote.is_empty() && !quote.contains('-') =>
            {
                Ok(Self::new(base, quote))
            }
            _ => Err(CoreError::InvalidTradingPair(s.to_string())),
        }
    }
}

impl TryFrom<String> for TradingPair {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<TradingPair> for String {
    fn from(pair: TradingPair) -> Self {
        pair.to_string()
    }
}

/// Venue quantization rules for one trading pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradingRule {
    /// Minimum price increment.
    pub tick_size: Price,
    /// Minimum size increment.
    pub lot_size: Size,
    /// Minimum order size.
    pub min_size: Size,
}

impl TradingRule {
    /// Quantize a price onto the tick grid (floor).
    pub fn quantize_price(&self, price: Price) -> Price {
        price.round_to_tick(self.tick_size)
    }

    /// Quantize a size onto the lot grid (floor).
    pub fn quantize_size(&self, size: Size) -> Size {
        size.round_to_lot(self.lot_size)
    }
}
