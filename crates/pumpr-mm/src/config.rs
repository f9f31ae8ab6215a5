//! Strategy configuration.

use pumpr_core::{PriceType, Size, BPS_PER_UNIT};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::error::{QuoteError, QuoteResult};

/// Quoting parameters. Immutable for the lifetime of a controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyConfig {
    /// Order size in base units for a fresh pair.
    #[serde(default = "default_order_amount")]
    pub order_amount: Size,

    /// Extra whole ticks below the quantized bid.
    #[serde(default = "default_spread_ticks")]
    pub bid_spread_ticks: u32,

    /// Extra whole ticks above the quantized ask.
    #[serde(default = "default_spread_ticks")]
    pub ask_spread_ticks: u32,

    /// Bid distance from best bid in basis points.
    #[serde(default)]
    pub bid_spread_bps: Decimal,

    /// Ask distance from best ask in basis points.
    #[serde(default)]
    pub ask_spread_bps: Decimal,

    /// Maker fee as a fraction (0.001 = 10 bps). Added to both spreads.
    #[serde(default)]
    pub maker_fee: Decimal,

    /// Taker fee as a fraction. Reported only; quotes are maker-only.
    #[serde(default)]
    pub taker_fee: Decimal,

    /// Re-quote once an order sits this far (bps) from the reference price.
    #[serde(default = "default_deviation_threshold_bps")]
    pub deviation_threshold_bps: Decimal,

    /// Reference price for deviation checks.
    #[serde(default)]
    pub price_source: PriceType,

    /// Cancel resting orders when the strategy is stopped.
    #[serde(default = "default_true")]
    pub cancel_on_stop: bool,
}

fn default_order_amount() -> Size {
    Size::new(dec!(0.003))
}

fn default_spread_ticks() -> u32 {
    1
}

fn default_deviation_threshold_bps() -> Decimal {
    dec!(0.6)
}

fn default_true() -> bool {
    true
}

impl Default for StrategyConfig {
    fn default() -> Self {
        Self {
            order_amount: default_order_amount(),
            bid_spread_ticks: default_spread_ticks(),
            ask_spread_ticks: default_spread_ticks(),
            bid_spread_bps: Decimal::ZERO,
            ask_spread_bps: Decimal::ZERO,
            maker_fee: Decimal::ZERO,
            taker_fee: Decimal::ZERO,
            deviation_threshold_bps: default_deviation_threshold_bps(),
            price_source: PriceType::default(),
            cancel_on_stop: default_true(),
        }
    }
}

impl StrategyConfig {
    /// Reject parameters that would produce nonsensical quotes.
    pub fn validate(&self) -> QuoteResult<()> {
        if !self.order_amount.is_positive() {
            return Err(QuoteError::InvalidConfig(format!(
                "order_amount must be positive, got {}",
                self.order_amount
            )));
        }
        for (name, value) in [
            ("bid_spread_bps", self.bid_spread_bps),
            ("ask_spread_bps", self.ask_spread_bps),
            ("maker_fee", self.maker_fee),
            ("taker_fee", self.taker_fee),
            ("deviation_threshold_bps", self.deviation_threshold_bps),
        ] {
            if value.is_sign_negative() && !value.is_zero() {
                return Err(QuoteError::InvalidConfig(format!(
                    "{name} must not be negative, got {value}"
                )));
            }
        }
        if self.maker_fee >= Decimal::ONE {
            return Err(QuoteError::InvalidConfig(format!(
                "maker_fee is a fraction and must be below 1, got {}",
                self.maker_fee
            )));
        }
        let bid_discount = self.maker_fee + self.bid_spread_bps / BPS_PER_UNIT;
        if bid_discount >= Decimal::ONE {
            return Err(QuoteError::InvalidConfig(format!(
                "maker_fee + bid_spread_bps/10000 must be below 1, got {bid_discount}"
            )));
        }
        Ok(())
    }
}
