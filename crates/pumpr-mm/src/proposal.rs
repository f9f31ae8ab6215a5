//! Order proposal construction.
//!
//! A proposal (`OrderCandidate`) is a maker-only limit order priced off the
//! current best price on its own side:
//!
//! ```text
//! bid = (floor(quantize(best_bid * (1 - fee - bid_bps/10000)) / tick) - bid_ticks) * tick
//! ask = (ceil (quantize(best_ask * (1 + fee + ask_bps/10000)) / tick) + ask_ticks) * tick
//! ```
//!
//! Building a proposal performs no I/O beyond reading the connector's
//! cached market data and quantization rule.

use pumpr_core::{OrderSide, OrderType, Price, Size, TradingPair, BPS_PER_UNIT};
use rust_decimal::Decimal;
use serde::Serialize;

use crate::config::StrategyConfig;
use crate::connector::MarketData;
use crate::error::{QuoteError, QuoteResult};

/// An order computed but not yet submitted.
///
/// Never edited in place: reconciliation and budget adjustment return new
/// candidates via `with_price` / `with_amount`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OrderCandidate {
    pub trading_pair: TradingPair,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub price: Price,
    pub amount: Size,
    /// Fee rate applied to the notional (fraction).
    pub fee_rate: Decimal,
}

impl OrderCandidate {
    /// Estimated fee in quote currency.
    pub fn fee_estimate(&self) -> Decimal {
        self.amount.notional(self.price) * self.fee_rate
    }

    #[must_use]
    pub fn with_price(&self, price: Price) -> Self {
        Self {
            price,
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_amount(&self, amount: Size) -> Self {
        Self {
            amount,
            ..self.clone()
        }
    }

    /// Whether the candidate can be sent to the venue at all.
    pub fn is_submittable(&self) -> bool {
        self.amount.is_positive() && self.price.is_positive()
    }
}

/// Build a bid proposal.
///
/// `amount_override` replaces the configured order amount (used to size
/// replacements after partial fills). A zero override still yields a
/// candidate; deciding not to submit it is the caller's job.
pub fn build_bid<M: MarketData + ?Sized>(
    pair: &TradingPair,
    config: &StrategyConfig,
    market: &M,
    amount_override: Option<Size>,
) -> QuoteResult<OrderCandidate> {
    build_for_side(OrderSide::Buy, pair, config, market, amount_override)
}

/// Build an ask proposal. See [`build_bid`].
pub fn build_ask<M: MarketData + ?Sized>(
    pair: &TradingPair,
    config: &StrategyConfig,
    market: &M,
    amount_override: Option<Size>,
) -> QuoteResult<OrderCandidate> {
    build_for_side(OrderSide::Sell, pair, config, market, amount_override)
}

/// Build a proposal for either side.
pub fn build_for_side<M: MarketData + ?Sized>(
    side: OrderSide,
    pair: &TradingPair,
    config: &StrategyConfig,
    market: &M,
    amount_override: Option<Size>,
) -> QuoteResult<OrderCandidate> {
    let best = market
        .best_price(pair, side)
        .ok_or_else(|| QuoteError::StaleMarketData(format!("no best {side} price for {pair}")))?;
    let tick = tick_size_at(market, pair, best)?;

    let ticks = match side {
        OrderSide::Buy => {
            let spread_fraction = config.maker_fee + config.bid_spread_bps / BPS_PER_UNIT;
            let quantized = market.quantize_price(pair, best * (Decimal::ONE - spread_fraction));
            quantized
                .floor_ticks(tick)
                .map(|t| t - Decimal::from(config.bid_spread_ticks))
        }
        OrderSide::Sell => {
            let spread_fraction = config.maker_fee + config.ask_spread_bps / BPS_PER_UNIT;
            let quantized = market.quantize_price(pair, best * (Decimal::ONE + spread_fraction));
            quantized
                .ceil_ticks(tick)
                .map(|t| t + Decimal::from(config.ask_spread_ticks))
        }
    };
    let ticks = ticks.ok_or_else(|| {
        QuoteError::StaleMarketData(format!("tick count overflows at {best} / {tick} for {pair}"))
    })?;
    let price = Price::new(ticks * tick.inner());

    Ok(OrderCandidate {
        trading_pair: pair.clone(),
        side,
        order_type: OrderType::LimitMaker,
        price,
        amount: amount_override.unwrap_or(config.order_amount),
        fee_rate: config.maker_fee,
    })
}

/// Tick size at `price`, rejecting missing or non-positive quanta.
pub fn tick_size_at<M: MarketData + ?Sized>(
    market: &M,
    pair: &TradingPair,
    price: Price,
) -> QuoteResult<Price> {
    match market.price_quantum(pair, price) {
        Some(tick) if tick.is_positive() && price.floor_ticks(tick).is_some() => Ok(tick),
        Some(tick) if tick.is_positive() => Err(QuoteError::StaleMarketData(format!(
            "tick size {tick} too small for price {price} on {pair}"
        ))),
        Some(tick) => Err(QuoteError::StaleMarketData(format!(
            "invalid tick size {tick} for {pair}"
        ))),
        None => Err(QuoteError::StaleMarketData(format!(
            "no tick size for {pair}"
        ))),
    }
}
