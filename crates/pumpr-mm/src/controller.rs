//! Order lifecycle controller.
//!
//! Runs once per clock tick. The quoting state is derived from a fresh read
//! of the venue's open orders every time and is never cached:
//!
//! ```text
//! Idle    (no open orders) ─ build bid+ask → reconcile → budget (all-or-none) → submit
//! Quoting (≥1 open order)  ─ per order: deviation ≥ threshold?
//!                              └─ build same-side replacement (remaining qty)
//!                                 → budget (individual) → cancel original → submit
//! ```
//!
//! Cancel and submit are independent calls with no transaction around
//! them. Whatever state a failure leaves behind is picked up by the next
//! tick's fresh read.

use pumpr_core::{ClientOrderId, FillEvent, LiveOrder, OrderSide, Price, Size, TradingPair};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::config::StrategyConfig;
use crate::connector::DynConnector;
use crate::deviation::{deviation_bps, needs_requote};
use crate::error::{QuoteError, QuoteResult};
use crate::proposal::{build_ask, build_bid, build_for_side, tick_size_at, OrderCandidate};
use crate::reconcile::reconcile;
use crate::status::{render, MarketSummary, StatusInput, StatusRow, NOT_READY_MESSAGE};

/// Quoting state observed at the start of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteState {
    /// No open orders.
    Idle,
    /// At least one open order.
    Quoting,
}

impl QuoteState {
    pub fn from_orders(orders: &[LiveOrder]) -> Self {
        if orders.is_empty() {
            Self::Idle
        } else {
            Self::Quoting
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Quoting => "quoting",
        }
    }
}

/// Why a tick took no action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The controller has been stopped.
    Stopped,
    /// Market data or connector problem; retried next tick.
    Quote(QuoteError),
}

impl SkipReason {
    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Stopped => "stopped",
            Self::Quote(QuoteError::NotReady) => "not_ready",
            Self::Quote(QuoteError::StaleMarketData(_)) => "stale_market_data",
            Self::Quote(QuoteError::InvalidConfig(_)) => "invalid_config",
            Self::Quote(QuoteError::NonPositivePrice(..)) => "non_positive_price",
        }
    }
}

/// An order accepted by the gateway.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedOrder {
    pub client_order_id: ClientOrderId,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Size,
}

/// A cancel-and-replace performed for a deviated order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requote {
    pub original: ClientOrderId,
    pub side: OrderSide,
    pub deviation_bps: Decimal,
    /// Size the replacement was built with.
    pub remaining: Size,
    /// `None` if the replacement was unfunded or its submit failed.
    pub replacement: Option<ClientOrderId>,
}

/// What one tick did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// `None` when the tick was skipped before reading open orders.
    pub state: Option<QuoteState>,
    pub skipped: Option<SkipReason>,
    pub placed: Vec<PlacedOrder>,
    pub cancelled: Vec<ClientOrderId>,
    pub requotes: Vec<Requote>,
    /// Deviation (bps) of every open order evaluated this tick.
    pub deviations: Vec<Decimal>,
    /// Sides left unplaced because the budget adjuster zeroed them.
    pub unfunded: Vec<OrderSide>,
    /// Replacements not built because their price came out non-positive.
    pub invalid_prices: Vec<OrderSide>,
    pub submit_failures: usize,
    pub cancel_failures: usize,
}

impl TickReport {
    fn skip(&mut self, reason: SkipReason) {
        self.skipped = Some(reason);
    }
}

/// Maintains one bid/ask pair on a single trading pair.
pub struct QuoteController {
    exchange: String,
    pair: TradingPair,
    config: StrategyConfig,
    connector: DynConnector,
    stopped: bool,
}

impl QuoteController {
    /// Create a controller. Fails if the configuration is invalid.
    pub fn new(
        exchange: impl Into<String>,
        pair: TradingPair,
        config: StrategyConfig,
        connector: DynConnector,
    ) -> QuoteResult<Self> {
        config.validate()?;
        Ok(Self {
            exchange: exchange.into(),
            pair,
            config,
            connector,
            stopped: false,
        })
    }

    pub fn config(&self) -> &StrategyConfig {
        &self.config
    }

    pub fn trading_pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    /// Per-tick entry point.
    ///
    /// Never fails: problems are logged and recorded in the report, and the
    /// next tick starts from a fresh read of the venue.
    pub async fn on_tick(&self) -> TickReport {
        let mut report = TickReport::default();
        if self.stopped {
            report.skip(SkipReason::Stopped);
            return report;
        }
        if !self.connector.is_ready() {
            debug!(pair = %self.pair, "Connector not ready, skipping tick");
            report.skip(SkipReason::Quote(QuoteError::NotReady));
            return report;
        }

        let orders = self.connector.active_orders(&self.pair);
        let state = QuoteState::from_orders(&orders);
        report.state = Some(state);

        let reference = match self.reference_price() {
            Ok(price) => price,
            Err(e) => {
                warn!(pair = %self.pair, error = %e, "Skipping tick");
                report.skip(SkipReason::Quote(e));
                return report;
            }
        };

        let result = match state {
            QuoteState::Idle => self.create_order_pair(&mut report).await,
            QuoteState::Quoting => {
                self.check_deviation(orders, reference, &mut report).await;
                Ok(())
            }
        };
        if let Err(e) = result {
            warn!(pair = %self.pair, error = %e, "Skipping tick");
            report.skip(SkipReason::Quote(e));
        }
        report
    }

    /// Reference price, after confirming both sides of the book and the
    /// tick size are available.
    fn reference_price(&self) -> QuoteResult<Price> {
        let market = &*self.connector;
        let best_bid = market
            .best_price(&self.pair, OrderSide::Buy)
            .ok_or_else(|| QuoteError::StaleMarketData(format!("no best bid for {}", self.pair)))?;
        market
            .best_price(&self.pair, OrderSide::Sell)
            .ok_or_else(|| QuoteError::StaleMarketData(format!("no best ask for {}", self.pair)))?;
        tick_size_at(market, &self.pair, best_bid)?;

        match market.price_by_type(&self.pair, self.config.price_source) {
            Some(price) if price.is_positive() => Ok(price),
            _ => Err(QuoteError::StaleMarketData(format!(
                "no {} for {}",
                self.config.price_source, self.pair
            ))),
        }
    }

    async fn create_order_pair(&self, report: &mut TickReport) -> QuoteResult<()> {
        let market = &*self.connector;
        let bid = build_bid(&self.pair, &self.config, market, None)?;
        let ask = build_ask(&self.pair, &self.config, market, None)?;

        let best_bid = market
            .best_price(&self.pair, OrderSide::Buy)
            .ok_or_else(|| QuoteError::StaleMarketData(format!("no best bid for {}", self.pair)))?;
        let tick = tick_size_at(market, &self.pair, best_bid)?;
        let (bid, ask) = reconcile(bid, ask, tick);
        ensure_positive_price(&bid)?;
        ensure_positive_price(&ask)?;

        let adjusted = self.connector.adjust_candidates(vec![bid, ask], true);
        if adjusted.len() != 2 || adjusted.iter().any(|c| !c.is_submittable()) {
            info!(
                pair = %self.pair,
                "Order pair not placed: budget does not cover both sides"
            );
            report.unfunded.extend([OrderSide::Buy, OrderSide::Sell]);
            return Ok(());
        }

        for candidate in adjusted {
            info!(
                side = %candidate.side,
                amount = %candidate.amount,
                price = %candidate.price,
                fee = %candidate.fee_estimate(),
                "Placing order"
            );
            self.place(candidate, report).await;
        }
        Ok(())
    }

    /// Cancel and replace every order that drifted past the threshold.
    ///
    /// Each order is handled independently; a failure on one does not stop
    /// the others.
    async fn check_deviation(
        &self,
        orders: Vec<LiveOrder>,
        reference: Price,
        report: &mut TickReport,
    ) {
        for order in orders {
            let Some(deviation) = deviation_bps(order.price, reference) else {
                continue;
            };
            report.deviations.push(deviation);

            if !needs_requote(deviation, self.config.deviation_threshold_bps) {
                debug!(
                    order_id = %order.client_order_id,
                    deviation_bps = %deviation,
                    "Order within deviation threshold"
                );
                continue;
            }

            info!(
                order_id = %order.client_order_id,
                side = %order.side,
                price = %order.price,
                reference = %reference,
                deviation_bps = %deviation,
                "Order has deviated from reference price, placing order closer"
            );

            let remaining = order.remaining_quantity();
            let proposal = match build_for_side(
                order.side,
                &self.pair,
                &self.config,
                &*self.connector,
                Some(remaining),
            ) {
                Ok(proposal) => proposal,
                Err(e) => {
                    warn!(order_id = %order.client_order_id, error = %e, "Replacement not built");
                    continue;
                }
            };
            if let Err(e) = ensure_positive_price(&proposal) {
                // Keep the original resting rather than cancel into nothing.
                warn!(order_id = %order.client_order_id, error = %e, "Replacement not built");
                report.invalid_prices.push(order.side);
                continue;
            }
            let adjusted = self.connector.adjust_candidate(proposal, false);

            if let Err(e) = self
                .connector
                .cancel(self.pair.clone(), order.client_order_id.clone())
                .await
            {
                // Still resting; submitting now would leave two orders on this side.
                warn!(order_id = %order.client_order_id, error = %e, "Cancel failed");
                report.cancel_failures += 1;
                continue;
            }
            report.cancelled.push(order.client_order_id.clone());

            let replacement = if adjusted.is_submittable() {
                self.place(adjusted, report).await
            } else {
                info!(
                    side = %order.side,
                    remaining = %remaining,
                    "Replacement not placed: insufficient budget"
                );
                report.unfunded.push(order.side);
                None
            };

            report.requotes.push(Requote {
                original: order.client_order_id,
                side: order.side,
                deviation_bps: deviation,
                remaining,
                replacement,
            });
        }
    }

    async fn place(
        &self,
        candidate: OrderCandidate,
        report: &mut TickReport,
    ) -> Option<ClientOrderId> {
        let (side, price, amount) = (candidate.side, candidate.price, candidate.amount);
        match self.connector.submit(candidate).await {
            Ok(client_order_id) => {
                debug!(order_id = %client_order_id, side = %side, price = %price, "Order submitted");
                report.placed.push(PlacedOrder {
                    client_order_id: client_order_id.clone(),
                    side,
                    price,
                    amount,
                });
                Some(client_order_id)
            }
            Err(e) => {
                warn!(side = %side, price = %price, amount = %amount, error = %e, "Submit failed");
                report.submit_failures += 1;
                None
            }
        }
    }

    /// Fill notification hook.
    ///
    /// Logs the fill and returns the message for the host's notification
    /// channel. Reads nothing the next tick depends on.
    pub fn did_fill_order(&self, event: &FillEvent) -> String {
        let msg = format!(
            "{} {} {} {} at {}",
            event.side.label(),
            fixed_dp(event.amount.inner(), 4),
            event.trading_pair,
            self.exchange,
            fixed_dp(event.price.inner(), 2)
        );
        info!(order_id = %event.client_order_id, "{msg}");
        msg
    }

    /// Status text for the host's `status` command.
    pub fn format_status(&self, now_ms: u64) -> String {
        let market = &*self.connector;
        if !market.is_ready() {
            return NOT_READY_MESSAGE.to_string();
        }

        // Status columns are always measured from mid, whatever drives requotes.
        let mid = market.mid_price(&self.pair);
        let rows = self
            .connector
            .active_orders(&self.pair)
            .iter()
            .map(|order| {
                let tick = market.price_quantum(&self.pair, order.price);
                StatusRow::from_order(&self.exchange, order, mid, tick, now_ms)
            })
            .collect();

        let summary = match (
            market.best_price(&self.pair, OrderSide::Buy),
            market.best_price(&self.pair, OrderSide::Sell),
        ) {
            (Some(bid), Some(ask)) => {
                let bbo = pumpr_core::Bbo::new(bid, Size::ZERO, ask, Size::ZERO);
                MarketSummary::from_bbo(&bbo)
            }
            _ => None,
        };

        let mut warnings = market.network_warnings();
        warnings.extend(market.balance_warnings());

        render(&StatusInput {
            market: summary,
            rows,
            warnings,
        })
    }

    /// Stop handler. Terminal: later ticks are no-ops.
    ///
    /// With `cancel_on_stop`, every resting order on the pair is cancelled;
    /// returns the ids whose cancel succeeded.
    pub async fn stop(&mut self) -> Vec<ClientOrderId> {
        if self.stopped {
            return Vec::new();
        }
        self.stopped = true;
        info!(pair = %self.pair, "Received stop");

        let orders = self.connector.active_orders(&self.pair);
        if !self.config.cancel_on_stop {
            if !orders.is_empty() {
                warn!(
                    open_orders = orders.len(),
                    "Stopping with resting orders left on the book"
                );
            }
            return Vec::new();
        }

        let mut cancelled = Vec::with_capacity(orders.len());
        for order in orders {
            match self
                .connector
                .cancel(self.pair.clone(), order.client_order_id.clone())
                .await
            {
                Ok(()) => cancelled.push(order.client_order_id),
                Err(e) => {
                    warn!(order_id = %order.client_order_id, error = %e, "Cancel on stop failed")
                }
            }
        }
        info!(cancelled = cancelled.len(), "Resting orders cancelled on stop");
        cancelled
    }
}

fn ensure_positive_price(candidate: &OrderCandidate) -> QuoteResult<()> {
    if candidate.price.is_positive() {
        Ok(())
    } else {
        Err(QuoteError::NonPositivePrice(candidate.side, candidate.price))
    }
}

/// Round half-to-even and pad to exactly `dp` decimal places.
fn fixed_dp(value: Decimal, dp: u32) -> Decimal {
    let mut rounded = value.round_dp(dp);
    rounded.rescale(dp);
    rounded
}
