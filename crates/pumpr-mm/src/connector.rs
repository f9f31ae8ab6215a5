//! Exchange collaborator interfaces.
//!
//! The quoting core never talks to a venue directly. It reads market data,
//! asks for budget adjustment and sends orders through these traits,
//! which allows for:
//! - Unit testing with the recording [`MockConnector`]
//! - Different backends (paper exchange, live connector)
//!
//! Only `submit` and `cancel` are asynchronous; everything else reads
//! state the connector has already cached.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use pumpr_core::{
    Bbo, ClientOrderId, LiveOrder, OrderSide, Price, PriceType, Size, TradingPair,
};

use crate::error::{GatewayError, GatewayResult};
use crate::proposal::OrderCandidate;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Price and tick-size oracle.
pub trait MarketData: Send + Sync {
    /// Whether the connector has the data it needs to trade.
    fn is_ready(&self) -> bool;

    /// Best bid for `Buy`, best ask for `Sell`.
    fn best_price(&self, pair: &TradingPair, side: OrderSide) -> Option<Price>;

    fn mid_price(&self, pair: &TradingPair) -> Option<Price>;

    fn price_by_type(&self, pair: &TradingPair, price_type: PriceType) -> Option<Price>;

    /// Minimum price increment at `price`.
    fn price_quantum(&self, pair: &TradingPair, price: Price) -> Option<Price>;

    /// Snap a price onto the venue's valid price grid.
    fn quantize_price(&self, pair: &TradingPair, price: Price) -> Price;

    /// Connectivity warnings for status output.
    fn network_warnings(&self) -> Vec<String> {
        Vec::new()
    }

    /// Balance warnings for status output.
    fn balance_warnings(&self) -> Vec<String> {
        Vec::new()
    }
}

/// Shrinks proposals to what the account can afford.
pub trait BudgetChecker: Send + Sync {
    /// Adjust a batch of candidates.
    ///
    /// With `all_or_none`, either every candidate keeps its full amount or
    /// every candidate comes back with zero amount.
    fn adjust_candidates(
        &self,
        candidates: Vec<OrderCandidate>,
        all_or_none: bool,
    ) -> Vec<OrderCandidate>;

    /// Adjust a single candidate.
    fn adjust_candidate(&self, candidate: OrderCandidate, all_or_none: bool) -> OrderCandidate {
        let rejected = candidate.with_amount(Size::ZERO);
        self.adjust_candidates(vec![candidate], all_or_none)
            .into_iter()
            .next()
            .unwrap_or(rejected)
    }
}

/// Order entry.
pub trait OrderGateway: Send + Sync {
    /// Fresh snapshot of the account's open orders on `pair`.
    fn active_orders(&self, pair: &TradingPair) -> Vec<LiveOrder>;

    /// Submit a candidate; resolves to the assigned client order id.
    fn submit(&self, candidate: OrderCandidate) -> BoxFuture<'_, GatewayResult<ClientOrderId>>;

    /// Cancel an open order.
    fn cancel(
        &self,
        pair: TradingPair,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, GatewayResult<()>>;
}

/// Everything the quote controller needs from an exchange.
pub trait Connector: MarketData + BudgetChecker + OrderGateway {}

impl<T: MarketData + BudgetChecker + OrderGateway> Connector for T {}

/// Arc wrapper for Connector trait objects.
pub type DynConnector = Arc<dyn Connector>;

/// Budget behaviour of the mock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockBudget {
    /// Every candidate is funded in full.
    Unlimited,
    /// Every candidate is zeroed.
    Exhausted,
    /// Candidates are capped at this amount; with `all_or_none`, any
    /// candidate above the cap zeroes the whole batch.
    Cap(Size),
}

/// Recording connector for tests.
///
/// Active orders are whatever the test sets; submissions are recorded but
/// never added to the book, so each tick sees exactly the state configured.
#[derive(Debug)]
pub struct MockConnector {
    bbo: Mutex<Option<Bbo>>,
    tick_size: Mutex<Option<Price>>,
    active: Mutex<Vec<LiveOrder>>,
    budget: Mutex<MockBudget>,
    submits: Mutex<Vec<OrderCandidate>>,
    cancels: Mutex<Vec<ClientOrderId>>,
    budget_calls: Mutex<Vec<(usize, bool)>>,
    warnings: Mutex<Vec<String>>,
    next_submit_error: Mutex<Option<GatewayError>>,
    next_cancel_error: Mutex<Option<GatewayError>>,
    ready: AtomicBool,
}

impl Default for MockConnector {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConnector {
    pub fn new() -> Self {
        Self {
            bbo: Mutex::new(None),
            tick_size: Mutex::new(None),
            active: Mutex::new(Vec::new()),
            budget: Mutex::new(MockBudget::Unlimited),
            submits: Mutex::new(Vec::new()),
            cancels: Mutex::new(Vec::new()),
            budget_calls: Mutex::new(Vec::new()),
            warnings: Mutex::new(Vec::new()),
            next_submit_error: Mutex::new(None),
            next_cancel_error: Mutex::new(None),
            ready: AtomicBool::new(true),
        }
    }

    pub fn set_book(&self, bid: Price, ask: Price) {
        *self.bbo.lock() = Some(Bbo::new(bid, Size::ONE, ask, Size::ONE));
    }

    pub fn clear_book(&self) {
        *self.bbo.lock() = None;
    }

    pub fn set_tick_size(&self, tick: Price) {
        *self.tick_size.lock() = Some(tick);
    }

    pub fn set_active_orders(&self, orders: Vec<LiveOrder>) {
        *self.active.lock() = orders;
    }

    pub fn set_budget(&self, budget: MockBudget) {
        *self.budget.lock() = budget;
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn push_warning(&self, warning: impl Into<String>) {
        self.warnings.lock().push(warning.into());
    }

    /// Fail the next submit with `error`.
    pub fn fail_next_submit(&self, error: GatewayError) {
        *self.next_submit_error.lock() = Some(error);
    }

    /// Fail the next cancel with `error`.
    pub fn fail_next_cancel(&self, error: GatewayError) {
        *self.next_cancel_error.lock() = Some(error);
    }

    /// Candidates that reached `submit` (including failed ones).
    pub fn submits(&self) -> Vec<OrderCandidate> {
        self.submits.lock().clone()
    }

    /// Order ids that reached `cancel` (including failed ones).
    pub fn cancels(&self) -> Vec<ClientOrderId> {
        self.cancels.lock().clone()
    }

    /// `(batch_len, all_or_none)` for every budget adjustment call.
    pub fn budget_calls(&self) -> Vec<(usize, bool)> {
        self.budget_calls.lock().clone()
    }

    pub fn clear_records(&self) {
        self.submits.lock().clear();
        self.cancels.lock().clear();
        self.budget_calls.lock().clear();
    }
}

impl MarketData for MockConnector {
    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    fn best_price(&self, _pair: &TradingPair, side: OrderSide) -> Option<Price> {
        self.bbo.lock().as_ref().and_then(|bbo| bbo.best(side))
    }

    fn mid_price(&self, _pair: &TradingPair) -> Option<Price> {
        self.bbo.lock().as_ref().and_then(Bbo::mid_price)
    }

    fn price_by_type(&self, _pair: &TradingPair, price_type: PriceType) -> Option<Price> {
        self.bbo
            .lock()
            .as_ref()
            .and_then(|bbo| price_type.resolve(bbo))
    }

    fn price_quantum(&self, _pair: &TradingPair, _price: Price) -> Option<Price> {
        *self.tick_size.lock()
    }

    fn quantize_price(&self, _pair: &TradingPair, price: Price) -> Price {
        match *self.tick_size.lock() {
            Some(tick) => price.round_to_tick(tick),
            None => price,
        }
    }

    fn network_warnings(&self) -> Vec<String> {
        self.warnings.lock().clone()
    }
}

impl BudgetChecker for MockConnector {
    fn adjust_candidates(
        &self,
        candidates: Vec<OrderCandidate>,
        all_or_none: bool,
    ) -> Vec<OrderCandidate> {
        self.budget_calls.lock().push((candidates.len(), all_or_none));
        match *self.budget.lock() {
            MockBudget::Unlimited => candidates,
            MockBudget::Exhausted => candidates
                .iter()
                .map(|c| c.with_amount(Size::ZERO))
                .collect(),
            MockBudget::Cap(cap) => {
                let over_cap = candidates.iter().any(|c| c.amount > cap);
                candidates
                    .iter()
                    .map(|c| match (all_or_none, over_cap) {
                        (true, true) => c.with_amount(Size::ZERO),
                        (true, false) => c.clone(),
                        (false, _) => c.with_amount(c.amount.min(cap)),
                    })
                    .collect()
            }
        }
    }
}

impl OrderGateway for MockConnector {
    fn active_orders(&self, pair: &TradingPair) -> Vec<LiveOrder> {
        self.active
            .lock()
            .iter()
            .filter(|o| &o.trading_pair == pair)
            .cloned()
            .collect()
    }

    fn submit(&self, candidate: OrderCandidate) -> BoxFuture<'_, GatewayResult<ClientOrderId>> {
        Box::pin(async move {
            self.submits.lock().push(candidate);
            match self.next_submit_error.lock().take() {
                Some(err) => Err(err),
                None => Ok(ClientOrderId::new()),
            }
        })
    }

    fn cancel(
        &self,
        _pair: TradingPair,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move {
            self.cancels.lock().push(client_order_id);
            match self.next_cancel_error.lock().take() {
                Some(err) => Err(err),
                None => Ok(()),
            }
        })
    }
}
