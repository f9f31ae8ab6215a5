//! Paper exchange.
//!
//! Simulated venue behind the connector traits. Holds the latest BBO, the
//! pair's trading rule, account balances and resting maker orders. Orders
//! fill in full when the book trades through them; each fill settles the
//! balances and is sent over the fill channel.

use std::collections::HashMap;

use chrono::Utc;
use parking_lot::RwLock;
use pumpr_core::{
    Bbo, ClientOrderId, FillEvent, LiveOrder, OrderSide, Price, PriceType, Size, TradingPair,
    TradingRule,
};
use pumpr_mm::{
    BoxFuture, BudgetChecker, GatewayError, GatewayResult, MarketData, OrderCandidate,
    OrderGateway,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
struct RestingOrder {
    order: LiveOrder,
    fee_rate: Decimal,
}

impl RestingOrder {
    /// Quote (buy) or base (sell) held back for this order.
    fn reserved(&self) -> Decimal {
        let remaining = self.order.remaining_quantity();
        match self.order.side {
            OrderSide::Buy => {
                remaining.notional(self.order.price) * (Decimal::ONE + self.fee_rate)
            }
            OrderSide::Sell => remaining.inner(),
        }
    }
}

#[derive(Debug)]
struct PaperState {
    bbo: Option<Bbo>,
    rule: TradingRule,
    balances: HashMap<String, Decimal>,
    orders: Vec<RestingOrder>,
    feed_error: Option<String>,
}

impl PaperState {
    fn balance(&self, asset: &str) -> Decimal {
        self.balances.get(asset).copied().unwrap_or_default()
    }

    fn reserved(&self, side: OrderSide) -> Decimal {
        self.orders
            .iter()
            .filter(|o| o.order.side == side)
            .map(RestingOrder::reserved)
            .sum()
    }

    /// Unreserved quote and base balances.
    fn available(&self, pair: &TradingPair) -> (Decimal, Decimal) {
        let quote = self.balance(pair.quote()) - self.reserved(OrderSide::Buy);
        let base = self.balance(pair.base()) - self.reserved(OrderSide::Sell);
        (quote.max(Decimal::ZERO), base.max(Decimal::ZERO))
    }

    fn credit(&mut self, asset: &str, amount: Decimal) {
        *self.balances.entry(asset.to_string()).or_default() += amount;
    }
}

/// Balance each candidate would consume.
fn cost(candidate: &OrderCandidate) -> Decimal {
    match candidate.side {
        OrderSide::Buy => {
            candidate.amount.notional(candidate.price) * (Decimal::ONE + candidate.fee_rate)
        }
        OrderSide::Sell => candidate.amount.inner(),
    }
}

/// Simulated exchange for a single trading pair.
pub struct PaperExchange {
    pair: TradingPair,
    state: RwLock<PaperState>,
    fill_tx: mpsc::Sender<FillEvent>,
}

impl PaperExchange {
    pub fn new(
        pair: TradingPair,
        rule: TradingRule,
        balances: HashMap<String, Decimal>,
        fill_tx: mpsc::Sender<FillEvent>,
    ) -> Self {
        let balances = balances
            .into_iter()
            .map(|(asset, amount)| (asset.to_ascii_uppercase(), amount))
            .collect();
        Self {
            pair,
            state: RwLock::new(PaperState {
                bbo: None,
                rule,
                balances,
                orders: Vec::new(),
                feed_error: None,
            }),
            fill_tx,
        }
    }

    pub fn trading_pair(&self) -> &TradingPair {
        &self.pair
    }

    pub fn set_trading_rule(&self, rule: TradingRule) {
        self.state.write().rule = rule;
    }

    pub fn trading_rule(&self) -> TradingRule {
        self.state.read().rule
    }

    pub fn balance(&self, asset: &str) -> Decimal {
        self.state.read().balance(asset)
    }

    /// Mark the feed stale. The exchange reports not ready until the next
    /// successful book update.
    pub fn mark_stale(&self, reason: impl Into<String>) {
        self.state.write().feed_error = Some(reason.into());
    }

    /// Apply a new top of book and fill every resting order it trades
    /// through. Returns the fills, which are also sent on the fill channel.
    pub fn update_book(&self, bbo: Bbo) -> Vec<FillEvent> {
        let fills = {
            let mut state = self.state.write();
            state.feed_error = None;

            let (filled, resting): (Vec<_>, Vec<_>) =
                std::mem::take(&mut state.orders)
                    .into_iter()
                    .partition(|o| match o.order.side {
                        OrderSide::Buy => bbo
                            .best(OrderSide::Sell)
                            .is_some_and(|ask| o.order.price >= ask),
                        OrderSide::Sell => bbo
                            .best(OrderSide::Buy)
                            .is_some_and(|bid| o.order.price <= bid),
                    });
            state.orders = resting;
            state.bbo = Some(bbo);

            filled
                .into_iter()
                .map(|o| self.settle(&mut state, o))
                .collect::<Vec<_>>()
        };

        for fill in &fills {
            if let Err(e) = self.fill_tx.try_send(fill.clone()) {
                warn!(order_id = %fill.client_order_id, error = %e, "Fill notification dropped");
            }
        }
        fills
    }

    fn settle(&self, state: &mut PaperState, resting: RestingOrder) -> FillEvent {
        let order = resting.order;
        let amount = order.remaining_quantity();
        let notional = amount.notional(order.price);
        let fee = notional * resting.fee_rate;

        match order.side {
            OrderSide::Buy => {
                state.credit(self.pair.quote(), -(notional + fee));
                state.credit(self.pair.base(), amount.inner());
            }
            OrderSide::Sell => {
                state.credit(self.pair.base(), -amount.inner());
                state.credit(self.pair.quote(), notional - fee);
            }
        }
        debug!(order_id = %order.client_order_id, side = %order.side, %amount, "Paper fill");

        FillEvent {
            client_order_id: order.client_order_id,
            trading_pair: order.trading_pair,
            side: order.side,
            price: order.price,
            amount,
            timestamp: Utc::now(),
        }
    }

    fn place(&self, candidate: OrderCandidate) -> GatewayResult<ClientOrderId> {
        let mut state = self.state.write();
        if candidate.trading_pair != self.pair {
            return Err(GatewayError::Rejected(format!(
                "unknown trading pair {}",
                candidate.trading_pair
            )));
        }
        if state.feed_error.is_some() {
            return Err(GatewayError::Disconnected);
        }

        let rule = state.rule;
        let price = rule.quantize_price(candidate.price);
        let amount = rule.quantize_size(candidate.amount);
        if !price.is_positive() {
            return Err(GatewayError::Rejected(format!("invalid price {}", candidate.price)));
        }
        if !amount.is_positive() || amount < rule.min_size {
            return Err(GatewayError::Rejected(format!(
                "amount {} below minimum {}",
                candidate.amount, rule.min_size
            )));
        }

        if candidate.order_type.is_maker_only() {
            let crosses = state.bbo.as_ref().is_some_and(|bbo| match candidate.side {
                OrderSide::Buy => bbo.best(OrderSide::Sell).is_some_and(|ask| price >= ask),
                OrderSide::Sell => bbo.best(OrderSide::Buy).is_some_and(|bid| price <= bid),
            });
            if crosses {
                return Err(GatewayError::Rejected(format!(
                    "maker order would cross the book at {price}"
                )));
            }
        }

        let sized = candidate.with_price(price).with_amount(amount);
        let (quote, base) = state.available(&self.pair);
        let available = match sized.side {
            OrderSide::Buy => quote,
            OrderSide::Sell => base,
        };
        if cost(&sized) > available {
            return Err(GatewayError::Rejected("insufficient balance".to_string()));
        }

        let client_order_id = ClientOrderId::new();
        let created_at_ms = u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default();
        state.orders.push(RestingOrder {
            order: LiveOrder {
                client_order_id: client_order_id.clone(),
                trading_pair: self.pair.clone(),
                side: sized.side,
                price,
                quantity: amount,
                filled_quantity: Some(Size::ZERO),
                created_at_ms,
            },
            fee_rate: sized.fee_rate,
        });
        info!(order_id = %client_order_id, side = %sized.side, %price, %amount, "Paper order accepted");
        Ok(client_order_id)
    }

    fn remove(&self, client_order_id: &ClientOrderId) -> GatewayResult<()> {
        let mut state = self.state.write();
        let before = state.orders.len();
        state
            .orders
            .retain(|o| &o.order.client_order_id != client_order_id);
        if state.orders.len() == before {
            return Err(GatewayError::OrderNotFound(client_order_id.to_string()));
        }
        Ok(())
    }
}

impl MarketData for PaperExchange {
    fn is_ready(&self) -> bool {
        let state = self.state.read();
        state.feed_error.is_none()
            && state
                .bbo
                .as_ref()
                .is_some_and(|bbo| bbo.state().has_both_sides())
    }

    fn best_price(&self, pair: &TradingPair, side: OrderSide) -> Option<Price> {
        if pair != &self.pair {
            return None;
        }
        self.state.read().bbo.as_ref().and_then(|bbo| bbo.best(side))
    }

    fn mid_price(&self, pair: &TradingPair) -> Option<Price> {
        self.price_by_type(pair, PriceType::MidPrice)
    }

    fn price_by_type(&self, pair: &TradingPair, price_type: PriceType) -> Option<Price> {
        if pair != &self.pair {
            return None;
        }
        self.state
            .read()
            .bbo
            .as_ref()
            .and_then(|bbo| price_type.resolve(bbo))
    }

    fn price_quantum(&self, pair: &TradingPair, _price: Price) -> Option<Price> {
        (pair == &self.pair).then(|| self.state.read().rule.tick_size)
    }

    fn quantize_price(&self, _pair: &TradingPair, price: Price) -> Price {
        self.state.read().rule.quantize_price(price)
    }

    fn network_warnings(&self) -> Vec<String> {
        match &self.state.read().feed_error {
            Some(reason) => vec![format!("Market data is stale: {reason}")],
            None => Vec::new(),
        }
    }

    fn balance_warnings(&self) -> Vec<String> {
        let state = self.state.read();
        [self.pair.base(), self.pair.quote()]
            .into_iter()
            .filter(|asset| state.balance(asset) <= Decimal::ZERO)
            .map(|asset| format!("{asset} balance is empty"))
            .collect()
    }
}

impl BudgetChecker for PaperExchange {
    fn adjust_candidates(
        &self,
        candidates: Vec<OrderCandidate>,
        all_or_none: bool,
    ) -> Vec<OrderCandidate> {
        let state = self.state.read();
        let (mut quote, mut base) = state.available(&self.pair);

        if all_or_none {
            let quote_needed: Decimal = candidates
                .iter()
                .filter(|c| c.side.is_buy())
                .map(cost)
                .sum();
            let base_needed: Decimal = candidates
                .iter()
                .filter(|c| !c.side.is_buy())
                .map(cost)
                .sum();
            if quote_needed > quote || base_needed > base {
                debug!(%quote_needed, %base_needed, "Batch not affordable, zeroing all");
                return candidates
                    .iter()
                    .map(|c| c.with_amount(Size::ZERO))
                    .collect();
            }
            return candidates;
        }

        candidates
            .into_iter()
            .map(|candidate| {
                let available = match candidate.side {
                    OrderSide::Buy => &mut quote,
                    OrderSide::Sell => &mut base,
                };
                let unit_cost = match candidate.side {
                    OrderSide::Buy => candidate.price.inner() * (Decimal::ONE + candidate.fee_rate),
                    OrderSide::Sell => Decimal::ONE,
                };
                if unit_cost <= Decimal::ZERO {
                    return candidate.with_amount(Size::ZERO);
                }

                let affordable = available
                    .checked_div(unit_cost)
                    .map_or(candidate.amount, |units| {
                        Size::new(units).round_to_lot(state.rule.lot_size)
                    });
                let mut amount = candidate.amount.min(affordable);
                if amount < state.rule.min_size {
                    amount = Size::ZERO;
                }
                let adjusted = candidate.with_amount(amount);
                *available -= cost(&adjusted);
                adjusted
            })
            .collect()
    }
}

impl OrderGateway for PaperExchange {
    fn active_orders(&self, pair: &TradingPair) -> Vec<LiveOrder> {
        self.state
            .read()
            .orders
            .iter()
            .filter(|o| &o.order.trading_pair == pair)
            .map(|o| o.order.clone())
            .collect()
    }

    fn submit(&self, candidate: OrderCandidate) -> BoxFuture<'_, GatewayResult<ClientOrderId>> {
        Box::pin(async move { self.place(candidate) })
    }

    fn cancel(
        &self,
        _pair: TradingPair,
        client_order_id: ClientOrderId,
    ) -> BoxFuture<'_, GatewayResult<()>> {
        Box::pin(async move { self.remove(&client_order_id) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pumpr_core::OrderType;
    use rust_decimal_macros::dec;

    fn pair() -> TradingPair {
        TradingPair::new("BTC", "BUSD")
    }

    fn rule() -> TradingRule {
        TradingRule {
            tick_size: Price::new(dec!(0.01)),
            lot_size: Size::new(dec!(0.001)),
            min_size: Size::new(dec!(0.001)),
        }
    }

    fn exchange(btc: Decimal, busd: Decimal) -> (PaperExchange, mpsc::Receiver<FillEvent>) {
        let (tx, rx) = mpsc::channel(16);
        let balances = HashMap::from([("btc".to_string(), btc), ("BUSD".to_string(), busd)]);
        let ex = PaperExchange::new(pair(), rule(), balances, tx);
        ex.update_book(book(dec!(100.00), dec!(100.10)));
        (ex, rx)
    }

    fn book(bid: Decimal, ask: Decimal) -> Bbo {
        Bbo::new(Price::new(bid), Size::ONE, Price::new(ask), Size::ONE)
    }

    fn candidate(side: OrderSide, price: Decimal, amount: Decimal) -> OrderCandidate {
        OrderCandidate {
            trading_pair: pair(),
            side,
            order_type: OrderType::LimitMaker,
            price: Price::new(price),
            amount: Size::new(amount),
            fee_rate: dec!(0),
        }
    }

    #[test]
    fn test_ready_after_book() {
        let (ex, _rx) = exchange(dec!(1), dec!(1000));
        assert!(ex.is_ready());
        assert_eq!(ex.mid_price(&pair()), Some(Price::new(dec!(100.05))));
        assert_eq!(ex.balance("BTC"), dec!(1));

        ex.mark_stale("timeout");
        assert!(!ex.is_ready());
        assert_eq!(ex.network_warnings().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_and_cancel() {
        let (ex, _rx) = exchange(dec!(1), dec!(1000));
        let id = ex
            .submit(candidate(OrderSide::Buy, dec!(99.99), dec!(1)))
            .await
            .unwrap();
        assert_eq!(ex.active_orders(&pair()).len(), 1);

        ex.cancel(pair(), id.clone()).await.unwrap();
        assert!(ex.active_orders(&pair()).is_empty());
        assert!(matches!(
            ex.cancel(pair(), id).await,
            Err(GatewayError::OrderNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejects_crossing_maker_order() {
        let (ex, _rx) = exchange(dec!(1), dec!(1000));
        let err = ex
            .submit(candidate(OrderSide::Buy, dec!(100.10), dec!(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Rejected(_)));
    }

    #[tokio::test]
    async fn test_rejects_unaffordable_order() {
        let (ex, _rx) = exchange(dec!(1), dec!(50));
        let err = ex
            .submit(candidate(OrderSide::Buy, dec!(99), dec!(1)))
            .await
            .unwrap_err();
        assert_eq!(err, GatewayError::Rejected("insufficient balance".to_string()));
    }

    #[test]
    fn test_all_or_none_zeroes_batch() {
        let (ex, _rx) = exchange(dec!(0.5), dec!(1000));
        let adjusted = ex.adjust_candidates(
            vec![
                candidate(OrderSide::Buy, dec!(99.99), dec!(1)),
                candidate(OrderSide::Sell, dec!(100.20), dec!(1)),
            ],
            true,
        );
        assert_eq!(adjusted.len(), 2);
        assert!(adjusted.iter().all(|c| c.amount.is_zero()));
    }

    #[test]
    fn test_all_or_none_keeps_affordable_batch() {
        let (ex, _rx) = exchange(dec!(1), dec!(1000));
        let batch = vec![
            candidate(OrderSide::Buy, dec!(99.99), dec!(1)),
            candidate(OrderSide::Sell, dec!(100.20), dec!(1)),
        ];
        assert_eq!(ex.adjust_candidates(batch.clone(), true), batch);
    }

    #[test]
    fn test_individual_shrinks_to_lot() {
        let (ex, _rx) = exchange(dec!(1), dec!(50));
        // 50 / 100 = 0.5 BTC affordable
        let adjusted = ex.adjust_candidate(candidate(OrderSide::Buy, dec!(100), dec!(2)), false);
        assert_eq!(adjusted.amount, Size::new(dec!(0.5)));

        let adjusted = ex.adjust_candidate(candidate(OrderSide::Buy, dec!(30000), dec!(1)), false);
        assert_eq!(adjusted.amount, Size::new(dec!(0.001)));
    }

    #[tokio::test]
    async fn test_resting_orders_reserve_balance() {
        let (ex, _rx) = exchange(dec!(1), dec!(1000));
        ex.submit(candidate(OrderSide::Sell, dec!(100.20), dec!(0.75)))
            .await
            .unwrap();

        let adjusted = ex.adjust_candidate(candidate(OrderSide::Sell, dec!(100.30), dec!(1)), false);
        assert_eq!(adjusted.amount, Size::new(dec!(0.25)));
    }

    #[tokio::test]
    async fn test_book_through_order_fills_and_settles() {
        let (ex, mut rx) = exchange(dec!(1), dec!(1000));
        let id = ex
            .submit(candidate(OrderSide::Sell, dec!(100.20), dec!(0.5)))
            .await
            .unwrap();

        assert!(ex.update_book(book(dec!(100.15), dec!(100.25))).is_empty());

        let fills = ex.update_book(book(dec!(100.20), dec!(100.30)));
        assert_eq!(fills.len(), 1);
        assert_eq!(fills[0].client_order_id, id);
        assert_eq!(fills[0].amount, Size::new(dec!(0.5)));
        assert!(ex.active_orders(&pair()).is_empty());
        assert_eq!(ex.balance("BTC"), dec!(0.5));
        assert_eq!(ex.balance("BUSD"), dec!(1050.10));

        let sent = rx.try_recv().unwrap();
        assert_eq!(sent, fills[0]);
    }

    #[test]
    fn test_unknown_pair_has_no_prices() {
        let (ex, _rx) = exchange(dec!(1), dec!(1000));
        let other = TradingPair::new("ETH", "BUSD");
        assert!(ex.best_price(&other, OrderSide::Buy).is_none());
        assert!(ex.price_quantum(&other, Price::ONE).is_none());
    }

    #[test]
    fn test_empty_balance_warning() {
        let (ex, _rx) = exchange(dec!(0), dec!(1000));
        assert_eq!(ex.balance_warnings(), vec!["BTC balance is empty".to_string()]);
    }
}
