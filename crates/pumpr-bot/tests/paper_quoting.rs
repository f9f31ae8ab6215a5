//! Quote controller driven against the paper exchange.

use std::collections::HashMap;
use std::sync::Arc;

use pumpr_bot::PaperExchange;
use pumpr_core::{Bbo, FillEvent, OrderSide, Price, Size, TradingPair, TradingRule};
use pumpr_mm::{OrderGateway, QuoteController, QuoteState, StrategyConfig};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::mpsc;

fn pair() -> TradingPair {
    TradingPair::new("BTC", "BUSD")
}

fn book(bid: Decimal, ask: Decimal) -> Bbo {
    Bbo::new(Price::new(bid), Size::ONE, Price::new(ask), Size::ONE)
}

struct Harness {
    exchange: Arc<PaperExchange>,
    controller: QuoteController,
    fills: mpsc::Receiver<FillEvent>,
}

fn harness(btc: Decimal, busd: Decimal, config: StrategyConfig) -> Harness {
    let (tx, fills) = mpsc::channel(64);
    let rule = TradingRule {
        tick_size: Price::new(dec!(0.01)),
        lot_size: Size::new(dec!(0.001)),
        min_size: Size::new(dec!(0.001)),
    };
    let balances = HashMap::from([("BTC".to_string(), btc), ("BUSD".to_string(), busd)]);
    let exchange = Arc::new(PaperExchange::new(pair(), rule, balances, tx));
    let controller = QuoteController::new("binance", pair(), config, exchange.clone()).unwrap();
    Harness {
        exchange,
        controller,
        fills,
    }
}

fn side_orders(exchange: &PaperExchange, side: OrderSide) -> Vec<pumpr_core::LiveOrder> {
    exchange
        .active_orders(&pair())
        .into_iter()
        .filter(|o| o.side == side)
        .collect()
}

#[tokio::test]
async fn test_idle_places_one_bid_and_one_ask() {
    let h = harness(dec!(1), dec!(100000), StrategyConfig::default());
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));

    let report = h.controller.on_tick().await;

    assert_eq!(report.state, Some(QuoteState::Idle));
    assert_eq!(report.placed.len(), 2);
    let bids = side_orders(&h.exchange, OrderSide::Buy);
    let asks = side_orders(&h.exchange, OrderSide::Sell);
    assert_eq!(bids.len(), 1);
    assert_eq!(asks.len(), 1);
    assert_eq!(bids[0].price, Price::new(dec!(29999.99)));
    assert_eq!(asks[0].price, Price::new(dec!(30000.51)));
    assert_eq!(bids[0].quantity, Size::new(dec!(0.003)));
}

#[tokio::test]
async fn test_quoting_without_movement_is_stable() {
    let h = harness(dec!(1), dec!(100000), StrategyConfig::default());
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));
    h.controller.on_tick().await;
    let before = h.exchange.active_orders(&pair());

    let report = h.controller.on_tick().await;

    assert_eq!(report.state, Some(QuoteState::Quoting));
    assert!(report.requotes.is_empty());
    assert_eq!(h.exchange.active_orders(&pair()), before);
}

#[tokio::test]
async fn test_price_move_requotes_both_sides() {
    let config = StrategyConfig {
        bid_spread_ticks: 1000,
        ask_spread_ticks: 1000,
        ..Default::default()
    };
    let h = harness(dec!(1), dec!(100000), config);
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));
    h.controller.on_tick().await;
    assert_eq!(side_orders(&h.exchange, OrderSide::Buy)[0].price, Price::new(dec!(29990.00)));

    // Book drifts down 8 without trading through either quote.
    let fills = h.exchange.update_book(book(dec!(29992.00), dec!(29992.50)));
    assert!(fills.is_empty());
    let report = h.controller.on_tick().await;

    assert_eq!(report.requotes.len(), 2);
    assert_eq!(report.cancelled.len(), 2);
    let bids = side_orders(&h.exchange, OrderSide::Buy);
    let asks = side_orders(&h.exchange, OrderSide::Sell);
    assert_eq!(bids.len(), 1);
    assert_eq!(asks.len(), 1);
    assert_eq!(bids[0].price, Price::new(dec!(29982.00)));
    assert_eq!(asks[0].price, Price::new(dec!(30002.50)));
}

#[tokio::test]
async fn test_fill_leaves_hanging_order_that_keeps_its_size() {
    let mut h = harness(dec!(1), dec!(100000), StrategyConfig::default());
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));
    h.controller.on_tick().await;

    // Book trades up through the ask.
    let fills = h.exchange.update_book(book(dec!(30002.00), dec!(30002.50)));
    assert_eq!(fills.len(), 1);
    assert_eq!(fills[0].side, OrderSide::Sell);

    let fill = h.fills.recv().await.unwrap();
    let msg = h.controller.did_fill_order(&fill);
    assert_eq!(msg, "SELL 0.0030 BTC-BUSD binance at 30000.51");

    let status = h.controller.format_status(0);
    assert!(status.contains("hanging order"));

    // The remaining bid sits 0.8 bps from the new mid and is replaced.
    let report = h.controller.on_tick().await;
    assert_eq!(report.state, Some(QuoteState::Quoting));
    assert_eq!(report.requotes.len(), 1);
    let bids = side_orders(&h.exchange, OrderSide::Buy);
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].price, Price::new(dec!(30001.99)));
    assert_eq!(bids[0].quantity, Size::new(dec!(0.003)));
    assert!(side_orders(&h.exchange, OrderSide::Sell).is_empty());
}

#[tokio::test]
async fn test_unfunded_pair_is_not_placed() {
    // Enough BUSD for the bid, no BTC for the ask.
    let h = harness(dec!(0), dec!(100000), StrategyConfig::default());
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));

    let report = h.controller.on_tick().await;

    assert!(report.placed.is_empty());
    assert_eq!(report.unfunded, vec![OrderSide::Buy, OrderSide::Sell]);
    assert!(h.exchange.active_orders(&pair()).is_empty());
    assert!(h.controller.format_status(0).contains("BTC balance is empty"));
}

#[tokio::test]
async fn test_replacement_is_sized_before_the_original_is_released() {
    let config = StrategyConfig {
        order_amount: Size::new(dec!(1)),
        ..Default::default()
    };
    let h = harness(dec!(1), dec!(150), config);
    h.exchange.update_book(book(dec!(100.00), dec!(100.50)));
    h.controller.on_tick().await;
    assert_eq!(h.exchange.active_orders(&pair()).len(), 2);

    // Budget is checked while the originals still hold their funds:
    // 150 - 99.99 = 50.01 BUSD buys 0.498 at 100.39; no BTC is free for the ask.
    h.exchange.update_book(book(dec!(100.40), dec!(100.50)));
    let report = h.controller.on_tick().await;

    assert_eq!(report.cancelled.len(), 2);
    assert_eq!(report.unfunded, vec![OrderSide::Sell]);
    let bids = side_orders(&h.exchange, OrderSide::Buy);
    assert_eq!(bids.len(), 1);
    assert_eq!(bids[0].price, Price::new(dec!(100.39)));
    assert_eq!(bids[0].quantity, Size::new(dec!(0.498)));
    assert!(side_orders(&h.exchange, OrderSide::Sell).is_empty());
}

#[tokio::test]
async fn test_stale_feed_skips_ticks() {
    let h = harness(dec!(1), dec!(100000), StrategyConfig::default());
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));
    h.exchange.mark_stale("timeout");

    let report = h.controller.on_tick().await;

    assert!(report.skipped.is_some());
    assert!(h.exchange.active_orders(&pair()).is_empty());
    assert_eq!(h.controller.format_status(0), "Market connectors are not ready.");
}

#[tokio::test]
async fn test_stop_cancels_everything() {
    let mut h = harness(dec!(1), dec!(100000), StrategyConfig::default());
    h.exchange.update_book(book(dec!(30000.00), dec!(30000.50)));
    h.controller.on_tick().await;

    let cancelled = h.controller.stop().await;

    assert_eq!(cancelled.len(), 2);
    assert!(h.exchange.active_orders(&pair()).is_empty());
    let report = h.controller.on_tick().await;
    assert!(report.placed.is_empty());
}
