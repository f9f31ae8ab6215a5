//! Human-readable status of live quotes.
//!
//! Row construction is a pure mapping from a `LiveOrder` snapshot and the
//! reference price to a [`StatusRow`]; rendering only formats rows.

use pumpr_core::{Bbo, LiveOrder, OrderSide, Price, Size, TradingPair};
use rust_decimal::Decimal;

use crate::deviation::{deviation_bps, deviation_ticks};

/// Shown when the connector cannot serve market data yet.
pub const NOT_READY_MESSAGE: &str = "Market connectors are not ready.";

/// Shown in place of the order table when nothing rests on the book.
pub const NO_ORDERS_MESSAGE: &str = "No active maker orders.";

/// One open order with its derived deviation metrics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusRow {
    pub exchange: String,
    pub trading_pair: TradingPair,
    pub side: OrderSide,
    pub price: Price,
    pub amount: Size,
    pub filled: Option<Size>,
    pub age_secs: u64,
    /// `None` when no reference price is available.
    pub deviation_bps: Option<Decimal>,
    /// `None` when no reference price or tick size is available.
    pub deviation_ticks: Option<Decimal>,
}

impl StatusRow {
    pub fn from_order(
        exchange: &str,
        order: &LiveOrder,
        reference: Option<Price>,
        tick_size: Option<Price>,
        now_ms: u64,
    ) -> Self {
        let deviation_bps = reference.and_then(|r| deviation_bps(order.price, r));
        let deviation_ticks = match (reference, tick_size) {
            (Some(r), Some(t)) => deviation_ticks(order.price, r, t),
            _ => None,
        };
        Self {
            exchange: exchange.to_string(),
            trading_pair: order.trading_pair.clone(),
            side: order.side,
            price: order.price,
            amount: order.quantity,
            filled: order.filled_quantity,
            age_secs: order.age_secs(now_ms),
            deviation_bps,
            deviation_ticks,
        }
    }

    fn cells(&self) -> [String; 9] {
        [
            self.exchange.clone(),
            self.trading_pair.to_string(),
            self.side.to_string(),
            self.price.to_string(),
            self.amount.to_string(),
            self.filled.map_or_else(|| "n/a".to_string(), |f| f.to_string()),
            format_age(self.age_secs),
            optional(self.deviation_bps),
            optional(self.deviation_ticks),
        ]
    }
}

const HEADERS: [&str; 9] = [
    "Exchange",
    "Market",
    "Side",
    "Price",
    "Amount",
    "Filled",
    "Age",
    "Spread bps",
    "Δticks",
];

/// Top-of-book summary line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSummary {
    pub best_bid: Price,
    pub best_ask: Price,
    pub mid: Price,
    pub spread_bps: Option<Decimal>,
}

impl MarketSummary {
    pub fn from_bbo(bbo: &Bbo) -> Option<Self> {
        Some(Self {
            best_bid: bbo.bid_price,
            best_ask: bbo.ask_price,
            mid: bbo.mid_price()?,
            spread_bps: bbo.spread_bps().map(|s| s.round_dp(1)),
        })
    }
}

/// Everything needed to render a status report.
#[derive(Debug, Clone, Default)]
pub struct StatusInput {
    pub market: Option<MarketSummary>,
    pub rows: Vec<StatusRow>,
    pub warnings: Vec<String>,
}

/// Render the status text.
pub fn render(input: &StatusInput) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(market) = &input.market {
        lines.push(String::new());
        lines.push("  Market:".to_string());
        lines.push(format!(
            "    Best bid: {}  Best ask: {}  Mid: {}  Spread bps: {}",
            market.best_bid,
            market.best_ask,
            market.mid,
            optional(market.spread_bps)
        ));
    }

    lines.push(String::new());
    if input.rows.is_empty() {
        lines.push(format!("  {NO_ORDERS_MESSAGE}"));
    } else {
        lines.push("  Orders:".to_string());
        lines.extend(table(&input.rows).into_iter().map(|l| format!("    {l}")));
        if input.rows.len() == 1 {
            lines.push("    (hanging order: only one side resting)".to_string());
        }
    }

    if !input.warnings.is_empty() {
        lines.push(String::new());
        lines.push("*** WARNINGS ***".to_string());
        lines.extend(input.warnings.iter().map(|w| format!("  {w}")));
    }

    lines.join("\n")
}

fn table(rows: &[StatusRow]) -> Vec<String> {
    let cells: Vec<[String; 9]> = rows.iter().map(StatusRow::cells).collect();
    let mut widths = HEADERS.map(|h| h.chars().count());
    for row in &cells {
        for (width, cell) in widths.iter_mut().zip(row.iter()) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let header: Vec<String> = HEADERS.iter().map(|h| h.to_string()).collect();
    std::iter::once(header)
        .chain(cells.into_iter().map(Vec::from))
        .map(|row| {
            row.iter()
                .zip(widths.iter())
                .map(|(cell, width)| pad(cell, *width))
                .collect::<Vec<_>>()
                .join("  ")
                .trim_end()
                .to_string()
        })
        .collect()
}

fn pad(cell: &str, width: usize) -> String {
    let fill = width.saturating_sub(cell.chars().count());
    format!("{cell}{}", " ".repeat(fill))
}

fn optional(value: Option<Decimal>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| v.to_string())
}

fn format_age(secs: u64) -> String {
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
