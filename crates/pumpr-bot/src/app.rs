//! Application event loop.
//!
//! One task drives everything. Each clock tick refreshes the book from the
//! feed (which may fill paper orders) and then runs the quote controller.
//! Fills, periodic status and ctrl-c are multiplexed with `tokio::select!`.

use std::sync::Arc;

use chrono::Utc;
use pumpr_core::FillEvent;
use pumpr_mm::{QuoteController, TickReport};
use pumpr_telemetry::Metrics;
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};
use crate::feed::BinanceFeed;
use crate::paper::PaperExchange;

/// Fill channel capacity.
const FILL_CHANNEL_CAPACITY: usize = 1000;

/// Main application.
pub struct Application {
    config: AppConfig,
    feed: BinanceFeed,
    exchange: Arc<PaperExchange>,
    controller: QuoteController,
    fill_rx: Option<mpsc::Receiver<FillEvent>>,
}

impl Application {
    /// Create a new application.
    pub fn new(config: AppConfig) -> AppResult<Self> {
        config.validate()?;
        let pair = config.exchange.trading_pair.clone();
        let feed = BinanceFeed::new(&config.exchange.rest_url)?;

        let (fill_tx, fill_rx) = mpsc::channel(FILL_CHANNEL_CAPACITY);
        let exchange = Arc::new(PaperExchange::new(
            pair.clone(),
            config.paper.trading_rule(),
            config.paper.balances.clone(),
            fill_tx,
        ));
        let controller = QuoteController::new(
            config.exchange.name.clone(),
            pair,
            config.strategy.clone(),
            exchange.clone(),
        )?;

        Ok(Self {
            config,
            feed,
            exchange,
            controller,
            fill_rx: Some(fill_rx),
        })
    }

    /// Replace the fallback trading rule with the venue's.
    ///
    /// A failure is not fatal: the configured rule stays in effect.
    pub async fn run_preflight(&mut self) {
        let pair = self.exchange.trading_pair().clone();
        match self.feed.fetch_trading_rule(&pair).await {
            Ok(rule) => {
                info!(
                    pair = %pair,
                    tick_size = %rule.tick_size,
                    lot_size = %rule.lot_size,
                    min_size = %rule.min_size,
                    "Trading rule loaded"
                );
                self.exchange.set_trading_rule(rule);
            }
            Err(e) => {
                let rule = self.exchange.trading_rule();
                warn!(
                    error = %e,
                    tick_size = %rule.tick_size,
                    "Trading rule unavailable, using configured fallback"
                );
            }
        }
    }

    /// Run until ctrl-c, then stop the controller.
    pub async fn run(&mut self) -> AppResult<()> {
        let mut fill_rx = self
            .fill_rx
            .take()
            .ok_or_else(|| AppError::Config("application already started".to_string()))?;

        let mut tick_interval = tokio::time::interval(self.config.runtime.tick_interval());
        tick_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut status_interval = tokio::time::interval(self.config.runtime.status_interval());
        status_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let shutdown = tokio::signal::ctrl_c();
        tokio::pin!(shutdown);

        info!(
            pair = %self.exchange.trading_pair(),
            tick_ms = self.config.runtime.tick_interval_ms,
            "Entering main event loop"
        );

        loop {
            tokio::select! {
                _ = tick_interval.tick() => {
                    self.refresh_market().await;
                    let report = self.controller.on_tick().await;
                    record_tick(&report);
                }

                Some(fill) = fill_rx.recv() => {
                    Metrics::fill(fill.side.label());
                    self.controller.did_fill_order(&fill);
                }

                _ = status_interval.tick() => {
                    info!("Status:\n{}", self.controller.format_status(now_ms()));
                }

                result = &mut shutdown => {
                    if let Err(e) = result {
                        warn!(error = %e, "Failed to listen for ctrl-c, shutting down");
                    }
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        let cancelled = self.controller.stop().await;
        for _ in &cancelled {
            Metrics::order_cancelled("stop");
        }
        while let Ok(fill) = fill_rx.try_recv() {
            self.controller.did_fill_order(&fill);
        }

        match Metrics::encode_text() {
            Ok(text) => debug!("Final metrics:\n{text}"),
            Err(e) => warn!(error = %e, "Failed to encode metrics"),
        }
        info!(cancelled = cancelled.len(), "Shutdown complete");
        Ok(())
    }

    async fn refresh_market(&self) {
        let pair = self.exchange.trading_pair();
        match self.feed.fetch_bbo(pair).await {
            Ok(bbo) => {
                self.exchange.update_book(bbo);
            }
            Err(e) => {
                warn!(pair = %pair, error = %e, "Market data refresh failed");
                self.exchange.mark_stale(e.to_string());
            }
        }
    }
}

/// Record a controller tick in the metrics registry.
pub fn record_tick(report: &TickReport) {
    match (&report.skipped, report.state) {
        (Some(reason), _) => Metrics::tick_skipped(reason.label()),
        (None, Some(state)) => Metrics::tick(state.as_str()),
        (None, None) => {}
    }

    for placed in &report.placed {
        Metrics::order_submitted(placed.side.label());
    }
    for _ in 0..report.submit_failures {
        Metrics::submit_failed("rejected");
    }
    for _ in &report.cancelled {
        Metrics::order_cancelled("deviation");
    }
    for _ in 0..report.cancel_failures {
        Metrics::cancel_failed("rejected");
    }
    for requote in &report.requotes {
        Metrics::requoted(requote.side.label());
    }
    for side in &report.unfunded {
        Metrics::unfunded(side.label());
    }
    for side in &report.invalid_prices {
        Metrics::invalid_price(side.label());
    }
    for deviation in &report.deviations {
        Metrics::deviation_observed(deviation.to_f64().unwrap_or_default());
    }
}

fn now_ms() -> u64 {
    u64::try_from(Utc::now().timestamp_millis()).unwrap_or_default()
}
