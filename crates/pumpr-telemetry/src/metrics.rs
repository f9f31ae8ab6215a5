//! Prometheus metrics for the pumpr quoting loop.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A registration failure means a
//! duplicate metric name, which is a programming error and only surfaces
//! during static initialization.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, CounterVec, Encoder, Histogram, TextEncoder,
};

use crate::error::{TelemetryError, TelemetryResult};

/// Ticks processed. Labels: state (idle/quoting/skipped)
pub static TICKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("pumpr_ticks_total", "Clock ticks processed", &["state"]).unwrap()
});

/// Ticks that took no action. Labels: reason
pub static TICKS_SKIPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_ticks_skipped_total",
        "Ticks skipped before any order action",
        &["reason"]
    )
    .unwrap()
});

/// Orders accepted by the gateway.
pub static ORDERS_SUBMITTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_orders_submitted_total",
        "Maker orders accepted by the gateway",
        &["side"]
    )
    .unwrap()
});

pub static SUBMIT_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_submit_failures_total",
        "Submit calls that returned an error",
        &["kind"]
    )
    .unwrap()
});

pub static ORDERS_CANCELLED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_orders_cancelled_total",
        "Orders cancelled by the controller",
        &["reason"]
    )
    .unwrap()
});

pub static CANCEL_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_cancel_failures_total",
        "Cancel calls that returned an error",
        &["kind"]
    )
    .unwrap()
});

/// Cancel-and-replace cycles triggered by deviation.
pub static REQUOTES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_requotes_total",
        "Orders re-quoted after deviating from the reference price",
        &["side"]
    )
    .unwrap()
});

/// Candidates the budget adjuster zeroed.
pub static UNFUNDED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_unfunded_candidates_total",
        "Order candidates dropped for insufficient balance",
        &["side"]
    )
    .unwrap()
});

/// Proposals whose price came out at or below zero.
pub static INVALID_PRICE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "pumpr_invalid_price_total",
        "Order proposals dropped for a non-positive price",
        &["side"]
    )
    .unwrap()
});

pub static FILLS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!("pumpr_fills_total", "Fill events received", &["side"]).unwrap()
});

/// Deviation of resting orders from the reference price.
pub static DEVIATION_BPS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "pumpr_deviation_bps",
        "Resting order deviation from reference price in basis points",
        vec![0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0, 20.0, 50.0, 100.0]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    /// Record a processed tick by state label.
    pub fn tick(state: &str) {
        TICKS_TOTAL.with_label_values(&[state]).inc();
    }

    pub fn tick_skipped(reason: &str) {
        TICKS_TOTAL.with_label_values(&["skipped"]).inc();
        TICKS_SKIPPED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn order_submitted(side: &str) {
        ORDERS_SUBMITTED_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn submit_failed(kind: &str) {
        SUBMIT_FAILURES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn order_cancelled(reason: &str) {
        ORDERS_CANCELLED_TOTAL.with_label_values(&[reason]).inc();
    }

    pub fn cancel_failed(kind: &str) {
        CANCEL_FAILURES_TOTAL.with_label_values(&[kind]).inc();
    }

    pub fn requoted(side: &str) {
        REQUOTES_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn unfunded(side: &str) {
        UNFUNDED_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn invalid_price(side: &str) {
        INVALID_PRICE_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn fill(side: &str) {
        FILLS_TOTAL.with_label_values(&[side]).inc();
    }

    pub fn deviation_observed(bps: f64) {
        DEVIATION_BPS.observe(bps);
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn encode_text() -> TelemetryResult<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&prometheus::gather(), &mut buffer)
            .map_err(|e| TelemetryError::Metrics(e.to_string()))?;
        String::from_utf8(buffer).map_err(|e| TelemetryError::Metrics(e.to_string()))
    }
}
