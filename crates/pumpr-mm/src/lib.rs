//! Pure market making for pumpr.
//!
//! Keeps exactly one maker-only bid and one maker-only ask resting around
//! the top of book on a single trading pair:
//! - Proposal construction from best prices, fee and configured spreads
//! - Anti-self-trade reconciliation of fresh pairs
//! - Deviation-driven cancel-and-replace, sized to the unfilled remainder
//!
//! # Architecture
//!
//! ```text
//! Clock tick → QuoteController.on_tick()
//!               ├─ OrderGateway.active_orders(): derive Idle / Quoting
//!               ├─ Idle:    proposal → reconcile → BudgetChecker (all-or-none) → submit ×2
//!               └─ Quoting: deviation per order → BudgetChecker (individual)
//!                                             → cancel original → submit replacement
//! Fill event  → QuoteController.did_fill_order()  (log only)
//! Status cmd  → QuoteController.format_status()
//! Shutdown    → QuoteController.stop()
//! ```

pub mod config;
pub mod connector;
pub mod controller;
pub mod deviation;
pub mod error;
pub mod proposal;
pub mod reconcile;
pub mod status;

pub use config::StrategyConfig;
pub use connector::{
    BoxFuture, BudgetChecker, Connector, DynConnector, MarketData, MockBudget, MockConnector,
    OrderGateway,
};
pub use controller::{PlacedOrder, QuoteController, QuoteState, Requote, SkipReason, TickReport};
pub use deviation::{deviation_bps, deviation_ticks, needs_requote};
pub use error::{GatewayError, GatewayResult, QuoteError, QuoteResult};
pub use proposal::{build_ask, build_bid, build_for_side, OrderCandidate};
pub use reconcile::reconcile;
pub use status::{MarketSummary, StatusInput, StatusRow};
