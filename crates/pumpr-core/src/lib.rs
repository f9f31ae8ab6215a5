//! Core domain types for the pumpr quoting engine.
//!
//! This crate provides fundamental types used throughout the system:
//! - `Price`, `Size`: Precision-safe numeric types with tick/lot arithmetic
//! - `TradingPair`, `TradingRule`: Instrument identity and venue grid
//! - `Bbo`, `PriceType`: Top of book and reference price selection
//! - `OrderSide`, `OrderType`, `LiveOrder`, `FillEvent`: Order snapshots

pub mod decimal;
pub mod error;
pub mod market;
pub mod order;
pub mod types;

pub use decimal::{Price, Size, BPS_PER_UNIT};
pub use error::{CoreError, Result};
pub use market::{TradingPair, TradingRule};
pub use order::{ClientOrderId, FillEvent, LiveOrder, OrderSide, OrderType};
pub use types::{Bbo, BboState, PriceType};
