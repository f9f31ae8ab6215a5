//! Volume pumping market maker.
//!
//! Host application around the `pumpr-mm` quote controller:
//! - Binance public REST market data (best bid/ask, tick and lot sizes)
//! - Paper exchange implementing the connector traits
//! - Tick/status/fill event loop

pub mod app;
pub mod config;
pub mod error;
pub mod feed;
pub mod paper;

pub use app::Application;
pub use config::AppConfig;
pub use error::{AppError, AppResult};
pub use feed::BinanceFeed;
pub use paper::PaperExchange;
