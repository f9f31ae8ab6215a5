//! Application configuration.

use std::collections::HashMap;
use std::time::Duration;

use pumpr_core::{Price, Size, TradingPair, TradingRule};
use pumpr_mm::StrategyConfig;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub exchange: ExchangeConfig,

    #[serde(default)]
    pub strategy: StrategyConfig,

    #[serde(default)]
    pub paper: PaperConfig,

    #[serde(default)]
    pub runtime: RuntimeConfig,
}

impl AppConfig {
    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;
        Self::from_toml(&content)
    }

    /// Parse and validate TOML content.
    pub fn from_toml(content: &str) -> AppResult<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> AppResult<()> {
        self.strategy.validate()?;

        if self.runtime.tick_interval_ms == 0 {
            return Err(AppError::Config("tick_interval_ms must be positive".to_string()));
        }
        if self.runtime.status_interval_ms == 0 {
            return Err(AppError::Config("status_interval_ms must be positive".to_string()));
        }
        if !self.paper.tick_size.is_positive() {
            return Err(AppError::Config("paper.tick_size must be positive".to_string()));
        }
        if self.paper.lot_size.inner().is_sign_negative() || self.paper.min_size.inner().is_sign_negative() {
            return Err(AppError::Config("paper lot and min size must not be negative".to_string()));
        }
        if let Some((asset, _)) = self.paper.balances.iter().find(|(_, v)| v.is_sign_negative()) {
            return Err(AppError::Config(format!("negative starting balance for {asset}")));
        }
        Ok(())
    }
}

/// Venue and instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExchangeConfig {
    /// Exchange name shown in status and fill messages.
    #[serde(default = "default_exchange_name")]
    pub name: String,

    /// Public REST base URL.
    #[serde(default = "default_rest_url")]
    pub rest_url: String,

    #[serde(default = "default_trading_pair")]
    pub trading_pair: TradingPair,
}

fn default_exchange_name() -> String {
    "binance".to_string()
}

fn default_rest_url() -> String {
    "https://api.binance.com".to_string()
}

fn default_trading_pair() -> TradingPair {
    TradingPair::new("BTC", "USDT")
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            name: default_exchange_name(),
            rest_url: default_rest_url(),
            trading_pair: default_trading_pair(),
        }
    }
}

/// Paper exchange settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaperConfig {
    /// Starting balances by asset symbol.
    #[serde(default = "default_balances")]
    pub balances: HashMap<String, Decimal>,

    /// Used when the venue's exchangeInfo cannot be fetched.
    #[serde(default = "default_tick_size")]
    pub tick_size: Price,

    #[serde(default = "default_lot_size")]
    pub lot_size: Size,

    #[serde(default = "default_lot_size")]
    pub min_size: Size,
}

fn default_balances() -> HashMap<String, Decimal> {
    HashMap::from([
        ("BTC".to_string(), Decimal::ONE),
        ("USDT".to_string(), Decimal::from(30_000)),
    ])
}

fn default_tick_size() -> Price {
    Price::new(Decimal::new(1, 2))
}

fn default_lot_size() -> Size {
    Size::new(Decimal::new(1, 5))
}

impl PaperConfig {
    /// Fallback trading rule.
    pub fn trading_rule(&self) -> TradingRule {
        TradingRule {
            tick_size: self.tick_size,
            lot_size: self.lot_size,
            min_size: self.min_size,
        }
    }
}

impl Default for PaperConfig {
    fn default() -> Self {
        Self {
            balances: default_balances(),
            tick_size: default_tick_size(),
            lot_size: default_lot_size(),
            min_size: default_lot_size(),
        }
    }
}

/// Event loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

fn default_tick_interval_ms() -> u64 {
    1_000
}

fn default_status_interval_ms() -> u64 {
    60_000
}

impl RuntimeConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config.exchange.name, "binance");
        assert_eq!(config.exchange.trading_pair.to_string(), "BTC-USDT");
        assert_eq!(config.paper.balances.get("USDT"), Some(&dec!(30000)));
        assert_eq!(config.strategy, StrategyConfig::default());
        assert_eq!(config.runtime.tick_interval(), Duration::from_secs(1));
        assert_eq!(config.paper.trading_rule().tick_size, Price::new(dec!(0.01)));
    }

    #[test]
    fn test_parse_full_config() {
        let content = r#"
            [exchange]
            name = "binance"
            rest_url = "http://localhost:8080"
            trading_pair = "eth-usdt"

            [strategy]
            order_amount = "0.05"
            bid_spread_bps = "2.5"
            deviation_threshold_bps = "1"
            price_source = "best_bid"

            [paper]
            tick_size = "0.05"
            lot_size = "0.001"
            min_size = "0.01"

            [paper.balances]
            ETH = "10"
            USDT = "5000"

            [runtime]
            tick_interval_ms = 250
        "#;
        let config = AppConfig::from_toml(content).unwrap();

        assert_eq!(config.exchange.rest_url, "http://localhost:8080");
        assert_eq!(config.exchange.trading_pair, TradingPair::new("ETH", "USDT"));
        assert_eq!(config.strategy.order_amount, Size::new(dec!(0.05)));
        assert_eq!(config.strategy.bid_spread_bps, dec!(2.5));
        assert_eq!(config.strategy.bid_spread_ticks, 1);
        assert_eq!(config.paper.balances.get("ETH"), Some(&dec!(10)));
        assert_eq!(config.paper.trading_rule().min_size, Size::new(dec!(0.01)));
        assert_eq!(config.runtime.tick_interval_ms, 250);
        assert_eq!(config.runtime.status_interval_ms, 60_000);
    }

    #[test]
    fn test_rejects_invalid_strategy() {
        let err = AppConfig::from_toml("[strategy]\norder_amount = \"0\"\n").unwrap_err();
        assert!(matches!(err, AppError::Quote(_)));
    }

    #[test]
    fn test_rejects_zero_tick_interval() {
        let err = AppConfig::from_toml("[runtime]\ntick_interval_ms = 0\n").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_rejects_malformed_pair() {
        assert!(AppConfig::from_toml("[exchange]\ntrading_pair = \"BTCBUSD\"\n").is_err());
    }

    #[test]
    fn test_shipped_default_config_loads() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../config/default.toml");
        let config = AppConfig::from_file(path).unwrap();
        assert_eq!(config.strategy, StrategyConfig::default());
        let pair = &config.exchange.trading_pair;
        assert_eq!(pair.exchange_symbol(), "BTCUSDT");
        assert_eq!(config.paper.balances.get(pair.base()), Some(&dec!(1)));
        assert_eq!(config.paper.balances.get(pair.quote()), Some(&dec!(30000)));
    }

    #[test]
    fn test_missing_file() {
        assert!(AppConfig::from_file("/nonexistent/pumpr.toml").is_err());
    }
}
