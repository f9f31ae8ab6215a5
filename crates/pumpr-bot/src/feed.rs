//! Binance public REST market data.
//!
//! Polls `/api/v3/ticker/bookTicker` for the top of book and reads
//! `/api/v3/exchangeInfo` once for the pair's price and lot filters.

use std::time::Duration;

use pumpr_core::{Bbo, Price, Size, TradingPair, TradingRule};
use reqwest::Client;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};

use crate::error::{AppError, AppResult};

/// Default timeout for API requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BookTickerResponse {
    bid_price: Decimal,
    bid_qty: Decimal,
    ask_price: Decimal,
    ask_qty: Decimal,
}

#[derive(Debug, Deserialize)]
struct ExchangeInfoResponse {
    symbols: Vec<SymbolInfo>,
}

#[derive(Debug, Deserialize)]
struct SymbolInfo {
    symbol: String,
    #[serde(default)]
    filters: Vec<SymbolFilter>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "filterType")]
enum SymbolFilter {
    #[serde(rename = "PRICE_FILTER")]
    Price {
        #[serde(rename = "tickSize")]
        tick_size: Decimal,
    },
    #[serde(rename = "LOT_SIZE")]
    LotSize {
        #[serde(rename = "stepSize")]
        step_size: Decimal,
        #[serde(rename = "minQty")]
        min_qty: Decimal,
    },
    #[serde(other)]
    Other,
}

/// Client for Binance public market data.
pub struct BinanceFeed {
    client: Client,
    rest_url: String,
}

impl BinanceFeed {
    /// Create a new feed client.
    ///
    /// # Arguments
    /// * `rest_url` - REST base URL (e.g., "https://api.binance.com")
    pub fn new(rest_url: impl Into<String>) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(|e| AppError::Feed(format!("Failed to create HTTP client: {e}")))?;

        let rest_url: String = rest_url.into();
        Ok(Self {
            client,
            rest_url: rest_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch the current best bid/ask.
    pub async fn fetch_bbo(&self, pair: &TradingPair) -> AppResult<Bbo> {
        let url = format!(
            "{}/api/v3/ticker/bookTicker?symbol={}",
            self.rest_url,
            pair.exchange_symbol()
        );
        let body = self.get(&url).await?;
        let bbo = parse_book_ticker(&body)?;
        debug!(pair = %pair, bid = %bbo.bid_price, ask = %bbo.ask_price, "BBO updated");
        Ok(bbo)
    }

    /// Fetch the pair's tick size, lot size and minimum quantity.
    pub async fn fetch_trading_rule(&self, pair: &TradingPair) -> AppResult<TradingRule> {
        let symbol = pair.exchange_symbol();
        info!(pair = %pair, "Fetching trading rule");
        let url = format!("{}/api/v3/exchangeInfo?symbol={symbol}", self.rest_url);
        let body = self.get(&url).await?;
        parse_trading_rule(&body, &symbol)
    }

    async fn get(&self, url: &str) -> AppResult<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| AppError::Feed(format!("HTTP request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Feed(format!("HTTP {status}: {body}")));
        }

        response
            .text()
            .await
            .map_err(|e| AppError::Feed(format!("Failed to read response: {e}")))
    }
}

/// Parse a bookTicker response body.
pub fn parse_book_ticker(body: &str) -> AppResult<Bbo> {
    let ticker: BookTickerResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Feed(format!("Failed to parse bookTicker: {e}")))?;
    Ok(Bbo::new(
        Price::new(ticker.bid_price.normalize()),
        Size::new(ticker.bid_qty.normalize()),
        Price::new(ticker.ask_price.normalize()),
        Size::new(ticker.ask_qty.normalize()),
    ))
}

/// Parse an exchangeInfo response body for `symbol`.
pub fn parse_trading_rule(body: &str, symbol: &str) -> AppResult<TradingRule> {
    let info: ExchangeInfoResponse = serde_json::from_str(body)
        .map_err(|e| AppError::Feed(format!("Failed to parse exchangeInfo: {e}")))?;

    let entry = info
        .symbols
        .into_iter()
        .find(|s| s.symbol == symbol)
        .ok_or_else(|| AppError::Feed(format!("Symbol {symbol} not listed")))?;

    let mut tick_size = None;
    let mut lot = None;
    for filter in entry.filters {
        match filter {
            SymbolFilter::Price { tick_size: t } => tick_size = Some(t.normalize()),
            SymbolFilter::LotSize { step_size, min_qty } => {
                lot = Some((step_size.normalize(), min_qty.normalize()))
            }
            SymbolFilter::Other => {}
        }
    }

    let tick_size = tick_size
        .filter(|t| t.is_sign_positive() && !t.is_zero())
        .ok_or_else(|| AppError::Feed(format!("No PRICE_FILTER tick size for {symbol}")))?;
    let (lot_size, min_size) =
        lot.ok_or_else(|| AppError::Feed(format!("No LOT_SIZE filter for {symbol}")))?;

    Ok(TradingRule {
        tick_size: Price::new(tick_size),
        lot_size: Size::new(lot_size),
        min_size: Size::new(min_size),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_parse_book_ticker() {
        let body = r#"{
            "symbol": "BTCBUSD",
            "bidPrice": "30000.12000000",
            "bidQty": "0.51000000",
            "askPrice": "30000.57000000",
            "askQty": "1.20000000"
        }"#;
        let bbo = parse_book_ticker(body).unwrap();
        assert_eq!(bbo.bid_price, Price::new(dec!(30000.12)));
        assert_eq!(bbo.ask_price, Price::new(dec!(30000.57)));
        assert_eq!(bbo.bid_price.to_string(), "30000.12");
        assert_eq!(bbo.ask_size, Size::new(dec!(1.2)));
    }

    #[test]
    fn test_parse_book_ticker_rejects_garbage() {
        assert!(matches!(
            parse_book_ticker(r#"{"code": -1121, "msg": "Invalid symbol."}"#),
            Err(AppError::Feed(_))
        ));
    }

    #[test]
    fn test_parse_trading_rule() {
        let body = r#"{
            "timezone": "UTC",
            "symbols": [{
                "symbol": "BTCBUSD",
                "status": "TRADING",
                "filters": [
                    {"filterType": "PRICE_FILTER", "minPrice": "0.01000000", "maxPrice": "1000000.00000000", "tickSize": "0.01000000"},
                    {"filterType": "LOT_SIZE", "minQty": "0.00001000", "maxQty": "9000.00000000", "stepSize": "0.00001000"},
                    {"filterType": "PERCENT_PRICE_BY_SIDE", "bidMultiplierUp": "5"}
                ]
            }]
        }"#;
        let rule = parse_trading_rule(body, "BTCBUSD").unwrap();
        assert_eq!(rule.tick_size, Price::new(dec!(0.01)));
        assert_eq!(rule.lot_size, Size::new(dec!(0.00001)));
        assert_eq!(rule.min_size, Size::new(dec!(0.00001)));
        assert_eq!(rule.tick_size.to_string(), "0.01");
    }

    #[test]
    fn test_parse_trading_rule_missing_symbol() {
        let body = r#"{"symbols": []}"#;
        assert!(parse_trading_rule(body, "BTCBUSD").is_err());
    }

    #[test]
    fn test_parse_trading_rule_without_price_filter() {
        let body = r#"{"symbols": [{"symbol": "BTCBUSD", "filters": [
            {"filterType": "LOT_SIZE", "minQty": "0.001", "stepSize": "0.001"}
        ]}]}"#;
        assert!(parse_trading_rule(body, "BTCBUSD").is_err());
    }
}
