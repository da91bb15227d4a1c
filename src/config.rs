//! Static configuration handed to venue adapters.
//!
//! `MarketConfig` maps canonical tickers to venue symbols, `WebSocketConfig`
//! carries the connection parameters the driver honours. Both are validated
//! structurally here; the per-venue identity checks live in the adapter.

use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::market_data::types::CurrencyPair;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid market config: {0}")]
    InvalidMarket(String),

    #[error("market config belongs to {found:?}, expected {expected:?}")]
    MarketNameMismatch { expected: String, found: String },

    #[error("websocket config belongs to {found:?}, expected {expected:?}")]
    WebSocketNameMismatch { expected: String, found: String },

    #[error("websocket config {name:?} is disabled")]
    WebSocketDisabled { name: String },

    #[error("invalid websocket config: {0}")]
    InvalidWebSocket(String),

    #[error("failed to load config: {0}")]
    Load(#[from] config::ConfigError),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerConfig {
    pub symbol: String, // venue symbol, e.g. "BTC_USDT"
    #[serde(default)]
    pub invert: bool,   // venue quotes the pair the other way round
}

impl TickerConfig {
    pub fn new(symbol: &str) -> Self {
        Self { symbol: symbol.to_string(), invert: false }
    }

    pub fn inverted(symbol: &str) -> Self {
        Self { symbol: symbol.to_string(), invert: true }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketConfig {
    pub name: String,
    #[serde(default)]
    pub tickers: BTreeMap<CurrencyPair, TickerConfig>,
}

impl MarketConfig {
    pub fn new(name: &str) -> Self {
        Self { name: name.to_string(), tickers: BTreeMap::new() }
    }

    pub fn with_ticker(mut self, pair: CurrencyPair, ticker: TickerConfig) -> Self {
        self.tickers.insert(pair, ticker);
        self
    }

    pub fn ticker(&self, pair: &CurrencyPair) -> Option<&TickerConfig> {
        self.tickers.get(pair)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("market name is empty".into());
        }

        // symbol -> pair must stay a function, otherwise updates can't be routed back
        let mut seen = HashSet::with_capacity(self.tickers.len());
        for (pair, ticker) in &self.tickers {
            pair.validate()?;
            if ticker.symbol.is_empty() {
                return Err(format!("{pair}: empty venue symbol"));
            }
            if ticker.symbol.chars().any(char::is_whitespace) {
                return Err(format!("{pair}: venue symbol {:?} contains whitespace", ticker.symbol));
            }
            if !seen.insert(ticker.symbol.as_str()) {
                return Err(format!("{pair}: venue symbol {:?} is mapped more than once", ticker.symbol));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WebSocketConfig {
    pub name: String,
    pub enabled: bool,
    pub url: String,
    pub max_buffer_size: usize,
    pub reconnection_timeout_ms: u64,
    pub read_timeout_ms: u64,
    pub write_timeout_ms: u64,
    #[serde(default)]
    pub ping_interval_ms: u64,                 // 0 = no heartbeats
    pub max_read_error_count: u32,
    #[serde(default)]
    pub max_subscriptions_per_connection: usize, // 0 = unlimited
    pub max_subscriptions_per_batch: usize,
}

impl WebSocketConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.name.is_empty() {
            return Err("websocket name is empty".into());
        }
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(format!("url {:?} is not a websocket url", self.url));
        }
        let non_zero = [
            ("max_buffer_size", self.max_buffer_size as u64),
            ("reconnection_timeout_ms", self.reconnection_timeout_ms),
            ("read_timeout_ms", self.read_timeout_ms),
            ("write_timeout_ms", self.write_timeout_ms),
            ("max_read_error_count", u64::from(self.max_read_error_count)),
            ("max_subscriptions_per_batch", self.max_subscriptions_per_batch as u64),
        ];
        for (field, value) in non_zero {
            if value == 0 {
                return Err(format!("{field} must be greater than zero"));
            }
        }
        Ok(())
    }
}

/// Everything the `gatefeed` binary needs.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub venue: String,
    #[serde(default = "default_log_filter")]
    pub log_filter: String,
    pub market: MarketConfig,
    pub websocket: WebSocketConfig,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load from a TOML file, then apply `GATEFEED__SECTION__KEY` environment overrides.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::from(path))
            .add_source(config::Environment::with_prefix("GATEFEED").separator("__").try_parsing(true))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ws_config() -> WebSocketConfig {
        WebSocketConfig {
            name: "gate_ws".into(),
            enabled: true,
            url: "wss://api.gateio.ws/ws/v4/".into(),
            max_buffer_size: 1024,
            reconnection_timeout_ms: 10_000,
            read_timeout_ms: 45_000,
            write_timeout_ms: 5_000,
            ping_interval_ms: 0,
            max_read_error_count: 100,
            max_subscriptions_per_connection: 0,
            max_subscriptions_per_batch: 20,
        }
    }

    #[test]
    fn test_market_validate_ok() {
        let market = MarketConfig::new("gate_ws")
            .with_ticker(CurrencyPair::new("BTC", "USDT"), TickerConfig::new("BTC_USDT"))
            .with_ticker(CurrencyPair::new("ETH", "USDT"), TickerConfig::new("ETH_USDT"));
        assert_eq!(market.validate(), Ok(()));
    }

    #[test]
    fn test_market_rejects_duplicate_symbol() {
        let market = MarketConfig::new("gate_ws")
            .with_ticker(CurrencyPair::new("BTC", "USDT"), TickerConfig::new("BTC_USDT"))
            .with_ticker(CurrencyPair::new("XBT", "USDT"), TickerConfig::new("BTC_USDT"));
        let err = market.validate().unwrap_err();
        assert!(err.contains("more than once"), "{err}");
    }

    #[test]
    fn test_market_rejects_bad_entries() {
        let empty_symbol = MarketConfig::new("gate_ws")
            .with_ticker(CurrencyPair::new("BTC", "USDT"), TickerConfig::new(""));
        assert!(empty_symbol.validate().is_err());

        let bad_pair = MarketConfig::new("gate_ws")
            .with_ticker(CurrencyPair::new("BTC", ""), TickerConfig::new("BTC_USDT"));
        assert!(bad_pair.validate().is_err());

        assert!(MarketConfig::new("").validate().is_err());
    }

    #[test]
    fn test_websocket_validate() {
        assert_eq!(ws_config().validate(), Ok(()));

        let mut cfg = ws_config();
        cfg.url = "https://api.gateio.ws".into();
        assert!(cfg.validate().is_err());

        let mut cfg = ws_config();
        cfg.max_subscriptions_per_batch = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("max_subscriptions_per_batch"), "{err}");

        let mut cfg = ws_config();
        cfg.max_read_error_count = 0;
        let err = cfg.validate().unwrap_err();
        assert!(err.contains("max_read_error_count"), "{err}");
    }

    #[test]
    fn test_market_from_json() {
        let json = r#"{
            "name": "gate_ws",
            "tickers": {
                "BTC/USDT": { "symbol": "BTC_USDT" },
                "USDT/ETH": { "symbol": "ETH_USDT", "invert": true }
            }
        }"#;
        let market: MarketConfig = serde_json::from_str(json).unwrap();
        assert_eq!(market.tickers.len(), 2);
        let inverted = market.ticker(&CurrencyPair::new("USDT", "ETH")).unwrap();
        assert!(inverted.invert);
    }

    #[test]
    fn test_market_from_json_rejects_malformed_pair() {
        let json = r#"{ "name": "gate_ws", "tickers": { "BTCUSDT": { "symbol": "BTC_USDT" } } }"#;
        assert!(serde_json::from_str::<MarketConfig>(json).is_err());
    }

    #[test]
    fn test_load_sample_config() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/gatefeed.toml");
        let cfg = AppConfig::load(&path).unwrap();
        assert_eq!(cfg.venue, "gate_ws");
        assert_eq!(cfg.websocket.max_subscriptions_per_batch, 20);
        assert_eq!(cfg.market.validate(), Ok(()));
        let inverted = cfg.market.ticker(&CurrencyPair::new("TRY", "USDT")).unwrap();
        assert!(inverted.invert);
        assert_eq!(inverted.symbol, "USDT_TRY");
    }
}
