// Shared handler trait + venue registry for websocket market data adapters

use crate::config::{ConfigError, MarketConfig, WebSocketConfig};
use crate::market_data::types::{CurrencyPair, HandleOutcome, WireMessage};

pub mod error;
pub use error::HandlerError;

/// Venue-specific protocol logic driven by a connection manager.
///
/// Implementations are pure: every call depends only on its input and the
/// immutable configuration the handler was built with. The connection manager
/// owns the socket and calls `build_subscriptions` after connecting and
/// `handle_message` for every frame it reads.
pub trait WebSocketDataHandler: Send + Sync {
    fn name(&self) -> &str;

    /// Decode one inbound frame. May yield prices, frames to send back, or both.
    fn handle_message(&self, frame: &[u8]) -> Result<HandleOutcome, HandlerError>;

    /// Encode subscribe frames for `tickers`. Unknown tickers are skipped.
    fn build_subscriptions(&self, tickers: &[CurrencyPair]) -> Result<Vec<WireMessage>, HandlerError>;

    /// Frames to send periodically to keep the connection alive.
    fn heartbeat_messages(&self) -> Result<Vec<WireMessage>, HandlerError>;

    /// Independent instance for another connection.
    fn box_clone(&self) -> Box<dyn WebSocketDataHandler>;
}

impl Clone for Box<dyn WebSocketDataHandler> {
    fn clone(&self) -> Self {
        self.box_clone()
    }
}

pub type HandlerFactory =
    fn(MarketConfig, WebSocketConfig) -> Result<Box<dyn WebSocketDataHandler>, ConfigError>;

// venue name -> constructor
static REGISTRY: &[(&str, HandlerFactory)] = &[(gate::NAME, gate::factory)];

pub fn supported_venues() -> impl Iterator<Item = &'static str> {
    REGISTRY.iter().map(|(name, _)| *name)
}

/// Build the handler registered under `venue`.
pub fn new_handler(
    venue: &str,
    market: MarketConfig,
    websocket: WebSocketConfig,
) -> Result<Box<dyn WebSocketDataHandler>, HandlerError> {
    let (_, factory) = REGISTRY
        .iter()
        .find(|(name, _)| *name == venue)
        .ok_or_else(|| HandlerError::UnknownVenue(venue.to_string()))?;
    Ok(factory(market, websocket)?)
}

// Gate.io spot tickers
pub mod gate;
pub mod gate_types;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TickerConfig;

    fn market() -> MarketConfig {
        MarketConfig::new(gate::NAME)
            .with_ticker(CurrencyPair::new("BTC", "USDT"), TickerConfig::new("BTC_USDT"))
    }

    #[test]
    fn test_registry_lists_gate() {
        assert!(supported_venues().any(|v| v == "gate_ws"));
    }

    #[test]
    fn test_new_handler_by_name() {
        let handler = new_handler(gate::NAME, market(), gate::default_websocket_config()).unwrap();
        assert_eq!(handler.name(), gate::NAME);
        let copy = handler.clone();
        assert_eq!(copy.name(), gate::NAME);
    }

    #[test]
    fn test_new_handler_unknown_venue() {
        let err = new_handler("nope", market(), gate::default_websocket_config()).err().unwrap();
        assert!(matches!(err, HandlerError::UnknownVenue(ref v) if v == "nope"));
    }

    #[test]
    fn test_new_handler_surfaces_config_error() {
        let mut ws = gate::default_websocket_config();
        ws.enabled = false;
        let err = new_handler(gate::NAME, market(), ws).err().unwrap();
        assert!(matches!(err, HandlerError::Config(ConfigError::WebSocketDisabled { .. })));
    }
}
