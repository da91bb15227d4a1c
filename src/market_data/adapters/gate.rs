// Gate.io spot websocket handler (v4 API, `spot.tickers` channel)

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, trace, warn};

use super::gate_types::{
    BaseMessage, ErrorDetail, Event, SubscribeRequest, SubscribeResponse, TickerData, TickerStream,
    ERROR_INVALID_ARGUMENT, ERROR_INVALID_REQUEST, ERROR_SERVER, TICKERS_CHANNEL,
};
use super::{HandlerError, WebSocketDataHandler};
use crate::config::{ConfigError, MarketConfig, WebSocketConfig};
use crate::market_data::normaliser::{timestamp_from_millis, NormaliseError, Normaliser};
use crate::market_data::types::{
    CurrencyPair, HandleOutcome, PriceResponse, ResolvedPrice, WireMessage,
};

pub const NAME: &str = "gate_ws";
pub const URL: &str = "wss://api.gateio.ws/ws/v4/";

/// Connection parameters that work against the public Gate endpoint.
pub fn default_websocket_config() -> WebSocketConfig {
    WebSocketConfig {
        name: NAME.to_string(),
        enabled: true,
        url: URL.to_string(),
        max_buffer_size: 1024,
        reconnection_timeout_ms: 10_000,
        read_timeout_ms: 45_000,
        write_timeout_ms: 5_000,
        ping_interval_ms: 0, // Gate needs no client keep-alive
        max_read_error_count: 100,
        max_subscriptions_per_connection: 0,
        max_subscriptions_per_batch: 20,
    }
}

pub fn factory(
    market: MarketConfig,
    websocket: WebSocketConfig,
) -> Result<Box<dyn WebSocketDataHandler>, ConfigError> {
    Ok(Box::new(GateHandler::new(market, websocket)?))
}

#[derive(Debug)]
struct Inner {
    market: MarketConfig,
    websocket: WebSocketConfig,
    // venue symbol -> (canonical pair, invert)
    by_symbol: HashMap<String, (CurrencyPair, bool)>,
}

/// Clones share the immutable configuration and nothing else.
#[derive(Debug, Clone)]
pub struct GateHandler {
    inner: Arc<Inner>,
}

impl GateHandler {
    pub fn new(market: MarketConfig, websocket: WebSocketConfig) -> Result<Self, ConfigError> {
        market.validate().map_err(ConfigError::InvalidMarket)?;
        if market.name != NAME {
            return Err(ConfigError::MarketNameMismatch {
                expected: NAME.to_string(),
                found: market.name,
            });
        }
        if websocket.name != NAME {
            return Err(ConfigError::WebSocketNameMismatch {
                expected: NAME.to_string(),
                found: websocket.name,
            });
        }
        if !websocket.enabled {
            return Err(ConfigError::WebSocketDisabled { name: websocket.name });
        }
        websocket.validate().map_err(ConfigError::InvalidWebSocket)?;

        let by_symbol = market
            .tickers
            .iter()
            .map(|(pair, ticker)| (ticker.symbol.clone(), (pair.clone(), ticker.invert)))
            .collect();

        Ok(Self { inner: Arc::new(Inner { market, websocket, by_symbol }) })
    }

    // One frame per `max_subscriptions_per_batch` symbols
    fn subscribe_frames(&self, symbols: &[String]) -> Result<Vec<WireMessage>, HandlerError> {
        symbols
            .chunks(self.inner.websocket.max_subscriptions_per_batch)
            .map(|chunk| {
                serde_json::to_string(&SubscribeRequest::tickers(chunk))
                    .map(WireMessage::new)
                    .map_err(HandlerError::Encode)
            })
            .collect()
    }

    fn parse_subscribe_response(
        &self,
        resp: SubscribeResponse,
    ) -> Result<Vec<WireMessage>, HandlerError> {
        if resp.succeeded() {
            debug!(venue = NAME, channel = %resp.channel, "subscription acknowledged");
            return Ok(Vec::new());
        }

        match resp.error {
            // Transient on the venue side: retry what it told us about, if we know it.
            Some(ErrorDetail { code: ERROR_SERVER, message }) if !resp.payload.is_empty() => {
                let symbols: Vec<String> = resp
                    .payload
                    .into_iter()
                    .filter(|symbol| self.inner.by_symbol.contains_key(symbol))
                    .collect();
                warn!(
                    venue = NAME,
                    code = ERROR_SERVER,
                    error = %message,
                    symbols = symbols.len(),
                    "subscription failed on server error, resubscribing"
                );
                self.subscribe_frames(&symbols)
            }
            Some(ErrorDetail { code, message }) => {
                warn!(
                    venue = NAME,
                    code,
                    reason = describe_error(code),
                    error = %message,
                    "subscription rejected"
                );
                Ok(Vec::new())
            }
            None => {
                let status = resp.result.map(|r| r.status);
                warn!(venue = NAME, status = ?status, "subscription not acknowledged as success");
                Ok(Vec::new())
            }
        }
    }

    fn parse_ticker_stream(&self, stream: TickerStream) -> Result<PriceResponse, HandlerError> {
        if stream.channel != TICKERS_CHANNEL {
            return Err(HandlerError::UnexpectedChannel {
                expected: TICKERS_CHANNEL,
                found: stream.channel,
            });
        }

        let symbol = &stream.result.currency_pair;
        let (pair, invert) = self
            .inner
            .by_symbol
            .get(symbol)
            .ok_or_else(|| HandlerError::UnknownSymbol(symbol.clone()))?;

        let ms = stream.time_ms.unwrap_or(stream.time.saturating_mul(1000));
        match resolve_price(pair, &stream.result, *invert, ms) {
            Ok(price) => {
                trace!(venue = NAME, ticker = %pair, price = %price.value, "ticker update");
                Ok(PriceResponse::resolved(pair.clone(), price))
            }
            Err(err) => {
                warn!(venue = NAME, ticker = %pair, symbol = %symbol, error = %err, "unresolved ticker update");
                Ok(PriceResponse::unresolved(pair.clone(), err))
            }
        }
    }
}

fn resolve_price(
    pair: &CurrencyPair,
    data: &TickerData,
    invert: bool,
    ms: i64,
) -> Result<ResolvedPrice, NormaliseError> {
    let norm = Normaliser::new(invert);
    let value = norm.price(data.last.as_deref())?;
    // inverted pairs are denominated in what the venue calls the quote
    let raw_volume = if invert { &data.quote_volume } else { &data.base_volume };
    let volume = norm.volume(raw_volume.as_deref()).unwrap_or_else(|err| {
        warn!(venue = NAME, ticker = %pair, error = %err, "dropping unparseable volume");
        None
    });
    let timestamp = timestamp_from_millis(ms)?;
    Ok(ResolvedPrice { value, volume, timestamp })
}

fn describe_error(code: i64) -> &'static str {
    match code {
        ERROR_INVALID_REQUEST => "invalid request body",
        ERROR_INVALID_ARGUMENT => "invalid argument",
        ERROR_SERVER => "server error",
        _ => "unknown",
    }
}

impl WebSocketDataHandler for GateHandler {
    fn name(&self) -> &str {
        NAME
    }

    fn handle_message(&self, frame: &[u8]) -> Result<HandleOutcome, HandlerError> {
        let base: BaseMessage = serde_json::from_slice(frame).map_err(HandlerError::Envelope)?;
        let event = Event::parse(&base.event).ok_or(HandlerError::UnknownEvent(base.event))?;

        let body_error = |source: serde_json::Error| HandlerError::Body { kind: event.as_str(), source };
        match event {
            Event::Subscribe => {
                let resp: SubscribeResponse = serde_json::from_slice(frame).map_err(body_error)?;
                let outbound = self.parse_subscribe_response(resp)?;
                Ok(HandleOutcome { response: None, outbound })
            }
            Event::Update => {
                let stream: TickerStream = serde_json::from_slice(frame).map_err(body_error)?;
                let response = self.parse_ticker_stream(stream)?;
                Ok(HandleOutcome { response: Some(response), outbound: Vec::new() })
            }
        }
    }

    fn build_subscriptions(&self, tickers: &[CurrencyPair]) -> Result<Vec<WireMessage>, HandlerError> {
        let mut symbols = Vec::with_capacity(tickers.len());
        for pair in tickers {
            match self.inner.market.ticker(pair) {
                Some(ticker) => symbols.push(ticker.symbol.clone()),
                None => debug!(venue = NAME, ticker = %pair, "ticker not in market config, skipping"),
            }
        }
        self.subscribe_frames(&symbols)
    }

    // Gate defines no client-initiated keep-alive.
    fn heartbeat_messages(&self) -> Result<Vec<WireMessage>, HandlerError> {
        Ok(Vec::new())
    }

    fn box_clone(&self) -> Box<dyn WebSocketDataHandler> {
        Box::new(self.clone())
    }
}
