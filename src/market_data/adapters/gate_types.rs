// Source: https://www.gate.io/docs/developers/apiv4/ws/en/ (spot.tickers)
use serde::{Deserialize, Serialize};

pub const TICKERS_CHANNEL: &str = "spot.tickers";
pub const STATUS_SUCCESS: &str = "success";

// Gate error codes carried in `error.code`
pub const ERROR_INVALID_REQUEST: i64 = 1;
pub const ERROR_INVALID_ARGUMENT: i64 = 2;
pub const ERROR_SERVER: i64 = 3;

/// Minimal shape decoded from every inbound frame, only to pick the body type.
#[derive(Debug, Deserialize)]
pub struct BaseMessage {
    pub event: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Subscribe,
    Update,
}

impl Event {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "subscribe" => Some(Event::Subscribe),
            "update" => Some(Event::Update),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Event::Subscribe => "subscribe",
            Event::Update => "update",
        }
    }
}

// {"event":"subscribe","channel":"spot.tickers","payload":["BTC_USDT"]}
#[derive(Debug, Serialize)]
pub struct SubscribeRequest<'a> {
    pub event: &'static str,
    pub channel: &'static str,
    pub payload: &'a [String],
}

impl<'a> SubscribeRequest<'a> {
    pub fn tickers(symbols: &'a [String]) -> Self {
        Self {
            event: Event::Subscribe.as_str(),
            channel: TICKERS_CHANNEL,
            payload: symbols,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SubscribeResponse {
    #[serde(default)]
    pub channel: String,
    #[serde(default)]
    pub payload: Vec<String>, // echoed symbols, when the venue includes them
    #[serde(default)]
    pub error: Option<ErrorDetail>,
    #[serde(default)]
    pub result: Option<SubscribeResult>,
}

impl SubscribeResponse {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
            && self.result.as_ref().is_some_and(|r| r.status == STATUS_SUCCESS)
    }
}

#[derive(Debug, Deserialize)]
pub struct ErrorDetail {
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct SubscribeResult {
    pub status: String,
}

#[derive(Debug, Deserialize)]
pub struct TickerStream {
    pub time: i64, // seconds
    #[serde(default)]
    pub time_ms: Option<i64>,
    pub channel: String,
    pub result: TickerData,
}

// numeric fields stay strings here; normaliser parses them
#[derive(Debug, Deserialize)]
pub struct TickerData {
    pub currency_pair: String,
    #[serde(default)]
    pub last: Option<String>,
    #[serde(default)]
    pub base_volume: Option<String>,
    #[serde(default)]
    pub quote_volume: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_parse() {
        assert_eq!(Event::parse("subscribe"), Some(Event::Subscribe));
        assert_eq!(Event::parse("update"), Some(Event::Update));
        assert_eq!(Event::parse("Update"), None);
        assert_eq!(Event::parse("unsubscribe"), None);
    }

    #[test]
    fn test_subscribe_request_shape() {
        let symbols = vec!["BTC_USDT".to_string(), "ETH_USDT".to_string()];
        let json = serde_json::to_value(SubscribeRequest::tickers(&symbols)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "subscribe",
                "channel": "spot.tickers",
                "payload": ["BTC_USDT", "ETH_USDT"]
            })
        );
    }

    #[test]
    fn test_subscribe_response_status() {
        let ok: SubscribeResponse = serde_json::from_str(
            r#"{"time":1606292218,"channel":"spot.tickers","event":"subscribe","result":{"status":"success"}}"#,
        )
        .unwrap();
        assert!(ok.succeeded());

        let failed: SubscribeResponse = serde_json::from_str(
            r#"{"time":1606292218,"channel":"spot.tickers","event":"subscribe","error":{"code":2,"message":"unknown currency pair"},"result":null}"#,
        )
        .unwrap();
        assert!(!failed.succeeded());
        assert_eq!(failed.error.unwrap().code, ERROR_INVALID_ARGUMENT);
    }
}
