// Canonical, venue-independent types shared by every adapter.
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Canonical ticker identity, written `BASE/QUOTE` (e.g. "BTC/USDT").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyPair {
    pub base: String,
    pub quote: String,
}

impl CurrencyPair {
    pub fn new(base: &str, quote: &str) -> Self {
        Self { base: base.to_string(), quote: quote.to_string() }
    }

    /// Both legs must be non-empty ASCII alphanumerics.
    pub fn validate(&self) -> Result<(), String> {
        for (leg, value) in [("base", &self.base), ("quote", &self.quote)] {
            if value.is_empty() {
                return Err(format!("{self}: empty {leg}"));
            }
            if !value.chars().all(|c| c.is_ascii_alphanumeric()) {
                return Err(format!("{self}: {leg} {value:?} is not alphanumeric"));
            }
        }
        Ok(())
    }
}

impl fmt::Display for CurrencyPair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.base, self.quote)
    }
}

impl FromStr for CurrencyPair {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('/') {
            Some((base, quote)) if !quote.contains('/') => {
                // config sources may lowercase map keys
                let pair = CurrencyPair::new(&base.to_ascii_uppercase(), &quote.to_ascii_uppercase());
                pair.validate()?;
                Ok(pair)
            }
            _ => Err(format!("{s:?} is not of the form BASE/QUOTE")),
        }
    }
}

impl TryFrom<String> for CurrencyPair {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CurrencyPair> for String {
    fn from(pair: CurrencyPair) -> Self {
        pair.to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrice {
    pub value: Decimal,
    pub volume: Option<Decimal>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedPrice {
    pub error: String,
}

/// What an adapter hands to the aggregation layer: prices per ticker, or a per-ticker failure.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriceResponse {
    pub resolved: HashMap<CurrencyPair, ResolvedPrice>,
    pub unresolved: HashMap<CurrencyPair, UnresolvedPrice>,
}

impl PriceResponse {
    pub fn resolved(pair: CurrencyPair, price: ResolvedPrice) -> Self {
        let mut response = Self::default();
        response.resolved.insert(pair, price);
        response
    }

    pub fn unresolved(pair: CurrencyPair, error: impl fmt::Display) -> Self {
        let mut response = Self::default();
        response.unresolved.insert(pair, UnresolvedPrice { error: error.to_string() });
        response
    }

    pub fn len(&self) -> usize {
        self.resolved.len() + self.unresolved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// An already-encoded frame, ready to be written to the socket as text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WireMessage(String);

impl WireMessage {
    pub fn new(text: String) -> Self {
        Self(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_text(self) -> String {
        self.0
    }
}

/// Result of handling one inbound frame.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HandleOutcome {
    pub response: Option<PriceResponse>,
    pub outbound: Vec<WireMessage>,
}
