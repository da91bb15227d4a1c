// Convert wire strings into canonical decimals/timestamps.
// Prices never pass through f64: the venue's decimal string is parsed exactly.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum NormaliseError {
    #[error("missing field {field}")]
    Missing { field: &'static str },

    #[error("malformed {field}: {value:?}")]
    Malformed { field: &'static str, value: String },

    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: Decimal },

    #[error("cannot invert a zero price")]
    ZeroPrice,

    #[error("timestamp {0}ms is out of range")]
    Timestamp(i64),
}

pub struct Normaliser {
    pub invert: bool, // report 1/price instead of price
}

impl Normaliser {
    pub fn new(invert: bool) -> Self {
        Self { invert }
    }

    pub fn price(&self, raw: Option<&str>) -> Result<Decimal, NormaliseError> {
        let raw = raw.ok_or(NormaliseError::Missing { field: "price" })?;
        let price = parse_decimal("price", raw)?;
        if price.is_zero() && self.invert {
            return Err(NormaliseError::ZeroPrice);
        }
        if price <= Decimal::ZERO {
            return Err(NormaliseError::NonPositive { field: "price", value: price });
        }
        if !self.invert {
            return Ok(price);
        }
        Decimal::ONE.checked_div(price).ok_or(NormaliseError::ZeroPrice)
    }

    /// Volume is optional metadata: digits past `Decimal`'s precision are rounded away.
    pub fn volume(&self, raw: Option<&str>) -> Result<Option<Decimal>, NormaliseError> {
        raw.map(|raw| {
            Decimal::from_str(raw.trim()).map_err(|_| NormaliseError::Malformed {
                field: "volume",
                value: raw.to_string(),
            })
        })
        .transpose()
    }
}

/// Exact decimal parse; rejects input that cannot be represented without rounding.
pub fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, NormaliseError> {
    Decimal::from_str_exact(raw.trim()).map_err(|_| NormaliseError::Malformed {
        field,
        value: raw.to_string(),
    })
}

pub fn timestamp_from_millis(ms: i64) -> Result<DateTime<Utc>, NormaliseError> {
    DateTime::<Utc>::from_timestamp_millis(ms).ok_or(NormaliseError::Timestamp(ms))
}
