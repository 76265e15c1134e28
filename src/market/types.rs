//! Market data types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// An uppercase instrument symbol (e.g., "AAPL")
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Ticker(String);

impl Ticker {
    /// Normalize a raw symbol, returning `None` when it is blank
    pub fn new(symbol: &str) -> Option<Self> {
        let symbol = symbol.trim();
        if symbol.is_empty() {
            return None;
        }
        Some(Self(symbol.to_uppercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Ticker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Borrow<str> for Ticker {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// Latest observed price for a ticker
///
/// The price is always strictly positive; records that would violate this
/// cannot be constructed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PriceRecord {
    ticker: Ticker,
    price: Decimal,
    observed_at: DateTime<Utc>,
}

impl PriceRecord {
    /// Create a record, rejecting zero and negative prices
    pub fn new(ticker: Ticker, price: Decimal, observed_at: DateTime<Utc>) -> Option<Self> {
        if price <= Decimal::ZERO {
            return None;
        }
        Some(Self {
            ticker,
            price,
            observed_at,
        })
    }

    pub fn ticker(&self) -> &Ticker {
        &self.ticker
    }

    pub fn price(&self) -> Decimal {
        self.price
    }

    /// Timestamp of the upstream sample the price was taken from
    pub fn observed_at(&self) -> DateTime<Utc> {
        self.observed_at
    }
}
