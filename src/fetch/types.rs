//! Quote provider response shapes and normalization
//!
//! The spark endpoint answers a one-symbol request with a bare series
//! object and a multi-symbol request with an object keyed by symbol.
//! [`normalize_response`] turns either into the same per-ticker map.

use crate::market::{PriceRecord, Ticker};
use chrono::{DateTime, Utc};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::de;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// Time series for one symbol
#[derive(Debug, Clone, Deserialize)]
pub struct SparkSeries {
    /// Symbol echoed by the provider, when present
    #[serde(default)]
    pub symbol: Option<String>,
    /// Sample times (unix seconds)
    #[serde(default, deserialize_with = "null_as_empty")]
    pub timestamp: Vec<i64>,
    /// Close prices, `null` where the sample is missing
    #[serde(default, deserialize_with = "null_as_empty")]
    pub close: Vec<Option<f64>>,
}

/// Raw spark response in either of its shapes
///
/// Batch entries are decoded one at a time: an entry that is `null` or not a
/// series is dropped without failing its neighbours. Only a body that is
/// neither a series nor an object is rejected.
#[derive(Debug, Clone)]
pub enum SparkResponse {
    /// One-symbol request
    Single(SparkSeries),
    /// Multi-symbol request, keyed by symbol
    Batch(HashMap<String, SparkSeries>),
}

impl<'de> Deserialize<'de> for SparkResponse {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let Value::Object(body) = Value::deserialize(deserializer)? else {
            return Err(de::Error::custom(
                "expected a series object or an object keyed by symbol",
            ));
        };

        if is_series_object(&body) {
            return SparkSeries::deserialize(Value::Object(body))
                .map(Self::Single)
                .map_err(de::Error::custom);
        }

        let batch = body
            .into_iter()
            .filter_map(|(symbol, entry)| match SparkSeries::deserialize(entry) {
                Ok(series) => Some((symbol, series)),
                Err(e) => {
                    tracing::debug!(symbol = %symbol, error = %e, "Skipping unreadable series");
                    None
                }
            })
            .collect();
        Ok(Self::Batch(batch))
    }
}

/// A bare series carries its fields at the top level; batch values never
/// hold arrays or strings there
fn is_series_object(body: &Map<String, Value>) -> bool {
    body.get("close").is_some_and(|v| v.is_array() || v.is_null())
        || body.get("timestamp").is_some_and(|v| v.is_array() || v.is_null())
        || body.get("symbol").is_some_and(Value::is_string)
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

impl SparkSeries {
    /// Index and value of the last non-missing close
    pub fn latest_close(&self) -> Option<(usize, f64)> {
        self.close
            .iter()
            .enumerate()
            .rev()
            .find_map(|(i, close)| close.filter(|v| v.is_finite()).map(|v| (i, v)))
    }

    /// Build a record from the last valid sample
    ///
    /// `fallback_ts` is used when the provider sent no time for that sample.
    /// Returns `None` for an all-missing series or a non-positive price.
    pub fn latest_record(&self, ticker: Ticker, fallback_ts: DateTime<Utc>) -> Option<PriceRecord> {
        let (index, close) = self.latest_close()?;
        let price = Decimal::from_f64(close)?;
        let observed_at = self
            .timestamp
            .get(index)
            .and_then(|secs| DateTime::from_timestamp(*secs, 0))
            .unwrap_or(fallback_ts);

        PriceRecord::new(ticker, price, observed_at)
    }
}

/// Reshape a provider response into one record per requested ticker
///
/// Tickers without a usable price are left out. Symbols the provider
/// returns but that were not requested are ignored.
pub fn normalize_response(
    response: SparkResponse,
    requested: &BTreeSet<Ticker>,
    fetched_at: DateTime<Utc>,
) -> BTreeMap<Ticker, PriceRecord> {
    let series: Vec<(Option<Ticker>, SparkSeries)> = match response {
        SparkResponse::Single(series) => {
            // A bare series may omit its symbol; it can only belong to a lone request
            let ticker = series.symbol.as_deref().and_then(Ticker::new).or_else(|| {
                if requested.len() == 1 {
                    requested.iter().next().cloned()
                } else {
                    None
                }
            });
            vec![(ticker, series)]
        }
        SparkResponse::Batch(by_symbol) => by_symbol
            .into_iter()
            .map(|(symbol, series)| (Ticker::new(&symbol), series))
            .collect(),
    };

    let mut records = BTreeMap::new();
    for (ticker, series) in series {
        let Some(ticker) = ticker else {
            tracing::warn!("Dropping unlabeled series from multi-symbol response");
            continue;
        };
        if !requested.contains(&ticker) {
            tracing::debug!(ticker = %ticker, "Ignoring unrequested symbol");
            continue;
        }
        match series.latest_record(ticker.clone(), fetched_at) {
            Some(record) => {
                records.insert(ticker, record);
            }
            None => {
                tracing::debug!(ticker = %ticker, samples = series.close.len(), "No usable price");
            }
        }
    }

    records
}
