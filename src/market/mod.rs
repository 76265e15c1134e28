//! Market module
//!
//! Ticker and price types plus the trading-hours gate

mod clock;
mod types;

pub use clock::{MarketClock, MarketWindow};
pub use types::{PriceRecord, Ticker};
