//! market-refresh: periodic market-data refresh for the IPO dashboard
//!
//! This library provides the core components for:
//! - Market-hours gating in the exchange time zone
//! - Loading the tracked ticker universe from the dashboard store
//! - Batched last-price lookups from the quote provider
//! - Idempotent upserts into the shared price cache
//! - Cycle orchestration with partial-failure tolerance
//! - Logging and metrics

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod fetch;
pub mod market;
pub mod refresh;
pub mod source;
pub mod store;
pub mod telemetry;
