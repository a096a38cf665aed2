//! FlowLab Core — domain types, flow metrics, and market data providers.
//!
//! This crate contains the building blocks of the screener pipeline:
//! - Domain types (bars, symbol listings, computed records)
//! - Rolling flow metrics (volume spike, momentum, RSI, average close)
//! - Data provider traits with concrete KRX listing and Yahoo chart
//!   implementations, plus a deterministic synthetic provider for
//!   offline runs and tests

pub mod data;
pub mod domain;
pub mod metrics;
