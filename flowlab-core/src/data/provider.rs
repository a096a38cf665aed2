//! Data provider traits and structured error types.
//!
//! The traits abstract over the listing source (which symbols exist) and
//! the bar source (per-symbol history) so the pipeline can swap
//! implementations and mock both for tests.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::{Bar, SymbolMeta};

/// Structured error types for data operations.
///
/// One fetch attempt per symbol is terminal for the run: there is no retry
/// loop behind these, the caller converts the error into a failure record
/// and moves on.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("rate limited by provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("symbol not found: {symbol}")]
    SymbolNotFound { symbol: String },

    #[error("empty series for {symbol}")]
    EmptySeries { symbol: String },

    #[error("listing error: {0}")]
    Listing(String),

    #[error("data error: {0}")]
    Other(String),
}

/// Source of per-symbol daily bar history.
///
/// `fetch` returns the full series from `start` up to the present, ascending
/// by date. Network-level timeouts live inside implementations; there is no
/// batch-level deadline.
pub trait BarProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch daily bars for a symbol from `start` to now.
    fn fetch(&self, code: &str, start: NaiveDate) -> Result<Vec<Bar>, FetchError>;
}

/// Source of the symbol universe (the exchange listing).
pub trait ListingProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch the full listing: one `SymbolMeta` per listed symbol.
    fn fetch_listing(&self) -> Result<Vec<SymbolMeta>, FetchError>;
}
