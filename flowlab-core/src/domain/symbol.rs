//! Listing identity and per-run result records.

use serde::{Deserialize, Serialize};

use crate::metrics::MetricSnapshot;

/// One row of the exchange listing: identity plus market capitalization.
///
/// `sector` is optional — not every listing source carries a sector
/// classification, and the pipeline degrades gracefully when it is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolMeta {
    pub code: String,
    pub name: String,
    pub market: String,
    pub market_cap: f64,
    pub sector: Option<String>,
}

impl SymbolMeta {
    /// Sector label used for grouping and display. Missing sectors
    /// collapse into a single "Unknown" bucket.
    pub fn sector_label(&self) -> &str {
        self.sector.as_deref().unwrap_or("Unknown")
    }
}

/// One symbol's computed row for a single run: listing identity joined
/// with the latest bar's metrics. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SymbolRecord {
    pub code: String,
    pub name: String,
    pub sector: Option<String>,
    pub market_cap: f64,
    pub close: f64,
    pub volume: u64,
    pub volume_spike: f64,
    pub momentum: f64,
    pub rsi: f64,
    pub avg_close_20: f64,
}

impl SymbolRecord {
    pub fn new(meta: &SymbolMeta, snapshot: MetricSnapshot) -> Self {
        Self {
            code: meta.code.clone(),
            name: meta.name.clone(),
            sector: meta.sector.clone(),
            market_cap: meta.market_cap,
            close: snapshot.close,
            volume: snapshot.volume,
            volume_spike: snapshot.volume_spike,
            momentum: snapshot.momentum,
            rsi: snapshot.rsi,
            avg_close_20: snapshot.avg_close_20,
        }
    }

    pub fn sector_label(&self) -> &str {
        self.sector.as_deref().unwrap_or("Unknown")
    }
}

/// A symbol whose fetch or metric computation failed this run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub code: String,
    pub error: String,
}

/// Market-capitalization tercile bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CapTier {
    Small,
    Mid,
    Large,
}

impl CapTier {
    /// Display label, matching the artifact naming convention.
    pub fn label(self) -> &'static str {
        match self {
            CapTier::Small => "Small Cap",
            CapTier::Mid => "Mid Cap",
            CapTier::Large => "Large Cap",
        }
    }

    /// All tiers, smallest first.
    pub fn all() -> [CapTier; 3] {
        [CapTier::Small, CapTier::Mid, CapTier::Large]
    }
}
