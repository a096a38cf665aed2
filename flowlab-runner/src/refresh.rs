//! Refresh orchestration — one screener run end to end.
//!
//! `run_refresh` is the explicit entry point: listing source, bar source,
//! progress observer, and run date are all injected, so the whole pipeline
//! runs against mocks in tests with no network or fixed clock.

use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use serde::Serialize;

use flowlab_core::data::{BarProvider, ListingProvider};
use flowlab_core::domain::{FailureRecord, SymbolMeta, SymbolRecord};

use crate::aggregate::{collect_records, AggregateOptions, RefreshProgress};
use crate::config::RefreshConfig;
use crate::persist::{write_artifacts, ArtifactPaths, OutputLayout};

/// Counters for one run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RefreshSummary {
    /// Universe size after market filtering.
    pub universe: usize,
    pub records: usize,
    pub skipped: usize,
    pub failed: usize,
    #[serde(skip)]
    pub elapsed: Duration,
}

impl RefreshSummary {
    pub fn log_summary(&self, operation: &str) {
        tracing::info!(
            operation = operation,
            universe = self.universe,
            records = self.records,
            skipped = self.skipped,
            failed = self.failed,
            elapsed = format!("{:.1}s", self.elapsed.as_secs_f64()),
            "run complete"
        );
    }
}

/// Everything one run produced.
#[derive(Debug)]
pub struct RefreshOutput {
    /// The result set, sorted by code.
    pub records: Vec<SymbolRecord>,
    pub failures: Vec<FailureRecord>,
    pub artifacts: ArtifactPaths,
    pub summary: RefreshSummary,
}

/// Run one full refresh: listing → parallel fetch + compute → persist.
///
/// Per-symbol errors are isolated into failure records. Listing and
/// persistence errors are fatal and propagate with context.
pub fn run_refresh(
    config: &RefreshConfig,
    run_date: NaiveDate,
    listing: &dyn ListingProvider,
    bars: &dyn BarProvider,
    progress: &dyn RefreshProgress,
) -> Result<RefreshOutput> {
    let started = Instant::now();
    let start_date = config.start().context("invalid refresh config")?;

    let all = listing
        .fetch_listing()
        .with_context(|| format!("fetch listing from {}", listing.name()))?;
    let total_listed = all.len();

    let universe: Vec<SymbolMeta> = all
        .into_iter()
        .filter(|m| m.market == config.market && m.market_cap > 0.0)
        .collect();
    if universe.is_empty() {
        bail!(
            "listing from {} has no {} symbols ({} rows total)",
            listing.name(),
            config.market,
            total_listed
        );
    }
    tracing::info!(
        market = %config.market,
        symbols = universe.len(),
        listed = total_listed,
        provider = bars.name(),
        "universe loaded"
    );

    let opts = AggregateOptions {
        workers: config.workers,
        start: start_date,
    };
    let aggregate = collect_records(&universe, bars, &opts, progress)?;

    // Completion order is nondeterministic; pin the artifact order here.
    let mut records = aggregate.records;
    records.sort_by(|a, b| a.code.cmp(&b.code));
    let mut failures = aggregate.failures;
    failures.sort_by(|a, b| a.code.cmp(&b.code));

    let layout = OutputLayout::new(&config.output_dir);
    let artifacts = write_artifacts(&layout, &records, &failures, run_date)
        .with_context(|| format!("persist artifacts under {}", layout.root().display()))?;

    let summary = RefreshSummary {
        universe: universe.len(),
        records: records.len(),
        skipped: aggregate.skipped,
        failed: failures.len(),
        elapsed: started.elapsed(),
    };
    summary.log_summary("refresh");

    Ok(RefreshOutput {
        records,
        failures,
        artifacts,
        summary,
    })
}
