//! Parallel aggregator — bounded fetch + compute fan-out.
//!
//! One unit of work is fetch-one-symbol-then-compute. Work runs on a
//! dedicated rayon pool sized to the configured worker limit, so at most
//! that many fetches are in flight at once. Per-symbol failures never
//! abort the batch; a symbol with too little history is skipped, which is
//! a distinct outcome from failure. Completion order is whatever the
//! network gives us — callers sort downstream if order matters.

use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use rayon::prelude::*;

use flowlab_core::data::{BarProvider, FetchError};
use flowlab_core::domain::{FailureRecord, SymbolMeta, SymbolRecord};
use flowlab_core::metrics::{MetricError, MetricSnapshot};

#[derive(Debug, Clone)]
pub struct AggregateOptions {
    /// Concurrent in-flight fetches.
    pub workers: usize,
    /// First date of history requested per symbol.
    pub start: NaiveDate,
}

/// What happened to one symbol this run.
#[derive(Debug, Clone)]
pub enum SymbolOutcome {
    Record(SymbolRecord),
    /// Not enough history — deliberately neither a record nor a failure.
    Skipped,
    Failed(FailureRecord),
}

/// Progress observer, called from worker threads as symbols finish.
pub trait RefreshProgress: Send + Sync {
    /// Called when a symbol finishes. `done` counts completions so far.
    fn on_symbol_done(&self, code: &str, done: usize, total: usize, outcome: &SymbolOutcome);

    /// Called once after the pool drains.
    fn on_batch_done(&self, records: usize, skipped: usize, failed: usize, total: usize);
}

/// Progress reporter that prints to stdout.
pub struct StdoutProgress;

impl RefreshProgress for StdoutProgress {
    fn on_symbol_done(&self, code: &str, done: usize, total: usize, outcome: &SymbolOutcome) {
        match outcome {
            SymbolOutcome::Record(_) => println!("[{done}/{total}] {code} OK"),
            SymbolOutcome::Skipped => println!("[{done}/{total}] {code} skipped (short history)"),
            SymbolOutcome::Failed(f) => println!("[{done}/{total}] {code} FAIL: {}", f.error),
        }
    }

    fn on_batch_done(&self, records: usize, skipped: usize, failed: usize, total: usize) {
        println!(
            "\nFetch complete: {records} records, {skipped} skipped, {failed} failed ({total} symbols)"
        );
    }
}

/// No-op progress for tests and embedded use.
pub struct SilentProgress;

impl RefreshProgress for SilentProgress {
    fn on_symbol_done(&self, _: &str, _: usize, _: usize, _: &SymbolOutcome) {}
    fn on_batch_done(&self, _: usize, _: usize, _: usize, _: usize) {}
}

/// Collected outcomes of one batch, in no particular order.
#[derive(Debug, Default)]
pub struct Aggregate {
    pub records: Vec<SymbolRecord>,
    pub failures: Vec<FailureRecord>,
    pub skipped: usize,
}

/// Fan the universe out over a bounded worker pool and collect outcomes.
///
/// The rayon `collect` merges per-worker results after the pool drains, so
/// no shared mutable state exists beyond the progress counter.
pub fn collect_records(
    symbols: &[SymbolMeta],
    provider: &dyn BarProvider,
    opts: &AggregateOptions,
    progress: &dyn RefreshProgress,
) -> Result<Aggregate> {
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(opts.workers.max(1))
        .thread_name(|i| format!("flow-fetch-{i}"))
        .build()
        .context("build fetch worker pool")?;

    let total = symbols.len();
    let done = AtomicUsize::new(0);

    let outcomes: Vec<SymbolOutcome> = pool.install(|| {
        symbols
            .par_iter()
            .map(|meta| {
                let outcome = process_symbol(meta, provider, opts.start);
                let finished = done.fetch_add(1, Ordering::SeqCst) + 1;
                progress.on_symbol_done(&meta.code, finished, total, &outcome);
                outcome
            })
            .collect()
    });

    let mut aggregate = Aggregate::default();
    for outcome in outcomes {
        match outcome {
            SymbolOutcome::Record(record) => aggregate.records.push(record),
            SymbolOutcome::Skipped => aggregate.skipped += 1,
            SymbolOutcome::Failed(failure) => aggregate.failures.push(failure),
        }
    }

    progress.on_batch_done(
        aggregate.records.len(),
        aggregate.skipped,
        aggregate.failures.len(),
        total,
    );
    Ok(aggregate)
}

/// One worker's unit of work: single fetch attempt, then compute.
fn process_symbol(
    meta: &SymbolMeta,
    provider: &dyn BarProvider,
    start: NaiveDate,
) -> SymbolOutcome {
    let bars = match provider.fetch(&meta.code, start) {
        Ok(bars) => bars,
        // An empty series is the degenerate short-history case.
        Err(FetchError::EmptySeries { .. }) => return SymbolOutcome::Skipped,
        Err(e) => {
            return SymbolOutcome::Failed(FailureRecord {
                code: meta.code.clone(),
                error: e.to_string(),
            })
        }
    };

    match MetricSnapshot::compute(&bars) {
        Ok(snapshot) => SymbolOutcome::Record(SymbolRecord::new(meta, snapshot)),
        Err(MetricError::InsufficientHistory { .. }) => SymbolOutcome::Skipped,
        Err(e @ MetricError::Undefined { .. }) => SymbolOutcome::Failed(FailureRecord {
            code: meta.code.clone(),
            error: e.to_string(),
        }),
    }
}
