//! Aggregator behavior under a bounded worker pool.
//!
//! The deterministic mock provider lets us assert the exact outcome split
//! regardless of completion order, and the in-flight counter proves the
//! pool really bounds concurrency.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;

use flowlab_core::data::{BarProvider, FetchError};
use flowlab_core::domain::{Bar, SymbolMeta};
use flowlab_runner::{collect_records, AggregateOptions, RefreshProgress, SilentProgress, SymbolOutcome};

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, 1).unwrap()
}

fn meta(code: &str) -> SymbolMeta {
    SymbolMeta {
        code: code.into(),
        name: format!("name-{code}"),
        market: "KOSPI".into(),
        market_cap: 1.0e12,
        sector: None,
    }
}

fn series(len: usize) -> Vec<Bar> {
    let base = NaiveDate::from_ymd_opt(2023, 1, 2).unwrap();
    (0..len)
        .map(|i| {
            let close = 1000.0 + i as f64;
            Bar {
                date: base + chrono::Duration::days(i as i64),
                open: close - 1.0,
                high: close + 5.0,
                low: close - 5.0,
                close,
                volume: 10_000,
            }
        })
        .collect()
}

/// Mock provider: codes prefixed "F" fail deterministically, codes
/// prefixed "H" return short history, everything else succeeds. Tracks
/// the peak number of concurrent in-flight fetches.
struct MockProvider {
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

impl MockProvider {
    fn new() -> Self {
        Self {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl BarProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn fetch(&self, code: &str, _start: NaiveDate) -> Result<Vec<Bar>, FetchError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(current, Ordering::SeqCst);
        // Give workers a chance to overlap so the peak is meaningful.
        std::thread::sleep(Duration::from_millis(5));
        let result = if code.starts_with('F') {
            Err(FetchError::Other(format!("deliberate failure for {code}")))
        } else if code.starts_with('H') {
            Ok(series(49))
        } else {
            Ok(series(60))
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[test]
fn half_failing_universe_splits_exactly() {
    // 20 symbols, 10 failing, worker limit 3 → exactly 10 records and
    // 10 failures on every run, whatever order completions arrive in.
    let mut symbols = Vec::new();
    for i in 0..10 {
        symbols.push(meta(&format!("S{i:03}")));
        symbols.push(meta(&format!("F{i:03}")));
    }

    let provider = MockProvider::new();
    let opts = AggregateOptions {
        workers: 3,
        start: start_date(),
    };

    let agg = collect_records(&symbols, &provider, &opts, &SilentProgress).unwrap();

    assert_eq!(agg.records.len(), 10);
    assert_eq!(agg.failures.len(), 10);
    assert_eq!(agg.skipped, 0);
    assert!(agg.records.iter().all(|r| r.code.starts_with('S')));
    assert!(agg.failures.iter().all(|f| f.code.starts_with('F')));
    assert!(
        agg.failures.iter().all(|f| f.error.contains("deliberate failure")),
        "failure messages should carry the provider error"
    );
}

#[test]
fn worker_limit_bounds_in_flight_fetches() {
    let symbols: Vec<SymbolMeta> = (0..30).map(|i| meta(&format!("S{i:03}"))).collect();
    let provider = MockProvider::new();
    let opts = AggregateOptions {
        workers: 3,
        start: start_date(),
    };

    collect_records(&symbols, &provider, &opts, &SilentProgress).unwrap();

    assert!(
        provider.peak() <= 3,
        "peak concurrency {} exceeded worker limit",
        provider.peak()
    );
}

#[test]
fn short_history_is_skipped_not_failed() {
    let symbols = vec![meta("S000"), meta("H000"), meta("H001")];
    let provider = MockProvider::new();
    let opts = AggregateOptions {
        workers: 2,
        start: start_date(),
    };

    let agg = collect_records(&symbols, &provider, &opts, &SilentProgress).unwrap();

    assert_eq!(agg.records.len(), 1);
    assert_eq!(agg.skipped, 2);
    assert!(agg.failures.is_empty());
}

/// Progress observer that counts callbacks.
struct CountingProgress {
    symbol_calls: AtomicUsize,
    batch_calls: AtomicUsize,
    last_done: AtomicUsize,
}

impl RefreshProgress for CountingProgress {
    fn on_symbol_done(&self, _code: &str, done: usize, total: usize, _outcome: &SymbolOutcome) {
        assert_eq!(total, 20);
        assert!(done >= 1 && done <= total);
        self.symbol_calls.fetch_add(1, Ordering::SeqCst);
        self.last_done.fetch_max(done, Ordering::SeqCst);
    }

    fn on_batch_done(&self, records: usize, skipped: usize, failed: usize, total: usize) {
        assert_eq!((records, skipped, failed, total), (10, 0, 10, 20));
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[test]
fn progress_reports_every_completion() {
    let mut symbols = Vec::new();
    for i in 0..10 {
        symbols.push(meta(&format!("S{i:03}")));
        symbols.push(meta(&format!("F{i:03}")));
    }

    let provider = MockProvider::new();
    let progress = CountingProgress {
        symbol_calls: AtomicUsize::new(0),
        batch_calls: AtomicUsize::new(0),
        last_done: AtomicUsize::new(0),
    };
    let opts = AggregateOptions {
        workers: 4,
        start: start_date(),
    };

    collect_records(&symbols, &provider, &opts, &progress).unwrap();

    assert_eq!(progress.symbol_calls.load(Ordering::SeqCst), 20);
    assert_eq!(progress.last_done.load(Ordering::SeqCst), 20);
    assert_eq!(progress.batch_calls.load(Ordering::SeqCst), 1);
}
