//! Rolling flow metrics.
//!
//! Each metric is a pure function over a full ascending bar series,
//! behind the `Metric` trait: series in, numeric series of the same
//! length out, NaN during warmup. The snapshot module joins the final
//! bar of every series into one `MetricSnapshot` per symbol.

pub mod avg_close;
pub mod momentum;
pub mod rsi;
pub mod snapshot;
pub mod volume_spike;

pub use avg_close::AvgClose;
pub use momentum::Momentum;
pub use rsi::Rsi;
pub use snapshot::{MetricError, MetricSnapshot, MIN_BARS};
pub use volume_spike::VolumeSpike;

use crate::domain::Bar;

/// Trait for rolling metrics.
///
/// Implementations take a full bar series and produce an output series of
/// the same length. The first `lookback()` values are `f64::NAN` (warmup).
/// No value at bar t may depend on data from bar t+1 or later.
pub trait Metric: Send + Sync {
    /// Human-readable name (e.g., "volume_spike_20", "rsi_14").
    fn name(&self) -> &str;

    /// Number of bars needed before the metric produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the metric for the entire bar series.
    fn compute(&self, bars: &[Bar]) -> Vec<f64>;
}

/// Create synthetic bars from close prices for testing.
///
/// Generates plausible OHLV: open = prev_close (or close for first bar),
/// high = max(open,close) + 1.0, low = min(open,close) - 1.0, volume = 1000.
#[cfg(test)]
pub fn make_bars(closes: &[f64]) -> Vec<Bar> {
    let base_date = chrono::NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            Bar {
                date: base_date + chrono::Duration::days(i as i64),
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: 1000,
            }
        })
        .collect()
}

/// Variant of [`make_bars`] with explicit per-bar volumes.
#[cfg(test)]
pub fn make_bars_with_volumes(closes: &[f64], volumes: &[u64]) -> Vec<Bar> {
    assert_eq!(closes.len(), volumes.len());
    let mut bars = make_bars(closes);
    for (bar, &v) in bars.iter_mut().zip(volumes) {
        bar.volume = v;
    }
    bars
}

/// Assert two f64 values are approximately equal (within epsilon).
#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

/// Default epsilon for metric tests.
#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
