//! Latest-bar metric snapshot.
//!
//! Joins the final value of every flow metric into one record per symbol.
//! The calculator is stateless: every call re-derives the full series.

use thiserror::Error;

use crate::domain::Bar;
use crate::metrics::{AvgClose, Metric, Momentum, Rsi, VolumeSpike};

/// Minimum series length before a symbol is worth screening.
///
/// Shorter series are skipped outright — this is a history floor, not an
/// error: recently listed symbols simply sit out the run.
pub const MIN_BARS: usize = 50;

/// Trailing window for the volume average and the close average.
pub const VOLUME_SPIKE_PERIOD: usize = 20;
/// Close-difference lookback for momentum.
pub const MOMENTUM_PERIOD: usize = 5;
/// Gain/loss window for RSI.
pub const RSI_PERIOD: usize = 14;
/// Close-average window exported for the display layer's trend arrow.
pub const AVG_CLOSE_PERIOD: usize = 20;

#[derive(Debug, Error)]
pub enum MetricError {
    #[error("insufficient history: {got} bars, need {need}")]
    InsufficientHistory { got: usize, need: usize },

    #[error("metric {name} undefined at the final bar")]
    Undefined { name: String },
}

/// The final bar's computed metrics, rounded for presentation.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct MetricSnapshot {
    pub close: f64,
    pub volume: u64,
    pub volume_spike: f64,
    pub momentum: f64,
    pub rsi: f64,
    pub avg_close_20: f64,
}

impl MetricSnapshot {
    /// Compute the snapshot for the last bar of `bars`.
    ///
    /// Series shorter than [`MIN_BARS`] yield `InsufficientHistory` (the
    /// caller skips, it does not fail). A metric that is still NaN at the
    /// final bar of a long-enough series means the series itself is
    /// malformed (NaN closes, zero volume window) and surfaces as
    /// `Undefined` — the computation-error channel.
    pub fn compute(bars: &[Bar]) -> Result<Self, MetricError> {
        if bars.len() < MIN_BARS {
            return Err(MetricError::InsufficientHistory {
                got: bars.len(),
                need: MIN_BARS,
            });
        }

        let last = bars.len() - 1;
        let volume_spike = final_value(&VolumeSpike::new(VOLUME_SPIKE_PERIOD), bars, last)?;
        let momentum = final_value(&Momentum::new(MOMENTUM_PERIOD), bars, last)?;
        let rsi = final_value(&Rsi::new(RSI_PERIOD), bars, last)?;
        let avg_close_20 = final_value(&AvgClose::new(AVG_CLOSE_PERIOD), bars, last)?;

        Ok(Self {
            close: bars[last].close,
            volume: bars[last].volume,
            volume_spike: round2(volume_spike),
            momentum: round2(momentum),
            rsi: round2(rsi),
            avg_close_20: round2(avg_close_20),
        })
    }
}

fn final_value(metric: &dyn Metric, bars: &[Bar], last: usize) -> Result<f64, MetricError> {
    let value = metric.compute(bars)[last];
    if value.is_nan() {
        Err(MetricError::Undefined {
            name: metric.name().to_string(),
        })
    } else {
        Ok(value)
    }
}

/// Round to two decimal places, half away from zero.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
