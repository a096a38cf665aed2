//! Relative Strength Index (RSI) over simple rolling means.
//!
//! Gains and losses come from day-over-day close differences; the averages
//! are plain rolling means over the trailing `period` differences (no
//! Wilder smoothing). RSI = 100 - 100 / (1 + avg_gain / avg_loss).
//! Lookback: period (the first difference needs one prior bar).
//!
//! Policy for the zero-loss edge: avg_loss == 0 → RSI = 100. This covers
//! both the all-gains window and the perfectly flat window, so a constant
//! series reads as 100, never as undefined.

use crate::domain::Bar;
use crate::metrics::Metric;

#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    name: String,
}

impl Rsi {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "RSI period must be >= 1");
        Self {
            period,
            name: format!("rsi_{period}"),
        }
    }
}

impl Metric for Rsi {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period + 1 {
            return result;
        }

        // Day-over-day close differences; diffs[0] has no prior bar.
        let mut diffs = vec![f64::NAN; n];
        for i in 1..n {
            let curr = bars[i].close;
            let prev = bars[i - 1].close;
            diffs[i] = if curr.is_nan() || prev.is_nan() {
                f64::NAN
            } else {
                curr - prev
            };
        }

        for t in self.period..n {
            let window = &diffs[t + 1 - self.period..=t];
            if window.iter().any(|d| d.is_nan()) {
                continue;
            }
            let mut gain_sum = 0.0;
            let mut loss_sum = 0.0;
            for &d in window {
                if d > 0.0 {
                    gain_sum += d;
                } else {
                    loss_sum -= d;
                }
            }
            let avg_gain = gain_sum / self.period as f64;
            let avg_loss = loss_sum / self.period as f64;
            result[t] = rsi_value(avg_gain, avg_loss);
        }

        result
    }
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if avg_loss == 0.0 {
        100.0
    } else if avg_gain == 0.0 {
        0.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}
