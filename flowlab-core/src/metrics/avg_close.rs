//! Rolling mean of close prices.
//!
//! The 20-day variant feeds the display layer's trend arrow, which compares
//! the latest close against this average. Lookback: period - 1.

use crate::domain::Bar;
use crate::metrics::Metric;

#[derive(Debug, Clone)]
pub struct AvgClose {
    period: usize,
    name: String,
}

impl AvgClose {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "AvgClose period must be >= 1");
        Self {
            period,
            name: format!("avg_close_{period}"),
        }
    }
}

impl Metric for AvgClose {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let n = bars.len();
        let mut result = vec![f64::NAN; n];

        if n < self.period {
            return result;
        }

        for t in (self.period - 1)..n {
            let window = &bars[t + 1 - self.period..=t];
            if window.iter().any(|b| b.close.is_nan()) {
                continue;
            }
            let sum: f64 = window.iter().map(|b| b.close).sum();
            result[t] = sum / self.period as f64;
        }

        result
    }
}
