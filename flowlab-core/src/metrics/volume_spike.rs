//! Volume spike — current volume relative to its trailing average.
//!
//! spike[t] = volume[t] / mean(volume[t-period+1..=t])
//! The window includes the current bar. Lookback: period - 1.
//! A zero trailing mean yields NaN rather than infinity.

use crate::domain::Bar;
use crate::metrics::Metric;

#[derive(Debug, Clone)]
pub struct VolumeSpike {
    period: usize,
    name: String,
}

impl VolumeSpike {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "VolumeSpike period must be >= 1");
        Self {
            period,
            name: format!("volume_spike_{period}"),
        }
    }
}

impl Metric for VolumeSpike {
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

        let mut sum: u64 = bars.iter().take(self.period).map(|b| b.volume).sum();
        result[self.period - 1] = ratio(bars[self.period - 1].volume, sum, self.period);

        for i in self.period..n {
            sum = sum - bars[i - self.period].volume + bars[i].volume;
            result[i] = ratio(bars[i].volume, sum, self.period);
        }

        result
    }
}

fn ratio(volume: u64, window_sum: u64, period: usize) -> f64 {
    let mean = window_sum as f64 / period as f64;
    if mean == 0.0 {
        f64::NAN
    } else {
        volume as f64 / mean
    }
}
