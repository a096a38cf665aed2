//! Synthetic bar provider — deterministic random-walk series.
//!
//! Used for offline demo runs and tests where the network is unavailable
//! or unwanted. The walk is seeded from the provider seed and the symbol
//! code, so the same (seed, code) pair always yields the same series.

use std::hash::{Hash, Hasher};

use chrono::{Datelike, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::provider::{BarProvider, FetchError};
use crate::domain::Bar;

pub struct SyntheticProvider {
    seed: u64,
    end: NaiveDate,
}

impl SyntheticProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            end: chrono::Utc::now().date_naive(),
        }
    }

    /// Fixed end date, for reproducible series lengths in tests.
    pub fn with_end(seed: u64, end: NaiveDate) -> Self {
        Self { seed, end }
    }

    fn symbol_seed(&self, code: &str) -> u64 {
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        code.hash(&mut hasher);
        self.seed ^ hasher.finish()
    }
}

impl BarProvider for SyntheticProvider {
    fn name(&self) -> &str {
        "synthetic"
    }

    fn fetch(&self, code: &str, start: NaiveDate) -> Result<Vec<Bar>, FetchError> {
        if start > self.end {
            return Err(FetchError::EmptySeries {
                symbol: code.to_string(),
            });
        }

        let mut rng = StdRng::seed_from_u64(self.symbol_seed(code));
        let mut close = 5_000.0 + rng.gen_range(0.0..95_000.0);
        let base_volume = rng.gen_range(50_000..500_000) as f64;

        let mut bars = Vec::new();
        let mut date = start;
        while date <= self.end {
            if !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) {
                let open = close;
                let ret: f64 = rng.gen_range(-0.03..0.03);
                close = (open * (1.0 + ret)).max(100.0);
                let spread = rng.gen_range(0.0..0.015);
                let high = open.max(close) * (1.0 + spread);
                let low = open.min(close) * (1.0 - spread);
                // Occasional volume surge to exercise the spike metric.
                let surge = if rng.gen_bool(0.05) { 5.0 } else { 1.0 };
                let volume = (base_volume * rng.gen_range(0.5..2.0) * surge) as u64;
                bars.push(Bar {
                    date,
                    open,
                    high,
                    low,
                    close,
                    volume,
                });
            }
            date = date.succ_opt().expect("date overflow");
        }

        if bars.is_empty() {
            return Err(FetchError::EmptySeries {
                symbol: code.to_string(),
            });
        }
        Ok(bars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window() -> (NaiveDate, NaiveDate) {
        (
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
        )
    }

    #[test]
    fn series_is_deterministic_per_code() {
        let (start, end) = window();
        let provider = SyntheticProvider::with_end(42, end);
        let a = provider.fetch("005930", start).unwrap();
        let b = provider.fetch("005930", start).unwrap();
        assert_eq!(a.len(), b.len());
        assert_eq!(a[10].close, b[10].close);
        assert_eq!(a[10].volume, b[10].volume);
    }

    #[test]
    fn different_codes_diverge() {
        let (start, end) = window();
        let provider = SyntheticProvider::with_end(42, end);
        let a = provider.fetch("005930", start).unwrap();
        let b = provider.fetch("000660", start).unwrap();
        assert_ne!(a[0].close, b[0].close);
    }

    #[test]
    fn skips_weekends_and_stays_sane() {
        let (start, end) = window();
        let provider = SyntheticProvider::with_end(7, end);
        let bars = provider.fetch("105560", start).unwrap();
        assert!(bars.len() > 100, "six months of weekdays expected");
        for bar in &bars {
            assert!(!matches!(
                bar.date.weekday(),
                Weekday::Sat | Weekday::Sun
            ));
            assert!(bar.is_sane(), "insane bar at {}", bar.date);
        }
    }

    #[test]
    fn start_after_end_is_empty() {
        let provider =
            SyntheticProvider::with_end(1, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        let err = provider
            .fetch("005930", NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
            .unwrap_err();
        assert!(matches!(err, FetchError::EmptySeries { .. }));
    }
}
