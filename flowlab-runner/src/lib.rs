//! FlowLab Runner — refresh orchestration on top of `flowlab-core`.
//!
//! This crate drives one screener run end to end:
//! - Config loading (TOML file + defaults)
//! - Bounded parallel fetch + metric aggregation with progress reporting
//! - CSV artifact persistence (primary, dated archive, sector and
//!   cap-tier partitions, failure report)
//! - Run summary with structured log output

pub mod aggregate;
pub mod config;
pub mod persist;
pub mod refresh;

pub use aggregate::{
    collect_records, Aggregate, AggregateOptions, RefreshProgress, SilentProgress, StdoutProgress,
    SymbolOutcome,
};
pub use config::{ConfigError, RefreshConfig};
pub use persist::{cap_tiers, write_artifacts, ArtifactPaths, OutputLayout, PersistError};
pub use refresh::{run_refresh, RefreshOutput, RefreshSummary};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn config_is_send_sync() {
        assert_send::<RefreshConfig>();
        assert_sync::<RefreshConfig>();
    }

    #[test]
    fn outcome_is_send_sync() {
        assert_send::<SymbolOutcome>();
        assert_sync::<SymbolOutcome>();
    }

    #[test]
    fn summary_is_send_sync() {
        assert_send::<RefreshSummary>();
        assert_sync::<RefreshSummary>();
    }
}
