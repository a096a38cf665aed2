//! Persistence writer — CSV artifacts for one run.
//!
//! Writes, in order: the primary table, a dated archive copy, one file per
//! sector, one file per market-cap tier, and (only when failures occurred)
//! the failure report. All writes are full overwrites with no atomicity —
//! a crash mid-write leaves a partial file, the next run replaces it.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use thiserror::Error;

use flowlab_core::domain::{CapTier, FailureRecord, SymbolRecord};

pub const PRIMARY_FILE: &str = "latest_flow.csv";
pub const ARCHIVE_DIR: &str = "archive";
pub const SECTORS_DIR: &str = "sectors";
pub const TIERS_DIR: &str = "tiers";
pub const FAILURES_FILE: &str = "failed_symbols.csv";

/// Column set shared by the primary, archive, sector, and tier artifacts.
pub const RECORD_HEADER: [&str; 10] = [
    "Code",
    "Name",
    "Sector",
    "MarketCap",
    "Close",
    "Volume",
    "Volume Spike",
    "Momentum",
    "RSI",
    "20-day Avg Close",
];

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("create directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("write {path}: {source}")]
    Write { path: PathBuf, source: csv::Error },

    #[error("archive copy {from} -> {to}: {source}")]
    Archive {
        from: PathBuf,
        to: PathBuf,
        source: std::io::Error,
    },
}

/// Filesystem layout of one output root.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    root: PathBuf,
}

impl OutputLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn primary(&self) -> PathBuf {
        self.root.join(PRIMARY_FILE)
    }

    pub fn archive_dir(&self) -> PathBuf {
        self.root.join(ARCHIVE_DIR)
    }

    /// One archive file per run day; same-day re-runs overwrite.
    pub fn archive_file(&self, run_date: NaiveDate) -> PathBuf {
        self.archive_dir()
            .join(format!("flow_{}.csv", run_date.format("%Y%m%d")))
    }

    pub fn sectors_dir(&self) -> PathBuf {
        self.root.join(SECTORS_DIR)
    }

    pub fn sector_file(&self, sector: &str) -> PathBuf {
        self.sectors_dir()
            .join(format!("{}.csv", sanitize_component(sector)))
    }

    pub fn tiers_dir(&self) -> PathBuf {
        self.root.join(TIERS_DIR)
    }

    pub fn tier_file(&self, tier: CapTier) -> PathBuf {
        self.tiers_dir()
            .join(format!("{}.csv", sanitize_component(tier.label())))
    }

    pub fn failures(&self) -> PathBuf {
        self.root.join(FAILURES_FILE)
    }
}

/// Paths written by one run.
#[derive(Debug, Clone)]
pub struct ArtifactPaths {
    pub primary: PathBuf,
    pub archive: PathBuf,
    pub sectors: Vec<PathBuf>,
    pub tiers: Vec<PathBuf>,
    /// None when the run had no failures (no file is written then).
    pub failures: Option<PathBuf>,
}

/// Make a sector or tier name safe as a file name: path separators and
/// spaces become underscores.
pub fn sanitize_component(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ' ' => '_',
            other => other,
        })
        .collect()
}

/// Rank-based market-cap terciles, smallest first.
///
/// Each tier holds ⌊N/3⌋ or ⌈N/3⌉ records; remainder rows land in the
/// lower tiers first. Ties on market cap break by code so the split is
/// deterministic.
pub fn cap_tiers(records: &[SymbolRecord]) -> [(CapTier, Vec<&SymbolRecord>); 3] {
    let mut ranked: Vec<&SymbolRecord> = records.iter().collect();
    ranked.sort_by(|a, b| {
        a.market_cap
            .partial_cmp(&b.market_cap)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.code.cmp(&b.code))
    });

    let n = ranked.len();
    let base = n / 3;
    let rem = n % 3;
    let small_len = base + usize::from(rem > 0);
    let mid_len = base + usize::from(rem > 1);

    let large = ranked.split_off(small_len + mid_len);
    let mid = ranked.split_off(small_len);
    let small = ranked;

    [
        (CapTier::Small, small),
        (CapTier::Mid, mid),
        (CapTier::Large, large),
    ]
}

/// Write the full artifact set for one run.
///
/// `records` should already be in the order the artifacts should carry
/// (the orchestrator sorts by code). Partition files preserve that order,
/// so concatenating them reproduces the primary row set.
pub fn write_artifacts(
    layout: &OutputLayout,
    records: &[SymbolRecord],
    failures: &[FailureRecord],
    run_date: NaiveDate,
) -> Result<ArtifactPaths, PersistError> {
    for dir in [
        layout.root().to_path_buf(),
        layout.archive_dir(),
        layout.sectors_dir(),
        layout.tiers_dir(),
    ] {
        std::fs::create_dir_all(&dir)
            .map_err(|source| PersistError::CreateDir { path: dir, source })?;
    }

    // 1. Primary artifact.
    let primary = layout.primary();
    write_records(&primary, records.iter())?;

    // 2. Dated archive copy of the primary.
    let archive = layout.archive_file(run_date);
    std::fs::copy(&primary, &archive).map_err(|source| PersistError::Archive {
        from: primary.clone(),
        to: archive.clone(),
        source,
    })?;

    // 3. Sector partitions.
    let mut by_sector: BTreeMap<&str, Vec<&SymbolRecord>> = BTreeMap::new();
    for record in records {
        by_sector.entry(record.sector_label()).or_default().push(record);
    }
    let mut sectors = Vec::with_capacity(by_sector.len());
    for (sector, group) in &by_sector {
        let path = layout.sector_file(sector);
        write_records(&path, group.iter().copied())?;
        sectors.push(path);
    }

    // 4. Cap-tier partitions. Empty tiers still get a header-only file.
    let mut tiers = Vec::with_capacity(3);
    for (tier, group) in cap_tiers(records) {
        let path = layout.tier_file(tier);
        write_records(&path, group.into_iter())?;
        tiers.push(path);
    }

    // 5. Failure report, only when something failed. A stale report from a
    // previous run is left in place, mirroring the overwrite-only policy.
    let failures_path = if failures.is_empty() {
        None
    } else {
        let path = layout.failures();
        write_failures(&path, failures)?;
        Some(path)
    };

    Ok(ArtifactPaths {
        primary,
        archive,
        sectors,
        tiers,
        failures: failures_path,
    })
}

fn write_records<'a>(
    path: &Path,
    records: impl Iterator<Item = &'a SymbolRecord>,
) -> Result<(), PersistError> {
    let wrap = |source: csv::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(wrap)?;
    wtr.write_record(RECORD_HEADER).map_err(wrap)?;
    for r in records {
        wtr.write_record([
            r.code.as_str(),
            r.name.as_str(),
            r.sector_label(),
            &format!("{:.0}", r.market_cap),
            &format!("{:.2}", r.close),
            &r.volume.to_string(),
            &format!("{:.2}", r.volume_spike),
            &format!("{:.2}", r.momentum),
            &format!("{:.2}", r.rsi),
            &format!("{:.2}", r.avg_close_20),
        ])
        .map_err(wrap)?;
    }
    wtr.flush().map_err(|e| wrap(csv::Error::from(e)))?;
    Ok(())
}

fn write_failures(path: &Path, failures: &[FailureRecord]) -> Result<(), PersistError> {
    let wrap = |source: csv::Error| PersistError::Write {
        path: path.to_path_buf(),
        source,
    };

    let mut wtr = csv::Writer::from_path(path).map_err(wrap)?;
    wtr.write_record(["Code", "Error"]).map_err(wrap)?;
    for f in failures {
        wtr.write_record([f.code.as_str(), f.error.as_str()])
            .map_err(wrap)?;
    }
    wtr.flush().map_err(|e| wrap(csv::Error::from(e)))?;
    Ok(())
}
