//! Persistence writer tests: partition round-trips, tercile invariants,
//! archive copies, and the failure report policy.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDate;
use proptest::prelude::*;

use flowlab_core::domain::{FailureRecord, SymbolRecord};
use flowlab_runner::{cap_tiers, write_artifacts, OutputLayout};

fn record(code: &str, sector: Option<&str>, cap: f64) -> SymbolRecord {
    SymbolRecord {
        code: code.into(),
        name: format!("name-{code}"),
        sector: sector.map(String::from),
        market_cap: cap,
        close: 12_345.0,
        volume: 67_890,
        volume_spike: 1.23,
        momentum: -45.0,
        rsi: 55.5,
        avg_close_20: 12_000.5,
    }
}

fn run_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 7, 14).unwrap()
}

fn read_rows(path: &Path) -> Vec<Vec<String>> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.records()
        .map(|r| r.unwrap().iter().map(String::from).collect())
        .collect()
}

fn read_header(path: &Path) -> Vec<String> {
    let mut rdr = csv::Reader::from_path(path).unwrap();
    rdr.headers().unwrap().iter().map(String::from).collect()
}

#[test]
fn sector_partitions_reproduce_primary_rows() {
    let records = vec![
        record("000100", Some("전기전자"), 3.0e12),
        record("000200", Some("금융업"), 1.0e12),
        record("000300", Some("전기전자"), 2.0e12),
        record("000400", None, 5.0e11),
        record("000500", Some("운수/창고"), 8.0e11),
    ];

    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let artifacts = write_artifacts(&layout, &records, &[], run_date()).unwrap();

    // Four distinct sector labels (None → Unknown).
    assert_eq!(artifacts.sectors.len(), 4);
    assert!(layout.sectors_dir().join("운수_창고.csv").exists());
    assert!(layout.sectors_dir().join("Unknown.csv").exists());

    let mut primary_rows = read_rows(&artifacts.primary);
    let mut partition_rows: Vec<Vec<String>> = artifacts
        .sectors
        .iter()
        .flat_map(|p| read_rows(p))
        .collect();

    primary_rows.sort();
    partition_rows.sort();
    assert_eq!(primary_rows, partition_rows);
}

#[test]
fn tier_partitions_reproduce_primary_rows() {
    let records: Vec<SymbolRecord> = (0..11)
        .map(|i| record(&format!("{i:06}"), Some("섹터"), (i as f64 + 1.0) * 1.0e11))
        .collect();

    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let artifacts = write_artifacts(&layout, &records, &[], run_date()).unwrap();

    assert_eq!(artifacts.tiers.len(), 3);
    assert!(layout.tiers_dir().join("Small_Cap.csv").exists());
    assert!(layout.tiers_dir().join("Mid_Cap.csv").exists());
    assert!(layout.tiers_dir().join("Large_Cap.csv").exists());

    let mut primary_rows = read_rows(&artifacts.primary);
    let mut tier_rows: Vec<Vec<String>> =
        artifacts.tiers.iter().flat_map(|p| read_rows(p)).collect();

    primary_rows.sort();
    tier_rows.sort();
    assert_eq!(primary_rows, tier_rows);
}

#[test]
fn archive_copy_matches_primary() {
    let records = vec![record("000100", Some("전기전자"), 1.0e12)];
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let artifacts = write_artifacts(&layout, &records, &[], run_date()).unwrap();

    assert_eq!(
        artifacts.archive,
        layout.archive_dir().join("flow_20250714.csv")
    );
    let primary = std::fs::read_to_string(&artifacts.primary).unwrap();
    let archive = std::fs::read_to_string(&artifacts.archive).unwrap();
    assert_eq!(primary, archive);
}

#[test]
fn rerun_same_day_overwrites_archive() {
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());

    let first = vec![record("000100", None, 1.0e12)];
    write_artifacts(&layout, &first, &[], run_date()).unwrap();

    let second = vec![record("000200", None, 2.0e12)];
    let artifacts = write_artifacts(&layout, &second, &[], run_date()).unwrap();

    let archive_files: Vec<_> = std::fs::read_dir(layout.archive_dir())
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(archive_files.len(), 1);

    let rows = read_rows(&artifacts.archive);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0][0], "000200");
}

#[test]
fn failure_report_written_only_on_failures() {
    let records = vec![record("000100", None, 1.0e12)];
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());

    let clean = write_artifacts(&layout, &records, &[], run_date()).unwrap();
    assert!(clean.failures.is_none());
    assert!(!layout.failures().exists());

    let failures = vec![FailureRecord {
        code: "000900".into(),
        error: "symbol not found: 000900".into(),
    }];
    let failed = write_artifacts(&layout, &records, &failures, run_date()).unwrap();
    let path = failed.failures.expect("failure report expected");
    assert_eq!(read_header(&path), vec!["Code", "Error"]);
    let rows = read_rows(&path);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0], vec!["000900", "symbol not found: 000900"]);
}

#[test]
fn primary_header_includes_avg_close_column() {
    let records = vec![record("000100", None, 1.0e12)];
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    let artifacts = write_artifacts(&layout, &records, &[], run_date()).unwrap();

    let header = read_header(&artifacts.primary);
    assert_eq!(
        header,
        vec![
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
        ]
    );
}

#[test]
fn empty_tier_still_gets_header_only_file() {
    // Two records: remainder fills the lower tiers, so the large tier is
    // empty but its file still appears with just the header.
    let records = vec![
        record("000100", None, 1.0e12),
        record("000200", None, 2.0e12),
    ];
    let dir = tempfile::tempdir().unwrap();
    let layout = OutputLayout::new(dir.path());
    write_artifacts(&layout, &records, &[], run_date()).unwrap();

    let large = layout.tiers_dir().join("Large_Cap.csv");
    assert!(large.exists());
    assert!(read_rows(&large).is_empty());
    assert_eq!(read_header(&large).len(), 10);
}

proptest! {
    /// Tercile invariants for any cap distribution: each tier holds
    /// ⌊N/3⌋ or ⌈N/3⌉ records, tiers are disjoint, and their union is
    /// the full record set.
    #[test]
    fn tercile_sizes_disjoint_exhaustive(caps in prop::collection::vec(1.0e9..1.0e15f64, 1..200)) {
        let records: Vec<SymbolRecord> = caps
            .iter()
            .enumerate()
            .map(|(i, &cap)| record(&format!("{i:06}"), None, cap))
            .collect();

        let n = records.len();
        let tiers = cap_tiers(&records);

        let floor = n / 3;
        let ceil = n.div_ceil(3);
        let mut seen: HashSet<&str> = HashSet::new();
        let mut total = 0usize;

        for (_, group) in &tiers {
            prop_assert!(group.len() == floor || group.len() == ceil,
                "tier size {} outside [{floor}, {ceil}] for n={n}", group.len());
            total += group.len();
            for r in group {
                prop_assert!(seen.insert(r.code.as_str()), "record {} in two tiers", r.code);
            }
        }
        prop_assert_eq!(total, n);

        // Ordering across tiers: every small cap <= every mid cap <= every large cap.
        let max_of = |group: &[&SymbolRecord]| {
            group.iter().map(|r| r.market_cap).fold(f64::MIN, f64::max)
        };
        let min_of = |group: &[&SymbolRecord]| {
            group.iter().map(|r| r.market_cap).fold(f64::MAX, f64::min)
        };
        let [(_, small), (_, mid), (_, large)] = tiers;
        if !small.is_empty() && !mid.is_empty() {
            prop_assert!(max_of(&small) <= min_of(&mid));
        }
        if !mid.is_empty() && !large.is_empty() {
            prop_assert!(max_of(&mid) <= min_of(&large));
        }
    }
}
