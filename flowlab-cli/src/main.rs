//! FlowLab CLI — KOSPI volume-flow screener.
//!
//! Commands:
//! - `refresh` — run the full pipeline: listing → parallel fetch + metrics
//!   → CSV artifacts (primary, dated archive, sector and cap-tier splits)
//! - `universe` — show the symbol universe grouped by sector
//! - `archive list` — list dated snapshots, most recent first

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use flowlab_core::data::{
    BarProvider, KrxListingProvider, ListingProvider, SyntheticProvider, UniverseFile,
    YahooChartProvider,
};
use flowlab_runner::{run_refresh, RefreshConfig, RefreshOutput, StdoutProgress};

#[derive(Parser)]
#[command(name = "flowlab", about = "FlowLab CLI — KOSPI volume-flow screener")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full refresh pipeline and write CSV artifacts.
    Refresh {
        /// Path to a TOML config file. Defaults apply when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// First date of history per symbol (YYYY-MM-DD).
        #[arg(long)]
        start: Option<String>,

        /// Concurrent in-flight fetches.
        #[arg(long)]
        workers: Option<usize>,

        /// Root directory for artifacts.
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Offline universe file (TOML) instead of the live KRX listing.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Synthetic bar series instead of live market data.
        #[arg(long, default_value_t = false)]
        synthetic: bool,

        /// Seed for the synthetic provider.
        #[arg(long, default_value_t = 42)]
        seed: u64,
    },
    /// Show the symbol universe grouped by sector.
    Universe {
        /// Offline universe file (TOML) instead of the live KRX listing.
        #[arg(long)]
        universe: Option<PathBuf>,

        /// Listing snapshot date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        as_of: Option<String>,
    },
    /// Archive snapshot commands.
    Archive {
        #[command(subcommand)]
        action: ArchiveAction,
    },
}

#[derive(Subcommand)]
enum ArchiveAction {
    /// List dated snapshots, most recent first.
    List {
        /// Root directory the refresh wrote to.
        #[arg(long, default_value = "out")]
        output_dir: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "flowlab_core={0},flowlab_runner={0},flowlab_cli={0}",
                    cli.log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Refresh {
            config,
            start,
            workers,
            output_dir,
            universe,
            synthetic,
            seed,
        } => run_refresh_cmd(config, start, workers, output_dir, universe, synthetic, seed),
        Commands::Universe { universe, as_of } => run_universe_cmd(universe, as_of),
        Commands::Archive { action } => match action {
            ArchiveAction::List { output_dir } => run_archive_list(&output_dir),
        },
    }
}

#[allow(clippy::too_many_arguments)]
fn run_refresh_cmd(
    config_path: Option<PathBuf>,
    start: Option<String>,
    workers: Option<usize>,
    output_dir: Option<PathBuf>,
    universe_path: Option<PathBuf>,
    synthetic: bool,
    seed: u64,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            RefreshConfig::from_file(&path).with_context(|| format!("load {}", path.display()))?
        }
        None => RefreshConfig::default(),
    };
    if let Some(start) = start {
        config.start_date = start;
    }
    if let Some(workers) = workers {
        config.workers = workers;
    }
    if let Some(dir) = output_dir {
        config.output_dir = dir;
    }
    config.validate().context("invalid refresh configuration")?;

    let run_date = chrono::Local::now().date_naive();
    tracing::info!(run_date = %run_date, market = %config.market, "refresh starting");

    // The listing source: an explicit universe file wins; a synthetic run
    // without one falls back to the built-in demo universe rather than
    // hitting KRX for symbols it will fake anyway.
    let universe_file = match &universe_path {
        Some(path) => Some(
            UniverseFile::from_file(path)
                .with_context(|| format!("load universe {}", path.display()))?,
        ),
        None if synthetic => Some(UniverseFile::default_kospi()),
        None => None,
    };
    let krx;
    let listing: &dyn ListingProvider = match &universe_file {
        Some(file) => file,
        None => {
            krx = KrxListingProvider::new(run_date);
            &krx
        }
    };

    let yahoo;
    let synth;
    let bars: &dyn BarProvider = if synthetic {
        synth = SyntheticProvider::new(seed);
        &synth
    } else {
        yahoo = YahooChartProvider::new();
        &yahoo
    };

    let output = run_refresh(&config, run_date, listing, bars, &StdoutProgress)?;
    print_refresh_summary(&config, &output);
    Ok(())
}

fn print_refresh_summary(config: &RefreshConfig, output: &RefreshOutput) {
    let summary = &output.summary;
    println!();
    println!("=== Refresh Result ===");
    println!("Market:    {}", config.market);
    println!("Universe:  {} symbols", summary.universe);
    println!("Records:   {}", summary.records);
    println!("Skipped:   {} (short history)", summary.skipped);
    println!("Failed:    {}", summary.failed);
    println!("Elapsed:   {:.1}s", summary.elapsed.as_secs_f64());
    println!();
    println!("Primary:   {}", output.artifacts.primary.display());
    println!("Archive:   {}", output.artifacts.archive.display());
    println!(
        "Partitions: {} sector file(s), {} tier file(s)",
        output.artifacts.sectors.len(),
        output.artifacts.tiers.len()
    );

    if let Some(failures) = &output.artifacts.failures {
        println!();
        println!(
            "WARNING: {} symbol(s) failed. See {} for details.",
            summary.failed,
            failures.display()
        );
    }
}

fn run_universe_cmd(universe_path: Option<PathBuf>, as_of: Option<String>) -> Result<()> {
    let as_of_date = as_of
        .as_deref()
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()
        .context("invalid --as-of date")?
        .unwrap_or_else(|| chrono::Local::now().date_naive());

    let universe_file = universe_path
        .map(|path| {
            UniverseFile::from_file(&path)
                .with_context(|| format!("load universe {}", path.display()))
        })
        .transpose()?;
    let krx;
    let listing: &dyn ListingProvider = match &universe_file {
        Some(file) => file,
        None => {
            krx = KrxListingProvider::new(as_of_date);
            &krx
        }
    };

    let metas = listing
        .fetch_listing()
        .with_context(|| format!("fetch listing from {}", listing.name()))?;

    let mut by_sector: BTreeMap<&str, usize> = BTreeMap::new();
    for meta in &metas {
        *by_sector.entry(meta.sector_label()).or_default() += 1;
    }

    println!("Universe: {} symbols ({})", metas.len(), listing.name());
    println!();
    println!("{:<24} {:>8}", "Sector", "Symbols");
    println!("{}", "-".repeat(33));
    for (sector, count) in &by_sector {
        println!("{:<24} {:>8}", sector, count);
    }

    Ok(())
}

fn run_archive_list(output_dir: &Path) -> Result<()> {
    let archive_dir = output_dir.join("archive");
    if !archive_dir.exists() {
        println!("No archive directory at {}", archive_dir.display());
        return Ok(());
    }

    let mut snapshots: Vec<(String, u64)> = Vec::new();
    for entry in std::fs::read_dir(&archive_dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if !name.starts_with("flow_") || !name.ends_with(".csv") {
            continue;
        }
        let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
        snapshots.push((name, size));
    }

    if snapshots.is_empty() {
        println!("Archive is empty: {}", archive_dir.display());
        return Ok(());
    }

    // Names embed the date as flow_YYYYMMDD.csv, so a reverse lexical
    // sort is newest-first.
    snapshots.sort_by(|a, b| b.0.cmp(&a.0));

    println!("Archive: {}", archive_dir.display());
    println!();
    println!("{:<24} {:>10}", "Snapshot", "Size");
    println!("{}", "-".repeat(35));
    for (name, size) in &snapshots {
        println!("{:<24} {:>10}", name, format_size(*size));
    }

    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
