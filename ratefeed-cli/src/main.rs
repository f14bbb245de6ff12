//! ratefeed CLI: run the FX rate ingestion pipeline and inspect its configuration.
//!
//! Commands:
//! - `run`: fetch daily closes, derive reciprocal pairs, persist, print the report
//! - `pairs`: list the configured symbol → pair → reciprocal table
//! - `config`: print the effective (or default) configuration as TOML

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ratefeed_core::config::{PipelineConfig, StorageBackend, StorageConfig};
use ratefeed_core::pipeline::{
    Pipeline, PipelineProgress, QuietProgress, RunReport, StdoutProgress, ThreadSleepPacer,
};
use ratefeed_core::store::{RateStore, RestStore, SqliteStore};
use ratefeed_core::YahooChartSource;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "ratefeed",
    about = "ratefeed: daily FX rate ingestion into a historical rates table"
)]
struct Cli {
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch, derive and persist rates for every configured pair.
    Run {
        /// Path to a TOML config file. Defaults are used when omitted.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Restrict the run to these configured symbols (e.g. EURUSD=X).
        #[arg(long, num_args = 1..)]
        symbols: Vec<String>,

        /// Override the number of days requested per symbol.
        #[arg(long)]
        window_days: Option<u32>,

        /// Fetch and derive only; nothing is written.
        #[arg(long, default_value_t = false)]
        dry_run: bool,

        /// Print the run report as JSON instead of status lines.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// List the configured symbol → pair → reciprocal table.
    Pairs {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective configuration as TOML (secrets are never printed).
    Config {
        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print the built-in default configuration instead.
        #[arg(long, default_value_t = false)]
        default: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Run {
            config,
            symbols,
            window_days,
            dry_run,
            json,
        } => run_pipeline(config.as_deref(), symbols, window_days, dry_run, json),
        Commands::Pairs { config } => run_pairs(config.as_deref()),
        Commands::Config { config, default } => run_config(config.as_deref(), default),
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run_pipeline(
    config_path: Option<&Path>,
    symbols: Vec<String>,
    window_days: Option<u32>,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let mut config = PipelineConfig::load(config_path).context("loading configuration")?;
    if let Some(days) = window_days {
        config.source.window_days = days;
        config.validate().context("validating --window-days")?;
    }

    let mut pairs = config.pair_table()?;
    if !symbols.is_empty() {
        let sym_refs: Vec<&str> = symbols.iter().map(|s| s.as_str()).collect();
        pairs = pairs.restrict(&sym_refs)?;
    }

    let source = YahooChartSource::new(&config.source).context("building quote source")?;
    let store = if dry_run {
        None
    } else {
        Some(open_store(&config.storage)?)
    };

    let progress: &dyn PipelineProgress = if json { &QuietProgress } else { &StdoutProgress };
    let pipeline = Pipeline::new(
        &source,
        store.as_deref(),
        &pairs,
        &ThreadSleepPacer,
        progress,
    );

    let report = pipeline.run(&config.run_options());

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_summary(&report);
    }

    Ok(())
}

fn open_store(storage: &StorageConfig) -> Result<Box<dyn RateStore>> {
    let store: Box<dyn RateStore> = match storage.backend {
        StorageBackend::Sqlite => Box::new(
            SqliteStore::open(&storage.sqlite_path, &storage.table)
                .context("opening sqlite store")?,
        ),
        StorageBackend::Rest => {
            let url = storage
                .rest_url
                .as_deref()
                .context("storage.rest_url is not set")?;
            let key = storage
                .service_key
                .as_deref()
                .context("storage service key is not set")?;
            Box::new(RestStore::new(
                url,
                key,
                Duration::from_secs(storage.timeout_secs),
            )?)
        }
    };
    tracing::info!(backend = store.name(), table = %storage.table, "storage ready");
    Ok(store)
}

fn run_pairs(config_path: Option<&Path>) -> Result<()> {
    let config = PipelineConfig::resolve(config_path).context("loading configuration")?;
    let pairs = config.pair_table()?;

    println!("{:<12} {:<10} {:<10}", "Symbol", "Pair", "Reciprocal");
    println!("{}", "-".repeat(34));
    for entry in pairs.entries() {
        println!(
            "{:<12} {:<10} {:<10}",
            entry.symbol,
            entry.code.as_str(),
            entry.reciprocal.as_str()
        );
    }
    Ok(())
}

fn run_config(config_path: Option<&Path>, default: bool) -> Result<()> {
    let config = if default {
        PipelineConfig::default()
    } else {
        PipelineConfig::resolve(config_path).context("loading configuration")?
    };
    print!("{}", config.to_toml()?);
    Ok(())
}

fn print_summary(report: &RunReport) {
    println!();
    println!("=== Run Report ===");
    println!(
        "Mode:           {}",
        if report.dry_run { "dry run" } else { "persist" }
    );
    println!(
        "Duration:       {:.1}s",
        (report.finished_at - report.started_at).num_milliseconds() as f64 / 1000.0
    );
    println!("Pairs:          {}", report.pairs_processed);
    println!(
        "Records:        {}/{} written",
        report.total_written, report.total_requested
    );
    println!();
    println!(
        "{:<10} {:<10} {:>10} {:>10} {:>8}",
        "Pair", "From", "Points", "Written", "Failed"
    );
    println!("{}", "-".repeat(52));
    for (pair, outcome) in &report.per_pair {
        println!(
            "{:<10} {:<10} {:>10} {:>10} {:>8}",
            pair,
            outcome.derived_from.as_deref().unwrap_or("-"),
            outcome.requested,
            outcome.written,
            outcome.failed_chunks
        );
    }
    for failure in &report.failed_symbols {
        println!("WARNING: {} not fetched: {}", failure.symbol, failure.error);
    }
    println!();
}
