//! Pipeline orchestrator: fetch, derive, pace, persist, report.
//!
//! Symbols are processed strictly one after another. Every fetch and derive
//! happens first (with a pause between symbols), then every series is persisted
//! in configured order: each direct series followed by its reciprocal.

use crate::data::provider::{FetchError, QuoteSource};
use crate::domain::{invert, PairTable, RateSeries};
use crate::persist::{persist_series, PersistOutcome};
use crate::store::RateStore;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Suspension between consecutive symbol fetches.
pub trait Pacer {
    fn pause(&self, delay: Duration);
}

/// Production pacer: blocks the current thread.
pub struct ThreadSleepPacer;

impl Pacer for ThreadSleepPacer {
    fn pause(&self, delay: Duration) {
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }
    }
}

/// Progress callback for a pipeline run.
pub trait PipelineProgress {
    /// Called when starting to fetch a symbol.
    fn on_fetch_start(&self, symbol: &str, index: usize, total: usize);

    /// Called when a symbol fetch completes; `Ok` carries the point count.
    fn on_fetch_complete(
        &self,
        symbol: &str,
        index: usize,
        total: usize,
        result: &Result<usize, FetchError>,
    );

    /// Called after a series has been persisted.
    fn on_save_complete(&self, outcome: &PersistOutcome);

    /// Called once the report is assembled.
    fn on_run_complete(&self, report: &RunReport);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl PipelineProgress for StdoutProgress {
    fn on_fetch_start(&self, symbol: &str, index: usize, total: usize) {
        println!("[{}/{}] Fetching {symbol}...", index + 1, total);
    }

    fn on_fetch_complete(
        &self,
        symbol: &str,
        _index: usize,
        _total: usize,
        result: &Result<usize, FetchError>,
    ) {
        match result {
            Ok(points) => println!("  OK: {symbol} ({points} points)"),
            Err(e) => println!("  FAIL: {symbol}: {e}"),
        }
    }

    fn on_save_complete(&self, outcome: &PersistOutcome) {
        if outcome.failed_chunks.is_empty() {
            println!("  Saved {}: {} records", outcome.pair, outcome.written);
        } else {
            println!(
                "  Saved {}: {}/{} records ({} chunk(s) failed)",
                outcome.pair,
                outcome.written,
                outcome.requested,
                outcome.failed_chunks.len()
            );
        }
    }

    fn on_run_complete(&self, report: &RunReport) {
        println!(
            "\nRun complete: {} records written across {} pairs, {} symbol(s) failed",
            report.total_written,
            report.pairs_processed,
            report.failed_symbols.len()
        );
    }
}

/// Reporter that prints nothing (machine-readable output modes).
pub struct QuietProgress;

impl PipelineProgress for QuietProgress {
    fn on_fetch_start(&self, _symbol: &str, _index: usize, _total: usize) {}

    fn on_fetch_complete(
        &self,
        _symbol: &str,
        _index: usize,
        _total: usize,
        _result: &Result<usize, FetchError>,
    ) {
    }

    fn on_save_complete(&self, _outcome: &PersistOutcome) {}

    fn on_run_complete(&self, _report: &RunReport) {}
}

/// Per-run knobs, normally taken from [`crate::config::PipelineConfig::run_options`].
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    pub window_days: u32,
    pub chunk_size: usize,
    pub pacing: Duration,
    pub table: String,
}

/// Per-pair counts in the report.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PairOutcome {
    pub requested: usize,
    pub written: usize,
    pub failed_chunks: usize,
    /// Direct pair this series was derived from, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SymbolFailure {
    pub symbol: String,
    pub error: String,
}

/// Authoritative summary of what a run actually persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub dry_run: bool,
    pub total_requested: usize,
    pub total_written: usize,
    pub pairs_processed: usize,
    pub per_pair: BTreeMap<String, PairOutcome>,
    pub failed_symbols: Vec<SymbolFailure>,
}

impl RunReport {
    /// True when every symbol fetched and every point was written.
    pub fn is_complete(&self) -> bool {
        self.failed_symbols.is_empty() && self.total_written == self.total_requested
    }
}

/// The orchestrator. Without a store the run is a dry run: nothing is persisted
/// and written counts stay at zero.
pub struct Pipeline<'a> {
    source: &'a dyn QuoteSource,
    store: Option<&'a dyn RateStore>,
    pairs: &'a PairTable,
    pacer: &'a dyn Pacer,
    progress: &'a dyn PipelineProgress,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        source: &'a dyn QuoteSource,
        store: Option<&'a dyn RateStore>,
        pairs: &'a PairTable,
        pacer: &'a dyn Pacer,
        progress: &'a dyn PipelineProgress,
    ) -> Self {
        Self {
            source,
            store,
            pairs,
            pacer,
            progress,
        }
    }

    /// Run every phase over the whole pair table. Per-symbol and per-chunk
    /// failures are absorbed into the report.
    pub fn run(&self, opts: &RunOptions) -> RunReport {
        let started_at = Utc::now();
        tracing::info!(
            source = self.source.name(),
            symbols = self.pairs.len(),
            window_days = opts.window_days,
            dry_run = self.store.is_none(),
            "pipeline run started"
        );

        let (series, failed_symbols) = self.fetch_and_derive(opts);

        let mut per_pair = BTreeMap::new();
        let mut total_requested = 0;
        let mut total_written = 0;

        for s in &series {
            let outcome = match self.store {
                Some(store) => {
                    let outcome = persist_series(store, &opts.table, s, opts.chunk_size);
                    tracing::info!(
                        pair = %outcome.pair,
                        written = outcome.written,
                        requested = outcome.requested,
                        "series saved"
                    );
                    self.progress.on_save_complete(&outcome);
                    outcome
                }
                None => PersistOutcome {
                    pair: s.pair().clone(),
                    requested: s.len(),
                    written: 0,
                    failed_chunks: Vec::new(),
                },
            };

            total_requested += outcome.requested;
            total_written += outcome.written;
            per_pair.insert(
                outcome.pair.to_string(),
                PairOutcome {
                    requested: outcome.requested,
                    written: outcome.written,
                    failed_chunks: outcome.failed_chunks.len(),
                    derived_from: s.derived_from().map(|c| c.to_string()),
                },
            );
        }

        let report = RunReport {
            started_at,
            finished_at: Utc::now(),
            dry_run: self.store.is_none(),
            total_requested,
            total_written,
            pairs_processed: series.len(),
            per_pair,
            failed_symbols,
        };

        tracing::info!(
            total_written = report.total_written,
            total_requested = report.total_requested,
            pairs = report.pairs_processed,
            failed_symbols = report.failed_symbols.len(),
            "pipeline run complete"
        );
        self.progress.on_run_complete(&report);
        report
    }

    /// FETCH → DERIVE → PACE for each symbol in table order.
    fn fetch_and_derive(&self, opts: &RunOptions) -> (Vec<RateSeries>, Vec<SymbolFailure>) {
        let entries = self.pairs.entries();
        let total = entries.len();
        let mut series = Vec::with_capacity(total * 2);
        let mut failures = Vec::new();

        for (i, entry) in entries.iter().enumerate() {
            self.progress.on_fetch_start(&entry.symbol, i, total);

            let result = self.source.fetch(&entry.symbol, opts.window_days);
            let status = result.as_ref().map(|r| r.points.len()).map_err(FetchError::clone);
            self.progress.on_fetch_complete(&entry.symbol, i, total, &status);

            match result {
                Ok(fetched) => {
                    tracing::info!(
                        symbol = %entry.symbol,
                        pair = %entry.code,
                        points = fetched.points.len(),
                        "fetch succeeded"
                    );
                    let direct = RateSeries::from_points(entry.code.clone(), fetched.points);
                    let derived = invert(&direct, &entry.reciprocal);
                    series.push(direct);
                    series.push(derived);
                }
                Err(e) => {
                    tracing::warn!(symbol = %entry.symbol, error = %e, "fetch failed, skipping symbol");
                    failures.push(SymbolFailure {
                        symbol: entry.symbol.clone(),
                        error: e.to_string(),
                    });
                }
            }

            if i + 1 < total {
                self.pacer.pause(opts.pacing);
            }
        }

        (series, failures)
    }
}
