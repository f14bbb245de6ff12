//! ratefeed core: daily FX rate ingestion.
//!
//! This crate contains the whole ingestion pipeline:
//! - Domain types (pair codes, the fixed pair/reciprocal table, rate points and series)
//! - Inverse derivation of reciprocal pairs
//! - Quote source trait and the v8 chart adapter
//! - Append-only rate stores (SQLite, REST table insert)
//! - Chunked best-effort persistence
//! - The sequential fetch → derive → pace → persist → report orchestrator
//! - Configuration from TOML and the environment

pub mod config;
pub mod data;
pub mod domain;
pub mod persist;
pub mod pipeline;
pub mod store;

pub use config::{ConfigError, PipelineConfig, StorageBackend};
pub use data::{FetchError, QuoteSource, YahooChartSource};
pub use domain::{PairCode, PairEntry, PairTable, RatePoint, RateSeries};
pub use persist::{persist_series, PersistOutcome};
pub use pipeline::{
    Pacer, Pipeline, PipelineProgress, QuietProgress, RunOptions, RunReport, StdoutProgress,
    ThreadSleepPacer,
};
pub use store::{RateRecord, RateStore, RestStore, SqliteStore, StoreError};
