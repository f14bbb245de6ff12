//! Append-only storage for historical rates.
//!
//! The pipeline's only write contract is "insert N rows of `{pair, rate, timestamp}`".
//! Each `insert` call is one independent batch; the persistence writer decides
//! how rows are chunked.

pub mod rest;
pub mod sqlite;

pub use rest::RestStore;
pub use sqlite::SqliteStore;

use crate::domain::{PairCode, RatePoint};
use chrono::SecondsFormat;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One persisted row. `timestamp` is an ISO-8601 UTC string (`2024-01-02T00:00:00Z`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateRecord {
    pub pair: String,
    pub rate: f64,
    pub timestamp: String,
}

impl RateRecord {
    pub fn from_point(pair: &PairCode, point: &RatePoint) -> Self {
        Self {
            pair: pair.as_str().to_string(),
            rate: point.value(),
            timestamp: point
                .timestamp()
                .to_rfc3339_opts(SecondsFormat::Secs, true),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("storage connection failed: {0}")]
    Connection(String),

    #[error("write failed: {0}")]
    Write(String),

    #[error("storage rejected batch (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("invalid table name '{0}'")]
    InvalidTable(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Write(e.to_string())
    }
}

/// Append-capable tabular store.
pub trait RateStore {
    /// Human-readable backend name.
    fn name(&self) -> &str;

    /// Append `rows` to `table` as a single batch.
    fn insert(&self, table: &str, rows: &[RateRecord]) -> Result<(), StoreError>;
}

/// Table names are interpolated into SQL and URLs, so only plain identifiers pass.
pub fn validate_table_name(table: &str) -> Result<(), StoreError> {
    let mut chars = table.chars();
    let valid = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(StoreError::InvalidTable(table.to_string()))
    }
}
