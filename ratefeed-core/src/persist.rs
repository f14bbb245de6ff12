//! Chunked, best-effort persistence of one rate series.
//!
//! Chunks are written sequentially in series order. A failed chunk is logged and
//! counted as unwritten; the remaining chunks are still attempted.

use crate::domain::{PairCode, RateSeries};
use crate::store::{RateRecord, RateStore};
use serde::Serialize;

/// A chunk that could not be written, as a half-open point range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChunkFailure {
    pub start: usize,
    pub end: usize,
    pub error: String,
}

/// Outcome of persisting one series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PersistOutcome {
    pub pair: PairCode,
    pub requested: usize,
    pub written: usize,
    pub failed_chunks: Vec<ChunkFailure>,
}

impl PersistOutcome {
    pub fn is_complete(&self) -> bool {
        self.written == self.requested
    }
}

/// Write `series` to `table` in chunks of at most `chunk_size` rows.
///
/// Never fails: the returned outcome says how many points actually landed.
pub fn persist_series(
    store: &dyn RateStore,
    table: &str,
    series: &RateSeries,
    chunk_size: usize,
) -> PersistOutcome {
    let chunk_size = chunk_size.max(1);
    let pair = series.pair();
    let records: Vec<RateRecord> = series
        .points()
        .iter()
        .map(|p| RateRecord::from_point(pair, p))
        .collect();

    let mut written = 0;
    let mut failed_chunks = Vec::new();

    for (i, chunk) in records.chunks(chunk_size).enumerate() {
        let start = i * chunk_size;
        let end = start + chunk.len();

        match store.insert(table, chunk) {
            Ok(()) => {
                written += chunk.len();
                tracing::debug!(pair = %pair, chunk_start = start, chunk_end = end, "chunk written");
            }
            Err(e) => {
                tracing::error!(
                    pair = %pair,
                    chunk_start = start,
                    chunk_end = end,
                    error = %e,
                    "chunk write failed, continuing with next chunk"
                );
                failed_chunks.push(ChunkFailure {
                    start,
                    end,
                    error: e.to_string(),
                });
            }
        }
    }

    PersistOutcome {
        pair: pair.clone(),
        requested: records.len(),
        written,
        failed_chunks,
    }
}
