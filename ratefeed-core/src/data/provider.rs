//! Quote source trait and structured fetch errors.
//!
//! The QuoteSource trait abstracts over market-data endpoints so the pipeline
//! can run against any provider exposing the daily chart shape, and against
//! in-memory fakes in tests.

use crate::domain::RatePoint;
use thiserror::Error;

/// Structured error types for a single symbol fetch.
///
/// All of them are recovered at the per-symbol boundary in the pipeline.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("provider returned HTTP {status}")]
    Status { status: u16 },

    #[error("no usable series: {0}")]
    EmptyResult(String),

    #[error("response could not be decoded: {0}")]
    Decode(String),

    #[error("invalid timestamp in response: {0}")]
    InvalidTimestamp(i64),
}

/// Result of a successful fetch for a single symbol.
///
/// `points` is non-empty, strictly ascending by day and holds only positive values.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub symbol: String,
    pub points: Vec<RatePoint>,
}

/// Trait for market-data sources.
///
/// One call issues one outbound request; implementations do not retry.
pub trait QuoteSource {
    /// Human-readable name of this source.
    fn name(&self) -> &str;

    /// Fetch up to `window_days` daily closes for `symbol`.
    fn fetch(&self, symbol: &str, window_days: u32) -> Result<FetchResult, FetchError>;
}
