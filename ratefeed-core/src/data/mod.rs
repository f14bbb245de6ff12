//! Market-data sources

pub mod provider;
pub mod yahoo;

pub use provider::{FetchError, FetchResult, QuoteSource};
pub use yahoo::{parse_chart, YahooChartSource};
