//! Yahoo-style v8 chart source.
//!
//! Fetches a fixed window of daily closes with `range={n}d&interval=1d`.
//! Only the parallel `timestamp` / `close` arrays are used; null closes are
//! dropped, never interpolated.

use super::provider::{FetchError, FetchResult, QuoteSource};
use crate::config::SourceConfig;
use crate::domain::{day_start, normalize_points, RatePoint};
use reqwest::Url;
use serde::Deserialize;
use std::time::Duration;

/// v8 chart API response.
#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: Option<ChartMeta>,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
}

#[derive(Debug, Deserialize)]
struct QuoteData {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

/// Chart-endpoint quote source.
pub struct YahooChartSource {
    client: reqwest::blocking::Client,
    base_url: Url,
    api_key: Option<(String, String)>,
}

impl YahooChartSource {
    pub fn new(config: &SourceConfig) -> Result<Self, FetchError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| FetchError::Transport(format!("failed to build HTTP client: {e}")))?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| FetchError::Transport(format!("invalid base URL '{}': {e}", config.base_url)))?;

        let api_key = config
            .api_key
            .clone()
            .map(|key| (config.api_key_header.clone(), key));

        Ok(Self {
            client,
            base_url,
            api_key,
        })
    }

    /// Build the chart URL for a symbol and day window.
    fn chart_url(&self, symbol: &str, window_days: u32) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                FetchError::Transport(format!("base URL cannot take a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .push(symbol);
        url.query_pairs_mut()
            .append_pair("range", &format!("{window_days}d"))
            .append_pair("interval", "1d");
        Ok(url)
    }
}

/// Parse a chart response body into normalized rate points.
///
/// Each point is stamped at 00:00 UTC of the trading day, where the day is read
/// from `timestamp + meta.gmtoffset` (the exchange-local marker).
pub fn parse_chart(body: &str) -> Result<Vec<RatePoint>, FetchError> {
    let resp: ChartResponse =
        serde_json::from_str(body).map_err(|e| FetchError::Decode(e.to_string()))?;

    let result = match resp.chart.result {
        Some(result) => result,
        None => {
            return Err(match resp.chart.error {
                Some(err) => FetchError::EmptyResult(format!("{}: {}", err.code, err.description)),
                None => FetchError::EmptyResult("empty result with no error".into()),
            })
        }
    };

    let data = result
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::EmptyResult("result array is empty".into()))?;

    let timestamps = data
        .timestamp
        .ok_or_else(|| FetchError::EmptyResult("no timestamps".into()))?;

    let quote = data
        .indicators
        .quote
        .into_iter()
        .next()
        .ok_or_else(|| FetchError::EmptyResult("no quote data".into()))?;

    let gmtoffset = data.meta.and_then(|m| m.gmtoffset).unwrap_or(0);

    let mut points = Vec::with_capacity(timestamps.len());
    for (i, &ts) in timestamps.iter().enumerate() {
        let Some(close) = quote.close.get(i).copied().flatten() else {
            continue;
        };
        let marker = ts
            .checked_add(gmtoffset)
            .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
            .ok_or(FetchError::InvalidTimestamp(ts))?;
        if let Some(point) = RatePoint::new(day_start(marker), close) {
            points.push(point);
        }
    }

    let points = normalize_points(points);
    if points.is_empty() {
        return Err(FetchError::EmptyResult("no usable closing values".into()));
    }
    Ok(points)
}

impl QuoteSource for YahooChartSource {
    fn name(&self) -> &str {
        "yahoo_chart"
    }

    fn fetch(&self, symbol: &str, window_days: u32) -> Result<FetchResult, FetchError> {
        let url = self.chart_url(symbol, window_days)?;
        tracing::debug!(symbol, %url, "requesting chart");

        let mut request = self.client.get(url);
        if let Some((header, key)) = &self.api_key {
            request = request.header(header.as_str(), key.as_str());
        }

        let resp = request
            .send()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let body = resp
            .text()
            .map_err(|e| FetchError::Transport(format!("failed to read body: {e}")))?;

        let points = parse_chart(&body)?;
        Ok(FetchResult {
            symbol: symbol.to_string(),
            points,
        })
    }
}
