//! Rate points, rate series, and inverse derivation.

use super::pair::PairCode;
use chrono::{DateTime, NaiveTime, Utc};
use serde::Serialize;

/// A single daily rate. The value is finite and strictly positive, and so is
/// its reciprocal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RatePoint {
    timestamp: DateTime<Utc>,
    value: f64,
}

impl RatePoint {
    /// Returns `None` for non-finite, zero or negative values, and for values
    /// so small (subnormal) that `1 / value` overflows.
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Option<Self> {
        let usable = value.is_finite() && value > 0.0 && (1.0 / value).is_finite();
        usable.then_some(Self { timestamp, value })
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn value(&self) -> f64 {
        self.value
    }
}

/// Canonical instant for a calendar day: 00:00:00 UTC on the marker's UTC date.
pub fn day_start(marker: DateTime<Utc>) -> DateTime<Utc> {
    marker.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Sort ascending by timestamp and collapse equal timestamps, keeping the
/// point that appeared last in the input.
pub fn normalize_points(mut points: Vec<RatePoint>) -> Vec<RatePoint> {
    // Stable sort: among equal timestamps, input order is preserved.
    points.sort_by_key(|p| p.timestamp);

    let mut out: Vec<RatePoint> = Vec::with_capacity(points.len());
    for point in points {
        match out.last_mut() {
            Some(last) if last.timestamp == point.timestamp => *last = point,
            _ => out.push(point),
        }
    }
    out
}

/// Ordered daily rates for exactly one pair code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateSeries {
    pair: PairCode,
    points: Vec<RatePoint>,
    /// Set when this series was derived from another pair rather than fetched.
    derived_from: Option<PairCode>,
}

impl RateSeries {
    /// Build a fetched series; points are normalized (ascending, no duplicate days).
    pub fn from_points(pair: PairCode, points: Vec<RatePoint>) -> Self {
        Self {
            pair,
            points: normalize_points(points),
            derived_from: None,
        }
    }

    pub fn pair(&self) -> &PairCode {
        &self.pair
    }

    pub fn points(&self) -> &[RatePoint] {
        &self.points
    }

    pub fn derived_from(&self) -> Option<&PairCode> {
        self.derived_from.as_ref()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Reciprocal series: same timestamps, same order, `1 / value` per point,
/// tagged with `target` and traced back to the source pair.
pub fn invert(series: &RateSeries, target: &PairCode) -> RateSeries {
    let points = series
        .points
        .iter()
        .map(|p| {
            let value = 1.0 / p.value;
            debug_assert!(
                value.is_finite() && value > 0.0,
                "reciprocal of {} is not a positive rate",
                p.value
            );
            RatePoint {
                timestamp: p.timestamp,
                value,
            }
        })
        .collect();

    RateSeries {
        pair: target.clone(),
        points,
        derived_from: Some(series.pair.clone()),
    }
}
