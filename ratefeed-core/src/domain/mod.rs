//! Domain types: pair codes, the pair table, rate points and series.

pub mod pair;
pub mod series;

pub use pair::{PairCode, PairEntry, PairTable, PairTableError};
pub use series::{day_start, invert, normalize_points, RatePoint, RateSeries};
