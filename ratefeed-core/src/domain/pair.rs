//! Pair codes and the fixed symbol → pair → reciprocal table.
//!
//! The table is configuration: it is loaded once at startup and never extended
//! at runtime. Reciprocal codes are looked up, never computed from the text of
//! the direct code.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use thiserror::Error;

/// Short lowercase mnemonic for a directional currency pair (e.g. `eurusd`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PairCode(String);

impl PairCode {
    /// Validate and wrap a pair code. Codes are non-empty ASCII lowercase alphanumerics.
    pub fn new(code: impl Into<String>) -> Result<Self, PairTableError> {
        let code = code.into();
        let valid = !code.is_empty()
            && code
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
        if valid {
            Ok(Self(code))
        } else {
            Err(PairTableError::InvalidCode(code))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PairCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PairCode {
    type Error = PairTableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<PairCode> for String {
    fn from(code: PairCode) -> Self {
        code.0
    }
}

/// One configured market symbol with its direct and reciprocal pair codes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairEntry {
    pub symbol: String,
    pub code: PairCode,
    pub reciprocal: PairCode,
}

impl PairEntry {
    pub fn new(symbol: &str, code: &str, reciprocal: &str) -> Result<Self, PairTableError> {
        Ok(Self {
            symbol: symbol.to_string(),
            code: PairCode::new(code)?,
            reciprocal: PairCode::new(reciprocal)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PairTableError {
    #[error("invalid pair code '{0}': expected lowercase ASCII letters or digits")]
    InvalidCode(String),

    #[error("symbol '{0}' appears more than once in the pair table")]
    DuplicateSymbol(String),

    #[error("pair code '{0}' is used by more than one series")]
    DuplicateCode(String),

    #[error("pair code '{0}' is listed as its own reciprocal")]
    SelfReciprocal(String),

    #[error("symbol '{0}' is not in the pair table")]
    UnknownSymbol(String),

    #[error("pair table is empty")]
    Empty,
}

/// Injective symbol → pair code table with a fixed reciprocal for every code.
#[derive(Debug, Clone)]
pub struct PairTable {
    entries: Vec<PairEntry>,
    by_symbol: BTreeMap<String, usize>,
    reciprocals: BTreeMap<PairCode, PairCode>,
}

impl PairTable {
    /// Build a table, rejecting duplicate symbols and any code reused across
    /// direct and reciprocal columns.
    pub fn new(entries: Vec<PairEntry>) -> Result<Self, PairTableError> {
        if entries.is_empty() {
            return Err(PairTableError::Empty);
        }

        let mut by_symbol = BTreeMap::new();
        let mut reciprocals = BTreeMap::new();
        let mut seen_codes = BTreeSet::new();

        for (i, entry) in entries.iter().enumerate() {
            if by_symbol.insert(entry.symbol.clone(), i).is_some() {
                return Err(PairTableError::DuplicateSymbol(entry.symbol.clone()));
            }
            if entry.code == entry.reciprocal {
                return Err(PairTableError::SelfReciprocal(entry.code.to_string()));
            }
            for code in [&entry.code, &entry.reciprocal] {
                if !seen_codes.insert(code.clone()) {
                    return Err(PairTableError::DuplicateCode(code.to_string()));
                }
            }
            reciprocals.insert(entry.code.clone(), entry.reciprocal.clone());
        }

        Ok(Self {
            entries,
            by_symbol,
            reciprocals,
        })
    }

    /// Built-in majors, quoted the way the market-data source names them.
    pub fn default_fx() -> Self {
        let entries = default_fx_entries();
        Self::new(entries).unwrap_or_else(|e| unreachable!("built-in pair table is valid: {e}"))
    }

    pub fn entries(&self) -> &[PairEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn symbols(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.symbol.as_str()).collect()
    }

    pub fn entry(&self, symbol: &str) -> Option<&PairEntry> {
        self.by_symbol.get(symbol).map(|&i| &self.entries[i])
    }

    pub fn code_for(&self, symbol: &str) -> Option<&PairCode> {
        self.entry(symbol).map(|e| &e.code)
    }

    /// Reciprocal code for a direct code.
    pub fn reciprocal_of(&self, code: &PairCode) -> Option<&PairCode> {
        self.reciprocals.get(code)
    }

    /// Sub-table holding only `symbols`, in the order given.
    pub fn restrict(&self, symbols: &[&str]) -> Result<Self, PairTableError> {
        let entries = symbols
            .iter()
            .map(|s| {
                self.entry(s)
                    .cloned()
                    .ok_or_else(|| PairTableError::UnknownSymbol(s.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::new(entries)
    }
}

/// Entries of [`PairTable::default_fx`].
pub fn default_fx_entries() -> Vec<PairEntry> {
    [
        ("EURUSD=X", "eurusd", "usdeur"),
        ("GBPUSD=X", "gbpusd", "usdgbp"),
        ("USDJPY=X", "usdjpy", "jpyusd"),
        ("USDCHF=X", "usdchf", "chfusd"),
        ("USDCAD=X", "usdcad", "cadusd"),
        ("AUDUSD=X", "audusd", "usdaud"),
    ]
    .into_iter()
    .map(|(symbol, code, reciprocal)| PairEntry {
        symbol: symbol.to_string(),
        code: PairCode(code.to_string()),
        reciprocal: PairCode(reciprocal.to_string()),
    })
    .collect()
}
