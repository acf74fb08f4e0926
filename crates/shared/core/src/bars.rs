//! Market bar types
//!
//! A [`Bar`] is one OHLCV sample for an instrument at a fixed period boundary.
//! Bars are produced once by the market-data adapter and immutable thereafter.
//!
//! The data adapter publishes one [`BarSet`] per period: a map of instrument
//! code to that instrument's bar. Consumers pick out the codes they care about
//! and ignore the rest. The schema is strict - a payload with missing or
//! mistyped fields is a deserialization error, never a partially-filled bar.

use crate::values::{Price, Quantity, Symbol, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One OHLCV sample at a period boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Bar {
    /// Opening price of the period
    pub open: Price,
    /// Closing price of the period
    pub close: Price,
    /// Highest traded price of the period
    pub high: Price,
    /// Lowest traded price of the period
    pub low: Price,
    /// Traded volume over the period
    pub volume: Quantity,
    /// Period boundary timestamp
    pub time: Timestamp,
}

impl Bar {
    /// Create a new bar
    pub fn new(
        time: Timestamp,
        open: Price,
        close: Price,
        high: Price,
        low: Price,
        volume: Quantity,
    ) -> Self {
        Self {
            open,
            close,
            high,
            low,
            volume,
            time,
        }
    }
}

/// One period's bars for a set of instruments, keyed by contract code
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BarSet {
    bars: BTreeMap<Symbol, Bar>,
}

impl BarSet {
    /// Create an empty bar set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the bar for an instrument, replacing any previous entry
    pub fn insert(&mut self, code: impl Into<Symbol>, bar: Bar) {
        self.bars.insert(code.into(), bar);
    }

    /// Bar for an instrument, if present in this period's set
    pub fn get(&self, code: &str) -> Option<&Bar> {
        self.bars.get(code)
    }

    /// Whether the set carries a bar for this instrument
    pub fn contains(&self, code: &str) -> bool {
        self.bars.contains_key(code)
    }

    /// Number of instruments in the set
    pub fn len(&self) -> usize {
        self.bars.len()
    }

    /// Whether the set is empty
    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    /// Iterate over (code, bar) pairs in code order
    pub fn iter(&self) -> impl Iterator<Item = (&Symbol, &Bar)> {
        self.bars.iter()
    }
}

impl FromIterator<(Symbol, Bar)> for BarSet {
    fn from_iter<I: IntoIterator<Item = (Symbol, Bar)>>(iter: I) -> Self {
        Self {
            bars: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn sample_bar() -> Bar {
        Bar::new(
            Utc.with_ymd_and_hms(2022, 5, 18, 16, 27, 0).unwrap(),
            dec!(10),
            dec!(11),
            dec!(12),
            dec!(9),
            dec!(1500),
        )
    }

    #[test]
    fn test_bar_set_lookup() {
        let mut set = BarSet::new();
        set.insert("A2201.XDCE", sample_bar());

        assert!(set.contains("A2201.XDCE"));
        assert!(!set.contains("IH2206.CCFX"));
        assert_eq!(set.get("A2201.XDCE").unwrap().close, dec!(11));
    }

    #[test]
    fn test_bar_round_trips_exactly() {
        let bar = sample_bar();
        let json = serde_json::to_string(&bar).unwrap();
        let back: Bar = serde_json::from_str(&json).unwrap();

        // Exact equality matters: the indicator tie-breaks on it
        assert_eq!(bar, back);
    }

    #[test]
    fn test_bar_rejects_missing_fields() {
        let json = r#"{"open":"10","close":"11","high":"12","low":"9"}"#;
        assert!(serde_json::from_str::<Bar>(json).is_err());
    }

    #[test]
    fn test_bar_set_serializes_as_plain_map() {
        let mut set = BarSet::new();
        set.insert("A2201.XDCE", sample_bar());

        let json = serde_json::to_string(&set).unwrap();
        assert!(json.starts_with(r#"{"A2201.XDCE""#));
    }
}
