use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Price value - uses Decimal for precision
///
/// The stop-loss cascade tie-breaks on exact price equality, so prices must
/// compare exactly after a serde round trip.
pub type Price = Decimal;

/// Quantity value - uses Decimal for precision
pub type Quantity = Decimal;

/// Timestamp in UTC
pub type Timestamp = DateTime<Utc>;

/// Symbol identifier for a tradeable instrument (contract code)
pub type Symbol = String;
