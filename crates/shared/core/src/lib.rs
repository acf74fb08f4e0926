//! Stopline Core Domain
//!
//! Pure domain types for the Stopline trading system.
//! This crate contains no async, no I/O, and is 100% unit testable.

pub mod bars;
pub mod orders;
pub mod values;

// Re-export commonly used types at crate root
pub use bars::{Bar, BarSet};
pub use orders::{OrderIntent, OrderSide};
pub use values::{Price, Quantity, Symbol, Timestamp};
