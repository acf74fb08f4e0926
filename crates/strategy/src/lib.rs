//! Trailing stop-loss computation
//!
//! The [`StopLossEngine`] consumes one OHLC bar at a time and maintains a
//! trailing stop-loss line over the whole series seen so far. Each update
//! appends exactly one value; already-emitted values are never revised.

pub mod trailing_stop;

pub use trailing_stop::{StopLossConfig, StopLossEngine};
