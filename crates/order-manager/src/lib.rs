//! Signal dispatch
//!
//! The [`SignalDispatcher`] holds the position state for one instrument and
//! turns each (bar, stop-loss) pair into at most one order through an
//! [`OrderGateway`](stopline_ports::OrderGateway). Orders are submitted
//! at-most-once: the position flips when the submission is issued, never
//! retroactively, so a gateway failure can lose an order but never duplicate
//! one.

pub mod dispatch;
pub mod error;
pub mod gateway;

pub use dispatch::{DispatchConfig, PositionState, SignalDispatcher};
pub use error::{DispatchError, DispatchResult};
pub use gateway::{LogOnlyGateway, RecordingGateway};
