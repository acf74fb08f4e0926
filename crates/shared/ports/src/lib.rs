//! Stopline Ports
//!
//! Port definitions (traits) for the Stopline trading system.
//! These define the boundaries between domain logic and infrastructure:
//! the durable queue/notify store behind the broker, and the order
//! gateway behind the signal dispatcher.

mod error;
mod gateway;
mod store;

pub use error::{GatewayError, GatewayResult, StoreError, StoreResult};
pub use gateway::OrderGateway;
pub use store::{NotifyListener, QueueStore};
