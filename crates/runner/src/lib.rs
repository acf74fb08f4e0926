//! Stopline Runner - session orchestration
//!
//! Wires the pieces into one running session:
//!
//! - **Bar Feed**: caches each period's bars in the store and publishes them
//!   on the channel
//! - **Stop-Loss Agent**: message handler that feeds bars through the
//!   indicator and the signal dispatcher
//! - **Session**: subscribes the agent on its own task and manages shutdown
//!
//! ## Architecture
//!
//! ```text
//!   ┌──────────────┐   BarSet JSON    ┌──────────────────────────┐
//!   │   Bar Feed   ├─────────────────▶│     Delivery Broker      │
//!   └──────────────┘  publish("1m")   │ (durable queues + notify)│
//!                                     └────────────┬─────────────┘
//!                                                  │ in order, exactly once
//!                                                  ▼
//!                                     ┌──────────────────────────┐
//!                                     │     Stop-Loss Agent      │
//!                                     │  engine.update(bar)      │
//!                                     │  dispatcher.on_bar(...)  │
//!                                     └────────────┬─────────────┘
//!                                                  │ orders
//!                                                  ▼
//!                                     ┌──────────────────────────┐
//!                                     │      Order Gateway       │
//!                                     └──────────────────────────┘
//! ```

pub mod agent;
pub mod bootstrap;
pub mod error;
pub mod feed;

pub use agent::StopLossAgent;
pub use bootstrap::{Session, SessionConfig};
pub use error::{RunnerError, RunnerResult};
pub use feed::BarFeed;
