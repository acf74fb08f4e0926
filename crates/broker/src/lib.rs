//! Stopline Broker
//!
//! Reliable, replay-safe publish/subscribe delivery over a primitive
//! durable queue/notify store. Every subscriber sees every message exactly
//! once and in order, even if it was offline when the message was published.
//!
//! ## Architecture
//!
//! ```text
//! Producer task ──► Publisher.publish(channel, payload)
//!                        │ 1. counter_incr("MESSAGE_SEQ")    -> sequence
//!                        │ 2. append "<seq>/<payload>" to the durable
//!                        │    queue of every key registered for channel
//!                        │ 3. notify(channel, envelope)       (advisory)
//!                        ▼
//!                  QueueStore (durable lists + registry set + notify)
//!                        │
//!                        │ backlog drain, then notify-driven drain
//!                        ▼
//! Subscriber task ──► handler(channel, payload) per entry, in order
//! ```
//!
//! The durable queues are the only source of truth for ordering and
//! completeness. Notify events are wake-up hints: they may be dropped or
//! coalesced, and one event may cause several queued entries to drain.
//!
//! Termination is in-band: a published payload of `EXIT` or `QUIT`
//! (case-insensitive) closes the subscription that drains it - the registry
//! entry is removed and the durable queue deleted.

pub mod error;
pub mod memory;
pub mod publisher;
pub mod subscriber;
pub mod wire;

// Re-export main types
pub use error::{BrokerError, BrokerResult};
pub use memory::MemoryQueueStore;
pub use publisher::Publisher;
pub use subscriber::{FnHandler, MessageHandler, Subscriber, SubscriptionHandle};
pub use wire::{Envelope, SubscriptionKey, WireError};

/// Registry set holding one `"<subscriberId>/<channel>"` key per active
/// subscription
pub const SUBSCRIPTION_REGISTRY: &str = "SUBSCRIPTIONS";

/// Default sequence counter key for the message stream
pub const SEQUENCE_KEY: &str = "MESSAGE_SEQ";
