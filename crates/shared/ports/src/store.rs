use crate::error::StoreResult;
use async_trait::async_trait;
use std::time::Duration;

/// Port for the durable queue store behind the broker
///
/// The store provides the primitives the delivery protocol is built from:
/// named FIFO lists (per-subscriber durable queues), named sets (the
/// subscription registry), atomic counters (message sequencing), values with
/// expiry, and an advisory notify channel. A Redis-backed implementation maps
/// these onto RPUSH/LINDEX/LPOP, SADD/SREM/SISMEMBER, INCR, SETEX and pub/sub;
/// the in-process implementation lives in the broker crate.
///
/// Ordering and no-loss guarantees come from the lists alone. The notify
/// channel only has to deliver at least one wake-up per publish and may drop
/// or coalesce beyond that.
#[async_trait]
pub trait QueueStore: Send + Sync {
    // -- named FIFO lists ---------------------------------------------------

    /// Append an entry at the tail of a named list
    async fn push_back(&self, queue: &str, entry: &str) -> StoreResult<()>;

    /// Read the head entry of a named list without removing it
    async fn peek_front(&self, queue: &str) -> StoreResult<Option<String>>;

    /// Remove and return the head entry of a named list
    async fn pop_front(&self, queue: &str) -> StoreResult<Option<String>>;

    /// Delete a key outright (list, value, or set)
    async fn delete(&self, key: &str) -> StoreResult<()>;

    // -- named sets ---------------------------------------------------------

    /// Add a member to a named set; returns true if it was newly added
    async fn set_add(&self, set: &str, member: &str) -> StoreResult<bool>;

    /// Remove a member from a named set; returns true if it was present
    async fn set_remove(&self, set: &str, member: &str) -> StoreResult<bool>;

    /// Whether a member is in a named set
    async fn set_contains(&self, set: &str, member: &str) -> StoreResult<bool>;

    /// All members of a named set
    async fn set_members(&self, set: &str) -> StoreResult<Vec<String>>;

    // -- counters -----------------------------------------------------------

    /// Atomically increment a counter and return the new value.
    /// A missing counter starts at zero, so the first call returns 1.
    async fn counter_incr(&self, key: &str) -> StoreResult<u64>;

    /// Set a counter to an absolute value
    async fn counter_set(&self, key: &str, value: u64) -> StoreResult<()>;

    // -- values with expiry -------------------------------------------------

    /// Store a value under a key, expiring after `ttl`
    async fn put_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()>;

    /// Read a value, if present and not expired
    async fn get(&self, key: &str) -> StoreResult<Option<String>>;

    // -- notify channel -----------------------------------------------------

    /// Emit a wake-up event on a channel. Fire-and-forget: succeeds even
    /// with no listeners.
    async fn notify(&self, channel: &str, payload: &str) -> StoreResult<()>;

    /// Open a listener on a channel's notify events
    async fn listen(&self, channel: &str) -> StoreResult<Box<dyn NotifyListener>>;
}

/// Receiving side of the store's notify channel
///
/// Lossy by design: a listener that falls behind may miss events, which is
/// harmless because the durable queues are the only source of truth.
#[async_trait]
pub trait NotifyListener: Send {
    /// Next wake-up event; `None` when the store shuts down
    async fn recv(&mut self) -> Option<String>;
}
