//! In-process durable queue store
//!
//! Implements the [`QueueStore`] port with DashMap-backed lists, sets and
//! counters plus a tokio broadcast channel per notify stream. This is the
//! single-process stand-in for the external store (Redis in a deployed
//! system) used by the runner and the test suites.
//!
//! "Durable" here means durable across subscriber tasks, not across process
//! restarts: queues survive their consumer going away and coming back.

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::{BTreeSet, VecDeque};
use std::time::{Duration, Instant};
use stopline_ports::{NotifyListener, QueueStore, StoreResult};
use tokio::sync::broadcast;

/// Buffered wake-ups per notify channel before a slow listener lags.
/// Lagging is harmless: the durable queues carry the actual messages.
const NOTIFY_CAPACITY: usize = 1024;

struct ExpiringValue {
    value: String,
    expires_at: Instant,
}

/// DashMap-backed [`QueueStore`] for single-process operation
#[derive(Default)]
pub struct MemoryQueueStore {
    lists: DashMap<String, VecDeque<String>>,
    sets: DashMap<String, BTreeSet<String>>,
    counters: DashMap<String, u64>,
    values: DashMap<String, ExpiringValue>,
    channels: DashMap<String, broadcast::Sender<String>>,
}

impl MemoryQueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn sender(&self, channel: &str) -> broadcast::Sender<String> {
        self.channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(NOTIFY_CAPACITY).0)
            .clone()
    }
}

#[async_trait]
impl QueueStore for MemoryQueueStore {
    async fn push_back(&self, queue: &str, entry: &str) -> StoreResult<()> {
        self.lists
            .entry(queue.to_string())
            .or_default()
            .push_back(entry.to_string());
        Ok(())
    }

    async fn peek_front(&self, queue: &str) -> StoreResult<Option<String>> {
        Ok(self
            .lists
            .get(queue)
            .and_then(|list| list.front().cloned()))
    }

    async fn pop_front(&self, queue: &str) -> StoreResult<Option<String>> {
        Ok(self
            .lists
            .get_mut(queue)
            .and_then(|mut list| list.pop_front()))
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        self.lists.remove(key);
        self.sets.remove(key);
        self.values.remove(key);
        Ok(())
    }

    async fn set_add(&self, set: &str, member: &str) -> StoreResult<bool> {
        Ok(self
            .sets
            .entry(set.to_string())
            .or_default()
            .insert(member.to_string()))
    }

    async fn set_remove(&self, set: &str, member: &str) -> StoreResult<bool> {
        Ok(self
            .sets
            .get_mut(set)
            .map(|mut members| members.remove(member))
            .unwrap_or(false))
    }

    async fn set_contains(&self, set: &str, member: &str) -> StoreResult<bool> {
        Ok(self
            .sets
            .get(set)
            .map(|members| members.contains(member))
            .unwrap_or(false))
    }

    async fn set_members(&self, set: &str) -> StoreResult<Vec<String>> {
        Ok(self
            .sets
            .get(set)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn counter_incr(&self, key: &str) -> StoreResult<u64> {
        // The entry guard serializes concurrent increments on the same key
        let mut counter = self.counters.entry(key.to_string()).or_insert(0);
        *counter += 1;
        Ok(*counter)
    }

    async fn counter_set(&self, key: &str, value: u64) -> StoreResult<()> {
        self.counters.insert(key.to_string(), value);
        Ok(())
    }

    async fn put_with_expiry(&self, key: &str, value: &str, ttl: Duration) -> StoreResult<()> {
        self.values.insert(
            key.to_string(),
            ExpiringValue {
                value: value.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let expired = match self.values.get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                return Ok(Some(entry.value.clone()));
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            // Lazy purge; the guard from the match is already dropped
            self.values.remove(key);
        }
        Ok(None)
    }

    async fn notify(&self, channel: &str, payload: &str) -> StoreResult<()> {
        // A send error just means nobody is listening right now
        let _ = self.sender(channel).send(payload.to_string());
        Ok(())
    }

    async fn listen(&self, channel: &str) -> StoreResult<Box<dyn NotifyListener>> {
        let tx = self.sender(channel);
        Ok(Box::new(BroadcastListener {
            rx: tx.subscribe(),
            _tx: tx,
        }))
    }
}

/// Broadcast-backed notify listener
struct BroadcastListener {
    rx: broadcast::Receiver<String>,
    // Keep the sender alive so the channel survives idle periods
    _tx: broadcast::Sender<String>,
}

#[async_trait]
impl NotifyListener for BroadcastListener {
    async fn recv(&mut self) -> Option<String> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    // Dropped wake-ups are allowed; the queue has the data
                    log::debug!("notify listener lagged, {skipped} wakes coalesced");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
