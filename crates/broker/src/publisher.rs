//! Publisher side of the delivery protocol
//!
//! Publishing is fire-and-forget: the sequence is assigned, the envelope is
//! appended to the durable queue of every subscription registered for the
//! channel, and a notify event is emitted. No acknowledgment is awaited;
//! queues grow unboundedly if consumers do not keep pace.

use crate::error::BrokerResult;
use crate::wire::{Envelope, SubscriptionKey};
use crate::{SEQUENCE_KEY, SUBSCRIPTION_REGISTRY};
use log::{debug, warn};
use std::sync::Arc;
use stopline_ports::QueueStore;

/// Assigns sequence numbers and fans messages out to subscriber queues
pub struct Publisher<S> {
    store: Arc<S>,
    sequence_key: String,
}

impl<S> Clone for Publisher<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            sequence_key: self.sequence_key.clone(),
        }
    }
}

impl<S: QueueStore> Publisher<S> {
    /// Create a publisher sequencing on the default counter key
    pub fn new(store: Arc<S>) -> Self {
        Self::with_sequence_key(store, SEQUENCE_KEY)
    }

    /// Create a publisher with its own logical stream counter
    pub fn with_sequence_key(store: Arc<S>, sequence_key: impl Into<String>) -> Self {
        Self {
            store,
            sequence_key: sequence_key.into(),
        }
    }

    /// Publish a payload on a channel, returning its sequence number
    ///
    /// The envelope lands in the durable queue of every subscription key
    /// currently registered for `channel` before the notify event fires, so
    /// a subscriber woken by the event always finds the entry queued.
    pub async fn publish(&self, channel: &str, payload: &str) -> BrokerResult<u64> {
        let sequence = self.store.counter_incr(&self.sequence_key).await?;
        let wire = Envelope::new(sequence, payload).encode();

        for raw in self.store.set_members(SUBSCRIPTION_REGISTRY).await? {
            let key = match SubscriptionKey::parse(&raw) {
                Ok(key) => key,
                Err(err) => {
                    warn!("ignoring malformed registry entry {raw:?}: {err}");
                    continue;
                }
            };
            if key.channel == channel {
                self.store.push_back(&raw, &wire).await?;
                debug!("queued seq {sequence} for {raw}");
            }
        }

        self.store.notify(channel, &wire).await?;
        Ok(sequence)
    }

    /// Reset the stream's sequence counter to zero
    ///
    /// Only sensible while no subscriber holds queued messages from this
    /// stream; meant for session setup and tests.
    pub async fn reset_sequence(&self) -> BrokerResult<()> {
        self.store.counter_set(&self.sequence_key, 0).await?;
        Ok(())
    }
}
