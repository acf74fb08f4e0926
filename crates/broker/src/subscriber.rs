//! Subscriber side of the delivery protocol
//!
//! A subscription is one task running [`Subscriber::subscribe`]: it registers
//! the `(subscriberId, channel)` key (idempotently), replays any backlog that
//! accumulated while it was offline, then blocks on the channel's notify
//! events and drains the durable queue on each wake-up. The queue is the only
//! source of truth - handler invocations follow queue order exactly, no gaps,
//! no duplicates, regardless of how notify events coalesce or drop.
//!
//! Entries are popped only after the handler returns, and a handler error
//! leaves the entry at the head: a skipped message would corrupt every
//! downstream consumer of the ordered stream.

use crate::SUBSCRIPTION_REGISTRY;
use crate::error::BrokerResult;
use crate::wire::{Envelope, SubscriptionKey};
use async_trait::async_trait;
use log::{info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use stopline_ports::QueueStore;

/// Payload passed to close-wakes on the notify channel. Deliberately not a
/// valid envelope: listeners treat it as a bare wake-up and re-check their
/// active flag.
const CLOSE_WAKE: &str = "closed";

/// Callback invoked once per delivered message, in sequence order
#[async_trait]
pub trait MessageHandler: Send {
    /// Handle one payload from `channel`. Returning an error stops the
    /// subscription with the entry still queued.
    async fn on_message(&mut self, channel: &str, payload: &str) -> BrokerResult<()>;
}

enum Drain {
    /// Queue exhausted (or drained up to the notify bound)
    Empty,
    /// A termination token was processed or the subscription was closed
    Stopped,
}

/// Consumer of one subscriber's durable queues
///
/// One instance may serve several channels; each `subscribe` call is its own
/// task. All subscriptions of the instance share the active flag, so
/// [`Subscriber::close`] (or a [`SubscriptionHandle`]) stops them together,
/// each within one notify cycle.
pub struct Subscriber<S> {
    store: Arc<S>,
    subscriber_id: String,
    active: Arc<AtomicBool>,
}

impl<S: QueueStore> Subscriber<S> {
    pub fn new(store: Arc<S>, subscriber_id: impl Into<String>) -> Self {
        Self {
            store,
            subscriber_id: subscriber_id.into(),
            active: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn subscriber_id(&self) -> &str {
        &self.subscriber_id
    }

    /// Whether the live loop is (still) running
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Handle for closing this subscription from another task
    pub fn handle(&self, channel: &str) -> SubscriptionHandle<S> {
        SubscriptionHandle {
            store: Arc::clone(&self.store),
            key: SubscriptionKey::new(&self.subscriber_id, channel),
            active: Arc::clone(&self.active),
        }
    }

    /// Register, replay the backlog, then process live until terminated
    ///
    /// Returns when a termination token is drained, `close` is called from
    /// another task, or the store's notify channel shuts down. Handler and
    /// store errors propagate.
    pub async fn subscribe<H: MessageHandler>(
        &self,
        channel: &str,
        handler: &mut H,
    ) -> BrokerResult<()> {
        let key = SubscriptionKey::new(&self.subscriber_id, channel).encode();

        // Listen before registering: a publish that lands between backlog
        // drain and the live loop must still produce a buffered wake-up.
        let mut listener = self.store.listen(channel).await?;

        if !self
            .store
            .set_contains(SUBSCRIPTION_REGISTRY, &key)
            .await?
        {
            self.store.set_add(SUBSCRIPTION_REGISTRY, &key).await?;
        }
        self.active.store(true, Ordering::SeqCst);
        info!("subscriber {key} registered");

        // Backlog accumulated while offline, replayed in order
        if let Drain::Stopped = self.drain(channel, None, handler).await? {
            info!("subscriber {key} stopped during backlog replay");
            return Ok(());
        }

        // Live phase: each notify event is a wake-up hint. One carrying
        // sequence N bounds the drain at N; one that does not parse is a
        // bare wake (e.g. from close) and drains whatever is queued.
        while self.active.load(Ordering::SeqCst) {
            let Some(event) = listener.recv().await else {
                warn!("notify channel for {key} shut down");
                break;
            };
            let bound = Envelope::parse(&event).ok().map(|env| env.sequence);
            if let Drain::Stopped = self.drain(channel, bound, handler).await? {
                break;
            }
        }

        info!("subscriber {key} stopped");
        Ok(())
    }

    /// Drain the queue head-first, at most up to sequence `bound`
    async fn drain<H: MessageHandler>(
        &self,
        channel: &str,
        bound: Option<u64>,
        handler: &mut H,
    ) -> BrokerResult<Drain> {
        let queue = SubscriptionKey::new(&self.subscriber_id, channel).encode();

        loop {
            // Closure from another task is observed here, before the next
            // handler invocation; in-flight calls are never interrupted.
            if !self.active.load(Ordering::SeqCst) {
                return Ok(Drain::Stopped);
            }

            let Some(head) = self.store.peek_front(&queue).await? else {
                return Ok(Drain::Empty);
            };

            let envelope = match Envelope::parse(&head) {
                Ok(envelope) => envelope,
                Err(err) => {
                    // Transport fault: discard so it never blocks the queue
                    warn!("discarding malformed entry on {queue}: {err} ({head:?})");
                    self.store.pop_front(&queue).await?;
                    continue;
                }
            };

            if let Some(bound) = bound
                && envelope.sequence > bound
            {
                // Beyond the wake-up hint; a later notify covers the rest
                return Ok(Drain::Empty);
            }

            if envelope.is_termination() {
                info!("subscriber {queue} received termination token");
                self.close(channel).await?;
                return Ok(Drain::Stopped);
            }

            handler.on_message(channel, &envelope.payload).await?;
            self.store.pop_front(&queue).await?;
        }
    }

    /// Unsubscribe: deregister, delete the durable queue, stop the loop
    pub async fn close(&self, channel: &str) -> BrokerResult<()> {
        self.handle(channel).close().await
    }
}

/// Cross-task closer for one subscription
///
/// `close` is linearizable with the live loop's active-flag check: the loop
/// observes closure at the next drain iteration, at latest on the wake this
/// emits.
pub struct SubscriptionHandle<S> {
    store: Arc<S>,
    key: SubscriptionKey,
    active: Arc<AtomicBool>,
}

impl<S: QueueStore> SubscriptionHandle<S> {
    /// Remove the registry entry, delete the queue, and stop the live loop
    pub async fn close(&self) -> BrokerResult<()> {
        let key = self.key.encode();
        self.store.set_remove(SUBSCRIPTION_REGISTRY, &key).await?;
        self.store.delete(&key).await?;
        self.active.store(false, Ordering::SeqCst);
        // Nudge a live loop blocked on the notify stream
        self.store.notify(&self.key.channel, CLOSE_WAKE).await?;
        info!("subscription {key} closed");
        Ok(())
    }
}

/// Adapter turning a closure into a [`MessageHandler`], so test recorders
/// and small glue handlers stay lightweight
pub struct FnHandler<F>(pub F);

#[async_trait]
impl<F> MessageHandler for FnHandler<F>
where
    F: FnMut(&str, &str) -> BrokerResult<()> + Send,
{
    async fn on_message(&mut self, channel: &str, payload: &str) -> BrokerResult<()> {
        (self.0)(channel, payload)
    }
}
