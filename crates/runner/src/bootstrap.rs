//! Session assembly
//!
//! A [`Session`] is one subscriber running one [`StopLossAgent`] against one
//! channel: `start` spawns the subscription task, waits until it is
//! registered (so bars published immediately afterwards are not missed), and
//! hands back the [`BarFeed`] plus shutdown handles.

use crate::agent::StopLossAgent;
use crate::error::{RunnerError, RunnerResult};
use crate::feed::BarFeed;
use chrono::Duration as HoldingDuration;
use log::info;
use std::sync::Arc;
use std::time::Duration;
use stopline_broker::{
    BrokerError, BrokerResult, Publisher, SUBSCRIPTION_REGISTRY, Subscriber, SubscriptionHandle,
    SubscriptionKey,
};
use stopline_core::{Quantity, Symbol};
use stopline_order_manager::{DispatchConfig, SignalDispatcher};
use stopline_ports::{OrderGateway, QueueStore};
use stopline_strategy::{StopLossConfig, StopLossEngine};
use tokio::task::JoinHandle;

/// How long `start` waits for the subscription task to register
const REGISTRATION_TIMEOUT: Duration = Duration::from_secs(2);

/// Everything needed to assemble one session
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Registry identity of the subscription
    pub subscriber_id: String,
    /// Channel carrying the bar sets, e.g. `"1m"`
    pub channel: String,
    /// Instrument the agent trades
    pub instrument_id: Symbol,
    /// Lot size per order
    pub quantity: Quantity,
    /// Minimum time between entry and exit
    pub min_holding: HoldingDuration,
    /// Indicator tuning
    pub stop_loss: StopLossConfig,
}

impl SessionConfig {
    pub fn new(
        subscriber_id: impl Into<String>,
        channel: impl Into<String>,
        instrument_id: impl Into<Symbol>,
        quantity: Quantity,
    ) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            channel: channel.into(),
            instrument_id: instrument_id.into(),
            quantity,
            min_holding: HoldingDuration::zero(),
            stop_loss: StopLossConfig::default(),
        }
    }

    pub fn with_min_holding(mut self, min_holding: HoldingDuration) -> Self {
        self.min_holding = min_holding;
        self
    }

    pub fn with_stop_loss(mut self, stop_loss: StopLossConfig) -> Self {
        self.stop_loss = stop_loss;
        self
    }
}

/// One running subscription plus the feed that drives it
pub struct Session<S> {
    feed: BarFeed<S>,
    handle: SubscriptionHandle<S>,
    task: JoinHandle<BrokerResult<()>>,
}

impl<S: QueueStore + 'static> Session<S> {
    /// Spawn the agent's subscription and wait until it is registered
    pub async fn start<G>(
        store: Arc<S>,
        gateway: G,
        config: SessionConfig,
    ) -> RunnerResult<Self>
    where
        G: OrderGateway + 'static,
    {
        let engine = StopLossEngine::new(config.stop_loss.clone());
        let dispatcher = SignalDispatcher::new(
            DispatchConfig::new(config.instrument_id.clone(), config.quantity)
                .with_min_holding(config.min_holding),
            gateway,
        );
        let mut agent = StopLossAgent::new(config.instrument_id.clone(), engine, dispatcher);

        let subscriber = Subscriber::new(Arc::clone(&store), config.subscriber_id.clone());
        let handle = subscriber.handle(&config.channel);

        let channel = config.channel.clone();
        let task = tokio::spawn(async move { subscriber.subscribe(&channel, &mut agent).await });

        Self::await_registration(&store, &config).await?;
        info!(
            "session up: {} on {} trading {}",
            config.subscriber_id, config.channel, config.instrument_id
        );

        let feed = BarFeed::new(
            Arc::clone(&store),
            Publisher::new(Arc::clone(&store)),
            config.channel,
        );
        Ok(Self { feed, handle, task })
    }

    async fn await_registration(store: &Arc<S>, config: &SessionConfig) -> RunnerResult<()> {
        let key = SubscriptionKey::new(&config.subscriber_id, &config.channel).encode();
        let deadline = tokio::time::Instant::now() + REGISTRATION_TIMEOUT;
        loop {
            let registered = store
                .set_contains(SUBSCRIPTION_REGISTRY, &key)
                .await
                .map_err(BrokerError::from)?;
            if registered {
                return Ok(());
            }
            if tokio::time::Instant::now() >= deadline {
                return Err(RunnerError::Setup(format!(
                    "subscription {key} did not register in time"
                )));
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    /// The feed publishing into this session's channel
    pub fn feed(&self) -> &BarFeed<S> {
        &self.feed
    }

    /// Close the subscription from outside the agent task
    pub async fn close(&self) -> RunnerResult<()> {
        self.handle.close().await?;
        Ok(())
    }

    /// Wait for the subscription task to finish
    pub async fn join(self) -> RunnerResult<()> {
        Ok(self.task.await??)
    }
}
