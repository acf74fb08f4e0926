//! Stop-loss agent - the consumer end of a session
//!
//! Implements the broker's [`MessageHandler`]: each delivered payload is one
//! period's [`BarSet`], the agent picks out its instrument's bar, advances
//! the indicator, and lets the dispatcher decide whether to trade.
//!
//! A payload that does not deserialize is a handler error; the broker leaves
//! it queued and stops the subscription rather than silently skipping a
//! period, which would corrupt the indicator state.

use async_trait::async_trait;
use log::{debug, warn};
use stopline_broker::{BrokerError, BrokerResult, MessageHandler};
use stopline_core::{BarSet, Symbol};
use stopline_order_manager::SignalDispatcher;
use stopline_ports::OrderGateway;
use stopline_strategy::StopLossEngine;

/// Feeds delivered bars through the indicator and dispatcher
pub struct StopLossAgent<G> {
    code: Symbol,
    engine: StopLossEngine,
    dispatcher: SignalDispatcher<G>,
}

impl<G: OrderGateway> StopLossAgent<G> {
    pub fn new(code: impl Into<Symbol>, engine: StopLossEngine, dispatcher: SignalDispatcher<G>) -> Self {
        Self {
            code: code.into(),
            engine,
            dispatcher,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    /// The indicator, for inspection after a run
    pub fn engine(&self) -> &StopLossEngine {
        &self.engine
    }
}

#[async_trait]
impl<G: OrderGateway> MessageHandler for StopLossAgent<G> {
    async fn on_message(&mut self, channel: &str, payload: &str) -> BrokerResult<()> {
        let bars: BarSet = serde_json::from_str(payload)
            .map_err(|err| BrokerError::handler(format!("bad bar payload: {err}")))?;

        let Some(bar) = bars.get(&self.code) else {
            // The feed covers many instruments; sets without ours are noise
            warn!("bar set on {channel} has no entry for {}", self.code);
            return Ok(());
        };

        let stop_loss = self.engine.update(bar);
        debug!("{} close {} stop {stop_loss:?}", self.code, bar.close);

        self.dispatcher
            .on_bar(bar, stop_loss)
            .await
            .map_err(|err| BrokerError::handler(err.to_string()))?;
        Ok(())
    }
}
