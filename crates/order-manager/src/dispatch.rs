//! Entry / exit rules over the stop-loss line
//!
//! Long-only, one position at a time:
//! - enter when flat and the line sits strictly above the close (the close
//!   has fallen through support, the reversal setup this strategy trades);
//! - exit when holding, the close is below the entry price, and the minimum
//!   holding time has elapsed.
//!
//! Both legs trade at the bar's close price with the configured lot size.

use crate::error::DispatchResult;
use crate::gateway::describe;
use chrono::Duration;
use log::info;
use stopline_core::{Bar, OrderIntent, OrderSide, Price, Quantity, Symbol, Timestamp};
use stopline_ports::OrderGateway;

/// Static parameters of one dispatcher
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    /// Instrument the orders are for
    pub instrument_id: Symbol,
    /// Lot size of every order, both legs
    pub quantity: Quantity,
    /// Minimum time between entry and exit. Zero disables the hold.
    pub min_holding: Duration,
}

impl DispatchConfig {
    pub fn new(instrument_id: impl Into<Symbol>, quantity: Quantity) -> Self {
        Self {
            instrument_id: instrument_id.into(),
            quantity,
            min_holding: Duration::zero(),
        }
    }

    pub fn with_min_holding(mut self, min_holding: Duration) -> Self {
        self.min_holding = min_holding;
        self
    }
}

/// Whether the dispatcher currently holds the instrument
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionState {
    Flat,
    Holding {
        entry_price: Price,
        entry_time: Timestamp,
    },
}

impl PositionState {
    pub fn is_holding(&self) -> bool {
        matches!(self, Self::Holding { .. })
    }
}

/// Per-instrument signal-to-order state machine
pub struct SignalDispatcher<G> {
    config: DispatchConfig,
    gateway: G,
    position: PositionState,
    order_seq: u64,
}

impl<G: OrderGateway> SignalDispatcher<G> {
    pub fn new(config: DispatchConfig, gateway: G) -> Self {
        Self {
            config,
            gateway,
            position: PositionState::Flat,
            order_seq: 0,
        }
    }

    pub fn position(&self) -> PositionState {
        self.position
    }

    /// Evaluate one bar against the current stop-loss line
    ///
    /// Returns the intent that was submitted, if any. The position state is
    /// updated as soon as the submission is issued and is not rolled back on
    /// a gateway error: the order may have reached the venue, and a repeat
    /// would risk doubling it.
    pub async fn on_bar(
        &mut self,
        bar: &Bar,
        stop_loss: Option<Price>,
    ) -> DispatchResult<Option<OrderIntent>> {
        match self.position {
            PositionState::Flat => {
                let Some(line) = stop_loss else {
                    return Ok(None);
                };
                if line <= bar.close {
                    return Ok(None);
                }
                let intent = self.intent(OrderSide::Buy, bar);
                info!("entry signal: {}", describe(&intent));

                let submitted = self.gateway.submit_order(&intent).await;
                self.position = PositionState::Holding {
                    entry_price: bar.close,
                    entry_time: bar.time,
                };
                submitted?;
                Ok(Some(intent))
            }
            PositionState::Holding {
                entry_price,
                entry_time,
            } => {
                if bar.close >= entry_price {
                    return Ok(None);
                }
                if bar.time - entry_time < self.config.min_holding {
                    return Ok(None);
                }
                let intent = self.intent(OrderSide::Sell, bar);
                info!("exit signal: {}", describe(&intent));

                let submitted = self.gateway.submit_order(&intent).await;
                self.position = PositionState::Flat;
                submitted?;
                Ok(Some(intent))
            }
        }
    }

    fn intent(&mut self, side: OrderSide, bar: &Bar) -> OrderIntent {
        self.order_seq += 1;
        OrderIntent::new(
            format!("sl-{}", self.order_seq),
            self.config.instrument_id.clone(),
            side,
            self.config.quantity,
            bar.close,
            bar.time,
        )
    }
}
