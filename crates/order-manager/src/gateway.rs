//! Gateway implementations for local runs and tests

use async_trait::async_trait;
use log::info;
use std::sync::Mutex;
use stopline_core::OrderIntent;
use stopline_ports::{GatewayResult, OrderGateway};

/// One-line human form of an intent, for logs
pub(crate) fn describe(intent: &OrderIntent) -> String {
    format!(
        "{} {} {} x {} @ {}",
        intent.client_order_id,
        intent.side.as_str(),
        intent.instrument_id,
        intent.quantity,
        intent.price,
    )
}

/// Gateway that only logs submissions. The default for paper runs where no
/// execution venue is wired up.
#[derive(Debug, Default)]
pub struct LogOnlyGateway;

impl LogOnlyGateway {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl OrderGateway for LogOnlyGateway {
    async fn submit_order(&self, intent: &OrderIntent) -> GatewayResult<()> {
        info!("order (log only): {}", describe(intent));
        Ok(())
    }
}

/// Gateway that records every submission, for assertions in tests
#[derive(Debug, Default)]
pub struct RecordingGateway {
    orders: Mutex<Vec<OrderIntent>>,
}

impl RecordingGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything submitted so far, in order
    pub fn orders(&self) -> Vec<OrderIntent> {
        match self.orders.lock() {
            Ok(orders) => orders.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

#[async_trait]
impl OrderGateway for RecordingGateway {
    async fn submit_order(&self, intent: &OrderIntent) -> GatewayResult<()> {
        match self.orders.lock() {
            Ok(mut orders) => orders.push(intent.clone()),
            Err(poisoned) => poisoned.into_inner().push(intent.clone()),
        }
        Ok(())
    }
}
