//! Broker errors

use stopline_ports::StoreError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BrokerError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Handler failure: {0}")]
    Handler(String),
}

impl BrokerError {
    /// Wrap a handler-side failure. The failed entry stays at the queue
    /// head, so the subscription stops rather than skipping a message.
    pub fn handler(reason: impl Into<String>) -> Self {
        Self::Handler(reason.into())
    }
}

pub type BrokerResult<T> = std::result::Result<T, BrokerError>;
