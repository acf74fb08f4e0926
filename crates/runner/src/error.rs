use stopline_broker::BrokerError;
use thiserror::Error;

/// Failures while assembling or running a session
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("session setup failed: {0}")]
    Setup(String),

    #[error("subscription task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

pub type RunnerResult<T> = Result<T, RunnerError>;
