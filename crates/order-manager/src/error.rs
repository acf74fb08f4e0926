use stopline_ports::GatewayError;
use thiserror::Error;

/// Failures while dispatching a signal
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The gateway refused or failed the submission. The dispatcher's
    /// position already reflects the attempt.
    #[error("gateway error: {0}")]
    Gateway(#[from] GatewayError),
}

pub type DispatchResult<T> = Result<T, DispatchError>;
