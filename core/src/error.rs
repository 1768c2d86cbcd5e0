//! Errors surfaced to callers as rejected requests.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeridianError {
    #[error("unsupported network: {0}")]
    UnsupportedNetwork(String),

    #[error("unsupported call method: {0}")]
    UnsupportedCallMethod(String),

    #[error("unsupported operation type: {0}")]
    UnsupportedOperationType(String),

    #[error("unsupported operation status: {0}")]
    UnsupportedOperationStatus(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type MeridianResult<T> = Result<T, MeridianError>;
