//! Error types for fetching and translating Solana data.

use meridian_core::MeridianError;
use solana_client::client_error::ClientError;
use thiserror::Error;

/// Errors surfaced by the adapters to their callers.
#[derive(Debug, Error)]
pub enum AdapterError {
    /// The node has no block at this slot (skipped or purged).
    #[error("block not found at slot {0}")]
    BlockNotFound(u64),

    /// The RPC node failed; passed through untouched.
    #[error(transparent)]
    Upstream(#[from] ClientError),

    /// A request named something outside the supported set.
    #[error(transparent)]
    Rejected(#[from] MeridianError),

    /// An account address that is not a base58 public key.
    #[error("invalid account address {0:?}")]
    InvalidAddress(String),

    /// Balance replay received blocks out of height order.
    #[error("block {index} replayed after block {previous}")]
    OutOfOrderBlock { previous: u64, index: u64 },

    /// An operation amount that is not a signed integer.
    #[error("invalid amount: {0:?}")]
    InvalidAmount(String),
}

pub type AdapterResult<T> = Result<T, AdapterError>;

/// Why a single instruction or account could not be decoded.
///
/// Never escapes the classifier: instructions that fail to decode become
/// `Unknown` operations.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("invalid base58 data: {0}")]
    Base58(#[from] bs58::decode::Error),

    #[error("malformed parsed instruction: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unrecognized {program} instruction layout")]
    Layout { program: &'static str },

    #[error("instruction is missing account #{0}")]
    MissingAccount(usize),

    #[error("invalid amount {0:?}")]
    Amount(String),

    #[error("unrecognized token account layout ({0} bytes)")]
    AccountLayout(usize),
}
