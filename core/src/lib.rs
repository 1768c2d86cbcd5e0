//! Chain-agnostic ledger model shared by the Solana adapters, the API and the CLI.

pub mod config;
pub mod error;
pub mod models;
pub mod network;
pub mod taxonomy;

pub use error::{MeridianError, MeridianResult};
pub use network::Network;
pub use taxonomy::{classify_status, OperationStatus, OperationType, Taxonomy};
