//! Solana adapters: views over the node's payload types, the instruction
//! classifier, the block assembler, balance replay and the RPC collaborator.

pub mod account;
pub mod assembler;
pub mod balance;
pub mod decode;
pub mod error;
pub mod native;
pub mod solana;
pub mod solana_parser;

pub use account::{AccountStateLookup, NoAccountState, TokenParsed};
pub use assembler::{translate_block, BlockTranslator};
pub use balance::{balance_at, BalanceResolver};
pub use error::{AdapterError, AdapterResult};
pub use solana::{fetch_blocks, prefetch_token_state, BlockSource, SolanaAdapter};
pub use solana_transaction_status::{EncodedTransactionWithStatusMeta, UiConfirmedBlock};
