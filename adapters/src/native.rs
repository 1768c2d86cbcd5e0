//! Borrowed views over the `getBlock` payload types of
//! `solana-transaction-status`.
//!
//! The node's types are used as-is; this module only flattens what the
//! classifier reads: account keys, the instruction sequence with inner
//! instructions in execution order, token balances and the success flag.

use serde_json::Value;
use solana_transaction_status::option_serializer::OptionSerializer;
use solana_transaction_status::{
    EncodedTransaction, EncodedTransactionWithStatusMeta, Reward, UiCompiledInstruction,
    UiConfirmedBlock, UiInstruction, UiMessage, UiParsedInstruction, UiTransactionStatusMeta,
    UiTransactionTokenBalance,
};

/// Base58 of 32 zero bytes. Nodes return it as `previousBlockhash` once the
/// parent has been purged from the ledger.
pub const ZERO_HASH: &str = "11111111111111111111111111111111";

pub fn parent_is_pruned(block: &UiConfirmedBlock) -> bool {
    block.previous_blockhash == ZERO_HASH
}

pub fn block_transactions(block: &UiConfirmedBlock) -> &[EncodedTransactionWithStatusMeta] {
    block.transactions.as_deref().unwrap_or(&[])
}

pub fn block_rewards(block: &UiConfirmedBlock) -> &[Reward] {
    block.rewards.as_deref().unwrap_or(&[])
}

fn present<T>(value: &OptionSerializer<T>) -> Option<&T> {
    match value {
        OptionSerializer::Some(value) => Some(value),
        OptionSerializer::None | OptionSerializer::Skip => None,
    }
}

/// First signature of a JSON-encoded transaction.
pub fn transaction_signature(tx: &EncodedTransactionWithStatusMeta) -> Option<&str> {
    match &tx.transaction {
        EncodedTransaction::Json(ui) => ui.signatures.first().map(String::as_str),
        _ => None,
    }
}

/// One instruction with its program and accounts resolved against the
/// transaction's account keys.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeInstruction<'a> {
    /// Parsed by the node.
    Parsed {
        program_id: &'a str,
        parsed: &'a Value,
    },
    /// Base58 instruction data still to be decoded.
    Raw {
        program_id: &'a str,
        accounts: Vec<&'a str>,
        data: &'a str,
    },
    /// A compiled instruction referencing an index past the account keys.
    Unresolved {
        program_id: Option<&'a str>,
        missing: usize,
    },
}

impl<'a> NativeInstruction<'a> {
    pub fn from_ui(ix: &'a UiInstruction, account_keys: &[&'a str]) -> Self {
        match ix {
            UiInstruction::Parsed(UiParsedInstruction::Parsed(ix)) => NativeInstruction::Parsed {
                program_id: &ix.program_id,
                parsed: &ix.parsed,
            },
            UiInstruction::Parsed(UiParsedInstruction::PartiallyDecoded(ix)) => {
                NativeInstruction::Raw {
                    program_id: &ix.program_id,
                    accounts: ix.accounts.iter().map(String::as_str).collect(),
                    data: &ix.data,
                }
            }
            UiInstruction::Compiled(ix) => Self::from_compiled(ix, account_keys),
        }
    }

    pub fn from_compiled(ix: &'a UiCompiledInstruction, account_keys: &[&'a str]) -> Self {
        let key = |index: u8| account_keys.get(usize::from(index)).copied();

        let program_id = key(ix.program_id_index);
        let Some(program) = program_id else {
            return NativeInstruction::Unresolved {
                program_id,
                missing: usize::from(ix.program_id_index),
            };
        };

        let mut accounts = Vec::with_capacity(ix.accounts.len());
        for &index in &ix.accounts {
            match key(index) {
                Some(account) => accounts.push(account),
                None => {
                    return NativeInstruction::Unresolved {
                        program_id,
                        missing: usize::from(index),
                    }
                }
            }
        }
        NativeInstruction::Raw {
            program_id: program,
            accounts,
            data: &ix.data,
        }
    }

    pub fn program_id(&self) -> Option<&'a str> {
        match self {
            NativeInstruction::Parsed { program_id, .. }
            | NativeInstruction::Raw { program_id, .. } => Some(program_id),
            NativeInstruction::Unresolved { program_id, .. } => *program_id,
        }
    }
}

/// Flattened read-only view of one transaction.
pub struct TransactionView<'a> {
    account_keys: Vec<&'a str>,
    instructions: Vec<NativeInstruction<'a>>,
    meta: Option<&'a UiTransactionStatusMeta>,
}

impl<'a> TransactionView<'a> {
    pub fn new(tx: &'a EncodedTransactionWithStatusMeta) -> Self {
        let meta = tx.meta.as_ref();
        let EncodedTransaction::Json(ui) = &tx.transaction else {
            return Self {
                account_keys: Vec::new(),
                instructions: Vec::new(),
                meta,
            };
        };

        let (account_keys, outer): (Vec<&str>, Vec<NativeInstruction>) = match &ui.message {
            UiMessage::Parsed(message) => {
                let keys: Vec<&str> = message
                    .account_keys
                    .iter()
                    .map(|key| key.pubkey.as_str())
                    .collect();
                let outer = message
                    .instructions
                    .iter()
                    .map(|ix| NativeInstruction::from_ui(ix, &keys))
                    .collect();
                (keys, outer)
            }
            UiMessage::Raw(message) => {
                let mut keys: Vec<&str> = message.account_keys.iter().map(String::as_str).collect();
                // v0 messages address lookup-table accounts after the static keys
                if let Some(loaded) = meta.and_then(|meta| present(&meta.loaded_addresses)) {
                    keys.extend(loaded.writable.iter().map(String::as_str));
                    keys.extend(loaded.readonly.iter().map(String::as_str));
                }
                let outer = message
                    .instructions
                    .iter()
                    .map(|ix| NativeInstruction::from_compiled(ix, &keys))
                    .collect();
                (keys, outer)
            }
        };

        let inner = meta
            .and_then(|meta| present(&meta.inner_instructions))
            .map(Vec::as_slice)
            .unwrap_or(&[]);

        let mut instructions = Vec::new();
        for (position, ix) in outer.into_iter().enumerate() {
            instructions.push(ix);
            for group in inner.iter().filter(|group| usize::from(group.index) == position) {
                instructions.extend(
                    group
                        .instructions
                        .iter()
                        .map(|ix| NativeInstruction::from_ui(ix, &account_keys)),
                );
            }
        }

        Self {
            account_keys,
            instructions,
            meta,
        }
    }

    pub fn account_keys(&self) -> &[&'a str] {
        &self.account_keys
    }

    /// Outer instructions, each followed by the instructions it invoked.
    pub fn instructions(&self) -> &[NativeInstruction<'a>] {
        &self.instructions
    }

    /// Native success flag. A transaction without an execution result is not
    /// a success.
    pub fn succeeded(&self) -> bool {
        self.meta
            .is_some_and(|meta| meta.err.is_none() && meta.status.is_ok())
    }

    pub fn token_balances(&self) -> impl Iterator<Item = &'a UiTransactionTokenBalance> {
        let meta = self.meta;
        let pre = meta.and_then(|meta| present(&meta.pre_token_balances));
        let post = meta.and_then(|meta| present(&meta.post_token_balances));
        pre.into_iter().flatten().chain(post.into_iter().flatten())
    }
}
