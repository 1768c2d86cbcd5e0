//! Builds canonical blocks from `getBlock` payloads.
//!
//! Translation is a pure function of its inputs: no I/O, no shared state, so
//! distinct blocks can be translated concurrently. Ordering between blocks is
//! the caller's concern.

use meridian_core::models::{
    AccountIdentifier, Amount, Block, BlockIdentifier, BlockMetadata, Operation,
    OperationIdentifier, ParsedInstructionMeta, Transaction, TransactionIdentifier,
};
use meridian_core::network::{native_currency, GENESIS_BLOCK_INDEX};
use meridian_core::{Network, OperationStatus, OperationType, Taxonomy};
use solana_transaction_status::{EncodedTransactionWithStatusMeta, Reward, UiConfirmedBlock};
use tracing::debug;

use crate::account::{AccountStateLookup, NoAccountState};
use crate::native::{self, block_rewards, block_transactions};
use crate::solana_parser::{parse_solana_transaction, Classifier};

pub struct BlockTranslator<'a> {
    network: Network,
    taxonomy: &'a Taxonomy,
    accounts: &'a dyn AccountStateLookup,
}

impl<'a> BlockTranslator<'a> {
    pub fn new(network: Network, taxonomy: &'a Taxonomy) -> Self {
        Self {
            network,
            taxonomy,
            accounts: &NoAccountState,
        }
    }

    /// Use account state fetched ahead of time to resolve token decimals.
    pub fn with_account_state(mut self, accounts: &'a dyn AccountStateLookup) -> Self {
        self.accounts = accounts;
        self
    }

    pub fn translate(&self, block: &UiConfirmedBlock) -> Block {
        let classifier = Classifier::new(self.taxonomy, self.accounts);

        let mut transactions: Vec<Transaction> = block_transactions(block)
            .iter()
            .enumerate()
            .map(|(position, tx)| Transaction {
                transaction_identifier: transaction_identifier(block, position, tx),
                operations: parse_solana_transaction(tx, &classifier),
            })
            .collect();

        let rewards = block_rewards(block);
        transactions.extend(
            rewards
                .iter()
                .enumerate()
                .map(|(n, reward)| self.reward_transaction(block, n, reward)),
        );

        Block {
            block_identifier: BlockIdentifier::new(block.parent_slot, block.blockhash.clone()),
            parent_block_identifier: self.parent_identifier(block),
            timestamp: block.block_time,
            transactions,
            metadata: BlockMetadata {
                parent_slot: block.parent_slot,
                parent_pruned: native::parent_is_pruned(block),
                reward_count: (!rewards.is_empty()).then_some(rewards.len()),
            },
        }
    }

    /// Genesis substitution happens only at parent slot zero. A pruned parent
    /// hash anywhere else passes through unchanged.
    fn parent_identifier(&self, block: &UiConfirmedBlock) -> BlockIdentifier {
        if block.parent_slot == GENESIS_BLOCK_INDEX {
            return self.network.genesis().block_identifier;
        }
        if native::parent_is_pruned(block) {
            debug!(
                parent_slot = block.parent_slot,
                "parent hash pruned from ledger, leaving linkage as reported"
            );
        }
        BlockIdentifier::new(block.parent_slot - 1, block.previous_blockhash.clone())
    }

    // A recorded reward was paid out, so it is always a success.
    fn reward_transaction(
        &self,
        block: &UiConfirmedBlock,
        n: usize,
        reward: &Reward,
    ) -> Transaction {
        let value = reward.lamports.to_string();
        let credited = reward.lamports >= 0;
        let metadata = ParsedInstructionMeta {
            source: (!credited).then(|| reward.pubkey.clone()),
            destination: credited.then(|| reward.pubkey.clone()),
            amount: Some(value.clone()),
            lamports: Some(reward.lamports.unsigned_abs()),
            ..Default::default()
        };

        Transaction {
            transaction_identifier: TransactionIdentifier {
                hash: format!("{}:reward:{}", block.blockhash, n),
            },
            operations: vec![Operation {
                operation_identifier: OperationIdentifier { index: 0 },
                related_operations: vec![],
                op_type: self.taxonomy.admit(OperationType::Reward),
                status: OperationStatus::Success,
                account: Some(AccountIdentifier::new(reward.pubkey.clone())),
                amount: Some(Amount {
                    value,
                    currency: native_currency(),
                }),
                metadata,
            }],
        }
    }
}

fn transaction_identifier(
    block: &UiConfirmedBlock,
    position: usize,
    tx: &EncodedTransactionWithStatusMeta,
) -> TransactionIdentifier {
    let hash = match native::transaction_signature(tx) {
        Some(signature) => signature.to_string(),
        None => format!("{}:tx:{}", block.blockhash, position),
    };
    TransactionIdentifier { hash }
}

/// Translates `block` for `network` without any prefetched account state.
pub fn translate_block(block: &UiConfirmedBlock, network: Network, taxonomy: &Taxonomy) -> Block {
    BlockTranslator::new(network, taxonomy).translate(block)
}
