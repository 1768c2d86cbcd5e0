// Block and account fetches against a Solana RPC node.
//
// Translation itself never touches the network; this module only gathers the
// payloads the assembler consumes.

use std::collections::{BTreeSet, HashMap};
use std::ops::Range;
use std::str::FromStr;

use futures::stream::{self, StreamExt, TryStreamExt};
use meridian_core::taxonomy::{GET_CLUSTER_NODES, GET_PROGRAM_ACCOUNTS};
use meridian_core::{MeridianError, Taxonomy};
use serde_json::{json, Value};
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_config::RpcBlockConfig;
use solana_client::rpc_request::{RpcError, RpcRequest};
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;
use solana_transaction_status::{TransactionDetails, UiConfirmedBlock, UiTransactionEncoding};
use tracing::{debug, info, warn};

use crate::account::TokenParsed;
use crate::decode::{TOKEN_2022_PROGRAM_ID, TOKEN_PROGRAM_ID};
use crate::error::{AdapterError, AdapterResult};
use crate::native::block_transactions;
use crate::solana_parser::accounts_missing_token_state;

// Block not available, slot skipped, slot skipped in long-term storage.
const MISSING_BLOCK_CODES: [i64; 3] = [-32004, -32007, -32009];

/// Source of raw native data for the translator.
#[async_trait::async_trait]
pub trait BlockSource: Send + Sync {
    async fn get_confirmed_block(&self, slot: u64) -> AdapterResult<UiConfirmedBlock>;

    /// Decoded token state, or `None` when the account is absent or not a
    /// token-program account.
    async fn get_account_info(&self, pubkey: &str) -> AdapterResult<Option<TokenParsed>>;
}

pub struct SolanaAdapter {
    client: RpcClient,
}

impl SolanaAdapter {
    pub fn new(rpc_url: &str) -> Self {
        Self {
            client: RpcClient::new_with_commitment(
                rpc_url.to_string(),
                CommitmentConfig::confirmed(),
            ),
        }
    }

    pub fn url(&self) -> String {
        self.client.url()
    }

    /// Forwards a whitelisted method to the node.
    pub async fn call(
        &self,
        taxonomy: &Taxonomy,
        method: &str,
        params: Value,
    ) -> AdapterResult<Value> {
        let request = match taxonomy.validate_call_method(method)? {
            GET_PROGRAM_ACCOUNTS => RpcRequest::GetProgramAccounts,
            GET_CLUSTER_NODES => RpcRequest::GetClusterNodes,
            other => return Err(MeridianError::UnsupportedCallMethod(other.to_string()).into()),
        };
        let params = match params {
            Value::Null => json!([]),
            params => params,
        };
        Ok(self.client.send::<Value>(request, params).await?)
    }
}

fn is_missing_block(error: &ClientError) -> bool {
    matches!(
        error.kind(),
        ClientErrorKind::RpcError(RpcError::RpcResponseError { code, .. })
            if MISSING_BLOCK_CODES.contains(code)
    )
}

#[async_trait::async_trait]
impl BlockSource for SolanaAdapter {
    async fn get_confirmed_block(&self, slot: u64) -> AdapterResult<UiConfirmedBlock> {
        let config = RpcBlockConfig {
            encoding: Some(UiTransactionEncoding::JsonParsed),
            transaction_details: Some(TransactionDetails::Full),
            rewards: Some(true),
            commitment: Some(self.client.commitment()),
            max_supported_transaction_version: Some(0),
        };

        match self.client.get_block_with_config(slot, config).await {
            Ok(block) => Ok(block),
            Err(error) if is_missing_block(&error) => Err(AdapterError::BlockNotFound(slot)),
            Err(error) => {
                warn!(slot, %error, "getBlock failed");
                Err(error.into())
            }
        }
    }

    async fn get_account_info(&self, pubkey: &str) -> AdapterResult<Option<TokenParsed>> {
        let address =
            Pubkey::from_str(pubkey).map_err(|_| AdapterError::InvalidAddress(pubkey.to_string()))?;
        let Some(account) = self
            .client
            .get_account_with_commitment(&address, self.client.commitment())
            .await?
            .value
        else {
            return Ok(None);
        };

        let owner = account.owner.to_string();
        if owner != TOKEN_PROGRAM_ID && owner != TOKEN_2022_PROGRAM_ID {
            return Ok(None);
        }

        match TokenParsed::unpack(&account.data) {
            Ok(state) => Ok(Some(state)),
            Err(error) => {
                debug!(pubkey, %error, "undecodable token account");
                Ok(None)
            }
        }
    }
}

/// Fetches `slots` with at most `concurrency` requests in flight.
///
/// Results come back in slot order; skipped slots are left out.
pub async fn fetch_blocks<S>(
    source: &S,
    slots: Range<u64>,
    concurrency: usize,
) -> AdapterResult<Vec<(u64, UiConfirmedBlock)>>
where
    S: BlockSource + ?Sized,
{
    info!(start = slots.start, end = slots.end, concurrency, "fetching blocks");
    stream::iter(slots)
        .map(|slot| async move {
            match source.get_confirmed_block(slot).await {
                Ok(block) => Ok(Some((slot, block))),
                Err(AdapterError::BlockNotFound(_)) => {
                    debug!(slot, "slot skipped");
                    Ok(None)
                }
                Err(error) => Err(error),
            }
        })
        .buffered(concurrency.max(1))
        .try_filter_map(|found| async move { Ok(found) })
        .try_collect()
        .await
}

/// Fetches token state the block's transactions cannot resolve on their own,
/// following token accounts to their mints.
pub async fn prefetch_token_state<S>(
    source: &S,
    block: &UiConfirmedBlock,
    concurrency: usize,
) -> AdapterResult<HashMap<String, TokenParsed>>
where
    S: BlockSource + ?Sized,
{
    let wanted: BTreeSet<String> = block_transactions(block)
        .iter()
        .flat_map(accounts_missing_token_state)
        .collect();

    let mut states = fetch_states(source, wanted, concurrency).await?;

    let mints: BTreeSet<String> = states
        .values()
        .filter(|state| state.decimals.is_none())
        .filter_map(|state| state.mint.clone())
        .filter(|mint| !states.contains_key(mint))
        .collect();
    states.extend(fetch_states(source, mints, concurrency).await?);

    Ok(states)
}

async fn fetch_states<S>(
    source: &S,
    pubkeys: BTreeSet<String>,
    concurrency: usize,
) -> AdapterResult<HashMap<String, TokenParsed>>
where
    S: BlockSource + ?Sized,
{
    stream::iter(pubkeys)
        .map(|pubkey| async move {
            let state = source.get_account_info(&pubkey).await?;
            Ok::<_, AdapterError>(state.map(|state| (pubkey, state)))
        })
        .buffer_unordered(concurrency.max(1))
        .try_filter_map(|found| async move { Ok(found) })
        .try_collect()
        .await
}
