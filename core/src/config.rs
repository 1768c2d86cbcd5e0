//! Process settings read from the environment.
//!
//! Binaries call `dotenv::dotenv().ok()` first so a local `.env` file is
//! honoured.

use std::net::SocketAddr;

use crate::error::{MeridianError, MeridianResult};
use crate::network::Network;

pub const NETWORK_VAR: &str = "MERIDIAN_NETWORK";
pub const RPC_URL_VAR: &str = "SOLANA_RPC_URL";
pub const LISTEN_ADDR_VAR: &str = "MERIDIAN_LISTEN_ADDR";
pub const FETCH_CONCURRENCY_VAR: &str = "MERIDIAN_FETCH_CONCURRENCY";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:3000";
pub const DEFAULT_FETCH_CONCURRENCY: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub network: Network,
    pub rpc_url: String,
    pub listen_addr: SocketAddr,
    /// Upper bound on outstanding block fetches.
    pub fetch_concurrency: usize,
}

impl Settings {
    pub fn from_env() -> MeridianResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> MeridianResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let network: Network = match lookup(NETWORK_VAR) {
            Some(name) => name.parse()?,
            None => Network::Mainnet,
        };

        let rpc_url = lookup(RPC_URL_VAR).unwrap_or_else(|| network.default_rpc_url().to_string());

        let listen_addr = lookup(LISTEN_ADDR_VAR)
            .unwrap_or_else(|| DEFAULT_LISTEN_ADDR.to_string())
            .parse()
            .map_err(|e| MeridianError::InvalidConfig(format!("{LISTEN_ADDR_VAR}: {e}")))?;

        let fetch_concurrency = match lookup(FETCH_CONCURRENCY_VAR) {
            Some(raw) => raw
                .parse::<usize>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    MeridianError::InvalidConfig(format!(
                        "{FETCH_CONCURRENCY_VAR} must be a positive integer, got {raw}"
                    ))
                })?,
            None => DEFAULT_FETCH_CONCURRENCY,
        };

        Ok(Self {
            network,
            rpc_url,
            listen_addr,
            fetch_concurrency,
        })
    }
}
