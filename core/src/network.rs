//! Supported networks, their genesis blocks and the native currency.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::MeridianError;
use crate::models::{BlockIdentifier, Currency};

pub const BLOCKCHAIN: &str = "solana";

pub const SYMBOL: &str = "SOL";
pub const DECIMALS: u32 = 9;

pub const GENESIS_BLOCK_INDEX: u64 = 0;

pub const MAINNET_GENESIS_HASH: &str = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d";
pub const TESTNET_GENESIS_HASH: &str = "4uhcVJyU9pJkvQyS88uRDiswHXSCkY3zQawwpjk2NsNY";

/// Historical balance lookups are served by replaying operations.
pub const HISTORICAL_BALANCE_SUPPORTED: bool = true;

pub fn native_currency() -> Currency {
    Currency {
        symbol: SYMBOL.to_string(),
        decimals: DECIMALS,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[serde(alias = "mainnet-beta")]
    Mainnet,
    /// Also accepted as `devnet`, the name older clients send.
    #[serde(alias = "devnet")]
    Testnet,
}

impl Network {
    pub const ALL: [Network; 2] = [Network::Mainnet, Network::Testnet];

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
        }
    }

    pub fn genesis(&self) -> NetworkGenesis {
        let hash = match self {
            Network::Mainnet => MAINNET_GENESIS_HASH,
            Network::Testnet => TESTNET_GENESIS_HASH,
        };
        NetworkGenesis {
            network: *self,
            block_identifier: BlockIdentifier::new(GENESIS_BLOCK_INDEX, hash),
        }
    }

    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = MeridianError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "mainnet" | "mainnet-beta" => Ok(Network::Mainnet),
            "testnet" | "devnet" => Ok(Network::Testnet),
            other => Err(MeridianError::UnsupportedNetwork(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkGenesis {
    pub network: Network,
    pub block_identifier: BlockIdentifier,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentifier {
    pub blockchain: String,
    pub network: String,
}

impl From<Network> for NetworkIdentifier {
    fn from(network: Network) -> Self {
        Self {
            blockchain: BLOCKCHAIN.to_string(),
            network: network.name().to_string(),
        }
    }
}

impl NetworkIdentifier {
    /// Resolves an identifier coming in over the API.
    pub fn resolve(&self) -> Result<Network, MeridianError> {
        if self.blockchain != BLOCKCHAIN {
            return Err(MeridianError::UnsupportedNetwork(format!(
                "{}/{}",
                self.blockchain, self.network
            )));
        }
        self.network.parse()
    }
}
