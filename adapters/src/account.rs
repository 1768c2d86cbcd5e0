//! Decoded SPL token account state.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use spl_token::instruction::AuthorityType;
use spl_token::solana_program::program_option::COption;
use spl_token::solana_program::program_pack::Pack;
use spl_token::solana_program::pubkey::Pubkey;
use spl_token::state::{Account, Mint, Multisig};

use crate::error::DecodeError;

// Token-2022 stores the account type right after the base account layout.
const ACCOUNT_TYPE_OFFSET: usize = Account::LEN;
const ACCOUNT_TYPE_MINT: u8 = 1;
const ACCOUNT_TYPE_ACCOUNT: u8 = 2;

/// Fields decoded from a token-program mint, token account or multisig, or
/// from a raw `SetAuthority` instruction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenParsed {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decimals: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mint_authority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub freeze_authority: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_authority: Option<String>,
    /// Multisig signing threshold.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub m: Option<u8>,
}

fn optional_key(key: COption<Pubkey>) -> Option<String> {
    match key {
        COption::Some(key) => Some(key.to_string()),
        COption::None => None,
    }
}

pub(crate) fn authority_type_name(authority_type: &AuthorityType) -> &'static str {
    match authority_type {
        AuthorityType::MintTokens => "mintTokens",
        AuthorityType::FreezeAccount => "freezeAccount",
        AuthorityType::AccountOwner => "accountOwner",
        AuthorityType::CloseAccount => "closeAccount",
    }
}

impl TokenParsed {
    /// Decodes raw account data owned by SPL Token or Token-2022.
    pub fn unpack(data: &[u8]) -> Result<Self, DecodeError> {
        let len = data.len();
        if len == Mint::LEN {
            Self::unpack_mint(data)
        } else if len == Account::LEN {
            Self::unpack_account(data)
        } else if len == Multisig::LEN {
            Self::unpack_multisig(data)
        } else if len > ACCOUNT_TYPE_OFFSET {
            match data[ACCOUNT_TYPE_OFFSET] {
                ACCOUNT_TYPE_MINT => Self::unpack_mint(&data[..Mint::LEN]),
                ACCOUNT_TYPE_ACCOUNT => Self::unpack_account(&data[..Account::LEN]),
                _ => Err(DecodeError::AccountLayout(len)),
            }
        } else {
            Err(DecodeError::AccountLayout(len))
        }
    }

    fn unpack_mint(data: &[u8]) -> Result<Self, DecodeError> {
        let mint = Mint::unpack(data).map_err(|_| DecodeError::AccountLayout(data.len()))?;
        Ok(Self {
            decimals: Some(mint.decimals),
            amount: Some(mint.supply),
            mint_authority: optional_key(mint.mint_authority),
            freeze_authority: optional_key(mint.freeze_authority),
            ..Default::default()
        })
    }

    fn unpack_account(data: &[u8]) -> Result<Self, DecodeError> {
        let account = Account::unpack(data).map_err(|_| DecodeError::AccountLayout(data.len()))?;
        Ok(Self {
            amount: Some(account.amount),
            mint: Some(account.mint.to_string()),
            owner: Some(account.owner.to_string()),
            ..Default::default()
        })
    }

    fn unpack_multisig(data: &[u8]) -> Result<Self, DecodeError> {
        let multisig =
            Multisig::unpack(data).map_err(|_| DecodeError::AccountLayout(data.len()))?;
        Ok(Self {
            m: Some(multisig.m),
            ..Default::default()
        })
    }

    pub(crate) fn from_set_authority(
        authority_type: &AuthorityType,
        new_authority: COption<Pubkey>,
    ) -> Self {
        Self {
            authority_type: Some(authority_type_name(authority_type).to_string()),
            new_authority: optional_key(new_authority),
            ..Default::default()
        }
    }
}

/// Account state fetched ahead of translation, keyed by account address.
pub trait AccountStateLookup {
    fn token_state(&self, pubkey: &str) -> Option<&TokenParsed>;

    /// Decimals for a token account or mint, following a token account to its
    /// mint when needed.
    fn decimals_of(&self, pubkey: &str) -> Option<(Option<String>, u8)> {
        let state = self.token_state(pubkey)?;
        if let Some(decimals) = state.decimals {
            return Some((None, decimals));
        }
        let mint = state.mint.as_deref()?;
        let decimals = self.token_state(mint)?.decimals?;
        Some((Some(mint.to_string()), decimals))
    }
}

impl AccountStateLookup for HashMap<String, TokenParsed> {
    fn token_state(&self, pubkey: &str) -> Option<&TokenParsed> {
        self.get(pubkey)
    }
}

/// Lookup used when no account state was fetched.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAccountState;

impl AccountStateLookup for NoAccountState {
    fn token_state(&self, _pubkey: &str) -> Option<&TokenParsed> {
        None
    }
}
