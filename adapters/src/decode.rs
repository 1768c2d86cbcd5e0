//! Normalizes system and token instructions into balance-moving actions.
//!
//! Parsed instructions are read from the node's JSON; partially decoded and
//! compiled ones are decoded from their base58 data. Both paths produce the
//! same [`NativeAction`].

use serde::Deserialize;
use serde_json::Value;
use spl_token::instruction::TokenInstruction;
use spl_token::solana_program::system_instruction::SystemInstruction;

use crate::account::TokenParsed;
use crate::error::DecodeError;
use crate::native::NativeInstruction;

pub const SYSTEM_PROGRAM_ID: &str = "11111111111111111111111111111111";
pub const TOKEN_PROGRAM_ID: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const TOKEN_2022_PROGRAM_ID: &str = "TokenzQdBNbLqP5VEhdkAS6EPFLC1PHnBqCXEpPxuEb";

pub const AUTHORITY_FREEZE: &str = "freeze";
pub const AUTHORITY_THAW: &str = "thaw";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeProgram {
    System,
    SplToken,
    Other,
}

impl NativeProgram {
    pub fn from_program_id(program_id: &str) -> Self {
        match program_id {
            SYSTEM_PROGRAM_ID => NativeProgram::System,
            TOKEN_PROGRAM_ID | TOKEN_2022_PROGRAM_ID => NativeProgram::SplToken,
            _ => NativeProgram::Other,
        }
    }
}

/// Lamports moved by the system program. `space` is set for account creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LamportTransfer {
    pub source: String,
    pub destination: String,
    pub lamports: u64,
    pub space: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenAction {
    Transfer {
        source: String,
        destination: String,
        amount: u64,
        mint: Option<String>,
        decimals: Option<u8>,
    },
    MintTo {
        mint: String,
        account: String,
        amount: u64,
        decimals: Option<u8>,
    },
    Burn {
        account: String,
        mint: String,
        amount: u64,
        decimals: Option<u8>,
    },
    AuthorityChange {
        target: String,
        authority: Option<String>,
        new_authority: Option<String>,
        authority_type: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NativeAction {
    Lamports(LamportTransfer),
    Token(TokenAction),
}

/// Decodes `ix` under `program`'s schema.
///
/// `Ok(None)` means the instruction is well formed but moves no balance
/// this translator tracks.
pub fn decode(
    program: NativeProgram,
    ix: &NativeInstruction<'_>,
) -> Result<Option<NativeAction>, DecodeError> {
    match (program, ix) {
        (NativeProgram::Other, _) => Ok(None),
        (_, NativeInstruction::Unresolved { missing, .. }) => {
            Err(DecodeError::MissingAccount(*missing))
        }
        (NativeProgram::System, NativeInstruction::Parsed { parsed, .. }) => {
            Ok(parse_system(parsed)?.map(NativeAction::Lamports))
        }
        (NativeProgram::SplToken, NativeInstruction::Parsed { parsed, .. }) => {
            Ok(parse_token(parsed)?.map(NativeAction::Token))
        }
        (NativeProgram::System, NativeInstruction::Raw { accounts, data, .. }) => {
            let data = bs58::decode(data).into_vec()?;
            Ok(decode_system(&data, accounts)?.map(NativeAction::Lamports))
        }
        (NativeProgram::SplToken, NativeInstruction::Raw { accounts, data, .. }) => {
            let data = bs58::decode(data).into_vec()?;
            Ok(decode_token(&data, accounts)?.map(NativeAction::Token))
        }
    }
}

fn account_at(accounts: &[&str], index: usize) -> Result<String, DecodeError> {
    accounts
        .get(index)
        .map(|account| account.to_string())
        .ok_or(DecodeError::MissingAccount(index))
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    info: Value,
}

#[derive(Deserialize)]
struct SystemTransferInfo {
    source: String,
    destination: String,
    lamports: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateAccountInfo {
    source: String,
    new_account: String,
    lamports: u64,
    space: u64,
}

/// `tokenAmount` of a checked instruction.
#[derive(Deserialize)]
struct CheckedAmount {
    amount: String,
    decimals: u8,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenTransferInfo {
    source: String,
    destination: String,
    #[serde(default)]
    mint: Option<String>,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    token_amount: Option<CheckedAmount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SupplyChangeInfo {
    mint: String,
    account: String,
    #[serde(default)]
    amount: Option<String>,
    #[serde(default)]
    token_amount: Option<CheckedAmount>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SetAuthorityInfo {
    #[serde(default)]
    mint: Option<String>,
    #[serde(default)]
    account: Option<String>,
    authority_type: String,
    #[serde(default)]
    new_authority: Option<String>,
    #[serde(default)]
    authority: Option<String>,
    #[serde(default)]
    multisig_authority: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct FreezeInfo {
    account: String,
    #[serde(default)]
    freeze_authority: Option<String>,
    #[serde(default)]
    multisig_freeze_authority: Option<String>,
}

fn parse_system(parsed: &Value) -> Result<Option<LamportTransfer>, DecodeError> {
    let envelope = Envelope::deserialize(parsed)?;
    match envelope.kind.as_str() {
        "transfer" | "transferWithSeed" => {
            let info: SystemTransferInfo = serde_json::from_value(envelope.info)?;
            Ok(Some(LamportTransfer {
                source: info.source,
                destination: info.destination,
                lamports: info.lamports,
                space: None,
            }))
        }
        "createAccount" | "createAccountWithSeed" => {
            let info: CreateAccountInfo = serde_json::from_value(envelope.info)?;
            Ok(Some(LamportTransfer {
                source: info.source,
                destination: info.new_account,
                lamports: info.lamports,
                space: Some(info.space),
            }))
        }
        _ => Ok(None),
    }
}

/// Amount from either the plain `amount` string or a checked `tokenAmount`.
fn token_amount(
    amount: Option<String>,
    token_amount: Option<CheckedAmount>,
) -> Result<(u64, Option<u8>), DecodeError> {
    let (raw, decimals) = match (amount, token_amount) {
        (_, Some(checked)) => (checked.amount, Some(checked.decimals)),
        (Some(amount), None) => (amount, None),
        (None, None) => return Err(DecodeError::Amount(String::new())),
    };
    let amount = raw.parse::<u64>().map_err(|_| DecodeError::Amount(raw))?;
    Ok((amount, decimals))
}

fn parse_token(parsed: &Value) -> Result<Option<TokenAction>, DecodeError> {
    let envelope = Envelope::deserialize(parsed)?;
    let action = match envelope.kind.as_str() {
        "transfer" | "transferChecked" => {
            let info: TokenTransferInfo = serde_json::from_value(envelope.info)?;
            let (amount, decimals) = token_amount(info.amount, info.token_amount)?;
            TokenAction::Transfer {
                source: info.source,
                destination: info.destination,
                amount,
                mint: info.mint,
                decimals,
            }
        }
        "mintTo" | "mintToChecked" => {
            let info: SupplyChangeInfo = serde_json::from_value(envelope.info)?;
            let (amount, decimals) = token_amount(info.amount, info.token_amount)?;
            TokenAction::MintTo {
                mint: info.mint,
                account: info.account,
                amount,
                decimals,
            }
        }
        "burn" | "burnChecked" => {
            let info: SupplyChangeInfo = serde_json::from_value(envelope.info)?;
            let (amount, decimals) = token_amount(info.amount, info.token_amount)?;
            TokenAction::Burn {
                account: info.account,
                mint: info.mint,
                amount,
                decimals,
            }
        }
        "setAuthority" => {
            let info: SetAuthorityInfo = serde_json::from_value(envelope.info)?;
            let target = info
                .mint
                .or(info.account)
                .ok_or(DecodeError::Layout { program: "spl-token" })?;
            TokenAction::AuthorityChange {
                target,
                authority: info.authority.or(info.multisig_authority),
                new_authority: info.new_authority,
                authority_type: info.authority_type,
            }
        }
        kind @ ("freezeAccount" | "thawAccount") => {
            let info: FreezeInfo = serde_json::from_value(envelope.info)?;
            TokenAction::AuthorityChange {
                target: info.account,
                authority: info.freeze_authority.or(info.multisig_freeze_authority),
                new_authority: None,
                authority_type: freeze_label(kind == "freezeAccount").to_string(),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(action))
}

fn freeze_label(freeze: bool) -> &'static str {
    if freeze {
        AUTHORITY_FREEZE
    } else {
        AUTHORITY_THAW
    }
}

fn decode_system(data: &[u8], accounts: &[&str]) -> Result<Option<LamportTransfer>, DecodeError> {
    let ix: SystemInstruction =
        bincode::deserialize(data).map_err(|_| DecodeError::Layout { program: "system" })?;
    let transfer = match ix {
        SystemInstruction::Transfer { lamports } => LamportTransfer {
            source: account_at(accounts, 0)?,
            destination: account_at(accounts, 1)?,
            lamports,
            space: None,
        },
        SystemInstruction::TransferWithSeed { lamports, .. } => LamportTransfer {
            source: account_at(accounts, 0)?,
            destination: account_at(accounts, 2)?,
            lamports,
            space: None,
        },
        SystemInstruction::CreateAccount { lamports, space, .. }
        | SystemInstruction::CreateAccountWithSeed { lamports, space, .. } => LamportTransfer {
            source: account_at(accounts, 0)?,
            destination: account_at(accounts, 1)?,
            lamports,
            space: Some(space),
        },
        _ => return Ok(None),
    };
    Ok(Some(transfer))
}

fn decode_token(data: &[u8], accounts: &[&str]) -> Result<Option<TokenAction>, DecodeError> {
    let ix = TokenInstruction::unpack(data)
        .map_err(|_| DecodeError::Layout { program: "spl-token" })?;
    let action = match ix {
        TokenInstruction::Transfer { amount } => TokenAction::Transfer {
            source: account_at(accounts, 0)?,
            destination: account_at(accounts, 1)?,
            amount,
            mint: None,
            decimals: None,
        },
        TokenInstruction::TransferChecked { amount, decimals } => TokenAction::Transfer {
            source: account_at(accounts, 0)?,
            mint: Some(account_at(accounts, 1)?),
            destination: account_at(accounts, 2)?,
            amount,
            decimals: Some(decimals),
        },
        TokenInstruction::MintTo { amount } => TokenAction::MintTo {
            mint: account_at(accounts, 0)?,
            account: account_at(accounts, 1)?,
            amount,
            decimals: None,
        },
        TokenInstruction::MintToChecked { amount, decimals } => TokenAction::MintTo {
            mint: account_at(accounts, 0)?,
            account: account_at(accounts, 1)?,
            amount,
            decimals: Some(decimals),
        },
        TokenInstruction::Burn { amount } => TokenAction::Burn {
            account: account_at(accounts, 0)?,
            mint: account_at(accounts, 1)?,
            amount,
            decimals: None,
        },
        TokenInstruction::BurnChecked { amount, decimals } => TokenAction::Burn {
            account: account_at(accounts, 0)?,
            mint: account_at(accounts, 1)?,
            amount,
            decimals: Some(decimals),
        },
        TokenInstruction::SetAuthority {
            authority_type,
            new_authority,
        } => {
            let change = TokenParsed::from_set_authority(&authority_type, new_authority);
            TokenAction::AuthorityChange {
                target: account_at(accounts, 0)?,
                authority: accounts.get(1).map(|account| account.to_string()),
                new_authority: change.new_authority,
                authority_type: change.authority_type.unwrap_or_default(),
            }
        }
        ix @ (TokenInstruction::FreezeAccount | TokenInstruction::ThawAccount) => {
            TokenAction::AuthorityChange {
                target: account_at(accounts, 0)?,
                authority: accounts.get(2).map(|account| account.to_string()),
                new_authority: None,
                authority_type: freeze_label(matches!(ix, TokenInstruction::FreezeAccount))
                    .to_string(),
            }
        }
        _ => return Ok(None),
    };
    Ok(Some(action))
}
