use std::collections::{BTreeSet, HashMap};

use bigdecimal::{BigDecimal, ToPrimitive};
use meridian_core::models::{
    AccountIdentifier, Amount, Currency, OpMetaTokenAmount, Operation, OperationIdentifier,
    ParsedInstructionMeta,
};
use meridian_core::network::native_currency;
use meridian_core::{classify_status, OperationStatus, OperationType, Taxonomy};
use tracing::debug;

use solana_transaction_status::EncodedTransactionWithStatusMeta;

use crate::account::AccountStateLookup;
use crate::decode::{self, LamportTransfer, NativeAction, NativeProgram, TokenAction};
use crate::native::{NativeInstruction, TransactionView};

/// Per-transaction facts every instruction of that transaction shares.
pub struct TransactionContext<'a> {
    // token account -> (mint, decimals), from the pre/post token balances
    token_accounts: HashMap<&'a str, (&'a str, u8)>,
    status: OperationStatus,
}

impl<'a> TransactionContext<'a> {
    pub fn new(view: &TransactionView<'a>) -> Self {
        let account_keys = view.account_keys();
        let mut token_accounts = HashMap::new();
        for balance in view.token_balances() {
            if let Some(key) = account_keys.get(usize::from(balance.account_index)) {
                token_accounts.insert(
                    *key,
                    (balance.mint.as_str(), balance.ui_token_amount.decimals),
                );
            }
        }

        Self {
            token_accounts,
            status: classify_status(view.succeeded()),
        }
    }

    pub fn status(&self) -> OperationStatus {
        self.status
    }

    fn token_account(&self, pubkey: &str) -> Option<(&'a str, u8)> {
        self.token_accounts.get(pubkey).copied()
    }
}

/// Turns native instructions into canonical operations.
pub struct Classifier<'a> {
    taxonomy: &'a Taxonomy,
    accounts: &'a dyn AccountStateLookup,
}

impl<'a> Classifier<'a> {
    pub fn new(taxonomy: &'a Taxonomy, accounts: &'a dyn AccountStateLookup) -> Self {
        Self { taxonomy, accounts }
    }

    /// Classifies one instruction. Never returns an empty list: anything that
    /// cannot be typed comes back as a single `Unknown` operation.
    pub fn classify(
        &self,
        ix: &NativeInstruction<'_>,
        ctx: &TransactionContext<'_>,
        first_index: u64,
    ) -> Vec<Operation> {
        let Some(program_id) = ix.program_id() else {
            debug!("instruction references a missing program account");
            return vec![unknown(ctx.status, first_index, None)];
        };

        let program = NativeProgram::from_program_id(program_id);
        let op_type = match program {
            NativeProgram::System => OperationType::NativeTransfer,
            NativeProgram::SplToken => OperationType::TokenTransfer,
            NativeProgram::Other => OperationType::Unknown,
        };
        if self.taxonomy.admit(op_type) == OperationType::Unknown {
            return vec![unknown(ctx.status, first_index, Some(program_id))];
        }

        let ops = match decode::decode(program, ix) {
            Ok(Some(NativeAction::Lamports(transfer))) => {
                Some(lamport_ops(transfer, ctx.status, first_index))
            }
            Ok(Some(NativeAction::Token(action))) => self.token_ops(action, ctx, first_index),
            Ok(None) => None,
            Err(error) => {
                debug!(program_id, %error, "malformed instruction, emitting Unknown");
                None
            }
        };

        ops.unwrap_or_else(|| vec![unknown(ctx.status, first_index, Some(program_id))])
    }

    /// Mint and decimals for a token account, from the instruction itself,
    /// the transaction's token balances, or fetched account state.
    fn resolve_token(
        &self,
        account: &str,
        mint: Option<String>,
        decimals: Option<u8>,
        ctx: &TransactionContext<'_>,
    ) -> Option<(String, u8)> {
        let from_balances = ctx.token_account(account);
        let from_state = self.accounts.decimals_of(account);

        let mint = mint
            .or_else(|| from_balances.map(|(mint, _)| mint.to_string()))
            .or_else(|| from_state.as_ref().and_then(|(mint, _)| mint.clone()))?;
        let decimals = decimals
            .or_else(|| from_balances.map(|(_, decimals)| decimals))
            .or_else(|| from_state.as_ref().map(|(_, decimals)| *decimals))
            .or_else(|| self.accounts.token_state(&mint).and_then(|s| s.decimals))?;
        Some((mint, decimals))
    }

    fn token_ops(
        &self,
        action: TokenAction,
        ctx: &TransactionContext<'_>,
        first_index: u64,
    ) -> Option<Vec<Operation>> {
        let op_type = OperationType::TokenTransfer;
        let status = ctx.status;

        let ops = match action {
            TokenAction::Transfer {
                source,
                destination,
                amount,
                mint,
                decimals,
            } => {
                let (mint, decimals) = self
                    .resolve_token(&source, mint.clone(), decimals, ctx)
                    .or_else(|| self.resolve_token(&destination, mint, decimals, ctx))?;
                let base = token_meta(&mint, decimals, amount);
                debit_credit(
                    op_type,
                    status,
                    first_index,
                    Transfer {
                        source,
                        destination,
                        magnitude: amount,
                        currency: token_currency(&mint, decimals),
                    },
                    base,
                )
            }
            TokenAction::MintTo {
                mint,
                account,
                amount,
                decimals,
            } => {
                let (mint, decimals) = self.resolve_token(&account, Some(mint), decimals, ctx)?;
                let metadata = ParsedInstructionMeta {
                    destination: Some(account.clone()),
                    amount: Some(signed(amount, false)),
                    ..token_meta(&mint, decimals, amount)
                };
                vec![single(
                    op_type,
                    status,
                    first_index,
                    account,
                    signed(amount, false),
                    token_currency(&mint, decimals),
                    metadata,
                )]
            }
            TokenAction::Burn {
                account,
                mint,
                amount,
                decimals,
            } => {
                let (mint, decimals) = self.resolve_token(&account, Some(mint), decimals, ctx)?;
                let metadata = ParsedInstructionMeta {
                    source: Some(account.clone()),
                    amount: Some(signed(amount, true)),
                    ..token_meta(&mint, decimals, amount)
                };
                vec![single(
                    op_type,
                    status,
                    first_index,
                    account,
                    signed(amount, true),
                    token_currency(&mint, decimals),
                    metadata,
                )]
            }
            // Authority changes move no balance and carry no amount.
            TokenAction::AuthorityChange {
                target,
                authority,
                new_authority,
                authority_type,
            } => vec![Operation {
                operation_identifier: OperationIdentifier { index: first_index },
                related_operations: vec![],
                op_type,
                status,
                account: Some(AccountIdentifier::new(target)),
                amount: None,
                metadata: ParsedInstructionMeta {
                    authority,
                    new_authority,
                    authority_type: Some(authority_type),
                    ..Default::default()
                },
            }],
        };
        Some(ops)
    }
}

/// Classifies every instruction of `tx` in execution order, inner
/// instructions right after the instruction that invoked them, numbering
/// operations contiguously from zero.
pub fn parse_solana_transaction(
    tx: &EncodedTransactionWithStatusMeta,
    classifier: &Classifier<'_>,
) -> Vec<Operation> {
    let view = TransactionView::new(tx);
    let ctx = TransactionContext::new(&view);
    let mut operations = Vec::new();
    for ix in view.instructions() {
        let next_index = operations.len() as u64;
        operations.extend(classifier.classify(ix, &ctx, next_index));
    }
    operations
}

/// Token accounts whose mint or decimals this transaction alone cannot
/// supply. Callers fetch their state before translating.
pub fn accounts_missing_token_state(tx: &EncodedTransactionWithStatusMeta) -> BTreeSet<String> {
    let view = TransactionView::new(tx);
    let ctx = TransactionContext::new(&view);
    let mut missing = BTreeSet::new();

    for ix in view.instructions() {
        let Some(program_id) = ix.program_id() else {
            continue;
        };
        let program = NativeProgram::from_program_id(program_id);
        if program != NativeProgram::SplToken {
            continue;
        }
        let Ok(Some(NativeAction::Token(action))) = decode::decode(program, ix) else {
            continue;
        };
        match action {
            TokenAction::Transfer {
                source,
                destination,
                mint,
                decimals,
                ..
            } => {
                let known = ctx.token_account(&source).is_some()
                    || ctx.token_account(&destination).is_some();
                if !known && (mint.is_none() || decimals.is_none()) {
                    missing.insert(mint.unwrap_or(source));
                }
            }
            TokenAction::MintTo {
                mint,
                account,
                decimals: None,
                ..
            }
            | TokenAction::Burn {
                mint,
                account,
                decimals: None,
                ..
            } => {
                if ctx.token_account(&account).is_none() {
                    missing.insert(mint);
                }
            }
            _ => {}
        }
    }
    missing
}

fn unknown(status: OperationStatus, index: u64, program_id: Option<&str>) -> Operation {
    Operation {
        operation_identifier: OperationIdentifier { index },
        related_operations: vec![],
        op_type: OperationType::Unknown,
        status,
        account: None,
        amount: None,
        metadata: program_id
            .map(ParsedInstructionMeta::for_program)
            .unwrap_or_default(),
    }
}

struct Transfer {
    source: String,
    destination: String,
    magnitude: u64,
    currency: Currency,
}

fn lamport_ops(transfer: LamportTransfer, status: OperationStatus, first_index: u64) -> Vec<Operation> {
    let base = ParsedInstructionMeta {
        lamports: Some(transfer.lamports),
        space: transfer.space,
        ..Default::default()
    };
    debit_credit(
        OperationType::NativeTransfer,
        status,
        first_index,
        Transfer {
            source: transfer.source,
            destination: transfer.destination,
            magnitude: transfer.lamports,
            currency: native_currency(),
        },
        base,
    )
}

/// A debit on the source and a matching credit on the destination. The two
/// amounts always sum to zero.
fn debit_credit(
    op_type: OperationType,
    status: OperationStatus,
    first_index: u64,
    transfer: Transfer,
    base: ParsedInstructionMeta,
) -> Vec<Operation> {
    let debit_id = OperationIdentifier { index: first_index };
    let credit_id = OperationIdentifier {
        index: first_index + 1,
    };
    let debit_value = signed(transfer.magnitude, true);
    let credit_value = signed(transfer.magnitude, false);

    let debit = Operation {
        operation_identifier: debit_id,
        related_operations: vec![credit_id],
        op_type,
        status,
        account: Some(AccountIdentifier::new(transfer.source.clone())),
        amount: Some(Amount {
            value: debit_value.clone(),
            currency: transfer.currency.clone(),
        }),
        metadata: ParsedInstructionMeta {
            source: Some(transfer.source),
            amount: Some(debit_value),
            ..base.clone()
        },
    };
    let credit = Operation {
        operation_identifier: credit_id,
        related_operations: vec![debit_id],
        op_type,
        status,
        account: Some(AccountIdentifier::new(transfer.destination.clone())),
        amount: Some(Amount {
            value: credit_value.clone(),
            currency: transfer.currency,
        }),
        metadata: ParsedInstructionMeta {
            destination: Some(transfer.destination),
            amount: Some(credit_value),
            ..base
        },
    };
    vec![debit, credit]
}

fn single(
    op_type: OperationType,
    status: OperationStatus,
    index: u64,
    account: String,
    value: String,
    currency: Currency,
    metadata: ParsedInstructionMeta,
) -> Operation {
    Operation {
        operation_identifier: OperationIdentifier { index },
        related_operations: vec![],
        op_type,
        status,
        account: Some(AccountIdentifier::new(account)),
        amount: Some(Amount { value, currency }),
        metadata,
    }
}

fn token_currency(mint: &str, decimals: u8) -> Currency {
    Currency {
        symbol: mint.to_string(),
        decimals: u32::from(decimals),
    }
}

fn token_meta(mint: &str, decimals: u8, amount: u64) -> ParsedInstructionMeta {
    ParsedInstructionMeta {
        mint: Some(mint.to_string()),
        decimals: Some(decimals),
        token_amount: Some(OpMetaTokenAmount {
            amount: amount.to_string(),
            decimals: u32::from(decimals),
            ui_amount: ui_amount(amount, decimals),
        }),
        ..Default::default()
    }
}

fn ui_amount(amount: u64, decimals: u8) -> Option<f64> {
    format!("{amount}e-{decimals}")
        .parse::<BigDecimal>()
        .ok()?
        .to_f64()
}

fn signed(magnitude: u64, negative: bool) -> String {
    if negative && magnitude != 0 {
        format!("-{magnitude}")
    } else {
        magnitude.to_string()
    }
}
