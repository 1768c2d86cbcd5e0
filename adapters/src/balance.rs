//! Point-in-time balances derived by replaying translated blocks.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use meridian_core::models::{Amount, Block, Currency};
use meridian_core::network::native_currency;

use crate::error::{AdapterError, AdapterResult};

/// Replays operations for one account and currency.
///
/// Blocks must be fed in strictly ascending index order; the resolver does
/// not walk the chain itself and trusts the order it is given.
#[derive(Debug, Clone)]
pub struct BalanceResolver {
    account: String,
    currency: Currency,
    balance: BigDecimal,
    last_index: Option<u64>,
}

impl BalanceResolver {
    pub fn new(account: impl Into<String>, currency: Currency) -> Self {
        Self {
            account: account.into(),
            currency,
            balance: BigDecimal::from(0),
            last_index: None,
        }
    }

    pub fn native(account: impl Into<String>) -> Self {
        Self::new(account, native_currency())
    }

    /// Starts from a known balance, e.g. a snapshot taken before the first
    /// replayed block.
    pub fn with_opening_balance(mut self, value: &str) -> AdapterResult<Self> {
        self.balance = parse_amount(value)?;
        Ok(self)
    }

    pub fn apply(&mut self, block: &Block) -> AdapterResult<()> {
        let index = block.block_identifier.index;
        if let Some(previous) = self.last_index {
            if index <= previous {
                return Err(AdapterError::OutOfOrderBlock { previous, index });
            }
        }

        for (_, op) in block.operations() {
            if !op.status.is_successful() {
                continue;
            }
            let (Some(account), Some(amount)) = (&op.account, &op.amount) else {
                continue;
            };
            if account.address == self.account && amount.currency == self.currency {
                self.balance += parse_amount(&amount.value)?;
            }
        }

        self.last_index = Some(index);
        Ok(())
    }

    pub fn last_index(&self) -> Option<u64> {
        self.last_index
    }

    pub fn balance(&self) -> Amount {
        Amount {
            value: self.balance.to_string(),
            currency: self.currency.clone(),
        }
    }
}

fn parse_amount(value: &str) -> AdapterResult<BigDecimal> {
    let amount =
        BigDecimal::from_str(value).map_err(|_| AdapterError::InvalidAmount(value.to_string()))?;
    if !amount.is_integer() {
        return Err(AdapterError::InvalidAmount(value.to_string()));
    }
    Ok(amount)
}

/// Balance of `account` after every block with index ≤ `block_index`.
pub fn balance_at<'b, I>(
    blocks: I,
    account: &str,
    currency: &Currency,
    block_index: u64,
) -> AdapterResult<Amount>
where
    I: IntoIterator<Item = &'b Block>,
{
    let mut resolver = BalanceResolver::new(account, currency.clone());
    for block in blocks {
        if block.block_identifier.index > block_index {
            break;
        }
        resolver.apply(block)?;
    }
    Ok(resolver.balance())
}
