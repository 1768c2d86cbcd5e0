#![allow(dead_code)]

use meridian_adapters::{EncodedTransactionWithStatusMeta, UiConfirmedBlock};
use serde_json::{json, Value};

pub const SYSTEM: &str = "11111111111111111111111111111111";
pub const TOKEN: &str = "TokenkegQfeZyiNwAJbNbGKPFXCWuBvf9Ss623VQ5DA";
pub const MEMO: &str = "MemoSq4gqABAXKb96qnH8TysNcWxMyWCqXgDLGmfcHr";

pub const WALLET: &str = "WalletAddress111111111111111111111111111111";
pub const RECEIVER: &str = "Receiver11111111111111111111111111111111";
pub const MINT: &str = "So11111111111111111111111111111111111111112";

pub fn parsed_ix(program: &str, program_id: &str, parsed: Value) -> Value {
    json!({
        "program": program,
        "programId": program_id,
        "parsed": parsed,
        "stackHeight": null
    })
}

pub fn system_transfer(source: &str, destination: &str, lamports: u64) -> Value {
    parsed_ix(
        "system",
        SYSTEM,
        json!({
            "type": "transfer",
            "info": { "source": source, "destination": destination, "lamports": lamports }
        }),
    )
}

pub fn token_transfer(source: &str, destination: &str, amount: &str) -> Value {
    parsed_ix(
        "spl-token",
        TOKEN,
        json!({
            "type": "transfer",
            "info": {
                "source": source,
                "destination": destination,
                "authority": WALLET,
                "amount": amount
            }
        }),
    )
}

pub fn memo(text: &str) -> Value {
    parsed_ix("spl-memo", MEMO, json!(text))
}

pub fn token_balance(account_index: usize, mint: &str, amount: &str, decimals: u8) -> Value {
    json!({
        "accountIndex": account_index,
        "mint": mint,
        "owner": WALLET,
        "programId": TOKEN,
        "uiTokenAmount": {
            "amount": amount,
            "decimals": decimals,
            "uiAmount": null,
            "uiAmountString": amount
        }
    })
}

pub fn meta(success: bool, token_balances: Vec<Value>) -> Value {
    let (err, status) = if success {
        (Value::Null, json!({ "Ok": null }))
    } else {
        let err = json!({ "InstructionError": [0, { "Custom": 1 }] });
        (err.clone(), json!({ "Err": err }))
    };
    json!({
        "err": err,
        "status": status,
        "fee": 5000,
        "preBalances": [],
        "postBalances": [],
        "innerInstructions": [],
        "logMessages": [],
        "preTokenBalances": token_balances,
        "postTokenBalances": token_balances,
        "rewards": []
    })
}

pub fn transaction_json(
    signature: &str,
    account_keys: &[&str],
    instructions: Vec<Value>,
    meta: Value,
) -> Value {
    let keys: Vec<Value> = account_keys
        .iter()
        .map(|k| json!({ "pubkey": k, "signer": false, "writable": true, "source": "transaction" }))
        .collect();
    json!({
        "transaction": {
            "signatures": [signature],
            "message": {
                "accountKeys": keys,
                "instructions": instructions,
                "recentBlockhash": "11111111111111111111111111111111"
            }
        },
        "meta": meta,
        "version": "legacy"
    })
}

/// Records `instructions` as invoked by the outer instruction at `index`.
pub fn with_inner(mut tx: Value, index: u8, instructions: Vec<Value>) -> Value {
    let groups = tx["meta"]["innerInstructions"]
        .as_array_mut()
        .expect("meta fixture has innerInstructions");
    groups.push(json!({ "index": index, "instructions": instructions }));
    tx
}

pub fn transaction(
    signature: &str,
    account_keys: &[&str],
    instructions: Vec<Value>,
    success: bool,
) -> EncodedTransactionWithStatusMeta {
    serde_json::from_value(transaction_json(
        signature,
        account_keys,
        instructions,
        meta(success, vec![]),
    ))
    .expect("transaction fixture")
}

pub fn block_json(
    blockhash: &str,
    previous_blockhash: &str,
    parent_slot: u64,
    transactions: Vec<Value>,
    rewards: Value,
) -> Value {
    json!({
        "blockhash": blockhash,
        "previousBlockhash": previous_blockhash,
        "parentSlot": parent_slot,
        "transactions": transactions,
        "rewards": rewards,
        "blockTime": 1672531200,
        "blockHeight": parent_slot
    })
}

pub fn block(parent_slot: u64, transactions: Vec<Value>) -> UiConfirmedBlock {
    serde_json::from_value(block_json(
        &format!("Block{parent_slot}Hash"),
        &format!("Block{}Hash", parent_slot.saturating_sub(1)),
        parent_slot,
        transactions,
        json!([]),
    ))
    .expect("block fixture")
}
