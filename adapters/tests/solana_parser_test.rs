mod common;

use std::collections::HashMap;

use bigdecimal::BigDecimal;
use common::*;
use meridian_adapters::account::{NoAccountState, TokenParsed};
use meridian_adapters::solana_parser::{
    accounts_missing_token_state, parse_solana_transaction, Classifier,
};
use meridian_adapters::EncodedTransactionWithStatusMeta;
use meridian_core::models::Operation;
use meridian_core::network::native_currency;
use meridian_core::{OperationStatus, OperationType, Taxonomy};
use serde_json::json;
use solana_sdk::system_instruction::SystemInstruction;
use std::str::FromStr;

fn classify(tx: &EncodedTransactionWithStatusMeta) -> Vec<Operation> {
    let taxonomy = Taxonomy::solana();
    let classifier = Classifier::new(&taxonomy, &NoAccountState);
    parse_solana_transaction(tx, &classifier)
}

fn amount_sum(ops: &[Operation]) -> BigDecimal {
    ops.iter()
        .map(|op| BigDecimal::from_str(&op.amount.as_ref().expect("amount").value).unwrap())
        .fold(BigDecimal::from(0), |acc, v| acc + v)
}

#[test]
fn test_unknown_program_yields_one_unknown_operation() {
    for success in [true, false] {
        let tx = transaction("sig1", &[WALLET, MEMO], vec![memo("hello")], success);
        let ops = classify(&tx);

        assert_eq!(ops.len(), 1);
        let op = &ops[0];
        assert_eq!(op.op_type, OperationType::Unknown);
        assert_eq!(
            op.status,
            if success {
                OperationStatus::Success
            } else {
                OperationStatus::Failure
            }
        );
        assert_eq!(op.metadata.program_id.as_deref(), Some(MEMO));
        assert!(op.amount.is_none());
        assert!(op.account.is_none());
    }
}

#[test]
fn test_native_transfer_nets_to_zero() {
    let tx = transaction(
        "sig1",
        &[WALLET, RECEIVER, SYSTEM],
        vec![system_transfer(WALLET, RECEIVER, 500_000_000)],
        true,
    );
    let ops = classify(&tx);

    assert_eq!(ops.len(), 2, "debit and credit");
    assert!(ops.iter().all(|op| op.op_type == OperationType::NativeTransfer));
    assert!(ops.iter().all(|op| op.status == OperationStatus::Success));
    assert_eq!(amount_sum(&ops), BigDecimal::from(0));

    let (debit, credit) = (&ops[0], &ops[1]);
    assert_eq!(debit.account.as_ref().unwrap().address, WALLET);
    assert_eq!(debit.amount.as_ref().unwrap().value, "-500000000");
    assert_eq!(debit.amount.as_ref().unwrap().currency, native_currency());
    assert_eq!(debit.metadata.source.as_deref(), Some(WALLET));
    assert_eq!(debit.metadata.lamports, Some(500_000_000));
    assert_eq!(credit.metadata.destination.as_deref(), Some(RECEIVER));
    assert_eq!(credit.amount.as_ref().unwrap().value, "500000000");
    assert_eq!(debit.related_operations, vec![credit.operation_identifier]);
    assert_eq!(credit.related_operations, vec![debit.operation_identifier]);
}

#[test]
fn test_failed_transaction_marks_every_operation_failed() {
    let tx = transaction(
        "sig1",
        &[WALLET, RECEIVER, SYSTEM],
        vec![system_transfer(WALLET, RECEIVER, 10), memo("x")],
        false,
    );
    let ops = classify(&tx);

    assert_eq!(ops.len(), 3);
    assert!(ops.iter().all(|op| op.status == OperationStatus::Failure));
    assert_eq!(amount_sum(&ops[..2]), BigDecimal::from(0));
}

#[test]
fn test_missing_meta_is_not_a_success() {
    let mut value = transaction_json("sig1", &[WALLET], vec![memo("x")], json!(null));
    value["meta"] = json!(null);
    let tx = serde_json::from_value(value).unwrap();
    let ops = classify(&tx);
    assert_eq!(ops[0].status, OperationStatus::Failure);
}

#[test]
fn test_spl_token_transfer() {
    let source = "TokenAccountA1111111111111111111111111111111";
    let destination = "TokenAccountB1111111111111111111111111111111";
    let value = transaction_json(
        "sig1",
        &[WALLET, source, destination, TOKEN],
        vec![token_transfer(source, destination, "100")],
        meta(
            true,
            vec![
                token_balance(1, MINT, "1000", 9),
                token_balance(2, MINT, "0", 9),
            ],
        ),
    );
    let tx = serde_json::from_value(value).unwrap();
    let ops = classify(&tx);

    assert_eq!(ops.len(), 2);
    let (debit, credit) = (&ops[0], &ops[1]);

    assert_eq!(debit.op_type, OperationType::TokenTransfer);
    assert_eq!(debit.status, OperationStatus::Success);
    assert_eq!(debit.metadata.source.as_deref(), Some(source));
    assert_eq!(debit.metadata.amount.as_deref(), Some("-100"));
    assert_eq!(debit.metadata.decimals, Some(9));
    assert_eq!(debit.metadata.mint.as_deref(), Some(MINT));

    assert_eq!(credit.op_type, OperationType::TokenTransfer);
    assert_eq!(credit.status, OperationStatus::Success);
    assert_eq!(credit.metadata.destination.as_deref(), Some(destination));
    assert_eq!(credit.metadata.amount.as_deref(), Some("100"));

    let token_amount = credit.metadata.token_amount.as_ref().unwrap();
    assert_eq!(token_amount.amount, "100");
    assert_eq!(token_amount.decimals, 9);
    assert_eq!(token_amount.ui_amount, Some(0.0000001));

    let currency = &credit.amount.as_ref().unwrap().currency;
    assert_eq!(currency.symbol, MINT);
    assert_eq!(currency.decimals, 9);
}

#[test]
fn test_transfer_checked_needs_no_token_balances() {
    let ix = parsed_ix(
        "spl-token",
        TOKEN,
        json!({
            "type": "transferChecked",
            "info": {
                "source": "A",
                "mint": MINT,
                "destination": "B",
                "authority": WALLET,
                "tokenAmount": { "amount": "2500", "decimals": 3, "uiAmount": 2.5, "uiAmountString": "2.5" }
            }
        }),
    );
    let tx = transaction("sig1", &[WALLET, TOKEN], vec![ix], true);
    let ops = classify(&tx);

    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].metadata.decimals, Some(3));
    assert_eq!(ops[1].metadata.token_amount.as_ref().unwrap().ui_amount, Some(2.5));
    assert!(accounts_missing_token_state(&tx).is_empty());
}

#[test]
fn test_unresolvable_decimals_fall_back_to_unknown_then_resolve_from_state() {
    let tx = transaction("sig1", &[WALLET, TOKEN], vec![token_transfer("A", "B", "7")], true);

    let ops = classify(&tx);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].op_type, OperationType::Unknown);
    assert_eq!(
        accounts_missing_token_state(&tx).into_iter().collect::<Vec<_>>(),
        vec!["A".to_string()]
    );

    let mut states = HashMap::new();
    states.insert(
        "A".to_string(),
        TokenParsed {
            mint: Some(MINT.into()),
            amount: Some(7),
            ..Default::default()
        },
    );
    states.insert(
        MINT.to_string(),
        TokenParsed {
            decimals: Some(6),
            ..Default::default()
        },
    );
    let taxonomy = Taxonomy::solana();
    let classifier = Classifier::new(&taxonomy, &states);
    let ops = parse_solana_transaction(&tx, &classifier);

    assert_eq!(ops.len(), 2);
    assert_eq!(ops[0].op_type, OperationType::TokenTransfer);
    assert_eq!(ops[0].metadata.mint.as_deref(), Some(MINT));
    assert_eq!(ops[0].metadata.decimals, Some(6));
}

#[test]
fn test_set_authority_has_no_amount() {
    let ix = parsed_ix(
        "spl-token",
        TOKEN,
        json!({
            "type": "setAuthority",
            "info": {
                "mint": MINT,
                "authority": WALLET,
                "authorityType": "mintTokens",
                "newAuthority": null
            }
        }),
    );
    let tx = transaction("sig1", &[WALLET, TOKEN], vec![ix], true);
    let ops = classify(&tx);

    assert_eq!(ops.len(), 1);
    let op = &ops[0];
    assert_eq!(op.op_type, OperationType::TokenTransfer);
    assert!(op.amount.is_none());
    assert!(op.metadata.amount.is_none());
    assert_eq!(op.metadata.authority.as_deref(), Some(WALLET));
    assert_eq!(op.metadata.new_authority, None);
    assert_eq!(op.metadata.authority_type.as_deref(), Some("mintTokens"));
    assert_eq!(op.account.as_ref().unwrap().address, MINT);
}

#[test]
fn test_malformed_instruction_does_not_stop_the_rest() {
    let broken = parsed_ix(
        "system",
        SYSTEM,
        json!({ "type": "transfer", "info": { "source": WALLET } }),
    );
    let tx = transaction(
        "sig1",
        &[WALLET, RECEIVER, SYSTEM],
        vec![broken, system_transfer(WALLET, RECEIVER, 1), memo("after")],
        true,
    );
    let ops = classify(&tx);

    let types: Vec<OperationType> = ops.iter().map(|op| op.op_type).collect();
    assert_eq!(
        types,
        vec![
            OperationType::Unknown,
            OperationType::NativeTransfer,
            OperationType::NativeTransfer,
            OperationType::Unknown,
        ]
    );
    let indices: Vec<u64> = ops.iter().map(|op| op.operation_identifier.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(ops[0].metadata.program_id.as_deref(), Some(SYSTEM));
}

#[test]
fn test_partially_decoded_instruction_of_unknown_program() {
    let ix = json!({
        "programId": "ComputeBudget111111111111111111111111111111",
        "accounts": [],
        "data": "3DdGGhkhJbjm",
        "stackHeight": null
    });
    let tx = transaction("sig1", &[WALLET], vec![ix], true);
    let ops = classify(&tx);

    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].op_type, OperationType::Unknown);
    assert_eq!(
        ops[0].metadata.program_id.as_deref(),
        Some("ComputeBudget111111111111111111111111111111")
    );
}

#[test]
fn test_narrowed_taxonomy_downgrades_token_transfers() {
    let taxonomy = Taxonomy::new(
        vec![OperationType::NativeTransfer, OperationType::Unknown],
        OperationStatus::ALL.to_vec(),
        vec![],
    );
    let classifier = Classifier::new(&taxonomy, &NoAccountState);
    let value = transaction_json(
        "sig1",
        &[WALLET, "A", "B", TOKEN],
        vec![token_transfer("A", "B", "1")],
        meta(true, vec![token_balance(1, MINT, "1", 0)]),
    );
    let tx = serde_json::from_value(value).unwrap();
    let ops = parse_solana_transaction(&tx, &classifier);

    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].op_type, OperationType::Unknown);
}

#[test]
fn test_metadata_omits_empty_fields() {
    let tx = transaction("sig1", &[WALLET], vec![memo("x")], true);
    let ops = classify(&tx);
    let json = serde_json::to_value(&ops[0]).unwrap();

    assert_eq!(json["type"], "Unknown");
    assert_eq!(json["status"], "SUCCESS");
    assert_eq!(json["metadata"], json!({ "programId": MEMO }));
    assert!(json.get("amount").is_none());
    assert!(json.get("relatedOperations").is_none());
}

fn token_ix(kind: &str, info: serde_json::Value) -> serde_json::Value {
    parsed_ix("spl-token", TOKEN, json!({ "type": kind, "info": info }))
}

#[test]
fn test_mint_to_credits_the_receiving_account() {
    let plain = token_ix(
        "mintTo",
        json!({ "mint": MINT, "account": "Dest", "mintAuthority": WALLET, "amount": "300" }),
    );
    let checked = token_ix(
        "mintToChecked",
        json!({
            "mint": MINT,
            "account": "Dest",
            "mintAuthority": WALLET,
            "tokenAmount": { "amount": "300", "decimals": 2, "uiAmount": 3.0, "uiAmountString": "3" }
        }),
    );
    let value = transaction_json(
        "sig1",
        &[WALLET, "Dest", TOKEN],
        vec![plain, checked],
        meta(true, vec![token_balance(1, MINT, "600", 2)]),
    );
    let tx = serde_json::from_value(value).unwrap();
    let ops = classify(&tx);

    assert_eq!(ops.len(), 2, "one credit per instruction");
    for (index, op) in ops.iter().enumerate() {
        assert_eq!(op.operation_identifier.index, index as u64);
        assert_eq!(op.op_type, OperationType::TokenTransfer);
        assert_eq!(op.account.as_ref().unwrap().address, "Dest");
        assert_eq!(op.amount.as_ref().unwrap().value, "300");
        assert_eq!(op.amount.as_ref().unwrap().currency.decimals, 2);
        assert_eq!(op.metadata.destination.as_deref(), Some("Dest"));
        assert_eq!(op.metadata.source, None);
        assert!(op.related_operations.is_empty());
    }
    assert!(accounts_missing_token_state(&tx).is_empty());
}

#[test]
fn test_burn_debits_the_burning_account() {
    let plain = token_ix(
        "burn",
        json!({ "account": "Src", "mint": MINT, "authority": WALLET, "amount": "40" }),
    );
    let checked = token_ix(
        "burnChecked",
        json!({
            "account": "Src",
            "mint": MINT,
            "authority": WALLET,
            "tokenAmount": { "amount": "40", "decimals": 5, "uiAmount": 0.0004, "uiAmountString": "0.0004" }
        }),
    );
    let tx = transaction("sig1", &[WALLET, TOKEN], vec![checked.clone()], true);
    let ops = classify(&tx);
    assert_eq!(ops.len(), 1);
    assert_eq!(ops[0].amount.as_ref().unwrap().value, "-40");
    assert_eq!(ops[0].metadata.source.as_deref(), Some("Src"));
    assert_eq!(ops[0].metadata.decimals, Some(5));

    // plain burn without token balances needs the mint's decimals fetched
    let tx = transaction("sig2", &[WALLET, TOKEN], vec![plain, checked], true);
    let ops = classify(&tx);
    assert_eq!(ops[0].op_type, OperationType::Unknown);
    assert_eq!(ops[1].op_type, OperationType::TokenTransfer);
    assert_eq!(
        accounts_missing_token_state(&tx).into_iter().collect::<Vec<_>>(),
        vec![MINT.to_string()]
    );
}

#[test]
fn test_freeze_and_thaw_are_amountless_authority_changes() {
    let freeze = token_ix(
        "freezeAccount",
        json!({ "account": "Frozen", "mint": MINT, "freezeAuthority": WALLET }),
    );
    let thaw = token_ix(
        "thawAccount",
        json!({ "account": "Frozen", "mint": MINT, "multisigFreezeAuthority": "Multisig", "signers": [WALLET] }),
    );
    let tx = transaction("sig1", &[WALLET, TOKEN], vec![freeze, thaw], true);
    let ops = classify(&tx);

    assert_eq!(ops.len(), 2);
    assert!(ops.iter().all(|op| op.op_type == OperationType::TokenTransfer));
    assert!(ops.iter().all(|op| op.amount.is_none()));
    assert!(ops
        .iter()
        .all(|op| op.account.as_ref().unwrap().address == "Frozen"));
    assert_eq!(ops[0].metadata.authority_type.as_deref(), Some("freeze"));
    assert_eq!(ops[0].metadata.authority.as_deref(), Some(WALLET));
    assert_eq!(ops[1].metadata.authority_type.as_deref(), Some("thaw"));
    assert_eq!(ops[1].metadata.authority.as_deref(), Some("Multisig"));
}

#[test]
fn test_inner_instructions_follow_their_parent() {
    let value = with_inner(
        transaction_json(
            "sig1",
            &[WALLET, RECEIVER, MEMO, SYSTEM],
            vec![memo("outer"), memo("second")],
            meta(true, vec![]),
        ),
        0,
        vec![system_transfer(WALLET, RECEIVER, 777)],
    );
    let tx = serde_json::from_value(value).unwrap();
    let ops = classify(&tx);

    let types: Vec<OperationType> = ops.iter().map(|op| op.op_type).collect();
    assert_eq!(
        types,
        vec![
            OperationType::Unknown,
            OperationType::NativeTransfer,
            OperationType::NativeTransfer,
            OperationType::Unknown,
        ]
    );
    let indices: Vec<u64> = ops.iter().map(|op| op.operation_identifier.index).collect();
    assert_eq!(indices, vec![0, 1, 2, 3]);
    assert_eq!(ops[2].account.as_ref().unwrap().address, RECEIVER);
    assert_eq!(ops[2].amount.as_ref().unwrap().value, "777");
    assert_eq!(amount_sum(&ops[1..3]), BigDecimal::from(0));
}

#[test]
fn test_compiled_inner_instruction_resolves_account_indices() {
    let compiled = json!({
        "programIdIndex": 3,
        "accounts": [0, 1],
        "data": bs58::encode(bincode::serialize(&SystemInstruction::Transfer { lamports: 9 }).unwrap())
            .into_string(),
        "stackHeight": 2
    });
    let value = with_inner(
        transaction_json(
            "sig1",
            &[WALLET, RECEIVER, MEMO, SYSTEM],
            vec![memo("outer")],
            meta(true, vec![]),
        ),
        0,
        vec![compiled],
    );
    let tx = serde_json::from_value(value).unwrap();
    let ops = classify(&tx);

    assert_eq!(ops.len(), 3);
    assert_eq!(ops[1].account.as_ref().unwrap().address, WALLET);
    assert_eq!(ops[1].amount.as_ref().unwrap().value, "-9");
    assert_eq!(ops[2].account.as_ref().unwrap().address, RECEIVER);
}
