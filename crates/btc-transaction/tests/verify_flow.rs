//! End-to-end sign-then-verify flows across the standard templates.
//!
//! These tests build real transactions, sign them with secp256k1 keys
//! from a memory key store, and run full script verification, asserting
//! on failure categories where a specific rule is being exercised.

use btc_primitives::hash::hash160;
use btc_script::interpreter::{InterpreterErrorCode, ScriptFlags};
use btc_script::opcodes::*;
use btc_script::solver::pay_to_multisig;
use btc_script::{Destination, KeyStore, MemoryKeyStore, Script};
use btc_transaction::sighash::{signature_hash, SIGHASH_ALL, SIGHASH_ANYONECANPAY, SIGHASH_SINGLE};
use btc_transaction::signer::{combine_signatures, sign_signature};
use btc_transaction::verify::verify_script;
use btc_transaction::{Transaction, TransactionInput, TransactionOutput};

fn priv_key(fill: u8) -> [u8; 32] {
    let mut k = [0u8; 32];
    k[31] = fill;
    k
}

/// A one-input spending transaction paying to an arbitrary output.
fn spending_tx() -> Transaction {
    let mut tx = Transaction::new();
    tx.add_input(TransactionInput::new([0x42; 32], 0));
    tx.add_output(TransactionOutput::new(
        9_000,
        Destination::PubKeyHash([0x33; 20]).locking_script(),
    ));
    tx
}

fn full_sig(store: &MemoryKeyStore, key_id: &[u8; 20], locking: &Script, tx: &Transaction, hash_type: u32) -> Vec<u8> {
    let digest = signature_hash(locking, tx, 0, hash_type);
    let mut sig = store.sign(key_id, &digest).expect("key held");
    sig.push(hash_type as u8);
    sig
}

// ---------------------------------------------------------------------------
// Pay-to-pubkey-hash
// ---------------------------------------------------------------------------

#[test]
fn p2pkh_sign_and_verify() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(1), true).unwrap();
    let locking = Destination::PubKeyHash(key_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    let result = verify_script(
        &tx.inputs[0].unlocking_script,
        &locking,
        &tx,
        0,
        ScriptFlags::P2SH | ScriptFlags::STRICT_ENC | ScriptFlags::DER_SIG,
        0,
    );
    assert!(result.is_ok(), "P2PKH spend should verify: {:?}", result.err());
}

#[test]
fn p2pkh_wrong_key_fails() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(1), true).unwrap();
    let locking = Destination::PubKeyHash(key_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    // Same signature against a different output.
    let other_locking = Destination::PubKeyHash([0x55; 20]).locking_script();
    let err = verify_script(
        &tx.inputs[0].unlocking_script,
        &other_locking,
        &tx,
        0,
        ScriptFlags::NONE,
        0,
    )
    .unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::EqualVerify);
}

#[test]
fn p2pkh_modified_output_fails() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(1), true).unwrap();
    let locking = Destination::PubKeyHash(key_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    // Tampering with the outputs invalidates a SIGHASH_ALL signature.
    tx.outputs[0].value = 1;
    let err =
        verify_script(&tx.inputs[0].unlocking_script, &locking, &tx, 0, ScriptFlags::NONE, 0)
            .unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::EvalFalse);
}

// ---------------------------------------------------------------------------
// Pay-to-pubkey
// ---------------------------------------------------------------------------

#[test]
fn p2pk_sign_and_verify() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(2), false).unwrap();
    let pub_key = store.get_pub_key(&key_id).unwrap();
    let locking = Destination::PubKey(pub_key).locking_script();

    let mut tx = spending_tx();
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    let result = verify_script(
        &tx.inputs[0].unlocking_script,
        &locking,
        &tx,
        0,
        ScriptFlags::STRICT_ENC,
        0,
    );
    assert!(result.is_ok(), "P2PK spend should verify: {:?}", result.err());
}

// ---------------------------------------------------------------------------
// Multisig
// ---------------------------------------------------------------------------

struct MultisigFixture {
    store: MemoryKeyStore,
    key_ids: Vec<[u8; 20]>,
    locking: Script,
}

fn multisig_2_of_3() -> MultisigFixture {
    let mut store = MemoryKeyStore::new();
    let mut key_ids = Vec::new();
    let mut pub_keys = Vec::new();
    for i in 1..=3u8 {
        let id = store.add_key(priv_key(i), true).unwrap();
        pub_keys.push(store.get_pub_key(&id).unwrap());
        key_ids.push(id);
    }
    let locking = pay_to_multisig(2, &pub_keys);
    MultisigFixture {
        store,
        key_ids,
        locking,
    }
}

#[test]
fn multisig_2_of_3_signed_in_order_verifies() {
    let f = multisig_2_of_3();
    let mut tx = spending_tx();
    sign_signature(&f.store, &f.locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    let result =
        verify_script(&tx.inputs[0].unlocking_script, &f.locking, &tx, 0, ScriptFlags::NONE, 0);
    assert!(result.is_ok(), "2-of-3 should verify: {:?}", result.err());
}

#[test]
fn multisig_subset_keys_1_and_3_verifies() {
    let f = multisig_2_of_3();
    let tx = spending_tx();

    // Signatures from keys 1 and 3, in key order, skipping key 2.
    let mut unlocking = Script::new();
    unlocking.append_push_data(&[]).unwrap();
    for idx in [0usize, 2] {
        let sig = full_sig(&f.store, &f.key_ids[idx], &f.locking, &tx, SIGHASH_ALL);
        unlocking.append_push_data(&sig).unwrap();
    }

    let result = verify_script(&unlocking, &f.locking, &tx, 0, ScriptFlags::NONE, 0);
    assert!(result.is_ok(), "keys 1+3 should satisfy 2-of-3: {:?}", result.err());
}

#[test]
fn multisig_out_of_order_signatures_fail() {
    let f = multisig_2_of_3();
    let tx = spending_tx();

    // Valid signatures from keys 2 and 1, pushed in the wrong order.
    let sig1 = full_sig(&f.store, &f.key_ids[0], &f.locking, &tx, SIGHASH_ALL);
    let sig2 = full_sig(&f.store, &f.key_ids[1], &f.locking, &tx, SIGHASH_ALL);
    let mut unlocking = Script::new();
    unlocking.append_push_data(&[]).unwrap();
    unlocking.append_push_data(&sig2).unwrap();
    unlocking.append_push_data(&sig1).unwrap();

    let err = verify_script(&unlocking, &f.locking, &tx, 0, ScriptFlags::NONE, 0).unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::EvalFalse);
}

#[test]
fn multisig_missing_dummy_underflows() {
    let f = multisig_2_of_3();
    let tx = spending_tx();

    let sig1 = full_sig(&f.store, &f.key_ids[0], &f.locking, &tx, SIGHASH_ALL);
    let sig2 = full_sig(&f.store, &f.key_ids[1], &f.locking, &tx, SIGHASH_ALL);
    let mut unlocking = Script::new();
    // No dummy element: the quirk pop must underflow.
    unlocking.append_push_data(&sig1).unwrap();
    unlocking.append_push_data(&sig2).unwrap();

    let err = verify_script(&unlocking, &f.locking, &tx, 0, ScriptFlags::NONE, 0).unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::InvalidStackOperation);
}

// ---------------------------------------------------------------------------
// Combiner
// ---------------------------------------------------------------------------

#[test]
fn combine_two_partial_multisig_signatures() {
    let f = multisig_2_of_3();
    let tx = spending_tx();

    // Two partial unlocking scripts, one signature each.
    let sig1 = full_sig(&f.store, &f.key_ids[0], &f.locking, &tx, SIGHASH_ALL);
    let sig3 = full_sig(&f.store, &f.key_ids[2], &f.locking, &tx, SIGHASH_ALL);
    let mut partial_a = Script::new();
    partial_a.append_push_data(&[]).unwrap();
    partial_a.append_push_data(&sig3).unwrap();
    let mut partial_b = Script::new();
    partial_b.append_push_data(&[]).unwrap();
    partial_b.append_push_data(&sig1).unwrap();

    let combined = combine_signatures(&f.locking, &tx, 0, &partial_a, &partial_b);
    let result = verify_script(&combined, &f.locking, &tx, 0, ScriptFlags::NONE, 0);
    assert!(result.is_ok(), "combined partials should verify: {:?}", result.err());
}

#[test]
fn combine_discards_invalid_candidate() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(1), true).unwrap();
    let locking = Destination::PubKeyHash(key_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();
    let good = tx.inputs[0].unlocking_script.clone();

    // A syntactically plausible but unverifiable candidate.
    let mut bad = Script::new();
    bad.append_push_data(&[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x01, 0x01]).unwrap();
    bad.append_push_data(&store.get_pub_key(&key_id).unwrap()).unwrap();

    let combined = combine_signatures(&locking, &tx, 0, &bad, &good);
    assert_eq!(combined, good);
    let combined = combine_signatures(&locking, &tx, 0, &good, &bad);
    assert_eq!(combined, good);
}

// ---------------------------------------------------------------------------
// Pay-to-script-hash
// ---------------------------------------------------------------------------

#[test]
fn p2sh_multisig_sign_and_verify() {
    let mut f = multisig_2_of_3();
    let redeem = f.locking.clone();
    let script_id = f.store.add_script(redeem);
    let locking = Destination::ScriptHash(script_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&f.store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    let result = verify_script(
        &tx.inputs[0].unlocking_script,
        &locking,
        &tx,
        0,
        ScriptFlags::P2SH,
        0,
    );
    assert!(result.is_ok(), "P2SH multisig should verify: {:?}", result.err());
}

#[test]
fn p2sh_non_push_only_unlocking_fails() {
    let mut f = multisig_2_of_3();
    let redeem = f.locking.clone();
    let script_id = f.store.add_script(redeem);
    let locking = Destination::ScriptHash(script_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&f.store, &locking, &mut tx, 0, SIGHASH_ALL).unwrap();

    // Append a harmless non-push opcode; all three stages would still
    // succeed, but the anti-malleability rule must reject it.
    let mut tampered = tx.inputs[0].unlocking_script.clone();
    tampered.append_opcodes(&[OP_NOP]).unwrap();
    tx.inputs[0].unlocking_script = tampered.clone();

    let err = verify_script(&tampered, &locking, &tx, 0, ScriptFlags::P2SH, 0).unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::NotPushOnly);

    // Without the P2SH flag the same script is a plain hash check and
    // the appended opcode is legal.
    let result = verify_script(&tampered, &locking, &tx, 0, ScriptFlags::NONE, 0);
    assert!(result.is_ok());
}

#[test]
fn p2sh_wrong_nested_script_fails() {
    let f = multisig_2_of_3();
    let locking = Destination::ScriptHash([0x77; 20]).locking_script();

    let tx = spending_tx();
    let mut unlocking = Script::new();
    unlocking.append_push_data(f.locking.to_bytes()).unwrap();

    let err = verify_script(&unlocking, &locking, &tx, 0, ScriptFlags::P2SH, 0).unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::EvalFalse);
}

// ---------------------------------------------------------------------------
// Hash types
// ---------------------------------------------------------------------------

#[test]
fn sighash_single_signature_tolerates_later_outputs() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(7), true).unwrap();
    let locking = Destination::PubKeyHash(key_id).locking_script();

    let mut tx = spending_tx();
    tx.add_output(TransactionOutput::new(1, Script::new()));
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_SINGLE).unwrap();

    // Outputs past the signed index are not committed to.
    tx.outputs[1].value = 500;
    let result =
        verify_script(&tx.inputs[0].unlocking_script, &locking, &tx, 0, ScriptFlags::NONE, 0);
    assert!(result.is_ok(), "SIGHASH_SINGLE should tolerate: {:?}", result.err());

    // The matching output is committed to.
    tx.outputs[0].value = 500;
    assert!(
        verify_script(&tx.inputs[0].unlocking_script, &locking, &tx, 0, ScriptFlags::NONE, 0)
            .is_err()
    );
}

#[test]
fn sighash_anyonecanpay_tolerates_added_inputs() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(8), true).unwrap();
    let locking = Destination::PubKeyHash(key_id).locking_script();

    let mut tx = spending_tx();
    sign_signature(&store, &locking, &mut tx, 0, SIGHASH_ALL | SIGHASH_ANYONECANPAY).unwrap();

    // A second input appears after signing.
    tx.add_input(TransactionInput::new([0x77; 32], 1));
    let result =
        verify_script(&tx.inputs[0].unlocking_script, &locking, &tx, 0, ScriptFlags::NONE, 0);
    assert!(result.is_ok(), "ANYONECANPAY should tolerate: {:?}", result.err());
}

// ---------------------------------------------------------------------------
// Locktime
// ---------------------------------------------------------------------------

fn cltv_locking(height: i64, key_hash: [u8; 20]) -> Script {
    let mut script = Script::new();
    script.append_num(height);
    script
        .append_opcodes(&[OP_CHECKLOCKTIMEVERIFY, OP_DROP])
        .unwrap();
    script.extend(&Destination::PubKeyHash(key_hash).locking_script());
    script
}

/// CLTV-guarded scripts are non-standard, so the unlocking script is
/// assembled by hand: `<sig> <pubkey>`.
fn cltv_unlocking(
    store: &MemoryKeyStore,
    key_id: &[u8; 20],
    locking: &Script,
    tx: &Transaction,
) -> Script {
    let sig = full_sig(store, key_id, locking, tx, SIGHASH_ALL);
    let mut unlocking = Script::new();
    unlocking.append_push_data(&sig).unwrap();
    unlocking
        .append_push_data(&store.get_pub_key(key_id).unwrap())
        .unwrap();
    unlocking
}

#[test]
fn cltv_enforced_under_flag() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(9), true).unwrap();
    let locking = cltv_locking(100, key_id);

    let mut tx = spending_tx();
    tx.lock_time = 150;
    tx.inputs[0].sequence = 0xfffffffe;
    let unlocking = cltv_unlocking(&store, &key_id, &locking, &tx);

    // Lock time reached: passes under the flag.
    assert!(verify_script(&unlocking, &locking, &tx, 0, ScriptFlags::LOCKTIME, 0).is_ok());

    // Lock time not yet reached: fails only when enforced.
    let mut early = spending_tx();
    early.lock_time = 50;
    early.inputs[0].sequence = 0xfffffffe;
    let unlocking = cltv_unlocking(&store, &key_id, &locking, &early);

    let err = verify_script(&unlocking, &locking, &early, 0, ScriptFlags::LOCKTIME, 0)
        .unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);

    assert!(verify_script(&unlocking, &locking, &early, 0, ScriptFlags::NONE, 0).is_ok());
}

#[test]
fn cltv_rejects_timestamp_for_height_locktime() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(10), true).unwrap();
    // Requirement is a timestamp; the transaction locks by height.
    let locking = cltv_locking(600_000_000, key_id);

    let mut tx = spending_tx();
    tx.lock_time = 100;
    tx.inputs[0].sequence = 0xfffffffe;
    let unlocking = cltv_unlocking(&store, &key_id, &locking, &tx);

    let err =
        verify_script(&unlocking, &locking, &tx, 0, ScriptFlags::LOCKTIME, 0).unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);
}

#[test]
fn cltv_rejects_finalized_input() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(11), true).unwrap();
    let locking = cltv_locking(100, key_id);

    let mut tx = spending_tx();
    tx.lock_time = 150;
    // Default sequence is final.
    let unlocking = cltv_unlocking(&store, &key_id, &locking, &tx);

    let err =
        verify_script(&unlocking, &locking, &tx, 0, ScriptFlags::LOCKTIME, 0).unwrap_err();
    assert_eq!(err.code, InterpreterErrorCode::UnsatisfiedLockTime);
}

// ---------------------------------------------------------------------------
// Ownership of hashed signature data
// ---------------------------------------------------------------------------

#[test]
fn signature_commits_to_locking_script() {
    let mut store = MemoryKeyStore::new();
    let key_id = store.add_key(priv_key(12), true).unwrap();
    let pub_key = store.get_pub_key(&key_id).unwrap();
    let locking = Destination::PubKey(pub_key.clone()).locking_script();

    let tx = spending_tx();
    let digest_a = signature_hash(&locking, &tx, 0, SIGHASH_ALL);
    let other = Destination::PubKeyHash(hash160(&pub_key)).locking_script();
    let digest_b = signature_hash(&other, &tx, 0, SIGHASH_ALL);
    assert_ne!(digest_a, digest_b);
}
