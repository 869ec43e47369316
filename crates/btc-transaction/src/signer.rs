//! Unlocking-script production and combination.
//!
//! The signer solves the previous output's template and assembles the
//! matching unlocking script from keys held in a [`KeyStore`]. The
//! combiner merges two partial unlocking scripts for the same output by
//! re-solving the template and keeping, per slot, whichever candidate
//! actually verifies, never by concatenating blindly.

use std::collections::HashMap;

use btc_primitives::ecdsa;
use btc_primitives::hash::hash160;
use btc_script::interpreter::ScriptFlags;
use btc_script::solver::{solve, ScriptClass, TemplateMatch};
use btc_script::{KeyStore, Script};

use crate::sighash::signature_hash;
use crate::transaction::Transaction;
use crate::verify::verify_script;
use crate::TransactionError;

// -----------------------------------------------------------------------
// Signing
// -----------------------------------------------------------------------

/// Sign one input of a transaction, writing its unlocking script.
///
/// Solves the previous output's template and produces the satisfying
/// unlocking script: a bare signature for pay-to-pubkey, signature plus
/// public key for pay-to-pubkey-hash, an ordered signature set for
/// multisig, or the signed nested script plus its serialization for
/// pay-to-script-hash.
///
/// # Arguments
/// * `store` - Source of private keys and redeem scripts.
/// * `prev_locking` - The locking script of the output being spent.
/// * `tx` - The spending transaction (mutated in place).
/// * `input_idx` - The input to sign.
/// * `hash_type` - The hash type to sign with (e.g. `SIGHASH_ALL`).
///
/// # Returns
/// `Ok(())` with the input's unlocking script set, or a signing error.
pub fn sign_signature(
    store: &dyn KeyStore,
    prev_locking: &Script,
    tx: &mut Transaction,
    input_idx: usize,
    hash_type: u32,
) -> Result<(), TransactionError> {
    if input_idx >= tx.inputs.len() {
        return Err(TransactionError::InvalidTransaction(format!(
            "input index {} out of range (tx has {} inputs)",
            input_idx,
            tx.inputs.len()
        )));
    }
    let script_sig = produce_script_sig(store, prev_locking, tx, input_idx, hash_type, true)?;
    tx.inputs[input_idx].unlocking_script = script_sig;
    Ok(())
}

/// Build the unlocking script for a solved template.
fn produce_script_sig(
    store: &dyn KeyStore,
    locking: &Script,
    tx: &Transaction,
    input_idx: usize,
    hash_type: u32,
    allow_script_hash: bool,
) -> Result<Script, TransactionError> {
    let m = solve(locking);
    match m.class {
        ScriptClass::NonStandard => Err(TransactionError::SigningError(
            "cannot sign a non-standard locking script".to_string(),
        )),
        ScriptClass::PubKey => {
            let key_id = hash160(&m.solutions[0]);
            let sig = signature_for_key(store, &key_id, locking, tx, input_idx, hash_type)?;
            let mut script = Script::new();
            script.append_push_data(&sig)?;
            Ok(script)
        }
        ScriptClass::PubKeyHash => {
            let key_id = to_key_id(&m.solutions[0]);
            let pub_key = store.get_pub_key(&key_id).ok_or_else(|| {
                TransactionError::SigningError("public key not held for output".to_string())
            })?;
            let sig = signature_for_key(store, &key_id, locking, tx, input_idx, hash_type)?;
            let mut script = Script::new();
            script.append_push_data(&sig)?;
            script.append_push_data(&pub_key)?;
            Ok(script)
        }
        ScriptClass::Multisig => {
            sign_multisig(store, &m, locking, tx, input_idx, hash_type)
        }
        ScriptClass::ScriptHash => {
            if !allow_script_hash {
                return Err(TransactionError::SigningError(
                    "nested pay-to-script-hash is not signable".to_string(),
                ));
            }
            let script_id = to_key_id(&m.solutions[0]);
            let nested = store.get_script(&script_id).ok_or_else(|| {
                TransactionError::SigningError("redeem script not held for output".to_string())
            })?;
            // The signature hash commits to the nested script, not the
            // outer hash commitment.
            let mut script =
                produce_script_sig(store, &nested, tx, input_idx, hash_type, false)?;
            script.append_push_data(nested.to_bytes())?;
            Ok(script)
        }
    }
}

/// Sign a multisig template with as many held keys as it requires.
fn sign_multisig(
    store: &dyn KeyStore,
    m: &TemplateMatch,
    locking: &Script,
    tx: &Transaction,
    input_idx: usize,
    hash_type: u32,
) -> Result<Script, TransactionError> {
    let required = m.solutions[0][0] as usize;
    let keys = &m.solutions[1..m.solutions.len() - 1];

    let mut script = Script::new();
    // The extra element CHECKMULTISIG pops and ignores.
    script.append_push_data(&[])?;

    let mut signed = 0;
    for key in keys {
        if signed == required {
            break;
        }
        let key_id = hash160(key);
        if !store.have_key(&key_id) {
            continue;
        }
        let sig = signature_for_key(store, &key_id, locking, tx, input_idx, hash_type)?;
        script.append_push_data(&sig)?;
        signed += 1;
    }

    if signed < required {
        return Err(TransactionError::SigningError(format!(
            "have {} of {} required multisig keys",
            signed, required
        )));
    }
    Ok(script)
}

/// Produce `<DER signature || hash type byte>` for a held key.
fn signature_for_key(
    store: &dyn KeyStore,
    key_id: &[u8; 20],
    script_code: &Script,
    tx: &Transaction,
    input_idx: usize,
    hash_type: u32,
) -> Result<Vec<u8>, TransactionError> {
    let digest = signature_hash(script_code, tx, input_idx, hash_type);
    let mut sig = store.sign(key_id, &digest).ok_or_else(|| {
        TransactionError::SigningError("private key not held for output".to_string())
    })?;
    sig.push(hash_type as u8);
    Ok(sig)
}

fn to_key_id(bytes: &[u8]) -> [u8; 20] {
    let mut id = [0u8; 20];
    id.copy_from_slice(bytes);
    id
}

// -----------------------------------------------------------------------
// Combining
// -----------------------------------------------------------------------

/// Merge two partial unlocking scripts for the same locking script.
///
/// Re-solves the template and keeps, per signature slot, whichever
/// candidate actually verifies against this transaction. For multisig,
/// every signature from either side is matched to its public key by
/// verification and the result is rebuilt in key order.
///
/// # Arguments
/// * `locking` - The locking script both candidates target.
/// * `tx` - The spending transaction.
/// * `input_idx` - The input being unlocked.
/// * `sig_a` - First candidate unlocking script.
/// * `sig_b` - Second candidate unlocking script.
///
/// # Returns
/// The merged unlocking script.
pub fn combine_signatures(
    locking: &Script,
    tx: &Transaction,
    input_idx: usize,
    sig_a: &Script,
    sig_b: &Script,
) -> Script {
    let m = solve(locking);
    combine_for_template(&m, locking, tx, input_idx, sig_a, sig_b)
}

fn combine_for_template(
    m: &TemplateMatch,
    locking: &Script,
    tx: &Transaction,
    input_idx: usize,
    sig_a: &Script,
    sig_b: &Script,
) -> Script {
    match m.class {
        ScriptClass::NonStandard => {
            // Nothing is known about the shape; keep the candidate that
            // carries more data.
            if sig_a.len() >= sig_b.len() {
                sig_a.clone()
            } else {
                sig_b.clone()
            }
        }
        ScriptClass::PubKey | ScriptClass::PubKeyHash => {
            let verifies = |candidate: &Script| {
                !candidate.is_empty()
                    && verify_script(candidate, locking, tx, input_idx, ScriptFlags::NONE, 0)
                        .is_ok()
            };
            if verifies(sig_a) {
                sig_a.clone()
            } else if verifies(sig_b) {
                sig_b.clone()
            } else if sig_a.is_empty() {
                sig_b.clone()
            } else {
                sig_a.clone()
            }
        }
        ScriptClass::Multisig => combine_multisig(m, locking, tx, input_idx, sig_a, sig_b),
        ScriptClass::ScriptHash => {
            // The last push of either candidate reveals the nested
            // script; recombine the remainder against it.
            let a_pushes = push_values(sig_a).unwrap_or_default();
            let b_pushes = push_values(sig_b).unwrap_or_default();
            let nested_bytes = a_pushes
                .last()
                .or(b_pushes.last())
                .cloned()
                .unwrap_or_default();
            if nested_bytes.is_empty() {
                return if sig_a.len() >= sig_b.len() {
                    sig_a.clone()
                } else {
                    sig_b.clone()
                };
            }
            let nested = Script::from_bytes(&nested_bytes);
            let nested_m = solve(&nested);
            let a_inner = script_from_pushes(strip_last(&a_pushes));
            let b_inner = script_from_pushes(strip_last(&b_pushes));
            let mut combined =
                combine_for_template(&nested_m, &nested, tx, input_idx, &a_inner, &b_inner);
            // Re-append the nested script reveal.
            combined
                .append_push_data(&nested_bytes)
                .expect("nested script length already validated by decoding");
            combined
        }
    }
}

/// Merge multisig candidates: attribute every signature to its key by
/// verification, then emit the dummy element and the signatures in key
/// order up to the required count.
fn combine_multisig(
    m: &TemplateMatch,
    locking: &Script,
    tx: &Transaction,
    input_idx: usize,
    sig_a: &Script,
    sig_b: &Script,
) -> Script {
    let required = m.solutions[0][0] as usize;
    let keys = &m.solutions[1..m.solutions.len() - 1];

    let mut candidates: Vec<Vec<u8>> = Vec::new();
    for script in [sig_a, sig_b] {
        if let Some(pushes) = push_values(script) {
            candidates.extend(pushes.into_iter().filter(|p| !p.is_empty()));
        }
    }

    let mut sig_for_key: HashMap<usize, Vec<u8>> = HashMap::new();
    for sig in &candidates {
        let hash_type = *sig.last().unwrap() as u32;
        let der_sig = &sig[..sig.len() - 1];
        let digest = signature_hash(locking, tx, input_idx, hash_type);
        for (ki, key) in keys.iter().enumerate() {
            if sig_for_key.contains_key(&ki) {
                continue;
            }
            if ecdsa::verify_der(key, &digest, der_sig) {
                sig_for_key.insert(ki, sig.clone());
                break;
            }
        }
    }

    let mut script = Script::new();
    script.append_push_data(&[]).unwrap();
    let mut have = 0;
    for ki in 0..keys.len() {
        if have == required {
            break;
        }
        if let Some(sig) = sig_for_key.get(&ki) {
            // Signatures are bounded well below any push limit.
            script.append_push_data(sig).unwrap();
            have += 1;
        }
    }
    script
}

/// Decode a push-only script into its push payloads.
fn push_values(script: &Script) -> Option<Vec<Vec<u8>>> {
    let chunks = script.chunks().ok()?;
    let mut values = Vec::with_capacity(chunks.len());
    for chunk in chunks {
        if !chunk.is_push() {
            return None;
        }
        values.push(chunk.data.unwrap_or_default());
    }
    Some(values)
}

fn strip_last(pushes: &[Vec<u8>]) -> &[Vec<u8>] {
    if pushes.is_empty() {
        pushes
    } else {
        &pushes[..pushes.len() - 1]
    }
}

fn script_from_pushes(pushes: &[Vec<u8>]) -> Script {
    let mut script = Script::new();
    for push in pushes {
        // Payloads came out of a decoded script, so they re-encode.
        script.append_push_data(push).unwrap();
    }
    script
}
