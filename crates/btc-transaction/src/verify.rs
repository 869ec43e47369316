//! Script verification against a spending transaction.
//!
//! Bridges the script interpreter's `TxContext` to the transaction
//! structure: signature checks compute the legacy signature hash over
//! this transaction and verify with secp256k1 ECDSA. Verification is a
//! pure function of its arguments; verifying many inputs in parallel
//! needs no coordination.

use btc_primitives::ecdsa;
use btc_script::interpreter::{
    Engine, InterpreterError, InterpreterErrorCode, ScriptFlags, TxContext,
};
use btc_script::Script;

use crate::sighash::signature_hash;
use crate::transaction::Transaction;
use crate::TransactionOutput;

/// Signature checker for one spending transaction.
///
/// `hash_type_filter` restricts which hash type signatures may use;
/// zero accepts any.
pub struct TxSignatureChecker<'a> {
    /// The spending transaction.
    pub tx: &'a Transaction,
    /// Required hash type, or 0 for no restriction.
    pub hash_type_filter: u32,
}

impl<'a> TxContext for TxSignatureChecker<'a> {
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        input_idx: usize,
        hash_type: u32,
    ) -> Result<bool, InterpreterError> {
        if full_sig.is_empty() {
            return Ok(false);
        }
        if self.hash_type_filter != 0 && hash_type != self.hash_type_filter {
            return Ok(false);
        }
        let digest = signature_hash(script_code, self.tx, input_idx, hash_type);
        let der_sig = &full_sig[..full_sig.len() - 1];
        Ok(ecdsa::verify_der(pub_key, &digest, der_sig))
    }

    fn lock_time(&self) -> u32 {
        self.tx.lock_time
    }

    fn input_sequence(&self, input_idx: usize) -> u32 {
        self.tx
            .inputs
            .get(input_idx)
            .map(|i| i.sequence)
            .unwrap_or(crate::input::FINAL_SEQUENCE)
    }
}

/// Verify an unlocking script against a locking script for one input.
///
/// Runs the unlocking script, carries the stack into the locking
/// script, and applies the pay-to-script-hash rules when the P2SH flag
/// is set.
///
/// # Arguments
/// * `unlocking_script` - The input-side script.
/// * `locking_script` - The previous output's script.
/// * `tx` - The spending transaction.
/// * `input_idx` - The input being verified.
/// * `flags` - Verification flags.
/// * `hash_type` - Required signature hash type, or 0 for any.
///
/// # Returns
/// `Ok(())` if the spend is authorized, or the failure category.
pub fn verify_script(
    unlocking_script: &Script,
    locking_script: &Script,
    tx: &Transaction,
    input_idx: usize,
    flags: ScriptFlags,
    hash_type: u32,
) -> Result<(), InterpreterError> {
    let checker = TxSignatureChecker {
        tx,
        hash_type_filter: hash_type,
    };
    Engine::new().execute(unlocking_script, locking_script, flags, Some(&checker), input_idx)
}

/// Verify one input of a transaction against the output it spends.
///
/// # Arguments
/// * `prev_output` - The output being spent.
/// * `tx` - The spending transaction.
/// * `input_idx` - The input to verify.
/// * `flags` - Verification flags.
/// * `hash_type` - Required signature hash type, or 0 for any.
///
/// # Returns
/// `Ok(())` if the spend is authorized, or the failure category.
pub fn verify_input(
    prev_output: &TransactionOutput,
    tx: &Transaction,
    input_idx: usize,
    flags: ScriptFlags,
    hash_type: u32,
) -> Result<(), InterpreterError> {
    let input = tx.inputs.get(input_idx).ok_or_else(|| {
        InterpreterError::new(
            InterpreterErrorCode::InvalidParams,
            format!("input index {} out of range", input_idx),
        )
    })?;
    verify_script(
        &input.unlocking_script,
        &prev_output.locking_script,
        tx,
        input_idx,
        flags,
        hash_type,
    )
}
