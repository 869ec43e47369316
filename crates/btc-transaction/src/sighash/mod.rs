//! Legacy signature hash computation.
//!
//! Computes the digest that CHECKSIG-family opcodes verify: a double
//! SHA-256 over a modified copy of the spending transaction with the
//! hash type appended. Every detail here is consensus-critical,
//! including the out-of-range sentinel digest, which historic signatures
//! depend on and which must not be "fixed".

use btc_primitives::hash::sha256d;
use btc_script::interpreter::strip_code_separators;
use btc_script::Script;

use crate::transaction::Transaction;

// -----------------------------------------------------------------------
// Hash type flags
// -----------------------------------------------------------------------

/// Sign all inputs and all outputs (the default).
pub const SIGHASH_ALL: u32 = 0x01;

/// Sign all inputs but no outputs, allowing outputs to be modified.
pub const SIGHASH_NONE: u32 = 0x02;

/// Sign all inputs and only the output at the input's own index.
pub const SIGHASH_SINGLE: u32 = 0x03;

/// Combined with another flag: commit only to the signed input, allowing
/// other inputs to be added later.
pub const SIGHASH_ANYONECANPAY: u32 = 0x80;

/// Mask extracting the base hash type (ALL, NONE, SINGLE).
pub const SIGHASH_MASK: u32 = 0x1f;

/// The fixed digest returned for out-of-range indices.
///
/// The historical implementation returned the integer 1 as a 256-bit
/// hash for an input index past the inputs, and for SIGHASH_SINGLE with
/// no matching output. Signatures over this value verify like any other,
/// which is a known quirk preserved verbatim for compatibility.
pub fn one_hash() -> [u8; 32] {
    let mut h = [0u8; 32];
    h[0] = 1;
    h
}

// -----------------------------------------------------------------------
// Signature hash
// -----------------------------------------------------------------------

/// Compute the legacy signature hash for one input.
///
/// The digest commits to a serialization of the transaction in which:
///
/// * every input's unlocking script is blanked except the signed one,
///   which carries `script_code` (with OP_CODESEPARATOR stripped);
/// * under SIGHASH_NONE the outputs are dropped and the other inputs'
///   sequences zeroed;
/// * under SIGHASH_SINGLE the outputs are truncated to the signed
///   input's index, earlier outputs blanked, other sequences zeroed;
///   an index with no matching output yields the sentinel digest;
/// * under SIGHASH_ANYONECANPAY only the signed input is serialized;
///
/// followed by the 4-byte little-endian hash type.
///
/// # Arguments
/// * `script_code` - The locking-script portion the signature commits to.
/// * `tx` - The spending transaction.
/// * `input_index` - The input being signed/verified.
/// * `hash_type` - The hash type flags.
///
/// # Returns
/// The 32-byte digest, or the sentinel for out-of-range indices.
pub fn signature_hash(
    script_code: &Script,
    tx: &Transaction,
    input_index: usize,
    hash_type: u32,
) -> [u8; 32] {
    if input_index >= tx.inputs.len() {
        return one_hash();
    }

    // The signature must not commit to code separators. A script code
    // that fails to parse is hashed as-is; the decode loop of the
    // original stopped at the malformed tail the same way.
    let script_code = strip_code_separators(script_code)
        .unwrap_or_else(|_| script_code.clone());

    let mut txtmp = tx.clone();

    // Blank every input script; only the signed input carries the code.
    for input in &mut txtmp.inputs {
        input.unlocking_script = Script::new();
    }
    txtmp.inputs[input_index].unlocking_script = script_code;

    match hash_type & SIGHASH_MASK {
        SIGHASH_NONE => {
            // Sign no outputs; others can update their sequences.
            txtmp.outputs.clear();
            for (i, input) in txtmp.inputs.iter_mut().enumerate() {
                if i != input_index {
                    input.sequence = 0;
                }
            }
        }
        SIGHASH_SINGLE => {
            if input_index >= txtmp.outputs.len() {
                return one_hash();
            }
            // Sign only the output at the same index; earlier outputs
            // are blanked, later ones dropped.
            txtmp.outputs.truncate(input_index + 1);
            for output in &mut txtmp.outputs[..input_index] {
                output.set_null();
            }
            for (i, input) in txtmp.inputs.iter_mut().enumerate() {
                if i != input_index {
                    input.sequence = 0;
                }
            }
        }
        _ => {}
    }

    // Commit to this input only, letting others be attached later.
    if hash_type & SIGHASH_ANYONECANPAY != 0 {
        let signed = txtmp.inputs[input_index].clone();
        txtmp.inputs = vec![signed];
    }

    let mut preimage = txtmp.to_bytes();
    preimage.extend_from_slice(&hash_type.to_le_bytes());
    sha256d(&preimage)
}
