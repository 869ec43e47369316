//! Crypto operations for the script interpreter.
//!
//! Digest opcodes delegate to the primitives crate; signature checks go
//! through the injected `TxContext`, which owns signature-hash
//! computation and the actual ECDSA math. This module enforces the
//! canonical-encoding rules the verification flags demand before any
//! signature is handed to the context.

use num_bigint::BigInt;

use btc_primitives::hash;

use super::config::{MAX_OPS_PER_SCRIPT, MAX_PUB_KEYS_PER_MULTISIG};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::*;
use super::thread::Thread;
use crate::opcodes::OP_CODESEPARATOR;
use crate::Script;

/// Which digest a crypto opcode applies.
pub(crate) enum DigestKind {
    Ripemd160,
    Sha1,
    Sha256,
    Hash160,
    Hash256,
}

impl<'a> Thread<'a> {
    pub(crate) fn op_hash(&mut self, kind: DigestKind) -> Result<(), InterpreterError> {
        let buf = self.dstack.pop_byte_array()?;
        let result = match kind {
            DigestKind::Ripemd160 => hash::ripemd160(&buf).to_vec(),
            DigestKind::Sha1 => hash::sha1(&buf).to_vec(),
            DigestKind::Sha256 => hash::sha256(&buf).to_vec(),
            DigestKind::Hash160 => hash::hash160(&buf).to_vec(),
            DigestKind::Hash256 => hash::sha256d(&buf).to_vec(),
        };
        self.dstack.push_byte_array(result);
        Ok(())
    }

    /// The portion of the current script from the most recent
    /// OP_CODESEPARATOR onward; the script code signatures commit to.
    pub(crate) fn sub_script(&self) -> ParsedScript {
        let skip = if self.last_code_sep > 0 {
            self.last_code_sep + 1
        } else {
            0
        };
        self.scripts[self.script_idx][skip..].to_vec()
    }

    pub(crate) fn op_checksig(&mut self) -> Result<(), InterpreterError> {
        let pk_bytes = self.dstack.pop_byte_array()?;
        let full_sig_bytes = self.dstack.pop_byte_array()?;

        if full_sig_bytes.is_empty() {
            self.dstack.push_bool(false);
            return Ok(());
        }

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no transaction context for checksig".to_string(),
            )
        })?;

        let hash_type = *full_sig_bytes.last().unwrap() as u32;
        let sig_bytes = &full_sig_bytes[..full_sig_bytes.len() - 1];

        self.check_hash_type_encoding(hash_type)?;
        self.check_signature_encoding(sig_bytes)?;
        self.check_pub_key_encoding(&pk_bytes)?;

        // The signature cannot commit to itself; strip its own push from
        // the script code before hashing.
        let mut sub_script = self.sub_script();
        sub_script = remove_opcode_by_data(&sub_script, &full_sig_bytes);
        let script_code = unparse(&sub_script);

        let valid = ctx
            .verify_signature(&full_sig_bytes, &pk_bytes, &script_code, self.input_idx, hash_type)
            .unwrap_or(false);
        self.dstack.push_bool(valid);
        Ok(())
    }

    pub(crate) fn op_checksigverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_checksig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckSigVerify)
    }

    pub(crate) fn op_checkmultisig(&mut self) -> Result<(), InterpreterError> {
        let num_keys = self.dstack.pop_int()?;
        let num_pub_keys = num_keys.to_i32();

        if num_pub_keys < 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!("number of pubkeys {} is negative", num_pub_keys),
            ));
        }
        if num_pub_keys as usize > MAX_PUB_KEYS_PER_MULTISIG {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidPubKeyCount,
                format!(
                    "too many pubkeys: {} > {}",
                    num_pub_keys, MAX_PUB_KEYS_PER_MULTISIG
                ),
            ));
        }

        // Key checks count against the operation budget.
        self.num_ops += num_pub_keys as usize;
        if self.num_ops > MAX_OPS_PER_SCRIPT {
            return Err(InterpreterError::new(
                InterpreterErrorCode::TooManyOperations,
                format!("exceeded max operation limit of {}", MAX_OPS_PER_SCRIPT),
            ));
        }

        let mut pub_keys = Vec::new();
        for _ in 0..num_pub_keys {
            pub_keys.push(self.dstack.pop_byte_array()?);
        }

        let num_sigs = self.dstack.pop_int()?;
        let num_signatures = num_sigs.to_i32();

        if num_signatures < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!("number of required signatures {} is less than one", num_signatures),
            ));
        }
        if num_signatures > num_pub_keys {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSignatureCount,
                format!(
                    "more signatures than pubkeys: {} > {}",
                    num_signatures, num_pub_keys
                ),
            ));
        }

        let mut signatures: Vec<Vec<u8>> = Vec::new();
        for _ in 0..num_signatures {
            signatures.push(self.dstack.pop_byte_array()?);
        }

        // One extra element is popped and ignored: a quirk of the original
        // implementation, preserved because signatures commit to scripts
        // that account for it.
        self.dstack.pop_byte_array()?;

        // Strip each candidate signature's push from the script code.
        let mut sub = self.sub_script();
        for sig in &signatures {
            sub = remove_opcode_by_data(&sub, sig);
        }
        let script_code = unparse(&sub);

        let ctx = match self.tx_context {
            Some(c) => c,
            None => {
                self.dstack.push_bool(false);
                return Ok(());
            }
        };

        // Signatures must appear in the same order as the keys they
        // match. Walk both lists forward; each key is consumed whether or
        // not it matched, so out-of-order signature sets run out of keys.
        let mut success = true;
        let mut remaining_keys = num_pub_keys + 1;
        let mut pub_key_idx: i32 = -1;
        let mut sig_idx: usize = 0;
        let mut remaining_sigs = num_signatures;

        while remaining_sigs > 0 {
            pub_key_idx += 1;
            remaining_keys -= 1;

            if remaining_sigs > remaining_keys {
                success = false;
                break;
            }

            let sig = &signatures[sig_idx];
            let pub_key = &pub_keys[pub_key_idx as usize];

            if sig.is_empty() {
                continue;
            }

            let hash_type = *sig.last().unwrap() as u32;
            let sig_only = &sig[..sig.len() - 1];

            self.check_hash_type_encoding(hash_type)?;
            self.check_signature_encoding(sig_only)?;
            self.check_pub_key_encoding(pub_key)?;

            if let Ok(true) =
                ctx.verify_signature(sig, pub_key, &script_code, self.input_idx, hash_type)
            {
                sig_idx += 1;
                remaining_sigs -= 1;
            }
        }

        self.dstack.push_bool(success);
        Ok(())
    }

    pub(crate) fn op_checkmultisigverify(
        &mut self,
        pop: &ParsedOpcode,
    ) -> Result<(), InterpreterError> {
        self.op_checkmultisig()?;
        self.abstract_verify(pop, InterpreterErrorCode::CheckMultiSigVerify)
    }

    /// Validate the hash type byte under STRICT_ENC.
    pub(crate) fn check_hash_type_encoding(&self, hash_type: u32) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::STRICT_ENC) {
            return Ok(());
        }

        let sighash_anyonecanpay: u32 = 0x80;
        let base = hash_type & !sighash_anyonecanpay;
        if !(1..=3).contains(&base) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidSigHashType,
                format!("invalid hash type 0x{:x}", hash_type),
            ));
        }
        Ok(())
    }

    /// Validate the public key encoding under STRICT_ENC.
    pub(crate) fn check_pub_key_encoding(&self, pub_key: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_flag(ScriptFlags::STRICT_ENC) {
            return Ok(());
        }
        if pub_key.len() == 33 && (pub_key[0] == 0x02 || pub_key[0] == 0x03) {
            return Ok(());
        }
        if pub_key.len() == 65 && pub_key[0] == 0x04 {
            return Ok(());
        }
        Err(InterpreterError::new(
            InterpreterErrorCode::PubKeyType,
            "unsupported public key type".to_string(),
        ))
    }

    /// Validate the signature encoding under STRICT_ENC/DER_SIG.
    ///
    /// Strict DER structure is required by either flag; the low-S rule is
    /// DER_SIG only. The empty signature is canonical by definition (it
    /// is how a failed CHECKSIG pushes false).
    pub(crate) fn check_signature_encoding(&self, sig: &[u8]) -> Result<(), InterpreterError> {
        if !self.has_any(&[ScriptFlags::STRICT_ENC, ScriptFlags::DER_SIG]) {
            return Ok(());
        }

        if sig.is_empty() {
            return Ok(());
        }

        let sig_len = sig.len();
        if sig_len < 8 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooShort,
                format!("malformed signature: too short: {} < 8", sig_len),
            ));
        }
        if sig_len > 72 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooLong,
                format!("malformed signature: too long: {} > 72", sig_len),
            ));
        }
        if sig[0] != 0x30 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidSeqID,
                format!("malformed signature: format has wrong type: {:#x}", sig[0]),
            ));
        }
        if sig[1] as usize != sig_len - 2 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidDataLen,
                format!("malformed signature: bad length: {} != {}", sig[1], sig_len - 2),
            ));
        }

        let r_len = sig[3] as usize;
        let s_type_offset = 4 + r_len;
        let s_len_offset = s_type_offset + 1;

        if s_type_offset >= sig_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigMissingSTypeID,
                "malformed signature: S type indicator missing".to_string(),
            ));
        }
        if s_len_offset >= sig_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigMissingSLen,
                "malformed signature: S length missing".to_string(),
            ));
        }

        let s_offset = s_len_offset + 1;
        let s_len = sig[s_len_offset] as usize;
        if s_offset + s_len != sig_len {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidSLen,
                "malformed signature: invalid S length".to_string(),
            ));
        }

        if sig[2] != 0x02 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidRIntID,
                format!("malformed signature: R integer marker: {:#x} != 0x02", sig[2]),
            ));
        }
        if r_len == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigZeroRLen,
                "malformed signature: R length is zero".to_string(),
            ));
        }
        if sig[4] & 0x80 != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNegativeR,
                "malformed signature: R is negative".to_string(),
            ));
        }
        if r_len > 1 && sig[4] == 0x00 && sig[5] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooMuchRPadding,
                "malformed signature: R value has too much padding".to_string(),
            ));
        }

        if sig[s_type_offset] != 0x02 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigInvalidSIntID,
                format!(
                    "malformed signature: S integer marker: {:#x} != 0x02",
                    sig[s_type_offset]
                ),
            ));
        }
        if s_len == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigZeroSLen,
                "malformed signature: S length is zero".to_string(),
            ));
        }
        if sig[s_offset] & 0x80 != 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigNegativeS,
                "malformed signature: S is negative".to_string(),
            ));
        }
        if s_len > 1 && sig[s_offset] == 0x00 && sig[s_offset + 1] & 0x80 == 0 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::SigTooMuchSPadding,
                "malformed signature: S value has too much padding".to_string(),
            ));
        }

        if self.has_flag(ScriptFlags::DER_SIG) {
            // Half order of secp256k1.
            let half_order = BigInt::parse_bytes(
                b"7FFFFFFFFFFFFFFFFFFFFFFFFFFFFFFF5D576E7357A4501DDFE92F46681B20A0",
                16,
            )
            .unwrap();
            let s_value =
                BigInt::from_bytes_be(num_bigint::Sign::Plus, &sig[s_offset..s_offset + s_len]);
            if s_value > half_order {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::SigHighS,
                    "signature is not canonical due to unnecessarily high S value".to_string(),
                ));
            }
        }

        Ok(())
    }
}

/// Reconstruct a `Script` from the script-code portion used for signing.
///
/// Exposed for the transaction crate, which removes OP_CODESEPARATOR
/// occurrences before hashing.
pub fn strip_code_separators(script: &Script) -> Result<Script, InterpreterError> {
    let parsed = parse_script(script, false)?;
    Ok(unparse(&remove_opcode(&parsed, OP_CODESEPARATOR)))
}
