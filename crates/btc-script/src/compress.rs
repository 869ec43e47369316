//! Compact script serialization.
//!
//! Detects the common locking-script shapes and encodes them much more
//! efficiently than the raw bytes. Six special cases are defined:
//!
//! * pay-to-pubkey-hash: tag 0, 21 bytes total
//! * pay-to-script-hash: tag 1, 21 bytes total
//! * pay-to-pubkey, compressed key: tags 2/3 (the SEC1 prefix), 33 bytes
//! * pay-to-pubkey, uncompressed key: tags 4/5 (0x04 plus the Y parity),
//!   33 bytes; decompression recovers the full point
//!
//! Any other script is stored verbatim behind a length-of-script-plus-6
//! VarInt, so a leading VarInt below 6 always selects a special case.
//! This is a stable on-disk/wire format; both directions reconstruct
//! byte-identical scripts.
//!
//! The shape tests here are stricter than the classifier's: they demand
//! exact byte sequences and, for pay-to-pubkey, a key that is actually on
//! the curve, since an invalid point cannot be represented in compressed
//! form.

use btc_primitives::ecdsa;
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::opcodes::{OP_CHECKSIG, OP_DATA_33, OP_DATA_65};
use crate::{Script, ScriptError};

/// Number of defined special-case encodings.
pub const SPECIAL_SCRIPTS: u64 = 6;

/// Extract the public key from a byte-exact pay-to-pubkey script.
fn to_pub_key(script: &Script) -> Option<&[u8]> {
    let b = script.to_bytes();
    if b.len() == 35 && b[0] == OP_DATA_33 && b[34] == OP_CHECKSIG {
        return Some(&b[1..34]);
    }
    if b.len() == 67 && b[0] == OP_DATA_65 && b[66] == OP_CHECKSIG {
        return Some(&b[1..66]);
    }
    None
}

/// Compress a script if it matches one of the special cases.
///
/// # Arguments
/// * `script` - The script to compress.
///
/// # Returns
/// The tagged compact bytes (21 or 33 including the tag), or `None` if
/// no special case applies.
pub fn compress(script: &Script) -> Option<Vec<u8>> {
    let b = script.to_bytes();

    if script.is_p2pkh() {
        let mut out = Vec::with_capacity(21);
        out.push(0x00);
        out.extend_from_slice(&b[3..23]);
        return Some(out);
    }

    if script.is_p2sh() {
        let mut out = Vec::with_capacity(21);
        out.push(0x01);
        out.extend_from_slice(&b[2..22]);
        return Some(out);
    }

    if let Some(key) = to_pub_key(script) {
        if ecdsa::is_valid_public_key(key) {
            let mut out = Vec::with_capacity(33);
            match key[0] {
                0x02 | 0x03 => {
                    out.push(key[0]);
                    out.extend_from_slice(&key[1..33]);
                    return Some(out);
                }
                0x04 => {
                    // Fold the Y coordinate into the tag's parity bit.
                    out.push(0x04 | (key[64] & 0x01));
                    out.extend_from_slice(&key[1..33]);
                    return Some(out);
                }
                _ => {}
            }
        }
    }

    None
}

/// Payload size (excluding the tag) for a special-case encoding.
///
/// # Arguments
/// * `tag` - The special-case tag (0..6).
///
/// # Returns
/// 20 bytes for the hash cases, 32 for the key cases.
pub fn special_size(tag: u64) -> usize {
    match tag {
        0 | 1 => 20,
        2..=5 => 32,
        _ => 0,
    }
}

/// Reconstruct a script from a special-case tag and payload.
///
/// # Arguments
/// * `tag` - The special-case tag (0..6).
/// * `payload` - The tag's payload, of length `special_size(tag)`.
///
/// # Returns
/// The byte-identical original script, or `InvalidCompression` if the
/// payload cannot be reconstructed (e.g. an X coordinate off the curve).
pub fn decompress(tag: u64, payload: &[u8]) -> Result<Script, ScriptError> {
    if payload.len() != special_size(tag) {
        return Err(ScriptError::InvalidCompression);
    }
    match tag {
        0 => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(payload);
            Ok(crate::Destination::PubKeyHash(hash).locking_script())
        }
        1 => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(payload);
            Ok(crate::Destination::ScriptHash(hash).locking_script())
        }
        2 | 3 => {
            let mut bytes = Vec::with_capacity(35);
            bytes.push(OP_DATA_33);
            bytes.push(tag as u8);
            bytes.extend_from_slice(payload);
            bytes.push(OP_CHECKSIG);
            Ok(Script::from_bytes(&bytes))
        }
        4 | 5 => {
            let mut compressed = Vec::with_capacity(33);
            compressed.push((tag as u8) - 2);
            compressed.extend_from_slice(payload);
            let full = ecdsa::decompress_public_key(&compressed)
                .map_err(|_| ScriptError::InvalidCompression)?;
            let mut bytes = Vec::with_capacity(67);
            bytes.push(OP_DATA_65);
            bytes.extend_from_slice(&full);
            bytes.push(OP_CHECKSIG);
            Ok(Script::from_bytes(&bytes))
        }
        _ => Err(ScriptError::InvalidCompression),
    }
}

/// Serialize a script in compact form.
///
/// Special cases write their tag byte (a VarInt below 6) followed by the
/// payload; everything else writes a VarInt of `len + 6` followed by the
/// raw script.
///
/// # Arguments
/// * `script` - The script to serialize.
/// * `writer` - Destination writer.
pub fn write_compressed(script: &Script, writer: &mut ByteWriter) {
    if let Some(compact) = compress(script) {
        writer.write_bytes(&compact);
        return;
    }
    writer.write_varint(VarInt::from(script.len() as u64 + SPECIAL_SCRIPTS));
    writer.write_bytes(script.to_bytes());
}

/// Deserialize a script written by [`write_compressed`].
///
/// # Arguments
/// * `reader` - Source reader positioned at the leading VarInt.
///
/// # Returns
/// The reconstructed script, or an error on truncation or an invalid
/// special-case payload.
pub fn read_compressed(reader: &mut ByteReader) -> Result<Script, ScriptError> {
    let selector = reader.read_varint()?.value();
    if selector < SPECIAL_SCRIPTS {
        let payload = reader.read_bytes(special_size(selector))?;
        return decompress(selector, payload);
    }
    let size = (selector - SPECIAL_SCRIPTS) as usize;
    let bytes = reader.read_bytes(size)?;
    Ok(Script::from_bytes(bytes))
}
