//! ECDSA signing and verification over secp256k1.
//!
//! Thin wrappers around `k256` operating on raw 32-byte digests and
//! DER-encoded signatures, which is the form the script engine exchanges
//! with transactions. Signing is RFC6979 deterministic and low-S
//! normalized; verification accepts either S form by normalizing first.

use k256::ecdsa::signature::hazmat::{PrehashSigner, PrehashVerifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint;

use crate::PrimitivesError;

/// Sign a 32-byte digest with the given private key.
///
/// Produces a DER-encoded signature with a deterministic (RFC6979) nonce
/// and a low-S value.
///
/// # Arguments
/// * `private_key` - A 32-byte big-endian secp256k1 scalar.
/// * `digest` - The 32-byte message digest to sign.
///
/// # Returns
/// The DER-encoded signature bytes, or an error for an invalid key.
pub fn sign_der(private_key: &[u8; 32], digest: &[u8; 32]) -> Result<Vec<u8>, PrimitivesError> {
    let key = SigningKey::from_slice(private_key)
        .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
    let sig: Signature = key
        .sign_prehash(digest)
        .map_err(|e| PrimitivesError::InvalidSignature(e.to_string()))?;
    let sig = sig.normalize_s().unwrap_or(sig);
    Ok(sig.to_der().as_bytes().to_vec())
}

/// Verify a DER-encoded signature over a 32-byte digest.
///
/// High-S signatures are normalized before verification, so either S form
/// of a valid signature is accepted (canonical-form enforcement is the
/// script interpreter's job, not the math layer's).
///
/// # Arguments
/// * `public_key` - SEC1-encoded public key bytes (33 or 65 bytes).
/// * `digest` - The 32-byte message digest.
/// * `der_sig` - The DER-encoded signature.
///
/// # Returns
/// `true` if the signature is valid for the key and digest.
pub fn verify_der(public_key: &[u8], digest: &[u8; 32], der_sig: &[u8]) -> bool {
    let key = match VerifyingKey::from_sec1_bytes(public_key) {
        Ok(k) => k,
        Err(_) => return false,
    };
    let sig = match Signature::from_der(der_sig) {
        Ok(s) => s,
        Err(_) => return false,
    };
    let sig = sig.normalize_s().unwrap_or(sig);
    key.verify_prehash(digest, &sig).is_ok()
}

/// Derive the SEC1-encoded public key for a private key.
///
/// # Arguments
/// * `private_key` - A 32-byte big-endian secp256k1 scalar.
/// * `compressed` - Whether to return the 33-byte compressed form.
///
/// # Returns
/// The public key bytes (33 or 65 bytes), or an error for an invalid key.
pub fn public_key(private_key: &[u8; 32], compressed: bool) -> Result<Vec<u8>, PrimitivesError> {
    let key = SigningKey::from_slice(private_key)
        .map_err(|e| PrimitivesError::InvalidPrivateKey(e.to_string()))?;
    Ok(key
        .verifying_key()
        .to_encoded_point(compressed)
        .as_bytes()
        .to_vec())
}

/// Check whether bytes parse as a valid secp256k1 public key point.
///
/// # Arguments
/// * `bytes` - Candidate SEC1 public key bytes.
///
/// # Returns
/// `true` if the bytes encode a point on the curve.
pub fn is_valid_public_key(bytes: &[u8]) -> bool {
    VerifyingKey::from_sec1_bytes(bytes).is_ok()
}

/// Decompress a 33-byte compressed public key to its 65-byte form.
///
/// # Arguments
/// * `compressed` - A 33-byte SEC1 compressed public key.
///
/// # Returns
/// The 65-byte uncompressed key, or an error if the bytes are not a
/// valid curve point.
pub fn decompress_public_key(compressed: &[u8]) -> Result<[u8; 65], PrimitivesError> {
    let key = VerifyingKey::from_sec1_bytes(compressed)
        .map_err(|e| PrimitivesError::InvalidPublicKey(e.to_string()))?;
    let point = key.to_encoded_point(false);
    let bytes = point.as_bytes();
    let mut out = [0u8; 65];
    out.copy_from_slice(bytes);
    Ok(out)
}
