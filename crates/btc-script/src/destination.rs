//! Spending destinations extracted from locking scripts.

use crate::opcodes::{OP_CHECKSIG, OP_DATA_20, OP_DUP, OP_EQUAL, OP_EQUALVERIFY, OP_HASH160};
use crate::Script;

/// A spending target a locking script commits to.
///
/// Supports stable equality, ordering, and hashing so it can serve as a
/// map key (address-book lookups and similar).
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Destination {
    /// A raw public key (pay-to-pubkey outputs).
    PubKey(Vec<u8>),
    /// A 20-byte Hash160 of a public key (pay-to-pubkey-hash outputs).
    PubKeyHash([u8; 20]),
    /// A 20-byte Hash160 of a redeem script (pay-to-script-hash outputs).
    ScriptHash([u8; 20]),
}

impl Destination {
    /// Build the canonical locking script for this destination.
    ///
    /// # Returns
    /// `<pubkey> OP_CHECKSIG`, the 25-byte P2PKH script, or the 23-byte
    /// P2SH script depending on the variant.
    pub fn locking_script(&self) -> Script {
        match self {
            Destination::PubKey(key) => {
                let mut script = Script::new();
                // Public keys are at most 65 bytes, always a direct push.
                script.append_push_data(key).unwrap();
                script.append_opcodes(&[OP_CHECKSIG]).unwrap();
                script
            }
            Destination::PubKeyHash(hash) => {
                let mut bytes = Vec::with_capacity(25);
                bytes.push(OP_DUP);
                bytes.push(OP_HASH160);
                bytes.push(OP_DATA_20);
                bytes.extend_from_slice(hash);
                bytes.push(OP_EQUALVERIFY);
                bytes.push(OP_CHECKSIG);
                Script::from_bytes(&bytes)
            }
            Destination::ScriptHash(hash) => {
                let mut bytes = Vec::with_capacity(23);
                bytes.push(OP_HASH160);
                bytes.push(OP_DATA_20);
                bytes.extend_from_slice(hash);
                bytes.push(OP_EQUAL);
                Script::from_bytes(&bytes)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// The P2PKH locking script for a hash has the canonical 25-byte shape.
    #[test]
    fn test_pubkey_hash_script() {
        let dest = Destination::PubKeyHash([0x11; 20]);
        let script = dest.locking_script();
        assert!(script.is_p2pkh());
    }

    /// The P2SH locking script for a hash has the canonical 23-byte shape.
    #[test]
    fn test_script_hash_script() {
        let dest = Destination::ScriptHash([0x22; 20]);
        assert!(dest.locking_script().is_p2sh());
    }

    /// Destinations order and hash stably for use as map keys.
    #[test]
    fn test_map_key() {
        use std::collections::BTreeMap;
        let mut book = BTreeMap::new();
        book.insert(Destination::PubKeyHash([1; 20]), "alice");
        book.insert(Destination::ScriptHash([1; 20]), "escrow");
        assert_eq!(book.get(&Destination::PubKeyHash([1; 20])), Some(&"alice"));
        assert_eq!(book.len(), 2);
    }
}
