//! Key store collaborator interface and ownership classification.
//!
//! The script engine never owns keys; wallet-side collaborators implement
//! [`KeyStore`] and the engine asks it questions. `is_mine` answers the
//! "can I spend this output" question the wallet and RPC layers need,
//! distinguishing spendable outputs from merely watched ones.

use std::collections::{HashMap, HashSet};

use btc_primitives::ecdsa;
use btc_primitives::hash::hash160;

use crate::solver::{solve, ScriptClass};
use crate::Script;

/// Access to private keys and redeem scripts held by a wallet.
///
/// Implementations must be safe for concurrent read-only access; the
/// verifier and signer only ever read through this trait.
pub trait KeyStore {
    /// Return true if the store holds the private key for this key ID.
    fn have_key(&self, key_id: &[u8; 20]) -> bool;

    /// Return the public key for a key ID the store holds.
    fn get_pub_key(&self, key_id: &[u8; 20]) -> Option<Vec<u8>>;

    /// Produce a DER signature over a 32-byte digest with the key for
    /// `key_id`, or `None` if the key is not held.
    fn sign(&self, key_id: &[u8; 20], digest: &[u8; 32]) -> Option<Vec<u8>>;

    /// Return the redeem script with the given Hash160, if stored.
    fn get_script(&self, script_id: &[u8; 20]) -> Option<Script>;

    /// Return true if the script is watched without its keys being held.
    fn is_watched(&self, script: &Script) -> bool;
}

/// Whether a locking script is spendable with the keys in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ownership {
    /// Not related to any held key or watched script.
    No,
    /// Observed (watch-only) but not spendable.
    WatchOnly,
    /// Spendable with held keys.
    Spendable,
}

/// Classify a locking script against the keys and scripts in a store.
///
/// Multisig outputs are spendable only when every key is held; anything
/// short of that falls back to the watch-only check. Pay-to-script-hash
/// recurses into the stored redeem script.
///
/// # Arguments
/// * `store` - The key store to consult.
/// * `script` - The locking script to classify.
///
/// # Returns
/// The ownership classification.
pub fn is_mine(store: &dyn KeyStore, script: &Script) -> Ownership {
    let m = solve(script);
    let owned = match m.class {
        ScriptClass::NonStandard => false,
        ScriptClass::PubKey => store.have_key(&hash160(&m.solutions[0])),
        ScriptClass::PubKeyHash => store.have_key(&to_key_id(&m.solutions[0])),
        ScriptClass::ScriptHash => match store.get_script(&to_key_id(&m.solutions[0])) {
            Some(inner) => is_mine(store, &inner) == Ownership::Spendable,
            None => false,
        },
        ScriptClass::Multisig => {
            let keys = &m.solutions[1..m.solutions.len() - 1];
            keys.iter().all(|k| store.have_key(&hash160(k)))
        }
    };

    if owned {
        Ownership::Spendable
    } else if store.is_watched(script) {
        Ownership::WatchOnly
    } else {
        Ownership::No
    }
}

/// Collect the IDs of held keys a locking script can be spent with.
///
/// Only consults scripts the store actually owns; a script that is not
/// spendable contributes nothing.
///
/// # Arguments
/// * `store` - The key store to consult.
/// * `script` - The locking script to inspect.
///
/// # Returns
/// Key IDs of the held keys involved in the script.
pub fn affected_keys(store: &dyn KeyStore, script: &Script) -> Vec<[u8; 20]> {
    if is_mine(store, script) != Ownership::Spendable {
        return Vec::new();
    }
    let m = solve(script);
    match m.class {
        ScriptClass::PubKey => vec![hash160(&m.solutions[0])],
        ScriptClass::PubKeyHash => vec![to_key_id(&m.solutions[0])],
        ScriptClass::Multisig => m.solutions[1..m.solutions.len() - 1]
            .iter()
            .map(|k| hash160(k))
            .collect(),
        ScriptClass::ScriptHash => match store.get_script(&to_key_id(&m.solutions[0])) {
            Some(inner) => affected_keys(store, &inner),
            None => Vec::new(),
        },
        ScriptClass::NonStandard => Vec::new(),
    }
}

fn to_key_id(bytes: &[u8]) -> [u8; 20] {
    let mut id = [0u8; 20];
    id.copy_from_slice(bytes);
    id
}

/// An in-memory key store backed by secp256k1 keys.
///
/// The production wallet keeps keys in its own storage; this store
/// serves embedded uses and signing flows that already hold raw keys.
#[derive(Default)]
pub struct MemoryKeyStore {
    keys: HashMap<[u8; 20], [u8; 32]>,
    pub_keys: HashMap<[u8; 20], Vec<u8>>,
    scripts: HashMap<[u8; 20], Script>,
    watched: HashSet<Vec<u8>>,
}

impl MemoryKeyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a private key; returns the key ID (Hash160 of the public key).
    ///
    /// # Arguments
    /// * `private_key` - 32-byte big-endian secp256k1 scalar.
    /// * `compressed` - Whether the derived public key uses the
    ///   33-byte compressed encoding.
    ///
    /// # Returns
    /// The key ID, or an error for an invalid scalar.
    pub fn add_key(
        &mut self,
        private_key: [u8; 32],
        compressed: bool,
    ) -> Result<[u8; 20], btc_primitives::PrimitivesError> {
        let pub_key = ecdsa::public_key(&private_key, compressed)?;
        let key_id = hash160(&pub_key);
        self.keys.insert(key_id, private_key);
        self.pub_keys.insert(key_id, pub_key);
        Ok(key_id)
    }

    /// Add a redeem script; returns its script ID (Hash160 of the bytes).
    pub fn add_script(&mut self, script: Script) -> [u8; 20] {
        let id = hash160(script.to_bytes());
        self.scripts.insert(id, script);
        id
    }

    /// Mark a locking script as watch-only.
    pub fn add_watched(&mut self, script: &Script) {
        self.watched.insert(script.to_bytes().to_vec());
    }
}

impl KeyStore for MemoryKeyStore {
    fn have_key(&self, key_id: &[u8; 20]) -> bool {
        self.keys.contains_key(key_id)
    }

    fn get_pub_key(&self, key_id: &[u8; 20]) -> Option<Vec<u8>> {
        self.pub_keys.get(key_id).cloned()
    }

    fn sign(&self, key_id: &[u8; 20], digest: &[u8; 32]) -> Option<Vec<u8>> {
        let private_key = self.keys.get(key_id)?;
        ecdsa::sign_der(private_key, digest).ok()
    }

    fn get_script(&self, script_id: &[u8; 20]) -> Option<Script> {
        self.scripts.get(script_id).cloned()
    }

    fn is_watched(&self, script: &Script) -> bool {
        self.watched.contains(script.to_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::destination::Destination;
    use crate::solver::pay_to_multisig;

    fn priv_key(fill: u8) -> [u8; 32] {
        let mut k = [0u8; 32];
        k[31] = fill;
        k
    }

    /// P2PKH outputs to a held key are spendable.
    #[test]
    fn test_is_mine_p2pkh() {
        let mut store = MemoryKeyStore::new();
        let key_id = store.add_key(priv_key(1), true).unwrap();
        let script = Destination::PubKeyHash(key_id).locking_script();
        assert_eq!(is_mine(&store, &script), Ownership::Spendable);

        let other = Destination::PubKeyHash([0x55; 20]).locking_script();
        assert_eq!(is_mine(&store, &other), Ownership::No);
    }

    /// P2PK outputs to a held key are spendable.
    #[test]
    fn test_is_mine_p2pk() {
        let mut store = MemoryKeyStore::new();
        let key_id = store.add_key(priv_key(2), true).unwrap();
        let pub_key = store.get_pub_key(&key_id).unwrap();
        let script = Destination::PubKey(pub_key).locking_script();
        assert_eq!(is_mine(&store, &script), Ownership::Spendable);
    }

    /// Multisig needs every key to count as spendable.
    #[test]
    fn test_is_mine_multisig_requires_all_keys() {
        let mut store = MemoryKeyStore::new();
        let id1 = store.add_key(priv_key(1), true).unwrap();
        let id2 = store.add_key(priv_key(2), true).unwrap();
        let k1 = store.get_pub_key(&id1).unwrap();
        let k2 = store.get_pub_key(&id2).unwrap();
        let k3 = ecdsa::public_key(&priv_key(3), true).unwrap();

        let held = pay_to_multisig(2, &[k1.clone(), k2.clone()]);
        assert_eq!(is_mine(&store, &held), Ownership::Spendable);

        let partial = pay_to_multisig(2, &[k1, k2, k3]);
        assert_eq!(is_mine(&store, &partial), Ownership::No);
    }

    /// P2SH recurses into the stored redeem script.
    #[test]
    fn test_is_mine_p2sh() {
        let mut store = MemoryKeyStore::new();
        let key_id = store.add_key(priv_key(4), true).unwrap();
        let redeem = Destination::PubKeyHash(key_id).locking_script();
        let script_id = store.add_script(redeem);
        let script = Destination::ScriptHash(script_id).locking_script();
        assert_eq!(is_mine(&store, &script), Ownership::Spendable);

        // Without the redeem script stored, nothing to recurse into.
        let unknown = Destination::ScriptHash([0x77; 20]).locking_script();
        assert_eq!(is_mine(&store, &unknown), Ownership::No);
    }

    /// Watched scripts classify as watch-only, not spendable.
    #[test]
    fn test_is_mine_watch_only() {
        let mut store = MemoryKeyStore::new();
        let script = Destination::PubKeyHash([0x42; 20]).locking_script();
        store.add_watched(&script);
        assert_eq!(is_mine(&store, &script), Ownership::WatchOnly);
    }

    /// Affected keys lists the held key IDs behind a script.
    #[test]
    fn test_affected_keys() {
        let mut store = MemoryKeyStore::new();
        let id1 = store.add_key(priv_key(1), true).unwrap();
        let id2 = store.add_key(priv_key(2), true).unwrap();
        let k1 = store.get_pub_key(&id1).unwrap();
        let k2 = store.get_pub_key(&id2).unwrap();

        let script = pay_to_multisig(1, &[k1, k2]);
        let mut keys = affected_keys(&store, &script);
        keys.sort();
        let mut want = vec![id1, id2];
        want.sort();
        assert_eq!(keys, want);

        // Unspendable scripts contribute nothing.
        let other = Destination::PubKeyHash([0x55; 20]).locking_script();
        assert!(affected_keys(&store, &other).is_empty());
    }
}
