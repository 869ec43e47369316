//! Script template classifier (solver).
//!
//! Pattern-matches a locking script against the standard templates and
//! extracts the byte blobs (public keys, hashes, signature counts) a
//! spender needs. Classification is attempted in a fixed precedence
//! order; the templates are mutually exclusive by construction, so the
//! first match is the only match.

use crate::chunk::ScriptChunk;
use crate::destination::Destination;
use crate::opcodes::*;
use crate::Script;

/// Classification tag for a locking script.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptClass {
    /// No standard template matched.
    NonStandard,
    /// `<pubkey> OP_CHECKSIG`
    PubKey,
    /// `OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG`
    PubKeyHash,
    /// `OP_HASH160 <20 bytes> OP_EQUAL`
    ScriptHash,
    /// `<m> <pubkey>... <n> OP_CHECKMULTISIG`
    Multisig,
}

impl ScriptClass {
    /// Return the conventional name of this script class.
    pub fn name(&self) -> &'static str {
        match self {
            ScriptClass::NonStandard => "nonstandard",
            ScriptClass::PubKey => "pubkey",
            ScriptClass::PubKeyHash => "pubkeyhash",
            ScriptClass::ScriptHash => "scripthash",
            ScriptClass::Multisig => "multisig",
        }
    }
}

/// The result of classifying a script: the matched template and the
/// extracted solution blobs.
///
/// For multisig, the first blob is the required-signature count as a
/// single byte, the last is the key count, and the keys sit in between.
#[derive(Debug, Clone)]
pub struct TemplateMatch {
    /// Which template matched.
    pub class: ScriptClass,
    /// Extracted data blobs, in template order.
    pub solutions: Vec<Vec<u8>>,
}

impl TemplateMatch {
    fn non_standard() -> Self {
        TemplateMatch {
            class: ScriptClass::NonStandard,
            solutions: Vec::new(),
        }
    }
}

/// Return true if the bytes have a plausible public key length/prefix.
fn is_pub_key_shaped(data: &[u8]) -> bool {
    match data.first() {
        Some(0x02) | Some(0x03) => data.len() == 33,
        Some(0x04) | Some(0x06) | Some(0x07) => data.len() == 65,
        _ => false,
    }
}

/// Classify a locking script against the standard templates.
///
/// Precedence: pay-to-script-hash (byte-exact), pay-to-pubkey,
/// pay-to-pubkey-hash, multisig, else non-standard. Scripts that fail to
/// decode are non-standard, not errors; truncated scripts simply stop
/// matching.
///
/// # Arguments
/// * `script` - The locking script to classify.
///
/// # Returns
/// The matched template and its extracted solutions.
pub fn solve(script: &Script) -> TemplateMatch {
    // Pay-to-script-hash is a byte-exact shape, checked before any
    // chunk-level pattern can overlap it.
    if script.is_p2sh() {
        return TemplateMatch {
            class: ScriptClass::ScriptHash,
            solutions: vec![script.to_bytes()[2..22].to_vec()],
        };
    }

    let chunks = match script.chunks() {
        Ok(c) => c,
        Err(_) => return TemplateMatch::non_standard(),
    };

    if let Some(m) = match_pub_key(&chunks) {
        return m;
    }
    if let Some(m) = match_pub_key_hash(&chunks) {
        return m;
    }
    if let Some(m) = match_multisig(&chunks) {
        return m;
    }

    TemplateMatch::non_standard()
}

fn match_pub_key(chunks: &[ScriptChunk]) -> Option<TemplateMatch> {
    if chunks.len() != 2 || chunks[1].op != OP_CHECKSIG {
        return None;
    }
    let key = chunks[0].data.as_ref()?;
    if !is_pub_key_shaped(key) {
        return None;
    }
    Some(TemplateMatch {
        class: ScriptClass::PubKey,
        solutions: vec![key.clone()],
    })
}

fn match_pub_key_hash(chunks: &[ScriptChunk]) -> Option<TemplateMatch> {
    if chunks.len() != 5
        || chunks[0].op != OP_DUP
        || chunks[1].op != OP_HASH160
        || chunks[2].op != OP_DATA_20
        || chunks[3].op != OP_EQUALVERIFY
        || chunks[4].op != OP_CHECKSIG
    {
        return None;
    }
    let hash = chunks[2].data.as_ref()?;
    Some(TemplateMatch {
        class: ScriptClass::PubKeyHash,
        solutions: vec![hash.clone()],
    })
}

fn match_multisig(chunks: &[ScriptChunk]) -> Option<TemplateMatch> {
    // <m> <key>... <n> CHECKMULTISIG needs at least one key.
    if chunks.len() < 4 {
        return None;
    }
    let last = &chunks[chunks.len() - 1];
    if last.op != OP_CHECKMULTISIG {
        return None;
    }

    let m_op = chunks[0].op;
    let n_op = chunks[chunks.len() - 2].op;
    if !(OP_1..=OP_16).contains(&m_op) || !(OP_1..=OP_16).contains(&n_op) {
        return None;
    }
    let m = decode_small_int(m_op);
    let n = decode_small_int(n_op);

    let keys = &chunks[1..chunks.len() - 2];
    if keys.len() != n as usize || m > n {
        return None;
    }

    let mut solutions = Vec::with_capacity(n as usize + 2);
    solutions.push(vec![m]);
    for key in keys {
        match &key.data {
            Some(data) if is_pub_key_shaped(data) => solutions.push(data.clone()),
            _ => return None,
        }
    }
    solutions.push(vec![n]);

    Some(TemplateMatch {
        class: ScriptClass::Multisig,
        solutions,
    })
}

/// Number of pushes a satisfying unlocking script needs for a template.
///
/// # Arguments
/// * `class` - The classified template.
/// * `solutions` - The solutions returned by [`solve`].
///
/// # Returns
/// The expected push count, or `None` for non-standard scripts. For
/// script-hash outputs this counts only the serialized-script push; the
/// nested script's own arguments are not knowable from the outside.
pub fn script_sig_args_expected(class: ScriptClass, solutions: &[Vec<u8>]) -> Option<usize> {
    match class {
        ScriptClass::NonStandard => None,
        ScriptClass::PubKey => Some(1),
        ScriptClass::PubKeyHash => Some(2),
        ScriptClass::ScriptHash => Some(1),
        ScriptClass::Multisig => {
            let m = *solutions.first()?.first()? as usize;
            // The required signatures plus the quirk dummy element.
            Some(m + 1)
        }
    }
}

/// Return true if the script matches a standard template with standard
/// parameters. Multisig outputs are standard only up to 3 keys.
pub fn is_standard(script: &Script) -> bool {
    let m = solve(script);
    match m.class {
        ScriptClass::NonStandard => false,
        ScriptClass::Multisig => {
            let required = m.solutions.first().and_then(|s| s.first().copied()).unwrap_or(0);
            let total = m.solutions.last().and_then(|s| s.first().copied()).unwrap_or(0);
            (1..=3).contains(&total) && required >= 1 && required <= total
        }
        _ => true,
    }
}

/// Extract the single destination a locking script pays to.
///
/// # Arguments
/// * `script` - The locking script.
///
/// # Returns
/// The destination, or `None` for non-standard and multisig scripts
/// (multisig pays to several keys; use [`extract_destinations`]).
pub fn extract_destination(script: &Script) -> Option<Destination> {
    let m = solve(script);
    match m.class {
        ScriptClass::PubKey => Some(Destination::PubKey(m.solutions[0].clone())),
        ScriptClass::PubKeyHash => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&m.solutions[0]);
            Some(Destination::PubKeyHash(hash))
        }
        ScriptClass::ScriptHash => {
            let mut hash = [0u8; 20];
            hash.copy_from_slice(&m.solutions[0]);
            Some(Destination::ScriptHash(hash))
        }
        ScriptClass::NonStandard | ScriptClass::Multisig => None,
    }
}

/// Extract every destination a locking script pays to, with the number
/// of signers required.
///
/// # Arguments
/// * `script` - The locking script.
///
/// # Returns
/// The script class, the destinations, and the required signer count, or
/// `None` for non-standard scripts.
pub fn extract_destinations(
    script: &Script,
) -> Option<(ScriptClass, Vec<Destination>, usize)> {
    let m = solve(script);
    match m.class {
        ScriptClass::NonStandard => None,
        ScriptClass::Multisig => {
            let required = *m.solutions.first()?.first()? as usize;
            let keys = &m.solutions[1..m.solutions.len() - 1];
            let destinations = keys
                .iter()
                .map(|k| Destination::PubKey(k.clone()))
                .collect();
            Some((ScriptClass::Multisig, destinations, required))
        }
        class => {
            let dest = extract_destination(script)?;
            Some((class, vec![dest], 1))
        }
    }
}

/// Build a multisig locking script requiring `required` of the given keys.
///
/// # Arguments
/// * `required` - Number of signatures required (1..=16, at most the key count).
/// * `pub_keys` - The public keys, in the order signatures must appear.
///
/// # Returns
/// The `<m> <key>... <n> OP_CHECKMULTISIG` script.
///
/// # Panics
/// Panics if the counts are out of template range; callers construct
/// these from validated wallet data.
pub fn pay_to_multisig(required: usize, pub_keys: &[Vec<u8>]) -> Script {
    assert!(
        required >= 1 && required <= pub_keys.len() && pub_keys.len() <= 16,
        "multisig counts out of range: {} of {}",
        required,
        pub_keys.len()
    );
    let mut script = Script::new();
    script
        .append_opcodes(&[encode_small_int(required as u8)])
        .unwrap();
    for key in pub_keys {
        script.append_push_data(key).unwrap();
    }
    script
        .append_opcodes(&[encode_small_int(pub_keys.len() as u8), OP_CHECKMULTISIG])
        .unwrap();
    script
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p2pk_script(key: &[u8]) -> Script {
        let mut s = Script::new();
        s.append_push_data(key).unwrap();
        s.append_opcodes(&[OP_CHECKSIG]).unwrap();
        s
    }

    fn compressed_key(fill: u8) -> Vec<u8> {
        let mut k = vec![0x02];
        k.extend_from_slice(&[fill; 32]);
        k
    }

    /// P2SH classification is byte-exact and carries the hash.
    #[test]
    fn test_solve_p2sh() {
        let script = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87").unwrap();
        let m = solve(&script);
        assert_eq!(m.class, ScriptClass::ScriptHash);
        assert_eq!(hex::encode(&m.solutions[0]), "9de5aeaff9c48431ba4dd6e8af73d51f38e451cb");
    }

    /// P2PK classification accepts compressed and uncompressed keys.
    #[test]
    fn test_solve_p2pk() {
        let m = solve(&p2pk_script(&compressed_key(0x11)));
        assert_eq!(m.class, ScriptClass::PubKey);
        assert_eq!(m.solutions.len(), 1);

        let mut uncompressed = vec![0x04];
        uncompressed.extend_from_slice(&[0x22; 64]);
        let m = solve(&p2pk_script(&uncompressed));
        assert_eq!(m.class, ScriptClass::PubKey);
    }

    /// A push with a bad key prefix is not P2PK.
    #[test]
    fn test_solve_p2pk_bad_key() {
        let mut bad = vec![0x05];
        bad.extend_from_slice(&[0x22; 32]);
        assert_eq!(solve(&p2pk_script(&bad)).class, ScriptClass::NonStandard);
    }

    /// P2PKH classification carries the 20-byte hash.
    #[test]
    fn test_solve_p2pkh() {
        let script =
            Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap();
        let m = solve(&script);
        assert_eq!(m.class, ScriptClass::PubKeyHash);
        assert_eq!(hex::encode(&m.solutions[0]), "04d03f746652cfcb6cb55119ab473a045137d265");
    }

    /// Multisig solutions are m, keys in order, then n.
    #[test]
    fn test_solve_multisig() {
        let keys = vec![compressed_key(0x11), compressed_key(0x22), compressed_key(0x33)];
        let script = pay_to_multisig(2, &keys);
        let m = solve(&script);
        assert_eq!(m.class, ScriptClass::Multisig);
        assert_eq!(m.solutions.len(), 5);
        assert_eq!(m.solutions[0], vec![2]);
        assert_eq!(m.solutions[1], keys[0]);
        assert_eq!(m.solutions[3], keys[2]);
        assert_eq!(m.solutions[4], vec![3]);
    }

    /// Multisig requires n to match the number of supplied keys.
    #[test]
    fn test_solve_multisig_count_mismatch() {
        // Claims 3 keys but supplies 2.
        let mut script = Script::new();
        script.append_opcodes(&[OP_2]).unwrap();
        script.append_push_data(&compressed_key(0x11)).unwrap();
        script.append_push_data(&compressed_key(0x22)).unwrap();
        script.append_opcodes(&[OP_3, OP_CHECKMULTISIG]).unwrap();
        assert_eq!(solve(&script).class, ScriptClass::NonStandard);
    }

    /// m > n is not a valid multisig template.
    #[test]
    fn test_solve_multisig_m_exceeds_n() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_3]).unwrap();
        script.append_push_data(&compressed_key(0x11)).unwrap();
        script.append_push_data(&compressed_key(0x22)).unwrap();
        script.append_opcodes(&[OP_2, OP_CHECKMULTISIG]).unwrap();
        assert_eq!(solve(&script).class, ScriptClass::NonStandard);
    }

    /// Truncated scripts stop matching without erroring.
    #[test]
    fn test_solve_truncated() {
        let script = Script::from_bytes(&[OP_DUP, OP_HASH160, 0x14, 0x01]);
        assert_eq!(solve(&script).class, ScriptClass::NonStandard);
    }

    /// An empty script and random opcodes are non-standard.
    #[test]
    fn test_solve_non_standard() {
        assert_eq!(solve(&Script::new()).class, ScriptClass::NonStandard);
        let script = Script::from_bytes(&[OP_1, OP_ADD]);
        assert_eq!(solve(&script).class, ScriptClass::NonStandard);
    }

    /// A P2PKH shape with a wrong-width hash push is non-standard, and
    /// cannot fall through to a broader accidental match.
    #[test]
    fn test_precedence_no_overlap() {
        let mut script = Script::new();
        script.append_opcodes(&[OP_DUP, OP_HASH160]).unwrap();
        script.append_push_data(&[0x11; 19]).unwrap();
        script.append_opcodes(&[OP_EQUALVERIFY, OP_CHECKSIG]).unwrap();
        assert_eq!(solve(&script).class, ScriptClass::NonStandard);
    }

    /// Expected unlocking argument counts per template.
    #[test]
    fn test_script_sig_args_expected() {
        let m = solve(&p2pk_script(&compressed_key(0x11)));
        assert_eq!(script_sig_args_expected(m.class, &m.solutions), Some(1));

        let script =
            Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap();
        let m = solve(&script);
        assert_eq!(script_sig_args_expected(m.class, &m.solutions), Some(2));

        let keys = vec![compressed_key(0x11), compressed_key(0x22), compressed_key(0x33)];
        let m = solve(&pay_to_multisig(2, &keys));
        assert_eq!(script_sig_args_expected(m.class, &m.solutions), Some(3));

        assert_eq!(script_sig_args_expected(ScriptClass::NonStandard, &[]), None);
    }

    /// Standardness accepts small multisig and rejects wide ones.
    #[test]
    fn test_is_standard() {
        let keys3 = vec![compressed_key(0x11), compressed_key(0x22), compressed_key(0x33)];
        assert!(is_standard(&pay_to_multisig(2, &keys3)));

        let keys4: Vec<_> = (0u8..4).map(compressed_key).collect();
        assert!(!is_standard(&pay_to_multisig(2, &keys4)));

        assert!(!is_standard(&Script::from_bytes(&[OP_1, OP_ADD])));
        assert!(is_standard(
            &Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap()
        ));
    }

    /// Destination extraction per template.
    #[test]
    fn test_extract_destination() {
        let script =
            Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap();
        match extract_destination(&script) {
            Some(Destination::PubKeyHash(hash)) => {
                assert_eq!(hex::encode(hash), "04d03f746652cfcb6cb55119ab473a045137d265")
            }
            other => panic!("unexpected destination: {:?}", other),
        }

        let key = compressed_key(0x11);
        match extract_destination(&p2pk_script(&key)) {
            Some(Destination::PubKey(k)) => assert_eq!(k, key),
            other => panic!("unexpected destination: {:?}", other),
        }

        // Multisig has no single destination.
        let keys = vec![compressed_key(0x11), compressed_key(0x22)];
        assert!(extract_destination(&pay_to_multisig(1, &keys)).is_none());
    }

    /// Multi-destination extraction reports every key and the threshold.
    #[test]
    fn test_extract_destinations_multisig() {
        let keys = vec![compressed_key(0x11), compressed_key(0x22), compressed_key(0x33)];
        let (class, dests, required) =
            extract_destinations(&pay_to_multisig(2, &keys)).unwrap();
        assert_eq!(class, ScriptClass::Multisig);
        assert_eq!(required, 2);
        assert_eq!(dests.len(), 3);
        assert_eq!(dests[0], Destination::PubKey(keys[0].clone()));
    }

    /// Destination round-trip: extract then rebuild the same script.
    #[test]
    fn test_destination_script_roundtrip() {
        let script =
            Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap();
        let dest = extract_destination(&script).unwrap();
        assert_eq!(dest.locking_script(), script);

        let p2sh = Script::from_hex("a9149de5aeaff9c48431ba4dd6e8af73d51f38e451cb87").unwrap();
        let dest = extract_destination(&p2sh).unwrap();
        assert_eq!(dest.locking_script(), p2sh);
    }
}
