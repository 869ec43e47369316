//! Script type - a sequence of opcodes and data pushes.
//!
//! Scripts are used in transaction inputs (unlocking) and outputs
//! (locking) to define spending conditions. `Script` wraps a `Vec<u8>`
//! and provides builder methods for construction plus read-only views for
//! classification, serialization, and ASM output. The builder methods are
//! used only while assembling a script; evaluation always works on the
//! finished byte sequence.

use std::fmt;

use crate::chunk::{decode_script, push_data_prefix, read_chunk, ScriptChunk};
use crate::interpreter::scriptnum::ScriptNumber;
use crate::opcodes::*;
use crate::ScriptError;

/// A script, represented as a byte vector newtype.
#[derive(Clone, PartialEq, Eq)]
pub struct Script(Vec<u8>);

impl Script {
    // -----------------------------------------------------------------------
    // Constructors
    // -----------------------------------------------------------------------

    /// Create a new empty script.
    ///
    /// # Returns
    /// An empty `Script` instance.
    pub fn new() -> Self {
        Script(Vec::new())
    }

    /// Create a script from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string (e.g. "76a914...88ac").
    ///
    /// # Returns
    /// A `Script` wrapping the decoded bytes, or an error if the hex is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, ScriptError> {
        let bytes = hex::decode(hex_str).map_err(|e| ScriptError::InvalidHex(e.to_string()))?;
        Ok(Script(bytes))
    }

    /// Create a script from raw bytes.
    ///
    /// # Arguments
    /// * `bytes` - Raw script bytes.
    ///
    /// # Returns
    /// A `Script` wrapping a copy of the given bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Script(bytes.to_vec())
    }

    /// Create a script from an ASM string.
    ///
    /// Parses space-separated tokens where known opcode names (e.g.
    /// "OP_DUP") are emitted directly and hex strings become push data.
    ///
    /// # Arguments
    /// * `asm` - A space-separated ASM string.
    ///
    /// # Returns
    /// A `Script`, or an error if any token is invalid.
    pub fn from_asm(asm: &str) -> Result<Self, ScriptError> {
        let mut script = Script::new();
        if asm.is_empty() {
            return Ok(script);
        }
        for token in asm.split(' ') {
            if let Some(opcode) = string_to_opcode(token) {
                script.append_opcodes(&[opcode])?;
            } else {
                script.append_push_data_hex(token)?;
            }
        }
        Ok(script)
    }

    // -----------------------------------------------------------------------
    // Serialization / views
    // -----------------------------------------------------------------------

    /// Encode the script as a hex string.
    ///
    /// # Returns
    /// A lowercase hex representation of the script bytes.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Convert the script to its ASM (human-readable assembly) representation.
    ///
    /// Each opcode or data push is a space-separated token; pushes appear
    /// as hex, opcodes by name. Malformed scripts render as empty.
    ///
    /// # Returns
    /// A space-separated ASM string.
    pub fn to_asm(&self) -> String {
        if self.0.is_empty() {
            return String::new();
        }
        let mut parts = Vec::new();
        let mut pos = 0;
        while pos < self.0.len() {
            match self.read_op(&mut pos) {
                Ok(chunk) => {
                    let s = chunk.to_asm_string();
                    if !s.is_empty() {
                        parts.push(s);
                    }
                }
                Err(_) => return String::new(),
            }
        }
        parts.join(" ")
    }

    /// Return a reference to the underlying bytes.
    ///
    /// # Returns
    /// A byte slice of the script contents.
    pub fn to_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Return the length of the script in bytes.
    ///
    /// # Returns
    /// The number of bytes in the script.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check if the script is empty (zero bytes).
    ///
    /// # Returns
    /// `true` if the script has no bytes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the script into a vector of decoded chunks.
    ///
    /// # Returns
    /// A vector of `ScriptChunk` values, or an error if the script is malformed.
    pub fn chunks(&self) -> Result<Vec<ScriptChunk>, ScriptError> {
        decode_script(&self.0)
    }

    /// Read a single script operation from the given position.
    ///
    /// Advances `pos` exactly past the consumed instruction, enabling
    /// incremental decoding.
    ///
    /// # Arguments
    /// * `pos` - Mutable reference to the current read position.
    ///
    /// # Returns
    /// The parsed `ScriptChunk`, or an error on exhaustion or truncation.
    pub fn read_op(&self, pos: &mut usize) -> Result<ScriptChunk, ScriptError> {
        let (chunk, next) = read_chunk(&self.0, *pos)?;
        *pos = next;
        Ok(chunk)
    }

    // -----------------------------------------------------------------------
    // Script shape checks
    // -----------------------------------------------------------------------

    /// Check if this is a Pay-to-Script-Hash (P2SH) output script.
    ///
    /// Pattern: OP_HASH160 <20 bytes> OP_EQUAL, byte-exact.
    ///
    /// # Returns
    /// `true` if the script matches the P2SH shape.
    pub fn is_p2sh(&self) -> bool {
        let b = &self.0;
        b.len() == 23 && b[0] == OP_HASH160 && b[1] == OP_DATA_20 && b[22] == OP_EQUAL
    }

    /// Check if this is a Pay-to-Public-Key-Hash (P2PKH) output script.
    ///
    /// Pattern: OP_DUP OP_HASH160 <20 bytes> OP_EQUALVERIFY OP_CHECKSIG.
    ///
    /// # Returns
    /// `true` if the script matches the P2PKH shape.
    pub fn is_p2pkh(&self) -> bool {
        let b = &self.0;
        b.len() == 25
            && b[0] == OP_DUP
            && b[1] == OP_HASH160
            && b[2] == OP_DATA_20
            && b[23] == OP_EQUALVERIFY
            && b[24] == OP_CHECKSIG
    }

    /// Check if the script consists only of push instructions.
    ///
    /// Used by the verifier's anti-malleability rule for P2SH spends: an
    /// unlocking script that does anything but push data is rejected.
    ///
    /// # Returns
    /// `true` if every instruction is a push; `false` on any non-push
    /// opcode or on malformed bytes.
    pub fn is_push_only(&self) -> bool {
        let mut pos = 0;
        while pos < self.0.len() {
            match self.read_op(&mut pos) {
                Ok(chunk) if chunk.is_push() => {}
                _ => return false,
            }
        }
        true
    }

    /// Check whether the script is guaranteed to fail at execution,
    /// regardless of the initial stack. Outputs carrying such scripts can
    /// be pruned immediately when entering the unspent set.
    pub fn is_unspendable(&self) -> bool {
        !self.0.is_empty() && self.0[0] == OP_RETURN
    }

    // -----------------------------------------------------------------------
    // Builders
    // -----------------------------------------------------------------------

    /// Append data bytes to the script with the proper push prefix.
    ///
    /// Chooses the minimal encoding: direct push for 0-75 bytes,
    /// OP_PUSHDATA1 for 76-255, OP_PUSHDATA2 for 256-65535, etc.
    ///
    /// # Arguments
    /// * `data` - The data bytes to push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the data is too large.
    pub fn append_push_data(&mut self, data: &[u8]) -> Result<(), ScriptError> {
        let prefix = push_data_prefix(data.len())?;
        self.0.extend_from_slice(&prefix);
        self.0.extend_from_slice(data);
        Ok(())
    }

    /// Append hex-encoded data to the script with the proper push prefix.
    ///
    /// # Arguments
    /// * `hex_str` - Hex string to decode and push.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if the hex is invalid or data too large.
    pub fn append_push_data_hex(&mut self, hex_str: &str) -> Result<(), ScriptError> {
        let data = hex::decode(hex_str).map_err(|_| ScriptError::InvalidOpcodeData)?;
        self.append_push_data(&data)
    }

    /// Append raw opcodes to the script.
    ///
    /// Rejects push data opcodes (0x01..OP_PUSHDATA4); use
    /// `append_push_data` for those.
    ///
    /// # Arguments
    /// * `opcodes` - Slice of opcode bytes to append.
    ///
    /// # Returns
    /// `Ok(())` on success, or an error if a push data opcode is included.
    pub fn append_opcodes(&mut self, opcodes: &[u8]) -> Result<(), ScriptError> {
        for &op in opcodes {
            if op >= OP_DATA_1 && op <= OP_PUSHDATA4 {
                return Err(ScriptError::InvalidOpcodeType(
                    opcode_to_string(op).to_string(),
                ));
            }
        }
        self.0.extend_from_slice(opcodes);
        Ok(())
    }

    /// Append an integer using the most compact representation.
    ///
    /// -1 and 1 through 16 become their dedicated opcodes; everything
    /// else is pushed as a script-number byte sequence.
    ///
    /// # Arguments
    /// * `n` - The integer value to append.
    pub fn append_num(&mut self, n: i64) {
        if n == 0 {
            self.0.push(OP_0);
        } else if n == -1 || (1..=16).contains(&n) {
            self.0.push(if n == -1 { OP_1NEGATE } else { OP_1 + (n as u8) - 1 });
        } else {
            let bytes = ScriptNumber::new(n).to_bytes();
            // Lengths here never exceed 9 bytes, so the prefix cannot fail.
            let prefix = push_data_prefix(bytes.len()).unwrap();
            self.0.extend_from_slice(&prefix);
            self.0.extend_from_slice(&bytes);
        }
    }

    /// Append all bytes of another script.
    ///
    /// This is concatenation of instruction streams, not a data push.
    ///
    /// # Arguments
    /// * `other` - The script whose bytes to append.
    pub fn extend(&mut self, other: &Script) {
        self.0.extend_from_slice(&other.0);
    }
}

impl Default for Script {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Script {
    /// Display the script as a lowercase hex string.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Script({})", self.to_hex())
    }
}

impl serde::Serialize for Script {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> serde::Deserialize<'de> for Script {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Script::from_hex(&s).map_err(serde::de::Error::custom)
    }
}
