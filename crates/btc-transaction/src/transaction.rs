//! Core transaction type.
//!
//! A transaction carries a version, a set of inputs, a set of outputs,
//! and a lock time. The type supports binary and hex serialization and
//! transaction ID computation; signing and verification live in the
//! sibling modules.

use btc_primitives::hash::sha256d;
use btc_primitives::util::{ByteReader, ByteWriter, VarInt};

use crate::input::TransactionInput;
use crate::output::TransactionOutput;
use crate::TransactionError;

/// A transaction.
///
/// # Wire format
///
/// | Field        | Size                 |
/// |--------------|----------------------|
/// | version      | 4 bytes (LE)         |
/// | input count  | VarInt               |
/// | inputs       | variable (per input) |
/// | output count | VarInt               |
/// | outputs      | variable (per output)|
/// | lock_time    | 4 bytes (LE)         |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    /// Transaction format version.
    pub version: u32,

    /// Ordered list of inputs.
    pub inputs: Vec<TransactionInput>,

    /// Ordered list of outputs.
    pub outputs: Vec<TransactionOutput>,

    /// Lock time: a block height below the lock-time threshold, a Unix
    /// timestamp above it; zero means final.
    pub lock_time: u32,
}

impl Transaction {
    /// Create a new empty transaction with version 1 and lock time 0.
    pub fn new() -> Self {
        Transaction {
            version: 1,
            inputs: Vec::new(),
            outputs: Vec::new(),
            lock_time: 0,
        }
    }

    /// Append an input.
    pub fn add_input(&mut self, input: TransactionInput) -> &mut Self {
        self.inputs.push(input);
        self
    }

    /// Append an output.
    pub fn add_output(&mut self, output: TransactionOutput) -> &mut Self {
        self.outputs.push(output);
        self
    }

    /// Return true if this is a coinbase transaction (a single input
    /// spending the null outpoint).
    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].prev_txid == [0u8; 32]
            && self.inputs[0].prev_index == 0xffff_ffff
    }

    // -----------------------------------------------------------------
    // Deserialization
    // -----------------------------------------------------------------

    /// Parse a transaction from a hex-encoded string.
    ///
    /// # Arguments
    /// * `hex_str` - A hex string of the raw transaction bytes.
    ///
    /// # Returns
    /// The transaction, or an error if the hex or structure is invalid.
    pub fn from_hex(hex_str: &str) -> Result<Self, TransactionError> {
        let bytes = hex::decode(hex_str)
            .map_err(|e| TransactionError::SerializationError(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    /// Parse a transaction from raw bytes.
    ///
    /// The slice must contain exactly one transaction with no trailing
    /// data.
    ///
    /// # Arguments
    /// * `bytes` - The raw transaction bytes.
    ///
    /// # Returns
    /// The transaction, or an error on truncation or trailing bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TransactionError> {
        let mut reader = ByteReader::new(bytes);
        let tx = Self::read_from(&mut reader)?;
        if reader.remaining() != 0 {
            return Err(TransactionError::SerializationError(format!(
                "trailing {} bytes after transaction",
                reader.remaining()
            )));
        }
        Ok(tx)
    }

    /// Deserialize a transaction from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - Reader positioned at the start of a transaction.
    ///
    /// # Returns
    /// The transaction, or an error on truncation.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let version = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading version: {}", e))
        })?;

        let input_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading input count: {}", e))
        })?;
        let mut inputs = Vec::with_capacity(input_count.value().min(1024) as usize);
        for _ in 0..input_count.value() {
            inputs.push(TransactionInput::read_from(reader)?);
        }

        let output_count = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading output count: {}", e))
        })?;
        let mut outputs = Vec::with_capacity(output_count.value().min(1024) as usize);
        for _ in 0..output_count.value() {
            outputs.push(TransactionOutput::read_from(reader)?);
        }

        let lock_time = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading lock time: {}", e))
        })?;

        Ok(Transaction {
            version,
            inputs,
            outputs,
            lock_time,
        })
    }

    // -----------------------------------------------------------------
    // Serialization
    // -----------------------------------------------------------------

    /// Serialize this transaction to raw wire-format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut writer = ByteWriter::with_capacity(256);
        writer.write_u32_le(self.version);

        writer.write_varint(VarInt::from(self.inputs.len()));
        for input in &self.inputs {
            input.write_to(&mut writer);
        }

        writer.write_varint(VarInt::from(self.outputs.len()));
        for output in &self.outputs {
            output.write_to(&mut writer);
        }

        writer.write_u32_le(self.lock_time);
        writer.into_bytes()
    }

    /// Serialize this transaction to a lowercase hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.to_bytes())
    }

    // -----------------------------------------------------------------
    // Transaction ID
    // -----------------------------------------------------------------

    /// Compute the transaction ID (double SHA-256 of the serialization),
    /// in internal (little-endian) byte order.
    pub fn tx_id(&self) -> [u8; 32] {
        sha256d(&self.to_bytes())
    }

    /// Compute the transaction ID as the conventional display string
    /// (byte-reversed hex).
    pub fn tx_id_hex(&self) -> String {
        let mut id = self.tx_id();
        id.reverse();
        hex::encode(id)
    }
}

impl Default for Transaction {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for Transaction {
    /// Display the transaction as its hex-encoded serialization.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use btc_script::Script;

    fn sample_tx() -> Transaction {
        let mut tx = Transaction::new();
        let mut input = TransactionInput::new([0x11; 32], 0);
        input.unlocking_script = Script::from_bytes(&[0x51]);
        tx.add_input(input);
        tx.add_output(TransactionOutput::new(
            50_0000_0000,
            Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap(),
        ));
        tx
    }

    /// Bytes/hex round-trips preserve the full structure.
    #[test]
    fn test_serialization_roundtrip() {
        let tx = sample_tx();
        let back = Transaction::from_bytes(&tx.to_bytes()).unwrap();
        assert_eq!(back, tx);

        let back = Transaction::from_hex(&tx.to_hex()).unwrap();
        assert_eq!(back, tx);
    }

    /// Trailing data after a complete transaction is rejected.
    #[test]
    fn test_trailing_bytes_rejected() {
        let mut bytes = sample_tx().to_bytes();
        bytes.push(0x00);
        assert!(Transaction::from_bytes(&bytes).is_err());
    }

    /// Truncated data is a serialization error.
    #[test]
    fn test_truncated() {
        let bytes = sample_tx().to_bytes();
        assert!(Transaction::from_bytes(&bytes[..bytes.len() - 3]).is_err());
    }

    /// The txid is the double SHA-256 of the serialization.
    #[test]
    fn test_tx_id() {
        let tx = sample_tx();
        assert_eq!(tx.tx_id(), btc_primitives::hash::sha256d(&tx.to_bytes()));
        // Display order is byte-reversed.
        let mut internal = tx.tx_id();
        internal.reverse();
        assert_eq!(tx.tx_id_hex(), hex::encode(internal));
    }

    /// Coinbase detection requires the null outpoint.
    #[test]
    fn test_is_coinbase() {
        let mut tx = Transaction::new();
        tx.add_input(TransactionInput::new([0u8; 32], 0xffff_ffff));
        assert!(tx.is_coinbase());
        assert!(!sample_tx().is_coinbase());
    }
}
