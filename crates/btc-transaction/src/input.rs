//! Transaction input referencing a previous output.
//!
//! Contains the previous outpoint (transaction ID and output index), the
//! unlocking script supplying spending authorization, and the sequence
//! number. Serialization follows the standard wire format.

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::Script;

use crate::TransactionError;

/// Sequence number of a finalized input (no lock-time participation).
pub const FINAL_SEQUENCE: u32 = 0xFFFF_FFFF;

/// A single transaction input.
///
/// # Wire format
///
/// | Field            | Size          |
/// |------------------|---------------|
/// | prev_txid        | 32 bytes (LE) |
/// | prev_index       | 4 bytes (LE)  |
/// | script length    | VarInt        |
/// | unlocking_script | variable      |
/// | sequence         | 4 bytes (LE)  |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionInput {
    /// The 32-byte ID of the transaction holding the output being spent,
    /// in internal (little-endian) byte order.
    pub prev_txid: [u8; 32],

    /// Index of the output within the previous transaction.
    pub prev_index: u32,

    /// The unlocking script (scriptSig) proving authorization. Empty
    /// until the input is signed.
    pub unlocking_script: Script,

    /// Sequence number. Defaults to `FINAL_SEQUENCE`.
    pub sequence: u32,
}

impl TransactionInput {
    /// Create an unsigned input spending the given outpoint.
    ///
    /// # Arguments
    /// * `prev_txid` - The previous transaction's ID (internal byte order).
    /// * `prev_index` - The output index within that transaction.
    ///
    /// # Returns
    /// An input with an empty unlocking script and a finalized sequence.
    pub fn new(prev_txid: [u8; 32], prev_index: u32) -> Self {
        TransactionInput {
            prev_txid,
            prev_index,
            unlocking_script: Script::new(),
            sequence: FINAL_SEQUENCE,
        }
    }

    /// Deserialize an input from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - Reader positioned at the start of an encoded input.
    ///
    /// # Returns
    /// The input, or an error if the data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let txid_bytes = reader.read_bytes(32).map_err(|e| {
            TransactionError::SerializationError(format!("reading prev txid: {}", e))
        })?;
        let mut prev_txid = [0u8; 32];
        prev_txid.copy_from_slice(txid_bytes);

        let prev_index = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading prev index: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;
        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading unlocking script: {}", e))
        })?;

        let sequence = reader.read_u32_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading sequence: {}", e))
        })?;

        Ok(TransactionInput {
            prev_txid,
            prev_index,
            unlocking_script: Script::from_bytes(script_bytes),
            sequence,
        })
    }

    /// Serialize this input into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_bytes(&self.prev_txid);
        writer.write_u32_le(self.prev_index);
        let script_bytes = self.unlocking_script.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
        writer.write_u32_le(self.sequence);
    }
}
