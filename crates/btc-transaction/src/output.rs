//! Transaction output with value and locking script.

use btc_primitives::util::{ByteReader, ByteWriter, VarInt};
use btc_script::Script;

use crate::TransactionError;

/// A single transaction output.
///
/// # Wire format
///
/// | Field          | Size         |
/// |----------------|--------------|
/// | value          | 8 bytes (LE) |
/// | script length  | VarInt       |
/// | locking_script | variable     |
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionOutput {
    /// The amount locked by this output, in base units.
    pub value: u64,

    /// The locking script (scriptPubKey) defining spending conditions.
    pub locking_script: Script,
}

impl TransactionOutput {
    /// Create an output locking `value` with the given script.
    pub fn new(value: u64, locking_script: Script) -> Self {
        TransactionOutput {
            value,
            locking_script,
        }
    }

    /// Reset this output to the blanked state used by signature hashing:
    /// value -1 (all bits set) and an empty script.
    pub fn set_null(&mut self) {
        self.value = u64::MAX;
        self.locking_script = Script::new();
    }

    /// Return true if this output is in the blanked state.
    pub fn is_null(&self) -> bool {
        self.value == u64::MAX && self.locking_script.is_empty()
    }

    /// Deserialize an output from a `ByteReader`.
    ///
    /// # Arguments
    /// * `reader` - Reader positioned at the start of an encoded output.
    ///
    /// # Returns
    /// The output, or an error if the data is truncated.
    pub fn read_from(reader: &mut ByteReader) -> Result<Self, TransactionError> {
        let value = reader.read_u64_le().map_err(|e| {
            TransactionError::SerializationError(format!("reading value: {}", e))
        })?;

        let script_len = reader.read_varint().map_err(|e| {
            TransactionError::SerializationError(format!("reading script length: {}", e))
        })?;
        let script_bytes = reader.read_bytes(script_len.value() as usize).map_err(|e| {
            TransactionError::SerializationError(format!("reading locking script: {}", e))
        })?;

        Ok(TransactionOutput {
            value,
            locking_script: Script::from_bytes(script_bytes),
        })
    }

    /// Serialize this output into a `ByteWriter`.
    ///
    /// # Arguments
    /// * `writer` - The writer to append serialized bytes to.
    pub fn write_to(&self, writer: &mut ByteWriter) {
        writer.write_u64_le(self.value);
        let script_bytes = self.locking_script.to_bytes();
        writer.write_varint(VarInt::from(script_bytes.len()));
        writer.write_bytes(script_bytes);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serialization round-trip preserves value and script.
    #[test]
    fn test_output_roundtrip() {
        let output = TransactionOutput::new(
            50_0000_0000,
            Script::from_hex("76a91404d03f746652cfcb6cb55119ab473a045137d26588ac").unwrap(),
        );
        let mut writer = ByteWriter::new();
        output.write_to(&mut writer);
        let bytes = writer.into_bytes();
        let mut reader = ByteReader::new(&bytes);
        assert_eq!(TransactionOutput::read_from(&mut reader).unwrap(), output);
    }

    /// Blanking marks the output with value -1 and no script.
    #[test]
    fn test_set_null() {
        let mut output = TransactionOutput::new(1, Script::from_bytes(&[0x51]));
        assert!(!output.is_null());
        output.set_null();
        assert!(output.is_null());
        assert_eq!(output.value, u64::MAX);
    }
}
