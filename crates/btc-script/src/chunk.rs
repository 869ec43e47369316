//! Script chunk parsing and push-data encoding.
//!
//! A script chunk is either an opcode or a data push with its associated
//! bytes. This module handles decoding raw script bytes into structured
//! chunks and encoding push data with the correct length prefix. Template
//! matching is built on this decoder; a truncated script is a decode
//! error, distinguishable from simply reaching the end of the script.

use crate::opcodes::*;
use crate::ScriptError;

/// A single parsed element of a script.
///
/// Each chunk is either a standalone opcode (like OP_DUP) or a data push
/// that carries the opcode byte and the pushed data bytes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptChunk {
    /// The opcode byte. For direct pushes (1-75 bytes), this is the length.
    pub op: u8,
    /// The data payload, if this chunk is a push operation.
    pub data: Option<Vec<u8>>,
}

impl ScriptChunk {
    /// Return true if this chunk is a push instruction (opcode <= OP_16).
    pub fn is_push(&self) -> bool {
        self.op <= OP_16
    }

    /// Convert this chunk to its ASM string representation.
    ///
    /// Data push chunks are rendered as hex strings; non-push opcodes use
    /// their canonical OP_xxx name.
    ///
    /// # Returns
    /// A string suitable for inclusion in a space-separated ASM output.
    pub fn to_asm_string(&self) -> String {
        if self.op > OP_0 && self.op <= OP_PUSHDATA4 {
            if let Some(ref data) = self.data {
                return hex::encode(data);
            }
        }
        opcode_to_string(self.op).to_string()
    }
}

/// Compute the push-prefix bytes for data of the given length.
///
/// Chooses the minimal encoding: a direct length byte for 1-75 bytes,
/// OP_PUSHDATA1 for up to 255, OP_PUSHDATA2 for up to 65535, and
/// OP_PUSHDATA4 above that.
///
/// # Arguments
/// * `len` - The number of data bytes to be pushed.
///
/// # Returns
/// The prefix bytes, or `ScriptError::DataTooBig` beyond the u32 range.
pub fn push_data_prefix(len: usize) -> Result<Vec<u8>, ScriptError> {
    if len < OP_PUSHDATA1 as usize {
        Ok(vec![len as u8])
    } else if len <= 0xff {
        Ok(vec![OP_PUSHDATA1, len as u8])
    } else if len <= 0xffff {
        let mut prefix = vec![OP_PUSHDATA2];
        prefix.extend_from_slice(&(len as u16).to_le_bytes());
        Ok(prefix)
    } else if len <= 0xffff_ffff {
        let mut prefix = vec![OP_PUSHDATA4];
        prefix.extend_from_slice(&(len as u32).to_le_bytes());
        Ok(prefix)
    } else {
        Err(ScriptError::DataTooBig)
    }
}

/// Decode raw script bytes into a vector of `ScriptChunk` values.
///
/// Handles direct pushes (opcode 0x01-0x4b), OP_PUSHDATA1/2/4 extended
/// pushes, and plain opcodes. Stops at the end of the script; a length
/// field that runs past the end is an error.
///
/// # Arguments
/// * `bytes` - The raw script bytes to decode.
///
/// # Returns
/// A vector of parsed chunks, or `ScriptError::DataTooSmall` if the data
/// is truncated.
pub fn decode_script(bytes: &[u8]) -> Result<Vec<ScriptChunk>, ScriptError> {
    let mut chunks = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let (chunk, next) = read_chunk(bytes, pos)?;
        chunks.push(chunk);
        pos = next;
    }

    Ok(chunks)
}

/// Read one chunk starting at `pos`, returning it and the next position.
///
/// This is the cursor-based form used for incremental decoding; `pos`
/// advances exactly past the consumed instruction.
///
/// # Arguments
/// * `bytes` - The raw script bytes.
/// * `pos` - Offset of the instruction to read.
///
/// # Returns
/// The chunk and the offset of the following instruction, or
/// `ScriptError::IndexOutOfRange`/`DataTooSmall` on exhaustion/truncation.
pub fn read_chunk(bytes: &[u8], pos: usize) -> Result<(ScriptChunk, usize), ScriptError> {
    if pos >= bytes.len() {
        return Err(ScriptError::IndexOutOfRange);
    }

    let op = bytes[pos];
    match op {
        OP_PUSHDATA1 => {
            if bytes.len() < pos + 2 {
                return Err(ScriptError::DataTooSmall);
            }
            let length = bytes[pos + 1] as usize;
            let start = pos + 2;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            let data = bytes[start..start + length].to_vec();
            Ok((ScriptChunk { op, data: Some(data) }, start + length))
        }
        OP_PUSHDATA2 => {
            if bytes.len() < pos + 3 {
                return Err(ScriptError::DataTooSmall);
            }
            let length = u16::from_le_bytes([bytes[pos + 1], bytes[pos + 2]]) as usize;
            let start = pos + 3;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            let data = bytes[start..start + length].to_vec();
            Ok((ScriptChunk { op, data: Some(data) }, start + length))
        }
        OP_PUSHDATA4 => {
            if bytes.len() < pos + 5 {
                return Err(ScriptError::DataTooSmall);
            }
            let length = u32::from_le_bytes([
                bytes[pos + 1],
                bytes[pos + 2],
                bytes[pos + 3],
                bytes[pos + 4],
            ]) as usize;
            let start = pos + 5;
            if bytes.len() < start + length {
                return Err(ScriptError::DataTooSmall);
            }
            let data = bytes[start..start + length].to_vec();
            Ok((ScriptChunk { op, data: Some(data) }, start + length))
        }
        op if op >= OP_DATA_1 && op <= OP_DATA_75 => {
            let length = op as usize;
            if bytes.len() < pos + 1 + length {
                return Err(ScriptError::DataTooSmall);
            }
            let data = bytes[pos + 1..pos + 1 + length].to_vec();
            Ok((ScriptChunk { op, data: Some(data) }, pos + 1 + length))
        }
        _ => Ok((ScriptChunk { op, data: None }, pos + 1)),
    }
}
