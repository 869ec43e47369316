/// Error types for script operations.
///
/// Covers parsing errors, encoding/decoding failures, and script
/// construction problems. Interpreter execution failures use the separate
/// `interpreter::InterpreterError` type with its category codes.
#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    /// An unrecognized token was encountered during ASM parsing.
    #[error("invalid opcode data")]
    InvalidOpcodeData,

    /// Attempted to use append_opcodes for a push data opcode.
    #[error("use append_push_data for push data opcodes: {0}")]
    InvalidOpcodeType(String),

    /// Invalid hex string.
    #[error("invalid hex: {0}")]
    InvalidHex(String),

    /// Script is empty when a non-empty script was expected.
    #[error("script is empty")]
    EmptyScript,

    /// Not enough data in the script to complete a push operation.
    #[error("not enough data")]
    DataTooSmall,

    /// Push data exceeds the maximum encodable size.
    #[error("data too big")]
    DataTooBig,

    /// Script read position is out of range.
    #[error("script index out of range")]
    IndexOutOfRange,

    /// The script does not match the template required by the operation.
    #[error("script does not match expected template")]
    TemplateMismatch,

    /// A compressed script payload could not be reconstructed.
    #[error("invalid compressed script")]
    InvalidCompression,

    /// Error from the primitives crate.
    #[error("primitives error: {0}")]
    Primitives(#[from] btc_primitives::PrimitivesError),
}
