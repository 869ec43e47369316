/// Error types for transaction operations.
#[derive(Debug, thiserror::Error)]
pub enum TransactionError {
    /// The transaction structure is invalid (e.g. an index out of range).
    #[error("invalid transaction: {0}")]
    InvalidTransaction(String),

    /// An unlocking script could not be produced (missing keys, unknown
    /// template, missing redeem script).
    #[error("signing error: {0}")]
    SigningError(String),

    /// An error occurred during binary/hex (de)serialization.
    #[error("serialization error: {0}")]
    SerializationError(String),

    /// An underlying script error (forwarded from `btc-script`).
    #[error("script error: {0}")]
    Script(#[from] btc_script::ScriptError),

    /// An underlying primitives error (forwarded from `btc-primitives`).
    #[error("primitives error: {0}")]
    Primitives(#[from] btc_primitives::PrimitivesError),
}
