/// Error types for primitive operations.
#[derive(Debug, thiserror::Error)]
pub enum PrimitivesError {
    /// A private key was malformed or out of range.
    #[error("invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// A public key could not be parsed as a secp256k1 point.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// A signature could not be parsed or was otherwise malformed.
    #[error("invalid signature: {0}")]
    InvalidSignature(String),

    /// A binary read ran past the end of the input.
    #[error("unexpected end of data")]
    UnexpectedEof,
}
