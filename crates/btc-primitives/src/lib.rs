/// Legacy Bitcoin-family SDK - cryptographic and wire-format primitives.
///
/// Provides the hash functions (SHA-256, SHA-1, RIPEMD-160 and their
/// Bitcoin compositions), ECDSA signing/verification over secp256k1, and
/// the VarInt/reader/writer utilities used for transaction serialization.

pub mod ecdsa;
pub mod hash;
pub mod util;

mod error;
pub use error::PrimitivesError;
