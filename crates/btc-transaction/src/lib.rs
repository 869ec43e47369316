/// Legacy Bitcoin-family SDK - Transaction verification and signing.
///
/// Provides the Transaction type with inputs, outputs, binary/hex
/// serialization, legacy signature hash computation, script verification
/// against previous outputs, and unlocking-script signing/combination.

pub mod input;
pub mod output;
pub mod sighash;
pub mod signer;
pub mod transaction;
pub mod verify;

mod error;
pub use error::TransactionError;
pub use input::TransactionInput;
pub use output::TransactionOutput;
pub use transaction::Transaction;
pub use verify::{verify_input, verify_script, TxSignatureChecker};
