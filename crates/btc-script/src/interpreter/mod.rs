//! Full script interpreter.
//!
//! Executes locking and unlocking scripts to decide whether a spend is
//! authorized, supporting the legacy opcode set, the pay-to-script-hash
//! evaluation rule, and the strict-encoding verification flags.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate directly.
//! Callers provide a [`TxContext`] trait implementation that handles
//! signature hash computation and signature verification, keeping the
//! engine a pure function over its explicit arguments. Each execution
//! owns its stacks; nothing is cached or shared between runs, so
//! independent verifications can be parallelized freely.
//!
//! # Example
//!
//! ```ignore
//! use btc_script::interpreter::{Engine, ScriptFlags};
//!
//! let engine = Engine::new();
//! engine.execute(
//!     &unlocking_script,
//!     &locking_script,
//!     ScriptFlags::P2SH,
//!     Some(&checker),
//!     0,
//! )?;
//! ```

pub mod config;
pub mod error;
pub mod flags;
pub mod parsed_opcode;
pub mod scriptnum;
pub mod stack;
pub mod thread;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use error::{is_error_code, InterpreterError, InterpreterErrorCode};
pub use flags::ScriptFlags;
pub use ops_crypto::strip_code_separators;
pub use parsed_opcode::{ParsedOpcode, ParsedScript};
pub use scriptnum::ScriptNumber;
pub use stack::Stack;

use crate::Script;
use thread::Thread;

/// Transaction context trait: signature and locktime data injected by
/// the caller, so the interpreter has no dependency on the transaction
/// structure and no ambient global state.
pub trait TxContext {
    /// Verify a signature against a public key for the given input.
    ///
    /// `full_sig` includes the hash-type byte at the end. `script_code`
    /// is the portion of the locking script the signature commits to.
    ///
    /// Returns Ok(true) if valid, Ok(false) if invalid, Err on failure.
    fn verify_signature(
        &self,
        full_sig: &[u8],
        pub_key: &[u8],
        script_code: &Script,
        input_idx: usize,
        hash_type: u32,
    ) -> Result<bool, InterpreterError>;

    /// Get the transaction lock time.
    fn lock_time(&self) -> u32;

    /// Get the sequence number of the given input.
    fn input_sequence(&self, input_idx: usize) -> u32;
}

/// The script execution engine.
pub struct Engine;

impl Engine {
    pub fn new() -> Self {
        Engine
    }

    /// Execute unlocking + locking scripts.
    ///
    /// # Arguments
    /// * `unlocking_script` - The input's unlocking (signature) script.
    /// * `locking_script` - The output's locking (pubkey) script.
    /// * `flags` - Verification flags.
    /// * `tx_context` - Optional transaction context for signature checks.
    /// * `input_idx` - The input index being verified.
    pub fn execute(
        &self,
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&dyn TxContext>,
        input_idx: usize,
    ) -> Result<(), InterpreterError> {
        let mut thread = Thread::new(unlocking_script, locking_script, flags, tx_context, input_idx)?;
        thread.execute()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}
