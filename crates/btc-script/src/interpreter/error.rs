//! Interpreter error types.
//!
//! Every evaluation failure carries an `InterpreterErrorCode` naming its
//! category. A script that merely evaluates to false (`EvalFalse`) is a
//! normal, non-exceptional outcome; malformed bytes (`MalformedPush`) and
//! resource violations are distinct categories, and tests assert on the
//! code rather than on a single pass/fail bit.

use std::fmt;

/// Error codes for the script interpreter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InterpreterErrorCode {
    /// Missing transaction context for an opcode that needs one.
    InvalidParams,
    /// OP_RETURN was executed.
    EarlyReturn,
    /// The stack was empty at the end of execution.
    EmptyStack,
    /// The top stack entry was false at the end of execution.
    EvalFalse,
    /// The program counter stepped outside the script bounds.
    InvalidProgramCounter,
    /// A script exceeded the maximum allowed size.
    ScriptTooBig,
    /// A pushed element exceeded the maximum allowed size.
    ElementTooBig,
    /// The operation count limit was exceeded.
    TooManyOperations,
    /// The combined stack depth limit was exceeded.
    StackOverflow,
    /// CHECKMULTISIG public key count out of range.
    InvalidPubKeyCount,
    /// CHECKMULTISIG signature count out of range.
    InvalidSignatureCount,
    /// A numeric operand was wider than allowed.
    NumberTooBig,
    /// OP_VERIFY failed.
    Verify,
    /// OP_EQUALVERIFY failed.
    EqualVerify,
    /// OP_NUMEQUALVERIFY failed.
    NumEqualVerify,
    /// OP_CHECKSIGVERIFY failed.
    CheckSigVerify,
    /// OP_CHECKMULTISIGVERIFY failed.
    CheckMultiSigVerify,
    /// A protocol-disabled opcode appeared in the script.
    DisabledOpcode,
    /// A reserved or unknown opcode was executed.
    ReservedOpcode,
    /// The script bytes could not be decoded into instructions.
    MalformedPush,
    /// A stack operation needed more items than were present.
    InvalidStackOperation,
    /// IF/ELSE/ENDIF nesting was unbalanced.
    UnbalancedConditional,
    /// The hash type byte of a signature was invalid.
    InvalidSigHashType,
    /// Signature shorter than any valid DER encoding.
    SigTooShort,
    /// Signature longer than any valid DER encoding.
    SigTooLong,
    /// Signature missing the DER sequence marker.
    SigInvalidSeqID,
    /// Signature DER length byte disagrees with the actual length.
    SigInvalidDataLen,
    /// Signature missing the S integer marker.
    SigMissingSTypeID,
    /// Signature missing the S length byte.
    SigMissingSLen,
    /// Signature S length inconsistent with the total length.
    SigInvalidSLen,
    /// Signature R integer marker invalid.
    SigInvalidRIntID,
    /// Signature R length is zero.
    SigZeroRLen,
    /// Signature R value is negative.
    SigNegativeR,
    /// Signature R value has excess padding.
    SigTooMuchRPadding,
    /// Signature S integer marker invalid.
    SigInvalidSIntID,
    /// Signature S length is zero.
    SigZeroSLen,
    /// Signature S value is negative.
    SigNegativeS,
    /// Signature S value has excess padding.
    SigTooMuchSPadding,
    /// Signature S value is in the upper half of the curve order.
    SigHighS,
    /// An unlocking script required to be push-only was not.
    NotPushOnly,
    /// A public key was not canonically encoded.
    PubKeyType,
    /// A lock-time operand was negative.
    NegativeLockTime,
    /// A lock-time requirement was not satisfied.
    UnsatisfiedLockTime,
}

impl fmt::Display for InterpreterErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// A script interpreter error with an error code and description.
#[derive(Debug, Clone)]
pub struct InterpreterError {
    /// The failure category.
    pub code: InterpreterErrorCode,
    /// Human-readable detail for diagnostics.
    pub description: String,
}

impl InterpreterError {
    pub fn new(code: InterpreterErrorCode, description: String) -> Self {
        InterpreterError { code, description }
    }
}

impl fmt::Display for InterpreterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description)
    }
}

impl std::error::Error for InterpreterError {}

/// Check if an error has a specific error code.
pub fn is_error_code(err: &InterpreterError, code: InterpreterErrorCode) -> bool {
    err.code == code
}
