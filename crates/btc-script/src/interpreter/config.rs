//! Interpreter resource limits.
//!
//! Cost is bounded structurally rather than by wall-clock timeouts: the
//! operation count and stack ceilings below are the system's substitute
//! for a timeout. All values are consensus-critical.

/// Maximum number of non-push operations per script.
pub const MAX_OPS_PER_SCRIPT: usize = 201;

/// Maximum combined depth of the data and alt stacks.
pub const MAX_STACK_SIZE: usize = 1000;

/// Maximum script size in bytes.
pub const MAX_SCRIPT_SIZE: usize = 10_000;

/// Maximum size of a single stack element in bytes.
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;

/// Maximum byte length of a numeric operand.
pub const MAX_SCRIPT_NUMBER_LENGTH: usize = 4;

/// Byte length allowed for lock-time operands (one more than numeric
/// operands, since lock times exceed the 4-byte signed range).
pub const LOCKTIME_NUMBER_LENGTH: usize = 5;

/// Maximum number of public keys in a CHECKMULTISIG.
pub const MAX_PUB_KEYS_PER_MULTISIG: usize = 20;

/// Threshold separating block-height lock times from timestamp lock times.
pub const LOCKTIME_THRESHOLD: i64 = 500_000_000;
