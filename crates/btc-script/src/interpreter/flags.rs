//! Script verification flags (bitmask).

use std::ops::{BitAnd, BitOr, BitOrAssign};

/// Script verification flags controlling interpreter behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScriptFlags(pub u32);

impl ScriptFlags {
    /// No extra verification rules.
    pub const NONE: ScriptFlags = ScriptFlags(0);
    /// Evaluate pay-to-script-hash locking scripts as nested scripts.
    pub const P2SH: ScriptFlags = ScriptFlags(1 << 0);
    /// Require canonical public keys and hash types on signature checks.
    pub const STRICT_ENC: ScriptFlags = ScriptFlags(1 << 1);
    /// Require strict-DER, low-S signature encodings.
    pub const DER_SIG: ScriptFlags = ScriptFlags(1 << 2);
    /// Enforce OP_CHECKLOCKTIMEVERIFY (otherwise it behaves as a NOP).
    pub const LOCKTIME: ScriptFlags = ScriptFlags(1 << 3);

    /// Return true if all bits of `flag` are set.
    pub fn has_flag(self, flag: ScriptFlags) -> bool {
        self.0 & flag.0 == flag.0
    }

    /// Return true if any of the given flags are set.
    pub fn has_any(self, flags: &[ScriptFlags]) -> bool {
        flags.iter().any(|f| self.has_flag(*f))
    }

    /// Set all bits of `flag`.
    pub fn add_flag(&mut self, flag: ScriptFlags) {
        self.0 |= flag.0;
    }
}

impl BitOr for ScriptFlags {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self {
        ScriptFlags(self.0 | rhs.0)
    }
}

impl BitOrAssign for ScriptFlags {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl BitAnd for ScriptFlags {
    type Output = Self;
    fn bitand(self, rhs: Self) -> Self {
        ScriptFlags(self.0 & rhs.0)
    }
}
