//! Script execution thread, the core interpreter engine.
//!
//! A thread executes the unlocking script, carries the resulting stack
//! into the locking script, and for pay-to-script-hash spends runs the
//! revealed nested script as a third stage. All state lives in the
//! thread; nothing global is touched, so independent verifications can
//! run on separate threads freely.

use crate::opcodes::*;
use crate::Script;

use super::config::*;
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::ops_crypto::DigestKind;
use super::parsed_opcode::*;
use super::stack::*;
use super::TxContext;

/// The execution thread for the script interpreter.
pub struct Thread<'a> {
    /// The main data stack used during script execution.
    pub dstack: Stack,
    /// The alternate stack used by OP_TOALTSTACK and OP_FROMALTSTACK.
    pub astack: Stack,
    /// The parsed scripts to execute (unlocking, locking, optionally nested).
    pub scripts: Vec<ParsedScript>,
    /// Nested IF/ELSE execution state; an entry per open conditional.
    pub cond_stack: Vec<bool>,
    /// Copy of the data stack after the unlocking script, for P2SH spends.
    saved_first_stack: Vec<Vec<u8>>,
    /// Index of the currently executing script.
    pub script_idx: usize,
    /// Offset of the current instruction within the current script.
    pub script_off: usize,
    /// Offset of the most recent OP_CODESEPARATOR in the current script.
    pub last_code_sep: usize,
    /// Running count of non-push operations executed.
    pub num_ops: usize,
    /// Active script verification flags.
    pub flags: ScriptFlags,
    /// Whether this execution is a pay-to-script-hash spend.
    pub p2sh_spend: bool,
    /// Optional transaction context for signature and locktime checks.
    pub tx_context: Option<&'a dyn TxContext>,
    /// The transaction input index being verified.
    pub input_idx: usize,
}

impl<'a> Thread<'a> {
    /// Create a new execution thread from unlocking and locking scripts.
    ///
    /// Validates script sizes, parses both scripts, and applies the
    /// pay-to-script-hash push-only rule where it applies.
    pub fn new(
        unlocking_script: &Script,
        locking_script: &Script,
        flags: ScriptFlags,
        tx_context: Option<&'a dyn TxContext>,
        input_idx: usize,
    ) -> Result<Self, InterpreterError> {
        if unlocking_script.len() > MAX_SCRIPT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "unlocking script size {} is larger than the max allowed size {}",
                    unlocking_script.len(),
                    MAX_SCRIPT_SIZE
                ),
            ));
        }
        if locking_script.len() > MAX_SCRIPT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ScriptTooBig,
                format!(
                    "locking script size {} is larger than the max allowed size {}",
                    locking_script.len(),
                    MAX_SCRIPT_SIZE
                ),
            ));
        }

        // Nothing to execute means nothing on the stack at the end.
        if unlocking_script.is_empty() && locking_script.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }

        let error_on_checksig = tx_context.is_none();
        let uscript = parse_script(unlocking_script, error_on_checksig)?;
        let lscript = parse_script(locking_script, error_on_checksig)?;

        let p2sh_spend = flags.has_flag(ScriptFlags::P2SH) && locking_script.is_p2sh();
        if p2sh_spend && !is_push_only(&uscript) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NotPushOnly,
                "pay to script hash unlocking script is not push only".to_string(),
            ));
        }

        let scripts = vec![uscript, lscript];
        let script_idx = if unlocking_script.is_empty() { 1 } else { 0 };

        Ok(Thread {
            dstack: Stack::new(),
            astack: Stack::new(),
            scripts,
            cond_stack: Vec::new(),
            saved_first_stack: Vec::new(),
            script_idx,
            script_off: 0,
            last_code_sep: 0,
            num_ops: 0,
            flags,
            p2sh_spend,
            tx_context,
            input_idx,
        })
    }

    /// Check if a specific script verification flag is set.
    pub fn has_flag(&self, flag: ScriptFlags) -> bool {
        self.flags.has_flag(flag)
    }

    /// Check if any of the given script verification flags are set.
    pub fn has_any(&self, flags: &[ScriptFlags]) -> bool {
        self.flags.has_any(flags)
    }

    /// Return true if the current conditional branch is executing.
    pub fn is_branch_executing(&self) -> bool {
        self.cond_stack.iter().all(|&v| v)
    }

    /// Execute all scripts to completion.
    pub fn execute(&mut self) -> Result<(), InterpreterError> {
        loop {
            if self.step()? {
                break;
            }
        }
        self.check_final_stack()
    }

    /// Execute one instruction. Returns true if execution is complete.
    pub fn step(&mut self) -> Result<bool, InterpreterError> {
        if self.script_idx >= self.scripts.len()
            || self.script_off >= self.scripts[self.script_idx].len()
        {
            return Err(InterpreterError::new(
                InterpreterErrorCode::InvalidProgramCounter,
                format!(
                    "program counter {}:{} is past the end of the scripts",
                    self.script_idx, self.script_off
                ),
            ));
        }

        let opcode = self.scripts[self.script_idx][self.script_off].clone();
        self.execute_opcode(&opcode)?;
        self.script_off += 1;

        let combined = self.dstack.depth() + self.astack.depth();
        if combined > MAX_STACK_SIZE as i32 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::StackOverflow,
                format!(
                    "combined stack size {} > max allowed {}",
                    combined, MAX_STACK_SIZE
                ),
            ));
        }

        if self.script_off < self.scripts[self.script_idx].len() {
            return Ok(false);
        }

        // End of one script.
        if !self.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution".to_string(),
            ));
        }

        // The alt stack does not persist between scripts.
        self.astack.clear();

        self.shift_script();

        // Pay-to-script-hash: after the unlocking script, snapshot the
        // stack; after the locking script succeeds, replace the stack
        // with the snapshot and queue the revealed script as stage three.
        if self.p2sh_spend && self.script_idx <= 2 {
            match self.script_idx {
                1 => {
                    self.saved_first_stack = self.dstack.get_stack();
                }
                2 => {
                    self.check_final_stack()?;
                    let nested_bytes =
                        self.saved_first_stack.last().cloned().unwrap_or_default();
                    let nested = Script::from_bytes(&nested_bytes);
                    let pops = parse_script(&nested, false)?;
                    self.scripts.push(pops);
                    let len = self.saved_first_stack.len();
                    self.dstack
                        .set_stack(self.saved_first_stack[..len.saturating_sub(1)].to_vec());
                }
                _ => {}
            }
        }

        // Skip zero-length scripts.
        if self.script_idx < self.scripts.len()
            && self.script_off >= self.scripts[self.script_idx].len()
        {
            self.script_idx += 1;
        }

        self.last_code_sep = 0;
        Ok(self.script_idx >= self.scripts.len())
    }

    fn shift_script(&mut self) {
        self.num_ops = 0;
        self.script_off = 0;
        self.script_idx += 1;
    }

    /// Require a non-empty stack with a truthy top entry.
    fn check_final_stack(&mut self) -> Result<(), InterpreterError> {
        if self.dstack.depth() < 1 {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution".to_string(),
            ));
        }
        if !self.dstack.peek_bool(0)? {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }
        Ok(())
    }

    fn execute_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        // Oversized pushes fail regardless of execution state.
        if pop.opcode <= OP_PUSHDATA4 && pop.data.len() > MAX_SCRIPT_ELEMENT_SIZE {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ElementTooBig,
                format!(
                    "element size {} exceeds max allowed size {}",
                    pop.data.len(),
                    MAX_SCRIPT_ELEMENT_SIZE
                ),
            ));
        }

        // Disabled opcodes fail on sight, executed branch or not.
        if pop.is_disabled() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::DisabledOpcode,
                format!("attempt to execute disabled opcode {}", pop.name()),
            ));
        }

        if pop.always_illegal() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute reserved opcode {}", pop.name()),
            ));
        }

        // Count non-push operations.
        if pop.opcode > OP_16 {
            self.num_ops += 1;
            if self.num_ops > MAX_OPS_PER_SCRIPT {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::TooManyOperations,
                    format!("exceeded max operation limit of {}", MAX_OPS_PER_SCRIPT),
                ));
            }
        }

        // Instructions in a skipped branch are not executed, but the
        // conditional opcodes themselves still maintain nesting state.
        if !self.is_branch_executing() && !pop.is_conditional() {
            return Ok(());
        }

        self.dispatch_opcode(pop)
    }

    fn dispatch_opcode(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match pop.opcode {
            OP_0 => {
                self.dstack.push_byte_array(vec![]);
                Ok(())
            }
            op if (OP_DATA_1..=OP_DATA_75).contains(&op) => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_PUSHDATA1 | OP_PUSHDATA2 | OP_PUSHDATA4 => {
                self.dstack.push_byte_array(pop.data.clone());
                Ok(())
            }
            OP_1NEGATE => {
                self.dstack.push_byte_array(vec![0x81]);
                Ok(())
            }
            OP_RESERVED | OP_VER => self.op_reserved(pop),
            op if (OP_1..=OP_16).contains(&op) => {
                self.dstack.push_byte_array(vec![op - (OP_1 - 1)]);
                Ok(())
            }
            OP_NOP => Ok(()),
            OP_IF => self.op_if(),
            OP_NOTIF => self.op_notif(),
            OP_ELSE => self.op_else(pop),
            OP_ENDIF => self.op_endif(pop),
            OP_VERIFY => self.op_verify(pop),
            OP_RETURN => self.op_return(),

            // Locktime
            OP_CHECKLOCKTIMEVERIFY => self.op_check_locktime_verify(),

            // Stack ops
            OP_TOALTSTACK => self.op_to_alt_stack(),
            OP_FROMALTSTACK => self.op_from_alt_stack(),
            OP_2DROP => self.dstack.drop_n(2),
            OP_2DUP => self.dstack.dup_n(2),
            OP_3DUP => self.dstack.dup_n(3),
            OP_2OVER => self.dstack.over_n(2),
            OP_2ROT => self.dstack.rot_n(2),
            OP_2SWAP => self.dstack.swap_n(2),
            OP_IFDUP => self.op_ifdup(),
            OP_DEPTH => {
                let d = self.dstack.depth();
                self.dstack
                    .push_int(&super::scriptnum::ScriptNumber::new(d as i64));
                Ok(())
            }
            OP_DROP => self.dstack.drop_n(1),
            OP_DUP => self.dstack.dup_n(1),
            OP_NIP => self.dstack.nip_n_discard(1),
            OP_OVER => self.dstack.over_n(1),
            OP_PICK => self.op_pick(),
            OP_ROLL => self.op_roll(),
            OP_ROT => self.dstack.rot_n(1),
            OP_SWAP => self.dstack.swap_n(1),
            OP_TUCK => self.dstack.tuck(),

            // Splice / bit logic survivors
            OP_SIZE => self.op_size(),
            OP_EQUAL => self.op_equal(),
            OP_EQUALVERIFY => self.op_equalverify(pop),
            OP_RESERVED1 | OP_RESERVED2 => self.op_reserved(pop),

            // Arithmetic
            OP_1ADD => self.op_unary_int(|m| {
                m.incr();
            }),
            OP_1SUB => self.op_unary_int(|m| {
                m.decr();
            }),
            OP_NEGATE => self.op_unary_int(|m| {
                m.neg();
            }),
            OP_ABS => self.op_unary_int(|m| {
                m.abs();
            }),
            OP_NOT => self.op_not(),
            OP_0NOTEQUAL => self.op_0notequal(),
            OP_ADD => self.op_add(),
            OP_SUB => self.op_sub(),
            OP_BOOLAND => self.op_bool_binop(|a, b| !a.is_zero() && !b.is_zero()),
            OP_BOOLOR => self.op_bool_binop(|a, b| !a.is_zero() || !b.is_zero()),
            OP_NUMEQUAL => self.op_bool_binop(|a, b| a.equal(b)),
            OP_NUMEQUALVERIFY => self.op_numequalverify(pop),
            OP_NUMNOTEQUAL => self.op_bool_binop(|a, b| !a.equal(b)),
            OP_LESSTHAN => self.op_bool_binop(|a, b| a.less_than(b)),
            OP_GREATERTHAN => self.op_bool_binop(|a, b| a.greater_than(b)),
            OP_LESSTHANOREQUAL => self.op_bool_binop(|a, b| a.less_than_or_equal(b)),
            OP_GREATERTHANOREQUAL => self.op_bool_binop(|a, b| a.greater_than_or_equal(b)),
            OP_MIN => self.op_min(),
            OP_MAX => self.op_max(),
            OP_WITHIN => self.op_within(),

            // Crypto
            OP_RIPEMD160 => self.op_hash(DigestKind::Ripemd160),
            OP_SHA1 => self.op_hash(DigestKind::Sha1),
            OP_SHA256 => self.op_hash(DigestKind::Sha256),
            OP_HASH160 => self.op_hash(DigestKind::Hash160),
            OP_HASH256 => self.op_hash(DigestKind::Hash256),
            OP_CODESEPARATOR => {
                self.last_code_sep = self.script_off;
                Ok(())
            }
            OP_CHECKSIG => self.op_checksig(),
            OP_CHECKSIGVERIFY => self.op_checksigverify(pop),
            OP_CHECKMULTISIG => self.op_checkmultisig(),
            OP_CHECKMULTISIGVERIFY => self.op_checkmultisigverify(pop),

            // Upgrade NOPs always succeed.
            OP_NOP1 | OP_NOP3 | OP_NOP4 | OP_NOP5 | OP_NOP6 | OP_NOP7 | OP_NOP8 | OP_NOP9
            | OP_NOP10 => Ok(()),

            // Everything else is invalid.
            _ => Err(InterpreterError::new(
                InterpreterErrorCode::ReservedOpcode,
                format!("attempt to execute invalid opcode {}", pop.name()),
            )),
        }
    }
}
