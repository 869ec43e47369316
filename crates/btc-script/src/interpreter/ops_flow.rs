//! Flow control and locktime operations for the script interpreter.

use super::config::{LOCKTIME_NUMBER_LENGTH, LOCKTIME_THRESHOLD};
use super::error::{InterpreterError, InterpreterErrorCode};
use super::flags::ScriptFlags;
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

/// Sequence number of a finalized input.
const MAX_TX_IN_SEQUENCE_NUM: u32 = 0xffff_ffff;

impl<'a> Thread<'a> {
    pub(crate) fn op_reserved(&self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::ReservedOpcode,
            format!("attempt to execute reserved opcode {}", pop.name()),
        ))
    }

    pub(crate) fn op_if(&mut self) -> Result<(), InterpreterError> {
        let mut value = false;
        if self.is_branch_executing() {
            value = self.dstack.pop_bool()?;
        }
        self.cond_stack.push(value);
        Ok(())
    }

    pub(crate) fn op_notif(&mut self) -> Result<(), InterpreterError> {
        let mut value = false;
        if self.is_branch_executing() {
            value = !self.dstack.pop_bool()?;
        }
        self.cond_stack.push(value);
        Ok(())
    }

    pub(crate) fn op_else(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        match self.cond_stack.last_mut() {
            Some(top) => {
                *top = !*top;
                Ok(())
            }
            None => Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!("encountered opcode {} with no open conditional", pop.name()),
            )),
        }
    }

    pub(crate) fn op_endif(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        if self.cond_stack.pop().is_none() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                format!("encountered opcode {} with no open conditional", pop.name()),
            ));
        }
        Ok(())
    }

    pub(crate) fn op_verify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.abstract_verify(pop, InterpreterErrorCode::Verify)
    }

    /// Pop the top boolean; a false value fails with the given code.
    pub(crate) fn abstract_verify(
        &mut self,
        pop: &ParsedOpcode,
        code: InterpreterErrorCode,
    ) -> Result<(), InterpreterError> {
        let verified = self.dstack.pop_bool()?;
        if !verified {
            return Err(InterpreterError::new(code, format!("{} failed", pop.name())));
        }
        Ok(())
    }

    pub(crate) fn op_return(&mut self) -> Result<(), InterpreterError> {
        Err(InterpreterError::new(
            InterpreterErrorCode::EarlyReturn,
            "script returned early".to_string(),
        ))
    }

    pub(crate) fn op_check_locktime_verify(&mut self) -> Result<(), InterpreterError> {
        // Without the flag this opcode is the upgrade NOP it once was.
        if !self.has_flag(ScriptFlags::LOCKTIME) {
            return Ok(());
        }

        let ctx = self.tx_context.ok_or_else(|| {
            InterpreterError::new(
                InterpreterErrorCode::InvalidParams,
                "no transaction context for CHECKLOCKTIMEVERIFY".to_string(),
            )
        })?;

        // Peeked, not popped: the operand stays for the script to drop.
        let top = self.dstack.peek_byte_array(0)?;
        let lock_time = ScriptNumber::from_bytes(&top, LOCKTIME_NUMBER_LENGTH)?;

        if lock_time.less_than_int(0) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::NegativeLockTime,
                format!("negative lock time: {}", lock_time.to_i64()),
            ));
        }

        verify_lock_time(ctx.lock_time() as i64, LOCKTIME_THRESHOLD, lock_time.to_i64())?;

        // A finalized input would make the transaction valid regardless of
        // lock time, defeating the check.
        if ctx.input_sequence(self.input_idx) == MAX_TX_IN_SEQUENCE_NUM {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnsatisfiedLockTime,
                "transaction input is finalized".to_string(),
            ));
        }

        Ok(())
    }
}

/// Compare a required lock time against the transaction's own.
///
/// Both values must be on the same side of `threshold` (block heights
/// below, timestamps above), and the requirement must not exceed the
/// transaction lock time.
pub(crate) fn verify_lock_time(
    tx_lock_time: i64,
    threshold: i64,
    lock_time: i64,
) -> Result<(), InterpreterError> {
    if (tx_lock_time < threshold && lock_time >= threshold)
        || (tx_lock_time >= threshold && lock_time < threshold)
    {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "mismatched locktime types -- tx locktime {}, required locktime {}",
                tx_lock_time, lock_time
            ),
        ));
    }
    if lock_time > tx_lock_time {
        return Err(InterpreterError::new(
            InterpreterErrorCode::UnsatisfiedLockTime,
            format!(
                "locktime requirement not satisfied -- locktime is greater than the transaction locktime: {} > {}",
                lock_time, tx_lock_time
            ),
        ));
    }
    Ok(())
}
