//! Data comparison and size operations for the script interpreter.
//!
//! The rest of the splice and bit-logic families (CAT, SUBSTR, INVERT,
//! AND, OR, XOR, shifts) is disabled at the protocol level and never
//! dispatches here.

use super::error::{InterpreterError, InterpreterErrorCode};
use super::parsed_opcode::ParsedOpcode;
use super::scriptnum::ScriptNumber;
use super::thread::Thread;

impl<'a> Thread<'a> {
    pub(crate) fn op_size(&mut self) -> Result<(), InterpreterError> {
        let top = self.dstack.peek_byte_array(0)?;
        self.dstack.push_int(&ScriptNumber::new(top.len() as i64));
        Ok(())
    }

    pub(crate) fn op_equal(&mut self) -> Result<(), InterpreterError> {
        let a = self.dstack.pop_byte_array()?;
        let b = self.dstack.pop_byte_array()?;
        self.dstack.push_bool(a == b);
        Ok(())
    }

    pub(crate) fn op_equalverify(&mut self, pop: &ParsedOpcode) -> Result<(), InterpreterError> {
        self.op_equal()?;
        self.abstract_verify(pop, InterpreterErrorCode::EqualVerify)
    }
}
