use crate::builtins::{Builtin, Context};
use crate::bytecode::Instruction;
use crate::value::Value;

use super::{ExceptFrame, ReturnFrame, Vm, VmError, VmResult};

/// Action table. Discriminants are the 1-based wire opcodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opcode {
    Call = 1,
    Set,
    Get,
    Push,
    Pop,
    RunCommand,
    PushCmdResult,
    PushIndex,
    PopGotoIndex,
    Copy,
    DeleteVar,
    Swap,
    PopUntilNull,
    GetCacheElseJump,
    SetCache,
    DeleteCache,
    PushCatchLoc,
    VariableInsert,
    Destructure,
    PopCatch,
    /// Reserved unwind handler; reachable only through a throw.
    PopCatchOrThrow,
}

const WIRE: [Opcode; 20] = [
    Opcode::Call,
    Opcode::Set,
    Opcode::Get,
    Opcode::Push,
    Opcode::Pop,
    Opcode::RunCommand,
    Opcode::PushCmdResult,
    Opcode::PushIndex,
    Opcode::PopGotoIndex,
    Opcode::Copy,
    Opcode::DeleteVar,
    Opcode::Swap,
    Opcode::PopUntilNull,
    Opcode::GetCacheElseJump,
    Opcode::SetCache,
    Opcode::DeleteCache,
    Opcode::PushCatchLoc,
    Opcode::VariableInsert,
    Opcode::Destructure,
    Opcode::PopCatch,
];

impl Opcode {
    pub fn decode(wire: u8) -> Option<Opcode> {
        WIRE.get(usize::from(wire).checked_sub(1)?).copied()
    }

    pub fn wire(self) -> u8 {
        self as u8
    }
}

/// Non-negative operand as an index; negatives clamp to 0.
fn index_operand(operand: i64) -> usize {
    usize::try_from(operand).unwrap_or(0)
}

impl Vm {
    pub(crate) fn execute(&mut self, op: Opcode, ins: Instruction) -> VmResult<()> {
        match op {
            Opcode::Call => self.call(ins),
            Opcode::Set => {
                let name = self.constant(ins.operand_0)?.to_string();
                let value = self.stack.pop();
                self.variables.set(name, value);
                Ok(())
            }
            Opcode::Get => {
                let name = self.constant(ins.operand_0)?.to_string();
                let value = self.variables.get(&name, self.current_params());
                self.stack.push(value);
                Ok(())
            }
            Opcode::Push => {
                let value = self.constant(ins.operand_0)?.clone();
                self.stack.push(value);
                Ok(())
            }
            Opcode::Pop => {
                self.stack.pop();
                Ok(())
            }
            Opcode::RunCommand => self.run_command(ins.line_no),
            Opcode::PushCmdResult => {
                self.stack.push(self.last_cmd_result.clone());
                Ok(())
            }
            Opcode::PushIndex => {
                let captured_params = usize::try_from(ins.operand_0)
                    .ok()
                    .and_then(|depth| self.stack.peek_at(depth))
                    .cloned()
                    .unwrap_or_default();
                self.frames.push(ReturnFrame {
                    return_index: self.ip + 1,
                    saved_stack_size: self.stack.len().saturating_sub(1),
                    captured_params,
                });
                Ok(())
            }
            Opcode::PopGotoIndex => {
                let Some(frame) = self.frames.pop() else {
                    self.warn("Return without an active subroutine call. Ignoring!", ins.line_no);
                    return Ok(());
                };
                self.jump_to(frame.return_index + 1);
                // the call site decides whether the subroutine's value stays on the stack
                let keep = self.instructions.get(frame.return_index).is_some_and(|i| i.operand_0 != 0);
                if !keep {
                    self.last_cmd_result = self.stack.pop();
                    self.stack.truncate(frame.saved_stack_size);
                }
                Ok(())
            }
            Opcode::Copy => {
                let value = usize::try_from(ins.operand_0)
                    .ok()
                    .and_then(|depth| self.stack.peek_at(depth))
                    .cloned()
                    .ok_or(VmError::InvalidStackIndex { depth: ins.operand_0 })?;
                self.stack.push(value);
                Ok(())
            }
            Opcode::DeleteVar => {
                let name = self.constant(ins.operand_0)?.to_string();
                self.variables.delete(&name);
                Ok(())
            }
            Opcode::Swap => {
                if self.stack.swap_top() { Ok(()) } else { Err(VmError::StackUnderflow) }
            }
            Opcode::PopUntilNull => {
                self.pop_until_null(ins.operand_0);
                Ok(())
            }
            Opcode::GetCacheElseJump => {
                let key = self.cache_key();
                match self.cache.get(&ins.operand_0).and_then(|c| c.get(&key)) {
                    Some(hit) => {
                        let hit = hit.clone();
                        self.stack.push(hit);
                    }
                    None => self.jump_to(index_operand(ins.operand_1)),
                }
                Ok(())
            }
            Opcode::SetCache => {
                let key = self.cache_key();
                let value = self.stack.peek().clone();
                self.cache.entry(ins.operand_0).or_default().insert(key, value);
                Ok(())
            }
            Opcode::DeleteCache => {
                self.cache.remove(&ins.operand_0);
                Ok(())
            }
            Opcode::PushCatchLoc => {
                self.catches.push(ExceptFrame {
                    handler_index: index_operand(ins.operand_0),
                    saved_stack_size: self.stack.len(),
                    saved_call_depth: self.frames.len(),
                });
                Ok(())
            }
            Opcode::VariableInsert => {
                let value = self.stack.pop();
                let path = self.stack.pop();
                let name = self.stack.pop().to_string();
                if let Err(reason) = self.variables.insert_into(&name, &path, value) {
                    self.warn(reason.to_string(), ins.line_no);
                }
                Ok(())
            }
            Opcode::Destructure => {
                let values = self.stack.pop().into_array();
                let names = self.constant(ins.operand_0)?.to_array();
                for (i, name) in names.iter().enumerate() {
                    let value = values.get(i).cloned().unwrap_or_default();
                    self.variables.set(name.to_string(), value);
                }
                Ok(())
            }
            Opcode::PopCatch => {
                self.catches.pop();
                Ok(())
            }
            Opcode::PopCatchOrThrow => self.throw(ins.line_no),
        }
    }

    fn call(&mut self, ins: Instruction) -> VmResult<()> {
        let builtin = Builtin::from_index(ins.operand_0).ok_or(VmError::InvalidBuiltin { index: ins.operand_0 })?;
        if self.sandboxed && builtin.is_sandboxed() {
            return Err(VmError::SandboxViolation { operation: builtin.name().to_string() });
        }
        let mut ctx = Context {
            stack: &mut self.stack,
            variables: &self.variables,
            rng: &mut self.rng,
            diagnostics: &mut self.diagnostics,
            arg: ins.operand_1,
            line: ins.line_no,
            jump: None,
        };
        builtin.call(&mut ctx)?;
        if let Some(target) = ctx.jump {
            self.jump_to(target);
        }
        Ok(())
    }

    fn cache_key(&self) -> String {
        self.current_params().unwrap_or(&Value::Null).fingerprint()
    }

    fn pop_until_null(&mut self, keep: i64) {
        let mut kept = Vec::new();
        for _ in 0..keep.max(0) {
            if self.stack.is_empty() || self.stack.peek().is_null() {
                break;
            }
            kept.push(self.stack.pop());
        }
        while !self.stack.is_empty() {
            if self.stack.pop().is_null() {
                break;
            }
        }
        for value in kept.into_iter().rev() {
            self.stack.push(value);
        }
    }
}
