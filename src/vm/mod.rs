use std::collections::HashMap;

use crate::bytecode::{Instruction, Program};
use crate::diagnostic::{Diagnostic, Diagnostics};
use crate::value::{Object, Value};

pub mod actions;
mod command;
pub mod stack;
pub mod variables;

pub use actions::Opcode;
pub use stack::Stack;
pub use variables::Variables;

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("{0}")]
    Raised(String),
    #[error("Stack underflow")]
    StackUnderflow,
    #[error("Invalid stack index {depth}")]
    InvalidStackIndex { depth: i64 },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid opcode {opcode} at instruction {index}")]
    InvalidOpcode { opcode: u8, index: usize },
    #[error("Invalid constant index {index}")]
    InvalidConstant { index: i64 },
    #[error("Invalid function index {index}")]
    InvalidBuiltin { index: i64 },
    #[error("'{operation}' is not allowed in sandboxed mode")]
    SandboxViolation { operation: String },
    #[error("[line {line}] {message}")]
    Uncaught { message: String, line: i32 },
}

impl VmError {
    /// Catchable faults are converted into a throw; the rest halt the VM.
    pub fn is_catchable(&self) -> bool {
        matches!(
            self,
            VmError::Raised(_) | VmError::StackUnderflow | VmError::InvalidStackIndex { .. } | VmError::Io(_)
        )
    }

    pub fn exit_code(&self) -> i32 {
        match self {
            VmError::Uncaught { .. } | VmError::SandboxViolation { .. } => 1,
            _ => 2,
        }
    }
}

pub type VmResult<T> = Result<T, VmError>;

// ── Frames ───────────────────────────────────────────────────────────

/// One active subroutine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnFrame {
    pub return_index: usize,
    pub saved_stack_size: usize,
    pub captured_params: Value,
}

/// One active protected region.
#[derive(Debug, Clone, PartialEq)]
pub struct ExceptFrame {
    pub handler_index: usize,
    pub saved_stack_size: usize,
    pub saved_call_depth: usize,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct VmConfig {
    pub sandboxed: bool,
    /// Fixed RNG seed; a random seed is drawn when absent.
    pub seed: Option<u64>,
    pub argv: Vec<String>,
    pub diagnostics: Diagnostics,
}

// ── VM ───────────────────────────────────────────────────────────────

pub struct Vm {
    pub stack: Stack,
    pub variables: Variables,
    instructions: Vec<Instruction>,
    constants: Vec<Value>,
    ip: usize,
    next_ip: Option<usize>,
    sandboxed: bool,
    pub last_cmd_result: Value,
    cache: HashMap<i64, HashMap<String, Value>>,
    frames: Vec<ReturnFrame>,
    catches: Vec<ExceptFrame>,
    rng: fastrand::Rng,
    pub diagnostics: Diagnostics,
}

impl Vm {
    pub fn new(program: Program, config: VmConfig) -> Self {
        let version = program.version.unwrap_or_else(|| env!("CARGO_PKG_VERSION").to_string());
        let rng = match config.seed {
            Some(seed) => fastrand::Rng::with_seed(seed),
            None => fastrand::Rng::new(),
        };
        Vm {
            stack: Stack::new(),
            variables: Variables::new(version, config.argv),
            instructions: program.instructions,
            constants: program.constants,
            ip: 0,
            next_ip: None,
            sandboxed: config.sandboxed,
            last_cmd_result: Value::Null,
            cache: HashMap::new(),
            frames: Vec::new(),
            catches: Vec::new(),
            rng,
            diagnostics: config.diagnostics,
        }
    }

    /// Runs until the instruction pointer leaves the program or a fatal
    /// error halts it. Catchable faults are routed through [`Vm::throw`].
    pub fn run(&mut self) -> VmResult<()> {
        while let Some(&instruction) = self.instructions.get(self.ip) {
            let opcode = Opcode::decode(instruction.opcode)
                .ok_or(VmError::InvalidOpcode { opcode: instruction.opcode, index: self.ip })?;
            if let Err(fault) = self.execute(opcode, instruction) {
                if !fault.is_catchable() {
                    return Err(fault);
                }
                self.next_ip = None;
                self.stack.push(fault.to_string());
                self.execute(Opcode::PopCatchOrThrow, instruction)?;
            }
            self.ip = self.next_ip.take().unwrap_or(self.ip + 1);
        }
        Ok(())
    }

    pub fn ip(&self) -> usize {
        self.ip
    }

    pub fn frames(&self) -> &[ReturnFrame] {
        &self.frames
    }

    pub fn catches(&self) -> &[ExceptFrame] {
        &self.catches
    }

    /// Execution continues at `target` instead of the next instruction.
    fn jump_to(&mut self, target: usize) {
        self.next_ip = Some(target);
    }

    fn constant(&self, index: i64) -> VmResult<&Value> {
        usize::try_from(index)
            .ok()
            .and_then(|i| self.constants.get(i))
            .ok_or(VmError::InvalidConstant { index })
    }

    fn current_params(&self) -> Option<&Value> {
        self.frames.last().map(|f| &f.captured_params)
    }

    fn line_at(&self, index: usize) -> i32 {
        self.instructions.get(index).map_or(0, |i| i.line_no)
    }

    fn warn(&mut self, message: impl Into<String>, line: i32) {
        self.diagnostics.emit(Diagnostic::warning(message).with_line(line));
    }

    // ── Unwind ───────────────────────────────────────────────────────

    /// Pops the message on top of the stack and unwinds to the nearest
    /// except frame, pushing `{message, line, stack}` for its handler.
    fn throw(&mut self, line: i32) -> VmResult<()> {
        let message = self.stack.pop().to_string();
        let Some(frame) = self.catches.pop() else {
            return Err(VmError::Uncaught { message, line });
        };

        self.jump_to(frame.handler_index);
        self.stack.truncate(frame.saved_stack_size);

        let depth = frame.saved_call_depth.min(self.frames.len());
        let mut trace: Vec<Value> = self.frames[depth..]
            .iter()
            .map(|f| Value::from(self.line_at(f.return_index) as f64))
            .collect();
        trace.push(Value::from(line as f64));
        self.frames.truncate(depth);

        let mut error = Object::new();
        error.insert("message".into(), Value::String(message));
        error.insert("line".into(), Value::from(line as f64));
        error.insert("stack".into(), Value::Array(trace));
        self.stack.push(Value::Object(error));
        Ok(())
    }
}
