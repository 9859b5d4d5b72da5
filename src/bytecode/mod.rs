use std::path::Path;

use serde::Deserialize;

use crate::value::Value;

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed bytecode: {0}")]
    Json(#[from] serde_json::Error),
}

// ── Instruction ──────────────────────────────────────────────────────

/// One unit of bytecode. The opcode is 1-based on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(from = "RawInstruction")]
pub struct Instruction {
    pub opcode: u8,
    pub operand_0: i64,
    pub operand_1: i64,
    pub line_no: i32,
}

impl Instruction {
    pub fn new(opcode: u8, operand_0: i64, operand_1: i64, line_no: i32) -> Self {
        Instruction { opcode, operand_0, operand_1, line_no }
    }
}

// Accepts `[op, a, b, line]` (trailing fields optional) or the named form.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInstruction {
    Packed(Vec<i64>),
    Named {
        opcode: i64,
        #[serde(default)]
        operand_0: i64,
        #[serde(default)]
        operand_1: i64,
        #[serde(default)]
        line_no: i64,
    },
}

impl From<RawInstruction> for Instruction {
    fn from(raw: RawInstruction) -> Self {
        let (opcode, operand_0, operand_1, line_no) = match raw {
            RawInstruction::Packed(fields) => {
                let at = |i: usize| fields.get(i).copied().unwrap_or(0);
                (at(0), at(1), at(2), at(3))
            }
            RawInstruction::Named { opcode, operand_0, operand_1, line_no } => {
                (opcode, operand_0, operand_1, line_no)
            }
        };
        Instruction {
            // out-of-range opcodes become 0, which the dispatcher rejects
            opcode: u8::try_from(opcode).unwrap_or(0),
            operand_0,
            operand_1,
            line_no: i32::try_from(line_no).unwrap_or(i32::MAX),
        }
    }
}

// ── Program ──────────────────────────────────────────────────────────

/// Instruction stream plus constant pool, as emitted by the compiler.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub version: Option<String>,
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub constants: Vec<Value>,
}

impl Program {
    pub fn new(instructions: Vec<Instruction>, constants: Vec<Value>) -> Self {
        Program { version: None, instructions, constants }
    }

    pub fn from_json(text: &str) -> Result<Self, LoadError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self, LoadError> {
        let text = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packed_and_named_instructions() {
        let p = Program::from_json(
            r#"{
                "instructions": [[4, 0, 0, 1], [2], {"opcode": 3, "operand_0": 1, "line_no": 7}],
                "constants": ["x", 5]
            }"#,
        )
        .unwrap();
        assert_eq!(p.instructions[0], Instruction::new(4, 0, 0, 1));
        assert_eq!(p.instructions[1], Instruction::new(2, 0, 0, 0));
        assert_eq!(p.instructions[2], Instruction::new(3, 1, 0, 7));
        assert_eq!(p.constants, vec![Value::from("x"), Value::from(5.0)]);
        assert!(p.version.is_none());
    }

    #[test]
    fn oversized_opcode_maps_to_invalid() {
        let p = Program::from_json(r#"{"instructions": [[300, 0, 0, 0]]}"#).unwrap();
        assert_eq!(p.instructions[0].opcode, 0);
        assert!(p.constants.is_empty());
    }

    #[test]
    fn constants_keep_structure() {
        let p = Program::from_json(
            r#"{"version": "1.2", "instructions": [], "constants": [null, [1, {"a": true}]]}"#,
        )
        .unwrap();
        assert_eq!(p.version.as_deref(), Some("1.2"));
        assert_eq!(p.constants[0], Value::Null);
        match &p.constants[1] {
            Value::Array(items) => assert!(matches!(items[1], Value::Object(_))),
            other => panic!("expected array, got {other:?}"),
        }
    }

    #[test]
    fn malformed_json_is_an_error() {
        let err = Program::from_json("{not json").unwrap_err();
        assert!(err.to_string().contains("malformed bytecode"));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = Program::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("/definitely/not/here.json"));
    }
}
