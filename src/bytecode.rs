// bytecode.rs - The bytecode instruction set produced by the constructor

use crate::error::{Result, ScriptError};
use crate::location::Location;
use crate::value::Value;
use std::collections::HashMap;
use std::fmt;

/// The closed set of operations a code block can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Op {
    /// Allocate a variable slot and register an accessor word for it.
    DefVariable,

    /// Pop a value and bind it as a named constant accessor word.
    DefConstant,

    /// Pop a slot index and push the variable stored there.
    ReadVariable,

    /// Pop a slot index, pop a value, and store it in that slot.
    WriteVariable,

    /// Invoke a word by handler index, or by name for late binding.
    Execute,

    /// Look a word up by name at run time and push its handler index.
    WordIndex,

    /// Push whether a word with the given name currently exists.
    WordExists,

    /// Push a literal value.
    PushConstantValue,

    /// Record the enclosing loop's start and exit for the jump ops below.
    MarkLoopExit,

    /// Drop the innermost loop marker.
    UnmarkLoopExit,

    /// Open a protected region whose catch clause ends at the target.
    MarkCatch,

    /// Close the protected region; always followed by a Jump taken on
    /// success.
    UnmarkCatch,

    /// Unconditional jump.
    Jump,

    /// Pop a flag and jump when it is falsy.
    JumpIfZero,

    /// Pop a flag and jump when it is truthy.
    JumpIfNotZero,

    /// Jump to the innermost loop's first body instruction.
    JumpLoopStart,

    /// Jump to the innermost loop's exit point.
    JumpLoopExit,

    /// A jump destination; carries a label name until jumps are resolved.
    JumpTarget,
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::DefVariable => "DefVariable",
            Op::DefConstant => "DefConstant",
            Op::ReadVariable => "ReadVariable",
            Op::WriteVariable => "WriteVariable",
            Op::Execute => "Execute",
            Op::WordIndex => "WordIndex",
            Op::WordExists => "WordExists",
            Op::PushConstantValue => "PushConstantValue",
            Op::MarkLoopExit => "MarkLoopExit",
            Op::UnmarkLoopExit => "UnmarkLoopExit",
            Op::MarkCatch => "MarkCatch",
            Op::UnmarkCatch => "UnmarkCatch",
            Op::Jump => "Jump",
            Op::JumpIfZero => "JumpIfZero",
            Op::JumpIfNotZero => "JumpIfNotZero",
            Op::JumpLoopStart => "JumpLoopStart",
            Op::JumpLoopExit => "JumpLoopExit",
            Op::JumpTarget => "JumpTarget",
        }
    }

    /// Ops that always carry an empty operand; disassembly must not print
    /// one.
    pub fn does_not_have_parameter(&self) -> bool {
        matches!(
            self,
            Op::ReadVariable
                | Op::WriteVariable
                | Op::JumpTarget
                | Op::UnmarkLoopExit
                | Op::UnmarkCatch
                | Op::JumpLoopExit
        )
    }

    /// Ops whose operand is a jump reference that resolve_jumps rewrites.
    fn is_jump(&self) -> bool {
        matches!(
            self,
            Op::Jump | Op::JumpIfZero | Op::JumpIfNotZero | Op::MarkLoopExit | Op::MarkCatch
        )
    }
}

/// One bytecode instruction.  Jump style operands hold a label name until
/// resolution, then a relative slot offset.  The location, when present,
/// updates the interpreter's current execution location for error reports.
#[derive(Debug, Clone)]
pub struct ByteCode {
    pub op: Op,
    pub value: Value,
    pub location: Option<Location>,
}

impl ByteCode {
    pub fn new(op: Op, value: Value, location: Option<Location>) -> Self {
        ByteCode {
            op,
            value,
            location,
        }
    }
}

impl fmt::Display for ByteCode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:17}", self.op.name())?;

        if !self.op.does_not_have_parameter() {
            if self.value.is_string() {
                write!(f, " {}", Value::stringify(&self.value.as_string()))?;
            } else {
                write!(f, " {}", self.value)?;
            }
        }

        Ok(())
    }
}

/// Format a whole block, one instruction per numbered line.
pub fn disassemble(code: &[ByteCode]) -> String {
    let mut output = String::new();

    for (index, instruction) in code.iter().enumerate() {
        output.push_str(&format!("{:4}  {}\n", index, instruction));
    }

    output
}

// ============================================================================
// JUMP RESOLUTION
// ============================================================================

/// Rewrite named labels into relative offsets.  Every `JumpTarget` holding
/// a string operand defines a label at its own index (a later label with the
/// same name overwrites an earlier one); every jump family instruction still
/// holding a string operand is rewritten to `target_index - own_index`.
/// Runs once per finished block, before code generation.
pub fn resolve_jumps(code: &mut [ByteCode]) -> Result<()> {
    let mut jump_indices = Vec::new();
    let mut jump_targets: HashMap<String, usize> = HashMap::new();

    for (index, instruction) in code.iter_mut().enumerate() {
        if instruction.op.is_jump() {
            jump_indices.push(index);
        } else if instruction.op == Op::JumpTarget && instruction.value.is_string() {
            jump_targets.insert(instruction.value.as_string(), index);
            instruction.value = Value::default();
        }
    }

    for jump_index in jump_indices {
        if code[jump_index].value.is_string() {
            let name = code[jump_index].value.as_string();

            let target_index = *jump_targets.get(&name).ok_or_else(|| {
                ScriptError::new(format!("Jump label, {}, not found.", name))
            })?;

            code[jump_index].value = Value::from(target_index as i64 - jump_index as i64);
        }
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn op(op: Op, value: Value) -> ByteCode {
        ByteCode::new(op, value, None)
    }

    #[test]
    fn test_resolve_forward_and_backward() {
        let mut code = vec![
            op(Op::JumpTarget, Value::from("top")),
            op(Op::JumpIfZero, Value::from("end")),
            op(Op::Jump, Value::from("top")),
            op(Op::JumpTarget, Value::from("end")),
        ];

        resolve_jumps(&mut code).unwrap();

        assert_eq!(code[1].value, Value::from(2));
        assert_eq!(code[2].value, Value::from(-2));

        // Labels are erased once resolved.
        assert_eq!(code[0].value, Value::default());
        assert_eq!(code[3].value, Value::default());
    }

    #[test]
    fn test_resolve_relative_offsets_round_trip() {
        // Every resolved operand must equal target_index - instruction_index.
        let mut code = vec![
            op(Op::MarkLoopExit, Value::from("exit")),
            op(Op::JumpTarget, Value::from("start")),
            op(Op::JumpIfNotZero, Value::from("start")),
            op(Op::MarkCatch, Value::from("exit")),
            op(Op::JumpTarget, Value::from("exit")),
        ];

        resolve_jumps(&mut code).unwrap();

        assert_eq!(code[0].value, Value::from(4));
        assert_eq!(code[2].value, Value::from(-1));
        assert_eq!(code[3].value, Value::from(1));
    }

    #[test]
    fn test_numeric_operands_left_alone() {
        let mut code = vec![op(Op::Jump, Value::from(2)), op(Op::JumpTarget, Value::default())];

        resolve_jumps(&mut code).unwrap();

        assert_eq!(code[0].value, Value::from(2));
    }

    #[test]
    fn test_duplicate_label_last_wins() {
        let mut code = vec![
            op(Op::Jump, Value::from("label")),
            op(Op::JumpTarget, Value::from("label")),
            op(Op::JumpTarget, Value::from("label")),
        ];

        resolve_jumps(&mut code).unwrap();

        assert_eq!(code[0].value, Value::from(2));
    }

    #[test]
    fn test_missing_label_fails() {
        let mut code = vec![op(Op::Jump, Value::from("nowhere"))];

        let result = resolve_jumps(&mut code);
        assert!(result.is_err());
        assert!(result.unwrap_err().message().contains("nowhere"));
    }

    #[test]
    fn test_display_respects_parameter_set() {
        let with = op(Op::Jump, Value::from(3));
        let without = op(Op::ReadVariable, Value::from(3));

        assert!(with.to_string().contains('3'));
        assert!(!without.to_string().contains('3'));
    }
}
