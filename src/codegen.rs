// codegen.rs - Lowers finished bytecode blocks into callable word handlers

use crate::bytecode::{ByteCode, Op};
use crate::error::Result;
use crate::interpreter::{Interpreter, WordFlags, WordHandler};
use crate::location::Location;
use crate::value::Value;
use std::collections::HashMap;
use std::rc::Rc;

// ============================================================================
// LOWERED PROGRAM
// ============================================================================

/// The executable form of one bytecode instruction.  Jumps hold absolute
/// instruction indices; loop markers and jump targets have already been
/// folded away.
#[derive(Debug, Clone)]
enum Instr {
    /// Allocate a runtime variable slot, remember its index in the frame,
    /// and register an accessor word for it.
    DefVariable { slot: usize, name: String },

    /// Pop the initial value, remember it in the frame, and register an
    /// accessor word for it.
    DefConstant { slot: usize, name: String },

    ReadVariable,
    WriteVariable,

    ExecuteIndex(usize),
    ExecuteName(String),

    /// Push the value bound to a local constant declared in this block.
    PushLocalConstant(usize),

    /// Push the slot index bound to a local variable declared in this block.
    PushLocalVariable(usize),

    WordIndex(String),
    WordExists(String),

    /// Push a scalar literal.
    PushValue(Value),

    /// Push a deep clone of a complex literal held in the block's statics.
    PushStatic(usize),

    Jump(usize),
    JumpIfZero(usize),
    JumpIfNotZero(usize),

    /// Open a protected region; on error control transfers to the target.
    MarkCatch(usize),

    /// Close the innermost protected region.
    UnmarkCatch,

    /// A jump destination or folded-away marker.
    Nop,
}

#[derive(Debug, Clone)]
struct Lowered {
    instr: Instr,
    location: Option<Location>,
}

/// One generated unit: the lowered program plus the complex literals it
/// pushes by clone.
struct CompiledBlock {
    ops: Vec<Lowered>,
    statics: Vec<Value>,
    variable_slots: usize,
    constant_slots: usize,
}

enum Flow {
    Next,
    Goto(usize),
}

// ============================================================================
// GENERATION
// ============================================================================

fn internal_error(interpreter: &Interpreter, message: &str) -> crate::error::ScriptError {
    interpreter.script_error(format!("Internal error, {}", message))
}

/// Convert a relative jump operand into an absolute instruction index.
fn absolute_target(
    interpreter: &Interpreter,
    code: &[ByteCode],
    index: usize,
) -> Result<usize> {
    let offset = code[index].value.as_integer(interpreter)?;
    let target = index as i64 + offset;

    if target < 0 || target > code.len() as i64 {
        return Err(internal_error(
            interpreter,
            &format!("jump target {} is out of range.", target),
        ));
    }

    Ok(target as usize)
}

/// Generate a callable handler for a finished, jump-resolved bytecode
/// block.  When `with_context` is set the body runs inside its own scope
/// layer, released on success and failure alike; named word bodies are
/// generated this way, bare top level fragments are not.
pub fn generate_handler(
    interpreter: &Interpreter,
    name: &str,
    code: Vec<ByteCode>,
    with_context: bool,
) -> Result<WordHandler> {
    // Nothing to generate for an empty body.
    if code.is_empty() {
        return Ok(Rc::new(|_| Ok(())));
    }

    // First pass: bind declared names to frame slots and pair every
    // protected region with the start of its catch clause.
    let mut variables: HashMap<String, usize> = HashMap::new();
    let mut constants: HashMap<String, usize> = HashMap::new();
    let mut variable_slots = 0;
    let mut constant_slots = 0;

    let mut open_catches: Vec<usize> = Vec::new();
    let mut catch_clauses: HashMap<usize, usize> = HashMap::new();

    for (index, instruction) in code.iter().enumerate() {
        match instruction.op {
            Op::DefVariable => {
                variables.insert(instruction.value.as_string(), variable_slots);
                variable_slots += 1;
            }

            Op::DefConstant => {
                constants.insert(instruction.value.as_string(), constant_slots);
                constant_slots += 1;
            }

            Op::MarkCatch => {
                open_catches.push(index);
            }

            Op::UnmarkCatch => {
                let opener = open_catches.pop().ok_or_else(|| {
                    internal_error(interpreter, "unmatched catch block close.")
                })?;

                // The success-path Jump that must follow tells us where the
                // catch clause begins.
                match code.get(index + 1) {
                    Some(next) if next.op == Op::Jump => {
                        catch_clauses.insert(opener, index + 2);
                    }
                    _ => {
                        return Err(internal_error(
                            interpreter,
                            "catch close is not followed by a jump.",
                        ));
                    }
                }
            }

            _ => {}
        }
    }

    if !open_catches.is_empty() {
        return Err(internal_error(interpreter, "unclosed catch block."));
    }

    // Second pass: lower one instruction per slot so that bytecode indices
    // survive as instruction indices.
    let mut ops = Vec::with_capacity(code.len());
    let mut statics = Vec::new();
    let mut loop_markers: Vec<(usize, usize)> = Vec::new();

    for (index, instruction) in code.iter().enumerate() {
        let instr = match instruction.op {
            Op::DefVariable => Instr::DefVariable {
                slot: variables[&instruction.value.as_string()],
                name: instruction.value.as_string(),
            },

            Op::DefConstant => Instr::DefConstant {
                slot: constants[&instruction.value.as_string()],
                name: instruction.value.as_string(),
            },

            Op::ReadVariable => Instr::ReadVariable,
            Op::WriteVariable => Instr::WriteVariable,

            Op::Execute => {
                let operand = &instruction.value;

                if operand.is_numeric() {
                    Instr::ExecuteIndex(operand.as_integer(interpreter)? as usize)
                } else if operand.is_string() {
                    // A name resolves against this block's own declarations
                    // first, then the dictionary as it stands now, and only
                    // then falls back to a lookup at call time.
                    let name = operand.as_string();

                    if let Some(&slot) = constants.get(&name) {
                        Instr::PushLocalConstant(slot)
                    } else if let Some(&slot) = variables.get(&name) {
                        Instr::PushLocalVariable(slot)
                    } else if let Some(word) = interpreter.find_word(&name) {
                        Instr::ExecuteIndex(word.handler_index)
                    } else {
                        Instr::ExecuteName(name)
                    }
                } else {
                    return Err(interpreter
                        .script_error(format!("Unsupported execute value type {}.", operand)));
                }
            }

            Op::WordIndex => Instr::WordIndex(instruction.value.as_string()),
            Op::WordExists => Instr::WordExists(instruction.value.as_string()),

            Op::PushConstantValue => {
                let value = &instruction.value;

                if value.is_int() || value.is_float() {
                    Instr::PushValue(value.clone())
                } else if value.is_string() {
                    Instr::PushValue(Value::from(value.as_string()))
                } else {
                    // Complex values live in the generated unit and are
                    // pushed by clone so separate invocations never share
                    // storage.
                    statics.push(value.clone());
                    Instr::PushStatic(statics.len() - 1)
                }
            }

            Op::MarkLoopExit => {
                let exit = absolute_target(interpreter, &code, index)?;
                loop_markers.push((index + 1, exit));

                Instr::Nop
            }

            Op::UnmarkLoopExit => {
                loop_markers
                    .pop()
                    .ok_or_else(|| internal_error(interpreter, "no loop marker in effect."))?;

                Instr::Nop
            }

            Op::MarkCatch => Instr::MarkCatch(catch_clauses[&index]),
            Op::UnmarkCatch => Instr::UnmarkCatch,

            Op::Jump => Instr::Jump(absolute_target(interpreter, &code, index)?),
            Op::JumpIfZero => Instr::JumpIfZero(absolute_target(interpreter, &code, index)?),
            Op::JumpIfNotZero => {
                Instr::JumpIfNotZero(absolute_target(interpreter, &code, index)?)
            }

            Op::JumpLoopStart => {
                let (start, _) = *loop_markers
                    .last()
                    .ok_or_else(|| internal_error(interpreter, "no loop marker in effect."))?;

                Instr::Jump(start)
            }

            Op::JumpLoopExit => {
                let (_, exit) = *loop_markers
                    .last()
                    .ok_or_else(|| internal_error(interpreter, "no loop marker in effect."))?;

                Instr::Jump(exit)
            }

            Op::JumpTarget => Instr::Nop,
        };

        ops.push(Lowered {
            instr,
            location: instruction.location.clone(),
        });
    }

    log::trace!("generated handler {} with {} instructions", name, ops.len());

    let block = Rc::new(CompiledBlock {
        ops,
        statics,
        variable_slots,
        constant_slots,
    });

    if with_context {
        Ok(Rc::new(move |interpreter: &mut Interpreter| {
            interpreter.mark_context();

            // The context is released on both exit paths, and an error from
            // the body wins over one from the release.
            match run(&block, interpreter) {
                Ok(()) => interpreter.release_context(),
                Err(error) => {
                    let _ = interpreter.release_context();
                    Err(error)
                }
            }
        }))
    } else {
        Ok(Rc::new(move |interpreter: &mut Interpreter| {
            run(&block, interpreter)
        }))
    }
}

// ============================================================================
// EXECUTION
// ============================================================================

fn run(block: &CompiledBlock, interpreter: &mut Interpreter) -> Result<()> {
    let mut frame_variables = vec![0i64; block.variable_slots];
    let mut frame_constants = vec![Value::default(); block.constant_slots];
    let mut catch_stack: Vec<usize> = Vec::new();

    let mut pc = 0;

    while pc < block.ops.len() {
        let lowered = &block.ops[pc];

        if let Some(location) = &lowered.location {
            interpreter.current_location = Some(location.clone());
        }

        let flow = step(
            block,
            &lowered.instr,
            interpreter,
            &mut frame_variables,
            &mut frame_constants,
            &mut catch_stack,
        );

        match flow {
            Ok(Flow::Next) => pc += 1,
            Ok(Flow::Goto(target)) => pc = target,

            Err(error) => {
                // An open protected region converts the error into its
                // display text and transfers control to the catch clause.
                if let Some(catch_target) = catch_stack.pop() {
                    interpreter.push(Value::from(error.to_string()));
                    pc = catch_target;
                } else {
                    return Err(error);
                }
            }
        }
    }

    Ok(())
}

fn step(
    block: &CompiledBlock,
    instr: &Instr,
    interpreter: &mut Interpreter,
    frame_variables: &mut [i64],
    frame_constants: &mut [Value],
    catch_stack: &mut Vec<usize>,
) -> Result<Flow> {
    match instr {
        Instr::DefVariable { slot, name } => {
            let index = interpreter.variables.insert(Value::default());
            frame_variables[*slot] = index as i64;

            let location = interpreter.current_location.clone().unwrap_or_default();
            let captured = index as i64;

            interpreter.add_word_with_flags(
                name,
                Rc::new(move |interpreter| {
                    interpreter.push(Value::from(captured));
                    Ok(())
                }),
                location,
                &format!("Push index for variable {}.", name),
                " -- index",
                WordFlags::default(),
            );
        }

        Instr::DefConstant { slot, name } => {
            let value = interpreter.pop()?;
            frame_constants[*slot] = value.clone();

            let location = interpreter.current_location.clone().unwrap_or_default();

            interpreter.add_word_with_flags(
                name,
                Rc::new(move |interpreter| {
                    interpreter.push(value.clone());
                    Ok(())
                }),
                location,
                &format!("Push value for constant {}.", name),
                " -- value",
                WordFlags::default(),
            );
        }

        Instr::ReadVariable => {
            let index_value = interpreter.pop()?;
            let index = index_value.as_integer(interpreter)?;

            let value = read_variable(interpreter, index)?;
            interpreter.push(value);
        }

        Instr::WriteVariable => {
            let index_value = interpreter.pop()?;
            let index = index_value.as_integer(interpreter)?;
            let value = interpreter.pop()?;

            write_variable(interpreter, index, value)?;
        }

        Instr::ExecuteIndex(index) => {
            interpreter.execute_word_index(*index)?;
        }

        Instr::ExecuteName(name) => {
            interpreter.execute_word_named(name)?;
        }

        Instr::PushLocalConstant(slot) => {
            let value = frame_constants[*slot].clone();
            interpreter.push(value);
        }

        Instr::PushLocalVariable(slot) => {
            interpreter.push(Value::from(frame_variables[*slot]));
        }

        Instr::WordIndex(name) => match interpreter.find_word(name) {
            Some(word) => interpreter.push(Value::from(word.handler_index as i64)),
            None => {
                return Err(interpreter.script_error(format!("Word, {}, not found.", name)));
            }
        },

        Instr::WordExists(name) => {
            let exists = interpreter.find_word(name).is_some();
            interpreter.push(Value::from(exists));
        }

        Instr::PushValue(value) => {
            interpreter.push(value.clone());
        }

        Instr::PushStatic(index) => {
            interpreter.push(block.statics[*index].deep_clone());
        }

        Instr::Jump(target) => return Ok(Flow::Goto(*target)),

        Instr::JumpIfZero(target) => {
            let value = interpreter.pop()?;

            if !value.as_boolean(interpreter)? {
                return Ok(Flow::Goto(*target));
            }
        }

        Instr::JumpIfNotZero(target) => {
            let value = interpreter.pop()?;

            if value.as_boolean(interpreter)? {
                return Ok(Flow::Goto(*target));
            }
        }

        Instr::MarkCatch(target) => {
            catch_stack.push(*target);
        }

        Instr::UnmarkCatch => {
            catch_stack.pop();
        }

        Instr::Nop => {}
    }

    Ok(Flow::Next)
}

fn read_variable(interpreter: &Interpreter, index: i64) -> Result<Value> {
    if index < 0 {
        return Err(interpreter.script_error(format!("Index {} not found.", index)));
    }

    match interpreter.variables.get(index as usize) {
        Ok(value) => Ok(value.clone()),
        Err(error) => Err(interpreter.script_error(error.message())),
    }
}

fn write_variable(interpreter: &mut Interpreter, index: i64, value: Value) -> Result<()> {
    if index < 0 {
        return Err(interpreter.script_error(format!("Index {} not found.", index)));
    }

    if let Err(error) = interpreter.variables.set(index as usize, value) {
        let message = error.message().to_string();
        return Err(interpreter.script_error(message));
    }

    Ok(())
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bytecode::resolve_jumps;

    fn op(op: Op, value: Value) -> ByteCode {
        ByteCode::new(op, value, None)
    }

    fn test_interpreter() -> Interpreter {
        let mut interpreter = Interpreter::new();

        interpreter.add_word(
            "+",
            |interpreter| {
                let b = interpreter.pop()?;
                let a = interpreter.pop()?;
                let sum = a.as_integer(interpreter)? + b.as_integer(interpreter)?;

                interpreter.push(Value::from(sum));
                Ok(())
            },
            "Add two integers.",
            "a b -- sum",
        );

        interpreter.add_word(
            "throw",
            |interpreter| {
                let value = interpreter.pop()?;
                Err(interpreter.script_error(value.as_string()))
            },
            "Raise an error.",
            "message -- ",
        );

        interpreter
    }

    fn run_block(interpreter: &mut Interpreter, code: Vec<ByteCode>) -> Result<()> {
        let handler = generate_handler(interpreter, "test", code, false)?;
        handler(interpreter)
    }

    #[test]
    fn test_add_two_literals() {
        let mut interpreter = test_interpreter();

        let code = vec![
            op(Op::PushConstantValue, Value::from(5)),
            op(Op::PushConstantValue, Value::from(3)),
            op(Op::Execute, Value::from("+")),
        ];

        run_block(&mut interpreter, code).unwrap();

        assert_eq!(interpreter.pop().unwrap(), Value::from(8));
        assert_eq!(interpreter.depth(), 0);
    }

    #[test]
    fn test_execute_by_index() {
        let mut interpreter = test_interpreter();
        let index = interpreter.find_word("+").unwrap().handler_index;

        let code = vec![
            op(Op::PushConstantValue, Value::from(2)),
            op(Op::PushConstantValue, Value::from(2)),
            op(Op::Execute, Value::from(index as i64)),
        ];

        run_block(&mut interpreter, code).unwrap();
        assert_eq!(interpreter.pop().unwrap(), Value::from(4));
    }

    #[test]
    fn test_empty_block_is_a_no_op() {
        let mut interpreter = test_interpreter();

        run_block(&mut interpreter, Vec::new()).unwrap();
        assert_eq!(interpreter.depth(), 0);
    }

    #[test]
    fn test_conditional_jumps() {
        let mut interpreter = test_interpreter();

        // if the flag is false push 10 else push 20
        let mut code = vec![
            op(Op::PushConstantValue, Value::from(false)),
            op(Op::JumpIfZero, Value::from("else")),
            op(Op::PushConstantValue, Value::from(20)),
            op(Op::Jump, Value::from("end")),
            op(Op::JumpTarget, Value::from("else")),
            op(Op::PushConstantValue, Value::from(10)),
            op(Op::JumpTarget, Value::from("end")),
        ];

        resolve_jumps(&mut code).unwrap();
        run_block(&mut interpreter, code).unwrap();

        assert_eq!(interpreter.pop().unwrap(), Value::from(10));
    }

    #[test]
    fn test_loop_markers_select_innermost() {
        let mut interpreter = test_interpreter();

        // Outer loop runs once; its body enters an inner loop whose exit
        // jump must leave only the inner loop.
        let mut code = vec![
            op(Op::MarkLoopExit, Value::from("outer-end")),
            op(Op::JumpTarget, Value::from("outer-start")),
            op(Op::MarkLoopExit, Value::from("inner-end")),
            op(Op::JumpTarget, Value::from("inner-start")),
            op(Op::PushConstantValue, Value::from(1)),
            op(Op::JumpLoopExit, Value::default()),
            op(Op::Jump, Value::from("inner-start")),
            op(Op::JumpTarget, Value::from("inner-end")),
            op(Op::UnmarkLoopExit, Value::default()),
            op(Op::PushConstantValue, Value::from(2)),
            op(Op::JumpLoopExit, Value::default()),
            op(Op::JumpTarget, Value::from("outer-end")),
            op(Op::UnmarkLoopExit, Value::default()),
        ];

        resolve_jumps(&mut code).unwrap();
        run_block(&mut interpreter, code).unwrap();

        // Both pushes ran: the inner exit did not skip the outer body.
        assert_eq!(interpreter.pop().unwrap(), Value::from(2));
        assert_eq!(interpreter.pop().unwrap(), Value::from(1));
        assert_eq!(interpreter.depth(), 0);
    }

    #[test]
    fn test_catch_recovers_from_error() {
        let mut interpreter = test_interpreter();

        let mut code = vec![
            op(Op::MarkCatch, Value::from("after")),
            op(Op::PushConstantValue, Value::from("boom")),
            op(Op::Execute, Value::from("throw")),
            op(Op::PushConstantValue, Value::from(111)),
            op(Op::UnmarkCatch, Value::default()),
            op(Op::Jump, Value::from("after")),
            op(Op::PushConstantValue, Value::from(222)),
            op(Op::JumpTarget, Value::from("after")),
        ];

        resolve_jumps(&mut code).unwrap();
        run_block(&mut interpreter, code).unwrap();

        // The catch clause pushed 222 on top of the error message.
        assert_eq!(interpreter.pop().unwrap(), Value::from(222));

        let message = interpreter.pop().unwrap();
        assert!(message.as_string().contains("boom"));
        assert_eq!(interpreter.depth(), 0);
    }

    #[test]
    fn test_catch_success_path_skips_clause() {
        let mut interpreter = test_interpreter();

        let mut code = vec![
            op(Op::MarkCatch, Value::from("after")),
            op(Op::PushConstantValue, Value::from(7)),
            op(Op::UnmarkCatch, Value::default()),
            op(Op::Jump, Value::from("after")),
            op(Op::PushConstantValue, Value::from(999)),
            op(Op::JumpTarget, Value::from("after")),
        ];

        resolve_jumps(&mut code).unwrap();
        run_block(&mut interpreter, code).unwrap();

        assert_eq!(interpreter.pop().unwrap(), Value::from(7));
        assert_eq!(interpreter.depth(), 0);
    }

    #[test]
    fn test_error_escapes_closed_catch() {
        let mut interpreter = test_interpreter();

        let mut code = vec![
            op(Op::MarkCatch, Value::from("after")),
            op(Op::UnmarkCatch, Value::default()),
            op(Op::Jump, Value::from("after")),
            op(Op::JumpTarget, Value::from("after")),
            op(Op::PushConstantValue, Value::from("late")),
            op(Op::Execute, Value::from("throw")),
        ];

        resolve_jumps(&mut code).unwrap();
        let result = run_block(&mut interpreter, code);

        assert!(result.is_err());
    }

    #[test]
    fn test_variables_read_and_write() {
        let mut interpreter = test_interpreter();

        let code = vec![
            op(Op::DefVariable, Value::from("counter")),
            // counter ! with 42: value, then slot index, then write.
            op(Op::PushConstantValue, Value::from(42)),
            op(Op::Execute, Value::from("counter")),
            op(Op::WriteVariable, Value::default()),
            // counter @ pushes the stored value back.
            op(Op::Execute, Value::from("counter")),
            op(Op::ReadVariable, Value::default()),
        ];

        run_block(&mut interpreter, code).unwrap();

        assert_eq!(interpreter.pop().unwrap(), Value::from(42));
    }

    #[test]
    fn test_local_constant_shadows_global_word() {
        let mut interpreter = test_interpreter();

        interpreter.add_word(
            "x",
            |interpreter| {
                interpreter.push(Value::from(1));
                Ok(())
            },
            "Push one.",
            " -- 1",
        );

        let code = vec![
            op(Op::PushConstantValue, Value::from(99)),
            op(Op::DefConstant, Value::from("x")),
            op(Op::Execute, Value::from("x")),
        ];

        run_block(&mut interpreter, code).unwrap();

        // The local constant wins over the global word of the same name.
        assert_eq!(interpreter.pop().unwrap(), Value::from(99));
    }

    #[test]
    fn test_complex_literals_clone_per_invocation() {
        let mut interpreter = test_interpreter();

        let literal = Value::from(vec![Value::from(1)]);
        let code = vec![op(Op::PushConstantValue, literal)];

        let handler = generate_handler(&interpreter, "test", code, false).unwrap();

        handler(&mut interpreter).unwrap();
        handler(&mut interpreter).unwrap();

        let second = interpreter.pop().unwrap();
        let first = interpreter.pop().unwrap();

        // Mutating one invocation's array must not leak into the other.
        if let Value::Array(array) = &first {
            array.borrow_mut().push(Value::from(2));
        }

        if let Value::Array(array) = &second {
            assert_eq!(array.borrow().len(), 1);
        }
    }

    #[test]
    fn test_word_index_and_exists() {
        let mut interpreter = test_interpreter();
        let index = interpreter.find_word("+").unwrap().handler_index;

        let code = vec![
            op(Op::WordIndex, Value::from("+")),
            op(Op::WordExists, Value::from("+")),
            op(Op::WordExists, Value::from("missing")),
        ];

        run_block(&mut interpreter, code).unwrap();

        assert_eq!(interpreter.pop().unwrap(), Value::from(false));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(index as i64));
    }

    #[test]
    fn test_word_index_missing_fails() {
        let mut interpreter = test_interpreter();

        let code = vec![op(Op::WordIndex, Value::from("missing"))];
        let result = run_block(&mut interpreter, code);

        assert!(result.unwrap_err().message().contains("missing"));
    }

    #[test]
    fn test_context_guard_releases_on_error() {
        let mut interpreter = test_interpreter();

        let code = vec![
            op(Op::DefVariable, Value::from("local")),
            op(Op::PushConstantValue, Value::from("die")),
            op(Op::Execute, Value::from("throw")),
        ];

        let handler = generate_handler(&interpreter, "guarded", code, true).unwrap();
        let result = handler(&mut interpreter);

        assert!(result.is_err());

        // The word registered inside the guarded body is gone again, and
        // the context stack is balanced: release fails at the root.
        assert!(interpreter.find_word("local").is_none());
        assert!(interpreter.release_context().is_err());
    }

    #[test]
    fn test_unmark_catch_requires_jump() {
        let interpreter = test_interpreter();

        let code = vec![
            op(Op::MarkCatch, Value::from(2)),
            op(Op::UnmarkCatch, Value::default()),
        ];

        let result = generate_handler(&interpreter, "bad", code, false);

        assert!(result.err().unwrap().message().contains("Internal error"));
    }

    #[test]
    fn test_late_bound_execute_resolves_at_call_time() {
        let mut interpreter = test_interpreter();

        let code = vec![op(Op::Execute, Value::from("defined-later"))];
        let handler = generate_handler(&interpreter, "test", code, false).unwrap();

        // Still missing: the call fails.
        assert!(handler(&mut interpreter).is_err());

        interpreter.add_word(
            "defined-later",
            |interpreter| {
                interpreter.push(Value::from(5));
                Ok(())
            },
            "",
            "",
        );

        handler(&mut interpreter).unwrap();
        assert_eq!(interpreter.pop().unwrap(), Value::from(5));
    }
}
