// compiler_words.rs - Words that run against the compiler itself

use crate::bytecode::{resolve_jumps, ByteCode, Op};
use crate::codegen::generate_handler;
use crate::constructor::Construction;
use crate::error::Result;
use crate::interpreter::{Interpreter, WordFlags};
use crate::lexer::TokenKind;
use crate::value::Value;

/// Add an instruction to the block under construction, honouring the
/// insert-at-front toggle.
pub fn insert_user_instruction(interpreter: &mut Interpreter, op: Op, value: Value) -> Result<()> {
    let instruction = ByteCode::new(op, value, None);

    interpreter.constructor_mut()?.insert_instruction(instruction)
}

// ============================================================================
// BYTECODE INSERTION WORDS
// ============================================================================

fn word_op_def_variable(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::DefVariable, value)
}

fn word_op_def_constant(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::DefConstant, value)
}

fn word_op_read_variable(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::ReadVariable, Value::default())
}

fn word_op_write_variable(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::WriteVariable, Value::default())
}

fn word_op_execute(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::Execute, value)
}

fn word_op_push_constant_value(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::PushConstantValue, value)
}

fn word_op_mark_loop_exit(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::MarkLoopExit, value)
}

fn word_op_unmark_loop_exit(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::UnmarkLoopExit, Value::default())
}

fn word_op_mark_catch(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::MarkCatch, value)
}

fn word_op_unmark_catch(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::UnmarkCatch, Value::default())
}

fn word_op_jump(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::Jump, value)
}

fn word_op_jump_if_zero(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::JumpIfZero, value)
}

fn word_op_jump_if_not_zero(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::JumpIfNotZero, value)
}

fn word_op_jump_loop_start(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::JumpLoopStart, Value::default())
}

fn word_op_jump_loop_exit(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::JumpLoopExit, Value::default())
}

fn word_op_jump_target(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    insert_user_instruction(interpreter, Op::JumpTarget, value)
}

// ============================================================================
// CONSTRUCTOR ACCESS WORDS
// ============================================================================

fn word_code_new_block(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.constructor_mut()?.stack.push(Construction::new());
    Ok(())
}

fn word_code_merge_stack_block(interpreter: &mut Interpreter) -> Result<()> {
    let constructor = interpreter.constructor_mut()?;
    let block = constructor.pop_block()?;

    constructor.top_mut()?.byte_code.extend(block.byte_code);
    Ok(())
}

fn word_code_pop_stack_block(interpreter: &mut Interpreter) -> Result<()> {
    let block = interpreter.constructor_mut()?.pop_block()?;

    interpreter.push(Value::from(block.byte_code));
    Ok(())
}

fn word_code_push_stack_block(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    let code = value.as_byte_code(interpreter)?;

    let mut construction = Construction::new();
    construction.byte_code = code.as_ref().clone();

    interpreter.constructor_mut()?.stack.push(construction);
    Ok(())
}

fn word_code_stack_block_size(interpreter: &mut Interpreter) -> Result<()> {
    let size = interpreter.constructor()?.top()?.byte_code.len();

    interpreter.push(Value::from(size as i64));
    Ok(())
}

fn word_code_resolve_jumps(interpreter: &mut Interpreter) -> Result<()> {
    let code = &mut interpreter.constructor_mut()?.top_mut()?.byte_code;

    resolve_jumps(code)
}

/// Keep compiling tokens until one of the given delimiter words appears,
/// then push the delimiter that was found.  The heart of every lookahead
/// construct.
fn word_code_compile_until_words(interpreter: &mut Interpreter) -> Result<()> {
    let count = {
        let value = interpreter.pop()?;
        value.as_integer(interpreter)?
    };

    let mut word_list = Vec::new();

    for _ in 0..count {
        word_list.push(interpreter.pop()?.as_string());
    }

    loop {
        let token = {
            let constructor = interpreter.constructor_mut()?;
            constructor.current_token += 1;

            if constructor.current_token >= constructor.tokens.len() {
                break;
            }

            constructor.tokens[constructor.current_token].clone()
        };

        if token.kind == TokenKind::Word && word_list.contains(&token.text) {
            interpreter.push(Value::from(token.text));
            return Ok(());
        }

        interpreter.compile_token(&token)?;
    }

    let message = if word_list.len() == 1 {
        format!("Missing word, {}, in source.", word_list[0])
    } else {
        format!(
            "Missing matching word, expected one of [ {} ].",
            word_list.join(" ")
        )
    };

    Err(interpreter.script_error(message))
}

fn word_code_insert_at_front(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    let at_front = value.as_boolean(interpreter)?;

    interpreter.constructor_mut()?.insert_at_front = at_front;
    Ok(())
}

fn word_code_execute_source(interpreter: &mut Interpreter) -> Result<()> {
    let source = interpreter.pop()?.as_string();

    interpreter.process_source("<execute>", &source)
}

// ============================================================================
// WORD ACCESS WORDS
// ============================================================================

fn word_word(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    interpreter.push(Value::from(token));
    Ok(())
}

fn word_word_index(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    // A known word's index becomes a literal now; an unknown one is looked
    // up when the generated code runs.
    let instruction = match interpreter.find_word(&token.text) {
        Some(word) => ByteCode::new(
            Op::PushConstantValue,
            Value::from(word.handler_index as i64),
            None,
        ),
        None => ByteCode::new(Op::WordIndex, Value::from(token.text), None),
    };

    interpreter.constructor_mut()?.top_mut()?.byte_code.push(instruction);
    Ok(())
}

fn word_execute(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;

    if value.is_numeric() {
        let index = value.as_integer(interpreter)?;
        interpreter.execute_word_index(index as usize)
    } else if value.is_string() {
        let name = value.as_string();
        interpreter.execute_word_named(&name)
    } else {
        Err(interpreter.script_error("Bad executable value."))
    }
}

fn word_is_defined(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    insert_user_instruction(interpreter, Op::WordExists, Value::from(token.text))
}

// ============================================================================
// WORD CREATION WORDS
// ============================================================================

fn word_start_word(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    let mut construction = Construction::new();
    construction.name = token.text;
    construction.location = Some(token.location);

    interpreter.constructor_mut()?.stack.push(construction);
    Ok(())
}

fn word_end_word(interpreter: &mut Interpreter) -> Result<()> {
    let mut construction = interpreter.constructor_mut()?.pop_block()?;

    resolve_jumps(&mut construction.byte_code)?;

    let handler = generate_handler(
        interpreter,
        &construction.name,
        construction.byte_code,
        true,
    )?;

    let location = construction.location.unwrap_or_default();
    let flags = WordFlags {
        is_immediate: construction.is_immediate,
        is_hidden: construction.is_hidden,
        is_scripted: true,
    };

    interpreter.add_word_with_flags(
        &construction.name,
        handler,
        location,
        &construction.description,
        &construction.signature,
        flags,
    );

    Ok(())
}

fn word_immediate(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.constructor_mut()?.top_mut()?.is_immediate = true;
    Ok(())
}

fn word_hidden(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.constructor_mut()?.top_mut()?.is_hidden = true;
    Ok(())
}

fn word_description(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    if token.kind != TokenKind::String {
        return Err(interpreter.script_error("Expected description to be a string."));
    }

    interpreter.constructor_mut()?.top_mut()?.description = token.text;
    Ok(())
}

fn word_signature(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    if token.kind != TokenKind::String {
        return Err(interpreter.script_error("Expected signature to be a string."));
    }

    interpreter.constructor_mut()?.top_mut()?.signature = token.text;
    Ok(())
}

// ============================================================================
// CONTROL FLOW WORDS
// ============================================================================

// These compile down to the same op.* machinery that script level immediate
// words use; the labels they generate are resolved when the enclosing block
// is finished.

fn word_variable(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    insert_user_instruction(interpreter, Op::DefVariable, Value::from(token.text))
}

fn word_constant(interpreter: &mut Interpreter) -> Result<()> {
    let token = interpreter.constructor_mut()?.next_token()?;

    insert_user_instruction(interpreter, Op::DefConstant, Value::from(token.text))
}

fn word_read(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::ReadVariable, Value::default())
}

fn word_write(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::WriteVariable, Value::default())
}

fn word_if(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.unique_string();

    insert_user_instruction(interpreter, Op::JumpIfZero, Value::from(end_label.clone()))?;
    interpreter.push(Value::from(end_label));

    Ok(())
}

fn word_else(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.pop()?.as_string();
    let else_label = interpreter.unique_string();

    insert_user_instruction(interpreter, Op::Jump, Value::from(else_label.clone()))?;
    insert_user_instruction(interpreter, Op::JumpTarget, Value::from(end_label))?;

    interpreter.push(Value::from(else_label));
    Ok(())
}

fn word_then(interpreter: &mut Interpreter) -> Result<()> {
    let label = interpreter.pop()?.as_string();

    insert_user_instruction(interpreter, Op::JumpTarget, Value::from(label))
}

fn word_begin(interpreter: &mut Interpreter) -> Result<()> {
    let start_label = interpreter.unique_string();
    let end_label = interpreter.unique_string();

    insert_user_instruction(interpreter, Op::MarkLoopExit, Value::from(end_label.clone()))?;
    insert_user_instruction(interpreter, Op::JumpTarget, Value::from(start_label.clone()))?;

    interpreter.push(Value::from(start_label));
    interpreter.push(Value::from(end_label));

    Ok(())
}

fn word_until(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.pop()?.as_string();
    let start_label = interpreter.pop()?.as_string();

    insert_user_instruction(interpreter, Op::JumpIfZero, Value::from(start_label))?;
    insert_user_instruction(interpreter, Op::JumpTarget, Value::from(end_label))?;
    insert_user_instruction(interpreter, Op::UnmarkLoopExit, Value::default())
}

fn word_while(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.pop()?;

    insert_user_instruction(interpreter, Op::JumpIfZero, Value::from(end_label.as_string()))?;

    interpreter.push(end_label);
    Ok(())
}

fn word_repeat(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.pop()?.as_string();
    let start_label = interpreter.pop()?.as_string();

    insert_user_instruction(interpreter, Op::Jump, Value::from(start_label))?;
    insert_user_instruction(interpreter, Op::JumpTarget, Value::from(end_label))?;
    insert_user_instruction(interpreter, Op::UnmarkLoopExit, Value::default())
}

fn word_break(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::JumpLoopExit, Value::default())
}

fn word_continue(interpreter: &mut Interpreter) -> Result<()> {
    insert_user_instruction(interpreter, Op::JumpLoopStart, Value::default())
}

fn word_try(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.unique_string();

    insert_user_instruction(interpreter, Op::MarkCatch, Value::from(end_label.clone()))?;
    interpreter.push(Value::from(end_label));

    Ok(())
}

fn word_catch(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.pop()?;

    insert_user_instruction(interpreter, Op::UnmarkCatch, Value::default())?;
    insert_user_instruction(interpreter, Op::Jump, Value::from(end_label.as_string()))?;

    interpreter.push(end_label);
    Ok(())
}

fn word_end_catch(interpreter: &mut Interpreter) -> Result<()> {
    let end_label = interpreter.pop()?.as_string();

    insert_user_instruction(interpreter, Op::JumpTarget, Value::from(end_label))
}

// ============================================================================
// REGISTRATION
// ============================================================================

pub fn register(interpreter: &mut Interpreter) {
    interpreter.add_word("op.def_variable", word_op_def_variable,
        "Insert this instruction into the byte stream.",
        "new-name -- ");

    interpreter.add_word("op.def_constant", word_op_def_constant,
        "Insert this instruction into the byte stream.",
        "new-name -- ");

    interpreter.add_word("op.read_variable", word_op_read_variable,
        "Insert this instruction into the byte stream.",
        " -- ");

    interpreter.add_word("op.write_variable", word_op_write_variable,
        "Insert this instruction into the byte stream.",
        " -- ");

    interpreter.add_word("op.execute", word_op_execute,
        "Insert this instruction into the byte stream.",
        "index -- ");

    interpreter.add_word("op.push_constant_value", word_op_push_constant_value,
        "Insert this instruction into the byte stream.",
        "value -- ");

    interpreter.add_word("op.mark_loop_exit", word_op_mark_loop_exit,
        "Insert this instruction into the byte stream.",
        "identifier -- ");

    interpreter.add_word("op.unmark_loop_exit", word_op_unmark_loop_exit,
        "Insert this instruction into the byte stream.",
        " -- ");

    interpreter.add_word("op.mark_catch", word_op_mark_catch,
        "Insert this instruction into the byte stream.",
        "identifier -- ");

    interpreter.add_word("op.unmark_catch", word_op_unmark_catch,
        "Insert this instruction into the byte stream.",
        " -- ");

    interpreter.add_word("op.jump", word_op_jump,
        "Insert this instruction into the byte stream.",
        "identifier -- ");

    interpreter.add_word("op.jump_if_zero", word_op_jump_if_zero,
        "Insert this instruction into the byte stream.",
        "identifier -- ");

    interpreter.add_word("op.jump_if_not_zero", word_op_jump_if_not_zero,
        "Insert this instruction into the byte stream.",
        "identifier -- ");

    interpreter.add_word("op.jump_loop_start", word_op_jump_loop_start,
        "Insert this instruction into the byte stream.",
        " -- ");

    interpreter.add_word("op.jump_loop_exit", word_op_jump_loop_exit,
        "Insert this instruction into the byte stream.",
        " -- ");

    interpreter.add_word("op.jump_target", word_op_jump_target,
        "Insert this instruction into the byte stream.",
        "identifier -- ");

    interpreter.add_word("code.new_block", word_code_new_block,
        "Create a new sub-block on the code generation stack.",
        " -- ");

    interpreter.add_word("code.merge_stack_block", word_code_merge_stack_block,
        "Merge the top code block into the one below.",
        " -- ");

    interpreter.add_word("code.pop_stack_block", word_code_pop_stack_block,
        "Pop a code block off of the code stack and onto the data stack.",
        " -- code_block");

    interpreter.add_word("code.push_stack_block", word_code_push_stack_block,
        "Pop a block from the data stack and back onto the code stack.",
        "code_block -- ");

    interpreter.add_word("code.stack_block_size@", word_code_stack_block_size,
        "Read the size of the code block at the top of the stack.",
        " -- code_size");

    interpreter.add_word("code.resolve_jumps", word_code_resolve_jumps,
        "Resolve all of the jumps in the top code block.",
        " -- ");

    interpreter.add_word("code.compile_until_words", word_code_compile_until_words,
        "Compile words until one of the given words is found.",
        "words... word_count -- found_word");

    interpreter.add_word("code.insert_at_front", word_code_insert_at_front,
        "When true new instructions are added to the beginning of the block.",
        "bool -- ");

    interpreter.add_word("code.execute_source", word_code_execute_source,
        "Interpret and execute a string like it is source code.",
        "string_to_execute -- ???");

    interpreter.add_word("word", word_word,
        "Get the next word in the token stream.",
        " -- next_word");

    interpreter.add_immediate_word("`", word_word_index,
        "Get the index of the next word.",
        " -- index");

    interpreter.add_word("execute", word_execute,
        "Execute a word name or index.",
        "word_name_or_index -- ???");

    interpreter.add_immediate_word("defined?", word_is_defined,
        "Is the given word defined?",
        " -- bool");

    interpreter.add_immediate_word(":", word_start_word,
        "The start of a new word definition.",
        " -- ");

    interpreter.add_immediate_word(";", word_end_word,
        "The end of a new word definition.",
        " -- ");

    interpreter.add_immediate_word("immediate", word_immediate,
        "Mark the current word being built as immediate.",
        " -- ");

    interpreter.add_immediate_word("hidden", word_hidden,
        "Mark the current word being built as hidden.",
        " -- ");

    interpreter.add_immediate_word("description:", word_description,
        "Give a new word its description.",
        " -- ");

    interpreter.add_immediate_word("signature:", word_signature,
        "Describe a new word's stack signature.",
        " -- ");

    interpreter.add_immediate_word("variable", word_variable,
        "Declare a new variable with a default value.",
        " -- ");

    interpreter.add_immediate_word("constant", word_constant,
        "Bind the value on the stack to a new constant.",
        "value -- ");

    interpreter.add_immediate_word("@", word_read,
        "Read from a variable index.",
        "variable -- value");

    interpreter.add_immediate_word("!", word_write,
        "Write to a variable at the given index.",
        "value variable -- ");

    interpreter.add_immediate_word("if", word_if,
        "Compile the start of a conditional block.",
        "flag -- ");

    interpreter.add_immediate_word("else", word_else,
        "Compile the alternate branch of a conditional block.",
        " -- ");

    interpreter.add_immediate_word("then", word_then,
        "Close a conditional block.",
        " -- ");

    interpreter.add_immediate_word("begin", word_begin,
        "Compile the start of a loop.",
        " -- ");

    interpreter.add_immediate_word("until", word_until,
        "Close a loop that runs until its flag is true.",
        "flag -- ");

    interpreter.add_immediate_word("while", word_while,
        "Compile a loop's continuation test.",
        "flag -- ");

    interpreter.add_immediate_word("repeat", word_repeat,
        "Close a begin while loop.",
        " -- ");

    interpreter.add_immediate_word("break", word_break,
        "Jump out of the enclosing loop.",
        " -- ");

    interpreter.add_immediate_word("continue", word_continue,
        "Jump back to the start of the enclosing loop.",
        " -- ");

    interpreter.add_immediate_word("try", word_try,
        "Open a protected block.",
        " -- ");

    interpreter.add_immediate_word("catch", word_catch,
        "Close a protected block and begin its error handler.",
        " -- error_message");

    interpreter.add_immediate_word("endcatch", word_end_catch,
        "Close an error handler clause.",
        " -- ");
}

// ============================================================================
// TESTS
// ============================================================================
