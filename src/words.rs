// words.rs - The native word library registered at interpreter startup

use crate::byte_buffer::ByteBuffer;
use crate::compiler_words;
use crate::data_object::{DataObject, DataObjectDefinition};
use crate::error::Result;
use crate::interpreter::{Interpreter, WordFlags};
use crate::location::Location;
use crate::value::{Value, ValueHashMap};
use std::cell::RefCell;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::{Read, Seek, Write};
use std::rc::Rc;

// ============================================================================
// OPERATOR HELPERS
// ============================================================================

fn string_or_numeric_op(
    interpreter: &mut Interpreter,
    float_op: fn(f64, f64) -> f64,
    int_op: fn(i64, i64) -> i64,
    string_op: fn(&str, &str) -> String,
) -> Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    let result = if Value::either_is_string(&a, &b) {
        Value::from(string_op(&a.as_string(), &b.as_string()))
    } else if Value::either_is_float(&a, &b) {
        Value::from(float_op(a.as_float(interpreter)?, b.as_float(interpreter)?))
    } else if Value::either_is_numeric(&a, &b) {
        Value::from(int_op(a.as_integer(interpreter)?, b.as_integer(interpreter)?))
    } else {
        return Err(interpreter.script_error("Value types are not compatible with this operation."));
    };

    interpreter.push(result);
    Ok(())
}

fn math_op(
    interpreter: &mut Interpreter,
    float_op: fn(f64, f64) -> f64,
    int_op: fn(i64, i64) -> i64,
) -> Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    let result = if Value::either_is_float(&a, &b) {
        Value::from(float_op(a.as_float(interpreter)?, b.as_float(interpreter)?))
    } else if Value::either_is_numeric(&a, &b) {
        Value::from(int_op(a.as_integer(interpreter)?, b.as_integer(interpreter)?))
    } else {
        return Err(interpreter.script_error("Value type not compatible with math operator."));
    };

    interpreter.push(result);
    Ok(())
}

fn comparison_op(
    interpreter: &mut Interpreter,
    float_op: fn(f64, f64) -> bool,
    int_op: fn(i64, i64) -> bool,
    string_op: fn(&str, &str) -> bool,
) -> Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    let result = if Value::either_is_float(&a, &b) {
        float_op(a.as_float(interpreter)?, b.as_float(interpreter)?)
    } else if Value::either_is_numeric(&a, &b) {
        int_op(a.as_integer(interpreter)?, b.as_integer(interpreter)?)
    } else if Value::either_is_string(&a, &b) {
        string_op(&a.as_string(), &b.as_string())
    } else {
        return Err(interpreter.script_error("Value types are not comparable."));
    };

    interpreter.push(Value::from(result));
    Ok(())
}

fn logic_op(interpreter: &mut Interpreter, op: fn(bool, bool) -> bool) -> Result<()> {
    let b = interpreter.pop()?.as_boolean(interpreter)?;
    let a = interpreter.pop()?.as_boolean(interpreter)?;

    interpreter.push(Value::from(op(a, b)));
    Ok(())
}

fn bit_op(interpreter: &mut Interpreter, op: fn(i64, i64) -> i64) -> Result<()> {
    let b = interpreter.pop()?.as_integer(interpreter)?;
    let a = interpreter.pop()?.as_integer(interpreter)?;

    interpreter.push(Value::from(op(a, b)));
    Ok(())
}

// ============================================================================
// CORE WORDS
// ============================================================================

fn word_reset(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.reset()
}

fn word_include(interpreter: &mut Interpreter) -> Result<()> {
    let path = interpreter.pop()?.as_string();

    interpreter.process_source_file(&path)
}

fn word_print_value(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;

    print!("{}", value);
    Ok(())
}

fn word_print_value_newline(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;

    println!("{}", value);
    Ok(())
}

fn word_print_stack(interpreter: &mut Interpreter) -> Result<()> {
    let values: Vec<Value> = interpreter.stack_iter().cloned().collect();

    for value in values {
        if value.is_string() {
            println!("{}", Value::stringify(&value.as_string()));
        } else {
            println!("{}", value);
        }
    }

    Ok(())
}

fn word_print_dictionary(interpreter: &mut Interpreter) -> Result<()> {
    let words = interpreter.words();

    let max_size = words.keys().map(|name| name.len()).max().unwrap_or(0);
    let count = words.values().filter(|word| !word.is_hidden).count();

    println!("There are {} words defined.", count);

    for (name, word) in &words {
        if !word.is_hidden {
            println!(
                "{:<width$}  {:4}  {}",
                name,
                word.handler_index,
                word.description,
                width = max_size
            );
        }
    }

    Ok(())
}

fn word_version(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.push(Value::from(env!("CARGO_PKG_VERSION")));
    Ok(())
}

fn word_throw(interpreter: &mut Interpreter) -> Result<()> {
    let message = interpreter.pop()?.as_string();

    Err(interpreter.script_error(message))
}

fn register_core_words(interpreter: &mut Interpreter) {
    interpreter.add_word("reset", word_reset,
        "Reset the interpreter to its default state.",
        " -- ");

    interpreter.add_word("include", word_include,
        "Include and execute another source file.",
        "source_path -- ");

    interpreter.add_word(".", word_print_value,
        "Print out the value at the top of the stack.",
        "value -- ");

    interpreter.add_word(".cr", word_print_value_newline,
        "Print out the value at the top of the stack with a new line.",
        "value -- ");

    interpreter.add_word(".s", word_print_stack,
        "Print out the data stack without changing it.",
        " -- ");

    interpreter.add_word(".w", word_print_dictionary,
        "Print out the current word dictionary.",
        " -- ");

    interpreter.add_word("forge.version", word_version,
        "Get the current version of the interpreter.",
        " -- version_string");

    interpreter.add_word("throw", word_throw,
        "Throw an exception with the given message.",
        "message -- ");
}

// ============================================================================
// STACK WORDS
// ============================================================================

fn word_dup(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;

    interpreter.push(value.clone());
    interpreter.push(value);
    Ok(())
}

fn word_drop(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.pop()?;
    Ok(())
}

fn word_swap(interpreter: &mut Interpreter) -> Result<()> {
    let a = interpreter.pop()?;
    let b = interpreter.pop()?;

    interpreter.push(a);
    interpreter.push(b);
    Ok(())
}

fn word_over(interpreter: &mut Interpreter) -> Result<()> {
    let a = interpreter.pop()?;
    let b = interpreter.pop()?;

    interpreter.push(a.clone());
    interpreter.push(b);
    interpreter.push(a);
    Ok(())
}

fn word_rot(interpreter: &mut Interpreter) -> Result<()> {
    let c = interpreter.pop()?;
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    interpreter.push(c);
    interpreter.push(a);
    interpreter.push(b);
    Ok(())
}

fn word_pick(interpreter: &mut Interpreter) -> Result<()> {
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;

    let value = interpreter.pick(index as usize)?;
    interpreter.push(value);
    Ok(())
}

fn word_push_to(interpreter: &mut Interpreter) -> Result<()> {
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;

    interpreter.push_to(index as usize)
}

fn register_stack_words(interpreter: &mut Interpreter) {
    interpreter.add_word("dup", word_dup,
        "Duplicate the top value on the data stack.",
        "value -- value value");

    interpreter.add_word("drop", word_drop,
        "Discard the top value on the data stack.",
        "value -- ");

    interpreter.add_word("swap", word_swap,
        "Swap the top 2 values on the data stack.",
        "a b -- b a");

    interpreter.add_word("over", word_over,
        "Make a copy of the top value and place the copy under the second.",
        "a b -- b a b");

    interpreter.add_word("rot", word_rot,
        "Rotate the top 3 values on the stack.",
        "a b c -- c a b");

    interpreter.add_word("pick", word_pick,
        "Pull the value at the given stack depth to the top.",
        "depth -- value");

    interpreter.add_word("push_to", word_push_to,
        "Move the top value down to the given stack depth.",
        "value depth -- ");
}

// ============================================================================
// CONSTANT WORDS
// ============================================================================

fn register_constant_words(interpreter: &mut Interpreter) {
    interpreter.add_word("exit_success",
        |interpreter| {
            interpreter.push(Value::from(0));
            Ok(())
        },
        "Constant value for a process success exit code.",
        " -- success");

    interpreter.add_word("exit_failure",
        |interpreter| {
            interpreter.push(Value::from(1));
            Ok(())
        },
        "Constant value for a process fail exit code.",
        " -- failure");

    interpreter.add_word("true",
        |interpreter| {
            interpreter.push(Value::from(true));
            Ok(())
        },
        "Push the value true onto the data stack.",
        " -- true");

    interpreter.add_word("false",
        |interpreter| {
            interpreter.push(Value::from(false));
            Ok(())
        },
        "Push the value false onto the data stack.",
        " -- false");
}

// ============================================================================
// VALUE TYPE WORDS
// ============================================================================

fn register_value_type_words(interpreter: &mut Interpreter) {
    interpreter.add_word("is_value_number?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_numeric()));
            Ok(())
        },
        "Is the value a number?",
        "value -- bool");

    interpreter.add_word("is_value_boolean?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_bool()));
            Ok(())
        },
        "Is the value a boolean?",
        "value -- bool");

    interpreter.add_word("is_value_string?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_string()));
            Ok(())
        },
        "Is the value a string?",
        "value -- bool");

    interpreter.add_word("is_value_structure?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_data_object()));
            Ok(())
        },
        "Is the value a structure?",
        "value -- bool");

    interpreter.add_word("is_value_array?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_array()));
            Ok(())
        },
        "Is the value an array?",
        "value -- bool");

    interpreter.add_word("is_value_buffer?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_byte_buffer()));
            Ok(())
        },
        "Is the value a byte buffer?",
        "value -- bool");

    interpreter.add_word("is_value_hash_table?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_hash_map()));
            Ok(())
        },
        "Is the value a hash table?",
        "value -- bool");

    interpreter.add_word("is_value_bytecode?",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(Value::from(value.is_byte_code()));
            Ok(())
        },
        "Is the value bytecode?",
        "value -- bool");

    interpreter.add_word("value.copy",
        |interpreter| {
            let value = interpreter.pop()?;
            interpreter.push(value.deep_clone());
            Ok(())
        },
        "Create a new value that's a copy of another.  Deep copy as required.",
        "value -- new_copy");
}

// ============================================================================
// STRING WORDS
// ============================================================================

fn char_count(text: &str) -> usize {
    text.chars().count()
}

fn char_to_byte_index(text: &str, index: usize) -> Option<usize> {
    if index == char_count(text) {
        return Some(text.len());
    }

    text.char_indices().nth(index).map(|(byte, _)| byte)
}

fn word_hex(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    let value = value.as_integer(interpreter)?;

    interpreter.push(Value::from(format!("{:x}", value)));
    Ok(())
}

fn word_unique_str(interpreter: &mut Interpreter) -> Result<()> {
    let new_string = interpreter.unique_string();

    interpreter.push(Value::from(new_string));
    Ok(())
}

fn word_string_length(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?.as_string();

    interpreter.push(Value::from(char_count(&value) as i64));
    Ok(())
}

fn word_string_insert(interpreter: &mut Interpreter) -> Result<()> {
    let base = interpreter.pop()?.as_string();
    let position = interpreter.pop()?;
    let position = position.as_integer(interpreter)?;
    let sub = interpreter.pop()?.as_string();

    if position < 0 || position as usize > char_count(&base) {
        return Err(interpreter.script_error(format!("Index {} is out of range.", position)));
    }

    let byte = char_to_byte_index(&base, position as usize).unwrap();
    let mut updated = base;
    updated.insert_str(byte, &sub);

    interpreter.push(Value::from(updated));
    Ok(())
}

fn word_string_remove(interpreter: &mut Interpreter) -> Result<()> {
    let base = interpreter.pop()?.as_string();
    let position = interpreter.pop()?;
    let position = position.as_integer(interpreter)?;
    let count = interpreter.pop()?;
    let count = count.as_integer(interpreter)?;

    let length = char_count(&base);

    if position < 0 || position as usize > length {
        return Err(interpreter.script_error(format!("Index {} is out of range.", position)));
    }

    let start = position as usize;
    let end = if count == -1 {
        length
    } else {
        let end = start + count as usize;

        if end > length {
            return Err(interpreter.script_error(format!("Index {} is out of range.", end)));
        }

        end
    };

    let updated: String = base
        .chars()
        .take(start)
        .chain(base.chars().skip(end))
        .collect();

    interpreter.push(Value::from(updated));
    Ok(())
}

fn word_string_find(interpreter: &mut Interpreter) -> Result<()> {
    let base = interpreter.pop()?.as_string();
    let search = interpreter.pop()?.as_string();

    let index = match base.find(&search) {
        Some(byte) => base[..byte].chars().count() as i64,
        None => -1,
    };

    interpreter.push(Value::from(index));
    Ok(())
}

fn word_string_sub_string(interpreter: &mut Interpreter) -> Result<()> {
    let base = interpreter.pop()?.as_string();
    let end = interpreter.pop()?;
    let end = end.as_integer(interpreter)?;
    let start = interpreter.pop()?;
    let start = start.as_integer(interpreter)?;

    let length = char_count(&base);
    let end = if end == -1 { length as i64 } else { end };

    if start < 0 || end < start || end as usize > length {
        return Err(interpreter
            .script_error(format!("Substring range {} to {} is out of range.", start, end)));
    }

    let result: String = base
        .chars()
        .skip(start as usize)
        .take((end - start) as usize)
        .collect();

    interpreter.push(Value::from(result));
    Ok(())
}

fn word_string_index_read(interpreter: &mut Interpreter) -> Result<()> {
    let base = interpreter.pop()?.as_string();
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;

    let character = if index >= 0 {
        base.chars().nth(index as usize)
    } else {
        None
    };

    match character {
        Some(character) => {
            interpreter.push(Value::from(character.to_string()));
            Ok(())
        }
        None => Err(interpreter.script_error(format!("Index {} is out of range.", index))),
    }
}

fn word_string_to_number(interpreter: &mut Interpreter) -> Result<()> {
    let text = interpreter.pop()?.as_string();

    let result = if text.contains('.') {
        text.parse::<f64>().map(Value::from).ok()
    } else {
        text.parse::<i64>().map(Value::from).ok()
    };

    match result {
        Some(value) => {
            interpreter.push(value);
            Ok(())
        }
        None => Err(interpreter.script_error(format!("Malformed numeric literal, {}.", text))),
    }
}

fn word_to_string(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;

    interpreter.push(Value::from(value.to_string()));
    Ok(())
}

fn register_string_words(interpreter: &mut Interpreter) {
    interpreter.add_word("hex", word_hex,
        "Convert a number into a hex string.",
        "number -- hex_string");

    interpreter.add_word("unique_str", word_unique_str,
        "Generate a unique string and push it onto the data stack.",
        " -- string");

    interpreter.add_word("string.size@", word_string_length,
        "Get the length of a given string.",
        "string -- size");

    interpreter.add_word("string.[]!", word_string_insert,
        "Insert a string into another string.",
        "sub_string position string -- updated_string");

    interpreter.add_word("string.remove", word_string_remove,
        "Remove some characters from a string.",
        "count position string -- updated_string");

    interpreter.add_word("string.find", word_string_find,
        "Find the first instance of a string within another.",
        "search_string string -- index");

    interpreter.add_word("string.sub_string", word_string_sub_string,
        "Return the string segment between a given start and end point.",
        "start end string -- sub_string");

    interpreter.add_word("string.[]@", word_string_index_read,
        "Read a character from the given string.",
        "index string -- character");

    interpreter.add_word("string.to_number", word_string_to_number,
        "Convert a string into a number.",
        "string -- number");

    interpreter.add_word("to_string", word_to_string,
        "Convert a value to a string.",
        "value -- string");

    interpreter.add_word("string.npos",
        |interpreter| {
            interpreter.push(Value::from(-1));
            Ok(())
        },
        "Constant value that indicates a search has failed.",
        " -- npos");
}

// ============================================================================
// STRUCTURE WORDS
// ============================================================================

fn get_variable(interpreter: &Interpreter, index: i64) -> Result<Value> {
    if index < 0 {
        return Err(interpreter.script_error(format!("Index {} not found.", index)));
    }

    match interpreter.variables.get(index as usize) {
        Ok(value) => Ok(value.clone()),
        Err(error) => {
            let message = error.message().to_string();
            Err(interpreter.script_error(message))
        }
    }
}

/// Register the generated accessor words for a structure definition: a
/// constructor, a bare index accessor per field, and read/write words for
/// both direct structures and structures held in variables.
pub fn create_data_definition_words(
    interpreter: &mut Interpreter,
    location: Location,
    definition: Rc<DataObjectDefinition>,
    is_hidden: bool,
) -> Result<()> {
    let flags = WordFlags {
        is_hidden,
        ..Default::default()
    };

    let constructor_definition = definition.clone();

    interpreter.add_word_with_flags(
        &format!("{}.new", definition.name),
        Rc::new(move |interpreter| {
            let new_data = DataObject::new(&constructor_definition);
            interpreter.push(Value::from(new_data));
            Ok(())
        }),
        location.clone(),
        &format!("Create a new instance of the structure {}.", definition.name),
        &format!(" -- {}", definition.name),
        flags,
    );

    let swap = interpreter.find_word("swap");
    let struct_write = interpreter.find_word("#!");
    let struct_read = interpreter.find_word("#@");

    let (swap, struct_write, struct_read) = match (swap, struct_write, struct_read) {
        (Some(swap), Some(write), Some(read)) => (swap, write, read),
        _ => {
            return Err(interpreter.script_error("Internal error, could not find structure words."));
        }
    };

    for (index, field_name) in definition.field_names.iter().enumerate() {
        let field_index = index as i64;
        let swap_index = swap.handler_index;
        let write_index = struct_write.handler_index;
        let read_index = struct_read.handler_index;

        interpreter.add_word_with_flags(
            &format!("{}.{}", definition.name, field_name),
            Rc::new(move |interpreter| {
                interpreter.push(Value::from(field_index));
                Ok(())
            }),
            location.clone(),
            &format!(
                "Access the structure {} field index {}.",
                definition.name, field_name
            ),
            " -- field_index",
            flags,
        );

        interpreter.add_word_with_flags(
            &format!("{}.{}!", definition.name, field_name),
            Rc::new(move |interpreter| {
                interpreter.push(Value::from(field_index));
                interpreter.execute_word_index(swap_index)?;
                interpreter.execute_word_index(write_index)
            }),
            location.clone(),
            &format!("Write to the structure field {}.", field_name),
            "new_value structure -- ",
            flags,
        );

        interpreter.add_word_with_flags(
            &format!("{}.{}@", definition.name, field_name),
            Rc::new(move |interpreter| {
                interpreter.push(Value::from(field_index));
                interpreter.execute_word_index(swap_index)?;
                interpreter.execute_word_index(read_index)
            }),
            location.clone(),
            &format!("Read from structure field {}.", field_name),
            "structure -- value",
            flags,
        );

        interpreter.add_word_with_flags(
            &format!("{}.{}!!", definition.name, field_name),
            Rc::new(move |interpreter| {
                let variable = interpreter.pop()?;
                let variable = variable.as_integer(interpreter)?;
                let structure = get_variable(interpreter, variable)?;

                interpreter.push(Value::from(field_index));
                interpreter.push(structure);
                interpreter.execute_word_index(write_index)
            }),
            location.clone(),
            &format!("Write to the structure field {} in a variable.", field_name),
            "new_value structure_var -- ",
            flags,
        );

        interpreter.add_word_with_flags(
            &format!("{}.{}@@", definition.name, field_name),
            Rc::new(move |interpreter| {
                let variable = interpreter.pop()?;
                let variable = variable.as_integer(interpreter)?;
                let structure = get_variable(interpreter, variable)?;

                interpreter.push(Value::from(field_index));
                interpreter.push(structure);
                interpreter.execute_word_index(read_index)
            }),
            location.clone(),
            &format!("Read from the structure field {} in a variable.", field_name),
            "structure_var -- value",
            flags,
        );
    }

    Ok(())
}

fn word_data_definition(interpreter: &mut Interpreter) -> Result<()> {
    let location = interpreter.current_location.clone().unwrap_or_default();

    let found_initializers = interpreter.pop()?;
    let found_initializers = found_initializers.as_boolean(interpreter)?;
    let is_hidden = interpreter.pop()?;
    let is_hidden = is_hidden.as_boolean(interpreter)?;
    let fields = interpreter.pop()?;
    let fields = fields.as_array(interpreter)?;
    let name = interpreter.pop()?.as_string();

    let field_names: Vec<String> = fields.borrow().iter().map(|field| field.as_string()).collect();

    let defaults: Vec<Value> = if found_initializers {
        let defaults = interpreter.pop()?;
        let defaults = defaults.as_array(interpreter)?;
        let defaults = defaults.borrow().clone();

        defaults
    } else {
        field_names.iter().map(|_| Value::default()).collect()
    };

    let definition = DataObjectDefinition::new(&name, is_hidden, field_names, defaults);

    create_data_definition_words(interpreter, location, definition, is_hidden)
}

fn word_read_field(interpreter: &mut Interpreter) -> Result<()> {
    let data = interpreter.pop()?;
    let data = data.as_data_object(interpreter)?;
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;

    let borrowed = data.borrow();

    if index < 0 || index as usize >= borrowed.fields.len() {
        return Err(interpreter.script_error(format!("Field index {} is out of bounds.", index)));
    }

    let value = borrowed.fields[index as usize].clone();
    drop(borrowed);

    interpreter.push(value);
    Ok(())
}

fn word_write_field(interpreter: &mut Interpreter) -> Result<()> {
    let data = interpreter.pop()?;
    let data = data.as_data_object(interpreter)?;
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;
    let value = interpreter.pop()?;

    let mut borrowed = data.borrow_mut();

    if index < 0 || index as usize >= borrowed.fields.len() {
        return Err(interpreter.script_error(format!("Field index {} is out of bounds.", index)));
    }

    borrowed.fields[index as usize] = value;
    Ok(())
}

fn word_structure_iterate(interpreter: &mut Interpreter) -> Result<()> {
    let data = interpreter.pop()?;
    let data = data.as_data_object(interpreter)?;
    let word_index = interpreter.pop()?;
    let word_index = word_index.as_integer(interpreter)? as usize;

    let pairs: Vec<(String, Value)> = {
        let borrowed = data.borrow();

        borrowed
            .definition
            .field_names
            .iter()
            .cloned()
            .zip(borrowed.fields.iter().cloned())
            .collect()
    };

    for (name, value) in pairs {
        interpreter.push(Value::from(name));
        interpreter.push(value);

        interpreter.execute_word_index(word_index)?;
    }

    Ok(())
}

fn location_definition() -> Rc<DataObjectDefinition> {
    DataObjectDefinition::new(
        "forge.location",
        false,
        vec!["path".to_string(), "line".to_string(), "column".to_string()],
        vec![Value::from(""), Value::from(1), Value::from(1)],
    )
}

fn word_info_definition(location_definition: &Rc<DataObjectDefinition>) -> Rc<DataObjectDefinition> {
    DataObjectDefinition::new(
        "forge.word",
        false,
        vec![
            "name".to_string(),
            "is_immediate".to_string(),
            "is_scripted".to_string(),
            "description".to_string(),
            "signature".to_string(),
            "handler_index".to_string(),
            "location".to_string(),
        ],
        vec![
            Value::from(""),
            Value::from(false),
            Value::from(false),
            Value::from(""),
            Value::from(""),
            Value::from(0),
            Value::from(DataObject::new(location_definition)),
        ],
    )
}

/// Package a dictionary entry as a forge.word structure.
fn word_data_from_word(
    location_definition: &Rc<DataObjectDefinition>,
    info_definition: &Rc<DataObjectDefinition>,
    name: &str,
    word: &crate::contextual::Word,
) -> Value {
    let mut data = DataObject::new(info_definition);

    data.fields[0] = Value::from(name);
    data.fields[1] = Value::from(word.is_immediate);
    data.fields[2] = Value::from(word.is_scripted);
    data.fields[3] = Value::from(word.description.clone());
    data.fields[4] = Value::from(word.signature.clone());
    data.fields[5] = Value::from(word.handler_index as i64);

    if let Some(location) = &word.location {
        let mut location_data = DataObject::new(location_definition);

        location_data.fields[0] = Value::from(location.path.clone());
        location_data.fields[1] = Value::from(location.line as i64);
        location_data.fields[2] = Value::from(location.column as i64);

        data.fields[6] = Value::from(location_data);
    }

    Value::from(data)
}

fn register_struct_words(interpreter: &mut Interpreter) {
    interpreter.add_word("#", word_data_definition,
        "Beginning of a structure definition.",
        " -- ");

    interpreter.add_word("#@", word_read_field,
        "Read a field from a structure.",
        "field_index structure -- value");

    interpreter.add_word("#!", word_write_field,
        "Write to a field of a structure.",
        "value field_index structure -- ");

    interpreter.add_word("#.iterate", word_structure_iterate,
        "Call an iterator for each member of a structure.",
        "word_or_index structure -- ");

    // The hidden structures backing words.get{}.
    let locations = location_definition();
    let word_info = word_info_definition(&locations);
    let registration_location = Location::from_caller(std::panic::Location::caller());

    create_data_definition_words(interpreter, registration_location.clone(), locations.clone(), true)
        .expect("structure words must already be registered");
    create_data_definition_words(interpreter, registration_location, word_info.clone(), true)
        .expect("structure words must already be registered");

    interpreter.add_word("words.get{}",
        move |interpreter: &mut Interpreter| {
            let words = interpreter.words();
            let mut result = ValueHashMap::with_capacity(words.len());

            for (name, word) in &words {
                result.insert(
                    Value::from(name.clone()),
                    word_data_from_word(&locations, &word_info, name, word),
                );
            }

            interpreter.push(Value::from(result));
            Ok(())
        },
        "Get a copy of the word table as it exists at time of calling.",
        " -- all_defined_words");
}

// ============================================================================
// ARRAY WORDS
// ============================================================================

fn array_bounds_check(interpreter: &Interpreter, index: i64, count: usize) -> Result<usize> {
    if index < 0 || index as usize >= count {
        return Err(
            interpreter.script_error(format!("Array index {} is out of bounds, {}.", index, count))
        );
    }

    Ok(index as usize)
}

fn word_array_new(interpreter: &mut Interpreter) -> Result<()> {
    let count = interpreter.pop()?;
    let count = count.as_integer(interpreter)?.max(0) as usize;

    let array: Vec<Value> = (0..count).map(|_| Value::default()).collect();

    interpreter.push(Value::from(array));
    Ok(())
}

fn word_array_size(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let size = array.borrow().len();

    interpreter.push(Value::from(size as i64));
    Ok(())
}

fn word_array_write_index(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;
    let value = interpreter.pop()?;

    let mut items = array.borrow_mut();
    let index = array_bounds_check(interpreter, index, items.len())?;

    items[index] = value;
    Ok(())
}

fn word_array_read_index(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;

    let items = array.borrow();
    let index = array_bounds_check(interpreter, index, items.len())?;
    let value = items[index].clone();
    drop(items);

    interpreter.push(value);
    Ok(())
}

fn word_array_insert(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;
    let value = interpreter.pop()?;

    let mut items = array.borrow_mut();

    if index < 0 || index as usize > items.len() {
        let count = items.len();
        return Err(
            interpreter.script_error(format!("Array index {} is out of bounds, {}.", index, count))
        );
    }

    items.insert(index as usize, value);
    Ok(())
}

fn word_array_delete(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let index = interpreter.pop()?;
    let index = index.as_integer(interpreter)?;

    let mut items = array.borrow_mut();
    let index = array_bounds_check(interpreter, index, items.len())?;

    items.remove(index);
    Ok(())
}

fn word_array_resize(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let new_size = interpreter.pop()?;
    let new_size = new_size.as_integer(interpreter)?.max(0) as usize;

    array.borrow_mut().resize_with(new_size, Value::default);
    Ok(())
}

fn word_array_plus(interpreter: &mut Interpreter) -> Result<()> {
    let source = interpreter.pop()?;
    let source = source.as_array(interpreter)?;
    let dest_value = interpreter.pop()?;
    let dest = dest_value.as_array(interpreter)?;

    // Copy the items out first so appending an array to itself stays sound.
    let items: Vec<Value> = source.borrow().iter().map(Value::deep_clone).collect();

    dest.borrow_mut().extend(items);

    interpreter.push(dest_value);
    Ok(())
}

fn word_array_push_front(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let value = interpreter.pop()?;

    array.borrow_mut().insert(0, value);
    Ok(())
}

fn word_array_push_back(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;
    let value = interpreter.pop()?;

    array.borrow_mut().push(value);
    Ok(())
}

fn word_array_pop_front(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;

    let mut items = array.borrow_mut();

    if items.is_empty() {
        return Err(interpreter.script_error("Pop from empty array."));
    }

    let value = items.remove(0);
    drop(items);

    interpreter.push(value);
    Ok(())
}

fn word_array_pop_back(interpreter: &mut Interpreter) -> Result<()> {
    let array = interpreter.pop()?;
    let array = array.as_array(interpreter)?;

    let mut items = array.borrow_mut();

    if items.is_empty() {
        return Err(interpreter.script_error("Pop from empty array."));
    }

    let value = items.pop().unwrap();
    drop(items);

    interpreter.push(value);
    Ok(())
}

fn register_array_words(interpreter: &mut Interpreter) {
    interpreter.add_word("[].new", word_array_new,
        "Create a new array with the given default size.",
        "size -- array");

    interpreter.add_word("[].size@", word_array_size,
        "Read the size of the array object.",
        "array -- size");

    interpreter.add_word("[]!", word_array_write_index,
        "Write to a value in the array.",
        "value index array -- ");

    interpreter.add_word("[]@", word_array_read_index,
        "Read a value from the array.",
        "index array -- value");

    interpreter.add_word("[].insert", word_array_insert,
        "Grow an array by inserting a value at the given location.",
        "value index array -- ");

    interpreter.add_word("[].delete", word_array_delete,
        "Shrink an array by removing the value at the given location.",
        "index array -- ");

    interpreter.add_word("[].size!", word_array_resize,
        "Grow or shrink the array to the new size.",
        "new_size array -- ");

    interpreter.add_word("[].+", word_array_plus,
        "Take two arrays and deep copy the contents from the second into the first.",
        "dest source -- dest");

    interpreter.add_word("[].push_front!", word_array_push_front,
        "Push a value to the front of an array.",
        "value array -- ");

    interpreter.add_word("[].push_back!", word_array_push_back,
        "Push a value to the end of an array.",
        "value array -- ");

    interpreter.add_word("[].pop_front!", word_array_pop_front,
        "Pop a value from the front of an array.",
        "array -- value");

    interpreter.add_word("[].pop_back!", word_array_pop_back,
        "Pop a value from the back of an array.",
        "array -- value");
}

// ============================================================================
// BYTE BUFFER WORDS
// ============================================================================

fn check_buffer_range(
    interpreter: &Interpreter,
    buffer: &ByteBuffer,
    byte_size: usize,
) -> Result<()> {
    if buffer.position + byte_size > buffer.len() {
        let message = format!(
            "Accessing a value of size {} at a position of {} would exceed the buffer size, {}.",
            byte_size,
            buffer.position,
            buffer.len()
        );

        return Err(interpreter.script_error(message));
    }

    Ok(())
}

fn check_int_size(interpreter: &Interpreter, byte_size: usize) -> Result<()> {
    if !matches!(byte_size, 1 | 2 | 4 | 8) {
        return Err(interpreter.script_error(format!("Bad integer byte size, {}.", byte_size)));
    }

    Ok(())
}

fn check_float_size(interpreter: &Interpreter, byte_size: usize) -> Result<()> {
    if !matches!(byte_size, 4 | 8) {
        return Err(interpreter.script_error(format!("Bad float byte size, {}.", byte_size)));
    }

    Ok(())
}

fn word_buffer_new(interpreter: &mut Interpreter) -> Result<()> {
    let size = interpreter.pop()?;
    let size = size.as_integer(interpreter)?.max(0) as usize;

    interpreter.push(Value::from(ByteBuffer::new(size)));
    Ok(())
}

fn word_buffer_write_int(interpreter: &mut Interpreter) -> Result<()> {
    let byte_size = interpreter.pop()?;
    let byte_size = byte_size.as_integer(interpreter)? as usize;
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;
    let value = interpreter.pop()?;
    let value = value.as_integer(interpreter)?;

    check_int_size(interpreter, byte_size)?;

    let mut buffer = buffer.borrow_mut();
    check_buffer_range(interpreter, &buffer, byte_size)?;

    buffer.write_int(byte_size, value);
    Ok(())
}

fn word_buffer_read_int(interpreter: &mut Interpreter) -> Result<()> {
    let is_signed = interpreter.pop()?;
    let is_signed = is_signed.as_boolean(interpreter)?;
    let byte_size = interpreter.pop()?;
    let byte_size = byte_size.as_integer(interpreter)? as usize;
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;

    check_int_size(interpreter, byte_size)?;

    let mut buffer = buffer.borrow_mut();
    check_buffer_range(interpreter, &buffer, byte_size)?;

    let value = buffer.read_int(byte_size, is_signed);
    drop(buffer);

    interpreter.push(Value::from(value));
    Ok(())
}

fn word_buffer_write_float(interpreter: &mut Interpreter) -> Result<()> {
    let byte_size = interpreter.pop()?;
    let byte_size = byte_size.as_integer(interpreter)? as usize;
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;
    let value = interpreter.pop()?;
    let value = value.as_float(interpreter)?;

    check_float_size(interpreter, byte_size)?;

    let mut buffer = buffer.borrow_mut();
    check_buffer_range(interpreter, &buffer, byte_size)?;

    buffer.write_float(byte_size, value);
    Ok(())
}

fn word_buffer_read_float(interpreter: &mut Interpreter) -> Result<()> {
    let byte_size = interpreter.pop()?;
    let byte_size = byte_size.as_integer(interpreter)? as usize;
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;

    check_float_size(interpreter, byte_size)?;

    let mut buffer = buffer.borrow_mut();
    check_buffer_range(interpreter, &buffer, byte_size)?;

    let value = buffer.read_float(byte_size);
    drop(buffer);

    interpreter.push(Value::from(value));
    Ok(())
}

fn word_buffer_write_string(interpreter: &mut Interpreter) -> Result<()> {
    let byte_size = interpreter.pop()?;
    let byte_size = byte_size.as_integer(interpreter)? as usize;
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;
    let value = interpreter.pop()?.as_string();

    let mut buffer = buffer.borrow_mut();
    check_buffer_range(interpreter, &buffer, byte_size)?;

    buffer.write_string(byte_size, &value);
    Ok(())
}

fn word_buffer_read_string(interpreter: &mut Interpreter) -> Result<()> {
    let byte_size = interpreter.pop()?;
    let byte_size = byte_size.as_integer(interpreter)? as usize;
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;

    let mut buffer = buffer.borrow_mut();
    check_buffer_range(interpreter, &buffer, byte_size)?;

    let value = buffer.read_string(byte_size);
    drop(buffer);

    interpreter.push(Value::from(value));
    Ok(())
}

fn word_buffer_set_position(interpreter: &mut Interpreter) -> Result<()> {
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;
    let position = interpreter.pop()?;
    let position = position.as_integer(interpreter)?.max(0) as usize;

    buffer.borrow_mut().position = position;
    Ok(())
}

fn word_buffer_get_position(interpreter: &mut Interpreter) -> Result<()> {
    let buffer = interpreter.pop()?;
    let buffer = buffer.as_byte_buffer(interpreter)?;
    let position = buffer.borrow().position;

    interpreter.push(Value::from(position as i64));
    Ok(())
}

fn register_buffer_words(interpreter: &mut Interpreter) {
    interpreter.add_word("buffer.new", word_buffer_new,
        "Create a new byte buffer.",
        "size -- buffer");

    interpreter.add_word("buffer.int!", word_buffer_write_int,
        "Write an integer of a given size to the buffer.",
        "value buffer byte_size -- ");

    interpreter.add_word("buffer.int@", word_buffer_read_int,
        "Read an integer of a given size from the buffer.",
        "buffer byte_size is_signed -- value");

    interpreter.add_word("buffer.float!", word_buffer_write_float,
        "Write a float of a given size to the buffer.",
        "value buffer byte_size -- ");

    interpreter.add_word("buffer.float@", word_buffer_read_float,
        "Read a float of a given size from the buffer.",
        "buffer byte_size -- value");

    interpreter.add_word("buffer.string!", word_buffer_write_string,
        "Write a string of given size to the buffer.  Padded with 0s if needed.",
        "value buffer size -- ");

    interpreter.add_word("buffer.string@", word_buffer_read_string,
        "Read a string of a given max size from the buffer.",
        "buffer size -- value");

    interpreter.add_word("buffer.position!", word_buffer_set_position,
        "Set the position of the buffer pointer.",
        "position buffer -- ");

    interpreter.add_word("buffer.position@", word_buffer_get_position,
        "Get the position of the buffer pointer.",
        "buffer -- position");
}

// ============================================================================
// HASH TABLE WORDS
// ============================================================================

fn word_hash_table_new(interpreter: &mut Interpreter) -> Result<()> {
    interpreter.push(Value::from(ValueHashMap::new()));
    Ok(())
}

fn word_hash_table_insert(interpreter: &mut Interpreter) -> Result<()> {
    let map = interpreter.pop()?;
    let map = map.as_hash_map(interpreter)?;
    let key = interpreter.pop()?;
    let value = interpreter.pop()?;

    map.borrow_mut().insert(key, value);
    Ok(())
}

fn word_hash_table_find(interpreter: &mut Interpreter) -> Result<()> {
    let map = interpreter.pop()?;
    let map = map.as_hash_map(interpreter)?;
    let key = interpreter.pop()?;

    let value = map.borrow().get(&key).cloned();

    match value {
        Some(value) => {
            interpreter.push(value);
            Ok(())
        }
        None => Err(interpreter.script_error(format!("Value {} does not exist in the table.", key))),
    }
}

fn word_hash_table_exists(interpreter: &mut Interpreter) -> Result<()> {
    let map = interpreter.pop()?;
    let map = map.as_hash_map(interpreter)?;
    let key = interpreter.pop()?;

    let exists = map.borrow().contains_key(&key);

    interpreter.push(Value::from(exists));
    Ok(())
}

fn word_hash_table_plus(interpreter: &mut Interpreter) -> Result<()> {
    let source = interpreter.pop()?;
    let source = source.as_hash_map(interpreter)?;
    let dest_value = interpreter.pop()?;
    let dest = dest_value.as_hash_map(interpreter)?;

    let entries: Vec<(Value, Value)> = source
        .borrow()
        .iter()
        .map(|(key, value)| (key.deep_clone(), value.deep_clone()))
        .collect();

    {
        let mut dest = dest.borrow_mut();

        for (key, value) in entries {
            dest.insert(key, value);
        }
    }

    interpreter.push(dest_value);
    Ok(())
}

fn word_hash_table_iterate(interpreter: &mut Interpreter) -> Result<()> {
    let map = interpreter.pop()?;
    let map = map.as_hash_map(interpreter)?;
    let word_index = interpreter.pop()?;
    let word_index = word_index.as_integer(interpreter)? as usize;

    let entries: Vec<(Value, Value)> = map
        .borrow()
        .iter()
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    for (key, value) in entries {
        interpreter.push(key);
        interpreter.push(value);

        interpreter.execute_word_index(word_index)?;
    }

    Ok(())
}

fn register_hash_words(interpreter: &mut Interpreter) {
    interpreter.add_word("{}.new", word_hash_table_new,
        "Create a new hash table.",
        " -- new_hash_table");

    interpreter.add_word("{}!", word_hash_table_insert,
        "Write a value to a given key in the table.",
        "value key table -- ");

    interpreter.add_word("{}@", word_hash_table_find,
        "Read a value from a given key in the table.",
        "key table -- value");

    interpreter.add_word("{}?", word_hash_table_exists,
        "Check if a given key exists in the table.",
        "key table -- bool");

    interpreter.add_word("{}.+", word_hash_table_plus,
        "Take two hashes and deep copy the contents from the second into the first.",
        "dest source -- dest");

    interpreter.add_word("{}.iterate", word_hash_table_iterate,
        "Iterate through a hash table and call a word for each item.",
        "word_index hash_table -- ");
}

// ============================================================================
// MATH, LOGIC, AND BIT WORDS
// ============================================================================

fn word_add(interpreter: &mut Interpreter) -> Result<()> {
    string_or_numeric_op(
        interpreter,
        |a, b| a + b,
        |a, b| a.wrapping_add(b),
        |a, b| format!("{}{}", a, b),
    )
}

fn word_subtract(interpreter: &mut Interpreter) -> Result<()> {
    math_op(interpreter, |a, b| a - b, |a, b| a.wrapping_sub(b))
}

fn word_multiply(interpreter: &mut Interpreter) -> Result<()> {
    math_op(interpreter, |a, b| a * b, |a, b| a.wrapping_mul(b))
}

fn word_divide(interpreter: &mut Interpreter) -> Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    let result = if Value::either_is_float(&a, &b) {
        Value::from(a.as_float(interpreter)? / b.as_float(interpreter)?)
    } else if Value::either_is_numeric(&a, &b) {
        let divisor = b.as_integer(interpreter)?;

        if divisor == 0 {
            return Err(interpreter.script_error("Division by zero."));
        }

        Value::from(a.as_integer(interpreter)?.wrapping_div(divisor))
    } else {
        return Err(interpreter.script_error("Value type not compatible with math operator."));
    };

    interpreter.push(result);
    Ok(())
}

fn word_mod(interpreter: &mut Interpreter) -> Result<()> {
    let b = interpreter.pop()?;
    let a = interpreter.pop()?;

    let result = if Value::either_is_float(&a, &b) {
        Value::from(a.as_float(interpreter)? % b.as_float(interpreter)?)
    } else if Value::either_is_numeric(&a, &b) {
        let divisor = b.as_integer(interpreter)?;

        if divisor == 0 {
            return Err(interpreter.script_error("Division by zero."));
        }

        Value::from(a.as_integer(interpreter)?.wrapping_rem(divisor))
    } else {
        return Err(interpreter.script_error("Value type not compatible with math operator."));
    };

    interpreter.push(result);
    Ok(())
}

fn word_logic_not(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    let value = value.as_boolean(interpreter)?;

    interpreter.push(Value::from(!value));
    Ok(())
}

fn word_bit_not(interpreter: &mut Interpreter) -> Result<()> {
    let value = interpreter.pop()?;
    let value = value.as_integer(interpreter)?;

    interpreter.push(Value::from(!value));
    Ok(())
}

fn register_math_words(interpreter: &mut Interpreter) {
    // Basic math.
    interpreter.add_word("+", word_add,
        "Add 2 numbers or strings together.",
        "a b -- result");

    interpreter.add_word("-", word_subtract,
        "Subtract 2 numbers.",
        "a b -- result");

    interpreter.add_word("*", word_multiply,
        "Multiply 2 numbers.",
        "a b -- result");

    interpreter.add_word("/", word_divide,
        "Divide 2 numbers.",
        "a b -- result");

    interpreter.add_word("%", word_mod,
        "Take the modulus of 2 numbers.",
        "a b -- result");

    // Logical operators.
    interpreter.add_word("&&",
        |interpreter| logic_op(interpreter, |a, b| a && b),
        "Logically compare 2 values.",
        "a b -- bool");

    interpreter.add_word("||",
        |interpreter| logic_op(interpreter, |a, b| a || b),
        "Logically compare 2 values.",
        "a b -- bool");

    interpreter.add_word("'", word_logic_not,
        "Logically invert a boolean value.",
        "bool -- bool");

    // Bitwise operators.
    interpreter.add_word("&",
        |interpreter| bit_op(interpreter, |a, b| a & b),
        "Bitwise AND two numbers together.",
        "a b -- result");

    interpreter.add_word("|",
        |interpreter| bit_op(interpreter, |a, b| a | b),
        "Bitwise OR two numbers together.",
        "a b -- result");

    interpreter.add_word("^",
        |interpreter| bit_op(interpreter, |a, b| a ^ b),
        "Bitwise XOR two numbers together.",
        "a b -- result");

    interpreter.add_word("~", word_bit_not,
        "Bitwise NOT a number.",
        "number -- result");

    interpreter.add_word("<<",
        |interpreter| bit_op(interpreter, |a, b| a.wrapping_shl(b as u32)),
        "Shift a number's bits to the left.",
        "value amount -- result");

    interpreter.add_word(">>",
        |interpreter| bit_op(interpreter, |a, b| a.wrapping_shr(b as u32)),
        "Shift a number's bits to the right.",
        "value amount -- result");
}

// ============================================================================
// COMPARISON WORDS
// ============================================================================

fn register_comparison_words(interpreter: &mut Interpreter) {
    interpreter.add_word("=",
        |interpreter| comparison_op(interpreter, |a, b| a == b, |a, b| a == b, |a, b| a == b),
        "Are 2 values equal?",
        "a b -- bool");

    interpreter.add_word("<>",
        |interpreter| comparison_op(interpreter, |a, b| a != b, |a, b| a != b, |a, b| a != b),
        "Are 2 values not equal?",
        "a b -- bool");

    interpreter.add_word(">=",
        |interpreter| comparison_op(interpreter, |a, b| a >= b, |a, b| a >= b, |a, b| a >= b),
        "Is one value greater or equal to another?",
        "a b -- bool");

    interpreter.add_word("<=",
        |interpreter| comparison_op(interpreter, |a, b| a <= b, |a, b| a <= b, |a, b| a <= b),
        "Is one value less than or equal to another?",
        "a b -- bool");

    interpreter.add_word(">",
        |interpreter| comparison_op(interpreter, |a, b| a > b, |a, b| a > b, |a, b| a > b),
        "Is one value greater than another?",
        "a b -- bool");

    interpreter.add_word("<",
        |interpreter| comparison_op(interpreter, |a, b| a < b, |a, b| a < b, |a, b| a < b),
        "Is one value less than another?",
        "a b -- bool");
}

// ============================================================================
// FILE WORDS
// ============================================================================

struct FileHandles {
    next_index: i64,
    map: HashMap<i64, fs::File>,
}

impl FileHandles {
    fn new() -> Self {
        FileHandles {
            next_index: 4,
            map: HashMap::new(),
        }
    }

    fn insert(&mut self, file: fs::File) -> i64 {
        let index = self.next_index;

        self.map.insert(index, file);
        self.next_index += 1;

        index
    }
}

const FILE_READ: i64 = 1;
const FILE_WRITE: i64 = 2;

fn open_options(flags: i64) -> fs::OpenOptions {
    let mut options = fs::OpenOptions::new();

    options
        .read(flags & FILE_READ != 0)
        .write(flags & FILE_WRITE != 0);

    options
}

fn with_file<T>(
    interpreter: &mut Interpreter,
    handles: &Rc<RefCell<FileHandles>>,
    action: impl FnOnce(&mut Interpreter, &mut fs::File) -> Result<T>,
) -> Result<T> {
    let handle = interpreter.pop()?;
    let handle = handle.as_integer(interpreter)?;

    let mut handles = handles.borrow_mut();

    match handles.map.get_mut(&handle) {
        Some(file) => action(interpreter, file),
        None => Err(interpreter.script_error(format!("Handle {} is not an open file.", handle))),
    }
}

fn read_one_byte(file: &mut fs::File) -> Option<u8> {
    let mut byte = [0u8; 1];

    match file.read(&mut byte) {
        Ok(1) => Some(byte[0]),
        _ => None,
    }
}

fn register_io_words(interpreter: &mut Interpreter) {
    let handles = Rc::new(RefCell::new(FileHandles::new()));

    let open_handles = handles.clone();
    interpreter.add_word("file.open",
        move |interpreter: &mut Interpreter| {
            let flags = interpreter.pop()?;
            let flags = flags.as_integer(interpreter)?;
            let path = interpreter.pop()?.as_string();

            let mut options = open_options(flags);

            if flags & FILE_WRITE != 0 {
                options.create(true);
            }

            let file = options
                .open(&path)
                .map_err(|error| interpreter.script_error(format!("Failed to open {}: {}", path, error)))?;

            let index = open_handles.borrow_mut().insert(file);
            interpreter.push(Value::from(index));
            Ok(())
        },
        "Open an existing file and return a fd.",
        "path flags -- fd");

    let create_handles = handles.clone();
    interpreter.add_word("file.create",
        move |interpreter: &mut Interpreter| {
            let flags = interpreter.pop()?;
            let flags = flags.as_integer(interpreter)?;
            let path = interpreter.pop()?.as_string();

            let file = open_options(flags)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .map_err(|error| interpreter.script_error(format!("Failed to create {}: {}", path, error)))?;

            let index = create_handles.borrow_mut().insert(file);
            interpreter.push(Value::from(index));
            Ok(())
        },
        "Create/open a file and return a fd.",
        "path flags -- fd");

    let temp_handles = handles.clone();
    interpreter.add_word("file.create.tempfile",
        move |interpreter: &mut Interpreter| {
            let flags = interpreter.pop()?;
            let flags = flags.as_integer(interpreter)?;

            let next_index = temp_handles.borrow().next_index;
            let path = env::temp_dir().join(format!("forge-{}-{}", std::process::id(), next_index));

            let file = open_options(flags)
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)
                .map_err(|error| {
                    interpreter.script_error(format!("Failed to create temp file: {}", error))
                })?;

            let index = temp_handles.borrow_mut().insert(file);
            interpreter.push(Value::from(index));
            Ok(())
        },
        "Create/open a unique temporary file and return its fd.",
        "flags -- fd");

    let close_handles = handles.clone();
    interpreter.add_word("file.close",
        move |interpreter: &mut Interpreter| {
            let handle = interpreter.pop()?;
            let handle = handle.as_integer(interpreter)?;

            if close_handles.borrow_mut().map.remove(&handle).is_none() {
                return Err(
                    interpreter.script_error(format!("Handle {} is not an open file.", handle))
                );
            }

            Ok(())
        },
        "Take a fd and close it.",
        "fd -- ");

    interpreter.add_word("file.delete",
        |interpreter: &mut Interpreter| {
            let path = interpreter.pop()?.as_string();

            fs::remove_file(&path)
                .map_err(|error| interpreter.script_error(format!("Failed to delete {}: {}", path, error)))
        },
        "Delete the specified file.",
        "file_path -- ");

    let size_handles = handles.clone();
    interpreter.add_word("file.size@",
        move |interpreter: &mut Interpreter| {
            let size = with_file(interpreter, &size_handles, |interpreter, file| {
                file.metadata()
                    .map(|data| data.len() as i64)
                    .map_err(|error| interpreter.script_error(format!("Failed to stat file: {}", error)))
            })?;

            interpreter.push(Value::from(size));
            Ok(())
        },
        "Return the size of a file represented by a fd.",
        "fd -- size");

    interpreter.add_word("file.exists?",
        |interpreter: &mut Interpreter| {
            let path = interpreter.pop()?.as_string();

            interpreter.push(Value::from(std::path::Path::new(&path).exists()));
            Ok(())
        },
        "Does the file at the given path exist?",
        "path -- bool");

    let is_open_handles = handles.clone();
    interpreter.add_word("file.is_open?",
        move |interpreter: &mut Interpreter| {
            let handle = interpreter.pop()?;
            let handle = handle.as_integer(interpreter)?;

            let result = is_open_handles.borrow().map.contains_key(&handle);

            interpreter.push(Value::from(result));
            Ok(())
        },
        "Is the fd currently valid?",
        "fd -- bool");

    let eof_handles = handles.clone();
    interpreter.add_word("file.is_eof?",
        move |interpreter: &mut Interpreter| {
            let result = with_file(interpreter, &eof_handles, |interpreter, file| {
                let position = file
                    .stream_position()
                    .map_err(|error| interpreter.script_error(format!("Failed to seek: {}", error)))?;
                let length = file
                    .metadata()
                    .map(|data| data.len())
                    .map_err(|error| interpreter.script_error(format!("Failed to stat file: {}", error)))?;

                Ok(position >= length)
            })?;

            interpreter.push(Value::from(result));
            Ok(())
        },
        "Is the file pointer at the end of the file?",
        "fd -- bool");

    let char_handles = handles.clone();
    interpreter.add_word("file.char@",
        move |interpreter: &mut Interpreter| {
            let text = with_file(interpreter, &char_handles, |_, file| {
                Ok(match read_one_byte(file) {
                    Some(byte) => (byte as char).to_string(),
                    None => String::new(),
                })
            })?;

            interpreter.push(Value::from(text));
            Ok(())
        },
        "Read a character from a given file.",
        "fd -- character");

    let string_handles = handles.clone();
    interpreter.add_word("file.string@",
        move |interpreter: &mut Interpreter| {
            // The fd is on top of the stack, the byte count below it.
            let handle = interpreter.pop()?;
            let size = interpreter.pop()?;
            let size = size.as_integer(interpreter)?.max(0) as usize;

            interpreter.push(handle);

            let text = with_file(interpreter, &string_handles, |interpreter, file| {
                let mut bytes = vec![0u8; size];

                let read = file
                    .read(&mut bytes)
                    .map_err(|error| interpreter.script_error(format!("Failed to read file: {}", error)))?;

                Ok(String::from_utf8_lossy(&bytes[..read]).to_string())
            })?;

            interpreter.push(Value::from(text));
            Ok(())
        },
        "Read a string of a specified length from a given file.",
        "size fd -- string");

    let write_handles = handles.clone();
    interpreter.add_word("file.!",
        move |interpreter: &mut Interpreter| {
            let handle = interpreter.pop()?;
            let value = interpreter.pop()?;

            interpreter.push(handle);

            with_file(interpreter, &write_handles, |interpreter, file| {
                file.write_all(value.to_string().as_bytes())
                    .map_err(|error| interpreter.script_error(format!("Failed to write file: {}", error)))
            })
        },
        "Write a value as text to a file.",
        "value fd -- ");

    let line_read_handles = handles.clone();
    interpreter.add_word("file.line@",
        move |interpreter: &mut Interpreter| {
            let line = with_file(interpreter, &line_read_handles, |_, file| {
                let mut bytes = Vec::new();

                while let Some(byte) = read_one_byte(file) {
                    if byte == b'\n' {
                        break;
                    }

                    bytes.push(byte);
                }

                Ok(String::from_utf8_lossy(&bytes).to_string())
            })?;

            interpreter.push(Value::from(line));
            Ok(())
        },
        "Read a full line from a file.",
        "fd -- string");

    let line_write_handles = handles.clone();
    interpreter.add_word("file.line!",
        move |interpreter: &mut Interpreter| {
            let handle = interpreter.pop()?;
            let text = interpreter.pop()?.as_string();

            interpreter.push(handle);

            with_file(interpreter, &line_write_handles, |interpreter, file| {
                file.write_all(format!("{}\n", text).as_bytes())
                    .map_err(|error| interpreter.script_error(format!("Failed to write file: {}", error)))
            })
        },
        "Write a string as a line to the file.",
        "string fd -- ");

    interpreter.add_word("file.r/o",
        |interpreter| {
            interpreter.push(Value::from(FILE_READ));
            Ok(())
        },
        "Constant for opening a file as read only.",
        " -- flag");

    interpreter.add_word("file.w/o",
        |interpreter| {
            interpreter.push(Value::from(FILE_WRITE));
            Ok(())
        },
        "Constant for opening a file as write only.",
        " -- flag");

    interpreter.add_word("file.r/w",
        |interpreter| {
            interpreter.push(Value::from(FILE_READ | FILE_WRITE));
            Ok(())
        },
        "Constant for opening a file for both reading and writing.",
        " -- flag");
}

// ============================================================================
// TERMINAL WORDS
// ============================================================================

fn register_terminal_words(interpreter: &mut Interpreter) {
    interpreter.add_word("term.flush",
        |_| {
            std::io::stdout().flush().ok();
            Ok(())
        },
        "Flush the terminal's buffers.",
        " -- ");

    interpreter.add_word("term.readline",
        |interpreter: &mut Interpreter| {
            let mut line = String::new();

            std::io::stdin()
                .read_line(&mut line)
                .map_err(|error| interpreter.script_error(format!("Failed to read terminal: {}", error)))?;

            if line.ends_with('\n') {
                line.pop();

                if line.ends_with('\r') {
                    line.pop();
                }
            }

            interpreter.push(Value::from(line));
            Ok(())
        },
        "Read a line of text from the terminal.",
        " -- string");

    interpreter.add_word("term.!",
        |interpreter: &mut Interpreter| {
            let value = interpreter.pop()?;

            print!("{}", value);
            Ok(())
        },
        "Write a value to the terminal.",
        "value -- ");

    interpreter.add_word("term.is_printable?",
        |interpreter: &mut Interpreter| {
            let text = interpreter.pop()?.as_string();
            let character = text.chars().next().unwrap_or('\0');

            let result = character >= ' ' || character == '\n' || character == '\t';

            interpreter.push(Value::from(result));
            Ok(())
        },
        "Is the given character printable?",
        "character -- bool");
}

// ============================================================================
// USER WORDS
// ============================================================================

fn register_user_words(interpreter: &mut Interpreter) {
    interpreter.add_word("user.env@",
        |interpreter: &mut Interpreter| {
            let name = interpreter.pop()?.as_string();
            let value = env::var(&name).unwrap_or_default();

            interpreter.push(Value::from(value));
            Ok(())
        },
        "Read an environment variable.",
        "name -- value_or_empty");

    interpreter.add_word("user.os",
        |interpreter: &mut Interpreter| {
            let name = if cfg!(target_os = "linux") {
                "Linux"
            } else if cfg!(target_os = "macos") {
                "macOS"
            } else if cfg!(target_os = "windows") {
                "Windows"
            } else {
                "Other"
            };

            interpreter.push(Value::from(name));
            Ok(())
        },
        "Get the name of the OS the script is running under.",
        " -- os_name");
}

// ============================================================================
// REGISTRATION
// ============================================================================

/// Register the complete native word set.
pub fn register_all(interpreter: &mut Interpreter) {
    register_core_words(interpreter);
    register_stack_words(interpreter);
    register_constant_words(interpreter);
    compiler_words::register(interpreter);
    register_value_type_words(interpreter);
    register_string_words(interpreter);
    register_struct_words(interpreter);
    register_array_words(interpreter);
    register_buffer_words(interpreter);
    register_hash_words(interpreter);
    register_math_words(interpreter);
    register_comparison_words(interpreter);
    register_io_words(interpreter);
    register_terminal_words(interpreter);
    register_user_words(interpreter);
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn full_interpreter() -> Interpreter {
        let mut interpreter = Interpreter::new();

        register_all(&mut interpreter);
        interpreter
    }

    fn run(interpreter: &mut Interpreter, source: &str) {
        interpreter.process_source("test", source).unwrap();
    }

    fn pop_int(interpreter: &mut Interpreter) -> i64 {
        let value = interpreter.pop().unwrap();
        value.as_integer(interpreter).unwrap()
    }

    #[test]
    fn test_stack_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "1 2 dup");
        assert_eq!(pop_int(&mut interpreter), 2);
        assert_eq!(pop_int(&mut interpreter), 2);
        assert_eq!(pop_int(&mut interpreter), 1);

        run(&mut interpreter, "1 2 swap");
        assert_eq!(pop_int(&mut interpreter), 1);
        assert_eq!(pop_int(&mut interpreter), 2);

        // over copies the old top under the second value: 1 2 becomes 2 1 2.
        run(&mut interpreter, "1 2 over");
        assert_eq!(pop_int(&mut interpreter), 2);
        assert_eq!(pop_int(&mut interpreter), 1);
        assert_eq!(pop_int(&mut interpreter), 2);

        run(&mut interpreter, "1 2 3 rot");
        assert_eq!(pop_int(&mut interpreter), 2);
        assert_eq!(pop_int(&mut interpreter), 1);
        assert_eq!(pop_int(&mut interpreter), 3);
    }

    #[test]
    fn test_math_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "5 3 +");
        assert_eq!(pop_int(&mut interpreter), 8);

        run(&mut interpreter, "10 4 -");
        assert_eq!(pop_int(&mut interpreter), 6);

        run(&mut interpreter, "6 7 *");
        assert_eq!(pop_int(&mut interpreter), 42);

        run(&mut interpreter, "7 2 /");
        assert_eq!(pop_int(&mut interpreter), 3);

        run(&mut interpreter, "7 2 %");
        assert_eq!(pop_int(&mut interpreter), 1);

        // A float operand promotes the whole operation.
        run(&mut interpreter, "1 0.5 +");
        let value = interpreter.pop().unwrap();
        assert_eq!(value, Value::from(1.5));
    }

    #[test]
    fn test_division_by_zero() {
        let mut interpreter = full_interpreter();

        let result = interpreter.process_source("test", "1 0 /");
        assert!(result.unwrap_err().message().contains("Division by zero."));
    }

    #[test]
    fn test_string_concat() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "\"foo\" \"bar\" +");
        assert_eq!(interpreter.pop().unwrap().as_string(), "foobar");
    }

    #[test]
    fn test_comparison_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "1 2 < 2 2 <= 3 2 > \"a\" \"a\" =");

        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
    }

    #[test]
    fn test_logic_and_bit_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "true false && true false ||");
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(false));

        run(&mut interpreter, "12 10 & 12 10 | 1 4 <<");
        assert_eq!(pop_int(&mut interpreter), 16);
        assert_eq!(pop_int(&mut interpreter), 14);
        assert_eq!(pop_int(&mut interpreter), 8);
    }

    #[test]
    fn test_string_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "\"hello\" string.size@");
        assert_eq!(pop_int(&mut interpreter), 5);

        run(&mut interpreter, "\"ll\" \"hello\" string.find");
        assert_eq!(pop_int(&mut interpreter), 2);

        run(&mut interpreter, "1 3 \"hello\" string.sub_string");
        assert_eq!(interpreter.pop().unwrap().as_string(), "el");

        run(&mut interpreter, "1 \"abc\" string.[]@");
        assert_eq!(interpreter.pop().unwrap().as_string(), "b");

        run(&mut interpreter, "\"xy\" 1 \"abc\" string.[]!");
        assert_eq!(interpreter.pop().unwrap().as_string(), "axybc");

        run(&mut interpreter, "1 1 \"abc\" string.remove");
        assert_eq!(interpreter.pop().unwrap().as_string(), "ac");

        run(&mut interpreter, "\"42\" string.to_number");
        assert_eq!(pop_int(&mut interpreter), 42);

        run(&mut interpreter, "255 hex");
        assert_eq!(interpreter.pop().unwrap().as_string(), "ff");
    }

    #[test]
    fn test_array_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "3 [].new constant arr arr [].size@");
        assert_eq!(pop_int(&mut interpreter), 3);

        // Write then read an element.
        run(&mut interpreter, "9 1 arr []! 1 arr []@");
        assert_eq!(pop_int(&mut interpreter), 9);
    }

    #[test]
    fn test_array_bounds() {
        let mut interpreter = full_interpreter();

        let result = interpreter.process_source("test", "1 5 2 [].new []!");

        assert!(result
            .unwrap_err()
            .message()
            .contains("Array index 5 is out of bounds, 2."));
    }

    #[test]
    fn test_array_push_pop() {
        let mut interpreter = full_interpreter();

        run(
            &mut interpreter,
            "0 [].new constant items \
             1 items [].push_back! \
             2 items [].push_back! \
             3 items [].push_front! \
             items [].size@ \
             items [].pop_front! \
             items [].pop_back!",
        );

        assert_eq!(pop_int(&mut interpreter), 2);
        assert_eq!(pop_int(&mut interpreter), 3);
        assert_eq!(pop_int(&mut interpreter), 3);
    }

    #[test]
    fn test_pop_from_empty_array() {
        let mut interpreter = full_interpreter();

        let result = interpreter.process_source("test", "0 [].new [].pop_back!");
        assert!(result.unwrap_err().message().contains("Pop from empty array."));
    }

    #[test]
    fn test_hash_words() {
        let mut interpreter = full_interpreter();

        run(
            &mut interpreter,
            "{}.new constant table \
             42 \"answer\" table {}! \
             \"answer\" table {}@ \
             \"answer\" table {}? \
             \"other\" table {}?",
        );

        assert_eq!(interpreter.pop().unwrap(), Value::from(false));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(pop_int(&mut interpreter), 42);
    }

    #[test]
    fn test_hash_missing_key() {
        let mut interpreter = full_interpreter();

        let result = interpreter.process_source("test", "\"nope\" {}.new {}@");
        assert!(result.unwrap_err().message().contains("does not exist"));
    }

    #[test]
    fn test_buffer_words() {
        let mut interpreter = full_interpreter();

        run(
            &mut interpreter,
            "16 buffer.new constant buf \
             0x1234 buf 2 buffer.int! \
             0 buf buffer.position! \
             buf 2 false buffer.int@",
        );

        assert_eq!(pop_int(&mut interpreter), 0x1234);
    }

    #[test]
    fn test_buffer_overrun() {
        let mut interpreter = full_interpreter();

        let result = interpreter.process_source("test", "1 4 buffer.new 8 buffer.int!");
        assert!(result.unwrap_err().message().contains("exceed the buffer size"));
    }

    #[test]
    fn test_struct_words() {
        let mut interpreter = full_interpreter();

        // Define a structure through the raw definition word, then use the
        // generated accessors.
        run(
            &mut interpreter,
            "\"point\" \
             2 [].new constant fields \
             \"x\" 0 fields []! \
             \"y\" 1 fields []! \
             fields false false #",
        );

        run(
            &mut interpreter,
            "point.new constant p \
             10 p point.x! \
             20 p point.y! \
             p point.x@ \
             p point.y@",
        );

        assert_eq!(pop_int(&mut interpreter), 20);
        assert_eq!(pop_int(&mut interpreter), 10);
    }

    #[test]
    fn test_value_type_words() {
        let mut interpreter = full_interpreter();

        run(
            &mut interpreter,
            "5 is_value_number? \"s\" is_value_string? 0 [].new is_value_array?",
        );

        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
    }

    #[test]
    fn test_value_copy_isolation() {
        let mut interpreter = full_interpreter();

        run(
            &mut interpreter,
            "1 [].new constant original \
             original value.copy constant copied \
             9 0 original []! \
             0 copied []@",
        );

        // The deep copy kept its own element.
        assert_eq!(pop_int(&mut interpreter), 0);
    }

    #[test]
    fn test_words_table() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "words.get{} constant all \"dup\" all {}?");
        assert_eq!(interpreter.pop().unwrap(), Value::from(true));
    }

    #[test]
    fn test_user_words() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "user.os");
        let os = interpreter.pop().unwrap().as_string();
        assert!(!os.is_empty());

        run(&mut interpreter, "\"FORGE_TEST_NO_SUCH_VAR\" user.env@");
        assert_eq!(interpreter.pop().unwrap().as_string(), "");
    }

    #[test]
    fn test_version_word() {
        let mut interpreter = full_interpreter();

        run(&mut interpreter, "forge.version");
        assert_eq!(
            interpreter.pop().unwrap().as_string(),
            env!("CARGO_PKG_VERSION")
        );
    }
}
