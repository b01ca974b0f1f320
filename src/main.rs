// main.rs - Forge command line entry point and REPL

use forge::error::ScriptError;
use forge::interpreter::Interpreter;
use forge::value::Value;
use forge::words;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::env;
use std::process::ExitCode;

fn build_interpreter() -> Result<Interpreter, ScriptError> {
    let mut interpreter = Interpreter::new();

    words::register_all(&mut interpreter);

    // The standard library ships inside the binary.
    let standard_library = include_str!("std.f");
    interpreter.process_source("std", standard_library)?;

    if let Ok(library_path) = env::var("FORGE_LIB_PATH") {
        interpreter.add_search_path(&library_path);
    }

    // Everything defined after this point unloads on reset; the native
    // words and the standard library stay.
    interpreter.mark_context();

    interpreter.add_search_path(".");

    Ok(interpreter)
}

fn run_script(
    interpreter: &mut Interpreter,
    path: &str,
    arguments: &[String],
) -> Result<(), ScriptError> {
    let script_args: Vec<Value> = arguments
        .iter()
        .map(|argument| Value::from(argument.clone()))
        .collect();
    let args_value = Value::from(script_args);

    interpreter.add_word(
        "args",
        move |interpreter| {
            interpreter.push(args_value.clone());
            Ok(())
        },
        "List of command line arguments passed to the script.",
        " -- arguments",
    );

    interpreter.process_source_file(path)
}

fn run_repl(interpreter: &mut Interpreter) -> rustyline::Result<()> {
    println!("Forge Forth v{}", env!("CARGO_PKG_VERSION"));
    println!("Type .w to list words, bye to exit");
    println!();

    let mut editor = DefaultEditor::new()?;

    let history_file = dirs::home_dir().map(|mut path| {
        path.push(".forge_history");
        path
    });

    if let Some(path) = &history_file {
        let _ = editor.load_history(path);
    }

    loop {
        match editor.readline("> ") {
            Ok(line) => {
                let input = line.trim();

                if input.is_empty() {
                    continue;
                }

                let _ = editor.add_history_entry(input);

                if input == "bye" {
                    break;
                }

                match interpreter.process_source("<repl>", input) {
                    Ok(()) => println!(" ok"),
                    Err(error) => println!("{}", error),
                }
            }

            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }

            Err(ReadlineError::Eof) => {
                break;
            }

            Err(error) => {
                eprintln!("Error: {:?}", error);
                break;
            }
        }
    }

    if let Some(path) = &history_file {
        let _ = editor.save_history(path);
    }

    Ok(())
}

fn main() -> ExitCode {
    simple_logger::SimpleLogger::new()
        .with_level(log::LevelFilter::Warn)
        .env()
        .init()
        .ok();

    let mut interpreter = match build_interpreter() {
        Ok(interpreter) => interpreter,
        Err(error) => {
            eprintln!("Error loading standard library: {}", error);
            return ExitCode::FAILURE;
        }
    };

    let arguments: Vec<String> = env::args().collect();

    if arguments.len() >= 2 {
        if let Err(error) = run_script(&mut interpreter, &arguments[1], &arguments[2..]) {
            eprintln!("Runtime error:");
            eprintln!("{}", error);
            return ExitCode::FAILURE;
        }

        ExitCode::SUCCESS
    } else {
        match run_repl(&mut interpreter) {
            Ok(()) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        }
    }
}
