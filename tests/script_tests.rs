// script_tests.rs - End to end tests driving complete programs

use forge::interpreter::Interpreter;
use forge::value::Value;
use forge::words;

fn interpreter_with_std() -> Interpreter {
    let mut interpreter = Interpreter::new();

    words::register_all(&mut interpreter);

    interpreter
        .process_source("std", include_str!("../src/std.f"))
        .expect("standard library must load");

    interpreter.mark_context();
    interpreter
}

fn run(interpreter: &mut Interpreter, source: &str) {
    if let Err(error) = interpreter.process_source("test", source) {
        panic!("script failed: {}", error);
    }
}

fn pop_int(interpreter: &mut Interpreter) -> i64 {
    let value = interpreter.pop().expect("expected a value on the stack");
    value.as_integer(interpreter).expect("expected an integer")
}

#[test]
fn test_arithmetic_end_to_end() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "5 3 +");

    assert_eq!(pop_int(&mut interpreter), 8);
    assert_eq!(interpreter.depth(), 0);
}

#[test]
fn test_float_arithmetic() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "1.5 2.25 + 0.25 -");

    assert_eq!(interpreter.pop().unwrap(), Value::from(3.5));
}

#[test]
fn test_hex_and_binary_literals() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "0xff 0b101 +");

    assert_eq!(pop_int(&mut interpreter), 260);
}

#[test]
fn test_word_definition_with_comments() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, ": square ( n -- n*n ) dup * ;");
    run(&mut interpreter, "7 square");

    assert_eq!(pop_int(&mut interpreter), 49);
}

#[test]
fn test_recursion_through_late_binding() {
    let mut interpreter = interpreter_with_std();

    // The definition references itself before it exists; the call resolves
    // by name at run time.
    run(
        &mut interpreter,
        ": factorial ( n -- n! ) dup 1 <= if drop 1 else dup 1 - factorial * then ;",
    );

    run(&mut interpreter, "5 factorial");
    assert_eq!(pop_int(&mut interpreter), 120);
}

#[test]
fn test_standard_library_helpers() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "3 7 min 3 7 max -5 abs 1 2 nip");

    assert_eq!(pop_int(&mut interpreter), 2);
    assert_eq!(pop_int(&mut interpreter), 5);
    assert_eq!(pop_int(&mut interpreter), 7);
    assert_eq!(pop_int(&mut interpreter), 3);
}

#[test]
fn test_two_dup() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "1 2 2dup");

    assert_eq!(pop_int(&mut interpreter), 2);
    assert_eq!(pop_int(&mut interpreter), 1);
    assert_eq!(pop_int(&mut interpreter), 2);
    assert_eq!(pop_int(&mut interpreter), 1);
}

#[test]
fn test_counting_loop() {
    let mut interpreter = interpreter_with_std();

    run(
        &mut interpreter,
        ": sum-to ( n -- sum ) \
             variable limit limit ! \
             variable i variable total \
             begin i @ limit @ < while \
                 i ++! \
                 i @ total +! \
             repeat \
             total @ ;",
    );

    run(&mut interpreter, "5 sum-to");
    assert_eq!(pop_int(&mut interpreter), 15);
}

#[test]
fn test_loop_break() {
    let mut interpreter = interpreter_with_std();

    run(
        &mut interpreter,
        ": next-mult-3 ( n -- m ) \
             variable n n ! \
             begin \
                 n ++! \
                 n @ 3 % 0= if break then \
             repeat \
             n @ ;",
    );

    run(&mut interpreter, "4 next-mult-3");
    assert_eq!(pop_int(&mut interpreter), 6);
}

#[test]
fn test_loop_continue() {
    let mut interpreter = interpreter_with_std();

    run(
        &mut interpreter,
        ": odd-sum ( n -- sum ) \
             variable limit limit ! \
             variable i variable total \
             begin i @ limit @ < while \
                 i ++! \
                 i @ 2 % 0= if continue then \
                 i @ total +! \
             repeat \
             total @ ;",
    );

    run(&mut interpreter, "6 odd-sum");
    assert_eq!(pop_int(&mut interpreter), 9);
}

#[test]
fn test_nested_loop_break_stays_inner() {
    let mut interpreter = interpreter_with_std();

    run(
        &mut interpreter,
        ": nested ( -- total ) \
             variable i variable j variable total \
             begin i @ 3 < while \
                 i ++! \
                 0 j ! \
                 begin j @ 10 < while \
                     j ++! \
                     j @ 2 >= if break then \
                 repeat \
                 j @ total +! \
             repeat \
             total @ ;",
    );

    // Each outer pass the inner loop exits at two; three passes sum to six.
    run(&mut interpreter, "nested");
    assert_eq!(pop_int(&mut interpreter), 6);
}

#[test]
fn test_try_catch_recovery() {
    let mut interpreter = interpreter_with_std();

    run(
        &mut interpreter,
        ": safe-div ( a b -- q ) try / catch drop -1 endcatch ;",
    );

    run(&mut interpreter, "10 2 safe-div");
    assert_eq!(pop_int(&mut interpreter), 5);

    run(&mut interpreter, "10 0 safe-div");
    assert_eq!(pop_int(&mut interpreter), -1);
    assert_eq!(interpreter.depth(), 0);
}

#[test]
fn test_catch_receives_message() {
    let mut interpreter = interpreter_with_std();

    run(
        &mut interpreter,
        ": shout try \"kaboom\" throw catch endcatch ; shout",
    );

    let message = interpreter.pop().unwrap().as_string();
    assert!(message.contains("kaboom"));
}

#[test]
fn test_uncaught_error_stops_the_script() {
    let mut interpreter = interpreter_with_std();

    let error = interpreter
        .process_source("test", "1 2 + no-such-word")
        .unwrap_err();

    assert!(error.message().contains("Word, no-such-word, not found."));
}

#[test]
fn test_stack_underflow_message() {
    let mut interpreter = interpreter_with_std();

    let error = interpreter.process_source("test", "drop").unwrap_err();

    assert!(error.message().contains("Stack underflow."));
    assert_eq!(interpreter.depth(), 0);
}

#[test]
fn test_unless_macro_from_std() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "5 0 > unless 1 then");
    assert_eq!(interpreter.depth(), 0);

    run(&mut interpreter, "0 0 > unless 1 then");
    assert_eq!(pop_int(&mut interpreter), 1);
}

#[test]
fn test_user_defined_compiler_macro() {
    let mut interpreter = interpreter_with_std();

    // `twice` compiles its following word two times.
    run(
        &mut interpreter,
        ": twice immediate word dup op.execute op.execute ;",
    );

    run(&mut interpreter, ": quad twice dup ; 3 quad");

    assert_eq!(interpreter.depth(), 3);
    assert_eq!(pop_int(&mut interpreter), 3);
    assert_eq!(pop_int(&mut interpreter), 3);
    assert_eq!(pop_int(&mut interpreter), 3);
}

#[test]
fn test_constant_shadows_global_word() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, ": x 1 ;");
    run(&mut interpreter, ": shadowed 99 constant x x ;");

    run(&mut interpreter, "shadowed x");

    assert_eq!(pop_int(&mut interpreter), 1);
    assert_eq!(pop_int(&mut interpreter), 99);
}

#[test]
fn test_word_locals_vanish_after_call() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, ": scoped variable inner 5 inner ! ; scoped");

    // The word ran inside its own context layer, so its variable accessor
    // is gone afterwards.
    assert!(interpreter.find_word("inner").is_none());
}

#[test]
fn test_execute_source_word() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "\"3 4 +\" code.execute_source");

    assert_eq!(pop_int(&mut interpreter), 7);
}

#[test]
fn test_include_runs_a_file() {
    let mut interpreter = interpreter_with_std();

    let directory = std::env::temp_dir();
    let path = directory.join(format!("forge-include-test-{}.f", std::process::id()));

    std::fs::write(&path, ": from-file 40 2 + ;\n").unwrap();
    interpreter.add_search_path(&directory.to_string_lossy());

    run(
        &mut interpreter,
        &format!("\"{}\" include from-file", path.file_name().unwrap().to_string_lossy()),
    );

    assert_eq!(pop_int(&mut interpreter), 42);

    std::fs::remove_file(&path).ok();
}

#[test]
fn test_reset_unloads_user_definitions() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "5 constant five");
    assert!(interpreter.find_word("five").is_some());

    run(&mut interpreter, "reset");

    assert!(interpreter.find_word("five").is_none());
    assert!(interpreter.find_word("dup").is_some());
    assert_eq!(interpreter.depth(), 0);
}

#[test]
fn test_version_is_exposed() {
    let mut interpreter = interpreter_with_std();

    run(&mut interpreter, "forge.version");

    let version = interpreter.pop().unwrap().as_string();
    assert!(!version.is_empty());
}
