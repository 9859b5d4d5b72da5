use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use paisley::builtins::Builtin;
use serde_json::{Value, json};

fn paisley() -> Command {
    Command::new(env!("CARGO_BIN_EXE_paisley"))
}

fn call(builtin: Builtin, arg: i64, line: i64) -> Value {
    json!([1, builtin.index(), arg, line])
}

/// Writes `{instructions, constants}` into `dir` and returns its path.
fn write_program(dir: &Path, instructions: Vec<Value>, constants: Value) -> PathBuf {
    let path = dir.join("program.json");
    let program = json!({ "instructions": instructions, "constants": constants });
    std::fs::write(&path, program.to_string()).unwrap();
    path
}

fn run(program: &Path, flags: &[&str], args: &[&str]) -> Output {
    paisley()
        .args(flags)
        .arg("--no-color")
        .arg(program)
        .args(args)
        .output()
        .expect("failed to run paisley")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

// --- Output commands ---

#[test]
fn print_command() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(dir.path(), vec![json!([4, 0, 0, 1]), json!([6, 0, 0, 1])], json!([["print", "hello"]]));
    let out = run(&program, &[], &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "hello");
}

#[test]
fn arithmetic_through_a_variable() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(
        dir.path(),
        vec![
            json!([4, 0, 0, 1]),
            json!([4, 1, 0, 1]),
            call(Builtin::Add, 0, 1),
            json!([2, 2, 0, 1]),
            json!([3, 2, 0, 2]),
            json!([4, 3, 0, 2]),
            call(Builtin::Implode, 2, 2),
            json!([6, 0, 0, 2]),
        ],
        json!([2, 3, "x", "print"]),
    );
    let out = run(&program, &[], &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "5");
}

#[test]
fn argv_is_visible_as_at() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(
        dir.path(),
        vec![json!([3, 0, 0, 1]), json!([4, 1, 0, 1]), call(Builtin::Implode, 2, 1), json!([6, 0, 0, 1])],
        json!(["@", "print"]),
    );
    let out = run(&program, &[], &["alpha", "beta"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "alpha beta");
}

// --- Errors ---

#[test]
fn uncaught_error_exits_one_with_line() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(dir.path(), vec![json!([4, 0, 0, 7]), json!([6, 0, 0, 7])], json!([["error", "boom"]]));
    let out = run(&program, &[], &[]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("[line 7] boom"), "stderr: {err}");
    assert!(err.contains("--> line 7"), "stderr: {err}");
}

#[test]
fn caught_error_reaches_handler() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(
        dir.path(),
        vec![
            json!([17, 4, 0, 1]),
            json!([4, 0, 0, 3]),
            json!([6, 0, 0, 3]),
            json!([20, 0, 0, 3]),
            json!([4, 1, 0, 5]),
            call(Builtin::ArrayIndex, 0, 5),
            json!([4, 2, 0, 5]),
            call(Builtin::Implode, 2, 5),
            json!([6, 0, 0, 5]),
        ],
        json!([["error", "boom"], "message", "print"]),
    );
    let out = run(&program, &[], &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "boom");
}

#[test]
fn json_diagnostics() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(dir.path(), vec![json!([4, 0, 0, 7]), json!([6, 0, 0, 7])], json!([["error", "boom"]]));
    let out = run(&program, &["--diagnostics", "json"], &[]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    let v: Value = serde_json::from_str(err.trim()).expect("stderr should be one JSON object");
    assert_eq!(v["severity"], "error");
    assert_eq!(v["line"], 7);
    assert_eq!(v["message"], "[line 7] boom");
}

#[test]
fn invalid_opcode_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(dir.path(), vec![json!([99, 0, 0, 1])], json!([]));
    let out = run(&program, &[], &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("invalid opcode 99"), "stderr: {}", stderr(&out));
}

#[test]
fn unreadable_bytecode_exits_two() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.json");
    std::fs::write(&path, "{ not json").unwrap();
    let out = run(&path, &[], &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("malformed bytecode"), "stderr: {}", stderr(&out));

    let out = run(&dir.path().join("missing.json"), &[], &[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("cannot read"), "stderr: {}", stderr(&out));
}

#[test]
fn warnings_do_not_stop_execution() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(
        dir.path(),
        vec![
            json!([4, 0, 0, 4]),
            json!([4, 1, 0, 4]),
            call(Builtin::ArrayIndex, 0, 4),
            json!([5, 0, 0, 4]),
            json!([4, 2, 0, 5]),
            json!([6, 0, 0, 5]),
        ],
        json!([[1, 2], 0, ["print", "done"]]),
    );
    let out = run(&program, &[], &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "done");
    let err = stderr(&out);
    assert!(err.contains("warning:"), "stderr: {err}");
    assert!(err.contains("--> line 4"), "stderr: {err}");
}

// --- Sandbox ---

fn write_file_program(dir: &Path, target: &Path) -> PathBuf {
    write_program(
        dir,
        vec![json!([4, 0, 0, 1]), call(Builtin::FileWrite, 0, 1), json!([5, 0, 0, 1])],
        json!([[target.to_string_lossy(), "hi"]]),
    )
}

#[test]
fn sandbox_blocks_file_write() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");
    let program = write_file_program(dir.path(), &target);
    let out = run(&program, &["--sandbox"], &[]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("file_write"), "stderr: {}", stderr(&out));
    assert!(!target.exists());
}

#[test]
fn file_write_allowed_without_sandbox() {
    let dir = tempfile::tempdir().unwrap();
    let target = dir.path().join("out.txt");
    let program = write_file_program(dir.path(), &target);
    let out = run(&program, &[], &[]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(std::fs::read_to_string(&target).unwrap(), "hi");
}

// --- Randomness ---

#[test]
fn seeded_runs_repeat() {
    let dir = tempfile::tempdir().unwrap();
    let program = write_program(
        dir.path(),
        vec![
            json!([4, 0, 0, 1]),
            call(Builtin::RandomInt, 0, 1),
            json!([4, 1, 0, 1]),
            call(Builtin::Implode, 2, 1),
            json!([6, 0, 0, 1]),
        ],
        json!([[1, 1000000], "print"]),
    );
    let first = run(&program, &["--seed", "7"], &[]);
    let second = run(&program, &["--seed", "7"], &[]);
    assert!(first.status.success(), "stderr: {}", stderr(&first));
    assert_eq!(stdout(&first), stdout(&second));
    let n: f64 = stdout(&first).parse().unwrap();
    assert!((1.0..=1_000_000.0).contains(&n));
}
