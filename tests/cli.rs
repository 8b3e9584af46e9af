//! End-to-end tests driving the `rill` binary.

use std::io::Write;

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::NamedTempFile;

fn write_script(source: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("create temp script");
    file.write_all(source.as_bytes()).expect("write script");
    file
}

fn rill() -> Command {
    Command::cargo_bin("rill").expect("rill binary")
}

#[test]
fn evaluates_arithmetic() {
    let script = write_script("print 1 + 2 * 3;\n");
    rill()
        .arg(script.path())
        .assert()
        .success()
        .stdout("7\n")
        .stderr("");
}

#[test]
fn evaluates_closures_across_scopes() {
    let script = write_script(
        "let x = 10;\n\
         fn outer() {\n\
             let y = 20;\n\
             fn inner() { print x + y; }\n\
             inner();\n\
         }\n\
         outer();\n",
    );
    rill().arg(script.path()).assert().success().stdout("30\n");
}

#[test]
fn evaluates_classes() {
    let script = write_script("class C {}\nlet c = C();\nprint c;\n");
    rill()
        .arg(script.path())
        .assert()
        .success()
        .stdout("<instance of <class C>>\n");
}

#[test]
fn missing_argument_exits_nonzero() {
    rill().assert().code(1);
}

#[test]
fn unreadable_file_exits_nonzero() {
    rill()
        .arg("no-such-file.rill")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn parse_diagnostics_do_not_fail_the_run() {
    // The malformed first statement is reported; the rest still runs.
    let script = write_script("print ;\nprint 2;\n");
    rill()
        .arg(script.path())
        .assert()
        .success()
        .stdout("2\n")
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn semantic_diagnostics_do_not_fail_the_run() {
    let script = write_script("fn f() {}\nf = 1;\nprint \"done\";\n");
    rill()
        .arg(script.path())
        .assert()
        .success()
        .stdout("done\n")
        .stderr(predicate::str::contains("cannot assign to function 'f'"));
}

#[test]
fn runtime_error_is_reported_and_stops_evaluation() {
    let script = write_script("print 1;\nprint 1 / 0;\nprint 2;\n");
    rill()
        .arg(script.path())
        .assert()
        .success()
        .stdout("1\n")
        .stderr(predicate::str::contains("division by zero"));
}

#[test]
fn dump_ast_prints_the_tree() {
    let script = write_script("let x = 1;\n");
    rill()
        .arg(script.path())
        .arg("--dump-ast")
        .assert()
        .success()
        .stdout(predicate::str::contains("Program"));
}
