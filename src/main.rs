//! Rill - A Small Scripting Language Interpreter
//!
//! This is the entry point for `rill`, a tree-walking interpreter for a
//! dynamically-typed scripting language with first-class functions, lexical
//! closures, and class declarations.
//!
//! ## Pipeline Overview
//!
//! - **lexer**: turns source text into tokens, pulled on demand
//! - **parser**: builds the tree in `ast`, recovering from syntax errors
//! - **analyzer**: checks scope consistency and reports name errors
//! - **interpreter**: evaluates the tree against chained environments
//! - **diagnostics**: the explicit error sink shared by parser and analyzer
//! - **error**: the crate-wide error type
//!
//! ## Exit Codes
//!
//! `0` after evaluation, even when diagnostics were reported along the way;
//! `1` when the arguments are invalid or the source file cannot be read.

mod analyzer;
mod ast;
mod diagnostics;
mod error;
mod interpreter;
mod lexer;
mod parser;

use std::io;
use std::path::PathBuf;
use std::process;

use clap::{Parser as CliParser, ValueEnum};
use log::debug;

use crate::analyzer::Analyzer;
use crate::diagnostics::Reporter;
use crate::interpreter::Interpreter;
use crate::lexer::Lexer;
use crate::parser::Parser;

/// CLI configuration for the rill interpreter.
#[derive(CliParser, Debug)]
#[command(author, version, about = "Interpreter for the rill scripting language")]
struct Cli {
    /// Path to the rill source file.
    file: PathBuf,

    /// Log level for internal pipeline tracing.
    #[arg(value_enum, short, long, default_value_t = LogLevel::default())]
    verbosity: LogLevel,

    /// Dump the parsed tree before evaluating (for debugging).
    #[arg(long)]
    dump_ast: bool,
}

/// Log level of the interpreter's internal tracing.
#[derive(ValueEnum, Clone, Default, Debug)]
enum LogLevel {
    /// Only critical problems.
    #[default]
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<&LogLevel> for log::Level {
    fn from(value: &LogLevel) -> Self {
        match value {
            LogLevel::Error => log::Level::Error,
            LogLevel::Warn => log::Level::Warn,
            LogLevel::Info => log::Level::Info,
            LogLevel::Debug => log::Level::Debug,
            LogLevel::Trace => log::Level::Trace,
        }
    }
}

fn main() {
    let args = match Cli::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            process::exit(1);
        }
    };

    simple_logger::init_with_level((&args.verbosity).into()).unwrap();

    let source = match std::fs::read_to_string(&args.file) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: could not read '{}': {}", args.file.display(), err);
            process::exit(1);
        }
    };

    run(&source, args.dump_ast);
}

/// Drives the pipeline over one source string.
///
/// Diagnostics from parsing and analysis go to stderr without stopping the
/// run; the first runtime error is reported and ends evaluation. None of
/// this affects the exit code.
fn run(source: &str, dump_ast: bool) {
    // A leading byte-order mark is not part of the program.
    let source = source.trim_start_matches('\u{feff}');

    let mut reporter = Reporter::new();

    debug!("parsing {} bytes of source", source.len());
    let program = Parser::new(Lexer::new(source), &mut reporter).parse();
    debug!(
        "parsed {} top-level declaration(s), {} diagnostic(s)",
        program.declarations.len(),
        reporter.count()
    );

    if dump_ast {
        println!("{:#?}", program);
    }

    Analyzer::new(&mut reporter).analyze(&program);
    debug!(
        "semantic analysis finished, {} total diagnostic(s)",
        reporter.count()
    );

    let stdout = io::stdout();
    let mut interpreter = Interpreter::new(stdout.lock());
    if let Err(err) = interpreter.interpret(&program) {
        eprintln!("Error: {}", err);
    }
}
