//! Error Handling for the Rill Scripting Language
//!
//! This module defines the error type shared by the pipeline stages of the
//! Rill interpreter. Lexical problems never surface here (the lexer emits
//! unknown tokens instead of failing), and parse problems are reported
//! through the diagnostic sink and recovered from, so the variants below are
//! dominated by the runtime taxonomy:
//!
//! - **`UndefinedVariable`**: environment lookup or assignment miss
//! - **`TypeMismatch`**: arithmetic or comparison operand of the wrong kind
//! - **`DivisionByZero`**: `/` with a zero right operand
//! - **`ArityMismatch`**: call with the wrong number of arguments
//! - **`NotCallable`**: call whose callee is neither a function nor a class
//! - **`Runtime`**: miscellaneous evaluation failures
//! - **`Io`**: failures of the output sink, converted from `std::io::Error`
//!
//! Runtime errors unwind the evaluator back to the driver, which reports a
//! single diagnostic line and stops evaluating. The `Parse` variant is the
//! parser's internal unwinding signal; it never escapes `Parser::parse`,
//! which always yields a program.

use thiserror::Error;

/// Error type for all Rill pipeline stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RillError {
    /// Syntax error during parsing. Reported at the point of detection;
    /// carried only to unwind to the nearest recovery point.
    #[error("parse error: {0}")]
    Parse(String),

    /// Reference to a variable with no binding in the environment chain.
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    /// Operand of the wrong kind in an arithmetic or comparison operation.
    #[error("{0}")]
    TypeMismatch(String),

    /// Division with a zero right operand.
    #[error("division by zero")]
    DivisionByZero,

    /// Call with the wrong number of arguments.
    #[error("expected {expected} argument(s) but got {found}")]
    ArityMismatch { expected: usize, found: usize },

    /// Call whose callee is neither a function nor a class.
    #[error("can only call functions and classes, not {0}")]
    NotCallable(String),

    /// General runtime execution error.
    #[error("{0}")]
    Runtime(String),

    /// Failure writing to the output sink.
    #[error("io error: {0}")]
    Io(String),
}

impl From<std::io::Error> for RillError {
    fn from(err: std::io::Error) -> Self {
        RillError::Io(err.to_string())
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, RillError>;
