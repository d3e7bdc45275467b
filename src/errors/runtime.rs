// src/errors/runtime.rs
//! Errors surfaced while driving a produced iterator.

use thiserror::Error;

/// Failure raised by user code evaluated inside a dispatch arm.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EvalError {
    #[error("undefined variable '{0}'")]
    UndefinedVariable(String),

    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    #[error("expected {expected} arguments, found {found}")]
    ArityMismatch { expected: usize, found: usize },

    #[error("pop from an empty sequence")]
    PopFromEmpty,

    #[error("division by zero")]
    DivisionByZero,

    #[error("index {index} out of bounds for sequence of length {len}")]
    IndexOutOfBounds { index: i64, len: usize },

    #[error("advance past the end of an iterator")]
    IteratorOverrun,

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("unknown field '{0}'")]
    UnknownField(String),

    #[error("cannot evaluate {0}")]
    Unsupported(&'static str),
}

/// Error taxonomy of the pull-based iteration contract.
///
/// `Exhausted` is the expected termination signal, not a crash: the consumer
/// recovers by simply not calling `next` again. An `Eval` failure propagates
/// the user-code error unmodified and leaves the iterator poisoned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IterError {
    #[error("iterator is exhausted")]
    Exhausted,

    #[error(transparent)]
    Eval(#[from] EvalError),
}
