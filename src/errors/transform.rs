// src/errors/transform.rs
//! Generator transformation errors (E3xxx).

use miette::{Diagnostic, SourceSpan};
use thiserror::Error;

#[derive(Error, Debug, Diagnostic, Clone)]
pub enum TransformError {
    #[error("unsupported construct: {construct}")]
    #[diagnostic(
        code(E3001),
        help("generator bodies support while/for/if/break/continue/return, with yield at statement position")
    )]
    UnsupportedConstruct {
        construct: String,
        #[label("cannot be lowered")]
        span: SourceSpan,
    },

    #[error("yield is not reachable from the generator entry")]
    #[diagnostic(code(E3002))]
    InvalidSuspensionPlacement {
        #[label("unreachable yield")]
        span: SourceSpan,
    },
}
