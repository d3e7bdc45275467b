// src/lib.rs
//! unyield — compiles yield-style generator bodies into resumable
//! iterator state machines.
//!
//! The input is a structured method body with `yield` at statement
//! position ([`ast::GeneratorFn`]); the output is a [`machine::StateMachine`]
//! ready for emission: persistent fields for every cross-suspension-live
//! local and cursor, plus one dispatch arm per resume label. The pipeline
//! runs four passes:
//!
//! 1. [`cfg`] — lower the body to basic blocks with explicit edges
//! 2. [`suspend`] — assign dense, reproducible resume labels
//! 3. [`liveness`] — backward dataflow for cross-suspension live sets
//! 4. [`synth`] — rewrite the graph into the flat dispatch structure
//!
//! [`exec`] drives the result in-process behind the pull contract
//! (`has_next`/`next`) and checks it against a coroutine-backed reference
//! interpreter.

pub mod ast;
pub mod build;
pub mod cfg;
pub mod errors;
pub mod exec;
pub mod intern;
pub mod liveness;
pub mod machine;
pub mod span;
pub mod suspend;
pub mod synth;

pub use errors::{EvalError, IterError, TransformError};
pub use intern::{Interner, Symbol};
pub use machine::StateMachine;
pub use span::Span;

/// Lower a generator function to a state machine ready for emission.
pub fn lower_generator(
    func: &ast::GeneratorFn,
    interner: &mut Interner,
) -> Result<StateMachine, TransformError> {
    let cfg = cfg::CfgBuilder::new(interner).build(func)?;
    tracing::debug!(
        generator = interner.resolve(func.name),
        blocks = cfg.len(),
        loops = cfg.loops.len(),
        "lowered body to cfg"
    );
    let points = suspend::locate(&cfg)?;
    tracing::debug!(points = points.len(), "located suspension points");
    let live = liveness::analyze(&cfg, &points);
    Ok(synth::synthesize(func, &cfg, &points, &live, interner))
}
