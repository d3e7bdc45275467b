// src/errors/mod.rs
//! Structured error reporting for the unyield engine.
//!
//! Compile-time errors use miette for fancy diagnostics; run-time errors
//! are surfaced by the produced iterator itself.

pub mod runtime;
pub mod transform;

pub use runtime::{EvalError, IterError};
pub use transform::TransformError;
