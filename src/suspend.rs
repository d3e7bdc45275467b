// src/suspend.rs
//! Suspension point location and resume label assignment.
//!
//! Labels are assigned by a fixed pre-order walk of the CFG from the
//! entry block, true branch before false branch and loop body before loop
//! exit, so the numbering is reproducible for the same input. Label 0 is
//! reserved for "not yet started".

use rustc_hash::FxHashSet;

use crate::ast::Expr;
use crate::cfg::{BlockId, Cfg, Terminator};
use crate::errors::TransformError;
use crate::span::Span;

/// Identifier of a resume position (and of its dispatch arm).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ResumeLabel(pub u32);

impl ResumeLabel {
    /// The state before the first advance: execution has not started.
    pub const START: ResumeLabel = ResumeLabel(0);

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A located suspension point.
#[derive(Debug, Clone)]
pub struct SuspensionPoint {
    pub label: ResumeLabel,
    /// Block whose terminator suspends.
    pub block: BlockId,
    /// Block where execution continues on the next advance.
    pub resume: BlockId,
    /// The yielded expression.
    pub value: Expr,
    pub span: Span,
}

/// Locate every suspension point and assign dense resume labels.
pub fn locate(cfg: &Cfg) -> Result<Vec<SuspensionPoint>, TransformError> {
    let (order, visited) = preorder(cfg);

    // a yield the walk never reaches sits on no valid control path
    for id in cfg.block_ids() {
        if let Terminator::Yield { span, .. } = cfg.block(id).terminator
            && !visited.contains(&id)
        {
            return Err(TransformError::InvalidSuspensionPlacement { span: span.into() });
        }
    }

    let mut points = Vec::new();
    for &block in &order {
        if let Terminator::Yield {
            value,
            resume,
            span,
        } = &cfg.block(block).terminator
        {
            points.push(SuspensionPoint {
                label: ResumeLabel(points.len() as u32 + 1),
                block,
                resume: *resume,
                value: value.clone(),
                span: *span,
            });
        }
    }

    // a second walk disagreeing with the first is an engine bug, not a
    // user input error
    debug_assert_eq!(order, preorder(cfg).0, "non-deterministic label traversal");

    tracing::trace!(points = points.len(), "assigned resume labels");
    Ok(points)
}

/// Pre-order DFS visit sequence plus the visited set.
fn preorder(cfg: &Cfg) -> (Vec<BlockId>, FxHashSet<BlockId>) {
    let mut order = Vec::with_capacity(cfg.len());
    let mut visited = FxHashSet::default();
    let mut stack = vec![cfg.entry];
    while let Some(block) = stack.pop() {
        if !visited.insert(block) {
            continue;
        }
        order.push(block);
        let succs = cfg.block(block).terminator.successors();
        // push in reverse so the first successor is visited first
        for &succ in succs.iter().rev() {
            if !visited.contains(&succ) {
                stack.push(succ);
            }
        }
    }
    (order, visited)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::{BinaryOp, TypeExpr, PrimitiveType};
    use crate::build;
    use crate::cfg::CfgBuilder;
    use crate::intern::Interner;

    #[test]
    fn labels_are_dense_and_start_at_one() {
        let mut interner = Interner::new();
        let name = interner.intern("triple");
        let func = build::generator(
            name,
            vec![],
            TypeExpr::Primitive(PrimitiveType::I64),
            vec![
                build::yield_(build::int(1)),
                build::yield_(build::int(2)),
                build::yield_(build::int(3)),
            ],
        );
        let cfg = CfgBuilder::new(&mut interner).build(&func).unwrap();
        let points = locate(&cfg).unwrap();
        let labels: Vec<u32> = points.iter().map(|p| p.label.0).collect();
        assert_eq!(labels, vec![1, 2, 3]);
    }

    #[test]
    fn true_branch_is_numbered_before_false_branch() {
        let mut interner = Interner::new();
        let name = interner.intern("cond");
        let func = build::generator(
            name,
            vec![],
            TypeExpr::Primitive(PrimitiveType::I64),
            vec![build::if_else(
                build::boolean(true),
                vec![build::yield_(build::int(10))],
                vec![build::yield_(build::int(20))],
            )],
        );
        let cfg = CfgBuilder::new(&mut interner).build(&func).unwrap();
        let points = locate(&cfg).unwrap();
        assert_eq!(points.len(), 2);
        // label 1 belongs to the then-branch yield
        assert!(matches!(
            points[0].value.kind,
            crate::ast::ExprKind::IntLiteral(10)
        ));
    }

    #[test]
    fn loop_body_is_numbered_before_loop_exit() {
        let mut interner = Interner::new();
        let name = interner.intern("loop_then_tail");
        let x = interner.intern("x");
        let func = build::generator(
            name,
            vec![],
            TypeExpr::Primitive(PrimitiveType::I64),
            vec![
                build::let_(x, build::int(0)),
                build::while_(
                    build::binary(build::var(x), BinaryOp::Lt, build::int(2)),
                    vec![
                        build::yield_(build::var(x)),
                        build::assign(x, build::binary(build::var(x), BinaryOp::Add, build::int(1))),
                    ],
                ),
                build::yield_(build::int(99)),
            ],
        );
        let cfg = CfgBuilder::new(&mut interner).build(&func).unwrap();
        let points = locate(&cfg).unwrap();
        assert_eq!(points.len(), 2);
        assert!(matches!(
            points[1].value.kind,
            crate::ast::ExprKind::IntLiteral(99)
        ));
    }

    #[test]
    fn unreachable_yield_is_invalid() {
        let mut interner = Interner::new();
        let name = interner.intern("dead");
        let func = build::generator(
            name,
            vec![],
            TypeExpr::Primitive(PrimitiveType::I64),
            vec![build::return_(), build::yield_(build::int(1))],
        );
        let cfg = CfgBuilder::new(&mut interner).build(&func).unwrap();
        let err = locate(&cfg).unwrap_err();
        assert!(matches!(
            err,
            TransformError::InvalidSuspensionPlacement { .. }
        ));
    }
}
