// tests/common/mod.rs
//! Canonical generator bodies shared across the integration suites.

#![allow(dead_code)]

use unyield::ast::{BinaryOp, GeneratorFn, PrimitiveType, TypeExpr, UnaryOp};
use unyield::build;
use unyield::exec::{MachineIterator, ReferenceGenerator};
use unyield::intern::Interner;

/// Infinite fibonacci seeded 1,1: each resume yields `a`, then performs
/// `a, b = b, a + b`.
pub fn fibonacci(interner: &mut Interner) -> GeneratorFn {
    let name = interner.intern("fibonacci");
    let a = interner.intern("a");
    let b = interner.intern("b");
    let tmp = interner.intern("tmp");
    build::generator(
        name,
        vec![],
        TypeExpr::Primitive(PrimitiveType::I64),
        vec![
            build::let_(a, build::int(1)),
            build::let_(b, build::int(1)),
            build::while_(
                build::boolean(true),
                vec![
                    build::yield_(build::var(a)),
                    build::let_(tmp, build::var(a)),
                    build::assign(a, build::var(b)),
                    build::assign(
                        b,
                        build::binary(build::var(b), BinaryOp::Add, build::var(tmp)),
                    ),
                ],
            ),
        ],
    )
}

/// Four chained control regions: a single literal yield, a bounded
/// counting loop, a fixed literal collection, and an explicit iterator
/// drained with has_next/next.
pub fn composite(interner: &mut Interner) -> GeneratorFn {
    let name = interner.intern("composite");
    let x = interner.intern("x");
    let i = interner.intern("i");
    let numbers = interner.intern("numbers");
    let it = interner.intern("it");
    let j = interner.intern("j");
    let iterator = interner.intern("iterator");
    let has_next = interner.intern("has_next");
    let next = interner.intern("next");
    build::generator(
        name,
        vec![],
        TypeExpr::Primitive(PrimitiveType::I64),
        vec![
            build::yield_(build::int(1)),
            build::let_(x, build::int(0)),
            build::while_(
                build::binary(build::var(x), BinaryOp::Lt, build::int(10)),
                vec![
                    build::yield_(build::var(x)),
                    build::assign(
                        x,
                        build::binary(build::var(x), BinaryOp::Add, build::int(1)),
                    ),
                ],
            ),
            build::for_(
                i,
                build::seq(vec![
                    build::int(1),
                    build::int(2),
                    build::int(3),
                    build::int(4),
                ]),
                vec![build::yield_(build::var(i))],
            ),
            build::let_(
                numbers,
                build::seq(vec![
                    build::int(1),
                    build::int(2),
                    build::int(3),
                    build::int(4),
                ]),
            ),
            build::let_(it, build::method(build::var(numbers), iterator, vec![])),
            build::while_(
                build::method(build::var(it), has_next, vec![]),
                vec![
                    build::let_(j, build::method(build::var(it), next, vec![])),
                    build::yield_(build::var(j)),
                ],
            ),
        ],
    )
}

pub const COMPOSITE_EXPECTED: [i64; 19] = [1, 0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 1, 2, 3, 4, 1, 2, 3, 4];

/// Stack-driven tree traversal: push the root, then repeatedly pop, yield
/// the popped node's value, and push its non-null children left-then-right
/// (so the right child is visited before the left, LIFO order).
pub fn tree_traversal(interner: &mut Interner) -> GeneratorFn {
    let name = interner.intern("traverse");
    let root = interner.intern("root");
    let to_explore = interner.intern("to_explore");
    let n = interner.intern("n");
    let push = interner.intern("push");
    let pop = interner.intern("pop");
    let is_empty = interner.intern("is_empty");
    let value = interner.intern("value");
    let left = interner.intern("left");
    let right = interner.intern("right");
    let node_ty = TypeExpr::Named(interner.intern("Node"));
    build::generator(
        name,
        vec![build::param(root, node_ty)],
        TypeExpr::Primitive(PrimitiveType::I64),
        vec![
            build::let_(to_explore, build::seq(vec![])),
            build::expr(build::method(
                build::var(to_explore),
                push,
                vec![build::var(root)],
            )),
            build::while_(
                build::unary(
                    UnaryOp::Not,
                    build::method(build::var(to_explore), is_empty, vec![]),
                ),
                vec![
                    build::let_(n, build::method(build::var(to_explore), pop, vec![])),
                    build::yield_(build::field(build::var(n), value)),
                    build::if_(
                        build::binary(
                            build::field(build::var(n), left),
                            BinaryOp::Ne,
                            build::null(),
                        ),
                        vec![build::expr(build::method(
                            build::var(to_explore),
                            push,
                            vec![build::field(build::var(n), left)],
                        ))],
                    ),
                    build::if_(
                        build::binary(
                            build::field(build::var(n), right),
                            BinaryOp::Ne,
                            build::null(),
                        ),
                        vec![build::expr(build::method(
                            build::var(to_explore),
                            push,
                            vec![build::field(build::var(n), right)],
                        ))],
                    ),
                ],
            ),
        ],
    )
}

pub fn drain_machine(iter: &mut MachineIterator<'_>, limit: usize) -> Vec<i64> {
    let mut out = Vec::new();
    while iter.has_next() && out.len() < limit {
        out.push(iter.next().unwrap().as_int().unwrap());
    }
    out
}

pub fn drain_reference(generator: &mut ReferenceGenerator, limit: usize) -> Vec<i64> {
    let mut out = Vec::new();
    while generator.has_next() && out.len() < limit {
        out.push(generator.next().unwrap().as_int().unwrap());
    }
    out
}
