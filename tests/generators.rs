// tests/generators.rs
//! Canonical sequence scenarios, plus sequence fidelity of the machine
//! against the coroutine-backed reference generator.

mod common;

use common::*;
use unyield::ast::{PrimitiveType, TypeExpr};
use unyield::build;
use unyield::errors::IterError;
use unyield::exec::{MachineIterator, ReferenceGenerator, TreeNode, Value};
use unyield::intern::Interner;
use unyield::lower_generator;

#[test]
fn fibonacci_first_eight() {
    let mut interner = Interner::new();
    let func = fibonacci(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();
    let mut iter = MachineIterator::new(&machine, &interner, vec![]).unwrap();

    assert_eq!(drain_machine(&mut iter, 8), vec![1, 1, 2, 3, 5, 8, 13, 21]);
    // the sequence is infinite
    assert!(iter.has_next());
}

#[test]
fn composite_sequence_then_exhausted() {
    let mut interner = Interner::new();
    let func = composite(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();
    let mut iter = MachineIterator::new(&machine, &interner, vec![]).unwrap();

    assert_eq!(drain_machine(&mut iter, 100), COMPOSITE_EXPECTED.to_vec());
    assert!(!iter.has_next());
    assert_eq!(iter.next().unwrap_err(), IterError::Exhausted);
}

#[test]
fn tree_traversal_pops_in_lifo_order() {
    let mut interner = Interner::new();
    let func = tree_traversal(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();

    // root 1 with left leaf 2 and right leaf 3; right is visited first
    let root = TreeNode::branch(1, Some(TreeNode::leaf(2)), Some(TreeNode::leaf(3)));
    let mut iter = MachineIterator::new(&machine, &interner, vec![Value::Node(root)]).unwrap();

    assert_eq!(drain_machine(&mut iter, 100), vec![1, 3, 2]);
    assert!(!iter.has_next());
}

#[test]
fn tree_traversal_single_leaf() {
    let mut interner = Interner::new();
    let func = tree_traversal(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();

    let mut iter =
        MachineIterator::new(&machine, &interner, vec![Value::Node(TreeNode::leaf(9))]).unwrap();

    assert_eq!(drain_machine(&mut iter, 100), vec![9]);
    assert!(!iter.has_next());
    assert_eq!(iter.next().unwrap_err(), IterError::Exhausted);
}

#[test]
fn for_over_external_iterator_parameter() {
    let mut interner = Interner::new();
    let name = interner.intern("drain");
    let items = interner.intern("items");
    let x = interner.intern("x");
    let func = build::generator(
        name,
        vec![build::param(
            items,
            TypeExpr::Iterator(Box::new(TypeExpr::Primitive(PrimitiveType::I64))),
        )],
        TypeExpr::Primitive(PrimitiveType::I64),
        vec![build::for_(
            x,
            build::var(items),
            vec![build::yield_(build::var(x))],
        )],
    );
    let machine = lower_generator(&func, &mut interner).unwrap();

    let supplied = Value::iterator(vec![Value::Int(5), Value::Int(6), Value::Int(7)]);
    let mut iter = MachineIterator::new(&machine, &interner, vec![supplied]).unwrap();
    assert_eq!(drain_machine(&mut iter, 100), vec![5, 6, 7]);
    assert!(!iter.has_next());
}

#[test]
fn fidelity_fibonacci_prefix() {
    let mut interner = Interner::new();
    let func = fibonacci(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();

    let mut transformed = MachineIterator::new(&machine, &interner, vec![]).unwrap();
    let mut reference = ReferenceGenerator::new(&func, &interner, vec![]).unwrap();

    assert_eq!(
        drain_machine(&mut transformed, 20),
        drain_reference(&mut reference, 20)
    );
}

#[test]
fn fidelity_composite_full_sequence() {
    let mut interner = Interner::new();
    let func = composite(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();

    let mut transformed = MachineIterator::new(&machine, &interner, vec![]).unwrap();
    let mut reference = ReferenceGenerator::new(&func, &interner, vec![]).unwrap();

    assert_eq!(
        drain_machine(&mut transformed, 100),
        drain_reference(&mut reference, 100)
    );
    assert!(!transformed.has_next());
    assert!(!reference.has_next());
}

#[test]
fn fidelity_tree_traversal() {
    let mut interner = Interner::new();
    let func = tree_traversal(&mut interner);
    let machine = lower_generator(&func, &mut interner).unwrap();

    // a deeper tree exercises interleaved pushes across suspensions
    let tree = TreeNode::branch(
        1,
        Some(TreeNode::branch(2, Some(TreeNode::leaf(4)), None)),
        Some(TreeNode::branch(3, None, Some(TreeNode::leaf(5)))),
    );

    let mut transformed =
        MachineIterator::new(&machine, &interner, vec![Value::Node(tree.clone())]).unwrap();
    let mut reference =
        ReferenceGenerator::new(&func, &interner, vec![Value::Node(tree)]).unwrap();

    assert_eq!(
        drain_machine(&mut transformed, 100),
        drain_reference(&mut reference, 100)
    );
}

#[test]
fn live_local_survives_suspensions_unchanged() {
    let mut interner = Interner::new();
    let name = interner.intern("hold");
    let x = interner.intern("x");
    let func = build::generator(
        name,
        vec![],
        TypeExpr::Primitive(PrimitiveType::I64),
        vec![
            build::let_(x, build::int(42)),
            build::yield_(build::int(1)),
            build::yield_(build::int(2)),
            build::yield_(build::var(x)),
        ],
    );
    let machine = lower_generator(&func, &mut interner).unwrap();
    let mut iter = MachineIterator::new(&machine, &interner, vec![]).unwrap();

    // x is not reset between resumes
    assert_eq!(drain_machine(&mut iter, 100), vec![1, 2, 42]);
}
