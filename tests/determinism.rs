// tests/determinism.rs
//! Reproducible compilation: the same input body yields state machines
//! with identical resume-label numbering and identical field sets.

mod common;

use common::*;
use unyield::ast::{BinaryOp, PrimitiveType, TypeExpr};
use unyield::build;
use unyield::exec::{MachineIterator, ReferenceGenerator};
use unyield::intern::Interner;
use unyield::lower_generator;

#[test]
fn recompilation_is_stable() {
    let mut interner_a = Interner::new();
    let func_a = composite(&mut interner_a);
    let machine_a = lower_generator(&func_a, &mut interner_a).unwrap();

    let mut interner_b = Interner::new();
    let func_b = composite(&mut interner_b);
    let machine_b = lower_generator(&func_b, &mut interner_b).unwrap();

    let labels_a: Vec<u32> = machine_a.arms.iter().map(|arm| arm.label.0).collect();
    let labels_b: Vec<u32> = machine_b.arms.iter().map(|arm| arm.label.0).collect();
    assert_eq!(labels_a, labels_b);
    assert_eq!(machine_a.exhausted, machine_b.exhausted);

    let fields_a: Vec<&str> = machine_a
        .fields
        .iter()
        .map(|f| interner_a.resolve(f.name))
        .collect();
    let fields_b: Vec<&str> = machine_b
        .fields
        .iter()
        .map(|f| interner_b.resolve(f.name))
        .collect();
    assert_eq!(fields_a, fields_b);

    let arms_a: Vec<(u32, u32)> = machine_a
        .arms
        .iter()
        .map(|arm| (arm.label.0, arm.entry.0))
        .collect();
    let arms_b: Vec<(u32, u32)> = machine_b
        .arms
        .iter()
        .map(|arm| (arm.label.0, arm.entry.0))
        .collect();
    assert_eq!(arms_a, arms_b);
    assert_eq!(machine_a.blocks.len(), machine_b.blocks.len());
}

#[test]
fn shadowed_locals_get_distinct_fields() {
    let mut interner = Interner::new();
    let name = interner.intern("shadow");
    let x = interner.intern("x");
    // let x = 1
    // if true { let x = 10; yield x; yield x + 1 }
    // yield x
    let func = build::generator(
        name,
        vec![],
        TypeExpr::Primitive(PrimitiveType::I64),
        vec![
            build::let_(x, build::int(1)),
            build::if_(
                build::boolean(true),
                vec![
                    build::let_(x, build::int(10)),
                    build::yield_(build::var(x)),
                    build::yield_(build::binary(build::var(x), BinaryOp::Add, build::int(1))),
                ],
            ),
            build::yield_(build::var(x)),
        ],
    );
    let machine = lower_generator(&func, &mut interner).unwrap();

    // both locals are live across suspensions and must not share a field
    assert_eq!(machine.fields.len(), 2);
    assert_ne!(machine.fields[0].name, machine.fields[1].name);

    let mut transformed = MachineIterator::new(&machine, &interner, vec![]).unwrap();
    assert_eq!(drain_machine(&mut transformed, 100), vec![10, 11, 1]);

    let mut reference = ReferenceGenerator::new(&func, &interner, vec![]).unwrap();
    assert_eq!(drain_reference(&mut reference, 100), vec![10, 11, 1]);
}
