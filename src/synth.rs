// src/synth.rs
//! State machine synthesis.
//!
//! Rewrites the CFG into a flat dispatch structure keyed by resume label:
//! every cross-suspension-live variable becomes a persistent field, yields
//! become labeled suspensions, and the natural exit becomes a transition
//! to the exhausted label. Hoisted `let`s turn into plain field
//! assignments so a field is initialized when control first passes its
//! definition and never re-initialized on resume.

use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::ast::GeneratorFn;
use crate::cfg::{BlockId, Cfg, CursorKind, Instr, Terminator};
use crate::intern::{Interner, Symbol};
use crate::liveness::Liveness;
use crate::machine::{
    DispatchArm, FieldDef, FieldKind, MachineBlock, MachineTerminator, StateMachine,
};
use crate::suspend::{ResumeLabel, SuspensionPoint};

pub fn synthesize(
    func: &GeneratorFn,
    cfg: &Cfg,
    points: &[SuspensionPoint],
    liveness: &Liveness,
    interner: &mut Interner,
) -> StateMachine {
    let hoisted = liveness.hoisted();

    // cursor symbols keep their cursor kind on the field
    let mut cursor_kinds: FxHashMap<Symbol, CursorKind> = FxHashMap::default();
    for info in &cfg.loops {
        for cursor in &info.cursors {
            cursor_kinds.insert(cursor.name, cursor.kind);
        }
    }

    // fields: params in declaration order, then hoisted locals in first
    // definition order (block id, then instruction position)
    let mut fields: Vec<FieldDef> = func
        .params
        .iter()
        .map(|p| FieldDef {
            name: p.name,
            ty: Some(p.ty.clone()),
            kind: FieldKind::Param,
        })
        .collect();
    for id in cfg.block_ids() {
        for instr in &cfg.block(id).instrs {
            if let Instr::Let { name, ty, .. } = instr
                && hoisted.contains(name)
                && !fields.iter().any(|f| f.name == *name)
            {
                let kind = cursor_kinds
                    .get(name)
                    .map(|k| FieldKind::for_cursor(*k))
                    .unwrap_or(FieldKind::Local);
                fields.push(FieldDef {
                    name: *name,
                    ty: ty.clone(),
                    kind,
                });
            }
        }
    }

    // resume label per suspending block
    let label_of: FxHashMap<BlockId, ResumeLabel> =
        points.iter().map(|p| (p.block, p.label)).collect();

    // rewrite blocks: hoisted lets become field assignments, yields become
    // labeled suspensions, exits become the exhausted transition
    let blocks: Vec<MachineBlock> = cfg
        .blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| {
            let instrs = block
                .instrs
                .iter()
                .map(|instr| match instr {
                    Instr::Let {
                        name, init, span, ..
                    } if fields.iter().any(|f| f.name == *name) => Instr::Assign {
                        target: *name,
                        value: init.clone(),
                        span: *span,
                    },
                    other => other.clone(),
                })
                .collect();
            let terminator = match &block.terminator {
                Terminator::Goto { target } => MachineTerminator::Goto { target: *target },
                Terminator::Branch {
                    cond,
                    then_blk,
                    else_blk,
                } => MachineTerminator::Branch {
                    cond: cond.clone(),
                    then_blk: *then_blk,
                    else_blk: *else_blk,
                },
                Terminator::Yield { value, .. } => MachineTerminator::Suspend {
                    value: value.clone(),
                    resume: label_of[&BlockId(idx as u32)],
                },
                Terminator::Exit => MachineTerminator::Finish,
            };
            MachineBlock { instrs, terminator }
        })
        .collect();

    // dispatch table: label 0 starts at the entry, label k resumes after
    // suspension k
    let mut arms = Vec::with_capacity(points.len() + 1);
    arms.push(DispatchArm {
        label: ResumeLabel::START,
        entry: cfg.entry,
        blocks: arm_region(&blocks, cfg.entry),
    });
    for point in points {
        arms.push(DispatchArm {
            label: point.label,
            entry: point.resume,
            blocks: arm_region(&blocks, point.resume),
        });
    }

    let name = interner.intern_with_prefix("__Generator_", func.name);
    let state_field = interner.intern("__state");
    let machine = StateMachine {
        name,
        source: func.name,
        elem_ty: func.elem_ty.clone(),
        params: func.params.iter().map(|p| p.name).collect(),
        fields,
        state_field,
        blocks,
        arms,
        exhausted: ResumeLabel(points.len() as u32 + 1),
    };
    tracing::debug!(
        machine = interner.resolve(machine.name),
        fields = machine.fields.len(),
        arms = machine.arms.len(),
        "synthesized state machine"
    );
    machine
}

/// Blocks reachable from `entry` within one advance: traversal stops at
/// suspending and finishing blocks (they end the arm), pre-order, true
/// branch first.
fn arm_region(blocks: &[MachineBlock], entry: BlockId) -> SmallVec<[BlockId; 8]> {
    let mut region: SmallVec<[BlockId; 8]> = SmallVec::new();
    let mut stack = vec![entry];
    while let Some(id) = stack.pop() {
        if region.contains(&id) {
            continue;
        }
        region.push(id);
        let succs = blocks[id.index()].terminator.arm_successors();
        for &succ in succs.iter().rev() {
            if !region.contains(&succ) {
                stack.push(succ);
            }
        }
    }
    region
}
