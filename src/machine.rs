// src/machine.rs
//! The synthesized state machine: the artifact handed to an emitter.
//!
//! One persistent field per cross-suspension-live variable or cursor, a
//! current-resume-label field, and one dispatch arm per resume label. A
//! loop containing a suspension is not a native loop here: resuming jumps
//! to the continuation block, flows to the loop header, and re-evaluates
//! the controlling condition; the back-edge is an ordinary transition.

use smallvec::SmallVec;

use crate::ast::{Expr, TypeExpr};
use crate::cfg::{BlockId, CursorKind, Instr};
use crate::intern::Symbol;
use crate::suspend::ResumeLabel;

/// Why a persistent field exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Construction-time argument, bound once.
    Param,
    /// Local hoisted because it is live across a suspension.
    Local,
    /// Iteration cursor: index into a fixed sequence.
    IndexCursor,
    /// Iteration cursor: held handle to an externally supplied iterator.
    IterCursor,
}

/// A persistent field of the state machine.
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: Symbol,
    pub ty: Option<TypeExpr>,
    pub kind: FieldKind,
}

impl FieldKind {
    pub fn for_cursor(kind: CursorKind) -> FieldKind {
        match kind {
            CursorKind::Index => FieldKind::IndexCursor,
            CursorKind::Handle => FieldKind::IterCursor,
        }
    }
}

/// Terminators after synthesis: yields carry their resume label and the
/// natural exit transitions to the exhausted label.
#[derive(Debug, Clone)]
pub enum MachineTerminator {
    Goto {
        target: BlockId,
    },
    Branch {
        cond: Expr,
        then_blk: BlockId,
        else_blk: BlockId,
    },
    /// Produce `value`, record `resume` as the next dispatch label, and
    /// return control to the caller.
    Suspend { value: Expr, resume: ResumeLabel },
    /// Transition to the exhausted label; no value is produced.
    Finish,
}

impl MachineTerminator {
    /// Successors within the same advance (suspension edges end the arm).
    pub fn arm_successors(&self) -> SmallVec<[BlockId; 2]> {
        use smallvec::smallvec;
        match self {
            MachineTerminator::Goto { target } => smallvec![*target],
            MachineTerminator::Branch {
                then_blk, else_blk, ..
            } => smallvec![*then_blk, *else_blk],
            MachineTerminator::Suspend { .. } | MachineTerminator::Finish => smallvec![],
        }
    }
}

#[derive(Debug, Clone)]
pub struct MachineBlock {
    pub instrs: Vec<Instr>,
    pub terminator: MachineTerminator,
}

/// One dispatch arm: the region executed when resuming from `label`.
#[derive(Debug, Clone)]
pub struct DispatchArm {
    pub label: ResumeLabel,
    pub entry: BlockId,
    /// Blocks reachable from `entry` up to (and including) the blocks that
    /// suspend or finish; traversal does not continue past those.
    pub blocks: SmallVec<[BlockId; 8]>,
}

/// The synthesized artifact.
#[derive(Debug, Clone)]
pub struct StateMachine {
    /// Generated name (`__Generator_` + source name).
    pub name: Symbol,
    /// Name of the generator method this machine was synthesized from.
    pub source: Symbol,
    pub elem_ty: TypeExpr,
    /// Construction-time arguments, in declaration order.
    pub params: Vec<Symbol>,
    /// Persistent fields: params first, then hoisted locals and cursors by
    /// first definition site.
    pub fields: Vec<FieldDef>,
    /// Name of the current-resume-label field.
    pub state_field: Symbol,
    /// Flat dispatch structure: all arms share this block pool.
    pub blocks: Vec<MachineBlock>,
    /// One arm per resume label; `arms[i].label == ResumeLabel(i)`.
    pub arms: Vec<DispatchArm>,
    /// Distinguished terminal label; no arm exists for it.
    pub exhausted: ResumeLabel,
}

impl StateMachine {
    pub fn block(&self, id: BlockId) -> &MachineBlock {
        &self.blocks[id.index()]
    }

    pub fn arm(&self, label: ResumeLabel) -> Option<&DispatchArm> {
        self.arms.get(label.index())
    }

    pub fn field(&self, name: Symbol) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn is_field(&self, name: Symbol) -> bool {
        self.field(name).is_some()
    }
}
