// src/cfg/mod.rs
//! Control-flow graph over a generator body.
//!
//! The body AST lowers to a graph of basic blocks with explicit edges:
//! sequential flow, two-way branches, loop back-edges, and suspension
//! edges. The graph has a single entry block; the natural end of the body
//! is an `Exit` terminator.

mod builder;

pub use builder::CfgBuilder;

use smallvec::{SmallVec, smallvec};

use crate::ast::{Expr, TypeExpr};
use crate::intern::Symbol;
use crate::span::Span;

/// Stable index of a basic block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(pub u32);

impl BlockId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Straight-line instruction inside a basic block.
#[derive(Debug, Clone)]
pub enum Instr {
    /// First definition of a local.
    Let {
        name: Symbol,
        ty: Option<TypeExpr>,
        init: Expr,
        span: Span,
    },
    /// Reassignment of an existing binding.
    Assign {
        target: Symbol,
        value: Expr,
        span: Span,
    },
    /// Expression evaluated for its side effect.
    Eval { expr: Expr, span: Span },
}

/// Outgoing control transfer of a basic block.
#[derive(Debug, Clone)]
pub enum Terminator {
    Goto {
        target: BlockId,
    },
    Branch {
        cond: Expr,
        then_blk: BlockId,
        else_blk: BlockId,
    },
    /// Suspension point: produce `value`, continue at `resume` on the next
    /// advance.
    Yield {
        value: Expr,
        resume: BlockId,
        span: Span,
    },
    /// Natural end of the body: no further values.
    Exit,
}

impl Terminator {
    /// Successor blocks, true branch before false branch.
    pub fn successors(&self) -> SmallVec<[BlockId; 2]> {
        match self {
            Terminator::Goto { target } => smallvec![*target],
            Terminator::Branch {
                then_blk, else_blk, ..
            } => smallvec![*then_blk, *else_blk],
            Terminator::Yield { resume, .. } => smallvec![*resume],
            Terminator::Exit => smallvec![],
        }
    }
}

/// Ordered statements with no internal control transfer.
#[derive(Debug, Clone)]
pub struct BasicBlock {
    pub instrs: Vec<Instr>,
    pub terminator: Terminator,
}

/// Kind of synthesized iteration cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CursorKind {
    /// Index into a fixed sequence.
    Index,
    /// Held handle to an externally supplied iterator.
    Handle,
}

/// An iteration cursor governed by a loop. Its value at suspension time is
/// exactly restored on resume, never re-derived.
#[derive(Debug, Clone, Copy)]
pub struct Cursor {
    pub name: Symbol,
    pub kind: CursorKind,
}

/// Loop metadata recorded during lowering.
#[derive(Debug, Clone)]
pub struct LoopInfo {
    pub header: BlockId,
    pub exit: BlockId,
    /// Body blocks occupy the contiguous id range [body_start, body_end).
    pub body_start: BlockId,
    pub body_end: BlockId,
    /// Cursors whose lifetime is governed by this loop.
    pub cursors: SmallVec<[Cursor; 2]>,
}

impl LoopInfo {
    /// True if `block` is the loop header or part of the loop body.
    pub fn contains(&self, block: BlockId) -> bool {
        block == self.header || (self.body_start <= block && block < self.body_end)
    }
}

/// The lowered graph: single entry, explicit edges, loop metadata.
#[derive(Debug, Clone)]
pub struct Cfg {
    pub blocks: Vec<BasicBlock>,
    pub entry: BlockId,
    pub loops: Vec<LoopInfo>,
}

impl Cfg {
    pub fn block(&self, id: BlockId) -> &BasicBlock {
        &self.blocks[id.index()]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + use<> {
        (0..self.blocks.len() as u32).map(BlockId)
    }
}
