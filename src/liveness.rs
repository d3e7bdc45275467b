// src/liveness.rs
//! Backward liveness dataflow over the CFG.
//!
//! A variable is live at a program point if some path from that point
//! reads it before redefining it. Back-edges are handled by iterating to a
//! fixed point. Every variable live at a suspension point's resume block
//! needs persistent (field) storage; everything else stays transient
//! within a single dispatch arm.
//!
//! Iteration cursors get one extra rule: a cursor is always live across
//! every suspension point inside its governing loop, so it is restored on
//! resume rather than recomputed from an initial value.

use std::collections::BTreeSet;

use rustc_hash::FxHashMap;

use crate::ast::{Block, Expr, ExprKind, Stmt};
use crate::cfg::{BlockId, Cfg, Instr, Terminator};
use crate::intern::Symbol;
use crate::suspend::{ResumeLabel, SuspensionPoint};

/// Live variable sets per block and per suspension point.
#[derive(Debug, Clone, Default)]
pub struct Liveness {
    block_in: Vec<BTreeSet<Symbol>>,
    points: FxHashMap<ResumeLabel, BTreeSet<Symbol>>,
}

impl Liveness {
    /// Variables live at the entry of `block`.
    pub fn live_in(&self, block: BlockId) -> &BTreeSet<Symbol> {
        &self.block_in[block.index()]
    }

    /// Variables live across the suspension point with `label`.
    pub fn live_across(&self, label: ResumeLabel) -> Option<&BTreeSet<Symbol>> {
        self.points.get(&label)
    }

    /// Union of every suspension point's live set: the variables that need
    /// persistent storage.
    pub fn hoisted(&self) -> BTreeSet<Symbol> {
        let mut all = BTreeSet::new();
        for set in self.points.values() {
            all.extend(set.iter().copied());
        }
        all
    }
}

/// Compute liveness for a CFG. Total over any valid graph.
pub fn analyze(cfg: &Cfg, points: &[SuspensionPoint]) -> Liveness {
    let n = cfg.len();
    let mut live_in: Vec<BTreeSet<Symbol>> = vec![BTreeSet::new(); n];

    let mut changed = true;
    let mut rounds = 0usize;
    while changed {
        changed = false;
        rounds += 1;
        for idx in (0..n).rev() {
            let block = cfg.block(BlockId(idx as u32));

            // live-out = union of successors' live-in
            let mut live: BTreeSet<Symbol> = BTreeSet::new();
            for succ in block.terminator.successors() {
                live.extend(live_in[succ.index()].iter().copied());
            }

            // transfer backward through the terminator, then the instrs
            terminator_uses(&block.terminator, &mut live);
            for instr in block.instrs.iter().rev() {
                match instr {
                    Instr::Let { name, init, .. } => {
                        live.remove(name);
                        expr_uses(init, &mut live);
                    }
                    Instr::Assign { target, value, .. } => {
                        live.remove(target);
                        expr_uses(value, &mut live);
                    }
                    Instr::Eval { expr, .. } => expr_uses(expr, &mut live),
                }
            }

            if live != live_in[idx] {
                live_in[idx] = live;
                changed = true;
            }
        }
    }
    tracing::trace!(rounds, "liveness reached fixed point");

    // live across a suspension = live at the entry of its resume block,
    // plus every cursor whose governing loop contains the suspension
    let mut point_sets = FxHashMap::default();
    for point in points {
        let mut set = live_in[point.resume.index()].clone();
        for info in &cfg.loops {
            if info.contains(point.block) {
                for cursor in &info.cursors {
                    set.insert(cursor.name);
                }
            }
        }
        point_sets.insert(point.label, set);
    }

    Liveness {
        block_in: live_in,
        points: point_sets,
    }
}

fn terminator_uses(terminator: &Terminator, live: &mut BTreeSet<Symbol>) {
    match terminator {
        Terminator::Branch { cond, .. } => expr_uses(cond, live),
        Terminator::Yield { value, .. } => expr_uses(value, live),
        Terminator::Goto { .. } | Terminator::Exit => {}
    }
}

/// Collect variables read by an expression. Lambda bodies count as uses of
/// everything they mention (captures keep their environment alive).
fn expr_uses(expr: &Expr, live: &mut BTreeSet<Symbol>) {
    match &expr.kind {
        ExprKind::Identifier(sym) => {
            live.insert(*sym);
        }
        ExprKind::Binary(b) => {
            expr_uses(&b.left, live);
            expr_uses(&b.right, live);
        }
        ExprKind::Unary(u) => expr_uses(&u.operand, live),
        ExprKind::SeqLiteral(items) => {
            for item in items {
                expr_uses(item, live);
            }
        }
        ExprKind::FieldAccess(f) => expr_uses(&f.object, live),
        ExprKind::Index(ix) => {
            expr_uses(&ix.object, live);
            expr_uses(&ix.index, live);
        }
        ExprKind::MethodCall(mc) => {
            expr_uses(&mc.object, live);
            for arg in &mc.args {
                expr_uses(arg, live);
            }
        }
        ExprKind::Lambda(l) => block_uses(&l.body, live),
        ExprKind::IntLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Null => {}
    }
}

fn block_uses(block: &Block, live: &mut BTreeSet<Symbol>) {
    for stmt in &block.stmts {
        match stmt {
            Stmt::Let(l) => expr_uses(&l.init, live),
            Stmt::Assign(a) => expr_uses(&a.value, live),
            Stmt::Expr(e) => expr_uses(&e.expr, live),
            Stmt::Yield(y) => expr_uses(&y.value, live),
            Stmt::While(w) => {
                expr_uses(&w.condition, live);
                block_uses(&w.body, live);
            }
            Stmt::For(f) => {
                expr_uses(&f.iterable, live);
                block_uses(&f.body, live);
            }
            Stmt::If(i) => {
                expr_uses(&i.condition, live);
                block_uses(&i.then_branch, live);
                if let Some(e) = &i.else_branch {
                    block_uses(e, live);
                }
            }
            Stmt::Break(_) | Stmt::Continue(_) | Stmt::Return(_) => {}
        }
    }
}
