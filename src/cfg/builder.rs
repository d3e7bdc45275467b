// src/cfg/builder.rs
//! AST -> CFG lowering.
//!
//! Lowers the supported construct set (while, for-each over fixed
//! sequences and external iterators, conditionals, break/continue/return,
//! yield at statement position) into basic blocks. For-each loops lower to
//! explicit cursors: an index cursor over a fixed sequence, or direct
//! `has_next`/`next` calls against a held handle for an externally
//! supplied iterator.
//!
//! Locals that shadow an earlier binding are renamed to fresh symbols so
//! that every distinct local can later claim its own persistent field.

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::{SmallVec, smallvec};

use super::{BasicBlock, BlockId, Cfg, Cursor, CursorKind, Instr, LoopInfo, Terminator};
use crate::ast::*;
use crate::build;
use crate::errors::TransformError;
use crate::intern::{Interner, Symbol};

/// How a binding can be iterated, as far as lowering can tell statically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IterableKind {
    /// A fixed sequence: traversed with an index cursor.
    Fixed,
    /// An externally supplied iterator: traversed through the handle itself.
    External,
}

struct ProtoBlock {
    instrs: Vec<Instr>,
    terminator: Option<Terminator>,
}

struct LoopFrame {
    header: BlockId,
    exit: BlockId,
    body_start: BlockId,
    cursors: SmallVec<[Cursor; 2]>,
}

pub struct CfgBuilder<'a> {
    interner: &'a mut Interner,
    blocks: Vec<ProtoBlock>,
    loops: Vec<LoopInfo>,
    loop_stack: Vec<LoopFrame>,
    /// Rename maps, innermost scope last.
    scopes: Vec<FxHashMap<Symbol, Symbol>>,
    /// Every post-rename name bound so far; shadowing picks a fresh name.
    bound: FxHashSet<Symbol>,
    /// Iterable classification of bindings (post-rename).
    kinds: FxHashMap<Symbol, IterableKind>,
    fresh: u32,
}

impl<'a> CfgBuilder<'a> {
    pub fn new(interner: &'a mut Interner) -> Self {
        Self {
            interner,
            blocks: Vec::new(),
            loops: Vec::new(),
            loop_stack: Vec::new(),
            scopes: vec![FxHashMap::default()],
            bound: FxHashSet::default(),
            kinds: FxHashMap::default(),
            fresh: 0,
        }
    }

    pub fn build(mut self, func: &GeneratorFn) -> Result<Cfg, TransformError> {
        let entry = self.new_block();
        for p in &func.params {
            self.current_scope().insert(p.name, p.name);
            self.bound.insert(p.name);
            if let Some(kind) = kind_of_type(&p.ty) {
                self.kinds.insert(p.name, kind);
            }
        }
        let last = self.lower_block(&func.body, entry)?;
        self.terminate(last, Terminator::Exit);
        tracing::trace!(
            blocks = self.blocks.len(),
            loops = self.loops.len(),
            renames = self.fresh,
            "lowered generator body"
        );

        let blocks = self
            .blocks
            .into_iter()
            .map(|b| BasicBlock {
                instrs: b.instrs,
                // every reachable block is terminated by construction; Exit
                // seals stray continuation blocks after diverging statements
                terminator: b.terminator.unwrap_or(Terminator::Exit),
            })
            .collect();

        Ok(Cfg {
            blocks,
            entry,
            loops: self.loops,
        })
    }

    // ------------------------------------------------------------------
    // Block plumbing
    // ------------------------------------------------------------------

    fn new_block(&mut self) -> BlockId {
        self.blocks.push(ProtoBlock {
            instrs: Vec::new(),
            terminator: None,
        });
        BlockId(self.blocks.len() as u32 - 1)
    }

    fn next_block_id(&self) -> BlockId {
        BlockId(self.blocks.len() as u32)
    }

    fn push_instr(&mut self, block: BlockId, instr: Instr) {
        self.blocks[block.index()].instrs.push(instr);
    }

    fn terminate(&mut self, block: BlockId, terminator: Terminator) {
        let slot = &mut self.blocks[block.index()].terminator;
        debug_assert!(slot.is_none(), "block {block:?} terminated twice");
        *slot = Some(terminator);
    }

    fn current_scope(&mut self) -> &mut FxHashMap<Symbol, Symbol> {
        self.scopes.last_mut().expect("scope stack underflow")
    }

    // ------------------------------------------------------------------
    // Name handling
    // ------------------------------------------------------------------

    /// Bind a `let` name in the current scope, renaming shadowers.
    fn bind(&mut self, name: Symbol) -> Symbol {
        let renamed = if self.bound.contains(&name) {
            let base = self.interner.resolve(name).to_string();
            let n = self.fresh;
            self.fresh += 1;
            self.interner.intern(&format!("{base}__{n}"))
        } else {
            name
        };
        self.bound.insert(renamed);
        self.current_scope().insert(name, renamed);
        renamed
    }

    /// Synthesize a fresh cursor name.
    fn fresh_sym(&mut self, base: &str) -> Symbol {
        let n = self.fresh;
        self.fresh += 1;
        let sym = self.interner.intern(&format!("__{base}{n}"));
        self.bound.insert(sym);
        sym
    }

    /// Resolve a name through the scope stack; free names pass through.
    fn resolve(&self, name: Symbol) -> Symbol {
        for scope in self.scopes.iter().rev() {
            if let Some(&renamed) = scope.get(&name) {
                return renamed;
            }
        }
        name
    }

    // ------------------------------------------------------------------
    // Statement lowering
    // ------------------------------------------------------------------

    fn lower_block(&mut self, block: &Block, mut cur: BlockId) -> Result<BlockId, TransformError> {
        self.scopes.push(FxHashMap::default());
        for stmt in &block.stmts {
            cur = self.lower_stmt(stmt, cur)?;
        }
        self.scopes.pop();
        Ok(cur)
    }

    fn lower_stmt(&mut self, stmt: &Stmt, cur: BlockId) -> Result<BlockId, TransformError> {
        match stmt {
            Stmt::Let(l) => {
                let init = self.lower_expr(&l.init)?;
                let name = self.bind(l.name);
                if let Some(kind) = l
                    .ty
                    .as_ref()
                    .and_then(kind_of_type)
                    .or_else(|| self.kind_of_init(&init))
                {
                    self.kinds.insert(name, kind);
                }
                self.push_instr(
                    cur,
                    Instr::Let {
                        name,
                        ty: l.ty.clone(),
                        init,
                        span: l.span,
                    },
                );
                Ok(cur)
            }
            Stmt::Assign(a) => {
                let value = self.lower_expr(&a.value)?;
                let target = self.resolve(a.target);
                self.push_instr(
                    cur,
                    Instr::Assign {
                        target,
                        value,
                        span: a.span,
                    },
                );
                Ok(cur)
            }
            Stmt::Expr(e) => {
                let expr = self.lower_expr(&e.expr)?;
                self.push_instr(cur, Instr::Eval { expr, span: e.span });
                Ok(cur)
            }
            Stmt::Yield(y) => {
                let value = self.lower_expr(&y.value)?;
                let resume = self.new_block();
                self.terminate(
                    cur,
                    Terminator::Yield {
                        value,
                        resume,
                        span: y.span,
                    },
                );
                Ok(resume)
            }
            Stmt::While(w) => {
                let cond = self.lower_expr(&w.condition)?;
                let header = self.new_block();
                self.terminate(cur, Terminator::Goto { target: header });
                let exit = self.new_block();
                let body = self.new_block();
                self.terminate(
                    header,
                    Terminator::Branch {
                        cond,
                        then_blk: body,
                        else_blk: exit,
                    },
                );
                self.loop_stack.push(LoopFrame {
                    header,
                    exit,
                    body_start: body,
                    cursors: smallvec![],
                });
                let body_end = self.lower_block(&w.body, body)?;
                // loop back-edge
                self.terminate(body_end, Terminator::Goto { target: header });
                self.seal_loop();
                Ok(exit)
            }
            Stmt::For(f) => self.lower_for(f, cur),
            Stmt::If(i) => {
                let cond = self.lower_expr(&i.condition)?;
                let then_blk = self.new_block();
                let else_blk = i.else_branch.as_ref().map(|_| self.new_block());
                let join = self.new_block();
                self.terminate(
                    cur,
                    Terminator::Branch {
                        cond,
                        then_blk,
                        else_blk: else_blk.unwrap_or(join),
                    },
                );
                let then_end = self.lower_block(&i.then_branch, then_blk)?;
                self.terminate(then_end, Terminator::Goto { target: join });
                if let (Some(start), Some(branch)) = (else_blk, i.else_branch.as_ref()) {
                    let else_end = self.lower_block(branch, start)?;
                    self.terminate(else_end, Terminator::Goto { target: join });
                }
                Ok(join)
            }
            Stmt::Break(span) => {
                let Some(frame) = self.loop_stack.last() else {
                    return Err(TransformError::UnsupportedConstruct {
                        construct: "break outside of a loop".to_string(),
                        span: span.into(),
                    });
                };
                let exit = frame.exit;
                self.terminate(cur, Terminator::Goto { target: exit });
                // continuation block for any (unreachable) trailing code
                Ok(self.new_block())
            }
            Stmt::Continue(span) => {
                let Some(frame) = self.loop_stack.last() else {
                    return Err(TransformError::UnsupportedConstruct {
                        construct: "continue outside of a loop".to_string(),
                        span: span.into(),
                    });
                };
                let header = frame.header;
                self.terminate(cur, Terminator::Goto { target: header });
                Ok(self.new_block())
            }
            Stmt::Return(_) => {
                self.terminate(cur, Terminator::Exit);
                Ok(self.new_block())
            }
        }
    }

    /// Pop the innermost loop frame and record its metadata.
    fn seal_loop(&mut self) {
        let frame = self.loop_stack.pop().expect("loop stack underflow");
        self.loops.push(LoopInfo {
            header: frame.header,
            exit: frame.exit,
            body_start: frame.body_start,
            body_end: self.next_block_id(),
            cursors: frame.cursors,
        });
    }

    fn lower_for(&mut self, f: &ForStmt, cur: BlockId) -> Result<BlockId, TransformError> {
        let iterable = self.lower_expr(&f.iterable)?;
        match self.classify_iterable(&iterable) {
            IterableKind::External => self.lower_for_external(f, iterable, cur),
            IterableKind::Fixed => self.lower_for_fixed(f, iterable, cur),
        }
    }

    /// for x in <fixed sequence>: materialize the sequence once, then walk
    /// it with an index cursor. The cursor is restored exactly on resume,
    /// never recomputed from its initial value.
    fn lower_for_fixed(
        &mut self,
        f: &ForStmt,
        iterable: Expr,
        cur: BlockId,
    ) -> Result<BlockId, TransformError> {
        let seq = self.fresh_sym("seq");
        let idx = self.fresh_sym("idx");
        self.push_instr(
            cur,
            Instr::Let {
                name: seq,
                ty: None,
                init: iterable,
                span: f.span,
            },
        );
        self.push_instr(
            cur,
            Instr::Let {
                name: idx,
                ty: None,
                init: build::int(0),
                span: f.span,
            },
        );

        let header = self.new_block();
        self.terminate(cur, Terminator::Goto { target: header });
        let exit = self.new_block();
        let body = self.new_block();
        let len = self.interner.intern("len");
        let cond = build::binary(
            build::var(idx),
            BinaryOp::Lt,
            build::method(build::var(seq), len, vec![]),
        );
        self.terminate(
            header,
            Terminator::Branch {
                cond,
                then_blk: body,
                else_blk: exit,
            },
        );

        self.loop_stack.push(LoopFrame {
            header,
            exit,
            body_start: body,
            cursors: smallvec![Cursor {
                name: idx,
                kind: CursorKind::Index,
            }],
        });

        // element load + cursor step, then the user's body
        self.scopes.push(FxHashMap::default());
        let var = self.bind(f.var);
        if let Some(kind) = f.var_ty.as_ref().and_then(kind_of_type) {
            self.kinds.insert(var, kind);
        }
        self.push_instr(
            body,
            Instr::Let {
                name: var,
                ty: f.var_ty.clone(),
                init: build::index(build::var(seq), build::var(idx)),
                span: f.span,
            },
        );
        self.push_instr(
            body,
            Instr::Assign {
                target: idx,
                value: build::binary(build::var(idx), BinaryOp::Add, build::int(1)),
                span: f.span,
            },
        );
        let body_end = self.lower_block(&f.body, body)?;
        self.scopes.pop();
        self.terminate(body_end, Terminator::Goto { target: header });
        self.seal_loop();
        Ok(exit)
    }

    /// for x in <external iterator>: hold the supplied handle as the cursor
    /// and drive it with explicit has_next/next calls.
    fn lower_for_external(
        &mut self,
        f: &ForStmt,
        iterable: Expr,
        cur: BlockId,
    ) -> Result<BlockId, TransformError> {
        let it = self.fresh_sym("it");
        self.push_instr(
            cur,
            Instr::Let {
                name: it,
                ty: None,
                init: iterable,
                span: f.span,
            },
        );

        let header = self.new_block();
        self.terminate(cur, Terminator::Goto { target: header });
        let exit = self.new_block();
        let body = self.new_block();
        let has_next = self.interner.intern("has_next");
        let next = self.interner.intern("next");
        let cond = build::method(build::var(it), has_next, vec![]);
        self.terminate(
            header,
            Terminator::Branch {
                cond,
                then_blk: body,
                else_blk: exit,
            },
        );

        self.loop_stack.push(LoopFrame {
            header,
            exit,
            body_start: body,
            cursors: smallvec![Cursor {
                name: it,
                kind: CursorKind::Handle,
            }],
        });

        self.scopes.push(FxHashMap::default());
        let var = self.bind(f.var);
        self.push_instr(
            body,
            Instr::Let {
                name: var,
                ty: f.var_ty.clone(),
                init: build::method(build::var(it), next, vec![]),
                span: f.span,
            },
        );
        let body_end = self.lower_block(&f.body, body)?;
        self.scopes.pop();
        self.terminate(body_end, Terminator::Goto { target: header });
        self.seal_loop();
        Ok(exit)
    }

    // ------------------------------------------------------------------
    // Expression lowering
    // ------------------------------------------------------------------

    /// Resolve renames inside an expression and reject constructs that
    /// cannot carry a suspension.
    fn lower_expr(&mut self, e: &Expr) -> Result<Expr, TransformError> {
        let kind = match &e.kind {
            ExprKind::IntLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::StringLiteral(_)
            | ExprKind::Null => e.kind.clone(),
            ExprKind::SeqLiteral(items) => ExprKind::SeqLiteral(
                items
                    .iter()
                    .map(|item| self.lower_expr(item))
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            ExprKind::Identifier(sym) => ExprKind::Identifier(self.resolve(*sym)),
            ExprKind::Binary(b) => ExprKind::Binary(Box::new(BinaryExpr {
                left: self.lower_expr(&b.left)?,
                op: b.op,
                right: self.lower_expr(&b.right)?,
            })),
            ExprKind::Unary(u) => ExprKind::Unary(Box::new(UnaryExpr {
                op: u.op,
                operand: self.lower_expr(&u.operand)?,
            })),
            ExprKind::FieldAccess(f) => ExprKind::FieldAccess(Box::new(FieldAccessExpr {
                object: self.lower_expr(&f.object)?,
                field: f.field,
            })),
            ExprKind::Index(ix) => ExprKind::Index(Box::new(IndexExpr {
                object: self.lower_expr(&ix.object)?,
                index: self.lower_expr(&ix.index)?,
            })),
            ExprKind::MethodCall(mc) => ExprKind::MethodCall(Box::new(MethodCallExpr {
                object: self.lower_expr(&mc.object)?,
                method: mc.method,
                args: mc
                    .args
                    .iter()
                    .map(|a| self.lower_expr(a))
                    .collect::<Result<Vec<_>, _>>()?,
            })),
            ExprKind::Lambda(l) => {
                // a suspension inside a callback is not lexically reachable
                // from the generator's own control flow
                if block_contains_yield(&l.body) {
                    return Err(TransformError::UnsupportedConstruct {
                        construct: "yield inside a lambda body".to_string(),
                        span: l.span.into(),
                    });
                }
                // lambda bodies are carried verbatim; they never suspend
                e.kind.clone()
            }
        };
        Ok(Expr { kind, span: e.span })
    }

    /// Classify an iterable expression for for-each lowering. Unknown
    /// iterables default to fixed-sequence traversal.
    fn classify_iterable(&self, e: &Expr) -> IterableKind {
        match &e.kind {
            ExprKind::SeqLiteral(_) => IterableKind::Fixed,
            ExprKind::MethodCall(mc) if self.interner.resolve(mc.method) == "iterator" => {
                IterableKind::External
            }
            ExprKind::Identifier(sym) => self
                .kinds
                .get(sym)
                .copied()
                .unwrap_or(IterableKind::Fixed),
            _ => IterableKind::Fixed,
        }
    }

    fn kind_of_init(&self, init: &Expr) -> Option<IterableKind> {
        match &init.kind {
            ExprKind::SeqLiteral(_) => Some(IterableKind::Fixed),
            ExprKind::MethodCall(mc) if self.interner.resolve(mc.method) == "iterator" => {
                Some(IterableKind::External)
            }
            ExprKind::Identifier(sym) => self.kinds.get(sym).copied(),
            _ => None,
        }
    }
}

fn kind_of_type(ty: &TypeExpr) -> Option<IterableKind> {
    match ty {
        TypeExpr::Seq(_) => Some(IterableKind::Fixed),
        TypeExpr::Iterator(_) => Some(IterableKind::External),
        _ => None,
    }
}

fn block_contains_yield(block: &Block) -> bool {
    block.stmts.iter().any(stmt_contains_yield)
}

fn stmt_contains_yield(stmt: &Stmt) -> bool {
    match stmt {
        Stmt::Yield(_) => true,
        Stmt::Let(l) => expr_contains_yield(&l.init),
        Stmt::Assign(a) => expr_contains_yield(&a.value),
        Stmt::Expr(e) => expr_contains_yield(&e.expr),
        Stmt::While(w) => expr_contains_yield(&w.condition) || block_contains_yield(&w.body),
        Stmt::For(f) => expr_contains_yield(&f.iterable) || block_contains_yield(&f.body),
        Stmt::If(i) => {
            expr_contains_yield(&i.condition)
                || block_contains_yield(&i.then_branch)
                || i.else_branch.as_ref().is_some_and(block_contains_yield)
        }
        Stmt::Break(_) | Stmt::Continue(_) | Stmt::Return(_) => false,
    }
}

fn expr_contains_yield(expr: &Expr) -> bool {
    match &expr.kind {
        ExprKind::Binary(b) => expr_contains_yield(&b.left) || expr_contains_yield(&b.right),
        ExprKind::Unary(u) => expr_contains_yield(&u.operand),
        ExprKind::SeqLiteral(items) => items.iter().any(expr_contains_yield),
        ExprKind::FieldAccess(f) => expr_contains_yield(&f.object),
        ExprKind::Index(ix) => expr_contains_yield(&ix.object) || expr_contains_yield(&ix.index),
        ExprKind::MethodCall(mc) => {
            expr_contains_yield(&mc.object) || mc.args.iter().any(expr_contains_yield)
        }
        ExprKind::Lambda(l) => block_contains_yield(&l.body),
        ExprKind::IntLiteral(_)
        | ExprKind::BoolLiteral(_)
        | ExprKind::StringLiteral(_)
        | ExprKind::Null
        | ExprKind::Identifier(_) => false,
    }
}
