// src/exec/interp.rs
//! Reference interpreter: the original imperative body running on a real
//! pausable execution primitive.
//!
//! The body is walked directly on a corosensei coroutine; each `yield`
//! suspends the coroutine stack. This is the oracle the transformed
//! state machine is checked against: both expose the same pull contract
//! and must produce identical sequences.

use corosensei::{Coroutine, CoroutineResult, Yielder};
use rustc_hash::FxHashMap;

use crate::ast::{Block, GeneratorFn, Stmt};
use crate::errors::{EvalError, IterError};
use crate::intern::{Interner, Symbol};

use super::eval::{Env, eval_expr};
use super::value::Value;

/// Scope-stacked variable storage matching the surface shadowing rules.
struct ScopeEnv {
    scopes: Vec<FxHashMap<Symbol, Value>>,
}

impl ScopeEnv {
    fn new() -> Self {
        Self {
            scopes: vec![FxHashMap::default()],
        }
    }

    fn push(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop(&mut self) {
        self.scopes.pop();
    }
}

impl Env for ScopeEnv {
    fn get(&self, name: Symbol) -> Option<Value> {
        for scope in self.scopes.iter().rev() {
            if let Some(value) = scope.get(&name) {
                return Some(value.clone());
            }
        }
        None
    }

    fn assign(&mut self, name: Symbol, value: Value) {
        for scope in self.scopes.iter_mut().rev() {
            if let Some(slot) = scope.get_mut(&name) {
                *slot = value;
                return;
            }
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }

    fn define(&mut self, name: Symbol, value: Value) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name, value);
        }
    }
}

/// Statement-level control transfer.
enum Flow {
    Normal,
    Break,
    Continue,
    Return,
}

fn exec_block(
    yielder: &Yielder<(), Value>,
    interner: &Interner,
    block: &Block,
    env: &mut ScopeEnv,
) -> Result<Flow, EvalError> {
    env.push();
    let mut flow = Flow::Normal;
    for stmt in &block.stmts {
        flow = exec_stmt(yielder, interner, stmt, env)?;
        if !matches!(flow, Flow::Normal) {
            break;
        }
    }
    env.pop();
    Ok(flow)
}

fn exec_stmt(
    yielder: &Yielder<(), Value>,
    interner: &Interner,
    stmt: &Stmt,
    env: &mut ScopeEnv,
) -> Result<Flow, EvalError> {
    match stmt {
        Stmt::Let(l) => {
            let value = eval_expr(env, interner, &l.init)?;
            env.define(l.name, value);
            Ok(Flow::Normal)
        }
        Stmt::Assign(a) => {
            let value = eval_expr(env, interner, &a.value)?;
            env.assign(a.target, value);
            Ok(Flow::Normal)
        }
        Stmt::Expr(e) => {
            eval_expr(env, interner, &e.expr)?;
            Ok(Flow::Normal)
        }
        Stmt::Yield(y) => {
            let value = eval_expr(env, interner, &y.value)?;
            yielder.suspend(value);
            Ok(Flow::Normal)
        }
        Stmt::While(w) => {
            loop {
                if !eval_expr(env, interner, &w.condition)?.as_bool()? {
                    break;
                }
                match exec_block(yielder, interner, &w.body, env)? {
                    Flow::Break => break,
                    Flow::Return => return Ok(Flow::Return),
                    Flow::Normal | Flow::Continue => {}
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::For(f) => {
            let iterable = eval_expr(env, interner, &f.iterable)?;
            match iterable {
                Value::Seq(items) => {
                    let mut pos = 0usize;
                    loop {
                        let item = {
                            let items = items.borrow();
                            if pos >= items.len() {
                                break;
                            }
                            items[pos].clone()
                        };
                        pos += 1;
                        env.push();
                        env.define(f.var, item);
                        let flow = exec_block(yielder, interner, &f.body, env)?;
                        env.pop();
                        match flow {
                            Flow::Break => break,
                            Flow::Return => return Ok(Flow::Return),
                            Flow::Normal | Flow::Continue => {}
                        }
                    }
                }
                Value::Iter(handle) => loop {
                    if !handle.borrow().has_next() {
                        break;
                    }
                    let item = handle.borrow_mut().next()?;
                    env.push();
                    env.define(f.var, item);
                    let flow = exec_block(yielder, interner, &f.body, env)?;
                    env.pop();
                    match flow {
                        Flow::Break => break,
                        Flow::Return => return Ok(Flow::Return),
                        Flow::Normal | Flow::Continue => {}
                    }
                },
                other => {
                    return Err(EvalError::TypeMismatch {
                        expected: "sequence or iterator",
                        found: other.type_name(),
                    });
                }
            }
            Ok(Flow::Normal)
        }
        Stmt::If(i) => {
            if eval_expr(env, interner, &i.condition)?.as_bool()? {
                exec_block(yielder, interner, &i.then_branch, env)
            } else if let Some(else_branch) = &i.else_branch {
                exec_block(yielder, interner, else_branch, env)
            } else {
                Ok(Flow::Normal)
            }
        }
        Stmt::Break(_) => Ok(Flow::Break),
        Stmt::Continue(_) => Ok(Flow::Continue),
        Stmt::Return(_) => Ok(Flow::Return),
    }
}

/// The original generator body behind the same pull contract as
/// [`super::MachineIterator`].
pub struct ReferenceGenerator {
    coroutine: Coroutine<(), Value, Result<(), EvalError>>,
    pending: Option<Value>,
    finished: bool,
}

impl ReferenceGenerator {
    pub fn new(
        func: &GeneratorFn,
        interner: &Interner,
        args: Vec<Value>,
    ) -> Result<Self, IterError> {
        if args.len() != func.params.len() {
            return Err(IterError::Eval(EvalError::ArityMismatch {
                expected: func.params.len(),
                found: args.len(),
            }));
        }
        let body = func.body.clone();
        let params: Vec<Symbol> = func.params.iter().map(|p| p.name).collect();
        let interner = interner.clone();

        let coroutine: Coroutine<(), Value, Result<(), EvalError>> =
            Coroutine::new(move |yielder, ()| {
                let mut env = ScopeEnv::new();
                for (param, value) in params.into_iter().zip(args) {
                    env.define(param, value);
                }
                exec_block(yielder, &interner, &body, &mut env).map(|_| ())
            });

        let mut generator = Self {
            coroutine,
            pending: None,
            finished: false,
        };
        if let Err(e) = generator.advance() {
            return Err(IterError::Eval(e));
        }
        Ok(generator)
    }

    pub fn has_next(&self) -> bool {
        self.pending.is_some()
    }

    pub fn next(&mut self) -> Result<Value, IterError> {
        let current = self.pending.take().ok_or(IterError::Exhausted)?;
        if let Err(e) = self.advance() {
            return Err(IterError::Eval(e));
        }
        Ok(current)
    }

    fn advance(&mut self) -> Result<(), EvalError> {
        if self.finished {
            self.pending = None;
            return Ok(());
        }
        match self.coroutine.resume(()) {
            CoroutineResult::Yield(value) => {
                self.pending = Some(value);
                Ok(())
            }
            CoroutineResult::Return(Ok(())) => {
                self.finished = true;
                self.pending = None;
                Ok(())
            }
            CoroutineResult::Return(Err(e)) => {
                self.finished = true;
                self.pending = None;
                Err(e)
            }
        }
    }
}
