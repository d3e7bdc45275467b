// src/exec/machine_iter.rs
//! Drives a synthesized state machine through the pull-based iteration
//! contract.
//!
//! Construction binds parameter values once and runs to the first
//! suspension, so `has_next` is a side-effect-free read of the pending
//! slot. `next` hands out the pending value and advances one arm.
//!
//! Not thread-safe: persistent fields are ordinary mutable state with no
//! internal locking, and concurrent advances are undefined. One logical
//! thread of control exists per iterator.

use rustc_hash::FxHashMap;

use crate::errors::{EvalError, IterError};
use crate::intern::{Interner, Symbol};
use crate::machine::{MachineTerminator, StateMachine};
use crate::suspend::ResumeLabel;

use super::eval::{Env, eval_expr};
use super::value::Value;

/// Storage for one advance: persistent fields plus arm-transient locals.
struct ArmEnv<'a> {
    fields: &'a mut FxHashMap<Symbol, Value>,
    locals: FxHashMap<Symbol, Value>,
}

impl Env for ArmEnv<'_> {
    fn get(&self, name: Symbol) -> Option<Value> {
        self.locals
            .get(&name)
            .or_else(|| self.fields.get(&name))
            .cloned()
    }

    fn assign(&mut self, name: Symbol, value: Value) {
        if let Some(slot) = self.locals.get_mut(&name) {
            *slot = value;
        } else if let Some(slot) = self.fields.get_mut(&name) {
            *slot = value;
        } else {
            self.locals.insert(name, value);
        }
    }

    fn define(&mut self, name: Symbol, value: Value) {
        self.locals.insert(name, value);
    }
}

enum ArmOutcome {
    Suspended { value: Value, resume: ResumeLabel },
    Finished,
}

/// Execute one dispatch arm from `entry` to its suspension or the exit.
fn run_arm(
    machine: &StateMachine,
    interner: &Interner,
    fields: &mut FxHashMap<Symbol, Value>,
    entry: crate::cfg::BlockId,
) -> Result<ArmOutcome, EvalError> {
    let mut env = ArmEnv {
        fields,
        locals: FxHashMap::default(),
    };
    let mut block = entry;
    loop {
        let blk = machine.block(block);
        for instr in &blk.instrs {
            match instr {
                crate::cfg::Instr::Let { name, init, .. } => {
                    let value = eval_expr(&mut env, interner, init)?;
                    env.define(*name, value);
                }
                crate::cfg::Instr::Assign { target, value, .. } => {
                    let value = eval_expr(&mut env, interner, value)?;
                    env.assign(*target, value);
                }
                crate::cfg::Instr::Eval { expr, .. } => {
                    eval_expr(&mut env, interner, expr)?;
                }
            }
        }
        match &blk.terminator {
            MachineTerminator::Goto { target } => block = *target,
            MachineTerminator::Branch {
                cond,
                then_blk,
                else_blk,
            } => {
                block = if eval_expr(&mut env, interner, cond)?.as_bool()? {
                    *then_blk
                } else {
                    *else_blk
                };
            }
            MachineTerminator::Suspend { value, resume } => {
                let value = eval_expr(&mut env, interner, value)?;
                return Ok(ArmOutcome::Suspended {
                    value,
                    resume: *resume,
                });
            }
            MachineTerminator::Finish => return Ok(ArmOutcome::Finished),
        }
    }
}

/// Pull-based iterator over a synthesized state machine.
#[derive(Debug)]
pub struct MachineIterator<'m> {
    machine: &'m StateMachine,
    interner: &'m Interner,
    fields: FxHashMap<Symbol, Value>,
    label: ResumeLabel,
    pending: Option<Value>,
}

impl<'m> MachineIterator<'m> {
    /// Bind construction arguments and run to the first suspension.
    pub fn new(
        machine: &'m StateMachine,
        interner: &'m Interner,
        args: Vec<Value>,
    ) -> Result<Self, IterError> {
        if args.len() != machine.params.len() {
            return Err(IterError::Eval(EvalError::ArityMismatch {
                expected: machine.params.len(),
                found: args.len(),
            }));
        }
        let mut fields: FxHashMap<Symbol, Value> = machine
            .fields
            .iter()
            .map(|f| (f.name, Value::Null))
            .collect();
        for (param, value) in machine.params.iter().zip(args) {
            fields.insert(*param, value);
        }
        let mut iter = Self {
            machine,
            interner,
            fields,
            label: ResumeLabel::START,
            pending: None,
        };
        if let Err(e) = iter.advance() {
            iter.poison();
            return Err(IterError::Eval(e));
        }
        Ok(iter)
    }

    /// True if another value is pending. Idempotent: repeated calls do not
    /// advance state or change the answer.
    pub fn has_next(&self) -> bool {
        self.pending.is_some()
    }

    /// Return the pending value and advance one arm.
    ///
    /// Past the end this fails with [`IterError::Exhausted`], stably, on
    /// every call. A user-code failure propagates unmodified and leaves
    /// the iterator permanently exhausted.
    pub fn next(&mut self) -> Result<Value, IterError> {
        let current = self.pending.take().ok_or(IterError::Exhausted)?;
        if let Err(e) = self.advance() {
            self.poison();
            return Err(IterError::Eval(e));
        }
        Ok(current)
    }

    /// Release all field state and pin the iterator at exhausted.
    /// Idempotent; safe to call on an exhausted iterator.
    pub fn close(&mut self) {
        self.pending = None;
        self.label = self.machine.exhausted;
        self.fields.clear();
    }

    fn poison(&mut self) {
        // a half-executed arm is not a resumable position
        self.close();
    }

    fn advance(&mut self) -> Result<(), EvalError> {
        if self.label == self.machine.exhausted {
            self.pending = None;
            return Ok(());
        }
        let Some(arm) = self.machine.arm(self.label) else {
            self.pending = None;
            return Ok(());
        };
        match run_arm(self.machine, self.interner, &mut self.fields, arm.entry)? {
            ArmOutcome::Suspended { value, resume } => {
                self.pending = Some(value);
                self.label = resume;
            }
            ArmOutcome::Finished => {
                self.pending = None;
                self.label = self.machine.exhausted;
            }
        }
        Ok(())
    }

    /// Current resume label (exposed for tests and diagnostics).
    pub fn label(&self) -> ResumeLabel {
        self.label
    }
}
