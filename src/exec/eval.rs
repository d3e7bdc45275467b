// src/exec/eval.rs
//! Expression evaluation shared by the machine evaluator and the
//! reference generator.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp};
use crate::errors::EvalError;
use crate::intern::{Interner, Symbol};

use super::value::{IterHandle, Value};

/// Variable storage the evaluator reads and writes.
pub trait Env {
    fn get(&self, name: Symbol) -> Option<Value>;
    /// Write to an existing binding, or create one if absent.
    fn assign(&mut self, name: Symbol, value: Value);
    /// Introduce a (possibly shadowing) binding.
    fn define(&mut self, name: Symbol, value: Value);
}

pub fn eval_expr(
    env: &mut dyn Env,
    interner: &Interner,
    expr: &Expr,
) -> Result<Value, EvalError> {
    match &expr.kind {
        ExprKind::IntLiteral(v) => Ok(Value::Int(*v)),
        ExprKind::BoolLiteral(v) => Ok(Value::Bool(*v)),
        ExprKind::StringLiteral(s) => Ok(Value::str(s)),
        ExprKind::Null => Ok(Value::Null),
        ExprKind::SeqLiteral(items) => {
            let values = items
                .iter()
                .map(|item| eval_expr(env, interner, item))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(Value::seq(values))
        }
        ExprKind::Identifier(sym) => env
            .get(*sym)
            .ok_or_else(|| EvalError::UndefinedVariable(interner.resolve(*sym).to_string())),
        ExprKind::Binary(b) => {
            // short-circuit forms first
            match b.op {
                BinaryOp::And => {
                    if !eval_expr(env, interner, &b.left)?.as_bool()? {
                        return Ok(Value::Bool(false));
                    }
                    return Ok(Value::Bool(eval_expr(env, interner, &b.right)?.as_bool()?));
                }
                BinaryOp::Or => {
                    if eval_expr(env, interner, &b.left)?.as_bool()? {
                        return Ok(Value::Bool(true));
                    }
                    return Ok(Value::Bool(eval_expr(env, interner, &b.right)?.as_bool()?));
                }
                _ => {}
            }
            let left = eval_expr(env, interner, &b.left)?;
            let right = eval_expr(env, interner, &b.right)?;
            eval_binary(b.op, left, right)
        }
        ExprKind::Unary(u) => {
            let operand = eval_expr(env, interner, &u.operand)?;
            match u.op {
                UnaryOp::Neg => Ok(Value::Int(-operand.as_int()?)),
                UnaryOp::Not => Ok(Value::Bool(!operand.as_bool()?)),
            }
        }
        ExprKind::FieldAccess(f) => {
            let object = eval_expr(env, interner, &f.object)?;
            let node = object.as_node()?;
            match interner.resolve(f.field) {
                "value" => Ok(Value::Int(node.value)),
                "left" => Ok(node.left.clone().map(Value::Node).unwrap_or(Value::Null)),
                "right" => Ok(node.right.clone().map(Value::Node).unwrap_or(Value::Null)),
                other => Err(EvalError::UnknownField(other.to_string())),
            }
        }
        ExprKind::Index(ix) => {
            let object = eval_expr(env, interner, &ix.object)?;
            let index = eval_expr(env, interner, &ix.index)?.as_int()?;
            match object {
                Value::Seq(items) => {
                    let items = items.borrow();
                    if index < 0 || index as usize >= items.len() {
                        return Err(EvalError::IndexOutOfBounds {
                            index,
                            len: items.len(),
                        });
                    }
                    Ok(items[index as usize].clone())
                }
                other => Err(EvalError::TypeMismatch {
                    expected: "sequence",
                    found: other.type_name(),
                }),
            }
        }
        ExprKind::MethodCall(mc) => {
            let object = eval_expr(env, interner, &mc.object)?;
            let args = mc
                .args
                .iter()
                .map(|a| eval_expr(env, interner, a))
                .collect::<Result<Vec<_>, _>>()?;
            eval_method(&object, interner.resolve(mc.method), args)
        }
        ExprKind::Lambda(_) => Err(EvalError::Unsupported("lambda value")),
    }
}

fn eval_binary(op: BinaryOp, left: Value, right: Value) -> Result<Value, EvalError> {
    match op {
        BinaryOp::Add => Ok(Value::Int(left.as_int()? + right.as_int()?)),
        BinaryOp::Sub => Ok(Value::Int(left.as_int()? - right.as_int()?)),
        BinaryOp::Mul => Ok(Value::Int(left.as_int()? * right.as_int()?)),
        BinaryOp::Div => {
            let divisor = right.as_int()?;
            if divisor == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(left.as_int()? / divisor))
        }
        BinaryOp::Mod => {
            let divisor = right.as_int()?;
            if divisor == 0 {
                return Err(EvalError::DivisionByZero);
            }
            Ok(Value::Int(left.as_int()? % divisor))
        }
        BinaryOp::Eq => Ok(Value::Bool(left == right)),
        BinaryOp::Ne => Ok(Value::Bool(left != right)),
        BinaryOp::Lt => Ok(Value::Bool(left.as_int()? < right.as_int()?)),
        BinaryOp::Gt => Ok(Value::Bool(left.as_int()? > right.as_int()?)),
        BinaryOp::Le => Ok(Value::Bool(left.as_int()? <= right.as_int()?)),
        BinaryOp::Ge => Ok(Value::Bool(left.as_int()? >= right.as_int()?)),
        BinaryOp::And | BinaryOp::Or => unreachable!("short-circuit ops handled by eval_expr"),
    }
}

fn eval_method(object: &Value, method: &str, args: Vec<Value>) -> Result<Value, EvalError> {
    match (object, method) {
        (Value::Seq(items), "push") => {
            let value = exactly_one(args)?;
            items.borrow_mut().push(value);
            Ok(Value::Null)
        }
        (Value::Seq(items), "pop") => {
            exactly_none(&args)?;
            items.borrow_mut().pop().ok_or(EvalError::PopFromEmpty)
        }
        (Value::Seq(items), "is_empty") => {
            exactly_none(&args)?;
            Ok(Value::Bool(items.borrow().is_empty()))
        }
        (Value::Seq(items), "len") => {
            exactly_none(&args)?;
            Ok(Value::Int(items.borrow().len() as i64))
        }
        (Value::Seq(items), "iterator") => {
            exactly_none(&args)?;
            // the handle walks the sequence's contents as of this call
            let snapshot = items.borrow().clone();
            Ok(Value::Iter(std::rc::Rc::new(std::cell::RefCell::new(
                IterHandle::new(snapshot),
            ))))
        }
        (Value::Iter(handle), "has_next") => {
            exactly_none(&args)?;
            Ok(Value::Bool(handle.borrow().has_next()))
        }
        (Value::Iter(handle), "next") => {
            exactly_none(&args)?;
            handle.borrow_mut().next()
        }
        _ => Err(EvalError::UnknownMethod(format!(
            "{}.{}",
            object.type_name(),
            method
        ))),
    }
}

fn exactly_one(args: Vec<Value>) -> Result<Value, EvalError> {
    let found = args.len();
    args.into_iter().next().filter(|_| found == 1).ok_or(
        EvalError::ArityMismatch {
            expected: 1,
            found,
        },
    )
}

fn exactly_none(args: &[Value]) -> Result<(), EvalError> {
    if args.is_empty() {
        Ok(())
    } else {
        Err(EvalError::ArityMismatch {
            expected: 0,
            found: args.len(),
        })
    }
}
