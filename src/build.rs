// src/build.rs
//! Programmatic constructors for generator bodies.
//!
//! Since surface parsing lives outside the engine, callers (and the
//! engine's own lowering, when it synthesizes cursor plumbing) assemble
//! ASTs through these helpers. Spans default to empty; diagnostics-heavy
//! callers can fill them in on the constructed nodes.

use crate::ast::*;
use crate::intern::Symbol;
use crate::span::Span;

pub fn int(value: i64) -> Expr {
    expr_kind(ExprKind::IntLiteral(value))
}

pub fn boolean(value: bool) -> Expr {
    expr_kind(ExprKind::BoolLiteral(value))
}

pub fn string(value: &str) -> Expr {
    expr_kind(ExprKind::StringLiteral(value.to_string()))
}

pub fn null() -> Expr {
    expr_kind(ExprKind::Null)
}

pub fn var(name: Symbol) -> Expr {
    expr_kind(ExprKind::Identifier(name))
}

pub fn seq(items: Vec<Expr>) -> Expr {
    expr_kind(ExprKind::SeqLiteral(items))
}

pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Expr {
    expr_kind(ExprKind::Binary(Box::new(BinaryExpr { left, op, right })))
}

pub fn unary(op: UnaryOp, operand: Expr) -> Expr {
    expr_kind(ExprKind::Unary(Box::new(UnaryExpr { op, operand })))
}

pub fn field(object: Expr, field: Symbol) -> Expr {
    expr_kind(ExprKind::FieldAccess(Box::new(FieldAccessExpr {
        object,
        field,
    })))
}

pub fn index(object: Expr, idx: Expr) -> Expr {
    expr_kind(ExprKind::Index(Box::new(IndexExpr { object, index: idx })))
}

pub fn method(object: Expr, method: Symbol, args: Vec<Expr>) -> Expr {
    expr_kind(ExprKind::MethodCall(Box::new(MethodCallExpr {
        object,
        method,
        args,
    })))
}

pub fn lambda(params: Vec<Symbol>, body: Vec<Stmt>) -> Expr {
    expr_kind(ExprKind::Lambda(Box::new(LambdaExpr {
        params,
        body: block(body),
        span: Span::default(),
    })))
}

pub fn let_(name: Symbol, init: Expr) -> Stmt {
    Stmt::Let(LetStmt {
        name,
        ty: None,
        init,
        span: Span::default(),
    })
}

pub fn let_ty(name: Symbol, ty: TypeExpr, init: Expr) -> Stmt {
    Stmt::Let(LetStmt {
        name,
        ty: Some(ty),
        init,
        span: Span::default(),
    })
}

pub fn assign(target: Symbol, value: Expr) -> Stmt {
    Stmt::Assign(AssignStmt {
        target,
        value,
        span: Span::default(),
    })
}

pub fn expr(e: Expr) -> Stmt {
    Stmt::Expr(ExprStmt {
        expr: e,
        span: Span::default(),
    })
}

pub fn yield_(value: Expr) -> Stmt {
    Stmt::Yield(YieldStmt {
        value,
        span: Span::default(),
    })
}

pub fn while_(condition: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::While(WhileStmt {
        condition,
        body: block(body),
        span: Span::default(),
    })
}

pub fn for_(v: Symbol, iterable: Expr, body: Vec<Stmt>) -> Stmt {
    Stmt::For(ForStmt {
        var: v,
        var_ty: None,
        iterable,
        body: block(body),
        span: Span::default(),
    })
}

pub fn if_(condition: Expr, then_branch: Vec<Stmt>) -> Stmt {
    Stmt::If(IfStmt {
        condition,
        then_branch: block(then_branch),
        else_branch: None,
        span: Span::default(),
    })
}

pub fn if_else(condition: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt>) -> Stmt {
    Stmt::If(IfStmt {
        condition,
        then_branch: block(then_branch),
        else_branch: Some(block(else_branch)),
        span: Span::default(),
    })
}

pub fn break_() -> Stmt {
    Stmt::Break(Span::default())
}

pub fn continue_() -> Stmt {
    Stmt::Continue(Span::default())
}

pub fn return_() -> Stmt {
    Stmt::Return(Span::default())
}

pub fn block(stmts: Vec<Stmt>) -> Block {
    Block {
        stmts,
        span: Span::default(),
    }
}

pub fn param(name: Symbol, ty: TypeExpr) -> Param {
    Param {
        name,
        ty,
        span: Span::default(),
    }
}

pub fn generator(name: Symbol, params: Vec<Param>, elem_ty: TypeExpr, stmts: Vec<Stmt>) -> GeneratorFn {
    GeneratorFn {
        name,
        params,
        elem_ty,
        body: block(stmts),
        span: Span::default(),
    }
}

fn expr_kind(kind: ExprKind) -> Expr {
    Expr {
        kind,
        span: Span::default(),
    }
}
