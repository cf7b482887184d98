//! Resumable expression evaluation
//!
//! Expressions that can contain a suspension point participate in the resume
//! protocol: on suspension they push a position carrying their completed
//! operand prefix, and on resume they pop it, descend into the in-flight
//! operand, and continue without re-evaluating anything that already ran.
//! Single-child nodes (member, unary, assignment, statements' own operands)
//! descend implicitly and need no position of their own.

use std::rc::Rc;

use super::super::ast::{BinOp, Expr, LogicalOp, UnaryOp};
use super::super::control::{Eval, Signal};
use super::super::dispatch;
use super::super::frame::Scope;
use super::super::position::Position;
use super::super::value::{ClosureData, Val};
use super::delegate;
use super::Activation;
use crate::promise;

pub fn eval_expr(cx: &mut Activation, scope: &Scope, expr: &Expr) -> Eval {
    match expr {
        Expr::LitUndefined => Ok(Val::Undefined),
        Expr::LitNull => Ok(Val::Null),
        Expr::LitBool { v } => Ok(Val::Bool(*v)),
        Expr::LitNum { v } => Ok(Val::Num(*v)),
        Expr::LitStr { v } => Ok(Val::Str(v.clone())),
        Expr::Ident { name } => scope.get(name).ok_or_else(|| {
            Signal::Throw(Val::Error(super::super::errors::ErrorInfo::new(
                "ReferenceError",
                format!("{name} is not defined"),
            )))
        }),
        Expr::Assign { name, expr } => {
            let v = eval_expr(cx, scope, expr)?;
            if scope.set(name, v.clone()) {
                Ok(v)
            } else {
                Err(Signal::Throw(Val::Error(
                    super::super::errors::ErrorInfo::new(
                        "ReferenceError",
                        format!("assignment to undeclared variable {name}"),
                    ),
                )))
            }
        }
        Expr::Member { object, property } => {
            let obj = eval_expr(cx, scope, object)?;
            dispatch::member_get(&obj, property)
        }
        Expr::Unary { op, expr } => {
            let v = eval_expr(cx, scope, expr)?;
            apply_unary(*op, &v)
        }
        Expr::Binary { op, left, right } => eval_binary(cx, scope, *op, left, right),
        Expr::Logical { op, left, right } => eval_logical(cx, scope, *op, left, right),
        Expr::Call { callee, args } => eval_call(cx, scope, callee, args),
        Expr::List { items } => eval_list(cx, scope, items),
        Expr::ObjLit { entries } => eval_obj(cx, scope, entries),
        Expr::Func { def } => Ok(Val::Closure(Rc::new(ClosureData {
            def: Rc::new(def.clone()),
            env: scope.clone(),
        }))),
        Expr::Await { inner } => eval_await(cx, scope, inner),
        Expr::Yield { inner } => eval_yield(cx, scope, inner.as_deref()),
        Expr::YieldStar { inner } => delegate::eval_yield_star(cx, scope, inner),
    }
}

/* ===================== Operators ===================== */

fn eval_binary(cx: &mut Activation, scope: &Scope, op: BinOp, left: &Expr, right: &Expr) -> Eval {
    let mut saved_left = None;
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::Binary { left } => saved_left = left,
            other => return Err(desync("binary", other)),
        }
    }
    let lv = match saved_left {
        Some(v) => v,
        None => eval_expr(cx, scope, left)
            .map_err(|s| cx.save(s, || Position::Binary { left: None }))?,
    };
    let rv = eval_expr(cx, scope, right).map_err(|s| {
        let lv = lv.clone();
        cx.save(s, move || Position::Binary { left: Some(lv) })
    })?;
    apply_binop(op, &lv, &rv)
}

fn eval_logical(
    cx: &mut Activation,
    scope: &Scope,
    op: LogicalOp,
    left: &Expr,
    right: &Expr,
) -> Eval {
    let mut left_done = false;
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::Logical { left_done: d } => left_done = d,
            other => return Err(desync("logical", other)),
        }
    }
    if !left_done {
        let lv = eval_expr(cx, scope, left)
            .map_err(|s| cx.save(s, || Position::Logical { left_done: false }))?;
        let short_circuit = match op {
            LogicalOp::And => !lv.is_truthy(),
            LogicalOp::Or => lv.is_truthy(),
        };
        if short_circuit {
            return Ok(lv);
        }
    }
    eval_expr(cx, scope, right).map_err(|s| cx.save(s, || Position::Logical { left_done: true }))
}

pub fn apply_binop(op: BinOp, l: &Val, r: &Val) -> Eval {
    use BinOp::*;
    match op {
        Eq => return Ok(Val::Bool(super::super::value::strict_eq(l, r))),
        Ne => return Ok(Val::Bool(!super::super::value::strict_eq(l, r))),
        Add => {
            if let (Val::Str(a), b) = (l, r) {
                return Ok(Val::Str(format!("{a}{b}")));
            }
            if let (a, Val::Str(b)) = (l, r) {
                return Ok(Val::Str(format!("{a}{b}")));
            }
        }
        _ => {}
    }
    match (l, r) {
        (Val::Num(a), Val::Num(b)) => Ok(match op {
            Add => Val::Num(a + b),
            Sub => Val::Num(a - b),
            Mul => Val::Num(a * b),
            Div => Val::Num(a / b),
            Lt => Val::Bool(a < b),
            Le => Val::Bool(a <= b),
            Gt => Val::Bool(a > b),
            Ge => Val::Bool(a >= b),
            Eq | Ne => unreachable!(),
        }),
        (Val::Str(a), Val::Str(b)) => Ok(match op {
            Lt => Val::Bool(a < b),
            Le => Val::Bool(a <= b),
            Gt => Val::Bool(a > b),
            Ge => Val::Bool(a >= b),
            _ => {
                return Err(Signal::type_error(format!(
                    "operator {op:?} not defined on strings"
                )))
            }
        }),
        _ => Err(Signal::type_error(format!(
            "operator {op:?} not defined on {} and {}",
            l.type_name(),
            r.type_name()
        ))),
    }
}

fn apply_unary(op: UnaryOp, v: &Val) -> Eval {
    match op {
        UnaryOp::Not => Ok(Val::Bool(!v.is_truthy())),
        UnaryOp::Neg => match v {
            Val::Num(n) => Ok(Val::Num(-n)),
            other => Err(Signal::type_error(format!(
                "cannot negate {}",
                other.type_name()
            ))),
        },
    }
}

/* ===================== Calls and literals ===================== */

fn eval_call(cx: &mut Activation, scope: &Scope, callee: &Expr, args: &[Expr]) -> Eval {
    let mut saved_callee = None;
    let mut done: Vec<Val> = Vec::new();
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::Call { callee, done: d } => {
                saved_callee = callee;
                done = d;
            }
            other => return Err(desync("call", other)),
        }
    }
    let cv = match saved_callee {
        Some(v) => v,
        None => eval_expr(cx, scope, callee).map_err(|s| {
            cx.save(s, || Position::Call {
                callee: None,
                done: Vec::new(),
            })
        })?,
    };
    for arg in args.iter().skip(done.len()) {
        let v = eval_expr(cx, scope, arg).map_err(|s| {
            let cv = cv.clone();
            let done = done.clone();
            cx.save(s, move || Position::Call {
                callee: Some(cv),
                done,
            })
        })?;
        done.push(v);
    }
    dispatch::call(cx.realm, &cv, done)
}

fn eval_list(cx: &mut Activation, scope: &Scope, items: &[Expr]) -> Eval {
    let mut done: Vec<Val> = Vec::new();
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::List { done: d } => done = d,
            other => return Err(desync("list", other)),
        }
    }
    for item in items.iter().skip(done.len()) {
        let v = eval_expr(cx, scope, item).map_err(|s| {
            let done = done.clone();
            cx.save(s, move || Position::List { done })
        })?;
        done.push(v);
    }
    Ok(Val::list(done))
}

fn eval_obj(cx: &mut Activation, scope: &Scope, entries: &[(String, Expr)]) -> Eval {
    let mut done: Vec<(String, Val)> = Vec::new();
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::ObjLit { done: d } => done = d,
            other => return Err(desync("object literal", other)),
        }
    }
    for (key, expr) in entries.iter().skip(done.len()) {
        let v = eval_expr(cx, scope, expr).map_err(|s| {
            let done = done.clone();
            cx.save(s, move || Position::ObjLit { done })
        })?;
        done.push((key.clone(), v));
    }
    Ok(Val::obj(done))
}

/* ===================== Suspension points ===================== */

fn eval_yield(cx: &mut Activation, scope: &Scope, inner: Option<&Expr>) -> Eval {
    if let Some(pos) = cx.take_position()? {
        match pos {
            // Suspended at this yield: interpret the injected completion.
            Position::Yield => {
                return match cx.take_pending()? {
                    super::super::control::Completion::Normal(v) => Ok(v),
                    super::super::control::Completion::Throw(v) => Err(Signal::Throw(v)),
                    super::super::control::Completion::Return(v) => Err(Signal::Return(v)),
                }
            }
            // Suspended somewhere inside the operand: keep descending.
            Position::YieldOperand => {}
            other => return Err(desync("yield", other)),
        }
    }
    let value = match inner {
        Some(e) => eval_expr(cx, scope, e).map_err(|s| cx.save(s, || Position::YieldOperand))?,
        None => Val::Undefined,
    };
    Err(cx.suspend_yield(value))
}

fn eval_await(cx: &mut Activation, scope: &Scope, inner: &Expr) -> Eval {
    if let Some(pos) = cx.take_position()? {
        match pos {
            // Suspended at this await: unwrap the settlement.
            Position::Await => {
                return match cx.take_pending()? {
                    super::super::control::Completion::Normal(v) => Ok(v),
                    super::super::control::Completion::Throw(v) => Err(Signal::Throw(v)),
                    super::super::control::Completion::Return(v) => Err(Signal::Return(v)),
                }
            }
            Position::AwaitOperand => {}
            other => return Err(desync("await", other)),
        }
    }
    let value = eval_expr(cx, scope, inner).map_err(|s| cx.save(s, || Position::AwaitOperand))?;
    let promise = promise::resolve_val(cx.realm, value);
    Err(cx.suspend_await(promise))
}

pub(crate) fn desync(construct: &str, pos: Position) -> Signal {
    Signal::internal(format!(
        "saved position {pos:?} does not belong to a {construct} node"
    ))
}
