//! Test helpers: AST construction shorthands and host-side instruments
//!
//! Programs under test are built directly as AST values. The shorthands here
//! keep the trees readable; the instruments (call log, counters) let tests
//! assert on exactly which side effects ran between suspensions.

use std::cell::RefCell;
use std::rc::Rc;

use crate::interpreter::ast::{
    BinOp, CatchClause, Expr, FuncDef, FuncKind, LogicalOp, Stmt, SwitchCase,
};
use crate::interpreter::control::{Completion, Signal};
use crate::interpreter::frame::Scope;
use crate::interpreter::generator::{self, GenRef};
use crate::interpreter::value::{ClosureData, IterResult, NativeFn, Val};
use crate::promise::{self, PromiseRef, PromiseState};
use crate::realm::Realm;

/* ===================== Expression shorthands ===================== */

pub fn num(v: f64) -> Expr {
    Expr::LitNum { v }
}

pub fn str_(v: &str) -> Expr {
    Expr::LitStr { v: v.to_string() }
}

pub fn ident(name: &str) -> Expr {
    Expr::Ident {
        name: name.to_string(),
    }
}

pub fn assign(name: &str, expr: Expr) -> Expr {
    Expr::Assign {
        name: name.to_string(),
        expr: Box::new(expr),
    }
}

pub fn bin(op: BinOp, left: Expr, right: Expr) -> Expr {
    Expr::Binary {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn logical(op: LogicalOp, left: Expr, right: Expr) -> Expr {
    Expr::Logical {
        op,
        left: Box::new(left),
        right: Box::new(right),
    }
}

pub fn add(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Add, left, right)
}

pub fn lt(left: Expr, right: Expr) -> Expr {
    bin(BinOp::Lt, left, right)
}

pub fn call(callee: Expr, args: Vec<Expr>) -> Expr {
    Expr::Call {
        callee: Box::new(callee),
        args,
    }
}

pub fn call_fn(name: &str, args: Vec<Expr>) -> Expr {
    call(ident(name), args)
}

pub fn member(object: Expr, property: &str) -> Expr {
    Expr::Member {
        object: Box::new(object),
        property: property.to_string(),
    }
}

pub fn yield_(inner: Expr) -> Expr {
    Expr::Yield {
        inner: Some(Box::new(inner)),
    }
}

pub fn yield_star(inner: Expr) -> Expr {
    Expr::YieldStar {
        inner: Box::new(inner),
    }
}

pub fn await_(inner: Expr) -> Expr {
    Expr::Await {
        inner: Box::new(inner),
    }
}

pub fn func(kind: FuncKind, params: &[&str], body: Vec<Stmt>) -> Expr {
    Expr::Func {
        def: func_def(kind, params, body),
    }
}

pub fn func_def(kind: FuncKind, params: &[&str], body: Vec<Stmt>) -> FuncDef {
    FuncDef {
        name: None,
        params: params.iter().map(|p| p.to_string()).collect(),
        body,
        kind,
    }
}

/* ===================== Statement shorthands ===================== */

pub fn let_(name: &str, init: Expr) -> Stmt {
    Stmt::Let {
        name: name.to_string(),
        init: Some(init),
    }
}

pub fn expr(e: Expr) -> Stmt {
    Stmt::Expr { expr: e }
}

pub fn ret(value: Expr) -> Stmt {
    Stmt::Return { value: Some(value) }
}

pub fn block(body: Vec<Stmt>) -> Stmt {
    Stmt::Block { body }
}

pub fn if_(test: Expr, then_s: Stmt, else_s: Option<Stmt>) -> Stmt {
    Stmt::If {
        test,
        then_s: Box::new(then_s),
        else_s: else_s.map(Box::new),
    }
}

pub fn while_(test: Expr, body: Stmt) -> Stmt {
    Stmt::While {
        label: None,
        test,
        body: Box::new(body),
    }
}

pub fn try_catch(block: Vec<Stmt>, param: &str, catch_body: Vec<Stmt>) -> Stmt {
    Stmt::Try {
        block,
        catch: Some(CatchClause {
            param: Some(param.to_string()),
            body: catch_body,
        }),
        finally: None,
    }
}

pub fn try_finally(block: Vec<Stmt>, finally: Vec<Stmt>) -> Stmt {
    Stmt::Try {
        block,
        catch: None,
        finally: Some(finally),
    }
}

pub fn case(test: Expr, body: Vec<Stmt>) -> SwitchCase {
    SwitchCase {
        test: Some(test),
        body,
    }
}

pub fn default_case(body: Vec<Stmt>) -> SwitchCase {
    SwitchCase { test: None, body }
}

/* ===================== Host-side instruments ===================== */

/// Shared call log plus natives that append to it.
#[derive(Clone, Default)]
pub struct Recorder {
    log: Rc<RefCell<Vec<String>>>,
}

impl Recorder {
    pub fn new() -> Recorder {
        Recorder::default()
    }

    /// A native that records `name(args...)` and evaluates to its first
    /// argument (or undefined when called without one).
    pub fn native(&self, name: &str) -> Val {
        let log = self.log.clone();
        let tag = name.to_string();
        Val::Native(NativeFn::new(name, move |_realm, args| {
            let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
            log.borrow_mut().push(format!("{tag}({})", rendered.join(", ")));
            Ok(args.first().cloned().unwrap_or(Val::Undefined))
        }))
    }

    pub fn entries(&self) -> Vec<String> {
        self.log.borrow().clone()
    }

    pub fn assert_calls(&self, expected: &[&str]) {
        let got = self.entries();
        let want: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        assert_eq!(got, want);
    }
}

/* ===================== Instance builders ===================== */

pub fn scope_with(bindings: Vec<(&str, Val)>) -> Scope {
    let scope = Scope::root();
    for (name, val) in bindings {
        scope.declare(name, val);
    }
    scope
}

pub fn closure_in(scope: &Scope, kind: FuncKind, params: &[&str], body: Vec<Stmt>) -> ClosureData {
    ClosureData {
        def: Rc::new(func_def(kind, params, body)),
        env: scope.clone(),
    }
}

/// Instantiate a generator over `body` with natives/values bound in scope.
pub fn gen_in(scope: &Scope, body: Vec<Stmt>) -> GenRef {
    generator::instantiate(&closure_in(scope, FuncKind::Generator, &[], body), vec![])
}

pub fn gen_with_args(scope: &Scope, params: &[&str], args: Vec<Val>, body: Vec<Stmt>) -> GenRef {
    generator::instantiate(&closure_in(scope, FuncKind::Generator, params, body), args)
}

/* ===================== Driving helpers ===================== */

pub fn next(realm: &Realm, gen: &GenRef) -> IterResult {
    next_with(realm, gen, Val::Undefined)
}

pub fn next_with(realm: &Realm, gen: &GenRef, v: Val) -> IterResult {
    match generator::resume(realm, gen, Completion::Normal(v)) {
        Ok(r) => r,
        Err(s) => panic!("resume raised {s:?}"),
    }
}

pub fn throw_into(realm: &Realm, gen: &GenRef, e: Val) -> Result<IterResult, Signal> {
    generator::resume(realm, gen, Completion::Throw(e))
}

pub fn return_into(realm: &Realm, gen: &GenRef, v: Val) -> Result<IterResult, Signal> {
    generator::resume(realm, gen, Completion::Return(v))
}

/// Unwrap a thrown error value out of a driver result.
pub fn thrown(result: Result<IterResult, Signal>) -> Val {
    match result {
        Err(Signal::Throw(v)) => v,
        other => panic!("expected a throw, got {other:?}"),
    }
}

/* ===================== Promise assertions ===================== */

pub fn expect_fulfilled(p: &PromiseRef) -> Val {
    match promise::state(p) {
        PromiseState::Fulfilled(v) => v,
        other => panic!("expected fulfilled, got {other:?}"),
    }
}

pub fn expect_rejected(p: &PromiseRef) -> Val {
    match promise::state(p) {
        PromiseState::Rejected(e) => e,
        other => panic!("expected rejected, got {other:?}"),
    }
}

pub fn expect_pending(p: &PromiseRef) {
    assert_eq!(promise::state(p), PromiseState::Pending);
}

/// Unwrap a fulfilled `{value, done}` result object.
pub fn expect_iter_result(p: &PromiseRef) -> IterResult {
    let v = expect_fulfilled(p);
    match IterResult::from_val(&v) {
        Ok(r) => r,
        Err(s) => panic!("not an iterator result: {s:?}"),
    }
}
