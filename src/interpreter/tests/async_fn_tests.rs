//! Async function driver tests
//!
//! The call/step protocol: synchronous execution up to the first await, result
//! promise settlement, and rejection-as-throw injection at the await point.

use super::helpers::*;
use crate::interpreter::ast::{FuncKind, Stmt};
use crate::interpreter::async_fn;
use crate::interpreter::frame::Scope;
use crate::interpreter::value::Val;
use crate::promise;
use crate::realm::Realm;

#[test]
fn rejected_await_rejects_the_result_and_stops_the_body() {
    let realm = Realm::new();
    let rec = Recorder::new();
    let scope = scope_with(vec![("effect", rec.native("effect"))]);
    let p = promise::pending();
    promise::reject(&realm, &p, Val::str("e"));
    scope.declare("p", Val::Promise(p));

    let closure = closure_in(
        &scope,
        FuncKind::Async,
        &[],
        vec![
            expr(await_(ident("p"))),
            expr(call_fn("effect", vec![str_("after")])),
        ],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    expect_pending(&result);
    realm.run_jobs();

    assert_eq!(expect_rejected(&result), Val::str("e"));
    // Nothing after the await ran.
    rec.assert_calls(&[]);
}

#[test]
fn fulfilled_await_becomes_the_expressions_value() {
    let realm = Realm::new();
    let scope = Scope::root();
    let p = promise::pending();
    promise::fulfill(&realm, &p, Val::Num(2.0));
    scope.declare("p", Val::Promise(p));

    let closure = closure_in(
        &scope,
        FuncKind::Async,
        &[],
        vec![let_("x", await_(ident("p"))), ret(add(ident("x"), num(1.0)))],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    realm.run_jobs();
    assert_eq!(expect_fulfilled(&result), Val::Num(3.0));
}

#[test]
fn body_runs_synchronously_up_to_the_first_await() {
    let realm = Realm::new();
    let rec = Recorder::new();
    let scope = scope_with(vec![("effect", rec.native("effect"))]);
    let closure = closure_in(
        &scope,
        FuncKind::Async,
        &[],
        vec![
            expr(call_fn("effect", vec![str_("before")])),
            expr(await_(num(1.0))),
            expr(call_fn("effect", vec![str_("after")])),
        ],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    // `before` has run already; `after` waits for the microtask queue.
    rec.assert_calls(&["effect(before)"]);
    expect_pending(&result);

    realm.run_jobs();
    rec.assert_calls(&["effect(before)", "effect(after)"]);
    assert_eq!(expect_fulfilled(&result), Val::Undefined);
}

#[test]
fn async_function_without_awaits_settles_immediately() {
    let realm = Realm::new();
    let closure = closure_in(&Scope::root(), FuncKind::Async, &[], vec![ret(num(5.0))]);
    let result = async_fn::call(&realm, &closure, vec![]);
    assert_eq!(expect_fulfilled(&result), Val::Num(5.0));
}

#[test]
fn uncaught_throw_rejects_the_result() {
    let realm = Realm::new();
    let closure = closure_in(
        &Scope::root(),
        FuncKind::Async,
        &[],
        vec![Stmt::Throw { expr: str_("bad") }],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    assert_eq!(expect_rejected(&result), Val::str("bad"));
}

#[test]
fn awaiting_a_plain_value_still_goes_through_the_queue() {
    let realm = Realm::new();
    let closure = closure_in(
        &Scope::root(),
        FuncKind::Async,
        &[],
        vec![ret(await_(num(7.0)))],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    expect_pending(&result);
    realm.run_jobs();
    assert_eq!(expect_fulfilled(&result), Val::Num(7.0));
}

#[test]
fn rejection_is_catchable_at_the_await_point() {
    let realm = Realm::new();
    let scope = Scope::root();
    let p = promise::pending();
    promise::reject(&realm, &p, Val::str("oops"));
    scope.declare("p", Val::Promise(p));

    let closure = closure_in(
        &scope,
        FuncKind::Async,
        &[],
        vec![try_catch(
            vec![ret(await_(ident("p")))],
            "e",
            vec![ret(ident("e"))],
        )],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    realm.run_jobs();
    // The rejection surfaced as a throw at the await and the catch took it.
    assert_eq!(expect_fulfilled(&result), Val::str("oops"));
}

#[test]
fn sequential_awaits_resume_in_order() {
    let realm = Realm::new();
    let rec = Recorder::new();
    let scope = scope_with(vec![("effect", rec.native("effect"))]);
    let closure = closure_in(
        &scope,
        FuncKind::Async,
        &[],
        vec![
            let_("a", await_(num(1.0))),
            expr(call_fn("effect", vec![ident("a")])),
            let_("b", await_(add(ident("a"), num(1.0)))),
            expr(call_fn("effect", vec![ident("b")])),
            ret(add(ident("a"), ident("b"))),
        ],
    );
    let result = async_fn::call(&realm, &closure, vec![]);
    realm.run_jobs();
    rec.assert_calls(&["effect(1)", "effect(2)"]);
    assert_eq!(expect_fulfilled(&result), Val::Num(3.0));
}
