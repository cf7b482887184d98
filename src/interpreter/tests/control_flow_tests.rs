//! Control flow tests
//!
//! Labeled break/continue targeting, try/catch/finally interaction with both
//! exceptions and suspensions, and cooperative interruption.

use super::helpers::*;
use crate::interpreter::ast::{Expr, Stmt};
use crate::interpreter::control::Signal;
use crate::interpreter::frame::Scope;
use crate::interpreter::generator::{self, GeneratorState};
use crate::interpreter::value::Val;
use crate::interpreter::{run_program, run_program_in, Completion};
use crate::realm::Realm;

fn lit_true() -> Expr {
    Expr::LitBool { v: true }
}

#[test]
fn labeled_break_exits_the_outer_loop() {
    let program = vec![
        Stmt::Labeled {
            label: "outer".into(),
            body: Box::new(while_(
                lit_true(),
                while_(lit_true(), Stmt::Break {
                    label: Some("outer".into()),
                }),
            )),
        },
        ret(num(1.0)),
    ];
    assert_eq!(run_program(&program).unwrap(), Val::Num(1.0));
}

#[test]
fn labeled_continue_targets_the_labeled_loop() {
    // The inner loop would spin forever if `continue outer` bound to it.
    let program = vec![
        let_("n", num(0.0)),
        Stmt::While {
            label: Some("outer".into()),
            test: lt(ident("n"), num(3.0)),
            body: Box::new(block(vec![
                expr(assign("n", add(ident("n"), num(1.0)))),
                while_(lit_true(), Stmt::Continue {
                    label: Some("outer".into()),
                }),
            ])),
        },
        ret(ident("n")),
    ];
    assert_eq!(run_program(&program).unwrap(), Val::Num(3.0));
}

#[test]
fn catch_binds_the_thrown_value() {
    let program = vec![try_catch(
        vec![Stmt::Throw { expr: str_("x") }],
        "e",
        vec![ret(ident("e"))],
    )];
    assert_eq!(run_program(&program).unwrap(), Val::str("x"));
}

#[test]
fn uncaught_throw_surfaces_as_a_host_error() {
    let program = vec![Stmt::Throw { expr: str_("boom") }];
    let err = run_program(&program).unwrap_err();
    assert!(err.to_string().contains("boom"), "got: {err}");
}

#[test]
fn suspension_inside_catch_resumes_in_the_handler_scope() {
    let realm = Realm::new();
    let gen = gen_in(
        &Scope::root(),
        vec![try_catch(
            vec![Stmt::Throw { expr: str_("e") }],
            "ex",
            vec![expr(yield_(ident("ex"))), ret(ident("ex"))],
        )],
    );
    let r = next(&realm, &gen);
    assert_eq!((r.value.clone(), r.done), (Val::str("e"), false));
    let r = next(&realm, &gen);
    assert_eq!((r.value, r.done), (Val::str("e"), true));
}

#[test]
fn suspension_passes_through_an_enclosing_catch() {
    let realm = Realm::new();
    let rec = Recorder::new();
    let scope = scope_with(vec![("effect", rec.native("effect"))]);
    let gen = gen_in(
        &scope,
        vec![try_catch(
            vec![expr(yield_(num(1.0)))],
            "e",
            vec![expr(call_fn("effect", vec![str_("caught")]))],
        )],
    );
    next(&realm, &gen);
    let r = next(&realm, &gen);
    assert!(r.done);
    // The yield was never visible to the catch clause.
    rec.assert_calls(&[]);
}

#[test]
fn finally_is_deferred_across_a_suspension() {
    let realm = Realm::new();
    let rec = Recorder::new();
    let scope = scope_with(vec![("effect", rec.native("effect"))]);
    let gen = gen_in(
        &scope,
        vec![try_finally(
            vec![
                expr(yield_(num(1.0))),
                expr(call_fn("effect", vec![str_("after")])),
            ],
            vec![expr(call_fn("effect", vec![str_("fin")]))],
        )],
    );

    next(&realm, &gen);
    // Suspension is not completion: the finalizer has not run yet.
    rec.assert_calls(&[]);

    let r = next(&realm, &gen);
    assert!(r.done);
    rec.assert_calls(&["effect(after)", "effect(fin)"]);
}

#[test]
fn finally_can_suspend_while_holding_a_pending_return() {
    let realm = Realm::new();
    let gen = gen_in(
        &Scope::root(),
        vec![try_finally(
            vec![ret(num(1.0))],
            vec![expr(yield_(num(9.0)))],
        )],
    );

    let r = next(&realm, &gen);
    assert_eq!((r.value, r.done), (Val::Num(9.0), false));
    // The finalizer finishes and the deferred return is re-applied.
    let r = next(&realm, &gen);
    assert_eq!((r.value, r.done), (Val::Num(1.0), true));
}

#[test]
fn finalizer_abrupt_completion_replaces_the_pending_one() {
    let program = vec![try_finally(vec![ret(num(1.0))], vec![ret(num(2.0))])];
    assert_eq!(run_program(&program).unwrap(), Val::Num(2.0));
}

#[test]
fn interrupt_stops_a_running_loop() {
    let realm = Realm::new();
    let gen = gen_in(
        &Scope::root(),
        vec![while_(lit_true(), expr(yield_(num(1.0))))],
    );
    next(&realm, &gen);
    realm.interrupt();
    let result = generator::resume(&realm, &gen, Completion::Normal(Val::Undefined));
    assert!(matches!(result, Err(Signal::Interrupt)));
    assert_eq!(gen.borrow().state, GeneratorState::Completed);
}

#[test]
fn interrupt_is_not_catchable_and_skips_finalizers() {
    let realm = Realm::new();
    let rec = Recorder::new();
    let scope = scope_with(vec![("effect", rec.native("effect"))]);
    let gen = gen_in(
        &scope,
        vec![Stmt::Try {
            block: vec![while_(lit_true(), expr(yield_(num(1.0))))],
            catch: Some(crate::interpreter::ast::CatchClause {
                param: Some("e".into()),
                body: vec![expr(call_fn("effect", vec![str_("caught")]))],
            }),
            finally: Some(vec![expr(call_fn("effect", vec![str_("fin")]))]),
        }],
    );
    next(&realm, &gen);
    realm.interrupt();
    let result = generator::resume(&realm, &gen, Completion::Normal(Val::Undefined));
    assert!(matches!(result, Err(Signal::Interrupt)));
    // Neither the handler nor the finalizer observed the cancellation.
    rec.assert_calls(&[]);
}

#[test]
fn interrupt_flag_fails_top_level_runs() {
    let realm = Realm::new();
    realm.interrupt();
    let program = vec![while_(lit_true(), block(vec![]))];
    let err = run_program_in(&realm, &Scope::root(), &program).unwrap_err();
    assert!(matches!(
        err,
        crate::interpreter::StrandError::Interrupted
    ));
}

#[test]
fn stray_break_is_a_syntax_error() {
    let program = vec![Stmt::Break { label: None }];
    let err = run_program(&program).unwrap_err();
    assert!(err.to_string().contains("SyntaxError"), "got: {err}");
}
