//! Resumable statement execution
//!
//! Every construct that can contain a suspension point follows the same
//! discipline: on a suspension signal from a child, push a position that
//! records which child (and which in-flight state) was active, then re-raise;
//! on resume, pop that position and descend straight into the saved child.
//! Work completed before the previous suspension is never re-executed.

use super::super::ast::{CatchClause, Expr, Stmt, SwitchCase};
use super::super::control::{label_matches, Completion, Exec, Signal, Suspend};
use super::super::frame::Scope;
use super::super::iterator::{get_iterator, iterator_close, IterTarget};
use super::super::position::{ForOfPhase, ForPhase, Position, TryPos};
use super::super::value::{strict_eq, IterResult, Val};
use super::expressions::{desync, eval_expr};
use super::Activation;
use crate::promise;

pub fn exec_stmt(cx: &mut Activation, scope: &Scope, stmt: &Stmt) -> Exec {
    match stmt {
        Stmt::Block { body } => exec_block(cx, scope, body),
        Stmt::Let { name, init } => {
            // Initializer resume descends implicitly (single live child).
            let v = match init {
                Some(e) => eval_expr(cx, scope, e)?,
                None => Val::Undefined,
            };
            scope.declare(name, v);
            Ok(())
        }
        Stmt::Expr { expr } => {
            eval_expr(cx, scope, expr)?;
            Ok(())
        }
        Stmt::If {
            test,
            then_s,
            else_s,
        } => exec_if(cx, scope, test, then_s, else_s.as_deref()),
        Stmt::While { label, test, body } => exec_while(cx, scope, label, test, body),
        Stmt::For {
            label,
            decls,
            test,
            update,
            body,
        } => exec_for(cx, scope, label, decls, test.as_ref(), update, body),
        Stmt::ForOf {
            label,
            binding,
            iterable,
            body,
            awaits,
        } => exec_for_of(cx, scope, label, binding, iterable, body, *awaits),
        Stmt::Switch { disc, cases } => exec_switch(cx, scope, disc, cases),
        Stmt::Try {
            block,
            catch,
            finally,
        } => exec_try(cx, scope, block, catch.as_ref(), finally.as_deref()),
        Stmt::Labeled { label, body } => exec_labeled(cx, scope, label, body),
        Stmt::Break { label } => Err(Signal::Break(label.clone())),
        Stmt::Continue { label } => Err(Signal::Continue(label.clone())),
        Stmt::Return { value } => {
            let v = match value {
                Some(e) => eval_expr(cx, scope, e)?,
                None => Val::Undefined,
            };
            Err(Signal::Return(v))
        }
        Stmt::Throw { expr } => {
            let v = eval_expr(cx, scope, expr)?;
            Err(Signal::Throw(v))
        }
    }
}

/* ===================== Sequences ===================== */

/// Execute a statement list in `scope`, resuming at the saved index when the
/// activation is mid-descent. The list's scope travels with the position so
/// locals declared before the suspension survive it.
pub fn exec_stmt_list(cx: &mut Activation, scope: &Scope, body: &[Stmt]) -> Exec {
    let mut scope = scope.clone();
    let mut start = 0;
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::Seq { idx, scope: saved } => {
                start = idx;
                scope = saved;
            }
            other => return Err(desync("statement list", other)),
        }
    }
    for (i, stmt) in body.iter().enumerate().skip(start) {
        exec_stmt(cx, &scope, stmt).map_err(|s| {
            let scope = scope.clone();
            cx.save(s, move || Position::Seq { idx: i, scope })
        })?;
    }
    Ok(())
}

fn exec_block(cx: &mut Activation, scope: &Scope, body: &[Stmt]) -> Exec {
    // On resume the list position restores its own scope; the placeholder
    // child is never observed.
    let child = if cx.is_resuming() {
        scope.clone()
    } else {
        scope.child()
    };
    exec_stmt_list(cx, &child, body)
}

/* ===================== Conditionals ===================== */

fn exec_if(
    cx: &mut Activation,
    scope: &Scope,
    test: &Expr,
    then_s: &Stmt,
    else_s: Option<&Stmt>,
) -> Exec {
    let mut resumed_arm = None;
    match cx.take_position()? {
        Some(Position::IfArm { then_branch }) => resumed_arm = Some(then_branch),
        Some(Position::IfTest) => {}
        Some(other) => return Err(desync("if", other)),
        None => {}
    }
    let arm = match resumed_arm {
        Some(a) => a,
        None => eval_expr(cx, scope, test)
            .map_err(|s| cx.save(s, || Position::IfTest))?
            .is_truthy(),
    };
    let result = if arm {
        exec_stmt(cx, scope, then_s)
    } else {
        match else_s {
            Some(e) => exec_stmt(cx, scope, e),
            None => Ok(()),
        }
    };
    result.map_err(|s| cx.save(s, || Position::IfArm { then_branch: arm }))
}

fn exec_labeled(cx: &mut Activation, scope: &Scope, label: &str, body: &Stmt) -> Exec {
    // Carries no position of its own; resume descends into the body.
    match exec_stmt(cx, scope, body) {
        Err(Signal::Break(Some(l))) if l == label => Ok(()),
        other => other,
    }
}

/* ===================== Loops ===================== */

fn exec_while(
    cx: &mut Activation,
    scope: &Scope,
    label: &Option<String>,
    test: &Expr,
    body: &Stmt,
) -> Exec {
    let mut resume_into_body = false;
    match cx.take_position()? {
        Some(Position::While { in_body }) => resume_into_body = in_body,
        Some(other) => return Err(desync("while", other)),
        None => {}
    }
    loop {
        cx.realm.check_interrupt()?;
        if !resume_into_body {
            let c = eval_expr(cx, scope, test)
                .map_err(|s| cx.save(s, || Position::While { in_body: false }))?;
            if !c.is_truthy() {
                return Ok(());
            }
        }
        resume_into_body = false;
        match exec_stmt(cx, scope, body) {
            Ok(()) => {}
            Err(Signal::Break(l)) if label_matches(&l, label) => return Ok(()),
            Err(Signal::Continue(l)) if label_matches(&l, label) => {}
            Err(s) => return Err(cx.save(s, || Position::While { in_body: true })),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn exec_for(
    cx: &mut Activation,
    scope: &Scope,
    label: &Option<String>,
    decls: &[(String, Expr)],
    test: Option<&Expr>,
    update: &[(String, Expr)],
    body: &Stmt,
) -> Exec {
    let names: Vec<&String> = decls.iter().map(|(n, _)| n).collect();
    let (mut iter_scope, mut entry) = match cx.take_position()? {
        Some(Position::For { phase, scope: s }) => (s, Some(phase)),
        Some(other) => return Err(desync("for", other)),
        None => (scope.child(), None),
    };

    // Declarations run once; a suspension inside one resumes it in place.
    if matches!(entry, None | Some(ForPhase::Init(_))) {
        let start = match entry {
            Some(ForPhase::Init(i)) => i,
            _ => 0,
        };
        for (i, (name, init)) in decls.iter().enumerate().skip(start) {
            let v = eval_expr(cx, &iter_scope, init).map_err(|s| {
                let sc = iter_scope.clone();
                cx.save(s, move || Position::For {
                    phase: ForPhase::Init(i),
                    scope: sc,
                })
            })?;
            iter_scope.declare(name, v);
        }
        // First per-iteration environment, so closures made in the first
        // iteration don't share the declaration bindings.
        iter_scope = iter_scope.copy_bindings(&names);
        entry = None;
    }

    loop {
        cx.realm.check_interrupt()?;

        let skip_test = matches!(entry, Some(ForPhase::Body) | Some(ForPhase::Update(_)));
        if !skip_test {
            if let Some(t) = test {
                let c = eval_expr(cx, &iter_scope, t).map_err(|s| {
                    let sc = iter_scope.clone();
                    cx.save(s, move || Position::For {
                        phase: ForPhase::Test,
                        scope: sc,
                    })
                })?;
                if !c.is_truthy() {
                    return Ok(());
                }
            }
        }

        let skip_body = matches!(entry, Some(ForPhase::Update(_)));
        if !skip_body {
            match exec_stmt(cx, &iter_scope, body) {
                Ok(()) => {}
                Err(Signal::Break(l)) if label_matches(&l, label) => return Ok(()),
                Err(Signal::Continue(l)) if label_matches(&l, label) => {}
                Err(s) => {
                    let sc = iter_scope.clone();
                    return Err(cx.save(s, move || Position::For {
                        phase: ForPhase::Body,
                        scope: sc,
                    }));
                }
            }
            // Bindings carried into the next iteration exactly once; a
            // suspension in the update phase saves the post-copy scope, so
            // resuming never copies a second time.
            iter_scope = iter_scope.copy_bindings(&names);
        }

        let update_start = match entry {
            Some(ForPhase::Update(i)) => i,
            _ => 0,
        };
        entry = None;
        for (i, (name, expr)) in update.iter().enumerate().skip(update_start) {
            let v = eval_expr(cx, &iter_scope, expr).map_err(|s| {
                let sc = iter_scope.clone();
                cx.save(s, move || Position::For {
                    phase: ForPhase::Update(i),
                    scope: sc,
                })
            })?;
            iter_scope.set(name, v);
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn exec_for_of(
    cx: &mut Activation,
    scope: &Scope,
    label: &Option<String>,
    binding: &str,
    iterable: &Expr,
    body: &Stmt,
    awaits: bool,
) -> Exec {
    let (iter, mut entry) = match cx.take_position()? {
        Some(Position::ForOf {
            phase,
            iter,
            scope: s,
        }) => (iter, Some((phase, s))),
        Some(Position::ForOfIterable) | None => {
            let v = eval_expr(cx, scope, iterable)
                .map_err(|s| cx.save(s, || Position::ForOfIterable))?;
            let iter = get_iterator(&v)?;
            if iter.is_async() && !awaits {
                return Err(Signal::type_error(
                    "async generator can only be iterated with for-await",
                ));
            }
            (iter, None)
        }
        Some(other) => return Err(desync("for-of", other)),
    };

    loop {
        cx.realm.check_interrupt()?;

        // Produce the next value, or pick up the one we suspended on.
        let step = match entry.take() {
            Some((ForOfPhase::Body, body_scope)) => {
                // Resume inside the body, then move on to the next step.
                match run_for_of_body(cx, label, &iter, body, &body_scope)? {
                    LoopFlow::Exit => return Ok(()),
                    LoopFlow::Next => continue,
                }
            }
            Some((ForOfPhase::AwaitNext, _)) => match cx.take_pending()? {
                Completion::Normal(v) => {
                    let r = IterResult::from_val(&v)?;
                    if r.done {
                        return Ok(());
                    }
                    r
                }
                Completion::Throw(e) => return Err(Signal::Throw(e)),
                Completion::Return(v) => return Err(Signal::Return(v)),
            },
            Some((ForOfPhase::AwaitValue, _)) => match cx.take_pending()? {
                Completion::Normal(v) => IterResult::next(v),
                Completion::Throw(e) => {
                    iterator_close(cx.realm, &iter);
                    return Err(Signal::Throw(e));
                }
                Completion::Return(v) => {
                    iterator_close(cx.realm, &iter);
                    return Err(Signal::Return(v));
                }
            },
            None => {
                if iter.is_async() {
                    // Ask the async iterator and suspend on its promise.
                    let p = iter.next_promise(cx.realm, Val::Undefined)?;
                    let iter2 = iter.clone();
                    let sc = scope.clone();
                    cx.push_position(Position::ForOf {
                        phase: ForOfPhase::AwaitNext,
                        iter: iter2,
                        scope: sc,
                    });
                    return Err(Signal::Suspend(Suspend::Await(p)));
                }
                let r = iter.next(cx.realm, Val::Undefined)?;
                if r.done {
                    return Ok(());
                }
                if awaits {
                    // for-await over a sync iterator awaits each value.
                    let p = promise::resolve_val(cx.realm, r.value);
                    let iter2 = iter.clone();
                    let sc = scope.clone();
                    cx.push_position(Position::ForOf {
                        phase: ForOfPhase::AwaitValue,
                        iter: iter2,
                        scope: sc,
                    });
                    return Err(Signal::Suspend(Suspend::Await(p)));
                }
                r
            }
        };

        let body_scope = scope.child();
        body_scope.declare(binding, step.value);
        match run_for_of_body(cx, label, &iter, body, &body_scope)? {
            LoopFlow::Exit => return Ok(()),
            LoopFlow::Next => {}
        }
    }
}

enum LoopFlow {
    Next,
    Exit,
}

/// One body pass of a for-of loop: reports whether to iterate again or leave
/// the loop, closing the iterator on every abrupt exit except suspension.
fn run_for_of_body(
    cx: &mut Activation,
    label: &Option<String>,
    iter: &IterTarget,
    body: &Stmt,
    body_scope: &Scope,
) -> Result<LoopFlow, Signal> {
    match exec_stmt(cx, body_scope, body) {
        Ok(()) => Ok(LoopFlow::Next),
        Err(Signal::Continue(l)) if label_matches(&l, label) => Ok(LoopFlow::Next),
        Err(Signal::Break(l)) if label_matches(&l, label) => {
            iterator_close(cx.realm, iter);
            Ok(LoopFlow::Exit)
        }
        Err(s @ Signal::Suspend(_)) => {
            let iter = iter.clone();
            let sc = body_scope.clone();
            Err(cx.save(s, move || Position::ForOf {
                phase: ForOfPhase::Body,
                iter,
                scope: sc,
            }))
        }
        Err(Signal::Interrupt) => Err(Signal::Interrupt),
        Err(abrupt) => {
            // Abrupt exit (throw, return, outer-label break/continue):
            // close the iterator, suppressing secondary errors, and let the
            // original signal propagate unchanged.
            iterator_close(cx.realm, iter);
            Err(abrupt)
        }
    }
}

/* ===================== Switch ===================== */

fn exec_switch(cx: &mut Activation, scope: &Scope, disc: &Expr, cases: &[SwitchCase]) -> Exec {
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::Switch {
                case_idx,
                stmt_idx,
                scope: saved,
            } => return run_cases(cx, &saved, cases, case_idx, Some(stmt_idx)),
            other => return Err(desync("switch", other)),
        }
    }
    let d = eval_no_suspend(cx, scope, disc)?;
    let child = scope.child();
    let mut target = None;
    for (i, case) in cases.iter().enumerate() {
        if let Some(test) = &case.test {
            let tv = eval_no_suspend(cx, &child, test)?;
            if strict_eq(&d, &tv) {
                target = Some(i);
                break;
            }
        }
    }
    let target = target.or_else(|| cases.iter().position(|c| c.test.is_none()));
    match target {
        Some(i) => run_cases(cx, &child, cases, i, None),
        None => Ok(()),
    }
}

/// Execute case bodies from the selected clause onward (fallthrough),
/// resuming at a saved (clause, statement) pair when given.
fn run_cases(
    cx: &mut Activation,
    scope: &Scope,
    cases: &[SwitchCase],
    case_idx: usize,
    resume_stmt: Option<usize>,
) -> Exec {
    let mut resume_stmt = resume_stmt;
    for (ci, case) in cases.iter().enumerate().skip(case_idx) {
        let start = resume_stmt.take().filter(|_| ci == case_idx).unwrap_or(0);
        for (si, stmt) in case.body.iter().enumerate().skip(start) {
            match exec_stmt(cx, scope, stmt) {
                Ok(()) => {}
                Err(Signal::Break(None)) => return Ok(()),
                Err(s) => {
                    let sc = scope.clone();
                    return Err(cx.save(s, move || Position::Switch {
                        case_idx: ci,
                        stmt_idx: si,
                        scope: sc,
                    }));
                }
            }
        }
    }
    Ok(())
}

/// Case selection must not suspend: a suspension raised while evaluating the
/// discriminant or a case test is converted into a TypeError (and any
/// positions it pushed are discarded).
fn eval_no_suspend(cx: &mut Activation, scope: &Scope, expr: &Expr) -> Result<Val, Signal> {
    let depth = cx.position_depth();
    match eval_expr(cx, scope, expr) {
        Err(Signal::Suspend(_)) => {
            cx.truncate_positions(depth);
            Err(Signal::type_error("switch case selection cannot suspend"))
        }
        other => other,
    }
}

/* ===================== Try / catch / finally ===================== */

fn exec_try(
    cx: &mut Activation,
    scope: &Scope,
    block: &[Stmt],
    catch: Option<&CatchClause>,
    finally: Option<&[Stmt]>,
) -> Exec {
    let mut entry: Option<TryPos> = None;
    if let Some(pos) = cx.take_position()? {
        match pos {
            Position::Try(t) => entry = Some(t),
            other => return Err(desync("try", other)),
        }
    }

    // Resuming inside the finalizer: run it out, then re-apply the outcome.
    let entry = match entry {
        Some(TryPos::Finally { pending }) => {
            let fin =
                finally.ok_or_else(|| Signal::internal("finally position without finalizer"))?;
            return run_finally(cx, scope, fin, pending.map(|b| *b));
        }
        other => other,
    };

    let block_result: Exec = match entry {
        Some(TryPos::Catch { scope: catch_scope }) => {
            // Re-entry continues inside the handler, in its saved scope.
            let clause = catch.ok_or_else(|| Signal::internal("catch position without handler"))?;
            exec_stmt_list(cx, &catch_scope, &clause.body).map_err(|s| {
                let sc = catch_scope.clone();
                cx.save(s, move || Position::Try(TryPos::Catch { scope: sc }))
            })
        }
        _ => {
            // Fresh run, or resuming inside the protected block: the signal
            // passed through here leaving only the routing marker.
            let inner = if cx.is_resuming() {
                scope.clone()
            } else {
                scope.child()
            };
            let r = exec_stmt_list(cx, &inner, block)
                .map_err(|s| cx.save(s, || Position::Try(TryPos::Block)));
            match (r, catch) {
                (Err(Signal::Throw(thrown)), Some(clause)) => {
                    let catch_scope = scope.child();
                    if let Some(param) = &clause.param {
                        catch_scope.declare(param, thrown);
                    }
                    exec_stmt_list(cx, &catch_scope, &clause.body).map_err(|s| {
                        let sc = catch_scope.clone();
                        cx.save(s, move || Position::Try(TryPos::Catch { scope: sc }))
                    })
                }
                (r, _) => r,
            }
        }
    };

    match finally {
        None => block_result,
        Some(fin) => match block_result {
            // A mere suspension defers the finalizer until genuine completion.
            Err(s @ Signal::Suspend(_)) => Err(s),
            // Fatal cancellation runs no user cleanup.
            Err(Signal::Interrupt) => Err(Signal::Interrupt),
            Ok(()) => run_finally(cx, scope, fin, None),
            Err(abrupt) => run_finally(cx, scope, fin, Some(abrupt)),
        },
    }
}

/// Run the finalizer, then re-apply the pending outcome (if any). An abrupt
/// completion of the finalizer itself replaces the pending outcome.
fn run_finally(
    cx: &mut Activation,
    scope: &Scope,
    fin: &[Stmt],
    pending: Option<Signal>,
) -> Exec {
    let inner = if cx.is_resuming() {
        scope.clone()
    } else {
        scope.child()
    };
    match exec_stmt_list(cx, &inner, fin) {
        Ok(()) => match pending {
            None => Ok(()),
            Some(sig) => Err(sig),
        },
        Err(s) => Err(cx.save(s, move || {
            Position::Try(TryPos::Finally {
                pending: pending.map(Box::new),
            })
        })),
    }
}
