//! yield* delegation
//!
//! Delegation forwards every completion the outer generator receives to the
//! inner iterator, choosing next/throw/return by completion kind, inspects
//! the result's done flag to decide whether to keep delegating, and re-wraps
//! not-done values through the outer yield protocol. The transition logic
//! lives in `advance`, an explicit one-step function over the delegation
//! state, so it can be exercised without a surrounding tree walk.

use super::super::ast::Expr;
use super::super::control::{Completion, Eval, Signal, Suspend};
use super::super::frame::Scope;
use super::super::iterator::{get_iterator, iterator_close, IterTarget};
use super::super::position::Position;
use super::super::value::{IterResult, Val};
use super::expressions::{desync, eval_expr};
use super::Activation;
use crate::realm::Realm;

/// Result of forwarding one completion to the inner iterator.
#[derive(Debug)]
pub enum DelegateStep {
    /// Inner produced a not-done value: re-yield it from the outer generator.
    Yielded(Val),
    /// Inner finished normally: this is the value of the yield* expression.
    Done(Val),
    /// A forwarded return ran to completion: the outer generator returns too.
    Returned(Val),
}

/// Forward `received` to the inner iterator and classify what happens next.
pub fn advance(
    realm: &Realm,
    iter: &IterTarget,
    received: Completion,
) -> Result<DelegateStep, Signal> {
    match received {
        Completion::Normal(v) => {
            let step = iter.next(realm, v)?;
            Ok(classify_next(step))
        }
        Completion::Throw(e) => {
            if iter.has_throw() {
                let step = iter.throw(realm, e)?;
                Ok(classify_next(step))
            } else {
                // The inner iterator cannot handle the throw; close it so it
                // still observes teardown, then surface a TypeError.
                iterator_close(realm, iter);
                Err(Signal::type_error(
                    "iterator being delegated to has no throw method",
                ))
            }
        }
        Completion::Return(v) => {
            if iter.has_return() {
                let step = iter.ret(realm, v)?;
                if step.done {
                    Ok(DelegateStep::Returned(step.value))
                } else {
                    // Inner refused to finish; keep delegating to it.
                    Ok(DelegateStep::Yielded(step.value))
                }
            } else {
                Ok(DelegateStep::Returned(v))
            }
        }
    }
}

fn classify_next(step: IterResult) -> DelegateStep {
    if step.done {
        DelegateStep::Done(step.value)
    } else {
        DelegateStep::Yielded(step.value)
    }
}

/// Evaluate a `yield*` expression: one `advance` per driver entry, with the
/// delegation position carrying the live inner iterator across suspensions.
pub fn eval_yield_star(cx: &mut Activation, scope: &Scope, inner: &Expr) -> Eval {
    let (iter, received) = match cx.take_position()? {
        Some(Position::Delegate { iter }) => {
            let completion = cx.take_pending()?;
            (iter, completion)
        }
        Some(Position::DelegateOperand) => {
            let v = eval_expr(cx, scope, inner)
                .map_err(|s| cx.save(s, || Position::DelegateOperand))?;
            (get_iterator(&v)?, Completion::Normal(Val::Undefined))
        }
        Some(other) => return Err(desync("yield*", other)),
        None => {
            let v = eval_expr(cx, scope, inner)
                .map_err(|s| cx.save(s, || Position::DelegateOperand))?;
            (get_iterator(&v)?, Completion::Normal(Val::Undefined))
        }
    };
    match advance(cx.realm, &iter, received)? {
        DelegateStep::Yielded(v) => {
            cx.push_position(Position::Delegate { iter });
            Err(Signal::Suspend(Suspend::Yield(IterResult::next(v))))
        }
        DelegateStep::Done(v) => Ok(v),
        DelegateStep::Returned(v) => Err(Signal::Return(v)),
    }
}
