//! Call dispatch
//!
//! Invokes callable values with an ordinary-call contract. Ordinary closures
//! run to completion here; calling a generator, async function, or async
//! generator function instead creates the corresponding suspendable instance
//! and returns immediately.

use super::ast::FuncKind;
use super::async_fn;
use super::async_gen;
use super::control::{Completion, Signal};
use super::eval::{self, BodyOutcome};
use super::frame::Scope;
use super::generator::{self, GeneratorState};
use super::position::Continuation;
use super::value::{ClosureData, NativeFn, Val};
use crate::realm::Realm;

/// Invoke a callable value.
pub fn call(realm: &Realm, callee: &Val, args: Vec<Val>) -> Result<Val, Signal> {
    match callee {
        Val::Native(nf) => (nf.f)(realm, &args),
        Val::Closure(c) => match c.def.kind {
            FuncKind::Normal => call_ordinary(realm, c, args),
            FuncKind::Generator => Ok(Val::Generator(generator::instantiate(c, args))),
            FuncKind::Async => Ok(Val::Promise(async_fn::call(realm, c, args))),
            FuncKind::AsyncGenerator => Ok(Val::AsyncGenerator(async_gen::instantiate(c, args))),
        },
        other => Err(Signal::type_error(format!(
            "{} is not callable",
            other.type_name()
        ))),
    }
}

/// Non-reentrant run-to-completion call of an ordinary function body.
fn call_ordinary(realm: &Realm, c: &ClosureData, args: Vec<Val>) -> Result<Val, Signal> {
    let frame = Scope::function_frame(&c.env, &c.def.params, args);
    let mut cont = Continuation::new();
    match eval::run_body(
        realm,
        &mut cont,
        &frame,
        &c.def.body,
        Completion::Normal(Val::Undefined),
    ) {
        BodyOutcome::Normal(_) => Ok(Val::Undefined),
        BodyOutcome::Return(v) => Ok(v),
        BodyOutcome::Throw(v) => Err(Signal::Throw(v)),
        BodyOutcome::Yielded(_) | BodyOutcome::Awaiting(_) => Err(Signal::type_error(
            "cannot suspend inside an ordinary function call",
        )),
        BodyOutcome::Interrupted => Err(Signal::Interrupt),
    }
}

/// Property access on runtime values, including the bound iteration methods
/// of generator and async generator handles.
pub fn member_get(obj: &Val, prop: &str) -> Result<Val, Signal> {
    match obj {
        Val::Obj(o) => Ok(o.borrow().get(prop).cloned().unwrap_or(Val::Undefined)),
        Val::List(l) => match prop {
            "length" => Ok(Val::Num(l.borrow().len() as f64)),
            _ => Ok(Val::Undefined),
        },
        Val::Str(s) => match prop {
            "length" => Ok(Val::Num(s.chars().count() as f64)),
            _ => Ok(Val::Undefined),
        },
        Val::Error(e) => match prop {
            "name" => Ok(Val::Str(e.name.clone())),
            "message" => Ok(Val::Str(e.message.clone())),
            _ => Ok(Val::Undefined),
        },
        Val::Generator(g) => Ok(generator_method(g, prop)),
        Val::AsyncGenerator(a) => Ok(async_generator_method(a, prop)),
        other => Err(Signal::type_error(format!(
            "cannot read property {prop:?} of {}",
            other.type_name()
        ))),
    }
}

fn generator_method(g: &generator::GenRef, prop: &str) -> Val {
    let completion_for = |prop: &str, arg: Val| match prop {
        "next" => Completion::Normal(arg),
        "throw" => Completion::Throw(arg),
        _ => Completion::Return(arg),
    };
    match prop {
        "next" | "throw" | "return" => {
            let g = g.clone();
            let name = prop.to_string();
            Val::Native(NativeFn::new(format!("generator_{prop}"), move |realm, args| {
                let arg = args.first().cloned().unwrap_or(Val::Undefined);
                generator::resume(realm, &g, completion_for(&name, arg)).map(|r| r.to_val())
            }))
        }
        "state" => Val::Str(state_name(g.borrow().state).to_string()),
        _ => Val::Undefined,
    }
}

fn async_generator_method(a: &async_gen::AsyncGenRef, prop: &str) -> Val {
    match prop {
        "next" | "throw" | "return" => {
            let a = a.clone();
            let name = prop.to_string();
            Val::Native(NativeFn::new(
                format!("async_generator_{prop}"),
                move |realm, args| {
                    let arg = args.first().cloned().unwrap_or(Val::Undefined);
                    let completion = match name.as_str() {
                        "next" => Completion::Normal(arg),
                        "throw" => Completion::Throw(arg),
                        _ => Completion::Return(arg),
                    };
                    Ok(Val::Promise(async_gen::enqueue(realm, &a, completion)))
                },
            ))
        }
        "state" => Val::Str(state_name(a.borrow().state).to_string()),
        _ => Val::Undefined,
    }
}

fn state_name(state: GeneratorState) -> &'static str {
    match state {
        GeneratorState::SuspendedStart => "suspended-start",
        GeneratorState::SuspendedYield => "suspended-yield",
        GeneratorState::Executing => "executing",
        GeneratorState::AwaitingReturn => "awaiting-return",
        GeneratorState::Completed => "completed",
    }
}
