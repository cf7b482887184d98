//! Async-function driver
//!
//! Structurally the generator driver, but outcomes are reported by settling
//! the call's promise capability instead of returning iteration results. An
//! await suspension reports nothing externally: the registered settlement
//! reactions are the only path back in.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::ast::FuncDef;
use super::control::Completion;
use super::errors::ErrorInfo;
use super::eval::{self, BodyOutcome};
use super::frame::Scope;
use super::generator::GeneratorState;
use super::position::Continuation;
use super::value::{ClosureData, Val};
use crate::promise::{self, Capability, PromiseRef};
use crate::realm::Realm;

struct AsyncActivation {
    state: GeneratorState,
    frame: Scope,
    def: Rc<FuncDef>,
    cont: Continuation,
    cap: Capability,
}

type AsyncRef = Rc<RefCell<AsyncActivation>>;

/// Call an async function: capture the frame, start the body synchronously
/// up to its first suspension, and return the result promise immediately.
pub fn call(realm: &Realm, closure: &ClosureData, args: Vec<Val>) -> PromiseRef {
    let frame = Scope::function_frame(&closure.env, &closure.def.params, args);
    let cap = Capability::new();
    let result = cap.promise.clone();
    let act = Rc::new(RefCell::new(AsyncActivation {
        state: GeneratorState::SuspendedStart,
        frame,
        def: closure.def.clone(),
        cont: Continuation::new(),
        cap,
    }));
    step(realm, &act, Completion::Normal(Val::Undefined));
    result
}

/// One driver invocation: run from the saved position to the next await,
/// completion, or exception.
fn step(realm: &Realm, act: &AsyncRef, completion: Completion) {
    {
        let a = act.borrow();
        if a.state == GeneratorState::Executing || a.state == GeneratorState::Completed {
            // Settlement reactions fire at most once, so this is a core bug,
            // not a user error.
            debug!(state = ?a.state, "async driver re-entered in invalid state");
            return;
        }
    }
    let (frame, def, mut cont, cap) = {
        let mut a = act.borrow_mut();
        a.state = GeneratorState::Executing;
        (
            a.frame.clone(),
            a.def.clone(),
            std::mem::take(&mut a.cont),
            a.cap.clone(),
        )
    };

    let outcome = eval::run_body(realm, &mut cont, &frame, &def.body, completion);

    match outcome {
        BodyOutcome::Normal(v) | BodyOutcome::Return(v) => {
            act.borrow_mut().state = GeneratorState::Completed;
            cap.resolve(realm, v);
        }
        BodyOutcome::Throw(e) => {
            act.borrow_mut().state = GeneratorState::Completed;
            cap.reject(realm, e);
        }
        BodyOutcome::Awaiting(p) => {
            {
                let mut a = act.borrow_mut();
                a.cont = cont;
                a.state = GeneratorState::SuspendedYield;
            }
            register_reentry(realm, act, &p);
        }
        BodyOutcome::Yielded(_) => {
            act.borrow_mut().state = GeneratorState::Completed;
            cap.reject(
                realm,
                Val::Error(ErrorInfo::type_error("yield inside an async function")),
            );
        }
        BodyOutcome::Interrupted => {
            act.borrow_mut().state = GeneratorState::Completed;
            cap.reject(
                realm,
                Val::Error(ErrorInfo::new("InterruptError", "execution interrupted")),
            );
        }
    }
}

/// The await suspension's only external effect: driver re-entry reactions.
fn register_reentry(realm: &Realm, act: &AsyncRef, p: &PromiseRef) {
    let on_ok = {
        let act = act.clone();
        move |realm: &Realm, v: Val| step(realm, &act, Completion::Normal(v))
    };
    let on_err = {
        let act = act.clone();
        move |realm: &Realm, e: Val| step(realm, &act, Completion::Throw(e))
    };
    promise::then(realm, p, on_ok, on_err);
}
