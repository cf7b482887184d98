//! Generator instances and their driver
//!
//! Calling a generator function captures the frame and returns a handle
//! immediately; nothing of the body runs. Each resumption invokes the driver,
//! which validates state, injects the incoming completion at the saved
//! suspension point, runs to the next yield/completion/exception, and updates
//! state and saved positions before returning.

use std::cell::RefCell;
use std::rc::Rc;

use tracing::debug;

use super::ast::FuncDef;
use super::control::{Completion, Signal};
use super::eval::{self, BodyOutcome};
use super::frame::Scope;
use super::position::Continuation;
use super::value::{ClosureData, IterResult, Val};
use crate::realm::Realm;

/// Lifecycle state of one generator (or async generator) instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeneratorState {
    /// Created, body not yet entered.
    SuspendedStart,
    /// Parked at a yield.
    SuspendedYield,
    /// A driver invocation is on the host stack right now.
    Executing,
    /// Async generator only: a final return value is being awaited.
    AwaitingReturn,
    Completed,
}

/// Hidden state of a generator instance.
pub struct GeneratorInstance {
    pub state: GeneratorState,
    /// Captured frame: exclusively owned by this instance for its lifetime.
    frame: Scope,
    def: Rc<FuncDef>,
    cont: Continuation,
}

pub type GenRef = Rc<RefCell<GeneratorInstance>>;

impl std::fmt::Debug for GeneratorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "GeneratorInstance({:?})", self.state)
    }
}

/// Create a suspended-at-start instance: capture the frame, run nothing.
pub fn instantiate(closure: &ClosureData, args: Vec<Val>) -> GenRef {
    let frame = Scope::function_frame(&closure.env, &closure.def.params, args);
    Rc::new(RefCell::new(GeneratorInstance {
        state: GeneratorState::SuspendedStart,
        frame,
        def: closure.def.clone(),
        cont: Continuation::new(),
    }))
}

/// The generator driver: one invocation per resumption request.
pub fn resume(realm: &Realm, gen: &GenRef, completion: Completion) -> Result<IterResult, Signal> {
    let state = gen.borrow().state;
    match state {
        GeneratorState::Executing => {
            return Err(Signal::type_error("generator is already running"))
        }
        GeneratorState::AwaitingReturn => {
            return Err(Signal::internal("sync generator in AwaitingReturn state"))
        }
        GeneratorState::Completed => {
            // Completed instances never re-enter the body.
            return match completion {
                Completion::Normal(_) => Ok(IterResult::done(Val::Undefined)),
                Completion::Return(v) => Ok(IterResult::done(v)),
                Completion::Throw(e) => Err(Signal::Throw(e)),
            };
        }
        GeneratorState::SuspendedStart if completion.is_abrupt() => {
            // An abrupt request before any yield finalizes immediately.
            gen.borrow_mut().state = GeneratorState::Completed;
            return match completion {
                Completion::Return(v) => Ok(IterResult::done(v)),
                Completion::Throw(e) => Err(Signal::Throw(e)),
                Completion::Normal(_) => unreachable!(),
            };
        }
        GeneratorState::SuspendedStart | GeneratorState::SuspendedYield => {}
    }

    // Move the run state out so the body can re-read the handle (e.g. to
    // detect reentrancy) without tripping the RefCell.
    let (frame, def, mut cont) = {
        let mut g = gen.borrow_mut();
        g.state = GeneratorState::Executing;
        (g.frame.clone(), g.def.clone(), std::mem::take(&mut g.cont))
    };
    debug!(resumed_at = cont.depth(), "generator driver entered");

    let outcome = eval::run_body(realm, &mut cont, &frame, &def.body, completion);

    let mut g = gen.borrow_mut();
    match outcome {
        BodyOutcome::Normal(_) => {
            g.state = GeneratorState::Completed;
            Ok(IterResult::done(Val::Undefined))
        }
        BodyOutcome::Return(v) => {
            g.state = GeneratorState::Completed;
            Ok(IterResult::done(v))
        }
        BodyOutcome::Throw(e) => {
            // Permanent: later next() calls see the completed fast path.
            g.state = GeneratorState::Completed;
            Err(Signal::Throw(e))
        }
        BodyOutcome::Yielded(r) => {
            g.cont = cont;
            g.state = GeneratorState::SuspendedYield;
            Ok(r)
        }
        BodyOutcome::Awaiting(_) => {
            g.state = GeneratorState::Completed;
            Err(Signal::type_error("await inside a sync generator"))
        }
        BodyOutcome::Interrupted => {
            g.state = GeneratorState::Completed;
            Err(Signal::Interrupt)
        }
    }
}
