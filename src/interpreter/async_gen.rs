//! Async-generator instances: request queue and dispatcher
//!
//! Every next/throw/return against an instance becomes a queued request with
//! its own result promise. The dispatcher services requests strictly in
//! arrival order, exactly one in flight per pass: it validates state, feeds
//! the head request's completion to the driver, and is re-triggered whenever
//! the head request settles. An abrupt return always lets an in-flight await
//! finish before teardown.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use tracing::{debug, trace};

use super::ast::FuncDef;
use super::control::Completion;
use super::errors::ErrorInfo;
use super::eval::{self, BodyOutcome};
use super::frame::Scope;
use super::generator::GeneratorState;
use super::position::Continuation;
use super::value::{ClosureData, IterResult, Val};
use crate::promise::{self, Capability, PromiseRef};
use crate::realm::Realm;

/// One pending next/throw/return request.
pub struct AsyncGeneratorRequest {
    pub completion: Completion,
    pub cap: Capability,
}

pub struct AsyncGeneratorInstance {
    pub state: GeneratorState,
    frame: Scope,
    def: Rc<FuncDef>,
    cont: Continuation,
    queue: VecDeque<AsyncGeneratorRequest>,
}

pub type AsyncGenRef = Rc<RefCell<AsyncGeneratorInstance>>;

impl std::fmt::Debug for AsyncGeneratorInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "AsyncGeneratorInstance({:?}, queue={})",
            self.state,
            self.queue.len()
        )
    }
}

pub fn instantiate(closure: &ClosureData, args: Vec<Val>) -> AsyncGenRef {
    let frame = Scope::function_frame(&closure.env, &closure.def.params, args);
    Rc::new(RefCell::new(AsyncGeneratorInstance {
        state: GeneratorState::SuspendedStart,
        frame,
        def: closure.def.clone(),
        cont: Continuation::new(),
        queue: VecDeque::new(),
    }))
}

/// Queue a request and kick the dispatcher. Returns the request's promise.
pub fn enqueue(realm: &Realm, agen: &AsyncGenRef, completion: Completion) -> PromiseRef {
    let cap = Capability::new();
    let result = cap.promise.clone();
    agen.borrow_mut()
        .queue
        .push_back(AsyncGeneratorRequest { completion, cap });
    trace!(queued = agen.borrow().queue.len(), "async generator request queued");
    drain(realm, agen);
    result
}

/// Dispatch loop: run whenever the instance is not mid-execution and the
/// queue is non-empty. Each pass services at most the head request.
fn drain(realm: &Realm, agen: &AsyncGenRef) {
    loop {
        let state = agen.borrow().state;
        // Executing: a driver pass is on the stack or parked on an await.
        // AwaitingReturn: a final return value is settling; wait for it.
        if state == GeneratorState::Executing || state == GeneratorState::AwaitingReturn {
            return;
        }
        let completion = match agen.borrow().queue.front() {
            Some(head) => head.completion.clone(),
            None => return,
        };

        match (state, completion) {
            // An abrupt request before any yield finalizes immediately; the
            // request is then serviced against the completed instance.
            (GeneratorState::SuspendedStart, c) if c.is_abrupt() => {
                agen.borrow_mut().state = GeneratorState::Completed;
            }
            (GeneratorState::Completed, Completion::Return(v)) => {
                agen.borrow_mut().state = GeneratorState::AwaitingReturn;
                await_return(realm, agen, v);
                return;
            }
            (GeneratorState::Completed, Completion::Throw(e)) => {
                settle_head(realm, agen, Err(e));
            }
            (GeneratorState::Completed, Completion::Normal(_)) => {
                settle_head(realm, agen, Ok(IterResult::done(Val::Undefined).to_val()));
            }
            (_, completion) => {
                agen.borrow_mut().state = GeneratorState::Executing;
                step(realm, agen, completion);
            }
        }
    }
}

/// Completed + return(v): adopt v's settlement before resolving the request.
fn await_return(realm: &Realm, agen: &AsyncGenRef, v: Val) {
    let p = promise::resolve_val(realm, v);
    let on_ok = {
        let agen = agen.clone();
        move |realm: &Realm, v: Val| {
            agen.borrow_mut().state = GeneratorState::Completed;
            settle_head(realm, &agen, Ok(IterResult::done(v).to_val()));
            drain(realm, &agen);
        }
    };
    let on_err = {
        let agen = agen.clone();
        move |realm: &Realm, e: Val| {
            agen.borrow_mut().state = GeneratorState::Completed;
            settle_head(realm, &agen, Err(e));
            drain(realm, &agen);
        }
    };
    promise::then(realm, &p, on_ok, on_err);
}

/// One driver invocation against the head request's completion.
fn step(realm: &Realm, agen: &AsyncGenRef, completion: Completion) {
    let (frame, def, mut cont) = {
        let mut g = agen.borrow_mut();
        (g.frame.clone(), g.def.clone(), std::mem::take(&mut g.cont))
    };
    debug!(resumed_at = cont.depth(), "async generator driver entered");

    let outcome = eval::run_body(realm, &mut cont, &frame, &def.body, completion);

    match outcome {
        BodyOutcome::Yielded(r) => {
            {
                let mut g = agen.borrow_mut();
                g.cont = cont;
                g.state = GeneratorState::SuspendedYield;
            }
            settle_head(realm, agen, Ok(r.to_val()));
            drain(realm, agen);
        }
        BodyOutcome::Normal(_) => settle_completed(realm, agen, Ok(Val::Undefined)),
        BodyOutcome::Return(v) => settle_completed(realm, agen, Ok(v)),
        BodyOutcome::Throw(e) => settle_completed(realm, agen, Err(e)),
        BodyOutcome::Awaiting(p) => {
            // Still Executing: the only way back in is the settlement below.
            agen.borrow_mut().cont = cont;
            let on_ok = {
                let agen = agen.clone();
                move |realm: &Realm, v: Val| step(realm, &agen, Completion::Normal(v))
            };
            let on_err = {
                let agen = agen.clone();
                move |realm: &Realm, e: Val| step(realm, &agen, Completion::Throw(e))
            };
            promise::then(realm, &p, on_ok, on_err);
        }
        BodyOutcome::Interrupted => settle_completed(
            realm,
            agen,
            Err(Val::Error(ErrorInfo::new(
                "InterruptError",
                "execution interrupted",
            ))),
        ),
    }
}

/// Final transition: mark Completed, settle the head request, keep draining.
fn settle_completed(realm: &Realm, agen: &AsyncGenRef, result: Result<Val, Val>) {
    agen.borrow_mut().state = GeneratorState::Completed;
    let iter_result = result.map(|v| IterResult::done(v).to_val());
    settle_head(realm, agen, iter_result);
    drain(realm, agen);
}

/// Pop the head request and settle its promise. The dispatcher only services
/// non-empty queues, so an empty pop means the queue was corrupted.
fn settle_head(realm: &Realm, agen: &AsyncGenRef, result: Result<Val, Val>) {
    let req = agen.borrow_mut().queue.pop_front();
    let Some(req) = req else {
        debug!("async generator settled with no queued request");
        return;
    };
    match result {
        Ok(v) => req.cap.resolve(realm, v),
        Err(e) => req.cap.reject(realm, e),
    }
}
