//! Re-entrant evaluation of function bodies
//!
//! `run_body` is the single entry used by every driver: it executes a body
//! from the top, or, when the continuation record holds saved positions,
//! descends along them to the previous suspension point, injects the
//! incoming completion there, and continues live from that point on.

pub mod delegate;
pub mod expressions;
pub mod statements;

use super::control::{Completion, Signal, Suspend};
use super::errors::ErrorInfo;
use super::frame::Scope;
use super::position::{Continuation, Position};
use super::value::{IterResult, Val};
use crate::promise::PromiseRef;
use crate::realm::Realm;

/// Evaluation context for one driver invocation.
pub struct Activation<'a> {
    pub realm: &'a Realm,
    cont: &'a mut Continuation,
    resuming: bool,
}

impl<'a> Activation<'a> {
    pub fn new(realm: &'a Realm, cont: &'a mut Continuation) -> Self {
        let resuming = cont.has_saved();
        Activation {
            realm,
            cont,
            resuming,
        }
    }

    /// Are we still descending toward the previous suspension point?
    pub fn is_resuming(&self) -> bool {
        self.resuming
    }

    /// Pop the saved position for the construct being entered. Returns `None`
    /// when running live. Positions are cleared on read: a second suspension
    /// saves fresh ones.
    pub fn take_position(&mut self) -> Result<Option<Position>, Signal> {
        if !self.resuming {
            return Ok(None);
        }
        match self.cont.pop() {
            Some(pos) => Ok(Some(pos)),
            None => Err(Signal::internal(
                "resume descent ran past the saved suspension point",
            )),
        }
    }

    /// Consume the injected completion at the suspension point itself.
    /// Switches the activation back to live execution.
    pub fn take_pending(&mut self) -> Result<Completion, Signal> {
        self.resuming = false;
        self.cont
            .take_pending()
            .ok_or_else(|| Signal::internal("no completion to deliver at the suspension point"))
    }

    /// If `sig` is a suspension, record this construct's position so a later
    /// resume can descend back through it; all other signals pass unchanged.
    pub fn save(&mut self, sig: Signal, pos: impl FnOnce() -> Position) -> Signal {
        if sig.is_suspend() {
            self.cont.push(pos());
        }
        sig
    }

    /// Raise a yield suspension from this exact point.
    pub fn suspend_yield(&mut self, value: Val) -> Signal {
        self.cont.push(Position::Yield);
        Signal::Suspend(Suspend::Yield(IterResult::next(value)))
    }

    /// Raise an await suspension from this exact point.
    pub fn suspend_await(&mut self, promise: PromiseRef) -> Signal {
        self.cont.push(Position::Await);
        Signal::Suspend(Suspend::Await(promise))
    }

    pub fn position_depth(&self) -> usize {
        self.cont.depth()
    }

    pub fn truncate_positions(&mut self, depth: usize) {
        self.cont.truncate(depth);
    }

    pub fn push_position(&mut self, pos: Position) {
        self.cont.push(pos);
    }
}

/// How one driver invocation of a body ended.
#[derive(Debug)]
pub enum BodyOutcome {
    /// Ran off the end of the body.
    Normal(Val),
    Return(Val),
    Throw(Val),
    /// Suspended at a yield; the continuation record holds the resume path.
    Yielded(IterResult),
    /// Suspended at an await on this promise.
    Awaiting(PromiseRef),
    Interrupted,
}

/// Run (or resume) a function body against its captured frame.
///
/// When `cont` holds saved positions this is a resumption and `completion`
/// is injected at the suspension point; otherwise the body starts fresh and
/// `completion` is ignored apart from its Normal payload being discarded.
pub fn run_body(
    realm: &Realm,
    cont: &mut Continuation,
    frame: &Scope,
    body: &[super::ast::Stmt],
    completion: Completion,
) -> BodyOutcome {
    if cont.has_saved() {
        cont.set_pending(completion);
    }
    let mut cx = Activation::new(realm, cont);
    match statements::exec_stmt_list(&mut cx, frame, body) {
        Ok(()) => BodyOutcome::Normal(Val::Undefined),
        Err(Signal::Return(v)) => BodyOutcome::Return(v),
        Err(Signal::Throw(v)) => BodyOutcome::Throw(v),
        Err(Signal::Suspend(Suspend::Yield(r))) => BodyOutcome::Yielded(r),
        Err(Signal::Suspend(Suspend::Await(p))) => BodyOutcome::Awaiting(p),
        Err(Signal::Interrupt) => BodyOutcome::Interrupted,
        Err(Signal::Break(_)) | Err(Signal::Continue(_)) => BodyOutcome::Throw(Val::Error(
            ErrorInfo::new("SyntaxError", "break or continue outside of a loop"),
        )),
    }
}
