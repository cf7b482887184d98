//! Saved positions and the per-activation continuation record
//!
//! Each suspend-capable construct has a position variant recording which
//! micro-step it was in when a suspension passed through, plus whatever
//! in-flight state (operand values, iteration scopes, iterator handles) is
//! needed to continue without redoing completed work.
//!
//! Positions live on an explicit per-activation `Continuation` owned by the
//! suspended instance: as a suspension signal unwinds, each construct pushes
//! its position (innermost first); as a resume descends, each construct pops
//! its position back off (outermost first). A position is valid for exactly
//! one outstanding suspension and is cleared on read.

use super::control::{Completion, Signal};
use super::frame::Scope;
use super::iterator::IterTarget;
use super::value::Val;

/// Phase of a classic three-part loop.
#[derive(Debug, Clone)]
pub enum ForPhase {
    /// Evaluating the declaration initializers; index of the one in flight.
    Init(usize),
    Test,
    Body,
    /// Running the update assignments; index of the one in flight.
    Update(usize),
}

/// Phase of a for-of / for-await-of loop.
#[derive(Debug, Clone)]
pub enum ForOfPhase {
    /// Awaiting the promise returned by an async iterator's next().
    AwaitNext,
    /// Awaiting a produced value (for-await over a sync iterator).
    AwaitValue,
    Body,
}

/// Where inside a try statement the suspension passed through.
#[derive(Debug, Clone)]
pub enum TryPos {
    /// Inside the protected block: the signal passed through untouched and
    /// only this routing marker is kept.
    Block,
    /// Inside the handler; its scope (with the caught value bound) is saved
    /// so re-entry continues inside the handler.
    Catch { scope: Scope },
    /// Inside the finalizer; the pending outcome (if the block completed
    /// abruptly) is re-applied once the finalizer finishes.
    Finally { pending: Option<Box<Signal>> },
}

/// Saved position of one construct instance.
#[derive(Debug, Clone)]
pub enum Position {
    /// Statement list: index of the in-flight statement plus the list scope.
    Seq { idx: usize, scope: Scope },
    /// Conditional: suspension inside the test expression.
    IfTest,
    /// Conditional: suspension inside the chosen branch.
    IfArm { then_branch: bool },
    While { in_body: bool },
    For { phase: ForPhase, scope: Scope },
    ForOf {
        phase: ForOfPhase,
        iter: IterTarget,
        scope: Scope,
    },
    /// Suspension while evaluating the for-of iterable expression.
    ForOfIterable,
    /// Post-selection statements of a switch, sequence discipline with
    /// fallthrough: (clause, statement) indices plus the switch scope.
    Switch {
        case_idx: usize,
        stmt_idx: usize,
        scope: Scope,
    },
    Try(TryPos),
    /// Binary operator: left operand value if it already completed.
    Binary { left: Option<Val> },
    /// Logical operator: whether the left operand already completed.
    Logical { left_done: bool },
    /// Call: callee value (if completed) and the evaluated argument prefix.
    Call {
        callee: Option<Val>,
        done: Vec<Val>,
    },
    /// List literal: evaluated element prefix.
    List { done: Vec<Val> },
    /// Object literal: evaluated entry prefix.
    ObjLit { done: Vec<(String, Val)> },
    /// Suspension inside a yield operand.
    YieldOperand,
    /// Suspended at this yield; the injected completion is consumed here.
    Yield,
    /// Suspension inside an await operand.
    AwaitOperand,
    /// Suspended at this await.
    Await,
    /// Suspension inside the yield* operand expression.
    DelegateOperand,
    /// Suspended mid-delegation: the inner iterator being delegated to.
    Delegate { iter: IterTarget },
}

/// Per-activation continuation record: the stack of saved positions for one
/// outstanding suspension, plus the completion to inject at the suspension
/// point on the next resume.
#[derive(Debug, Default)]
pub struct Continuation {
    stack: Vec<Position>,
    pending: Option<Completion>,
}

impl Continuation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_saved(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    pub fn push(&mut self, pos: Position) {
        self.stack.push(pos);
    }

    pub fn pop(&mut self) -> Option<Position> {
        self.stack.pop()
    }

    /// Discard positions pushed past a recorded depth. Used when a suspension
    /// must be converted into an error (e.g. inside switch case selection).
    pub fn truncate(&mut self, depth: usize) {
        self.stack.truncate(depth);
    }

    pub fn set_pending(&mut self, completion: Completion) {
        self.pending = Some(completion);
    }

    pub fn take_pending(&mut self) -> Option<Completion> {
        self.pending.take()
    }
}
