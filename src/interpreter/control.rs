//! Control flow signals and completions
//!
//! Non-local transfers (break/continue/return/throw/suspend) are threaded
//! through every evaluate/resume call as the `Err` arm of a `Result`. A
//! construct that is not the target of a signal re-raises it untouched, which
//! is what lets suspension signals pass through unrelated exception handlers.

use super::errors::ErrorInfo;
use super::value::{IterResult, Val};
use crate::promise::PromiseRef;

/// The classification fed into a resumed computation.
#[derive(Debug, Clone)]
pub enum Completion {
    Normal(Val),
    Throw(Val),
    Return(Val),
}

impl Completion {
    pub fn is_abrupt(&self) -> bool {
        !matches!(self, Completion::Normal(_))
    }
}

/// Why execution is unwinding toward the nearest driver.
#[derive(Debug, Clone)]
pub enum Suspend {
    /// A yield: the not-done result to hand to the resumer.
    Yield(IterResult),
    /// An await: the promise whose settlement re-enters the driver.
    Await(PromiseRef),
}

/// Active non-local transfer.
///
/// `Suspend` is never an error and must reach the nearest driver; a user
/// `catch` may only observe `Throw`. `Interrupt` is fatal and observable by
/// nothing below the driver.
#[derive(Debug, Clone)]
pub enum Signal {
    Suspend(Suspend),
    Break(Option<String>),
    Continue(Option<String>),
    Return(Val),
    Throw(Val),
    Interrupt,
}

impl Signal {
    pub fn type_error(message: impl Into<String>) -> Signal {
        Signal::Throw(Val::Error(ErrorInfo::type_error(message)))
    }

    pub fn internal(message: impl Into<String>) -> Signal {
        Signal::Throw(Val::Error(ErrorInfo::internal(message)))
    }

    pub fn is_suspend(&self) -> bool {
        matches!(self, Signal::Suspend(_))
    }
}

/// Does an unlabeled-or-matching break/continue bind to a construct carrying
/// `label`? Unlabeled signals bind to the nearest enclosing loop; labeled ones
/// only to the construct with that label.
pub fn label_matches(signal_label: &Option<String>, construct_label: &Option<String>) -> bool {
    match signal_label {
        None => true,
        Some(l) => construct_label.as_deref() == Some(l.as_str()),
    }
}

/// Expression evaluation outcome.
pub type Eval = Result<Val, Signal>;

/// Statement execution outcome.
pub type Exec = Result<(), Signal>;
