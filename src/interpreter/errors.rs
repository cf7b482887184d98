//! Error types
//!
//! Two layers: `ErrorInfo` is the payload of values thrown *inside* interpreted
//! programs (it travels through `Signal::Throw` and can be caught by user
//! `try`/`catch`), while `StrandError` is the host-facing error enum returned
//! at the API boundary.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload of a runtime-raised or user-thrown error value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Error class name ("TypeError", "RangeError", ...)
    pub name: String,
    pub message: String,
}

impl ErrorInfo {
    pub fn new(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            message: message.into(),
        }
    }

    pub fn type_error(message: impl Into<String>) -> Self {
        Self::new("TypeError", message)
    }

    /// Internal invariant violations (resume desynchronization and the like).
    /// These indicate a bug in the core, not in the interpreted program.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new("InternalError", message)
    }
}

impl std::fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.name, self.message)
    }
}

/// Host-facing errors from the top-level entry points.
#[derive(Debug, Error)]
pub enum StrandError {
    /// The program completed abruptly with an uncaught throw.
    #[error("unhandled exception: {0}")]
    UnhandledException(String),

    /// A yield or await escaped to a context that cannot suspend.
    #[error("cannot suspend outside of a generator or async function")]
    SuspendOutsideFunction,

    /// The realm's interrupt flag was raised while the program ran.
    #[error("program was interrupted")]
    Interrupted,
}
