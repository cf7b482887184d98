pub mod ast;
pub mod async_fn;
pub mod async_gen;
pub mod control;
pub mod dispatch;
pub mod errors;
pub mod eval;
pub mod frame;
pub mod generator;
pub mod iterator;
pub mod position;
pub mod value;

#[cfg(test)]
mod tests;

pub use ast::{Expr, FuncDef, FuncKind, Stmt};
pub use control::{Completion, Signal};
pub use errors::{ErrorInfo, StrandError};
pub use frame::Scope;
pub use generator::GeneratorState;
pub use value::{IterResult, Val};

use tracing::debug;

use crate::realm::Realm;
use eval::BodyOutcome;
use position::Continuation;

/// Run a program in a fresh realm with an empty global scope, then drain the
/// realm's job queue. Convenience wrapper over [`run_program_in`].
pub fn run_program(program: &[Stmt]) -> Result<Val, StrandError> {
    let realm = Realm::new();
    let globals = Scope::root();
    run_program_in(&realm, &globals, program)
}

/// Run top-level statements against an existing realm and global scope.
///
/// Top-level code cannot suspend: a `yield` or `await` escaping the program
/// body is a host error, not a throw the program can catch. After the
/// synchronous portion finishes, queued jobs (promise reactions) are drained
/// before returning, so driver completions observable through natives have
/// already happened.
pub fn run_program_in(realm: &Realm, globals: &Scope, program: &[Stmt]) -> Result<Val, StrandError> {
    let mut cont = Continuation::new();
    let outcome = eval::run_body(
        realm,
        &mut cont,
        globals,
        program,
        Completion::Normal(Val::Undefined),
    );
    let value = match outcome {
        BodyOutcome::Normal(v) | BodyOutcome::Return(v) => v,
        BodyOutcome::Throw(e) => {
            debug!(%e, "program completed with an uncaught throw");
            return Err(StrandError::UnhandledException(e.to_string()));
        }
        BodyOutcome::Yielded(_) | BodyOutcome::Awaiting(_) => {
            return Err(StrandError::SuspendOutsideFunction);
        }
        BodyOutcome::Interrupted => return Err(StrandError::Interrupted),
    };
    realm.run_jobs();
    if realm.is_interrupted() {
        return Err(StrandError::Interrupted);
    }
    Ok(value)
}
