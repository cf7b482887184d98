pub mod interpreter;
pub mod promise;
pub mod realm;

// Re-export the surface hosts embed against.
pub use interpreter::{run_program, run_program_in, Completion, Signal, StrandError, Val};
pub use promise::{Capability, PromiseRef, PromiseState};
pub use realm::{Realm, RealmConfig};
