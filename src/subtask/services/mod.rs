//! Application services for the sub-task lifecycle.

mod engine;
mod error;
mod executor;
mod hooks;
mod policy;
mod precondition;
mod response;
mod transition;

pub use engine::{
    CancelAndRequeueOutcome, EngineSettings, StateEngine, TransitionOutcome, TransitionResult,
};
pub use error::{AuthorizationError, StateConflictError, TransitionError, TransitionErrorKind};
pub use hooks::{HookContext, HookError, TransitionHook, TransitionRegistry};
pub use policy::{AuthorizationPolicy, AuthorizedActor};
pub use precondition::{ensure_allowed, ensure_declared};
pub use response::{failure_body, success_body};
pub use transition::{ExecutorAssignment, TransitionSpec};
