//! Built-in transition hooks.
//!
//! Hooks run inside the transition transaction after the core writes. They
//! reach other rows only through the transaction, and nested transitions
//! only through [`HookContext::cascade`](crate::subtask::services::HookContext::cascade),
//! so history stays chained for every sub-task they touch.

mod cancellation;
mod composite;
mod construction;
mod notification;

pub use cancellation::CustomerCancellationHook;
pub use composite::CompositeHook;
pub use construction::ConstructionDependencyHook;
pub use notification::NotificationHook;
