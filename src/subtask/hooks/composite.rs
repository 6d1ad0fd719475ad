//! Binding several hooks to one operation.

use crate::subtask::services::{HookContext, HookError, TransitionHook};
use std::sync::Arc;

/// Runs hooks in order, stopping at the first failure.
#[derive(Debug, Clone, Default)]
pub struct CompositeHook {
    hooks: Vec<Arc<dyn TransitionHook>>,
}

impl CompositeHook {
    /// Creates a composite of `hooks`.
    #[must_use]
    pub const fn new(hooks: Vec<Arc<dyn TransitionHook>>) -> Self {
        Self { hooks }
    }
}

impl TransitionHook for CompositeHook {
    fn name(&self) -> &'static str {
        "composite"
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        self.hooks.iter().try_for_each(|hook| hook.apply(ctx))
    }
}
