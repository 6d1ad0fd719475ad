//! Transition specifications handed to the engine.

use super::TransitionHook;
use crate::subtask::{
    domain::{
        AssignmentRule, ReportPayload, RoleKind, SubTaskStatus, TaskType, TransitionRule,
        TransitionTarget, UserId,
    },
    ports::TransactionIsolation,
};
use std::sync::Arc;

/// Field executor change requested by a transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutorAssignment {
    /// Leave the field executor as is.
    #[default]
    Keep,
    /// The acting user becomes the field executor.
    Actor,
    /// The given user becomes the field executor.
    User(UserId),
    /// Remove the field executor.
    Clear,
}

/// Everything the engine needs to perform one transition.
///
/// Usually built from the transition table through
/// [`StateEngine::perform`](super::StateEngine::perform); callers may also
/// declare ad hoc transitions.
#[derive(Debug, Clone)]
pub struct TransitionSpec {
    pub(crate) label: String,
    pub(crate) allowed_sources: Vec<SubTaskStatus>,
    pub(crate) target: TransitionTarget,
    pub(crate) required_role: RoleKind,
    pub(crate) payload: ReportPayload,
    pub(crate) hook: Option<Arc<dyn TransitionHook>>,
    pub(crate) assignment: ExecutorAssignment,
    pub(crate) requires_form: bool,
    pub(crate) applies_to: Option<TaskType>,
    pub(crate) emit_response: bool,
    pub(crate) isolation: TransactionIsolation,
}

impl TransitionSpec {
    /// Creates a specification moving from any of `allowed_sources` to
    /// `target`.
    #[must_use]
    pub fn new(
        label: impl Into<String>,
        allowed_sources: impl IntoIterator<Item = SubTaskStatus>,
        target: SubTaskStatus,
        required_role: RoleKind,
    ) -> Self {
        Self {
            label: label.into(),
            allowed_sources: allowed_sources.into_iter().collect(),
            target: TransitionTarget::Status(target),
            required_role,
            payload: ReportPayload::default(),
            hook: None,
            assignment: ExecutorAssignment::Keep,
            requires_form: false,
            applies_to: None,
            emit_response: false,
            isolation: TransactionIsolation::ReadCommitted,
        }
    }

    /// Creates a specification from a transition table rule.
    ///
    /// Rules assigning a caller-named executor start with
    /// [`ExecutorAssignment::Keep`]; set the assignee with
    /// [`Self::with_assignment`].
    #[must_use]
    pub fn from_rule(rule: &TransitionRule) -> Self {
        let assignment = match rule.assignment {
            AssignmentRule::Keep | AssignmentRule::Requested => ExecutorAssignment::Keep,
            AssignmentRule::Actor => ExecutorAssignment::Actor,
            AssignmentRule::Clear => ExecutorAssignment::Clear,
        };
        Self {
            label: rule.operation.label().to_owned(),
            allowed_sources: rule.allowed_sources.clone(),
            target: rule.target,
            required_role: rule.required_role,
            payload: ReportPayload::default(),
            hook: None,
            assignment,
            requires_form: rule.requires_form,
            applies_to: rule.applies_to,
            emit_response: false,
            isolation: TransactionIsolation::ReadCommitted,
        }
    }

    /// Keeps the current status instead of entering a new one.
    #[must_use]
    pub const fn in_place(mut self) -> Self {
        self.target = TransitionTarget::Unchanged;
        self
    }

    /// Sets the report payload.
    #[must_use]
    pub fn with_payload(mut self, payload: ReportPayload) -> Self {
        self.payload = payload;
        self
    }

    /// Binds a hook run inside the transaction.
    #[must_use]
    pub fn with_hook(mut self, hook: Arc<dyn TransitionHook>) -> Self {
        self.hook = Some(hook);
        self
    }

    /// Sets the field executor change.
    #[must_use]
    pub const fn with_assignment(mut self, assignment: ExecutorAssignment) -> Self {
        self.assignment = assignment;
        self
    }

    /// Requires the payload to be the sub-task form.
    #[must_use]
    pub const fn requiring_form(mut self) -> Self {
        self.requires_form = true;
        self
    }

    /// Restricts the transition to sub-tasks of one task type.
    #[must_use]
    pub const fn only_for(mut self, task_type: TaskType) -> Self {
        self.applies_to = Some(task_type);
        self
    }

    /// Requests the response body on the outcome.
    #[must_use]
    pub const fn with_response(mut self, emit_response: bool) -> Self {
        self.emit_response = emit_response;
        self
    }

    /// Sets the transaction isolation level.
    #[must_use]
    pub const fn with_isolation(mut self, isolation: TransactionIsolation) -> Self {
        self.isolation = isolation;
        self
    }

    /// Returns the operation label.
    #[must_use]
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Returns the allowed source statuses.
    #[must_use]
    pub fn allowed_sources(&self) -> &[SubTaskStatus] {
        &self.allowed_sources
    }

    /// Returns the target.
    #[must_use]
    pub const fn target(&self) -> TransitionTarget {
        self.target
    }

    /// Returns the required role kind.
    #[must_use]
    pub const fn required_role(&self) -> RoleKind {
        self.required_role
    }

    /// Returns the field executor change.
    #[must_use]
    pub const fn assignment(&self) -> ExecutorAssignment {
        self.assignment
    }
}
