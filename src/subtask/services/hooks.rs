//! Per-operation side-effect hooks and the registry binding them to the
//! transition table.

use super::{
    AuthorizedActor, TransitionError,
    executor::{AppliedStep, StepRequest, execute},
};
use crate::subtask::{
    domain::{
        ActorSnapshot, AssignmentRule, ExecutorChange, NotificationKind, Operation,
        ReportPayload, SubTask, SubTaskId, SubTaskReport, SubTaskStatus, TableAudit, TaskId,
        TaskType, TransitionTable,
    },
    hooks::{
        CompositeHook, ConstructionDependencyHook, CustomerCancellationHook, NotificationHook,
    },
    ports::{SubTaskStoreError, SubTaskTransaction},
};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by transition hooks.
#[derive(Debug, Error)]
pub enum HookError {
    /// A nested transition performed by the hook failed.
    #[error("cascaded transition failed: {0}")]
    Cascade(Box<TransitionError>),

    /// The hook could not read or write through the transaction.
    #[error(transparent)]
    Store(#[from] SubTaskStoreError),

    /// The parent task of the sub-task is missing.
    #[error("parent task not found: {0}")]
    MissingTask(TaskId),

    /// The hook has no behaviour for the parent task's type.
    #[error("{hook} does not support {task_type} tasks")]
    UnsupportedTaskType {
        /// Hook name.
        hook: &'static str,
        /// Parent task type code.
        task_type: TaskType,
    },

    /// A notification template failed to render.
    #[error("notification template failed to render: {0}")]
    Render(String),

    /// The hook refused the transition.
    #[error("hook rejected the transition: {0}")]
    Rejected(String),
}

/// Everything a hook sees of the committed-to-be transition.
pub struct HookContext<'a> {
    tx: &'a mut dyn SubTaskTransaction,
    label: &'a str,
    from: SubTaskStatus,
    sub_task: &'a SubTask,
    report: &'a SubTaskReport,
    actor: &'a ActorSnapshot,
    at: DateTime<Utc>,
    now: DateTime<Utc>,
}

impl<'a> HookContext<'a> {
    pub(crate) fn new(
        tx: &'a mut dyn SubTaskTransaction,
        label: &'a str,
        applied: &'a AppliedStep,
        actor: &'a ActorSnapshot,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            tx,
            label,
            from: applied.from,
            sub_task: &applied.sub_task,
            report: &applied.report,
            actor,
            at: applied.report.at,
            now,
        }
    }

    /// Returns the open transaction.
    pub fn tx(&mut self) -> &mut dyn SubTaskTransaction {
        &mut *self.tx
    }

    /// Returns the operation label of the transition.
    #[must_use]
    pub const fn label(&self) -> &str {
        self.label
    }

    /// Returns the status the sub-task left.
    #[must_use]
    pub const fn from_status(&self) -> SubTaskStatus {
        self.from
    }

    /// Returns the sub-task as updated by the transition.
    #[must_use]
    pub const fn sub_task(&self) -> &SubTask {
        self.sub_task
    }

    /// Returns the report filed with the transition.
    #[must_use]
    pub const fn report(&self) -> &SubTaskReport {
        self.report
    }

    /// Returns the actor identity recorded for the transition.
    #[must_use]
    pub const fn actor(&self) -> &ActorSnapshot {
        self.actor
    }

    /// Returns the business timestamp of the transition.
    #[must_use]
    pub const fn at(&self) -> DateTime<Utc> {
        self.at
    }

    /// Returns the wall-clock time of the write.
    #[must_use]
    pub const fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// Performs a nested transition on another sub-task as the system,
    /// inside the same transaction, without authorization or hooks.
    ///
    /// # Errors
    ///
    /// Returns [`HookError::Cascade`] when the nested transition fails.
    pub fn cascade(
        &mut self,
        sub_task_id: SubTaskId,
        operation: Operation,
        payload: ReportPayload,
    ) -> Result<SubTask, HookError> {
        let rule = operation.rule();
        let executor = match rule.assignment {
            AssignmentRule::Clear => ExecutorChange::Clear,
            AssignmentRule::Keep | AssignmentRule::Actor | AssignmentRule::Requested => {
                ExecutorChange::Keep
            }
        };
        let request = StepRequest {
            sub_task_id,
            label: operation.label().to_owned(),
            allowed_sources: rule.allowed_sources,
            target: rule.target,
            payload,
            actor: AuthorizedActor::system(),
            executor,
            at: self.at,
            now: self.now,
        };
        execute(&mut *self.tx, &request)
            .map(|applied| applied.sub_task)
            .map_err(|err| HookError::Cascade(Box::new(err)))
    }
}

/// Side effect run inside the transition transaction after the core writes.
///
/// Returning an error rolls the whole transition back.
pub trait TransitionHook: Send + Sync + fmt::Debug {
    /// Returns a stable name used in logs.
    fn name(&self) -> &'static str;

    /// Applies the side effect.
    ///
    /// # Errors
    ///
    /// Returns [`HookError`] to abort the transition.
    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError>;
}

/// Transition table plus the hooks bound to its operations.
#[derive(Debug, Clone)]
pub struct TransitionRegistry {
    table: TransitionTable,
    hooks: HashMap<Operation, Arc<dyn TransitionHook>>,
}

impl TransitionRegistry {
    /// Creates a registry over `table` with no hooks bound.
    #[must_use]
    pub fn new(table: TransitionTable) -> Self {
        Self {
            table,
            hooks: HashMap::new(),
        }
    }

    /// Creates the standard registry: the full operation catalogue with the
    /// built-in construction, cancellation and notification hooks.
    #[must_use]
    pub fn standard() -> Self {
        let construction: Arc<dyn TransitionHook> = Arc::new(ConstructionDependencyHook);
        let assigned: Arc<dyn TransitionHook> =
            Arc::new(NotificationHook::new(NotificationKind::SubTaskAssigned));
        Self::new(TransitionTable::standard())
            .with_hook(Operation::Pick, Arc::clone(&construction))
            .with_hook(
                Operation::AdminAssign,
                Arc::new(CompositeHook::new(vec![
                    Arc::clone(&construction),
                    Arc::clone(&assigned),
                ])),
            )
            .with_hook(Operation::AdminReplaceFieldExecutor, assigned)
            .with_hook(Operation::WorkingFinish, Arc::clone(&construction))
            .with_hook(Operation::ReworkingFinish, Arc::clone(&construction))
            .with_hook(Operation::FixingFinish, Arc::clone(&construction))
            .with_hook(
                Operation::VerifyFail,
                Arc::new(NotificationHook::new(NotificationKind::VerificationFailed)),
            )
            .with_hook(Operation::CgpVerifySuccess, Arc::clone(&construction))
            .with_hook(Operation::CgpEditAfterVerifySuccess, construction)
            .with_hook(
                Operation::CgpVerifyFail,
                Arc::new(NotificationHook::new(NotificationKind::CgpVerificationFailed)),
            )
            .with_hook(Operation::CancelByCustomer, Arc::new(CustomerCancellationHook))
    }

    /// Binds `hook` to `operation`, replacing any earlier binding.
    #[must_use]
    pub fn with_hook(mut self, operation: Operation, hook: Arc<dyn TransitionHook>) -> Self {
        self.hooks.insert(operation, hook);
        self
    }

    /// Returns the transition table.
    #[must_use]
    pub const fn table(&self) -> &TransitionTable {
        &self.table
    }

    /// Returns the hook bound to `operation`, if any.
    #[must_use]
    pub fn hook(&self, operation: Operation) -> Option<Arc<dyn TransitionHook>> {
        self.hooks.get(&operation).cloned()
    }

    /// Audits the table and reports hooks bound to undeclared operations.
    #[must_use]
    pub fn validate(&self) -> (TableAudit, Vec<Operation>) {
        let mut orphaned: Vec<Operation> = self
            .hooks
            .keys()
            .copied()
            .filter(|operation| self.table.rule(*operation).is_none())
            .collect();
        orphaned.sort_by_key(|operation| operation.to_string());
        (self.table.audit(), orphaned)
    }
}

impl Default for TransitionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
