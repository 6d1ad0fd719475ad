//! The state engine: the only way a sub-task status changes.

use super::{
    AuthorizationError, AuthorizationPolicy, ExecutorAssignment, HookContext, TransitionError,
    TransitionRegistry, TransitionSpec,
    executor::{StepRequest, execute},
    precondition::ensure_declared,
    response::success_body,
};
use crate::subtask::{
    domain::{
        ActivityReport, Actor, AssignmentRule, ExecutorChange, Notification, Operation,
        ReportPayload, RoleKind, SubTask, SubTaskDomainError, SubTaskHistoryItem, SubTaskId,
        SubTaskLookup, SubTaskReport, SubTaskReportId, SubTaskReportUid, SubTaskUid, UserId,
    },
    ports::{AuthorizationDirectory, SubTaskStore, TransactionIsolation},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Result type for state engine operations.
pub type TransitionResult<T> = Result<T, TransitionError>;

/// Engine behaviour switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineSettings {
    /// Run pick transitions under serializable isolation.
    pub serializable_pick: bool,
}

/// Result of a committed transition.
#[derive(Debug, Clone, PartialEq)]
pub struct TransitionOutcome {
    /// Sub-task as committed, including hook effects.
    pub sub_task: SubTask,
    /// Row id of the new report.
    pub report_id: SubTaskReportId,
    /// Public id of the new report.
    pub report_uid: SubTaskReportUid,
    /// Response body, when requested.
    pub response: Option<Value>,
}

/// Outcomes of a field executor cancellation followed by its requeue.
#[derive(Debug, Clone, PartialEq)]
pub struct CancelAndRequeueOutcome {
    /// The committed cancellation.
    pub canceled: TransitionOutcome,
    /// The committed requeue.
    pub requeued: TransitionOutcome,
}

/// Validates, authorizes, and atomically applies sub-task transitions.
#[derive(Clone)]
pub struct StateEngine<S, D, C>
where
    S: SubTaskStore,
    D: AuthorizationDirectory,
    C: Clock + Send + Sync,
{
    store: Arc<S>,
    policy: AuthorizationPolicy<D>,
    registry: Arc<TransitionRegistry>,
    clock: Arc<C>,
    settings: EngineSettings,
}

impl<S, D, C> StateEngine<S, D, C>
where
    S: SubTaskStore,
    D: AuthorizationDirectory,
    C: Clock + Send + Sync,
{
    /// Creates an engine over the standard transition registry.
    #[must_use]
    pub fn new(store: Arc<S>, directory: Arc<D>, clock: Arc<C>) -> Self {
        Self {
            store,
            policy: AuthorizationPolicy::new(directory),
            registry: Arc::new(TransitionRegistry::standard()),
            clock,
            settings: EngineSettings::default(),
        }
    }

    /// Replaces the transition registry.
    #[must_use]
    pub fn with_registry(mut self, registry: TransitionRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    /// Replaces the engine settings.
    #[must_use]
    pub const fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Returns the transition registry.
    #[must_use]
    pub fn registry(&self) -> &TransitionRegistry {
        &self.registry
    }

    /// Applies `spec` to the sub-task with row id `sub_task_id`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`]; on any error nothing was written.
    pub async fn apply_transition(
        &self,
        sub_task_id: SubTaskId,
        actor: Actor,
        at: DateTime<Utc>,
        spec: TransitionSpec,
    ) -> TransitionResult<TransitionOutcome> {
        self.apply(SubTaskLookup::Id(sub_task_id), actor, at, spec)
            .await
    }

    /// Applies `spec` to the sub-task with public id `sub_task_uid`.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError`]; on any error nothing was written.
    pub async fn apply_transition_by_uid(
        &self,
        sub_task_uid: SubTaskUid,
        actor: Actor,
        at: DateTime<Utc>,
        spec: TransitionSpec,
    ) -> TransitionResult<TransitionOutcome> {
        self.apply(SubTaskLookup::Uid(sub_task_uid), actor, at, spec)
            .await
    }

    /// Builds the specification of a catalogued operation, including its
    /// bound hook and configured isolation.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskDomainError::UnknownOperation`] when the registry's
    /// table does not declare the operation.
    pub fn spec_for(&self, operation: Operation) -> TransitionResult<TransitionSpec> {
        let rule = self
            .registry
            .table()
            .rule(operation)
            .ok_or_else(|| SubTaskDomainError::UnknownOperation(operation.to_string()))?;
        let mut spec = TransitionSpec::from_rule(rule);
        if let Some(hook) = self.registry.hook(operation) {
            spec = spec.with_hook(hook);
        }
        if operation == Operation::Pick && self.settings.serializable_pick {
            spec = spec.with_isolation(TransactionIsolation::Serializable);
        }
        Ok(spec)
    }

    /// Performs a catalogued operation with the given payload.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskDomainError::AssigneeRequired`] for operations that
    /// assign a caller-named field executor; use
    /// [`Self::assign_to_field_executor`] or
    /// [`Self::replace_field_executor`] for those. Otherwise as
    /// [`Self::apply_transition`].
    pub async fn perform(
        &self,
        sub_task_id: SubTaskId,
        actor: Actor,
        at: DateTime<Utc>,
        operation: Operation,
        payload: ReportPayload,
    ) -> TransitionResult<TransitionOutcome> {
        if operation.rule().assignment == AssignmentRule::Requested {
            return Err(SubTaskDomainError::AssigneeRequired(operation.to_string()).into());
        }
        let spec = self
            .spec_for(operation)?
            .with_payload(payload)
            .with_response(true);
        self.apply_transition(sub_task_id, actor, at, spec).await
    }

    /// Assigns an open sub-task to `field_executor` on an administrator's
    /// behalf.
    ///
    /// # Errors
    ///
    /// As [`Self::apply_transition`], plus
    /// [`AuthorizationError::AssigneeNotFieldExecutor`].
    pub async fn assign_to_field_executor(
        &self,
        sub_task_id: SubTaskId,
        admin: UserId,
        at: DateTime<Utc>,
        field_executor: UserId,
        payload: ReportPayload,
    ) -> TransitionResult<TransitionOutcome> {
        self.assign(sub_task_id, admin, at, Operation::AdminAssign, field_executor, payload)
            .await
    }

    /// Hands an owned sub-task to another field executor without changing
    /// its status.
    ///
    /// # Errors
    ///
    /// As [`Self::assign_to_field_executor`].
    pub async fn replace_field_executor(
        &self,
        sub_task_id: SubTaskId,
        admin: UserId,
        at: DateTime<Utc>,
        field_executor: UserId,
        payload: ReportPayload,
    ) -> TransitionResult<TransitionOutcome> {
        self.assign(
            sub_task_id,
            admin,
            at,
            Operation::AdminReplaceFieldExecutor,
            field_executor,
            payload,
        )
        .await
    }

    /// Cancels the sub-task on its field executor's behalf, then requeues it
    /// as the system.
    ///
    /// The two steps commit independently.
    ///
    /// # Errors
    ///
    /// Returns the cancellation error when the first step fails. When only
    /// the requeue fails, returns [`TransitionError::Requeue`] carrying the
    /// committed cancellation.
    pub async fn cancel_by_field_executor(
        &self,
        sub_task_id: SubTaskId,
        field_executor: UserId,
        at: DateTime<Utc>,
        payload: ReportPayload,
    ) -> TransitionResult<CancelAndRequeueOutcome> {
        let canceled = self
            .perform(
                sub_task_id,
                Actor::User(field_executor),
                at,
                Operation::CancelByFieldExecutor,
                payload,
            )
            .await?;
        match self.requeue_canceled(sub_task_id, at).await {
            Ok(requeued) => Ok(CancelAndRequeueOutcome { canceled, requeued }),
            Err(err) => {
                error!(
                    sub_task_id = %sub_task_id,
                    report_id = %canceled.report_id,
                    error = %err,
                    "sub-task canceled but requeue failed"
                );
                Err(TransitionError::Requeue {
                    canceled: Box::new(canceled),
                    source: Box::new(err),
                })
            }
        }
    }

    /// Puts a sub-task its field executor gave up back up for picking.
    ///
    /// Calling this on a sub-task that is already open fails with a state
    /// conflict and writes nothing.
    ///
    /// # Errors
    ///
    /// As [`Self::apply_transition`].
    pub async fn requeue_canceled(
        &self,
        sub_task_id: SubTaskId,
        at: DateTime<Utc>,
    ) -> TransitionResult<TransitionOutcome> {
        self.perform(
            sub_task_id,
            Actor::System,
            at,
            Operation::RequeueAfterCancel,
            ReportPayload::Activity(ActivityReport::note(
                "requeued after field executor cancellation",
            )),
        )
        .await
    }

    /// Finds a sub-task by id or uid.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Store`] when the lookup fails.
    pub async fn find(&self, lookup: SubTaskLookup) -> TransitionResult<Option<SubTask>> {
        Ok(self.store.find_sub_task(lookup).await?)
    }

    /// Lists the reports of a sub-task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Store`] when the lookup fails.
    pub async fn reports(&self, sub_task_id: SubTaskId) -> TransitionResult<Vec<SubTaskReport>> {
        Ok(self.store.reports_for(sub_task_id).await?)
    }

    /// Lists the history of a sub-task, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Store`] when the lookup fails.
    pub async fn history(
        &self,
        sub_task_id: SubTaskId,
    ) -> TransitionResult<Vec<SubTaskHistoryItem>> {
        Ok(self.store.history_for(sub_task_id).await?)
    }

    /// Lists the queued notifications of a user, oldest first.
    ///
    /// # Errors
    ///
    /// Returns [`TransitionError::Store`] when the lookup fails.
    pub async fn notifications(&self, recipient: UserId) -> TransitionResult<Vec<Notification>> {
        Ok(self.store.notifications_for(recipient).await?)
    }

    async fn assign(
        &self,
        sub_task_id: SubTaskId,
        admin: UserId,
        at: DateTime<Utc>,
        operation: Operation,
        field_executor: UserId,
        payload: ReportPayload,
    ) -> TransitionResult<TransitionOutcome> {
        let spec = self
            .spec_for(operation)?
            .with_payload(payload)
            .with_assignment(ExecutorAssignment::User(field_executor))
            .with_response(true);
        self.apply_transition(sub_task_id, Actor::User(admin), at, spec)
            .await
    }

    async fn apply(
        &self,
        lookup: SubTaskLookup,
        actor: Actor,
        at: DateTime<Utc>,
        spec: TransitionSpec,
    ) -> TransitionResult<TransitionOutcome> {
        let label = spec.label.clone();
        let result = self.apply_inner(lookup, actor, at, spec).await;
        match &result {
            Ok(outcome) => info!(
                sub_task = %lookup,
                operation = %label,
                status = %outcome.sub_task.status(),
                report_id = %outcome.report_id,
                "sub-task transition committed"
            ),
            Err(err @ (TransitionError::StateConflict(_) | TransitionError::Authorization(_))) => {
                warn!(
                    sub_task = %lookup,
                    operation = %label,
                    error = %err,
                    "sub-task transition rejected"
                );
            }
            Err(err) => {
                error!(
                    sub_task = %lookup,
                    operation = %label,
                    error = %err,
                    "sub-task transition failed"
                );
            }
        }
        result
    }

    async fn apply_inner(
        &self,
        lookup: SubTaskLookup,
        actor: Actor,
        at: DateTime<Utc>,
        spec: TransitionSpec,
    ) -> TransitionResult<TransitionOutcome> {
        ensure_declared(&spec.label, &spec.allowed_sources)?;
        let snapshot = self
            .store
            .find_sub_task(lookup)
            .await?
            .ok_or(TransitionError::NotFound(lookup))?;

        let sub_task_type = snapshot.sub_task_type();
        if spec
            .applies_to
            .is_some_and(|task_type| task_type != sub_task_type.task_type())
        {
            return Err(SubTaskDomainError::OperationNotApplicable {
                operation: spec.label.clone(),
                sub_task_type,
            }
            .into());
        }
        spec.payload.validate_for(sub_task_type)?;
        if spec.requires_form && !spec.payload.is_form() {
            return Err(SubTaskDomainError::FormRequired(spec.label.clone()).into());
        }

        let authorized = self
            .policy
            .authorize(actor, spec.required_role, &snapshot)
            .await?;
        let executor = match spec.assignment {
            ExecutorAssignment::Keep => ExecutorChange::Keep,
            ExecutorAssignment::Clear => ExecutorChange::Clear,
            ExecutorAssignment::User(user_id) => {
                ExecutorChange::Assign(self.policy.resolve_assignee(user_id).await?)
            }
            ExecutorAssignment::Actor => {
                let executor = authorized.snapshot.as_actor_ref().ok_or(
                    AuthorizationError::SystemActorNotPermitted(RoleKind::FieldExecutor),
                )?;
                ExecutorChange::Assign(executor)
            }
        };

        let TransitionSpec {
            label,
            allowed_sources,
            target,
            payload,
            hook,
            emit_response,
            isolation,
            ..
        } = spec;
        let request = StepRequest {
            sub_task_id: snapshot.id(),
            label,
            allowed_sources,
            target,
            payload,
            actor: authorized,
            executor,
            at,
            now: self.clock.utc(),
        };

        self.store
            .in_transaction(isolation, move |tx| {
                let applied = execute(tx, &request)?;
                if let Some(bound) = hook {
                    debug!(
                        hook = bound.name(),
                        operation = %request.label,
                        "running transition hook"
                    );
                    let mut ctx = HookContext::new(
                        tx,
                        &request.label,
                        &applied,
                        &request.actor.snapshot,
                        request.now,
                    );
                    bound.apply(&mut ctx)?;
                }

                let sub_task = tx
                    .find_sub_task(SubTaskLookup::Id(applied.sub_task.id()))?
                    .unwrap_or(applied.sub_task);
                let response = if emit_response {
                    Some(success_body(&request.label, &sub_task, &applied.report)?)
                } else {
                    None
                };
                Ok(TransitionOutcome {
                    sub_task,
                    report_id: applied.report.id,
                    report_uid: applied.report.uid,
                    response,
                })
            })
            .await
    }
}
