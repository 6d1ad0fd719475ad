//! Transition executor: the writes one transition performs inside an open
//! transaction.
//!
//! The executor never authorizes and never dispatches hooks. The engine does
//! both around it, and hooks call it directly for nested cascades.

use super::{
    AuthorizedActor, StateConflictError, TransitionError,
    policy::check_ownership,
    precondition::ensure_allowed,
};
use crate::subtask::{
    domain::{
        ExecutorChange, NewHistoryItem, NewSubTaskReport, ReportPayload, RoleKind, StatusChange,
        SubTask, SubTaskId, SubTaskLookup, SubTaskReport, SubTaskReportUid, SubTaskStatus,
        TransitionTarget, UserId,
    },
    ports::SubTaskTransaction,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One transition step as the executor performs it.
#[derive(Debug, Clone)]
pub(crate) struct StepRequest {
    pub(crate) sub_task_id: SubTaskId,
    pub(crate) label: String,
    pub(crate) allowed_sources: Vec<SubTaskStatus>,
    pub(crate) target: TransitionTarget,
    pub(crate) payload: ReportPayload,
    pub(crate) actor: AuthorizedActor,
    pub(crate) executor: ExecutorChange,
    pub(crate) at: DateTime<Utc>,
    pub(crate) now: DateTime<Utc>,
}

/// Rows written by one executed step.
#[derive(Debug, Clone)]
pub(crate) struct AppliedStep {
    pub(crate) from: SubTaskStatus,
    pub(crate) sub_task: SubTask,
    pub(crate) report: SubTaskReport,
}

/// Locks the sub-task, checks the precondition, and writes the report,
/// the updated row, and the history entry.
pub(crate) fn execute(
    tx: &mut dyn SubTaskTransaction,
    request: &StepRequest,
) -> Result<AppliedStep, TransitionError> {
    let mut sub_task = tx
        .lock_sub_task(request.sub_task_id)?
        .ok_or(TransitionError::NotFound(SubTaskLookup::Id(request.sub_task_id)))?;
    if sub_task.is_deleted() {
        return Err(StateConflictError::Deleted.into());
    }

    let from = sub_task.status();
    ensure_allowed(&request.label, from, &request.allowed_sources)?;
    if let Some(owner) = request.actor.owner_guard {
        check_ownership(owner, &sub_task)?;
    }
    let target = request.target.resolve(from);

    let report = tx.insert_report(NewSubTaskReport {
        uid: SubTaskReportUid::new(),
        sub_task_id: sub_task.id(),
        sub_task_uid: sub_task.uid(),
        status: target,
        actor: request.actor.snapshot.clone(),
        payload: request.payload.clone(),
        at: request.at,
        created_at: request.now,
    })?;

    let expected_version = sub_task.version();
    sub_task.record_transition(StatusChange {
        target,
        report: report.reference(),
        form_report: request.payload.is_form(),
        actor: &request.actor.snapshot,
        executor: request.executor.clone(),
        at: request.at,
        now: request.now,
    });
    if !tx.update_sub_task(&sub_task, expected_version)? {
        return Err(StateConflictError::ConcurrentModification.into());
    }

    let snapshot = &request.actor.snapshot;
    tx.insert_history(NewHistoryItem {
        sub_task_id: sub_task.id(),
        sub_task_uid: sub_task.uid(),
        from_status: from,
        to_status: target,
        timestamp: request.at,
        user_id: snapshot.user_id,
        user_uid: snapshot.user_uid,
        user_loginid: snapshot.loginid.clone(),
        user_fullname: snapshot.fullname.clone(),
        operation_nameid: request.label.clone(),
        input_parameters: input_parameters(request, target)?,
        report: report.reference(),
        created_at: request.now,
    })?;

    Ok(AppliedStep {
        from,
        sub_task,
        report,
    })
}

#[derive(Serialize)]
struct InputParameters<'a> {
    operation: &'a str,
    sub_task_id: SubTaskId,
    allowed_sources: &'a [SubTaskStatus],
    target: SubTaskStatus,
    actor_user_id: Option<UserId>,
    role: RoleKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    assignee_user_id: Option<UserId>,
    at: DateTime<Utc>,
    payload: &'a ReportPayload,
}

fn input_parameters(
    request: &StepRequest,
    target: SubTaskStatus,
) -> Result<String, TransitionError> {
    let assignee_user_id = match &request.executor {
        ExecutorChange::Assign(executor) => Some(executor.user_id),
        ExecutorChange::Keep | ExecutorChange::Clear => None,
    };
    let parameters = InputParameters {
        operation: &request.label,
        sub_task_id: request.sub_task_id,
        allowed_sources: &request.allowed_sources,
        target,
        actor_user_id: request.actor.snapshot.user_id,
        role: request.actor.snapshot.role,
        assignee_user_id,
        at: request.at,
        payload: &request.payload,
    };
    serde_json::to_string(&parameters)
        .map_err(|err| TransitionError::internal(format!("input parameters: {err}")))
}
