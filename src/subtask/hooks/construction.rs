//! Construction order dependencies between sibling sub-tasks.
//!
//! A construction task carries four sub-tasks. Meter installation waits for
//! either the household installation (SK) or the service line (SR); gas-in
//! waits for all three. The parent task is in progress once anything is
//! assigned and completed once CGP accepted every sub-task.

use crate::subtask::{
    domain::{
        ActivityReport, Operation, ReportPayload, SubTask, SubTaskStatus, SubTaskType, TaskStatus,
        TaskType,
    },
    services::{HookContext, HookError, TransitionHook},
};
use tracing::debug;

/// Keeps construction sub-tasks and their parent task in step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ConstructionDependencyHook;

impl TransitionHook for ConstructionDependencyHook {
    fn name(&self) -> &'static str {
        "construction_dependency"
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let sub_task = ctx.sub_task().clone();
        if sub_task.sub_task_type().task_type() != TaskType::Construction {
            return Ok(());
        }
        match sub_task.status() {
            SubTaskStatus::Assigned => start_task(ctx, &sub_task),
            SubTaskStatus::WaitingVerification => release_dependents(ctx, &sub_task),
            SubTaskStatus::CgpVerificationSuccess => complete_task(ctx, &sub_task),
            _ => Ok(()),
        }
    }
}

fn start_task(ctx: &mut HookContext<'_>, sub_task: &SubTask) -> Result<(), HookError> {
    let task_id = sub_task.task_id();
    let now = ctx.now();
    let mut task = ctx
        .tx()
        .lock_task(task_id)?
        .ok_or(HookError::MissingTask(task_id))?;
    if task.status() == TaskStatus::WaitingAssignment {
        task.set_status(TaskStatus::InProgress, now);
        ctx.tx().update_task_status(&task)?;
    }
    Ok(())
}

fn release_dependents(ctx: &mut HookContext<'_>, sub_task: &SubTask) -> Result<(), HookError> {
    let siblings = ctx.tx().sub_tasks_of_task(sub_task.task_id())?;
    let finished = |sub_task_type: SubTaskType| {
        siblings.iter().any(|sibling| {
            sibling.sub_task_type() == sub_task_type && sibling.milestones().is_working_finish
        })
    };

    let meter_ready = finished(SubTaskType::Sk) || finished(SubTaskType::Sr);
    let gas_in_ready = finished(SubTaskType::Sk)
        && finished(SubTaskType::Sr)
        && finished(SubTaskType::MeterInstallation);

    for sibling in &siblings {
        let ready = match sibling.sub_task_type() {
            SubTaskType::MeterInstallation => meter_ready,
            SubTaskType::GasIn => gas_in_ready,
            _ => false,
        };
        if ready && sibling.status() == SubTaskStatus::BlockingDependency && !sibling.is_deleted() {
            debug!(
                sub_task_id = %sibling.id(),
                released_by = %sub_task.id(),
                "releasing blocked construction sub-task"
            );
            ctx.cascade(
                sibling.id(),
                Operation::ReleaseDependency,
                ReportPayload::Activity(ActivityReport::note("prerequisite sub-tasks finished")),
            )?;
        }
    }
    Ok(())
}

fn complete_task(ctx: &mut HookContext<'_>, sub_task: &SubTask) -> Result<(), HookError> {
    let task_id = sub_task.task_id();
    let now = ctx.now();
    let mut task = ctx
        .tx()
        .lock_task(task_id)?
        .ok_or(HookError::MissingTask(task_id))?;
    if task.status().is_closed() {
        return Ok(());
    }

    let siblings = ctx.tx().sub_tasks_of_task(task_id)?;
    let all_accepted = SubTaskType::CONSTRUCTION.iter().all(|sub_task_type| {
        siblings.iter().any(|sibling| {
            sibling.sub_task_type() == *sub_task_type
                && matches!(
                    sibling.status(),
                    SubTaskStatus::CgpVerificationSuccess | SubTaskStatus::Completed
                )
        })
    });
    if all_accepted {
        task.set_status(TaskStatus::Completed, now);
        ctx.tx().update_task_status(&task)?;
    }
    Ok(())
}
