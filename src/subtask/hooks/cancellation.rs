//! Customer withdrawal of a whole work order.

use super::notification::notify;
use crate::subtask::{
    domain::{ActivityReport, NotificationKind, Operation, ReportPayload, TaskStatus, TaskType},
    services::{HookContext, HookError, TransitionHook},
};
use tracing::debug;

/// Cancels every cancelable sibling, closes the parent task, and notifies
/// the field executors who lose their work.
///
/// Only construction orders can be withdrawn this way; any other task type
/// fails the transition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomerCancellationHook;

impl TransitionHook for CustomerCancellationHook {
    fn name(&self) -> &'static str {
        "customer_cancellation"
    }

    fn apply(&self, ctx: &mut HookContext<'_>) -> Result<(), HookError> {
        let canceled = ctx.sub_task().clone();
        let task_id = canceled.task_id();
        let now = ctx.now();
        let mut task = ctx
            .tx()
            .lock_task(task_id)?
            .ok_or(HookError::MissingTask(task_id))?;
        if task.task_type() != TaskType::Construction {
            return Err(HookError::UnsupportedTaskType {
                hook: self.name(),
                task_type: task.task_type(),
            });
        }

        let rule = Operation::CancelByCustomer.rule();
        let siblings = ctx.tx().sub_tasks_of_task(task_id)?;
        for sibling in siblings {
            let skip = sibling.id() == canceled.id()
                || sibling.is_deleted()
                || !rule.allows(sibling.status());
            if skip {
                continue;
            }
            debug!(
                sub_task_id = %sibling.id(),
                canceled_with = %canceled.id(),
                "canceling sibling sub-task for customer"
            );
            let updated = ctx.cascade(
                sibling.id(),
                Operation::CancelByCustomer,
                ReportPayload::Activity(ActivityReport::note("work order canceled by customer")),
            )?;
            if let Some(executor) = updated.last_field_executor().cloned() {
                notify(ctx, NotificationKind::CanceledByCustomer, &executor, &updated)?;
            }
        }

        if !task.status().is_closed() {
            task.set_status(TaskStatus::CanceledByCustomer, now);
            ctx.tx().update_task_status(&task)?;
        }

        if let Some(executor) = canceled.last_field_executor().cloned() {
            notify(ctx, NotificationKind::CanceledByCustomer, &executor, &canceled)?;
        }
        Ok(())
    }
}
