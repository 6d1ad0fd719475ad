//! When steps for sub-task transition BDD scenarios.

use super::world::{SubTaskTransitionWorld, operation, run_async};
use crate::test_helpers::{
    FIELD_EXECUTOR, OTHER_FIELD_EXECUTOR, REMOTE_SUPERVISOR, note, payload_for,
};
use chrono::Utc;
use rstest_bdd_macros::when;
use task_dispatcher::subtask::domain::{Actor, ReportPayload};

fn perform_as(
    world: &mut SubTaskTransitionWorld,
    sub_task_type: &str,
    label: &str,
    actor: Option<Actor>,
    payload: Option<ReportPayload>,
) -> Result<(), eyre::Report> {
    let sub_task = world.sub_task(sub_task_type)?;
    let step = operation(label)?;
    let result = match (actor, payload) {
        (None, None) => run_async(world.dispatcher.step(&sub_task, step)),
        (actor, payload) => run_async(world.dispatcher.engine.perform(
            sub_task.id(),
            actor.unwrap_or(Actor::User(FIELD_EXECUTOR)),
            Utc::now(),
            step,
            payload.unwrap_or_else(|| payload_for(step, sub_task.sub_task_type())),
        )),
    };
    world.last_result = Some(result.map(|outcome| outcome.sub_task));
    Ok(())
}

#[when(r#""{label}" is performed on the "{sub_task_type}" sub-task"#)]
fn operation_performed(
    world: &mut SubTaskTransitionWorld,
    label: String,
    sub_task_type: String,
) -> Result<(), eyre::Report> {
    perform_as(world, &sub_task_type, &label, None, None)
}

#[when(r#""{label}" is performed on the "{sub_task_type}" sub-task by the other field executor"#)]
fn operation_performed_by_other_executor(
    world: &mut SubTaskTransitionWorld,
    label: String,
    sub_task_type: String,
) -> Result<(), eyre::Report> {
    perform_as(
        world,
        &sub_task_type,
        &label,
        Some(Actor::User(OTHER_FIELD_EXECUTOR)),
        None,
    )
}

#[when(r#""{label}" is performed on the "{sub_task_type}" sub-task by the out-of-area supervisor"#)]
fn operation_performed_by_remote_supervisor(
    world: &mut SubTaskTransitionWorld,
    label: String,
    sub_task_type: String,
) -> Result<(), eyre::Report> {
    perform_as(
        world,
        &sub_task_type,
        &label,
        Some(Actor::User(REMOTE_SUPERVISOR)),
        None,
    )
}

#[when(r#""{label}" is performed on the "{sub_task_type}" sub-task without a form"#)]
fn operation_performed_without_form(
    world: &mut SubTaskTransitionWorld,
    label: String,
    sub_task_type: String,
) -> Result<(), eyre::Report> {
    perform_as(
        world,
        &sub_task_type,
        &label,
        None,
        Some(note("finished, form to follow")),
    )
}

#[when(r#"the field executor cancels the "{sub_task_type}" sub-task"#)]
fn field_executor_cancels(
    world: &mut SubTaskTransitionWorld,
    sub_task_type: String,
) -> Result<(), eyre::Report> {
    let sub_task = world.sub_task(&sub_task_type)?;
    let result = run_async(world.dispatcher.engine.cancel_by_field_executor(
        sub_task.id(),
        FIELD_EXECUTOR,
        Utc::now(),
        note("customer asked to reschedule"),
    ));
    world.last_result = Some(result.map(|outcome| outcome.requeued.sub_task));
    Ok(())
}
