//! Given steps for sub-task transition BDD scenarios.

use super::world::{SubTaskTransitionWorld, operation, run_async};
use eyre::WrapErr;
use rstest_bdd_macros::given;

#[given(r#"a construction work order "{code}""#)]
fn construction_work_order(world: &mut SubTaskTransitionWorld, code: String) {
    let (task, sub_tasks) = run_async(world.dispatcher.construction(&code));
    world.task = Some(task);
    world.sub_tasks = sub_tasks;
}

#[given(r#"the "{sub_task_type}" sub-task has gone through "{labels}""#)]
fn sub_task_has_gone_through(
    world: &mut SubTaskTransitionWorld,
    sub_task_type: String,
    labels: String,
) -> Result<(), eyre::Report> {
    let sub_task = world.sub_task(&sub_task_type)?;
    for label in labels.split(',') {
        let step = operation(label)?;
        run_async(world.dispatcher.step(&sub_task, step))
            .wrap_err_with(|| format!("perform {label} during scenario setup"))?;
    }
    Ok(())
}
