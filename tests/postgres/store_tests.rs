//! Row mapping and ledger constraints of the `PostgreSQL` store.

use crate::postgres::helpers::{BoxError, PgContext, pg_context};
use crate::test_helpers::{CONSTRUCTION_LAYOUT, customer, form_for, of_type};
use eyre::{ensure, eyre};
use rstest::rstest;
use task_dispatcher::subtask::{
    domain::{Operation, SubTaskLookup, SubTaskStatus, SubTaskType, TaskStatus},
    ports::SubTaskStore,
};

fn require(context: Result<Option<PgContext>, BoxError>) -> eyre::Result<Option<PgContext>> {
    context.map_err(|err| eyre!("postgres test setup failed: {err}"))
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn seeded_rows_round_trip(
    pg_context: Result<Option<PgContext>, BoxError>,
) -> eyre::Result<()> {
    let Some(context) = require(pg_context)? else {
        return Ok(());
    };
    let dispatcher = &context.dispatcher;
    let (task, sub_tasks) = dispatcher.construction("TSK-6001").await;

    ensure!(sub_tasks.len() == CONSTRUCTION_LAYOUT.len());
    let stored_task = dispatcher.reload_task(&task).await;
    ensure!(stored_task.code() == "TSK-6001");
    ensure!(stored_task.status() == TaskStatus::WaitingAssignment);
    ensure!(stored_task.customer_id() == Some(7));

    for (sub_task, (sub_task_type, status)) in sub_tasks.iter().zip(CONSTRUCTION_LAYOUT) {
        let by_uid = dispatcher
            .store
            .find_sub_task(SubTaskLookup::Uid(sub_task.uid()))
            .await?
            .ok_or_else(|| eyre!("{sub_task_type} should be found by uid"))?;
        ensure!(by_uid.id() == sub_task.id());
        ensure!(by_uid.sub_task_type() == sub_task_type);
        ensure!(by_uid.status() == status);
        ensure!(by_uid.task_uid() == task.uid());
        ensure!(by_uid.customer() == &customer());
        ensure!(by_uid.version() == 0);
        ensure!(by_uid.last_field_executor().is_none());
    }
    Ok(())
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn form_payload_and_milestones_survive_storage(
    pg_context: Result<Option<PgContext>, BoxError>,
) -> eyre::Result<()> {
    let Some(context) = require(pg_context)? else {
        return Ok(());
    };
    let dispatcher = &context.dispatcher;
    let (_, sub_tasks) = dispatcher.construction("TSK-6002").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);

    let finished = dispatcher
        .advance(
            &sk,
            &[
                Operation::Pick,
                Operation::WorkingStart,
                Operation::WorkingFinish,
            ],
        )
        .await;

    let stored = dispatcher.reload(&sk).await;
    ensure!(stored.status() == SubTaskStatus::WaitingVerification);
    ensure!(stored.milestones().is_working_finish);
    ensure!(stored.milestones().working_start_at.is_some());
    ensure!(stored.last_field_executor() == finished.last_field_executor());
    ensure!(stored.last_form_report() == finished.last_form_report());
    ensure!(stored.version() == finished.version());

    let reports = dispatcher.engine.reports(sk.id()).await?;
    let form_report = reports
        .iter()
        .find(|report| Some(report.reference()) == stored.last_form_report())
        .ok_or_else(|| eyre!("form report should be stored"))?;
    ensure!(form_report.status == SubTaskStatus::WaitingVerification);
    ensure!(form_report.payload.variant_name() == form_for(SubTaskType::Sk).variant_name());
    ensure!(form_report.payload.is_form());
    Ok(())
}

#[rstest]
#[case("UPDATE sub_task_history_items SET user_loginid = 'someone.else'")]
#[case("DELETE FROM sub_task_history_items")]
#[tokio::test(flavor = "multi_thread")]
async fn history_ledger_is_append_only(
    pg_context: Result<Option<PgContext>, BoxError>,
    #[case] statement: &str,
) -> eyre::Result<()> {
    let Some(context) = require(pg_context)? else {
        return Ok(());
    };
    let (_, sub_tasks) = context.dispatcher.construction("TSK-6003").await;
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    context.dispatcher.advance(&sr, &[Operation::Pick]).await;

    let result = context.execute(statement);

    ensure!(result.is_err(), "ledger mutation should be rejected");
    let history = context.dispatcher.engine.history(sr.id()).await?;
    ensure!(history.len() == 1);
    ensure!(history.iter().all(|item| item.user_loginid == "fe.one"));
    Ok(())
}
