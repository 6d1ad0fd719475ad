//! Sibling cascades: construction dependencies and customer withdrawal.

use crate::test_helpers::{
    ADMIN, DEBT_LAYOUT, Dispatcher, FIELD_EXECUTOR, TO_CGP_ACCEPTED, memory_dispatcher, note,
    of_type,
};
use chrono::Utc;
use rstest::rstest;
use task_dispatcher::subtask::{
    adapters::memory::InMemorySubTaskStore,
    domain::{
        Actor, NotificationKind, Operation, SYSTEM_IDENTITY, SubTaskStatus, SubTaskType,
        TaskStatus, TaskType,
    },
    services::{HookError, TransitionError},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn construction_order_releases_dependents_and_completes_the_task(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (task, sub_tasks) = memory_dispatcher.construction("TSK-2001").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    let meter = of_type(&sub_tasks, SubTaskType::MeterInstallation);
    let gas_in = of_type(&sub_tasks, SubTaskType::GasIn);

    memory_dispatcher.advance(&sk, &[Operation::Pick]).await;
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::InProgress
    );

    memory_dispatcher
        .advance(&sk, &TO_CGP_ACCEPTED[1..])
        .await;
    assert_eq!(
        memory_dispatcher.reload(&meter).await.status(),
        SubTaskStatus::WaitingAssignment
    );
    assert_eq!(
        memory_dispatcher.reload(&gas_in).await.status(),
        SubTaskStatus::BlockingDependency
    );

    memory_dispatcher.advance(&sr, &TO_CGP_ACCEPTED).await;
    assert_eq!(
        memory_dispatcher.reload(&gas_in).await.status(),
        SubTaskStatus::BlockingDependency
    );

    memory_dispatcher.advance(&meter, &TO_CGP_ACCEPTED).await;
    assert_eq!(
        memory_dispatcher.reload(&gas_in).await.status(),
        SubTaskStatus::WaitingAssignment
    );
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::InProgress
    );

    memory_dispatcher.advance(&gas_in, &TO_CGP_ACCEPTED).await;
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::Completed
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn released_sub_task_records_a_system_history_entry(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-2002").await;
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    let meter = of_type(&sub_tasks, SubTaskType::MeterInstallation);

    memory_dispatcher
        .advance(
            &sr,
            &[
                Operation::Pick,
                Operation::WorkingStart,
                Operation::WorkingFinish,
            ],
        )
        .await;

    let history = memory_dispatcher
        .engine
        .history(meter.id())
        .await
        .expect("history should load");
    assert_eq!(history.len(), 1);
    let released = history.first().expect("release should be recorded");
    assert_eq!(released.from_status, SubTaskStatus::BlockingDependency);
    assert_eq!(released.to_status, SubTaskStatus::WaitingAssignment);
    assert_eq!(released.operation_nameid, "AUTO.SUB_TASK.WAITING_ASSIGNMENT");
    assert_eq!(released.user_loginid, SYSTEM_IDENTITY);
    let reports = memory_dispatcher
        .engine
        .reports(meter.id())
        .await
        .expect("reports should load");
    assert_eq!(reports.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn customer_withdrawal_closes_every_open_sibling(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (task, sub_tasks) = memory_dispatcher.construction("TSK-2003").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    memory_dispatcher
        .advance(&sk, &[Operation::Pick, Operation::WorkingStart])
        .await;

    let outcome = memory_dispatcher
        .engine
        .perform(
            sr.id(),
            Actor::User(ADMIN),
            Utc::now(),
            Operation::CancelByCustomer,
            note("customer moved out"),
        )
        .await
        .expect("customer cancellation should succeed");

    assert_eq!(outcome.sub_task.status(), SubTaskStatus::CanceledByCustomer);
    for sub_task in &sub_tasks {
        let reloaded = memory_dispatcher.reload(sub_task).await;
        assert_eq!(
            reloaded.status(),
            SubTaskStatus::CanceledByCustomer,
            "{} should be canceled",
            sub_task.sub_task_type()
        );
        assert!(reloaded.milestones().completed_at.is_some());
    }
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::CanceledByCustomer
    );

    let notifications = memory_dispatcher
        .engine
        .notifications(FIELD_EXECUTOR)
        .await
        .expect("notifications should load");
    assert_eq!(notifications.len(), 1);
    let notice = notifications.first().expect("executor should be told");
    assert_eq!(notice.kind, NotificationKind::CanceledByCustomer);
    assert_eq!(notice.sub_task_id, sk.id());
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn customer_withdrawal_spares_accepted_work(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (task, sub_tasks) = memory_dispatcher.construction("TSK-2004").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    memory_dispatcher.advance(&sk, &TO_CGP_ACCEPTED).await;

    memory_dispatcher
        .engine
        .perform(
            sr.id(),
            Actor::System,
            Utc::now(),
            Operation::CancelByCustomer,
            note("withdrawn at the counter"),
        )
        .await
        .expect("customer cancellation should succeed");

    assert_eq!(
        memory_dispatcher.reload(&sk).await.status(),
        SubTaskStatus::CgpVerificationSuccess
    );
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::CanceledByCustomer
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn debt_visits_never_wait_on_each_other(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (task, sub_tasks) = memory_dispatcher
        .seed_task("TSK-2005", TaskType::DebtManagement, &DEBT_LAYOUT)
        .await;
    let stop_flow = of_type(&sub_tasks, SubTaskType::StopGasFlow);
    let remove_meter = of_type(&sub_tasks, SubTaskType::RemoveGasMeter);

    let accepted = memory_dispatcher
        .advance(&stop_flow, &TO_CGP_ACCEPTED)
        .await;

    assert_eq!(accepted.status(), SubTaskStatus::CgpVerificationSuccess);
    assert_eq!(
        memory_dispatcher.reload(&remove_meter).await.status(),
        SubTaskStatus::WaitingAssignment
    );
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::WaitingAssignment
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn customer_withdrawal_of_a_debt_visit_is_refused(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (task, sub_tasks) = memory_dispatcher
        .seed_task("TSK-2006", TaskType::DebtManagement, &DEBT_LAYOUT)
        .await;
    let stop_flow = of_type(&sub_tasks, SubTaskType::StopGasFlow);
    let remove_meter = of_type(&sub_tasks, SubTaskType::RemoveGasMeter);

    let err = memory_dispatcher
        .engine
        .perform(
            stop_flow.id(),
            Actor::User(ADMIN),
            Utc::now(),
            Operation::CancelByCustomer,
            note("customer settled the debt"),
        )
        .await
        .expect_err("debt orders are not withdrawn as a whole");

    assert!(matches!(
        &err,
        TransitionError::Hook(HookError::UnsupportedTaskType {
            task_type: TaskType::DebtManagement,
            ..
        })
    ));
    for sub_task in [&stop_flow, &remove_meter] {
        let reloaded = memory_dispatcher.reload(sub_task).await;
        assert_eq!(reloaded.status(), SubTaskStatus::WaitingAssignment);
        assert_eq!(reloaded.version(), sub_task.version());
    }
    let history = memory_dispatcher
        .engine
        .history(stop_flow.id())
        .await
        .expect("history should load");
    assert!(history.is_empty());
    assert_eq!(
        memory_dispatcher.reload_task(&task).await.status(),
        TaskStatus::WaitingAssignment
    );
}
