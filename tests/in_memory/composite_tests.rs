//! Multi-step operations: cancel-and-requeue and administrator assignment.

use crate::test_helpers::{
    ADMIN, Dispatcher, FIELD_EXECUTOR, OTHER_FIELD_EXECUTOR, memory_dispatcher, note, of_type,
};
use chrono::Utc;
use rstest::rstest;
use task_dispatcher::subtask::{
    adapters::memory::InMemorySubTaskStore,
    domain::{
        Actor, NotificationKind, Operation, SubTaskStatus, SubTaskType, TransitionTable,
    },
    services::{AuthorizationError, TransitionError, TransitionRegistry},
};

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn field_executor_cancellation_reopens_the_sub_task(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-3001").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);
    memory_dispatcher
        .advance(&sk, &[Operation::Pick, Operation::WorkingStart, Operation::Pause])
        .await;

    let outcome = memory_dispatcher
        .engine
        .cancel_by_field_executor(sk.id(), FIELD_EXECUTOR, Utc::now(), note("truck broke down"))
        .await
        .expect("cancel and requeue should succeed");

    assert_eq!(
        outcome.canceled.sub_task.status(),
        SubTaskStatus::CanceledByFieldExecutor
    );
    let requeued = outcome.requeued.sub_task;
    assert_eq!(requeued.status(), SubTaskStatus::WaitingAssignment);
    assert!(requeued.last_field_executor().is_none());
    assert!(requeued.milestones().last_canceled_at.is_some());

    let history = memory_dispatcher
        .engine
        .history(sk.id())
        .await
        .expect("history should load");
    let tail: Vec<_> = history
        .iter()
        .rev()
        .take(2)
        .map(|item| (item.from_status, item.to_status, item.user_id))
        .collect();
    assert_eq!(
        tail,
        vec![
            (
                SubTaskStatus::CanceledByFieldExecutor,
                SubTaskStatus::WaitingAssignment,
                None
            ),
            (
                SubTaskStatus::Paused,
                SubTaskStatus::CanceledByFieldExecutor,
                Some(FIELD_EXECUTOR)
            ),
        ]
    );

    let repicked = memory_dispatcher
        .engine
        .perform(
            sk.id(),
            Actor::User(OTHER_FIELD_EXECUTOR),
            Utc::now(),
            Operation::Pick,
            note("taking over"),
        )
        .await
        .expect("requeued sub-task is open to any field executor");
    assert_eq!(
        repicked
            .sub_task
            .last_field_executor()
            .map(|executor| executor.user_id),
        Some(OTHER_FIELD_EXECUTOR)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn failed_requeue_keeps_the_committed_cancellation(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let without_requeue = TransitionTable::from_rules(
        Operation::catalogue()
            .into_iter()
            .filter(|operation| *operation != Operation::RequeueAfterCancel)
            .map(Operation::rule),
    );
    let dispatcher = Dispatcher {
        engine: memory_dispatcher
            .engine
            .with_registry(TransitionRegistry::new(without_requeue)),
        store: memory_dispatcher.store,
    };
    let (_, sub_tasks) = dispatcher.construction("TSK-3002").await;
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    dispatcher.advance(&sr, &[Operation::Pick]).await;

    let err = dispatcher
        .engine
        .cancel_by_field_executor(sr.id(), FIELD_EXECUTOR, Utc::now(), note("wrong address"))
        .await
        .expect_err("requeue is not declared");

    let TransitionError::Requeue { canceled, source } = &err else {
        panic!("expected a requeue failure, got {err:?}");
    };
    assert_eq!(
        canceled.sub_task.status(),
        SubTaskStatus::CanceledByFieldExecutor
    );
    assert!(matches!(**source, TransitionError::Validation(_)));
    assert_eq!(err.http_status(), source.http_status());
    assert_eq!(err.reason_code(), "SUB_TASK_REQUEUE_FAILED");
    assert_eq!(
        dispatcher.reload(&sr).await.status(),
        SubTaskStatus::CanceledByFieldExecutor
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn admin_assignment_hands_ownership_to_the_assignee(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-3003").await;
    let sr = of_type(&sub_tasks, SubTaskType::Sr);

    let assigned = memory_dispatcher
        .engine
        .assign_to_field_executor(
            sr.id(),
            ADMIN,
            Utc::now(),
            OTHER_FIELD_EXECUTOR,
            note("nearest crew"),
        )
        .await
        .expect("admin assignment should succeed");
    assert_eq!(assigned.sub_task.status(), SubTaskStatus::Assigned);

    let err = memory_dispatcher
        .step(&sr, Operation::WorkingStart)
        .await
        .expect_err("the default executor does not own the sub-task");
    assert!(matches!(
        err,
        TransitionError::Authorization(AuthorizationError::NotOwner { .. })
    ));

    let started = memory_dispatcher
        .engine
        .perform(
            sr.id(),
            Actor::User(OTHER_FIELD_EXECUTOR),
            Utc::now(),
            Operation::WorkingStart,
            note("on site"),
        )
        .await
        .expect("assignee should be able to start");
    assert_eq!(started.sub_task.status(), SubTaskStatus::Working);

    let notifications = memory_dispatcher
        .engine
        .notifications(OTHER_FIELD_EXECUTOR)
        .await
        .expect("notifications should load");
    assert_eq!(notifications.len(), 1);
    assert!(
        notifications
            .iter()
            .all(|notice| notice.kind == NotificationKind::SubTaskAssigned)
    );
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replacement_mid_work_moves_ownership_only(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-3004").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);
    let working = memory_dispatcher
        .advance(&sk, &[Operation::Pick, Operation::WorkingStart])
        .await;

    let replaced = memory_dispatcher
        .engine
        .replace_field_executor(
            sk.id(),
            ADMIN,
            Utc::now(),
            OTHER_FIELD_EXECUTOR,
            note("first crew reassigned"),
        )
        .await
        .expect("replacement should succeed")
        .sub_task;

    assert_eq!(replaced.status(), SubTaskStatus::Working);
    assert_eq!(
        replaced.milestones().working_start_at,
        working.milestones().working_start_at
    );
    assert_eq!(
        replaced
            .last_field_executor()
            .map(|executor| executor.user_id),
        Some(OTHER_FIELD_EXECUTOR)
    );
    let err = memory_dispatcher
        .step(&sk, Operation::Pause)
        .await
        .expect_err("the previous executor lost ownership");
    assert_eq!(err.reason_code(), "SUB_TASK_NOT_ASSIGNED_TO_YOU");
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn replacement_of_an_open_sub_task_is_a_conflict(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-3005").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);

    let err = memory_dispatcher
        .engine
        .replace_field_executor(
            sk.id(),
            ADMIN,
            Utc::now(),
            OTHER_FIELD_EXECUTOR,
            note("nobody to replace"),
        )
        .await
        .expect_err("open sub-tasks have no executor to replace");

    assert!(matches!(err, TransitionError::StateConflict(_)));
    let history = memory_dispatcher
        .engine
        .history(sk.id())
        .await
        .expect("history should load");
    assert!(history.is_empty());
}
