//! Racing transitions on a single sub-task.

use crate::test_helpers::{
    Dispatcher, FIELD_EXECUTOR, OTHER_FIELD_EXECUTOR, memory_dispatcher, note, of_type,
};
use chrono::Utc;
use rstest::rstest;
use task_dispatcher::subtask::{
    adapters::memory::InMemorySubTaskStore,
    domain::{Actor, Operation, SubTaskId, SubTaskStatus, SubTaskType, UserId},
    services::{TransitionError, TransitionOutcome, TransitionResult},
};

async fn pick_as(
    dispatcher: &Dispatcher<InMemorySubTaskStore>,
    sub_task_id: SubTaskId,
    user_id: UserId,
) -> TransitionResult<TransitionOutcome> {
    dispatcher
        .engine
        .perform(
            sub_task_id,
            Actor::User(user_id),
            Utc::now(),
            Operation::Pick,
            note("racing pick"),
        )
        .await
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_picks_have_exactly_one_winner(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-4001").await;
    let sk = of_type(&sub_tasks, SubTaskType::Sk);

    let (first, second) = tokio::join!(
        pick_as(&memory_dispatcher, sk.id(), FIELD_EXECUTOR),
        pick_as(&memory_dispatcher, sk.id(), OTHER_FIELD_EXECUTOR),
    );

    let (winner, loser) = match (first, second) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        (first, second) => panic!("expected one winner, got {first:?} and {second:?}"),
    };
    assert!(
        matches!(
            loser,
            TransitionError::StateConflict(_) | TransitionError::Authorization(_)
        ),
        "loser should see a conflict or lost ownership, got {loser:?}"
    );

    let reloaded = memory_dispatcher.reload(&sk).await;
    assert_eq!(reloaded.status(), SubTaskStatus::Assigned);
    assert_eq!(
        reloaded.last_field_executor(),
        winner.sub_task.last_field_executor()
    );
    let history = memory_dispatcher
        .engine
        .history(sk.id())
        .await
        .expect("history should load");
    assert_eq!(history.len(), 1);
    let reports = memory_dispatcher
        .engine
        .reports(sk.id())
        .await
        .expect("reports should load");
    assert_eq!(reports.len(), 1);
}

#[rstest]
#[tokio::test(flavor = "multi_thread")]
async fn duplicate_submission_by_the_owner_applies_once(
    memory_dispatcher: Dispatcher<InMemorySubTaskStore>,
) {
    let (_, sub_tasks) = memory_dispatcher.construction("TSK-4002").await;
    let sr = of_type(&sub_tasks, SubTaskType::Sr);
    let assigned = memory_dispatcher.advance(&sr, &[Operation::Pick]).await;

    let (first, second, third) = tokio::join!(
        memory_dispatcher.step(&assigned, Operation::WorkingStart),
        memory_dispatcher.step(&assigned, Operation::WorkingStart),
        memory_dispatcher.step(&assigned, Operation::WorkingStart),
    );

    let results = [first, second, third];
    let applied = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(applied, 1);
    for rejected in results.iter().filter_map(|result| result.as_ref().err()) {
        assert!(
            matches!(rejected, TransitionError::StateConflict(_)),
            "owner retries should conflict, got {rejected:?}"
        );
    }

    let reloaded = memory_dispatcher.reload(&sr).await;
    assert_eq!(reloaded.status(), SubTaskStatus::Working);
    assert_eq!(reloaded.version(), assigned.version() + 1);
}
