//! `PostgreSQL` store for sub-task lifecycle persistence.
//!
//! Each engine transaction runs on one pooled connection inside
//! `spawn_blocking`. The sub-task row is locked with `SELECT ... FOR UPDATE`
//! and written with a version predicate, so a concurrent writer either waits
//! for the lock or loses on the version check.

use super::{
    models::{
        HistoryRow, NewHistoryRow, NewNotificationRow, NewReportRow, NewSubTaskRow, NewTaskRow,
        NotificationRow, ReportRow, SequenceValue, SubTaskChangeset, SubTaskRow, TaskRow,
    },
    schema::{notification_outbox, sub_task_history_items, sub_task_reports, sub_tasks, tasks},
};
use crate::subtask::{
    domain::{
        ActorRef, HistoryItemId, Milestones, NewHistoryItem, NewNotification, NewSubTask,
        NewSubTaskReport, NewTask, Notification, NotificationId, NotificationKind,
        PersistedSubTaskData, PersistedTaskData, ReportRef, Schedule, SubTask, SubTaskHistoryItem,
        SubTaskId, SubTaskLookup, SubTaskReport, SubTaskReportId, SubTaskReportUid, SubTaskStatus,
        SubTaskType, SubTaskUid, Task, TaskId, TaskStatus, TaskType, TaskUid, UserId, UserUid,
        report_code,
    },
    ports::{
        SubTaskStore, SubTaskStoreError, SubTaskStoreResult, SubTaskTransaction,
        TransactionIsolation,
    },
};
use async_trait::async_trait;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::time::Duration;

/// `PostgreSQL` connection pool type used by sub-task adapters.
pub type SubTaskPgPool = Pool<ConnectionManager<PgConnection>>;

/// `PostgreSQL`-backed sub-task store.
#[derive(Debug, Clone)]
pub struct PostgresSubTaskStore {
    pool: SubTaskPgPool,
    lock_timeout: Option<Duration>,
}

impl PostgresSubTaskStore {
    /// Creates a new store from a `PostgreSQL` connection pool.
    #[must_use]
    pub const fn new(pool: SubTaskPgPool) -> Self {
        Self {
            pool,
            lock_timeout: None,
        }
    }

    /// Bounds how long a transaction waits for a row lock.
    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = Some(timeout);
        self
    }

    async fn run_blocking<F, T>(&self, f: F) -> SubTaskStoreResult<T>
    where
        F: FnOnce(&mut PgConnection) -> SubTaskStoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut connection = pool.get().map_err(SubTaskStoreError::persistence)?;
            f(&mut connection)
        })
        .await
        .map_err(SubTaskStoreError::persistence)?
    }
}

/// Separates the caller's error from failures of the transaction itself.
enum TxError<E> {
    Work(E),
    Database(DieselError),
}

impl<E> From<DieselError> for TxError<E> {
    fn from(err: DieselError) -> Self {
        Self::Database(err)
    }
}

fn run_transaction<T, E, F>(
    connection: &mut PgConnection,
    isolation: TransactionIsolation,
    lock_timeout: Option<Duration>,
    work: F,
) -> Result<T, E>
where
    E: From<SubTaskStoreError>,
    F: FnOnce(&mut dyn SubTaskTransaction) -> Result<T, E>,
{
    let body = move |tx: &mut PgConnection| -> Result<T, TxError<E>> {
        if let Some(timeout) = lock_timeout {
            diesel::sql_query(format!(
                "SET LOCAL lock_timeout = '{}ms'",
                timeout.as_millis()
            ))
            .execute(tx)?;
        }
        work(&mut PgTransaction { connection: tx }).map_err(TxError::Work)
    };

    let outcome = match isolation {
        TransactionIsolation::ReadCommitted => connection.transaction(body),
        TransactionIsolation::Serializable => {
            connection.build_transaction().serializable().run(body)
        }
    };
    outcome.map_err(|err| match err {
        TxError::Work(work_error) => work_error,
        TxError::Database(db_error) => E::from(store_error(db_error)),
    })
}

fn store_error(err: DieselError) -> SubTaskStoreError {
    match err {
        DieselError::DatabaseError(DatabaseErrorKind::SerializationFailure, _) => {
            SubTaskStoreError::SerializationFailure
        }
        other => SubTaskStoreError::persistence(other),
    }
}

struct PgTransaction<'a> {
    connection: &'a mut PgConnection,
}

impl SubTaskTransaction for PgTransaction<'_> {
    fn lock_sub_task(&mut self, id: SubTaskId) -> SubTaskStoreResult<Option<SubTask>> {
        let row = sub_tasks::table
            .filter(sub_tasks::id.eq(id.value()))
            .select(SubTaskRow::as_select())
            .for_update()
            .first::<SubTaskRow>(self.connection)
            .optional()
            .map_err(store_error)?;
        row.map(row_to_sub_task).transpose()
    }

    fn find_sub_task(&mut self, lookup: SubTaskLookup) -> SubTaskStoreResult<Option<SubTask>> {
        find_sub_task_row(self.connection, lookup)
    }

    fn lock_task(&mut self, id: TaskId) -> SubTaskStoreResult<Option<Task>> {
        let row = tasks::table
            .filter(tasks::id.eq(id.value()))
            .select(TaskRow::as_select())
            .for_update()
            .first::<TaskRow>(self.connection)
            .optional()
            .map_err(store_error)?;
        row.map(row_to_task).transpose()
    }

    fn sub_tasks_of_task(&mut self, task_id: TaskId) -> SubTaskStoreResult<Vec<SubTask>> {
        let rows = sub_tasks::table
            .filter(sub_tasks::task_id.eq(task_id.value()))
            .order(sub_tasks::id.asc())
            .select(SubTaskRow::as_select())
            .load::<SubTaskRow>(self.connection)
            .map_err(store_error)?;
        rows.into_iter().map(row_to_sub_task).collect()
    }

    fn insert_task(&mut self, task: NewTask) -> SubTaskStoreResult<Task> {
        let row = NewTaskRow {
            uid: task.uid.into_inner(),
            code: task.code,
            task_type: task.task_type.code().to_owned(),
            status: TaskStatus::WaitingAssignment.as_str().to_owned(),
            customer_id: task.customer_id,
            created_at: task.created_at,
            updated_at: task.created_at,
        };
        let stored = diesel::insert_into(tasks::table)
            .values(&row)
            .returning(TaskRow::as_returning())
            .get_result::<TaskRow>(self.connection)
            .map_err(store_error)?;
        row_to_task(stored)
    }

    fn insert_sub_task(&mut self, sub_task: NewSubTask) -> SubTaskStoreResult<SubTask> {
        let task_id = sub_task.task_id;
        let row = NewSubTaskRow {
            uid: sub_task.uid.into_inner(),
            task_id: task_id.value(),
            task_uid: sub_task.task_uid.into_inner(),
            sub_task_type: sub_task.sub_task_type.full_code().to_owned(),
            status: sub_task.status.as_str().to_owned(),
            customer: to_json(&sub_task.customer)?,
            schedule_start_date: sub_task.schedule.start_date,
            schedule_end_date: sub_task.schedule.end_date,
            milestones: to_json(&Milestones::default())?,
            is_deleted: false,
            version: 0,
            created_at: sub_task.created_at,
            updated_at: sub_task.created_at,
        };
        let stored = diesel::insert_into(sub_tasks::table)
            .values(&row)
            .returning(SubTaskRow::as_returning())
            .get_result::<SubTaskRow>(self.connection)
            .map_err(|err| match err {
                DieselError::DatabaseError(DatabaseErrorKind::ForeignKeyViolation, _) => {
                    SubTaskStoreError::TaskNotFound(task_id)
                }
                other => store_error(other),
            })?;
        row_to_sub_task(stored)
    }

    fn insert_report(&mut self, report: NewSubTaskReport) -> SubTaskStoreResult<SubTaskReport> {
        let next = diesel::sql_query("SELECT nextval('sub_task_reports_id_seq') AS value")
            .get_result::<SequenceValue>(self.connection)
            .map_err(store_error)?;
        let id = SubTaskReportId::new(next.value);
        let row = NewReportRow {
            id: id.value(),
            uid: report.uid.into_inner(),
            code: report_code(id, report.at),
            sub_task_id: report.sub_task_id.value(),
            sub_task_uid: report.sub_task_uid.into_inner(),
            status: report.status.as_str().to_owned(),
            actor: to_json(&report.actor)?,
            payload: to_json(&report.payload)?,
            reported_at: report.at,
            created_at: report.created_at,
        };
        diesel::insert_into(sub_task_reports::table)
            .values(&row)
            .execute(self.connection)
            .map_err(store_error)?;
        Ok(report.into_report(id))
    }

    fn update_sub_task(
        &mut self,
        sub_task: &SubTask,
        expected_version: i64,
    ) -> SubTaskStoreResult<bool> {
        let changeset = to_changeset(sub_task)?;
        let updated = diesel::update(
            sub_tasks::table
                .filter(sub_tasks::id.eq(sub_task.id().value()))
                .filter(sub_tasks::version.eq(expected_version)),
        )
        .set(&changeset)
        .execute(self.connection)
        .map_err(store_error)?;
        Ok(updated == 1)
    }

    fn update_task_status(&mut self, task: &Task) -> SubTaskStoreResult<()> {
        let updated = diesel::update(tasks::table.filter(tasks::id.eq(task.id().value())))
            .set((
                tasks::status.eq(task.status().as_str()),
                tasks::updated_at.eq(task.updated_at()),
            ))
            .execute(self.connection)
            .map_err(store_error)?;
        if updated == 0 {
            return Err(SubTaskStoreError::TaskNotFound(task.id()));
        }
        Ok(())
    }

    fn insert_history(&mut self, item: NewHistoryItem) -> SubTaskStoreResult<SubTaskHistoryItem> {
        let row = NewHistoryRow {
            sub_task_id: item.sub_task_id.value(),
            sub_task_uid: item.sub_task_uid.into_inner(),
            from_status: item.from_status.as_str().to_owned(),
            to_status: item.to_status.as_str().to_owned(),
            event_at: item.timestamp,
            user_id: item.user_id.map(UserId::value),
            user_uid: item.user_uid.map(UserUid::into_inner),
            user_loginid: item.user_loginid.clone(),
            user_fullname: item.user_fullname.clone(),
            operation_nameid: item.operation_nameid.clone(),
            input_parameters: item.input_parameters.clone(),
            report_id: item.report.id.value(),
            report_uid: item.report.uid.into_inner(),
            created_at: item.created_at,
        };
        let id = diesel::insert_into(sub_task_history_items::table)
            .values(&row)
            .returning(sub_task_history_items::id)
            .get_result::<i64>(self.connection)
            .map_err(store_error)?;
        Ok(item.into_item(HistoryItemId::new(id)))
    }

    fn enqueue_notification(
        &mut self,
        notification: NewNotification,
    ) -> SubTaskStoreResult<Option<Notification>> {
        let row = NewNotificationRow {
            recipient_user_id: notification.recipient.value(),
            kind: notification.kind.as_str().to_owned(),
            sub_task_id: notification.sub_task_id.value(),
            task_id: notification.task_id.value(),
            title: notification.title.clone(),
            body: notification.body.clone(),
            dedupe_key: notification.dedupe_key.clone(),
            created_at: notification.created_at,
        };
        let id = diesel::insert_into(notification_outbox::table)
            .values(&row)
            .on_conflict(notification_outbox::dedupe_key)
            .do_nothing()
            .returning(notification_outbox::id)
            .get_result::<i64>(self.connection)
            .optional()
            .map_err(store_error)?;
        Ok(id.map(|value| notification.into_notification(NotificationId::new(value))))
    }
}

#[async_trait]
impl SubTaskStore for PostgresSubTaskStore {
    async fn in_transaction<T, E, F>(
        &self,
        isolation: TransactionIsolation,
        work: F,
    ) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<SubTaskStoreError> + Send + 'static,
        F: FnOnce(&mut dyn SubTaskTransaction) -> Result<T, E> + Send + 'static,
    {
        let pool = self.pool.clone();
        let lock_timeout = self.lock_timeout;
        tokio::task::spawn_blocking(move || {
            let mut connection = pool
                .get()
                .map_err(|err| E::from(SubTaskStoreError::persistence(err)))?;
            run_transaction(&mut connection, isolation, lock_timeout, work)
        })
        .await
        .map_err(|err| E::from(SubTaskStoreError::persistence(err)))?
    }

    async fn find_sub_task(&self, lookup: SubTaskLookup) -> SubTaskStoreResult<Option<SubTask>> {
        self.run_blocking(move |connection| find_sub_task_row(connection, lookup))
            .await
    }

    async fn find_task(&self, id: TaskId) -> SubTaskStoreResult<Option<Task>> {
        self.run_blocking(move |connection| {
            let row = tasks::table
                .filter(tasks::id.eq(id.value()))
                .select(TaskRow::as_select())
                .first::<TaskRow>(connection)
                .optional()
                .map_err(store_error)?;
            row.map(row_to_task).transpose()
        })
        .await
    }

    async fn reports_for(&self, sub_task_id: SubTaskId) -> SubTaskStoreResult<Vec<SubTaskReport>> {
        self.run_blocking(move |connection| {
            let rows = sub_task_reports::table
                .filter(sub_task_reports::sub_task_id.eq(sub_task_id.value()))
                .order(sub_task_reports::id.asc())
                .select(ReportRow::as_select())
                .load::<ReportRow>(connection)
                .map_err(store_error)?;
            rows.into_iter().map(row_to_report).collect()
        })
        .await
    }

    async fn history_for(
        &self,
        sub_task_id: SubTaskId,
    ) -> SubTaskStoreResult<Vec<SubTaskHistoryItem>> {
        self.run_blocking(move |connection| {
            let rows = sub_task_history_items::table
                .filter(sub_task_history_items::sub_task_id.eq(sub_task_id.value()))
                .order(sub_task_history_items::id.asc())
                .select(HistoryRow::as_select())
                .load::<HistoryRow>(connection)
                .map_err(store_error)?;
            rows.into_iter().map(row_to_history).collect()
        })
        .await
    }

    async fn notifications_for(&self, recipient: UserId) -> SubTaskStoreResult<Vec<Notification>> {
        self.run_blocking(move |connection| {
            let rows = notification_outbox::table
                .filter(notification_outbox::recipient_user_id.eq(recipient.value()))
                .order(notification_outbox::id.asc())
                .select(NotificationRow::as_select())
                .load::<NotificationRow>(connection)
                .map_err(store_error)?;
            rows.into_iter().map(row_to_notification).collect()
        })
        .await
    }
}

fn find_sub_task_row(
    connection: &mut PgConnection,
    lookup: SubTaskLookup,
) -> SubTaskStoreResult<Option<SubTask>> {
    let query = sub_tasks::table.select(SubTaskRow::as_select());
    let row = match lookup {
        SubTaskLookup::Id(id) => query
            .filter(sub_tasks::id.eq(id.value()))
            .first::<SubTaskRow>(connection),
        SubTaskLookup::Uid(uid) => query
            .filter(sub_tasks::uid.eq(uid.into_inner()))
            .first::<SubTaskRow>(connection),
    }
    .optional()
    .map_err(store_error)?;
    row.map(row_to_sub_task).transpose()
}

fn to_json(value: &impl Serialize) -> SubTaskStoreResult<Value> {
    serde_json::to_value(value).map_err(SubTaskStoreError::persistence)
}

fn from_json<T: DeserializeOwned>(value: Value) -> SubTaskStoreResult<T> {
    serde_json::from_value(value).map_err(SubTaskStoreError::persistence)
}

fn optional_json<T: DeserializeOwned>(value: Option<Value>) -> SubTaskStoreResult<Option<T>> {
    value.map(from_json).transpose()
}

fn optional_actor_json(actor: Option<&ActorRef>) -> SubTaskStoreResult<Option<Value>> {
    actor.map(to_json).transpose()
}

fn report_ref(id: Option<i64>, uid: Option<uuid::Uuid>) -> Option<ReportRef> {
    Some(ReportRef {
        id: SubTaskReportId::new(id?),
        uid: SubTaskReportUid::from_uuid(uid?),
    })
}

fn parse_sub_task_status(value: &str) -> SubTaskStoreResult<SubTaskStatus> {
    SubTaskStatus::try_from(value).map_err(SubTaskStoreError::persistence)
}

fn to_changeset(sub_task: &SubTask) -> SubTaskStoreResult<SubTaskChangeset> {
    let schedule = sub_task.schedule();
    let last_report = sub_task.last_sub_task_report();
    let last_form = sub_task.last_form_report();
    Ok(SubTaskChangeset {
        status: sub_task.status().as_str().to_owned(),
        last_field_executor: optional_actor_json(sub_task.last_field_executor())?,
        last_field_supervisor: optional_actor_json(sub_task.last_field_supervisor())?,
        last_cgp_user: optional_actor_json(sub_task.last_cgp_user())?,
        last_sub_task_report_id: last_report.map(|report| report.id.value()),
        last_sub_task_report_uid: last_report.map(|report| report.uid.into_inner()),
        last_form_report_id: last_form.map(|report| report.id.value()),
        last_form_report_uid: last_form.map(|report| report.uid.into_inner()),
        schedule_start_date: schedule.start_date,
        schedule_end_date: schedule.end_date,
        milestones: to_json(sub_task.milestones())?,
        is_deleted: sub_task.is_deleted(),
        version: sub_task.version(),
        updated_at: sub_task.updated_at(),
    })
}

fn row_to_task(row: TaskRow) -> SubTaskStoreResult<Task> {
    let task_type =
        TaskType::try_from(row.task_type.as_str()).map_err(SubTaskStoreError::persistence)?;
    let status =
        TaskStatus::try_from(row.status.as_str()).map_err(SubTaskStoreError::persistence)?;
    Ok(Task::from_persisted(PersistedTaskData {
        id: TaskId::new(row.id),
        uid: TaskUid::from_uuid(row.uid),
        code: row.code,
        task_type,
        status,
        customer_id: row.customer_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }))
}

fn row_to_sub_task(row: SubTaskRow) -> SubTaskStoreResult<SubTask> {
    let SubTaskRow {
        id,
        uid,
        task_id,
        task_uid,
        sub_task_type: persisted_type,
        status: persisted_status,
        last_field_executor,
        last_field_supervisor,
        last_cgp_user,
        last_sub_task_report_id,
        last_sub_task_report_uid,
        last_form_report_id,
        last_form_report_uid,
        customer,
        schedule_start_date,
        schedule_end_date,
        milestones,
        is_deleted,
        version,
        created_at,
        updated_at,
    } = row;

    let sub_task_type = SubTaskType::try_from(persisted_type.as_str())
        .map_err(SubTaskStoreError::persistence)?;
    Ok(SubTask::from_persisted(PersistedSubTaskData {
        id: SubTaskId::new(id),
        uid: SubTaskUid::from_uuid(uid),
        task_id: TaskId::new(task_id),
        task_uid: TaskUid::from_uuid(task_uid),
        sub_task_type,
        status: parse_sub_task_status(&persisted_status)?,
        last_field_executor: optional_json(last_field_executor)?,
        last_field_supervisor: optional_json(last_field_supervisor)?,
        last_cgp_user: optional_json(last_cgp_user)?,
        last_sub_task_report: report_ref(last_sub_task_report_id, last_sub_task_report_uid),
        last_form_report: report_ref(last_form_report_id, last_form_report_uid),
        customer: from_json(customer)?,
        schedule: Schedule {
            start_date: schedule_start_date,
            end_date: schedule_end_date,
        },
        milestones: from_json(milestones)?,
        is_deleted,
        version,
        created_at,
        updated_at,
    }))
}

fn row_to_report(row: ReportRow) -> SubTaskStoreResult<SubTaskReport> {
    Ok(SubTaskReport {
        id: SubTaskReportId::new(row.id),
        uid: SubTaskReportUid::from_uuid(row.uid),
        code: row.code,
        sub_task_id: SubTaskId::new(row.sub_task_id),
        sub_task_uid: SubTaskUid::from_uuid(row.sub_task_uid),
        status: parse_sub_task_status(&row.status)?,
        actor: from_json(row.actor)?,
        payload: from_json(row.payload)?,
        at: row.reported_at,
        created_at: row.created_at,
    })
}

fn row_to_history(row: HistoryRow) -> SubTaskStoreResult<SubTaskHistoryItem> {
    Ok(SubTaskHistoryItem {
        id: HistoryItemId::new(row.id),
        sub_task_id: SubTaskId::new(row.sub_task_id),
        sub_task_uid: SubTaskUid::from_uuid(row.sub_task_uid),
        from_status: parse_sub_task_status(&row.from_status)?,
        to_status: parse_sub_task_status(&row.to_status)?,
        timestamp: row.event_at,
        user_id: row.user_id.map(UserId::new),
        user_uid: row.user_uid.map(UserUid::from_uuid),
        user_loginid: row.user_loginid,
        user_fullname: row.user_fullname,
        operation_nameid: row.operation_nameid,
        input_parameters: row.input_parameters,
        report: ReportRef {
            id: SubTaskReportId::new(row.report_id),
            uid: SubTaskReportUid::from_uuid(row.report_uid),
        },
        created_at: row.created_at,
    })
}

fn row_to_notification(row: NotificationRow) -> SubTaskStoreResult<Notification> {
    let kind =
        NotificationKind::try_from(row.kind.as_str()).map_err(SubTaskStoreError::persistence)?;
    Ok(Notification {
        id: NotificationId::new(row.id),
        recipient: UserId::new(row.recipient_user_id),
        kind,
        sub_task_id: SubTaskId::new(row.sub_task_id),
        task_id: TaskId::new(row.task_id),
        title: row.title,
        body: row.body,
        dedupe_key: row.dedupe_key,
        created_at: row.created_at,
    })
}
