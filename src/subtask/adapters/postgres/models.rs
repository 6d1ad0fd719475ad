//! Diesel row models for sub-task persistence.

use super::schema::{
    notification_outbox, sub_task_history_items, sub_task_reports, sub_tasks, tasks,
};
use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde_json::Value;
use uuid::Uuid;

/// Query result row for tasks.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct TaskRow {
    pub id: i64,
    pub uid: Uuid,
    pub code: String,
    pub task_type: String,
    pub status: String,
    pub customer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for tasks.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = tasks)]
pub struct NewTaskRow {
    pub uid: Uuid,
    pub code: String,
    pub task_type: String,
    pub status: String,
    pub customer_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Query result row for sub-tasks.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sub_tasks)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct SubTaskRow {
    pub id: i64,
    pub uid: Uuid,
    pub task_id: i64,
    pub task_uid: Uuid,
    pub sub_task_type: String,
    pub status: String,
    pub last_field_executor: Option<Value>,
    pub last_field_supervisor: Option<Value>,
    pub last_cgp_user: Option<Value>,
    pub last_sub_task_report_id: Option<i64>,
    pub last_sub_task_report_uid: Option<Uuid>,
    pub last_form_report_id: Option<i64>,
    pub last_form_report_uid: Option<Uuid>,
    pub customer: Value,
    pub schedule_start_date: Option<NaiveDate>,
    pub schedule_end_date: Option<NaiveDate>,
    pub milestones: Value,
    pub is_deleted: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert model for sub-tasks.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sub_tasks)]
pub struct NewSubTaskRow {
    pub uid: Uuid,
    pub task_id: i64,
    pub task_uid: Uuid,
    pub sub_task_type: String,
    pub status: String,
    pub customer: Value,
    pub schedule_start_date: Option<NaiveDate>,
    pub schedule_end_date: Option<NaiveDate>,
    pub milestones: Value,
    pub is_deleted: bool,
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full row image written by a committed transition.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = sub_tasks)]
#[diesel(treat_none_as_null = true)]
pub struct SubTaskChangeset {
    pub status: String,
    pub last_field_executor: Option<Value>,
    pub last_field_supervisor: Option<Value>,
    pub last_cgp_user: Option<Value>,
    pub last_sub_task_report_id: Option<i64>,
    pub last_sub_task_report_uid: Option<Uuid>,
    pub last_form_report_id: Option<i64>,
    pub last_form_report_uid: Option<Uuid>,
    pub schedule_start_date: Option<NaiveDate>,
    pub schedule_end_date: Option<NaiveDate>,
    pub milestones: Value,
    pub is_deleted: bool,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

/// Query result row for reports.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sub_task_reports)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ReportRow {
    pub id: i64,
    pub uid: Uuid,
    pub code: String,
    pub sub_task_id: i64,
    pub sub_task_uid: Uuid,
    pub status: String,
    pub actor: Value,
    pub payload: Value,
    pub reported_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Insert model for reports; the id is drawn from the sequence first so the
/// code can embed it.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sub_task_reports)]
pub struct NewReportRow {
    pub id: i64,
    pub uid: Uuid,
    pub code: String,
    pub sub_task_id: i64,
    pub sub_task_uid: Uuid,
    pub status: String,
    pub actor: Value,
    pub payload: Value,
    pub reported_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Query result row for history entries.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = sub_task_history_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct HistoryRow {
    pub id: i64,
    pub sub_task_id: i64,
    pub sub_task_uid: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub event_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub user_uid: Option<Uuid>,
    pub user_loginid: String,
    pub user_fullname: String,
    pub operation_nameid: String,
    pub input_parameters: String,
    pub report_id: i64,
    pub report_uid: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Insert model for history entries.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = sub_task_history_items)]
pub struct NewHistoryRow {
    pub sub_task_id: i64,
    pub sub_task_uid: Uuid,
    pub from_status: String,
    pub to_status: String,
    pub event_at: DateTime<Utc>,
    pub user_id: Option<i64>,
    pub user_uid: Option<Uuid>,
    pub user_loginid: String,
    pub user_fullname: String,
    pub operation_nameid: String,
    pub input_parameters: String,
    pub report_id: i64,
    pub report_uid: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Query result row for outbox notifications.
#[derive(Debug, Clone, Queryable, Selectable)]
#[diesel(table_name = notification_outbox)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct NotificationRow {
    pub id: i64,
    pub recipient_user_id: i64,
    pub kind: String,
    pub sub_task_id: i64,
    pub task_id: i64,
    pub title: String,
    pub body: String,
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
}

/// Insert model for outbox notifications.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = notification_outbox)]
pub struct NewNotificationRow {
    pub recipient_user_id: i64,
    pub kind: String,
    pub sub_task_id: i64,
    pub task_id: i64,
    pub title: String,
    pub body: String,
    pub dedupe_key: String,
    pub created_at: DateTime<Utc>,
}

/// Next value drawn from a sequence.
#[derive(Debug, Clone, Copy, QueryableByName)]
pub struct SequenceValue {
    #[diesel(sql_type = diesel::sql_types::BigInt)]
    pub value: i64,
}
