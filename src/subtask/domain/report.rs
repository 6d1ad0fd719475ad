//! Immutable per-transition reports and append-only history entries.

use super::{
    ActorSnapshot, HistoryItemId, ReportPayload, ReportRef, SubTaskId, SubTaskReportId,
    SubTaskReportUid, SubTaskStatus, SubTaskUid, UserId, UserUid,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Builds the human-readable report code: the zero-padded row id followed by
/// the event date, e.g. `004220261018`.
#[must_use]
pub fn report_code(id: SubTaskReportId, at: DateTime<Utc>) -> String {
    format!("{:04}{}", id.value(), at.format("%Y%m%d"))
}

/// Snapshot of one transition's payload and actor context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubTaskReport {
    /// Row identifier.
    pub id: SubTaskReportId,
    /// Public identifier.
    pub uid: SubTaskReportUid,
    /// Human-readable code.
    pub code: String,
    /// Sub-task row identifier.
    pub sub_task_id: SubTaskId,
    /// Sub-task public identifier.
    pub sub_task_uid: SubTaskUid,
    /// Status the transition entered.
    pub status: SubTaskStatus,
    /// Actor identity at the time of the event.
    pub actor: ActorSnapshot,
    /// Payload, stored verbatim.
    pub payload: ReportPayload,
    /// Business timestamp of the event.
    pub at: DateTime<Utc>,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

impl SubTaskReport {
    /// Returns the reference stored on the sub-task.
    #[must_use]
    pub const fn reference(&self) -> ReportRef {
        ReportRef {
            id: self.id,
            uid: self.uid,
        }
    }
}

/// Values for inserting a report.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSubTaskReport {
    /// Public identifier.
    pub uid: SubTaskReportUid,
    /// Sub-task row identifier.
    pub sub_task_id: SubTaskId,
    /// Sub-task public identifier.
    pub sub_task_uid: SubTaskUid,
    /// Status the transition enters.
    pub status: SubTaskStatus,
    /// Actor identity.
    pub actor: ActorSnapshot,
    /// Payload.
    pub payload: ReportPayload,
    /// Business timestamp of the event.
    pub at: DateTime<Utc>,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewSubTaskReport {
    /// Materializes the report once storage has assigned its row id.
    #[must_use]
    pub fn into_report(self, id: SubTaskReportId) -> SubTaskReport {
        SubTaskReport {
            id,
            uid: self.uid,
            code: report_code(id, self.at),
            sub_task_id: self.sub_task_id,
            sub_task_uid: self.sub_task_uid,
            status: self.status,
            actor: self.actor,
            payload: self.payload,
            at: self.at,
            created_at: self.created_at,
        }
    }
}

/// Append-only audit ledger entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTaskHistoryItem {
    /// Row identifier.
    pub id: HistoryItemId,
    /// Sub-task row identifier.
    pub sub_task_id: SubTaskId,
    /// Sub-task public identifier.
    pub sub_task_uid: SubTaskUid,
    /// Status before the transition.
    pub from_status: SubTaskStatus,
    /// Status after the transition.
    pub to_status: SubTaskStatus,
    /// Business timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Acting user, absent for system transitions.
    pub user_id: Option<UserId>,
    /// Acting user public identifier.
    pub user_uid: Option<UserUid>,
    /// Acting user login name.
    pub user_loginid: String,
    /// Acting user display name.
    pub user_fullname: String,
    /// Operation label, e.g. `USER.SUB_TASK.PICK`.
    pub operation_nameid: String,
    /// Serialized transition request.
    pub input_parameters: String,
    /// Report filed with the transition.
    pub report: ReportRef,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

/// Values for appending a history entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHistoryItem {
    /// Sub-task row identifier.
    pub sub_task_id: SubTaskId,
    /// Sub-task public identifier.
    pub sub_task_uid: SubTaskUid,
    /// Status before the transition.
    pub from_status: SubTaskStatus,
    /// Status after the transition.
    pub to_status: SubTaskStatus,
    /// Business timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Acting user, absent for system transitions.
    pub user_id: Option<UserId>,
    /// Acting user public identifier.
    pub user_uid: Option<UserUid>,
    /// Acting user login name.
    pub user_loginid: String,
    /// Acting user display name.
    pub user_fullname: String,
    /// Operation label.
    pub operation_nameid: String,
    /// Serialized transition request.
    pub input_parameters: String,
    /// Report filed with the transition.
    pub report: ReportRef,
    /// Write timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewHistoryItem {
    /// Materializes the entry once storage has assigned its row id.
    #[must_use]
    pub fn into_item(self, id: HistoryItemId) -> SubTaskHistoryItem {
        SubTaskHistoryItem {
            id,
            sub_task_id: self.sub_task_id,
            sub_task_uid: self.sub_task_uid,
            from_status: self.from_status,
            to_status: self.to_status,
            timestamp: self.timestamp,
            user_id: self.user_id,
            user_uid: self.user_uid,
            user_loginid: self.user_loginid,
            user_fullname: self.user_fullname,
            operation_nameid: self.operation_nameid,
            input_parameters: self.input_parameters,
            report: self.report,
            created_at: self.created_at,
        }
    }
}
