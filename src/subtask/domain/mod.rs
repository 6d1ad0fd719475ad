//! Domain model for the sub-task lifecycle.
//!
//! Sub-tasks move through a fixed set of statuses, and every legal move is
//! declared once in the operation catalogue. The aggregate records the
//! bookkeeping a committed transition implies (milestones, actor snapshots,
//! report references) without touching infrastructure.

mod actor;
mod error;
mod ids;
mod kind;
mod notification;
mod operation;
mod payload;
mod report;
mod scope;
mod status;
mod sub_task;
mod table;
mod task;

pub use actor::{
    Actor, ActorRef, ActorSnapshot, OrganizationRef, RoleKind, RoleMembership, SYSTEM_IDENTITY,
    UserRecord, UserStatus,
};
pub use error::SubTaskDomainError;
pub use ids::{
    HistoryItemId, NotificationId, OrganizationId, OrganizationUid, RoleMembershipId, SubTaskId,
    SubTaskLookup, SubTaskReportId, SubTaskReportUid, SubTaskUid, TaskId, TaskUid, UserId, UserUid,
};
pub use kind::{SubTaskType, TaskType};
pub use notification::{NewNotification, Notification, NotificationKind};
pub use operation::{AssignmentRule, CancelReason, Operation, TransitionRule, TransitionTarget};
pub use payload::{
    ActivityReport, DebtHandlingReport, GasAppliance, GasInReport, GeoPoint,
    MeterIdentity, MeterInstallationReport, ReportPayload, SkReport, SrReport,
};
pub use report::{
    NewHistoryItem, NewSubTaskReport, SubTaskHistoryItem, SubTaskReport, report_code,
};
pub use scope::{AssignedScope, CodeHierarchy, CustomerScope, EffectiveScope, ScopeDimension};
pub use status::{StatusGroup, SubTaskStatus, TaskStatus};
pub use sub_task::{
    CustomerSnapshot, ExecutorChange, Milestones, NewSubTask, PersistedSubTaskData, ReportRef,
    Schedule, StatusChange, SubTask,
};
pub use table::{TableAudit, TableIssue, TransitionTable};
pub use task::{NewTask, PersistedTaskData, Task};
