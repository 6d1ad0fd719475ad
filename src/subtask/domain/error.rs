//! Error types for sub-task domain validation and parsing.

use super::{SubTaskStatus, SubTaskType, TaskType};
use thiserror::Error;

/// Errors returned while parsing or validating sub-task domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SubTaskDomainError {
    /// The sub-task status string is not recognised.
    #[error("unknown sub-task status: {0}")]
    UnknownSubTaskStatus(String),

    /// The parent task status string is not recognised.
    #[error("unknown task status: {0}")]
    UnknownTaskStatus(String),

    /// The sub-task type code is not recognised.
    #[error("unknown sub-task type: {0}")]
    UnknownSubTaskType(String),

    /// The task type code is not recognised.
    #[error("unknown task type: {0}")]
    UnknownTaskType(String),

    /// The role kind string is not recognised.
    #[error("unknown role kind: {0}")]
    UnknownRoleKind(String),

    /// The cancellation reason code is not recognised.
    #[error("unknown cancellation reason: {0}")]
    UnknownCancelReason(String),

    /// The operation label does not name a catalogued operation.
    #[error("unknown operation: {0}")]
    UnknownOperation(String),

    /// The notification kind string is not recognised.
    #[error("unknown notification kind: {0}")]
    UnknownNotificationKind(String),

    /// A sub-task may only be created in a pre-assignment status.
    #[error("sub-task cannot be created in status {0}")]
    InvalidInitialStatus(SubTaskStatus),

    /// The sub-task type does not belong to the parent task type.
    #[error("sub-task type {sub_task_type} does not belong to a {task_type} task")]
    SubTaskTypeMismatch {
        /// Sub-task type code.
        sub_task_type: SubTaskType,
        /// Parent task type code.
        task_type: TaskType,
    },

    /// The operation label is empty after trimming.
    #[error("operation label must not be empty")]
    EmptyOperationLabel,

    /// A transition declared no allowed source statuses.
    #[error("operation {0} declares no allowed source statuses")]
    EmptySourceSet(String),

    /// The operation assigns a caller-named field executor but none was
    /// given.
    #[error("operation {0} requires an assignee")]
    AssigneeRequired(String),

    /// The operation is restricted to sub-tasks of another task type.
    #[error("operation {operation} does not apply to a {sub_task_type} sub-task")]
    OperationNotApplicable {
        /// Operation label.
        operation: String,
        /// Sub-task type code.
        sub_task_type: SubTaskType,
    },

    /// The report payload variant does not belong to the sub-task type.
    #[error("{payload} report cannot be filed against a {sub_task_type} sub-task")]
    PayloadTypeMismatch {
        /// Payload variant name.
        payload: &'static str,
        /// Sub-task type code.
        sub_task_type: &'static str,
    },

    /// The operation records the sub-task form but received an activity note.
    #[error("operation {0} requires the sub-task form report")]
    FormRequired(String),

    /// A report field failed validation.
    #[error("invalid report field '{field}': {reason}")]
    InvalidReportField {
        /// Offending field name.
        field: &'static str,
        /// Human-readable rejection reason.
        reason: String,
    },
}

impl SubTaskDomainError {
    pub(crate) fn invalid_field(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidReportField {
            field,
            reason: reason.into(),
        }
    }
}
