//! Error taxonomy of the state engine.

use super::{HookError, TransitionOutcome};
use crate::subtask::{
    domain::{RoleKind, ScopeDimension, SubTaskDomainError, SubTaskLookup, SubTaskStatus, UserId},
    ports::{DirectoryError, SubTaskStoreError},
};
use thiserror::Error;

/// Reasons an actor may not perform an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthorizationError {
    /// The acting user does not exist.
    #[error("user {0} does not exist")]
    UserNotFound(UserId),

    /// The acting user is soft-deleted.
    #[error("user {0} has been deleted")]
    UserDeleted(UserId),

    /// The acting user is not active.
    #[error("user {0} is not active")]
    UserInactive(UserId),

    /// The user holds no membership of the required role kind.
    #[error("user {user_id} is not a {role}")]
    MissingRole {
        /// Acting user.
        user_id: UserId,
        /// Role the operation requires.
        role: RoleKind,
    },

    /// A field executor acted on a sub-task owned by someone else.
    #[error("sub-task is assigned to user {owner}, not user {user_id}")]
    NotOwner {
        /// Acting user.
        user_id: UserId,
        /// Current field executor.
        owner: UserId,
    },

    /// No supervisor membership covers the sub-task.
    #[error("user {user_id} does not cover the sub-task: {}", .dimension.reason_code())]
    ScopeMismatch {
        /// Acting user.
        user_id: UserId,
        /// First uncovered dimension of the closest membership.
        dimension: ScopeDimension,
    },

    /// The operation needs a user but the system acted.
    #[error("the system actor cannot act as {0}")]
    SystemActorNotPermitted(RoleKind),

    /// The requested assignee is not an active field executor.
    #[error("user {0} cannot be assigned as field executor")]
    AssigneeNotFieldExecutor(UserId),
}

impl AuthorizationError {
    /// Returns the machine-readable rejection reason.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::UserNotFound(_) => "USER_NOT_FOUND",
            Self::UserDeleted(_) => "USER_DELETED",
            Self::UserInactive(_) => "USER_NOT_ACTIVE",
            Self::MissingRole { .. } => "ROLE_MEMBERSHIP_REQUIRED",
            Self::NotOwner { .. } => "SUB_TASK_NOT_ASSIGNED_TO_YOU",
            Self::ScopeMismatch { dimension, .. } => dimension.reason_code(),
            Self::SystemActorNotPermitted(_) => "SYSTEM_ACTOR_NOT_PERMITTED",
            Self::AssigneeNotFieldExecutor(_) => "ASSIGNEE_IS_NOT_FIELD_EXECUTOR",
        }
    }
}

/// Reasons the persisted state rejects an operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateConflictError {
    /// The status read under lock is outside the allowed set.
    #[error("{operation} is not allowed from {current}; allowed: {}", join_statuses(.allowed))]
    StatusNotAllowed {
        /// Operation label.
        operation: String,
        /// Status read under lock.
        current: SubTaskStatus,
        /// Declared source statuses.
        allowed: Vec<SubTaskStatus>,
    },

    /// Another transaction changed the sub-task first.
    #[error("sub-task was modified concurrently")]
    ConcurrentModification,

    /// The sub-task is soft-deleted.
    #[error("sub-task has been deleted")]
    Deleted,
}

fn join_statuses(statuses: &[SubTaskStatus]) -> String {
    statuses
        .iter()
        .map(|status| status.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Coarse classification transport code maps to a response status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionErrorKind {
    /// Malformed request.
    Validation,
    /// Actor not permitted.
    Authorization,
    /// Persisted state rejected the operation.
    StateConflict,
    /// The sub-task does not exist.
    NotFound,
    /// Stored data violates an engine invariant.
    InternalConsistency,
    /// A hook failed.
    Hook,
    /// Store or directory failure.
    Infrastructure,
    /// The follow-up step of a composite workflow failed.
    Requeue,
}

impl TransitionErrorKind {
    /// Returns the canonical name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION",
            Self::Authorization => "AUTHORIZATION",
            Self::StateConflict => "STATE_CONFLICT",
            Self::NotFound => "NOT_FOUND",
            Self::InternalConsistency => "INTERNAL_CONSISTENCY",
            Self::Hook => "HOOK",
            Self::Infrastructure => "INFRASTRUCTURE",
            Self::Requeue => "REQUEUE",
        }
    }
}

/// Errors returned by the state engine.
#[derive(Debug, Error)]
pub enum TransitionError {
    /// The request failed validation; nothing was written.
    #[error(transparent)]
    Validation(#[from] SubTaskDomainError),

    /// The actor may not perform the operation; nothing was written.
    #[error(transparent)]
    Authorization(#[from] AuthorizationError),

    /// The persisted state rejected the operation; the transaction rolled
    /// back.
    #[error(transparent)]
    StateConflict(#[from] StateConflictError),

    /// The sub-task does not exist.
    #[error("sub-task not found: {0}")]
    NotFound(SubTaskLookup),

    /// Stored data violates an engine invariant.
    #[error("internal consistency error: {0}")]
    InternalConsistency(String),

    /// A hook failed; the transaction rolled back.
    #[error(transparent)]
    Hook(#[from] HookError),

    /// Store failure.
    #[error(transparent)]
    Store(SubTaskStoreError),

    /// Directory failure.
    #[error(transparent)]
    Directory(#[from] DirectoryError),

    /// The sub-task was canceled but could not be requeued.
    #[error("sub-task canceled (report {}) but requeue failed: {source}", .canceled.report_id)]
    Requeue {
        /// Committed cancellation outcome.
        canceled: Box<TransitionOutcome>,
        /// Requeue failure.
        source: Box<TransitionError>,
    },
}

impl From<SubTaskStoreError> for TransitionError {
    fn from(err: SubTaskStoreError) -> Self {
        match err {
            SubTaskStoreError::SerializationFailure => {
                Self::StateConflict(StateConflictError::ConcurrentModification)
            }
            other => Self::Store(other),
        }
    }
}

impl TransitionError {
    /// Returns the coarse classification.
    #[must_use]
    pub const fn kind(&self) -> TransitionErrorKind {
        match self {
            Self::Validation(_) => TransitionErrorKind::Validation,
            Self::Authorization(_) => TransitionErrorKind::Authorization,
            Self::StateConflict(_) => TransitionErrorKind::StateConflict,
            Self::NotFound(_) => TransitionErrorKind::NotFound,
            Self::InternalConsistency(_) => TransitionErrorKind::InternalConsistency,
            Self::Hook(_) => TransitionErrorKind::Hook,
            Self::Store(_) | Self::Directory(_) => TransitionErrorKind::Infrastructure,
            Self::Requeue { .. } => TransitionErrorKind::Requeue,
        }
    }

    /// Returns the HTTP status a handler should answer with.
    #[must_use]
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::Authorization(_) => 403,
            Self::NotFound(_) => 404,
            Self::StateConflict(_) => 409,
            Self::Hook(HookError::Cascade(inner)) => inner.http_status(),
            Self::Requeue { source, .. } => source.http_status(),
            Self::InternalConsistency(_) | Self::Hook(_) | Self::Store(_) | Self::Directory(_) => {
                500
            }
        }
    }

    /// Returns the machine-readable rejection reason.
    #[must_use]
    pub const fn reason_code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "INVALID_REQUEST",
            Self::Authorization(err) => err.reason_code(),
            Self::StateConflict(StateConflictError::StatusNotAllowed { .. }) => {
                "INVALID_SUB_TASK_STATUS_FOR_OPERATION"
            }
            Self::StateConflict(StateConflictError::ConcurrentModification) => {
                "SUB_TASK_MODIFIED_CONCURRENTLY"
            }
            Self::StateConflict(StateConflictError::Deleted) => "SUB_TASK_DELETED",
            Self::NotFound(_) => "SUB_TASK_NOT_FOUND",
            Self::InternalConsistency(_) => "INTERNAL_CONSISTENCY_ERROR",
            Self::Hook(_) => "TRANSITION_HOOK_FAILED",
            Self::Store(_) => "PERSISTENCE_ERROR",
            Self::Directory(_) => "DIRECTORY_ERROR",
            Self::Requeue { .. } => "SUB_TASK_REQUEUE_FAILED",
        }
    }

    pub(crate) fn internal(message: impl Into<String>) -> Self {
        Self::InternalConsistency(message.into())
    }
}
