//! Sub-task and task lifecycle statuses.

use super::SubTaskDomainError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Sub-task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubTaskStatus {
    /// Waiting for a prerequisite sub-task to finish.
    BlockingDependency,
    /// Open for a field executor to pick.
    WaitingAssignment,
    /// Owned by a field executor, work not started.
    Assigned,
    /// Field work in progress.
    Working,
    /// Field work suspended.
    Paused,
    /// Field executor is revising submitted work.
    Reworking,
    /// Field executor is fixing rejected work.
    Fixing,
    /// Submitted work awaits supervisor or CGP verification.
    WaitingVerification,
    /// Supervisor accepted the work.
    VerificationSuccess,
    /// Supervisor rejected the work.
    VerificationFail,
    /// CGP accepted the work.
    CgpVerificationSuccess,
    /// CGP rejected the work.
    CgpVerificationFail,
    /// Field executor gave the sub-task up.
    CanceledByFieldExecutor,
    /// Customer withdrew the order.
    CanceledByCustomer,
    /// Customer settled the debt before the visit.
    CanceledByPaid,
    /// Canceled by force majeure.
    CanceledByForceMajeure,
    /// Canceled for another recorded reason.
    CanceledByOther,
    /// Not picked or unblocked before expiry.
    CanceledByExpired,
    /// Closed after final verification.
    Completed,
}

/// Coarse grouping of sub-task statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusGroup {
    /// No field executor owns the sub-task yet.
    PreAssignment,
    /// A field executor owns the sub-task and is working it.
    Active,
    /// Work has been submitted for verification.
    Verification,
    /// No further field work is expected.
    Terminal,
}

impl SubTaskStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [Self; 19] = [
        Self::BlockingDependency,
        Self::WaitingAssignment,
        Self::Assigned,
        Self::Working,
        Self::Paused,
        Self::Reworking,
        Self::Fixing,
        Self::WaitingVerification,
        Self::VerificationSuccess,
        Self::VerificationFail,
        Self::CgpVerificationSuccess,
        Self::CgpVerificationFail,
        Self::CanceledByFieldExecutor,
        Self::CanceledByCustomer,
        Self::CanceledByPaid,
        Self::CanceledByForceMajeure,
        Self::CanceledByOther,
        Self::CanceledByExpired,
        Self::Completed,
    ];

    /// Statuses a sub-task may be created in.
    pub const INITIAL: [Self; 2] = [Self::BlockingDependency, Self::WaitingAssignment];

    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::BlockingDependency => "BLOCKING_DEPENDENCY",
            Self::WaitingAssignment => "WAITING_ASSIGNMENT",
            Self::Assigned => "ASSIGNED",
            Self::Working => "WORKING",
            Self::Paused => "PAUSED",
            Self::Reworking => "REWORKING",
            Self::Fixing => "FIXING",
            Self::WaitingVerification => "WAITING_VERIFICATION",
            Self::VerificationSuccess => "VERIFICATION_SUCCESS",
            Self::VerificationFail => "VERIFICATION_FAIL",
            Self::CgpVerificationSuccess => "CGP_VERIFICATION_SUCCESS",
            Self::CgpVerificationFail => "CGP_VERIFICATION_FAIL",
            Self::CanceledByFieldExecutor => "CANCELED_BY_FIELD_EXECUTOR",
            Self::CanceledByCustomer => "CANCELED_BY_CUSTOMER",
            Self::CanceledByPaid => "CANCELED_BY_PAID",
            Self::CanceledByForceMajeure => "CANCELED_BY_FORCE_MAJEURE",
            Self::CanceledByOther => "CANCELED_BY_OTHER",
            Self::CanceledByExpired => "CANCELED_BY_EXPIRED",
            Self::Completed => "COMPLETED",
        }
    }

    /// Returns the group this status belongs to.
    #[must_use]
    pub const fn group(self) -> StatusGroup {
        match self {
            Self::BlockingDependency | Self::WaitingAssignment => StatusGroup::PreAssignment,
            Self::Assigned | Self::Working | Self::Paused | Self::Reworking | Self::Fixing => {
                StatusGroup::Active
            }
            Self::WaitingVerification
            | Self::VerificationSuccess
            | Self::VerificationFail
            | Self::CgpVerificationSuccess
            | Self::CgpVerificationFail => StatusGroup::Verification,
            Self::CanceledByFieldExecutor
            | Self::CanceledByCustomer
            | Self::CanceledByPaid
            | Self::CanceledByForceMajeure
            | Self::CanceledByOther
            | Self::CanceledByExpired
            | Self::Completed => StatusGroup::Terminal,
        }
    }

    /// Returns `true` while no field executor owns the sub-task.
    #[must_use]
    pub const fn is_pre_assignment(self) -> bool {
        matches!(self.group(), StatusGroup::PreAssignment)
    }

    /// Returns `true` for canceled and completed statuses.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self.group(), StatusGroup::Terminal)
    }

    /// Returns `true` for any of the cancellation statuses.
    #[must_use]
    pub const fn is_canceled(self) -> bool {
        matches!(
            self,
            Self::CanceledByFieldExecutor
                | Self::CanceledByCustomer
                | Self::CanceledByPaid
                | Self::CanceledByForceMajeure
                | Self::CanceledByOther
                | Self::CanceledByExpired
        )
    }
}

impl TryFrom<&str> for SubTaskStatus {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| SubTaskDomainError::UnknownSubTaskStatus(value.to_owned()))
    }
}

impl fmt::Display for SubTaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parent task lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// No sub-task has been picked yet.
    WaitingAssignment,
    /// At least one sub-task has been picked.
    InProgress,
    /// Every required sub-task passed CGP verification.
    Completed,
    /// The customer withdrew the order.
    CanceledByCustomer,
    /// The customer settled before the visit.
    CanceledPaid,
    /// The task expired.
    CanceledExpired,
}

impl TaskStatus {
    /// Returns the canonical storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::WaitingAssignment => "WAITING_ASSIGNMENT",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::CanceledByCustomer => "CANCELED_BY_CUSTOMER",
            Self::CanceledPaid => "CANCELED_PAID",
            Self::CanceledExpired => "CANCELED_EXPIRED",
        }
    }

    /// Returns `true` once the task can no longer change.
    #[must_use]
    pub const fn is_closed(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::CanceledByCustomer | Self::CanceledPaid | Self::CanceledExpired
        )
    }
}

impl TryFrom<&str> for TaskStatus {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "WAITING_ASSIGNMENT" => Ok(Self::WaitingAssignment),
            "IN_PROGRESS" => Ok(Self::InProgress),
            "COMPLETED" => Ok(Self::Completed),
            "CANCELED_BY_CUSTOMER" => Ok(Self::CanceledByCustomer),
            "CANCELED_PAID" => Ok(Self::CanceledPaid),
            "CANCELED_EXPIRED" => Ok(Self::CanceledExpired),
            _ => Err(SubTaskDomainError::UnknownTaskStatus(value.to_owned())),
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
