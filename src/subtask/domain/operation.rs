//! Catalogue of sub-task operations and the transition each one performs.
//!
//! Every legal edge of the sub-task lifecycle is declared here, once. The
//! engine looks the rule up by [`Operation`]; callers never spell out source
//! and target statuses ad hoc.

use super::{RoleKind, SubTaskDomainError, SubTaskStatus, TaskType};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Reason code supplied when a debt handling visit is canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CancelReason {
    /// `01`: the customer paid.
    #[serde(rename = "01")]
    Paid,
    /// `02`: the customer refused.
    #[serde(rename = "02")]
    Customer,
    /// `03`: force majeure.
    #[serde(rename = "03")]
    ForceMajeure,
    /// `04`: any other reason.
    #[serde(rename = "04")]
    Other,
}

impl CancelReason {
    /// Every cancellation reason.
    pub const ALL: [Self; 4] = [Self::Paid, Self::Customer, Self::ForceMajeure, Self::Other];

    /// Returns the two-digit reason code.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Paid => "01",
            Self::Customer => "02",
            Self::ForceMajeure => "03",
            Self::Other => "04",
        }
    }

    /// Returns the status a cancellation with this reason enters.
    #[must_use]
    pub const fn target(self) -> SubTaskStatus {
        match self {
            Self::Paid => SubTaskStatus::CanceledByPaid,
            Self::Customer => SubTaskStatus::CanceledByCustomer,
            Self::ForceMajeure => SubTaskStatus::CanceledByForceMajeure,
            Self::Other => SubTaskStatus::CanceledByOther,
        }
    }
}

impl TryFrom<&str> for CancelReason {
    type Error = SubTaskDomainError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|reason| reason.code() == trimmed)
            .ok_or_else(|| SubTaskDomainError::UnknownCancelReason(value.to_owned()))
    }
}

/// Operation a caller asks the engine to perform on a sub-task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Field executor takes an open sub-task.
    Pick,
    /// Administrator assigns an open sub-task to a field executor.
    AdminAssign,
    /// Administrator hands an owned sub-task to another field executor.
    AdminReplaceFieldExecutor,
    /// Field executor starts work.
    WorkingStart,
    /// Field executor pauses work.
    Pause,
    /// Field executor resumes paused work.
    Resume,
    /// Field executor submits the finished work.
    WorkingFinish,
    /// Field executor reopens submitted work for revision.
    ReworkingStart,
    /// Field executor resubmits revised work.
    ReworkingFinish,
    /// Field executor abandons a revision and restores the submission.
    ReworkingCancel,
    /// Supervisor accepts the submission.
    VerifySuccess,
    /// Supervisor rejects the submission.
    VerifyFail,
    /// Field executor starts fixing rejected work.
    FixingStart,
    /// Field executor resubmits fixed work.
    FixingFinish,
    /// CGP accepts the submission.
    CgpVerifySuccess,
    /// CGP rejects the submission.
    CgpVerifyFail,
    /// CGP corrects the accepted form.
    CgpEditAfterVerifySuccess,
    /// Field executor gives the sub-task up.
    CancelByFieldExecutor,
    /// System reopens a sub-task its field executor gave up.
    RequeueAfterCancel,
    /// System opens a sub-task whose prerequisites finished.
    ReleaseDependency,
    /// Customer withdraws the order.
    CancelByCustomer,
    /// Field executor cancels a debt handling visit.
    CancelDebtHandling(CancelReason),
    /// System expires an unpicked sub-task.
    Expire,
    /// System closes a sub-task after CGP acceptance.
    Complete,
}

/// How a transition changes the field executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssignmentRule {
    /// Leave the field executor as is.
    Keep,
    /// The acting field executor becomes the owner.
    Actor,
    /// The caller names the new field executor.
    Requested,
    /// The field executor is removed.
    Clear,
}

/// Status a transition leaves the sub-task in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransitionTarget {
    /// Enter the given status.
    Status(SubTaskStatus),
    /// Keep the current status.
    Unchanged,
}

impl TransitionTarget {
    /// Resolves the target against the status read under lock.
    #[must_use]
    pub const fn resolve(self, current: SubTaskStatus) -> SubTaskStatus {
        match self {
            Self::Status(status) => status,
            Self::Unchanged => current,
        }
    }
}

impl fmt::Display for TransitionTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => f.write_str(status.as_str()),
            Self::Unchanged => f.write_str("(unchanged)"),
        }
    }
}

/// Declared edge set of one operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionRule {
    /// Operation the rule belongs to.
    pub operation: Operation,
    /// Statuses the operation may start from.
    pub allowed_sources: Vec<SubTaskStatus>,
    /// Status the operation enters.
    pub target: TransitionTarget,
    /// Role the actor must hold.
    pub required_role: RoleKind,
    /// Field executor change.
    pub assignment: AssignmentRule,
    /// Whether the payload must be the sub-task form.
    pub requires_form: bool,
    /// Whether the operation deliberately re-enters one of its sources.
    pub in_place: bool,
    /// Task type the sub-task must belong to, when restricted.
    pub applies_to: Option<TaskType>,
}

impl TransitionRule {
    fn new(
        operation: Operation,
        allowed_sources: &[SubTaskStatus],
        target: SubTaskStatus,
        required_role: RoleKind,
    ) -> Self {
        Self {
            operation,
            allowed_sources: allowed_sources.to_vec(),
            target: TransitionTarget::Status(target),
            required_role,
            assignment: AssignmentRule::Keep,
            requires_form: false,
            in_place: false,
            applies_to: None,
        }
    }

    const fn assigning(mut self, assignment: AssignmentRule) -> Self {
        self.assignment = assignment;
        self
    }

    const fn with_form(mut self) -> Self {
        self.requires_form = true;
        self
    }

    const fn in_place(mut self) -> Self {
        self.in_place = true;
        self
    }

    const fn only_for(mut self, task_type: TaskType) -> Self {
        self.applies_to = Some(task_type);
        self
    }

    /// Returns `true` when the rule may start from `status`.
    #[must_use]
    pub fn allows(&self, status: SubTaskStatus) -> bool {
        self.allowed_sources.contains(&status)
    }
}

const CUSTOMER_CANCELABLE: [SubTaskStatus; 9] = [
    SubTaskStatus::BlockingDependency,
    SubTaskStatus::WaitingAssignment,
    SubTaskStatus::Assigned,
    SubTaskStatus::Working,
    SubTaskStatus::Paused,
    SubTaskStatus::Reworking,
    SubTaskStatus::Fixing,
    SubTaskStatus::VerificationFail,
    SubTaskStatus::WaitingVerification,
];

const REPLACEABLE: [SubTaskStatus; 7] = [
    SubTaskStatus::Assigned,
    SubTaskStatus::Working,
    SubTaskStatus::Paused,
    SubTaskStatus::Reworking,
    SubTaskStatus::Fixing,
    SubTaskStatus::VerificationFail,
    SubTaskStatus::CgpVerificationFail,
];

impl Operation {
    /// Returns every catalogued operation, one entry per cancel reason.
    #[must_use]
    pub fn catalogue() -> Vec<Self> {
        let mut operations = vec![
            Self::Pick,
            Self::AdminAssign,
            Self::AdminReplaceFieldExecutor,
            Self::WorkingStart,
            Self::Pause,
            Self::Resume,
            Self::WorkingFinish,
            Self::ReworkingStart,
            Self::ReworkingFinish,
            Self::ReworkingCancel,
            Self::VerifySuccess,
            Self::VerifyFail,
            Self::FixingStart,
            Self::FixingFinish,
            Self::CgpVerifySuccess,
            Self::CgpVerifyFail,
            Self::CgpEditAfterVerifySuccess,
            Self::CancelByFieldExecutor,
            Self::RequeueAfterCancel,
            Self::ReleaseDependency,
            Self::CancelByCustomer,
        ];
        operations.extend(CancelReason::ALL.map(Self::CancelDebtHandling));
        operations.extend([Self::Expire, Self::Complete]);
        operations
    }

    /// Returns the label persisted as the history `operation_nameid`.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pick => "USER.SUB_TASK.PICK",
            Self::AdminAssign => "ADMIN.SUB_TASK.ASSIGN_TO_FIELD_EXECUTOR",
            Self::AdminReplaceFieldExecutor => "ADMIN.SUB_TASK.REPLACE_FIELD_EXECUTOR",
            Self::WorkingStart => "USER.SUB_TASK.WORKING_START",
            Self::Pause => "USER.SUB_TASK.PAUSE",
            Self::Resume => "USER.SUB_TASK.RESUME",
            Self::WorkingFinish => "USER.SUB_TASK.WORKING_FINISH",
            Self::ReworkingStart => "USER.SUB_TASK.REWORKING_START",
            Self::ReworkingFinish => "USER.SUB_TASK.REWORKING_FINISH",
            Self::ReworkingCancel => "USER.SUB_TASK.REWORKING_CANCEL",
            Self::VerifySuccess => "USER.SUB_TASK.VERIFY_SUCCESS",
            Self::VerifyFail => "USER.SUB_TASK.VERIFY_FAIL",
            Self::FixingStart => "USER.SUB_TASK.FIXING_START",
            Self::FixingFinish => "USER.SUB_TASK.FIXING_FINISH",
            Self::CgpVerifySuccess => "USER.SUB_TASK.CGP_VERIFY_SUCCESS",
            Self::CgpVerifyFail => "USER.SUB_TASK.CGP_VERIFY_FAIL",
            Self::CgpEditAfterVerifySuccess => "USER.SUB_TASK.CGP_EDIT_AFTER_VERIFY_SUCCESS",
            Self::CancelByFieldExecutor => "USER.SUB_TASK.CANCEL_BY_FIELD_EXECUTOR",
            Self::RequeueAfterCancel | Self::ReleaseDependency => {
                "AUTO.SUB_TASK.WAITING_ASSIGNMENT"
            }
            Self::CancelByCustomer => "USER.SUB_TASK.CANCELED_BY_CUSTOMER",
            Self::CancelDebtHandling(_) => "USER.SUB_TASK.CANCEL",
            Self::Expire => "AUTO.SUB_TASK.EXPIRE",
            Self::Complete => "AUTO.SUB_TASK.COMPLETE",
        }
    }

    /// Returns the cancellation reason for reason-parameterized operations.
    #[must_use]
    pub const fn reason(self) -> Option<CancelReason> {
        match self {
            Self::CancelDebtHandling(reason) => Some(reason),
            _ => None,
        }
    }

    /// Returns the rule this operation is declared with.
    #[must_use]
    pub fn rule(self) -> TransitionRule {
        use RoleKind::{Admin, Any, Cgp, FieldExecutor, FieldSupervisor};
        use SubTaskStatus as S;

        match self {
            Self::Pick => {
                TransitionRule::new(self, &[S::WaitingAssignment], S::Assigned, FieldExecutor)
                    .assigning(AssignmentRule::Actor)
            }
            Self::AdminAssign => {
                TransitionRule::new(self, &[S::WaitingAssignment], S::Assigned, Admin)
                    .assigning(AssignmentRule::Requested)
            }
            Self::AdminReplaceFieldExecutor => TransitionRule {
                operation: self,
                allowed_sources: REPLACEABLE.to_vec(),
                target: TransitionTarget::Unchanged,
                required_role: Admin,
                assignment: AssignmentRule::Requested,
                requires_form: false,
                in_place: true,
                applies_to: None,
            },
            Self::WorkingStart => {
                TransitionRule::new(self, &[S::Assigned], S::Working, FieldExecutor)
            }
            Self::Pause => TransitionRule::new(self, &[S::Working], S::Paused, FieldExecutor),
            Self::Resume => TransitionRule::new(self, &[S::Paused], S::Working, FieldExecutor),
            Self::WorkingFinish => {
                TransitionRule::new(self, &[S::Working], S::WaitingVerification, FieldExecutor)
                    .with_form()
            }
            Self::ReworkingStart => {
                TransitionRule::new(self, &[S::WaitingVerification], S::Reworking, FieldExecutor)
            }
            Self::ReworkingFinish => {
                TransitionRule::new(self, &[S::Reworking], S::WaitingVerification, FieldExecutor)
                    .with_form()
            }
            Self::ReworkingCancel => {
                TransitionRule::new(self, &[S::Reworking], S::WaitingVerification, FieldExecutor)
            }
            Self::VerifySuccess => TransitionRule::new(
                self,
                &[S::WaitingVerification],
                S::VerificationSuccess,
                FieldSupervisor,
            ),
            Self::VerifyFail => TransitionRule::new(
                self,
                &[S::WaitingVerification],
                S::VerificationFail,
                FieldSupervisor,
            ),
            Self::FixingStart => TransitionRule::new(
                self,
                &[S::VerificationFail, S::CgpVerificationFail],
                S::Fixing,
                FieldExecutor,
            ),
            Self::FixingFinish => {
                TransitionRule::new(self, &[S::Fixing], S::WaitingVerification, FieldExecutor)
                    .with_form()
            }
            Self::CgpVerifySuccess => TransitionRule::new(
                self,
                &[S::WaitingVerification, S::VerificationSuccess],
                S::CgpVerificationSuccess,
                Cgp,
            ),
            Self::CgpVerifyFail => TransitionRule::new(
                self,
                &[S::WaitingVerification, S::VerificationSuccess],
                S::CgpVerificationFail,
                Cgp,
            ),
            Self::CgpEditAfterVerifySuccess => TransitionRule::new(
                self,
                &[S::CgpVerificationSuccess],
                S::CgpVerificationSuccess,
                Cgp,
            )
            .with_form()
            .in_place(),
            Self::CancelByFieldExecutor => TransitionRule::new(
                self,
                &[S::Assigned, S::Working, S::Paused],
                S::CanceledByFieldExecutor,
                FieldExecutor,
            ),
            Self::RequeueAfterCancel => TransitionRule::new(
                self,
                &[S::CanceledByFieldExecutor],
                S::WaitingAssignment,
                RoleKind::None,
            )
            .assigning(AssignmentRule::Clear),
            Self::ReleaseDependency => TransitionRule::new(
                self,
                &[S::BlockingDependency],
                S::WaitingAssignment,
                RoleKind::None,
            ),
            Self::CancelByCustomer => {
                TransitionRule::new(self, &CUSTOMER_CANCELABLE, S::CanceledByCustomer, Any)
            }
            Self::CancelDebtHandling(reason) => TransitionRule::new(
                self,
                &[S::Assigned, S::Working],
                reason.target(),
                FieldExecutor,
            )
            .only_for(TaskType::DebtManagement),
            Self::Expire => TransitionRule::new(
                self,
                &SubTaskStatus::INITIAL,
                S::CanceledByExpired,
                RoleKind::None,
            ),
            Self::Complete => TransitionRule::new(
                self,
                &[S::CgpVerificationSuccess],
                S::Completed,
                RoleKind::None,
            ),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.reason() {
            Some(reason) => write!(f, "{}({})", self.label(), reason.code()),
            None => f.write_str(self.label()),
        }
    }
}
