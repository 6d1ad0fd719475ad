//! Sub-task aggregate and its lifecycle bookkeeping.

use super::{
    ActorRef, ActorSnapshot, CustomerScope, RoleKind, SubTaskDomainError, SubTaskId,
    SubTaskReportId, SubTaskReportUid, SubTaskStatus, SubTaskType, SubTaskUid, Task, TaskId,
    TaskUid,
};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Reference to a persisted report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReportRef {
    /// Report row identifier.
    pub id: SubTaskReportId,
    /// Report public identifier.
    pub uid: SubTaskReportUid,
}

/// Customer attributes copied onto the sub-task at creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    /// Customer row identifier.
    pub customer_id: Option<i64>,
    /// Customer registration number.
    pub registration_number: Option<String>,
    /// Sales area code.
    pub sales_area_code: Option<String>,
    /// Province location code.
    pub province_location_code: Option<String>,
    /// Regency location code.
    pub kabupaten_location_code: Option<String>,
    /// District location code.
    pub kecamatan_location_code: Option<String>,
    /// Village location code.
    pub kelurahan_location_code: Option<String>,
}

impl CustomerSnapshot {
    /// Returns the known location codes, broadest first.
    #[must_use]
    pub fn location_codes(&self) -> Vec<String> {
        [
            &self.province_location_code,
            &self.kabupaten_location_code,
            &self.kecamatan_location_code,
            &self.kelurahan_location_code,
        ]
        .into_iter()
        .flatten()
        .cloned()
        .collect()
    }
}

/// Planned visit window.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schedule {
    /// Earliest planned visit date.
    pub start_date: Option<NaiveDate>,
    /// Latest planned visit date.
    pub end_date: Option<NaiveDate>,
}

/// Lifecycle milestones maintained as transitions are recorded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestones {
    /// When work last entered `WORKING`.
    pub working_start_at: Option<DateTime<Utc>>,
    /// When work last left `WORKING`.
    pub working_end_at: Option<DateTime<Utc>>,
    /// When work was last paused.
    pub last_pause_start_at: Option<DateTime<Utc>>,
    /// When work was last resumed.
    pub last_pause_end_at: Option<DateTime<Utc>>,
    /// When reworking last ended.
    pub last_reworking_end_at: Option<DateTime<Utc>>,
    /// When the first fix started.
    pub first_fixing_start_at: Option<DateTime<Utc>>,
    /// When fixing last ended.
    pub last_fixing_end_at: Option<DateTime<Utc>>,
    /// Number of fix rounds.
    pub fix_count: i32,
    /// Set once work has been submitted for verification.
    pub is_working_finish: bool,
    /// When supervisor verification last concluded.
    pub last_verification_end_at: Option<DateTime<Utc>>,
    /// Outcome of the last supervisor verification.
    pub is_verification_success: Option<bool>,
    /// When CGP verification last concluded.
    pub last_cgp_verification_end_at: Option<DateTime<Utc>>,
    /// Outcome of the last CGP verification.
    pub is_cgp_verification_success: Option<bool>,
    /// When the sub-task was last canceled.
    pub last_canceled_at: Option<DateTime<Utc>>,
    /// When the sub-task was completed or closed by the customer.
    pub completed_at: Option<DateTime<Utc>>,
}

impl Milestones {
    fn leave(&mut self, status: SubTaskStatus, at: DateTime<Utc>) {
        match status {
            SubTaskStatus::Working => self.working_end_at = Some(at),
            SubTaskStatus::Reworking => self.last_reworking_end_at = Some(at),
            SubTaskStatus::Fixing => self.last_fixing_end_at = Some(at),
            SubTaskStatus::Paused => self.last_pause_end_at = Some(at),
            _ => {}
        }
    }

    fn enter(&mut self, status: SubTaskStatus, at: DateTime<Utc>) {
        match status {
            SubTaskStatus::Working => self.working_start_at = Some(at),
            SubTaskStatus::Paused => self.last_pause_start_at = Some(at),
            SubTaskStatus::WaitingVerification => self.is_working_finish = true,
            SubTaskStatus::VerificationSuccess | SubTaskStatus::VerificationFail => {
                self.last_verification_end_at = Some(at);
                self.is_verification_success =
                    Some(status == SubTaskStatus::VerificationSuccess);
            }
            SubTaskStatus::Fixing => {
                self.fix_count = self.fix_count.saturating_add(1);
                self.first_fixing_start_at.get_or_insert(at);
            }
            SubTaskStatus::CgpVerificationSuccess => {
                self.last_cgp_verification_end_at = Some(at);
                self.is_cgp_verification_success = Some(true);
                self.completed_at = Some(at);
            }
            SubTaskStatus::CgpVerificationFail => {
                self.last_cgp_verification_end_at = Some(at);
                self.is_cgp_verification_success = Some(false);
            }
            SubTaskStatus::CanceledByCustomer => {
                self.last_canceled_at = Some(at);
                self.completed_at = Some(at);
            }
            SubTaskStatus::Completed => self.completed_at = Some(at),
            other if other.is_canceled() => self.last_canceled_at = Some(at),
            _ => {}
        }
    }
}

/// Change to the field executor requested by a transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutorChange {
    /// Leave the field executor untouched.
    Keep,
    /// Make the given user the field executor.
    Assign(ActorRef),
    /// Remove the field executor.
    Clear,
}

/// Everything the sub-task needs to record a committed transition.
#[derive(Debug, Clone)]
pub struct StatusChange<'a> {
    /// Status being entered.
    pub target: SubTaskStatus,
    /// Report filed with the transition.
    pub report: ReportRef,
    /// Whether the report carries the sub-task form.
    pub form_report: bool,
    /// Actor driving the transition.
    pub actor: &'a ActorSnapshot,
    /// Requested field executor change.
    pub executor: ExecutorChange,
    /// Business timestamp of the event.
    pub at: DateTime<Utc>,
    /// Wall-clock time of the write.
    pub now: DateTime<Utc>,
}

/// Unit of field work whose status only the state engine changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTask {
    id: SubTaskId,
    uid: SubTaskUid,
    task_id: TaskId,
    task_uid: TaskUid,
    sub_task_type: SubTaskType,
    status: SubTaskStatus,
    last_field_executor: Option<ActorRef>,
    last_field_supervisor: Option<ActorRef>,
    last_cgp_user: Option<ActorRef>,
    last_sub_task_report: Option<ReportRef>,
    last_form_report: Option<ReportRef>,
    customer: CustomerSnapshot,
    schedule: Schedule,
    milestones: Milestones,
    is_deleted: bool,
    version: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted sub-task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedSubTaskData {
    /// Row identifier.
    pub id: SubTaskId,
    /// Public identifier.
    pub uid: SubTaskUid,
    /// Parent task row identifier.
    pub task_id: TaskId,
    /// Parent task public identifier.
    pub task_uid: TaskUid,
    /// Sub-task type.
    pub sub_task_type: SubTaskType,
    /// Lifecycle status.
    pub status: SubTaskStatus,
    /// Current field executor.
    pub last_field_executor: Option<ActorRef>,
    /// Supervisor who last verified.
    pub last_field_supervisor: Option<ActorRef>,
    /// CGP user who last verified.
    pub last_cgp_user: Option<ActorRef>,
    /// Most recent report.
    pub last_sub_task_report: Option<ReportRef>,
    /// Most recent form report.
    pub last_form_report: Option<ReportRef>,
    /// Customer attributes.
    pub customer: CustomerSnapshot,
    /// Planned visit window.
    pub schedule: Schedule,
    /// Lifecycle milestones.
    pub milestones: Milestones,
    /// Soft-delete flag.
    pub is_deleted: bool,
    /// Optimistic concurrency version.
    pub version: i64,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl SubTask {
    /// Reconstructs a sub-task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedSubTaskData) -> Self {
        Self {
            id: data.id,
            uid: data.uid,
            task_id: data.task_id,
            task_uid: data.task_uid,
            sub_task_type: data.sub_task_type,
            status: data.status,
            last_field_executor: data.last_field_executor,
            last_field_supervisor: data.last_field_supervisor,
            last_cgp_user: data.last_cgp_user,
            last_sub_task_report: data.last_sub_task_report,
            last_form_report: data.last_form_report,
            customer: data.customer,
            schedule: data.schedule,
            milestones: data.milestones,
            is_deleted: data.is_deleted,
            version: data.version,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the row identifier.
    #[must_use]
    pub const fn id(&self) -> SubTaskId {
        self.id
    }

    /// Returns the public identifier.
    #[must_use]
    pub const fn uid(&self) -> SubTaskUid {
        self.uid
    }

    /// Returns the parent task row identifier.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the parent task public identifier.
    #[must_use]
    pub const fn task_uid(&self) -> TaskUid {
        self.task_uid
    }

    /// Returns the sub-task type.
    #[must_use]
    pub const fn sub_task_type(&self) -> SubTaskType {
        self.sub_task_type
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> SubTaskStatus {
        self.status
    }

    /// Returns the current field executor.
    #[must_use]
    pub const fn last_field_executor(&self) -> Option<&ActorRef> {
        self.last_field_executor.as_ref()
    }

    /// Returns the supervisor who last verified the sub-task.
    #[must_use]
    pub const fn last_field_supervisor(&self) -> Option<&ActorRef> {
        self.last_field_supervisor.as_ref()
    }

    /// Returns the CGP user who last verified the sub-task.
    #[must_use]
    pub const fn last_cgp_user(&self) -> Option<&ActorRef> {
        self.last_cgp_user.as_ref()
    }

    /// Returns the most recent report.
    #[must_use]
    pub const fn last_sub_task_report(&self) -> Option<ReportRef> {
        self.last_sub_task_report
    }

    /// Returns the most recent form report.
    #[must_use]
    pub const fn last_form_report(&self) -> Option<ReportRef> {
        self.last_form_report
    }

    /// Returns the customer attributes.
    #[must_use]
    pub const fn customer(&self) -> &CustomerSnapshot {
        &self.customer
    }

    /// Returns the planned visit window.
    #[must_use]
    pub const fn schedule(&self) -> Schedule {
        self.schedule
    }

    /// Returns the lifecycle milestones.
    #[must_use]
    pub const fn milestones(&self) -> &Milestones {
        &self.milestones
    }

    /// Returns the soft-delete flag.
    #[must_use]
    pub const fn is_deleted(&self) -> bool {
        self.is_deleted
    }

    /// Returns the optimistic concurrency version.
    #[must_use]
    pub const fn version(&self) -> i64 {
        self.version
    }

    /// Returns the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the latest update timestamp.
    #[must_use]
    pub const fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Returns the attributes a supervisor scope is matched against.
    ///
    /// Returns `None` when the denormalized sales area or every location
    /// code is missing.
    #[must_use]
    pub fn customer_scope(&self) -> Option<CustomerScope> {
        let sales_area_code = self.customer.sales_area_code.clone()?;
        let location_codes = self.customer.location_codes();
        if location_codes.is_empty() {
            return None;
        }
        Some(CustomerScope {
            sub_task_type: self.sub_task_type,
            sales_area_code,
            location_codes,
        })
    }

    /// Soft-deletes the sub-task; the engine refuses to transition it
    /// afterwards.
    pub const fn mark_deleted(&mut self, now: DateTime<Utc>) {
        self.is_deleted = true;
        self.version = self.version.saturating_add(1);
        self.updated_at = now;
    }

    /// Replaces the planned visit window.
    pub const fn reschedule(&mut self, schedule: Schedule, now: DateTime<Utc>) {
        self.schedule = schedule;
        self.version = self.version.saturating_add(1);
        self.updated_at = now;
    }

    /// Records a committed transition on the row image.
    ///
    /// Milestones only move when the status changes; in-place edits keep
    /// them untouched.
    pub fn record_transition(&mut self, change: StatusChange<'_>) {
        let from = self.status;
        if from != change.target {
            self.milestones.leave(from, change.at);
            self.milestones.enter(change.target, change.at);
        }

        match change.actor.role {
            RoleKind::FieldSupervisor => self.last_field_supervisor = change.actor.as_actor_ref(),
            RoleKind::Cgp => self.last_cgp_user = change.actor.as_actor_ref(),
            _ => {}
        }

        match change.executor {
            ExecutorChange::Keep => {}
            ExecutorChange::Assign(executor) => self.last_field_executor = Some(executor),
            ExecutorChange::Clear => self.last_field_executor = None,
        }
        if change.target == SubTaskStatus::WaitingAssignment {
            self.last_field_executor = None;
            self.last_field_supervisor = None;
        }

        self.last_sub_task_report = Some(change.report);
        if change.form_report || change.target == SubTaskStatus::WaitingVerification {
            self.last_form_report = Some(change.report);
        }
        self.status = change.target;
        self.version = self.version.saturating_add(1);
        self.updated_at = change.now;
    }
}

/// Values for inserting a new sub-task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSubTask {
    /// Public identifier.
    pub uid: SubTaskUid,
    /// Parent task row identifier.
    pub task_id: TaskId,
    /// Parent task public identifier.
    pub task_uid: TaskUid,
    /// Sub-task type.
    pub sub_task_type: SubTaskType,
    /// Initial status.
    pub status: SubTaskStatus,
    /// Customer attributes.
    pub customer: CustomerSnapshot,
    /// Planned visit window.
    pub schedule: Schedule,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewSubTask {
    /// Creates insert values for a sub-task of `task`.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskDomainError::InvalidInitialStatus`] unless `status`
    /// is a pre-assignment status, or
    /// [`SubTaskDomainError::SubTaskTypeMismatch`] when the sub-task type
    /// belongs to another task type.
    pub fn new(
        task: &Task,
        sub_task_type: SubTaskType,
        status: SubTaskStatus,
        created_at: DateTime<Utc>,
    ) -> Result<Self, SubTaskDomainError> {
        if !SubTaskStatus::INITIAL.contains(&status) {
            return Err(SubTaskDomainError::InvalidInitialStatus(status));
        }
        if sub_task_type.task_type() != task.task_type() {
            return Err(SubTaskDomainError::SubTaskTypeMismatch {
                sub_task_type,
                task_type: task.task_type(),
            });
        }
        Ok(Self {
            uid: SubTaskUid::new(),
            task_id: task.id(),
            task_uid: task.uid(),
            sub_task_type,
            status,
            customer: CustomerSnapshot::default(),
            schedule: Schedule::default(),
            created_at,
        })
    }

    /// Sets the customer attributes.
    #[must_use]
    pub fn with_customer(mut self, customer: CustomerSnapshot) -> Self {
        self.customer = customer;
        self
    }

    /// Sets the planned visit window.
    #[must_use]
    pub const fn with_schedule(mut self, schedule: Schedule) -> Self {
        self.schedule = schedule;
        self
    }

    /// Materializes the sub-task once storage has assigned its row id.
    #[must_use]
    pub fn into_sub_task(self, id: SubTaskId) -> SubTask {
        SubTask::from_persisted(PersistedSubTaskData {
            id,
            uid: self.uid,
            task_id: self.task_id,
            task_uid: self.task_uid,
            sub_task_type: self.sub_task_type,
            status: self.status,
            last_field_executor: None,
            last_field_supervisor: None,
            last_cgp_user: None,
            last_sub_task_report: None,
            last_form_report: None,
            customer: self.customer,
            schedule: self.schedule,
            milestones: Milestones::default(),
            is_deleted: false,
            version: 0,
            created_at: self.created_at,
            updated_at: self.created_at,
        })
    }
}
