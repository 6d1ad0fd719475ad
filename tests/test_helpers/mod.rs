//! Shared fixtures for sub-task engine integration tests.
//!
//! Every suite seeds the same directory: one user per role, a supervisor
//! whose scope covers the test customer, a second supervisor who covers
//! another city, and a second field executor for ownership checks.
//! [`Dispatcher`] wraps an engine over any store so the in-memory and
//! `PostgreSQL` suites drive identical scenarios.

#![expect(
    dead_code,
    reason = "Each test binary uses a different subset of the helpers"
)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use mockable::DefaultClock;
use rstest::fixture;
use task_dispatcher::subtask::{
    adapters::memory::{InMemoryDirectory, InMemorySubTaskStore},
    domain::{
        ActivityReport, Actor, AssignedScope, CodeHierarchy, CustomerSnapshot, DebtHandlingReport,
        GasAppliance, GasInReport, GeoPoint, MeterIdentity, MeterInstallationReport, NewSubTask,
        NewTask, Operation, OrganizationId, OrganizationRef, OrganizationUid, ReportPayload,
        RoleKind, RoleMembership, RoleMembershipId, SkReport, SrReport, SubTask, SubTaskLookup,
        SubTaskStatus, SubTaskType, Task, TaskType, UserId, UserRecord, UserStatus, UserUid,
    },
    ports::{SubTaskStore, SubTaskStoreResult, TransactionIsolation},
    services::{StateEngine, TransitionOutcome, TransitionResult},
};

/// Field executor who owns sub-tasks in most scenarios.
pub const FIELD_EXECUTOR: UserId = UserId::new(101);
/// Second field executor, used for ownership checks.
pub const OTHER_FIELD_EXECUTOR: UserId = UserId::new(102);
/// Supervisor covering [`customer`].
pub const SUPERVISOR: UserId = UserId::new(201);
/// Supervisor assigned to another sales area and city.
pub const REMOTE_SUPERVISOR: UserId = UserId::new(202);
/// CGP reviewer.
pub const CGP_USER: UserId = UserId::new(301);
/// Administrator.
pub const ADMIN: UserId = UserId::new(401);

const SALES_AREA: &str = "SA-JKT-01";
const KELURAHAN: &str = "3171011001";
const REMOTE_SALES_AREA: &str = "SA-BDG-02";
const REMOTE_CITY: &str = "3273";

/// Construction sub-tasks as a new work order lays them out.
pub const CONSTRUCTION_LAYOUT: [(SubTaskType, SubTaskStatus); 4] = [
    (SubTaskType::Sk, SubTaskStatus::WaitingAssignment),
    (SubTaskType::Sr, SubTaskStatus::WaitingAssignment),
    (SubTaskType::MeterInstallation, SubTaskStatus::BlockingDependency),
    (SubTaskType::GasIn, SubTaskStatus::BlockingDependency),
];

/// Debt-management sub-tasks, all open for picking.
pub const DEBT_LAYOUT: [(SubTaskType, SubTaskStatus); 2] = [
    (SubTaskType::StopGasFlow, SubTaskStatus::WaitingAssignment),
    (SubTaskType::RemoveGasMeter, SubTaskStatus::WaitingAssignment),
];

/// Happy path from an open sub-task to CGP acceptance.
pub const TO_CGP_ACCEPTED: [Operation; 5] = [
    Operation::Pick,
    Operation::WorkingStart,
    Operation::WorkingFinish,
    Operation::VerifySuccess,
    Operation::CgpVerifySuccess,
];

fn user(id: UserId, loginid: &str) -> UserRecord {
    UserRecord {
        id,
        uid: UserUid::new(),
        loginid: loginid.to_owned(),
        fullname: format!("{loginid} (integration)"),
        phone: Some("+62-21-555-0100".to_owned()),
        status: UserStatus::Active,
        is_deleted: false,
    }
}

fn membership(id: i64, user_id: UserId, role: RoleKind) -> RoleMembership {
    RoleMembership {
        id: RoleMembershipId::new(id),
        user_id,
        role,
        organization: OrganizationRef {
            id: OrganizationId::new(1),
            uid: OrganizationUid::new(),
            name: "PT Field Contractor".to_owned(),
        },
    }
}

/// Customer inside the supervisor's sales area and city.
#[must_use]
pub fn customer() -> CustomerSnapshot {
    CustomerSnapshot {
        customer_id: Some(7),
        registration_number: Some("PLG-0007".to_owned()),
        sales_area_code: Some(SALES_AREA.to_owned()),
        province_location_code: None,
        kabupaten_location_code: None,
        kecamatan_location_code: None,
        kelurahan_location_code: Some(KELURAHAN.to_owned()),
    }
}

fn supervisor_scope(area_code: &str, location_code: &str) -> AssignedScope {
    AssignedScope {
        expertise: SubTaskType::ALL.into_iter().collect(),
        area_codes: BTreeSet::from([area_code.to_owned()]),
        location_codes: BTreeSet::from([location_code.to_owned()]),
    }
}

/// Directory with one user per role, plus a supervisor who covers a
/// different sales area and city than [`customer`].
///
/// # Panics
///
/// Panics if the in-memory directory rejects the seed data.
#[must_use]
pub fn seeded_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    let locations = CodeHierarchy::new()
        .with_edge("31", "3171")
        .with_edge("3171", "317101")
        .with_edge("317101", KELURAHAN);
    directory
        .set_hierarchies(CodeHierarchy::new(), locations)
        .expect("hierarchies should be stored");

    let grants = [
        (1, FIELD_EXECUTOR, "fe.one", RoleKind::FieldExecutor),
        (2, OTHER_FIELD_EXECUTOR, "fe.two", RoleKind::FieldExecutor),
        (3, SUPERVISOR, "spv.one", RoleKind::FieldSupervisor),
        (4, CGP_USER, "cgp.one", RoleKind::Cgp),
        (5, ADMIN, "admin.one", RoleKind::Admin),
        (6, REMOTE_SUPERVISOR, "spv.bdg", RoleKind::FieldSupervisor),
    ];
    for (membership_id, user_id, loginid, role) in grants {
        directory
            .upsert_user(user(user_id, loginid))
            .expect("user should be stored");
        let scope = if role != RoleKind::FieldSupervisor {
            AssignedScope::default()
        } else if user_id == REMOTE_SUPERVISOR {
            supervisor_scope(REMOTE_SALES_AREA, REMOTE_CITY)
        } else {
            supervisor_scope(SALES_AREA, "3171")
        };
        directory
            .add_membership(membership(membership_id, user_id, role), scope)
            .expect("membership should be stored");
    }
    directory
}

/// Free-form activity report.
#[must_use]
pub fn note(text: &str) -> ReportPayload {
    ReportPayload::Activity(ActivityReport::note(text))
}

fn meter() -> MeterIdentity {
    MeterIdentity {
        meter_id: 12,
        meter_brand: "Itron".to_owned(),
        sn_meter: "SN-000123".to_owned(),
        g_size_id: 2,
    }
}

/// Valid form report for the sub-task type.
///
/// # Panics
///
/// Never in practice; the calendar date is fixed.
#[must_use]
pub fn form_for(sub_task_type: SubTaskType) -> ReportPayload {
    let test_start_time = Utc::now() - Duration::hours(3);
    let test_end_time = test_start_time + Duration::minutes(45);
    let finished_date = NaiveDate::from_ymd_opt(2026, 10, 2).expect("valid calendar date");
    match sub_task_type {
        SubTaskType::Sk => ReportPayload::Sk(SkReport {
            pipe_length: 9.0,
            extra_pipe_length: 1.5,
            test_start_time,
            test_end_time,
            test_pressure: 1.5,
            finished_date,
            gas_appliances: vec![GasAppliance {
                appliance_id: 3,
                quantity: 2,
            }],
        }),
        SubTaskType::Sr => ReportPayload::Sr(SrReport {
            tapping_saddle_id: 4,
            tapping_saddle_custom: None,
            test_start_time,
            test_end_time,
            test_pressure: 2.0,
            branch_pipe_available: false,
            finished_date,
        }),
        SubTaskType::MeterInstallation => {
            ReportPayload::MeterInstallation(MeterInstallationReport {
                meter: meter(),
                qmin: 0.04,
                qmax: 6.0,
                pmax: 0.1,
                start_calibration_month: 9,
                start_calibration_year: 2026,
                regulator_brand: "Francel".to_owned(),
                regulator_size_inch: None,
            })
        }
        SubTaskType::GasIn => ReportPayload::GasIn(GasInReport {
            meter: meter(),
            pmax: 0.1,
            stand_meter_start_number: 0.0,
            pressure_start: 0.02,
            temperature_start: 28.5,
            meter_location: GeoPoint {
                latitude: -6.21,
                longitude: 106.85,
            },
            gas_in_date: finished_date,
            gas_appliances: Vec::new(),
        }),
        SubTaskType::StopGasFlow
        | SubTaskType::RemoveGasMeter
        | SubTaskType::OpenGasFlow
        | SubTaskType::ReinstallGasMeter => ReportPayload::DebtHandling(DebtHandlingReport {
            meter: meter(),
            stand_meter_number: 2210.0,
            pressure: Some(0.02),
            temperature: None,
            location: None,
            seal_no: Some("SEAL-91".to_owned()),
            condition: "valve locked".to_owned(),
            condition_notes: None,
        }),
    }
}

/// Default actor holding `role`.
#[must_use]
pub const fn actor_for(role: RoleKind) -> Actor {
    match role {
        RoleKind::FieldExecutor => Actor::User(FIELD_EXECUTOR),
        RoleKind::FieldSupervisor => Actor::User(SUPERVISOR),
        RoleKind::Cgp => Actor::User(CGP_USER),
        RoleKind::Admin => Actor::User(ADMIN),
        RoleKind::Any | RoleKind::None => Actor::System,
    }
}

/// Payload an operation's rule accepts for `sub_task_type`.
#[must_use]
pub fn payload_for(operation: Operation, sub_task_type: SubTaskType) -> ReportPayload {
    if operation.rule().requires_form {
        form_for(sub_task_type)
    } else {
        note(&format!("{operation} from integration test"))
    }
}

/// Engine type driven by the suites.
pub type TestEngine<S> = StateEngine<S, InMemoryDirectory, DefaultClock>;

/// Engine plus direct store access for seeding and inspection.
pub struct Dispatcher<S: SubTaskStore> {
    /// Engine under test.
    pub engine: TestEngine<S>,
    /// Store the engine writes to.
    pub store: Arc<S>,
}

impl<S: SubTaskStore> Dispatcher<S> {
    /// Builds an engine over `store` and [`seeded_directory`].
    #[must_use]
    pub fn new(store: S) -> Self {
        let store = Arc::new(store);
        let engine = StateEngine::new(
            Arc::clone(&store),
            Arc::new(seeded_directory()),
            Arc::new(DefaultClock),
        );
        Self { engine, store }
    }

    /// Inserts a task and its sub-tasks for [`customer`].
    ///
    /// # Panics
    ///
    /// Panics if the store rejects the seed rows.
    pub async fn seed_task(
        &self,
        code: &str,
        task_type: TaskType,
        layout: &[(SubTaskType, SubTaskStatus)],
    ) -> (Task, Vec<SubTask>) {
        let created_at = Utc::now();
        let new_task = NewTask::new(code, task_type, created_at).with_customer_id(7);
        let task = self
            .store
            .in_transaction(TransactionIsolation::ReadCommitted, move |tx| {
                tx.insert_task(new_task)
            })
            .await
            .expect("task should be inserted");

        let new_sub_tasks = layout
            .iter()
            .map(|(sub_task_type, status)| {
                NewSubTask::new(&task, *sub_task_type, *status, created_at)
                    .map(|new_sub_task| new_sub_task.with_customer(customer()))
            })
            .collect::<Result<Vec<_>, _>>()
            .expect("sub-task layout should match the task type");
        let sub_tasks = self
            .store
            .in_transaction(TransactionIsolation::ReadCommitted, move |tx| {
                new_sub_tasks
                    .into_iter()
                    .map(|new_sub_task| tx.insert_sub_task(new_sub_task))
                    .collect::<SubTaskStoreResult<Vec<_>>>()
            })
            .await
            .expect("sub-tasks should be inserted");
        (task, sub_tasks)
    }

    /// Seeds a construction task laid out like a fresh work order.
    pub async fn construction(&self, code: &str) -> (Task, Vec<SubTask>) {
        self.seed_task(code, TaskType::Construction, &CONSTRUCTION_LAYOUT)
            .await
    }

    /// Performs one operation as the default actor of its role.
    ///
    /// # Errors
    ///
    /// Returns the engine's error unchanged.
    pub async fn step(
        &self,
        sub_task: &SubTask,
        operation: Operation,
    ) -> TransitionResult<TransitionOutcome> {
        self.engine
            .perform(
                sub_task.id(),
                actor_for(operation.rule().required_role),
                Utc::now(),
                operation,
                payload_for(operation, sub_task.sub_task_type()),
            )
            .await
    }

    /// Performs `operations` in order and returns the final row.
    ///
    /// # Panics
    ///
    /// Panics when any step fails.
    pub async fn advance(&self, sub_task: &SubTask, operations: &[Operation]) -> SubTask {
        let mut current = sub_task.clone();
        for operation in operations {
            current = self
                .step(sub_task, *operation)
                .await
                .unwrap_or_else(|err| panic!("{operation} should succeed: {err}"))
                .sub_task;
        }
        current
    }

    /// Reads the committed row of `sub_task`.
    ///
    /// # Panics
    ///
    /// Panics if the row is missing or the lookup fails.
    pub async fn reload(&self, sub_task: &SubTask) -> SubTask {
        self.store
            .find_sub_task(SubTaskLookup::Id(sub_task.id()))
            .await
            .expect("lookup should succeed")
            .expect("sub-task should exist")
    }

    /// Reads the committed row of `task`.
    ///
    /// # Panics
    ///
    /// Panics if the row is missing or the lookup fails.
    pub async fn reload_task(&self, task: &Task) -> Task {
        self.store
            .find_task(task.id())
            .await
            .expect("lookup should succeed")
            .expect("task should exist")
    }
}

/// Dispatcher over a fresh in-memory store.
#[fixture]
pub fn memory_dispatcher() -> Dispatcher<InMemorySubTaskStore> {
    Dispatcher::new(InMemorySubTaskStore::new())
}

/// Returns the sub-task of `sub_task_type` from a seeded layout.
///
/// # Panics
///
/// Panics when the layout has no such sub-task.
#[must_use]
pub fn of_type(sub_tasks: &[SubTask], sub_task_type: SubTaskType) -> SubTask {
    sub_tasks
        .iter()
        .find(|sub_task| sub_task.sub_task_type() == sub_task_type)
        .cloned()
        .unwrap_or_else(|| panic!("{sub_task_type} should be seeded"))
}
