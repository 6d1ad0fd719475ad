//! Shared builders for sub-task unit tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::subtask::{
    adapters::memory::{InMemoryDirectory, InMemorySubTaskStore},
    domain::{
        ActivityReport, Actor, AssignedScope, CodeHierarchy, CustomerSnapshot,
        DebtHandlingReport, GasAppliance, GasInReport, GeoPoint, MeterIdentity,
        MeterInstallationReport, NewSubTask, NewTask, Operation, OrganizationId, OrganizationRef,
        OrganizationUid, ReportPayload, RoleKind, RoleMembership, RoleMembershipId, SkReport,
        SrReport, SubTask, SubTaskLookup, SubTaskStatus, SubTaskType, Task, TaskType, UserId,
        UserRecord, UserStatus, UserUid,
    },
    ports::{SubTaskStore, SubTaskStoreResult, TransactionIsolation},
    services::StateEngine,
};
use chrono::{Duration, NaiveDate, Utc};
use mockable::DefaultClock;

pub(super) const FIELD_EXECUTOR: UserId = UserId::new(101);
pub(super) const OTHER_FIELD_EXECUTOR: UserId = UserId::new(102);
pub(super) const SUPERVISOR: UserId = UserId::new(201);
pub(super) const CGP_USER: UserId = UserId::new(301);
pub(super) const ADMIN: UserId = UserId::new(401);

pub(super) const SALES_AREA: &str = "SA-JKT-01";
pub(super) const KELURAHAN: &str = "3171011001";

pub(super) type TestEngine = StateEngine<InMemorySubTaskStore, InMemoryDirectory, DefaultClock>;

pub(super) const CONSTRUCTION_LAYOUT: [(SubTaskType, SubTaskStatus); 4] = [
    (SubTaskType::Sk, SubTaskStatus::WaitingAssignment),
    (SubTaskType::Sr, SubTaskStatus::WaitingAssignment),
    (SubTaskType::MeterInstallation, SubTaskStatus::BlockingDependency),
    (SubTaskType::GasIn, SubTaskStatus::BlockingDependency),
];

pub(super) fn user(id: UserId, loginid: &str) -> UserRecord {
    UserRecord {
        id,
        uid: UserUid::new(),
        loginid: loginid.to_owned(),
        fullname: format!("{loginid} (test)"),
        phone: None,
        status: UserStatus::Active,
        is_deleted: false,
    }
}

pub(super) fn membership(id: i64, user_id: UserId, role: RoleKind) -> RoleMembership {
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

pub(super) fn supervisor_scope() -> AssignedScope {
    AssignedScope {
        expertise: SubTaskType::ALL.into_iter().collect(),
        area_codes: BTreeSet::from([SALES_AREA.to_owned()]),
        location_codes: BTreeSet::from(["3171".to_owned()]),
    }
}

pub(super) fn location_hierarchy() -> CodeHierarchy {
    CodeHierarchy::new()
        .with_edge("31", "3171")
        .with_edge("3171", "317101")
        .with_edge("317101", KELURAHAN)
}

pub(super) fn customer() -> CustomerSnapshot {
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

/// Directory with one user per role; the supervisor covers [`customer`].
pub(super) fn seeded_directory() -> InMemoryDirectory {
    let directory = InMemoryDirectory::new();
    directory
        .set_hierarchies(CodeHierarchy::new(), location_hierarchy())
        .expect("hierarchies should be stored");
    let grants = [
        (1, FIELD_EXECUTOR, "fe.one", RoleKind::FieldExecutor),
        (2, OTHER_FIELD_EXECUTOR, "fe.two", RoleKind::FieldExecutor),
        (3, SUPERVISOR, "spv.one", RoleKind::FieldSupervisor),
        (4, CGP_USER, "cgp.one", RoleKind::Cgp),
        (5, ADMIN, "admin.one", RoleKind::Admin),
    ];
    for (membership_id, user_id, loginid, role) in grants {
        directory
            .upsert_user(user(user_id, loginid))
            .expect("user should be stored");
        let scope = if role == RoleKind::FieldSupervisor {
            supervisor_scope()
        } else {
            AssignedScope::default()
        };
        directory
            .add_membership(membership(membership_id, user_id, role), scope)
            .expect("membership should be stored");
    }
    directory
}

pub(super) fn note(text: &str) -> ReportPayload {
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

fn test_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 1).expect("valid calendar date")
}

/// Returns a valid form report for the sub-task type.
pub(super) fn form_for(sub_task_type: SubTaskType) -> ReportPayload {
    let test_start_time = Utc::now() - Duration::hours(2);
    let test_end_time = test_start_time + Duration::minutes(30);
    match sub_task_type {
        SubTaskType::Sk => ReportPayload::Sk(SkReport {
            pipe_length: 12.5,
            extra_pipe_length: 0.0,
            test_start_time,
            test_end_time,
            test_pressure: 1.5,
            finished_date: test_date(),
            gas_appliances: vec![GasAppliance {
                appliance_id: 1,
                quantity: 1,
            }],
        }),
        SubTaskType::Sr => ReportPayload::Sr(SrReport {
            tapping_saddle_id: 4,
            tapping_saddle_custom: None,
            test_start_time,
            test_end_time,
            test_pressure: 2.0,
            branch_pipe_available: true,
            finished_date: test_date(),
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
                regulator_size_inch: Some(0.75),
            })
        }
        SubTaskType::GasIn => ReportPayload::GasIn(GasInReport {
            meter: meter(),
            pmax: 0.1,
            stand_meter_start_number: 0.0,
            pressure_start: 0.02,
            temperature_start: 27.0,
            meter_location: GeoPoint {
                latitude: -6.2,
                longitude: 106.8,
            },
            gas_in_date: test_date(),
            gas_appliances: Vec::new(),
        }),
        SubTaskType::StopGasFlow
        | SubTaskType::RemoveGasMeter
        | SubTaskType::OpenGasFlow
        | SubTaskType::ReinstallGasMeter => ReportPayload::DebtHandling(DebtHandlingReport {
            meter: meter(),
            stand_meter_number: 1520.5,
            pressure: None,
            temperature: None,
            location: None,
            seal_no: Some("SEAL-77".to_owned()),
            condition: "meter sealed".to_owned(),
            condition_notes: None,
        }),
    }
}

/// Engine over an in-memory store and [`seeded_directory`].
pub(super) struct Harness {
    pub(super) engine: TestEngine,
    pub(super) store: Arc<InMemorySubTaskStore>,
}

impl Harness {
    pub(super) fn new() -> Self {
        let store = Arc::new(InMemorySubTaskStore::new());
        let engine = StateEngine::new(
            Arc::clone(&store),
            Arc::new(seeded_directory()),
            Arc::new(DefaultClock),
        );
        Self { engine, store }
    }

    pub(super) fn with_engine(mut self, build: impl FnOnce(TestEngine) -> TestEngine) -> Self {
        self.engine = build(self.engine);
        self
    }

    pub(super) async fn seed_task(
        &self,
        task_type: TaskType,
        layout: &[(SubTaskType, SubTaskStatus)],
    ) -> (Task, Vec<SubTask>) {
        let created_at = Utc::now();
        let task = self
            .store
            .in_transaction(TransactionIsolation::ReadCommitted, move |tx| {
                tx.insert_task(NewTask::new("TSK-0001", task_type, created_at).with_customer_id(7))
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
            .expect("sub-task layout should be valid");
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

    pub(super) async fn construction(&self) -> (Task, Vec<SubTask>) {
        self.seed_task(TaskType::Construction, &CONSTRUCTION_LAYOUT)
            .await
    }

    /// Performs `operations` in order with the default actor of each role.
    pub(super) async fn advance(&self, sub_task: &SubTask, operations: &[Operation]) -> SubTask {
        let mut current = sub_task.clone();
        for operation in operations {
            let rule = operation.rule();
            let payload = if rule.requires_form {
                form_for(sub_task.sub_task_type())
            } else {
                note("step")
            };
            current = self
                .engine
                .perform(
                    sub_task.id(),
                    actor_for(rule.required_role),
                    Utc::now(),
                    *operation,
                    payload,
                )
                .await
                .unwrap_or_else(|err| panic!("{operation} should succeed: {err}"))
                .sub_task;
        }
        current
    }

    pub(super) async fn reload(&self, sub_task: &SubTask) -> SubTask {
        self.store
            .find_sub_task(SubTaskLookup::Id(sub_task.id()))
            .await
            .expect("lookup should succeed")
            .expect("sub-task should exist")
    }
}

pub(super) const fn actor_for(role: RoleKind) -> Actor {
    match role {
        RoleKind::FieldExecutor => Actor::User(FIELD_EXECUTOR),
        RoleKind::FieldSupervisor => Actor::User(SUPERVISOR),
        RoleKind::Cgp => Actor::User(CGP_USER),
        RoleKind::Admin => Actor::User(ADMIN),
        RoleKind::Any | RoleKind::None => Actor::System,
    }
}
