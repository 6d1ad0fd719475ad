//! Diesel schema for sub-task lifecycle persistence.

diesel::table! {
    /// Parent work orders.
    tasks (id) {
        /// Row identifier.
        id -> Int8,
        /// Public identifier.
        uid -> Uuid,
        /// Human-readable task code.
        #[max_length = 64]
        code -> Varchar,
        /// Task type code.
        #[max_length = 20]
        task_type -> Varchar,
        /// Task lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Customer row identifier.
        customer_id -> Nullable<Int8>,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Sub-task rows; only the state engine writes `status`.
    sub_tasks (id) {
        /// Row identifier.
        id -> Int8,
        /// Public identifier.
        uid -> Uuid,
        /// Parent task row identifier.
        task_id -> Int8,
        /// Parent task public identifier.
        task_uid -> Uuid,
        /// Sub-task type code.
        #[max_length = 20]
        sub_task_type -> Varchar,
        /// Sub-task lifecycle status.
        #[max_length = 50]
        status -> Varchar,
        /// Current field executor reference.
        last_field_executor -> Nullable<Jsonb>,
        /// Supervisor who last verified.
        last_field_supervisor -> Nullable<Jsonb>,
        /// CGP user who last verified.
        last_cgp_user -> Nullable<Jsonb>,
        /// Most recent report row identifier.
        last_sub_task_report_id -> Nullable<Int8>,
        /// Most recent report public identifier.
        last_sub_task_report_uid -> Nullable<Uuid>,
        /// Most recent form report row identifier.
        last_form_report_id -> Nullable<Int8>,
        /// Most recent form report public identifier.
        last_form_report_uid -> Nullable<Uuid>,
        /// Denormalized customer attributes.
        customer -> Jsonb,
        /// Earliest planned visit date.
        schedule_start_date -> Nullable<Date>,
        /// Latest planned visit date.
        schedule_end_date -> Nullable<Date>,
        /// Lifecycle milestones.
        milestones -> Jsonb,
        /// Soft-delete flag.
        is_deleted -> Bool,
        /// Optimistic concurrency version.
        version -> Int8,
        /// Creation timestamp.
        created_at -> Timestamptz,
        /// Last update timestamp.
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Immutable per-transition reports.
    sub_task_reports (id) {
        /// Row identifier.
        id -> Int8,
        /// Public identifier.
        uid -> Uuid,
        /// Human-readable report code.
        #[max_length = 32]
        code -> Varchar,
        /// Sub-task row identifier.
        sub_task_id -> Int8,
        /// Sub-task public identifier.
        sub_task_uid -> Uuid,
        /// Status the transition entered.
        #[max_length = 50]
        status -> Varchar,
        /// Actor snapshot.
        actor -> Jsonb,
        /// Typed report payload.
        payload -> Jsonb,
        /// Business timestamp of the event.
        reported_at -> Timestamptz,
        /// Write timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Append-only transition ledger.
    sub_task_history_items (id) {
        /// Row identifier.
        id -> Int8,
        /// Sub-task row identifier.
        sub_task_id -> Int8,
        /// Sub-task public identifier.
        sub_task_uid -> Uuid,
        /// Status before the transition.
        #[max_length = 50]
        from_status -> Varchar,
        /// Status after the transition.
        #[max_length = 50]
        to_status -> Varchar,
        /// Business timestamp of the event.
        event_at -> Timestamptz,
        /// Acting user row identifier.
        user_id -> Nullable<Int8>,
        /// Acting user public identifier.
        user_uid -> Nullable<Uuid>,
        /// Acting user login name.
        #[max_length = 255]
        user_loginid -> Varchar,
        /// Acting user display name.
        #[max_length = 255]
        user_fullname -> Varchar,
        /// Operation label.
        #[max_length = 255]
        operation_nameid -> Varchar,
        /// Serialized transition request.
        input_parameters -> Text,
        /// Report row identifier.
        report_id -> Int8,
        /// Report public identifier.
        report_uid -> Uuid,
        /// Write timestamp.
        created_at -> Timestamptz,
    }
}

diesel::table! {
    /// Notifications waiting for delivery.
    notification_outbox (id) {
        /// Row identifier.
        id -> Int8,
        /// Recipient user row identifier.
        recipient_user_id -> Int8,
        /// Notification kind.
        #[max_length = 50]
        kind -> Varchar,
        /// Sub-task row identifier.
        sub_task_id -> Int8,
        /// Task row identifier.
        task_id -> Int8,
        /// Rendered title.
        title -> Text,
        /// Rendered body.
        body -> Text,
        /// Event key for at-most-once delivery.
        #[max_length = 64]
        dedupe_key -> Varchar,
        /// Write timestamp.
        created_at -> Timestamptz,
    }
}
