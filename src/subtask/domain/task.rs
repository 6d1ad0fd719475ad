//! Parent task aggregate.

use super::{TaskId, TaskStatus, TaskType, TaskUid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Work order grouping one or more sub-tasks for a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    id: TaskId,
    uid: TaskUid,
    code: String,
    task_type: TaskType,
    status: TaskStatus,
    customer_id: Option<i64>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Parameter object for reconstructing a persisted task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedTaskData {
    /// Row identifier.
    pub id: TaskId,
    /// Public identifier.
    pub uid: TaskUid,
    /// Human-readable task code.
    pub code: String,
    /// Task type.
    pub task_type: TaskType,
    /// Lifecycle status.
    pub status: TaskStatus,
    /// Customer the task serves.
    pub customer_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Latest update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Reconstructs a task from persisted storage.
    #[must_use]
    pub fn from_persisted(data: PersistedTaskData) -> Self {
        Self {
            id: data.id,
            uid: data.uid,
            code: data.code,
            task_type: data.task_type,
            status: data.status,
            customer_id: data.customer_id,
            created_at: data.created_at,
            updated_at: data.updated_at,
        }
    }

    /// Returns the row identifier.
    #[must_use]
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Returns the public identifier.
    #[must_use]
    pub const fn uid(&self) -> TaskUid {
        self.uid
    }

    /// Returns the task code.
    #[must_use]
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Returns the task type.
    #[must_use]
    pub const fn task_type(&self) -> TaskType {
        self.task_type
    }

    /// Returns the lifecycle status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Returns the customer identifier.
    #[must_use]
    pub const fn customer_id(&self) -> Option<i64> {
        self.customer_id
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

    /// Moves the task to a new status.
    pub const fn set_status(&mut self, status: TaskStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}

/// Values for inserting a new task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTask {
    /// Public identifier.
    pub uid: TaskUid,
    /// Human-readable task code.
    pub code: String,
    /// Task type.
    pub task_type: TaskType,
    /// Customer the task serves.
    pub customer_id: Option<i64>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl NewTask {
    /// Creates insert values for a task waiting for assignment.
    #[must_use]
    pub fn new(code: impl Into<String>, task_type: TaskType, created_at: DateTime<Utc>) -> Self {
        Self {
            uid: TaskUid::new(),
            code: code.into(),
            task_type,
            customer_id: None,
            created_at,
        }
    }

    /// Sets the customer identifier.
    #[must_use]
    pub const fn with_customer_id(mut self, customer_id: i64) -> Self {
        self.customer_id = Some(customer_id);
        self
    }
}
