//! Transactional store port for sub-task lifecycle persistence.
//!
//! Every engine write happens inside [`SubTaskStore::in_transaction`]. The
//! closure receives a synchronous [`SubTaskTransaction`] so adapters can run
//! it on a blocking connection; returning an error rolls everything back.

use crate::subtask::domain::{
    NewHistoryItem, NewNotification, NewSubTask, NewSubTaskReport, NewTask, Notification,
    SubTask, SubTaskHistoryItem, SubTaskId, SubTaskLookup, SubTaskReport, Task, TaskId, UserId,
};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Result type for sub-task store operations.
pub type SubTaskStoreResult<T> = Result<T, SubTaskStoreError>;

/// Isolation level requested for a transaction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TransactionIsolation {
    /// Row locks guard the sub-task; other rows may change concurrently.
    #[default]
    ReadCommitted,
    /// Conflicting concurrent transactions fail with a serialization error.
    Serializable,
}

/// Operations available inside one store transaction.
pub trait SubTaskTransaction {
    /// Loads a sub-task and holds its row lock until the transaction ends.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the lookup fails.
    fn lock_sub_task(&mut self, id: SubTaskId) -> SubTaskStoreResult<Option<SubTask>>;

    /// Loads a sub-task without locking it.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the lookup fails.
    fn find_sub_task(&mut self, lookup: SubTaskLookup) -> SubTaskStoreResult<Option<SubTask>>;

    /// Loads the parent task and holds its row lock.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the lookup fails.
    fn lock_task(&mut self, id: TaskId) -> SubTaskStoreResult<Option<Task>>;

    /// Lists the sub-tasks of a task, ordered by row id.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the lookup fails.
    fn sub_tasks_of_task(&mut self, task_id: TaskId) -> SubTaskStoreResult<Vec<SubTask>>;

    /// Inserts a task.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the insert fails.
    fn insert_task(&mut self, task: NewTask) -> SubTaskStoreResult<Task>;

    /// Inserts a sub-task.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the insert fails.
    fn insert_sub_task(&mut self, sub_task: NewSubTask) -> SubTaskStoreResult<SubTask>;

    /// Inserts an immutable report and returns it with its assigned id and
    /// code.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the insert fails.
    fn insert_report(&mut self, report: NewSubTaskReport) -> SubTaskStoreResult<SubTaskReport>;

    /// Writes the sub-task row image when the stored version still equals
    /// `expected_version`.
    ///
    /// Returns `false` when no row matched.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the update fails.
    fn update_sub_task(
        &mut self,
        sub_task: &SubTask,
        expected_version: i64,
    ) -> SubTaskStoreResult<bool>;

    /// Writes the task status and update timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError::TaskNotFound`] when the task is missing.
    fn update_task_status(&mut self, task: &Task) -> SubTaskStoreResult<()>;

    /// Appends a history ledger entry.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the insert fails.
    fn insert_history(&mut self, item: NewHistoryItem) -> SubTaskStoreResult<SubTaskHistoryItem>;

    /// Adds a notification to the outbox.
    ///
    /// Returns `None` when a notification with the same dedupe key is
    /// already queued.
    ///
    /// # Errors
    ///
    /// Returns [`SubTaskStoreError`] when the insert fails.
    fn enqueue_notification(
        &mut self,
        notification: NewNotification,
    ) -> SubTaskStoreResult<Option<Notification>>;
}

/// Sub-task persistence contract.
#[async_trait]
pub trait SubTaskStore: Send + Sync {
    /// Runs `work` inside one transaction, committing only when it returns
    /// `Ok`.
    ///
    /// Once started the work runs to commit or rollback even if the
    /// returned future is dropped.
    ///
    /// # Errors
    ///
    /// Returns the error `work` produced, or a [`SubTaskStoreError`]
    /// converted into `E` when the transaction itself fails.
    async fn in_transaction<T, E, F>(
        &self,
        isolation: TransactionIsolation,
        work: F,
    ) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<SubTaskStoreError> + Send + 'static,
        F: FnOnce(&mut dyn SubTaskTransaction) -> Result<T, E> + Send + 'static;

    /// Finds a sub-task by id or uid.
    async fn find_sub_task(&self, lookup: SubTaskLookup) -> SubTaskStoreResult<Option<SubTask>>;

    /// Finds a task by row id.
    async fn find_task(&self, id: TaskId) -> SubTaskStoreResult<Option<Task>>;

    /// Lists the reports of a sub-task, oldest first.
    async fn reports_for(&self, sub_task_id: SubTaskId) -> SubTaskStoreResult<Vec<SubTaskReport>>;

    /// Lists the history of a sub-task, oldest first.
    async fn history_for(
        &self,
        sub_task_id: SubTaskId,
    ) -> SubTaskStoreResult<Vec<SubTaskHistoryItem>>;

    /// Lists the queued notifications of a recipient, oldest first.
    async fn notifications_for(&self, recipient: UserId) -> SubTaskStoreResult<Vec<Notification>>;
}

/// Errors returned by sub-task store implementations.
#[derive(Debug, Clone, Error)]
pub enum SubTaskStoreError {
    /// The task was not found.
    #[error("task not found: {0}")]
    TaskNotFound(TaskId),

    /// The database aborted the transaction to keep it serializable.
    #[error("transaction could not be serialized with a concurrent one")]
    SerializationFailure,

    /// Persistence-layer failure.
    #[error("persistence error: {0}")]
    Persistence(Arc<dyn std::error::Error + Send + Sync>),
}

impl SubTaskStoreError {
    /// Wraps a persistence error.
    pub fn persistence(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Persistence(Arc::new(err))
    }
}
