//! In-memory transactional store for sub-task lifecycle tests.
//!
//! A transaction works on a copy of the whole state while holding the store
//! mutex, and swaps the copy in only when the work succeeds. Transactions are
//! therefore fully serialized, which is stricter than the row locks the
//! `PostgreSQL` adapter takes.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::subtask::{
    domain::{
        HistoryItemId, NewHistoryItem, NewNotification, NewSubTask, NewSubTaskReport, NewTask,
        Notification, NotificationId, PersistedTaskData, SubTask, SubTaskHistoryItem, SubTaskId,
        SubTaskLookup, SubTaskReport, SubTaskReportId, Task, TaskId, TaskStatus, UserId,
    },
    ports::{
        SubTaskStore, SubTaskStoreError, SubTaskStoreResult, SubTaskTransaction,
        TransactionIsolation,
    },
};

/// Thread-safe in-memory sub-task store.
#[derive(Debug, Clone, Default)]
pub struct InMemorySubTaskStore {
    state: Arc<Mutex<MemoryState>>,
}

#[derive(Debug, Clone, Default)]
struct MemoryState {
    tasks: BTreeMap<TaskId, Task>,
    sub_tasks: BTreeMap<SubTaskId, SubTask>,
    reports: Vec<SubTaskReport>,
    history: Vec<SubTaskHistoryItem>,
    notifications: Vec<Notification>,
    sequence: i64,
}

impl MemoryState {
    const fn next_id(&mut self) -> i64 {
        self.sequence = self.sequence.saturating_add(1);
        self.sequence
    }

    fn find(&self, lookup: SubTaskLookup) -> Option<SubTask> {
        match lookup {
            SubTaskLookup::Id(id) => self.sub_tasks.get(&id).cloned(),
            SubTaskLookup::Uid(uid) => self
                .sub_tasks
                .values()
                .find(|sub_task| sub_task.uid() == uid)
                .cloned(),
        }
    }
}

impl InMemorySubTaskStore {
    /// Creates an empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> SubTaskStoreResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|err| SubTaskStoreError::persistence(std::io::Error::other(err.to_string())))
    }

    fn run<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<SubTaskStoreError>,
        F: FnOnce(&mut dyn SubTaskTransaction) -> Result<T, E>,
    {
        let mut guard = self.lock()?;
        let mut working = guard.clone();
        let result = work(&mut MemoryTransaction {
            state: &mut working,
        });
        if result.is_ok() {
            *guard = working;
        }
        result
    }

    fn read<T>(&self, f: impl FnOnce(&MemoryState) -> T) -> SubTaskStoreResult<T> {
        let guard = self.lock()?;
        Ok(f(&guard))
    }
}

struct MemoryTransaction<'a> {
    state: &'a mut MemoryState,
}

impl SubTaskTransaction for MemoryTransaction<'_> {
    fn lock_sub_task(&mut self, id: SubTaskId) -> SubTaskStoreResult<Option<SubTask>> {
        Ok(self.state.sub_tasks.get(&id).cloned())
    }

    fn find_sub_task(&mut self, lookup: SubTaskLookup) -> SubTaskStoreResult<Option<SubTask>> {
        Ok(self.state.find(lookup))
    }

    fn lock_task(&mut self, id: TaskId) -> SubTaskStoreResult<Option<Task>> {
        Ok(self.state.tasks.get(&id).cloned())
    }

    fn sub_tasks_of_task(&mut self, task_id: TaskId) -> SubTaskStoreResult<Vec<SubTask>> {
        Ok(self
            .state
            .sub_tasks
            .values()
            .filter(|sub_task| sub_task.task_id() == task_id)
            .cloned()
            .collect())
    }

    fn insert_task(&mut self, task: NewTask) -> SubTaskStoreResult<Task> {
        let id = TaskId::new(self.state.next_id());
        let stored = Task::from_persisted(PersistedTaskData {
            id,
            uid: task.uid,
            code: task.code,
            task_type: task.task_type,
            status: TaskStatus::WaitingAssignment,
            customer_id: task.customer_id,
            created_at: task.created_at,
            updated_at: task.created_at,
        });
        self.state.tasks.insert(id, stored.clone());
        Ok(stored)
    }

    fn insert_sub_task(&mut self, sub_task: NewSubTask) -> SubTaskStoreResult<SubTask> {
        if !self.state.tasks.contains_key(&sub_task.task_id) {
            return Err(SubTaskStoreError::TaskNotFound(sub_task.task_id));
        }
        let id = SubTaskId::new(self.state.next_id());
        let stored = sub_task.into_sub_task(id);
        self.state.sub_tasks.insert(id, stored.clone());
        Ok(stored)
    }

    fn insert_report(&mut self, report: NewSubTaskReport) -> SubTaskStoreResult<SubTaskReport> {
        let id = SubTaskReportId::new(self.state.next_id());
        let stored = report.into_report(id);
        self.state.reports.push(stored.clone());
        Ok(stored)
    }

    fn update_sub_task(
        &mut self,
        sub_task: &SubTask,
        expected_version: i64,
    ) -> SubTaskStoreResult<bool> {
        match self.state.sub_tasks.get_mut(&sub_task.id()) {
            Some(stored) if stored.version() == expected_version => {
                *stored = sub_task.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn update_task_status(&mut self, task: &Task) -> SubTaskStoreResult<()> {
        let stored = self
            .state
            .tasks
            .get_mut(&task.id())
            .ok_or(SubTaskStoreError::TaskNotFound(task.id()))?;
        stored.set_status(task.status(), task.updated_at());
        Ok(())
    }

    fn insert_history(&mut self, item: NewHistoryItem) -> SubTaskStoreResult<SubTaskHistoryItem> {
        let id = HistoryItemId::new(self.state.next_id());
        let stored = item.into_item(id);
        self.state.history.push(stored.clone());
        Ok(stored)
    }

    fn enqueue_notification(
        &mut self,
        notification: NewNotification,
    ) -> SubTaskStoreResult<Option<Notification>> {
        let duplicate = self
            .state
            .notifications
            .iter()
            .any(|queued| queued.dedupe_key == notification.dedupe_key);
        if duplicate {
            return Ok(None);
        }
        let id = NotificationId::new(self.state.next_id());
        let stored = notification.into_notification(id);
        self.state.notifications.push(stored.clone());
        Ok(Some(stored))
    }
}

#[async_trait]
impl SubTaskStore for InMemorySubTaskStore {
    async fn in_transaction<T, E, F>(
        &self,
        _isolation: TransactionIsolation,
        work: F,
    ) -> Result<T, E>
    where
        T: Send + 'static,
        E: From<SubTaskStoreError> + Send + 'static,
        F: FnOnce(&mut dyn SubTaskTransaction) -> Result<T, E> + Send + 'static,
    {
        self.run(work)
    }

    async fn find_sub_task(&self, lookup: SubTaskLookup) -> SubTaskStoreResult<Option<SubTask>> {
        self.read(|state| state.find(lookup))
    }

    async fn find_task(&self, id: TaskId) -> SubTaskStoreResult<Option<Task>> {
        self.read(|state| state.tasks.get(&id).cloned())
    }

    async fn reports_for(&self, sub_task_id: SubTaskId) -> SubTaskStoreResult<Vec<SubTaskReport>> {
        self.read(|state| {
            state
                .reports
                .iter()
                .filter(|report| report.sub_task_id == sub_task_id)
                .cloned()
                .collect()
        })
    }

    async fn history_for(
        &self,
        sub_task_id: SubTaskId,
    ) -> SubTaskStoreResult<Vec<SubTaskHistoryItem>> {
        self.read(|state| {
            state
                .history
                .iter()
                .filter(|item| item.sub_task_id == sub_task_id)
                .cloned()
                .collect()
        })
    }

    async fn notifications_for(&self, recipient: UserId) -> SubTaskStoreResult<Vec<Notification>> {
        self.read(|state| {
            state
                .notifications
                .iter()
                .filter(|queued| queued.recipient == recipient)
                .cloned()
                .collect()
        })
    }
}
