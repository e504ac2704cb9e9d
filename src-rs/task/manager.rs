use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::store::TaskRepository;
use super::types::{Task, TaskStatus};
use crate::error::{TaskError, TaskResult};

pub const RESULT_OK: &str = "OK";
pub const RESULT_CANCELED: &str = "Canceled";

type HandleMap = HashMap<String, CancellationToken>;

/// Creates tasks, runs each one on its own tokio task and mediates cancel and
/// delete requests against the run's own completion.
///
/// Cloning is cheap; clones share the same store and cancellation handles.
#[derive(Clone)]
pub struct TaskManager {
    repo: Arc<dyn TaskRepository>,
    duration: Duration,
    handles: Arc<Mutex<HandleMap>>,
}

impl TaskManager {
    pub fn new(repo: Arc<dyn TaskRepository>, duration: Duration) -> Self {
        Self {
            repo,
            duration,
            handles: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Persists a new `Pending` task and starts running it in the background.
    ///
    /// Must be called from within a tokio runtime. If the store rejects the
    /// task nothing is spawned.
    pub fn create_task(&self) -> TaskResult<Task> {
        let task = Task::new_pending(&Uuid::new_v4().to_string(), Utc::now());
        info!(task_id = %task.id, "creating task");

        if let Err(err) = self.repo.create(&task) {
            error!(task_id = %task.id, error = %err, "failed to create task");
            return Err(err);
        }

        let token = CancellationToken::new();
        self.lock_handles()
            .insert(task.id.clone(), token.clone());

        let runner = self.clone();
        let copy = task.clone();
        tokio::spawn(async move { runner.run(copy, token).await });

        info!(task_id = %task.id, "task created");
        Ok(task)
    }

    pub fn get_task(&self, id: &str) -> TaskResult<Task> {
        debug!(task_id = %id, "get task");
        self.repo.get(id).map_err(|err| {
            warn!(task_id = %id, error = %err, "failed to get task");
            err
        })
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        debug!("list tasks");
        self.repo.list()
    }

    /// Stops the task if it is still running, then removes its record.
    pub fn delete_task(&self, id: &str) -> TaskResult<()> {
        info!(task_id = %id, "delete task");
        if let Some(token) = self.lock_handles().remove(id) {
            token.cancel();
            info!(task_id = %id, "task canceled via delete");
        }

        self.repo.delete(id).map_err(|err| {
            warn!(task_id = %id, error = %err, "failed to delete task");
            err
        })
    }

    /// Signals a running task to stop. The run itself records `Cancelled`.
    pub fn cancel_task(&self, id: &str) -> TaskResult<()> {
        let handles = self.lock_handles();
        match handles.get(id) {
            Some(token) => {
                token.cancel();
                info!(task_id = %id, "cancel task");
                Ok(())
            }
            None => {
                warn!(task_id = %id, "cancel called but task is not running");
                Err(TaskError::not_found(id))
            }
        }
    }

    /// Number of tasks whose run has not reached a terminal state yet.
    pub fn in_flight(&self) -> usize {
        self.lock_handles().len()
    }

    /// Signals every running task. Runs record `Cancelled` and deregister
    /// themselves as usual.
    pub fn shutdown(&self) {
        let handles = self.lock_handles();
        if !handles.is_empty() {
            info!(count = handles.len(), "cancelling in-flight tasks");
        }
        for token in handles.values() {
            token.cancel();
        }
    }

    async fn run(self, mut task: Task, token: CancellationToken) {
        debug!(task_id = %task.id, "running task");
        self.advance_to_running(&mut task);

        let (status, result) = tokio::select! {
            biased;
            _ = token.cancelled() => (TaskStatus::Cancelled, RESULT_CANCELED),
            _ = tokio::time::sleep(self.duration) => (TaskStatus::Completed, RESULT_OK),
        };
        self.advance_to_terminal(&mut task, status, result);

        self.lock_handles().remove(&task.id);
        debug!(task_id = %task.id, "removed cancellation handle");
    }

    fn advance_to_running(&self, task: &mut Task) {
        if let Err(err) = task.mark_running(Utc::now()) {
            error!(task_id = %task.id, error = %err, "cannot start task");
            return;
        }
        if let Err(err) = self.repo.update(task) {
            error!(task_id = %task.id, error = %err, "failed to update task status to running");
        }
    }

    fn advance_to_terminal(&self, task: &mut Task, status: TaskStatus, result: &str) {
        if let Err(err) = task.mark_finished(status, result, Utc::now()) {
            error!(task_id = %task.id, error = %err, "cannot finish task");
            return;
        }
        match self.repo.update(task) {
            Ok(()) => info!(task_id = %task.id, status = %status, "task finished"),
            // deleted while running
            Err(err) if err.is_not_found() => {
                debug!(task_id = %task.id, "task removed before it finished")
            }
            Err(err) => {
                error!(task_id = %task.id, error = %err, "failed to record task result")
            }
        }
    }

    fn lock_handles(&self) -> MutexGuard<'_, HandleMap> {
        self.handles.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
