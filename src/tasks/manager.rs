//! In-process Task Manager
//!
//! Runs units of work on the tokio runtime and keeps every task addressable
//! by id so callers can poll its status. Completed tasks are retained up to
//! a cap; past it the oldest are evicted when new work starts.

use super::task::Task;
use crate::domain::ports::{TaskRunner, TaskWork};
use crate::error::{Error, Result};
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Completed tasks kept by default
pub const DEFAULT_MAX_COMPLETED_TASKS: usize = 1000;

/// Registry of tasks started in this process
pub struct TaskManager {
    tasks: DashMap<Uuid, Arc<Task>>,
    max_completed: usize,
}

impl Default for TaskManager {
    fn default() -> Self {
        Self {
            tasks: DashMap::new(),
            max_completed: DEFAULT_MAX_COMPLETED_TASKS,
        }
    }
}

impl TaskManager {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Manager keeping at most `max_completed` finished tasks
    pub fn with_retention(max_completed: usize) -> Arc<Self> {
        Arc::new(Self {
            tasks: DashMap::new(),
            max_completed,
        })
    }

    /// Get a task by id
    pub fn get(&self, id: &Uuid) -> Option<Arc<Task>> {
        self.tasks.get(id).map(|t| t.value().clone())
    }

    /// All known tasks, oldest first
    pub fn list(&self) -> Vec<Arc<Task>> {
        let mut tasks: Vec<_> = self.tasks.iter().map(|t| t.value().clone()).collect();
        tasks.sort_by_key(|t| t.started_at());
        tasks
    }

    /// Number of tasks that have not completed yet
    pub fn running_count(&self) -> usize {
        self.tasks.iter().filter(|t| !t.is_done()).count()
    }

    /// Drop the oldest completed tasks beyond the retention cap.
    /// Running tasks are never evicted.
    fn evict_completed(&self) -> usize {
        // Collect before removing; removing while iterating deadlocks the shard.
        let mut completed: Vec<_> = self
            .tasks
            .iter()
            .filter(|t| t.is_done())
            .map(|t| (t.started_at(), *t.key()))
            .collect();
        if completed.len() <= self.max_completed {
            return 0;
        }

        completed.sort();
        let excess = completed.len() - self.max_completed;
        for (_, id) in completed.into_iter().take(excess) {
            self.tasks.remove(&id);
        }
        debug!(evicted = excess, "Evicted completed tasks");
        excess
    }
}

impl TaskRunner for TaskManager {
    fn run(&self, name: &str, work: TaskWork) -> Result<Uuid> {
        let handle = tokio::runtime::Handle::try_current().map_err(|e| {
            Error::Internal(format!("Task creation failed for {}: {}", name, e))
        })?;

        self.evict_completed();

        let task = Task::new(name);
        let id = task.id();
        self.tasks.insert(id, task.clone());

        let join = handle.spawn(work(task.clone()));

        // A panicking unit of work must still leave a terminal status behind.
        handle.spawn(async move {
            if let Err(e) = join.await {
                error!(task_id = %task.id(), "Task aborted: {}", e);
                task.fail(format!("Failed. error: task aborted: {}", e));
            }
        });

        info!(task_id = %id, "Started task {}", name);
        Ok(id)
    }
}
