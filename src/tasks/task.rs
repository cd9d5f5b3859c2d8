//! Observable Task
//!
//! A named unit of work with an append-only status log and a one-shot
//! completion signal.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use uuid::Uuid;

/// One line of a task's status log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusEntry {
    pub timestamp: DateTime<Utc>,
    pub message: String,
}

/// Terminal result of a task
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "result", content = "message")]
pub enum TaskOutcome {
    Succeeded,
    Failed(String),
}

/// Serializable view of a task at a point in time
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskSnapshot {
    pub id: Uuid,
    pub name: String,
    pub started_at: DateTime<Utc>,
    pub completed: bool,
    pub outcome: Option<TaskOutcome>,
    pub status_log: Vec<StatusEntry>,
}

/// Handle shared between a running unit of work and its observers
pub struct Task {
    id: Uuid,
    name: String,
    started_at: DateTime<Utc>,
    status_log: RwLock<Vec<StatusEntry>>,
    outcome: RwLock<Option<TaskOutcome>>,
    done_tx: watch::Sender<bool>,
}

impl Task {
    /// Create a new, running task
    pub fn new(name: &str) -> Arc<Self> {
        let (done_tx, _) = watch::channel(false);
        Arc::new(Self {
            id: Uuid::new_v4(),
            name: name.to_string(),
            started_at: Utc::now(),
            status_log: RwLock::new(Vec::new()),
            outcome: RwLock::new(None),
            done_tx,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// Append a line to the status log
    pub fn update_status(&self, message: impl Into<String>) {
        let message = message.into();
        debug!(task_id = %self.id, "{}", message);
        self.status_log.write().push(StatusEntry {
            timestamp: Utc::now(),
            message,
        });
    }

    /// Record the outcome and signal completion.
    ///
    /// Only the first call has an effect.
    pub fn done(&self, outcome: TaskOutcome) {
        {
            let mut current = self.outcome.write();
            if current.is_some() {
                return;
            }
            *current = Some(outcome);
        }
        self.done_tx.send_replace(true);
    }

    /// Log a success marker and complete the task
    pub fn succeed(&self, message: impl Into<String>) {
        self.update_status(message);
        self.done(TaskOutcome::Succeeded);
    }

    /// Log a failure message and complete the task
    pub fn fail(&self, message: impl Into<String>) {
        let message = message.into();
        self.update_status(message.clone());
        self.done(TaskOutcome::Failed(message));
    }

    pub fn is_done(&self) -> bool {
        *self.done_tx.borrow()
    }

    pub fn outcome(&self) -> Option<TaskOutcome> {
        self.outcome.read().clone()
    }

    pub fn status_log(&self) -> Vec<StatusEntry> {
        self.status_log.read().clone()
    }

    /// Wait until the task has completed
    pub async fn wait(&self) {
        let mut rx = self.done_tx.subscribe();
        // The sender lives as long as `self`, so this cannot fail.
        let _ = rx.wait_for(|done| *done).await;
    }

    pub fn snapshot(&self) -> TaskSnapshot {
        TaskSnapshot {
            id: self.id,
            name: self.name.clone(),
            started_at: self.started_at,
            completed: self.is_done(),
            outcome: self.outcome(),
            status_log: self.status_log(),
        }
    }
}

impl std::fmt::Debug for Task {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Task")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("completed", &self.is_done())
            .finish()
    }
}
