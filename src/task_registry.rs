//! Task Registry (C2) — `TaskInfo` storage keyed by task-id, with a
//! secondary thread-id index and TTL eviction.
//!
//! Follows the same `RwLock<HashMap<..>>` + insertion-order-vector shape as
//! the teacher's task store, generalized with a thread index for
//! `find_latest_by_thread` and a TTL sweep in place of pagination.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::types::{TaskInfo, TaskStatus};

/// Filter parameters for `list`.
#[derive(Debug, Clone, Default)]
pub struct TaskListParams {
    pub thread_id: Option<String>,
    pub status: Option<TaskStatus>,
    pub limit: Option<usize>,
}

/// Fields an in-flight Stream Runner may update on a task.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub status: Option<TaskStatus>,
    pub progress: Option<f64>,
    pub current_step: Option<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

/// Storage for `TaskInfo` records, indexed by task-id with a thread-id
/// fan-out index.
pub struct TaskRegistry {
    tasks: RwLock<HashMap<String, TaskInfo>>,
    insertion_order: RwLock<Vec<String>>,
    by_thread: RwLock<HashMap<String, Vec<String>>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            insertion_order: RwLock::new(Vec::new()),
            by_thread: RwLock::new(HashMap::new()),
        }
    }

    pub async fn create(&self, info: TaskInfo) -> AppResult<()> {
        let task_id = info.task_id.clone();
        let thread_id = info.thread_id.clone();

        let mut tasks = self.tasks.write().await;
        tasks.insert(task_id.clone(), info);

        self.insertion_order.write().await.push(task_id.clone());
        self.by_thread
            .write()
            .await
            .entry(thread_id)
            .or_default()
            .push(task_id.clone());

        debug!(task_id = %task_id, "task registered");
        Ok(())
    }

    pub async fn get(&self, task_id: &str) -> AppResult<TaskInfo> {
        self.tasks
            .read()
            .await
            .get(task_id)
            .cloned()
            .ok_or_else(|| AppError::task_not_found(task_id))
    }

    pub async fn try_get(&self, task_id: &str) -> Option<TaskInfo> {
        self.tasks.read().await.get(task_id).cloned()
    }

    /// Applies a partial update to a task record. `progress` is only ever
    /// raised, never lowered, matching the monotone-progress invariant.
    pub async fn update(&self, task_id: &str, update: TaskUpdate) -> AppResult<TaskInfo> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(task_id)
            .ok_or_else(|| AppError::task_not_found(task_id))?;

        if let Some(status) = update.status {
            task.status = status;
        }
        if let Some(progress) = update.progress {
            task.progress = task.progress.max(progress);
        }
        if let Some(step) = update.current_step {
            task.current_step = step;
        }
        if let Some(started_at) = update.started_at {
            task.started_at = Some(started_at);
        }
        if let Some(completed_at) = update.completed_at {
            task.completed_at = Some(completed_at);
        }
        if let Some(message) = update.error_message {
            task.error_message = Some(message);
        }

        Ok(task.clone())
    }

    pub async fn list(&self, params: &TaskListParams) -> Vec<TaskInfo> {
        let tasks = self.tasks.read().await;
        let order = self.insertion_order.read().await;

        let mut result: Vec<TaskInfo> = order
            .iter()
            .filter_map(|id| tasks.get(id).cloned())
            .filter(|t| {
                params
                    .thread_id
                    .as_ref()
                    .map(|tid| &t.thread_id == tid)
                    .unwrap_or(true)
            })
            .filter(|t| params.status.map(|s| t.status == s).unwrap_or(true))
            .collect();

        if let Some(limit) = params.limit {
            result.truncate(limit);
        }
        result
    }

    pub async fn delete(&self, task_id: &str) -> AppResult<()> {
        let mut tasks = self.tasks.write().await;
        if let Some(task) = tasks.remove(task_id) {
            self.insertion_order.write().await.retain(|id| id != task_id);
            if let Some(ids) = self.by_thread.write().await.get_mut(&task.thread_id) {
                ids.retain(|id| id != task_id);
            }
            debug!(task_id = %task_id, "task evicted");
        } else {
            warn!(task_id = %task_id, "attempted to delete non-existent task");
        }
        Ok(())
    }

    /// Returns the most-recently-created task on `thread_id` that is not
    /// `cancelled` — resolves the `"default"`/`"latest"` query-id alias.
    pub async fn find_latest_by_thread(&self, thread_id: &str) -> Option<TaskInfo> {
        let by_thread = self.by_thread.read().await;
        let ids = by_thread.get(thread_id)?;
        let tasks = self.tasks.read().await;
        ids.iter()
            .rev()
            .filter_map(|id| tasks.get(id))
            .find(|t| t.status != TaskStatus::Cancelled)
            .cloned()
    }

    /// Evicts finalized tasks whose TTL (from `completed_at`, or
    /// `created_at` if still pending) has elapsed, returning the evicted
    /// records so callers can also delete the corresponding Event Log
    /// streams (via `TaskInfo::stream_key`).
    pub async fn sweep_expired(&self, ttl_days: u64) -> Vec<TaskInfo> {
        let now = Utc::now();
        let ttl = chrono::Duration::days(ttl_days as i64);

        let expired: Vec<TaskInfo> = {
            let tasks = self.tasks.read().await;
            tasks
                .values()
                .filter(|t| {
                    let reference = t.completed_at.unwrap_or(t.created_at);
                    now - reference > ttl
                })
                .cloned()
                .collect()
        };

        for task in &expired {
            let _ = self.delete(&task.task_id).await;
        }
        expired
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedTaskRegistry = Arc<TaskRegistry>;
