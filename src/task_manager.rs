//! Task Manager (C5) — creates tasks, owns Stream Runner lifecycles, and
//! enforces the concurrency ceiling.
//!
//! Mirrors the teacher's `DefaultRequestHandler`: a map of per-task running
//! state (there, `RunningAgent` with a `JoinHandle` + `EventQueue`; here,
//! `RunningTask` with a `JoinHandle` + the runner's cancel/interrupt
//! handles) guarded by a `tokio::sync::Mutex`, populated when a task is
//! spawned and removed when it finishes.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tokio::sync::{Mutex, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::engine::WorkflowEngine;
use crate::error::{AppError, AppResult};
use crate::event_log::EventLog;
use crate::stream_runner::{CancelHandle, InterruptSlot, StreamRunner};
use crate::task_registry::{TaskRegistry, TaskUpdate};
use crate::types::{TaskConfig, TaskInfo, TaskManagerStats, TaskStatus};

struct RunningTask {
    handle: JoinHandle<()>,
    cancel: Arc<CancelHandle>,
    interrupts: Arc<InterruptSlot>,
}

/// Creates and owns tasks. A counting semaphore enforces the concurrency
/// ceiling; tasks beyond it stay `pending` until a permit frees, admitted in
/// FIFO order — `tokio::sync::Semaphore` grants permits to waiters in the
/// order they requested one.
pub struct TaskManager {
    registry: Arc<TaskRegistry>,
    event_log: Arc<dyn EventLog>,
    engine: Arc<dyn WorkflowEngine>,
    admission: Arc<Semaphore>,
    concurrency_ceiling: usize,
    running: Mutex<HashMap<String, RunningTask>>,
    started_at: Instant,
}

impl TaskManager {
    pub fn new(
        registry: Arc<TaskRegistry>,
        event_log: Arc<dyn EventLog>,
        engine: Arc<dyn WorkflowEngine>,
        concurrency_ceiling: usize,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            event_log,
            engine,
            admission: Arc::new(Semaphore::new(concurrency_ceiling)),
            concurrency_ceiling,
            running: Mutex::new(HashMap::new()),
            started_at: Instant::now(),
        })
    }

    /// Allocates a task id, persists a `pending` `TaskInfo`, and schedules
    /// the Stream Runner. Returns immediately; the runner starts once a
    /// concurrency-ceiling permit is available.
    pub async fn create_task(self: &Arc<Self>, config: TaskConfig) -> AppResult<String> {
        let task_id = Uuid::new_v4().to_string();
        let user_input = config
            .messages
            .last()
            .and_then(|m| m.get("content"))
            .and_then(|c| c.as_str())
            .unwrap_or_default()
            .to_string();

        let info = TaskInfo::new(task_id.clone(), user_input.clone(), config);
        let stream_key = info.stream_key();
        let thread_id = info.thread_id.clone();
        self.registry.create(info).await?;

        let manager = Arc::clone(self);
        let task_id_for_task = task_id.clone();
        let cancel = CancelHandle::new();
        let interrupts = InterruptSlot::new();
        let cancel_for_runner = Arc::clone(&cancel);
        let interrupts_for_runner = Arc::clone(&interrupts);

        let handle = tokio::spawn(async move {
            // FIFO admission: waiters queue on the semaphore in request order.
            let Ok(_permit) = manager.admission.clone().acquire_owned().await else {
                return;
            };

            let runner = StreamRunner::new(
                task_id_for_task.clone(),
                stream_key,
                thread_id,
                Arc::clone(&manager.engine),
                Arc::clone(&manager.event_log),
                Arc::clone(&manager.registry),
                cancel_for_runner,
                interrupts_for_runner,
            );
            runner.run(user_input, Value::Null).await;

            manager.running.lock().await.remove(&task_id_for_task);
        });

        self.running.lock().await.insert(
            task_id.clone(),
            RunningTask {
                handle,
                cancel,
                interrupts,
            },
        );

        debug!(task_id = %task_id, "task created");
        Ok(task_id)
    }

    /// Signals cancellation to a running task's Stream Runner. Idempotent:
    /// cancelling an already-terminal or unknown-to-`running` task is a
    /// no-op success, matching property #6.
    pub async fn cancel_task(&self, task_id: &str) -> AppResult<()> {
        let task = self.registry.get(task_id).await?;
        if task.status.is_terminal() {
            return Ok(());
        }

        let running = self.running.lock().await;
        if let Some(entry) = running.get(task_id) {
            entry.cancel.cancel();
        } else {
            // Still pending (never admitted) — finalize directly.
            drop(running);
            self.registry
                .update(
                    task_id,
                    TaskUpdate {
                        status: Some(TaskStatus::Cancelled),
                        completed_at: Some(chrono::Utc::now()),
                        ..Default::default()
                    },
                )
                .await?;
        }
        Ok(())
    }

    /// Delivers interrupt feedback to a waiting Stream Runner.
    pub async fn submit_interrupt_feedback(&self, task_id: &str, payload: Value) -> AppResult<()> {
        self.registry.get(task_id).await?;
        let running = self.running.lock().await;
        let entry = running
            .get(task_id)
            .ok_or_else(|| AppError::conflict("task is not waiting for feedback"))?;
        entry.interrupts.submit(payload).await
    }

    pub async fn get_stats(&self) -> TaskManagerStats {
        let tasks = self.registry.list(&Default::default()).await;
        let mut by_status = HashMap::new();
        for task in &tasks {
            *by_status.entry(task.status.to_string()).or_insert(0) += 1;
        }
        TaskManagerStats {
            running: *by_status.get("running").unwrap_or(&0),
            pending: *by_status.get("pending").unwrap_or(&0),
            by_status,
            concurrency_ceiling: self.concurrency_ceiling,
            uptime_seconds: self.started_at.elapsed().as_secs(),
        }
    }

    /// Scans the Task Registry, evicts finalized tasks past their TTL, and
    /// deletes their Event Log streams. Returns the number of tasks swept.
    pub async fn cleanup(&self, older_than_days: u64) -> usize {
        let expired = self.registry.sweep_expired(older_than_days).await;
        for task in &expired {
            let _ = self.event_log.delete(&task.stream_key()).await;
        }
        info!(count = expired.len(), "cleanup swept expired tasks");
        expired.len()
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    pub fn event_log(&self) -> &Arc<dyn EventLog> {
        &self.event_log
    }
}
