//! Service container (C8) — the set of shared components every HTTP handler
//! needs, built once at startup and injected via `axum::extract::State`.
//!
//! Equivalent to the teacher's axum `AppState` (handler + agent card), scaled
//! up to the handful of components this surface actually depends on. No
//! global mutable state: everything reachable from a handler comes through
//! this struct.

use std::sync::Arc;
use std::time::Duration;

use crate::engine::WorkflowEngine;
use crate::event_log::EventLog;
use crate::replayer::Replayer;
use crate::task_manager::TaskManager;
use crate::task_registry::TaskRegistry;

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<TaskRegistry>,
    pub event_log: Arc<dyn EventLog>,
    pub task_manager: Arc<TaskManager>,
    pub replayer: Arc<Replayer>,
    pub task_ttl_days: u64,
}

impl AppState {
    pub fn new(
        event_log: Arc<dyn EventLog>,
        engine: Arc<dyn WorkflowEngine>,
        concurrency_ceiling: usize,
        tail_block: Duration,
        task_ttl_days: u64,
    ) -> Self {
        let registry = Arc::new(TaskRegistry::new());
        let task_manager = TaskManager::new(
            Arc::clone(&registry),
            Arc::clone(&event_log),
            engine,
            concurrency_ceiling,
        );
        let replayer = Arc::new(Replayer::new(
            Arc::clone(&event_log),
            Arc::clone(&registry),
            tail_block,
        ));

        Self {
            registry,
            event_log,
            task_manager,
            replayer,
            task_ttl_days,
        }
    }
}
