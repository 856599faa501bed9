//! Shared test harness: a config helper and a flaky `EventLog` wrapper used
//! to simulate a transient backing-store outage (S6).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use taskstream_rs::error::AppError;
use taskstream_rs::event_log::EventLog;
use taskstream_rs::offset::Cursor;
use taskstream_rs::types::{Event, EventKind, TaskConfig};

pub fn config(thread_id: &str) -> TaskConfig {
    TaskConfig {
        thread_id: thread_id.to_string(),
        ..Default::default()
    }
}

pub async fn wait_for_terminal(registry: &taskstream_rs::task_registry::TaskRegistry, task_id: &str) {
    for _ in 0..200 {
        if registry.get(task_id).await.unwrap().status.is_terminal() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never reached a terminal state");
}

/// Wraps a real `EventLog` and fails the first `fail_count` calls of any
/// kind with an internal error, then delegates normally. Models a backing
/// store that is briefly unavailable and recovers on its own.
pub struct FlakyEventLog {
    inner: Arc<dyn EventLog>,
    remaining_failures: AtomicUsize,
}

impl FlakyEventLog {
    pub fn new(inner: Arc<dyn EventLog>, fail_count: usize) -> Self {
        Self {
            inner,
            remaining_failures: AtomicUsize::new(fail_count),
        }
    }

    fn trip(&self) -> Result<(), AppError> {
        let remaining = self.remaining_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.remaining_failures.fetch_sub(1, Ordering::SeqCst);
            return Err(AppError::internal("backing store temporarily unavailable"));
        }
        Ok(())
    }
}

#[async_trait]
impl EventLog for FlakyEventLog {
    async fn append(
        &self,
        key: &str,
        thread_id: &str,
        agent: &str,
        role: &str,
        kind: EventKind,
    ) -> Result<String, AppError> {
        self.trip()?;
        self.inner.append(key, thread_id, agent, role, kind).await
    }

    async fn range(&self, key: &str, from: Cursor, limit: usize) -> Result<Vec<Event>, AppError> {
        self.trip()?;
        self.inner.range(key, from, limit).await
    }

    async fn tail(&self, key: &str, from: Cursor, block: Duration) -> Result<Vec<Event>, AppError> {
        self.trip()?;
        self.inner.tail(key, from, block).await
    }

    async fn length(&self, key: &str) -> Result<usize, AppError> {
        self.inner.length(key).await
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        self.inner.keys(prefix).await
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.inner.delete(key).await
    }
}
