//! S3 — cancellation: cancelling a running task appends a terminal `error`
//! event with reason `cancelled`, freezes the registry in `cancelled`, and a
//! second cancel is a no-op.

mod common;

use std::sync::Arc;
use std::time::Duration;

use taskstream_rs::engine::scripted::ScriptedEngine;
use taskstream_rs::engine::{EngineEvent, WorkflowEngine};
use taskstream_rs::event_log::{EventLog, InMemoryEventLog};
use taskstream_rs::offset::Cursor;
use taskstream_rs::task_manager::TaskManager;
use taskstream_rs::task_registry::TaskRegistry;
use taskstream_rs::types::{EventKind, TaskStatus};

#[tokio::test]
async fn cancel_running_task_is_terminal_and_idempotent() {
    let registry = Arc::new(TaskRegistry::new());
    let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    // Parks on an interrupt that nothing resumes, keeping the task running
    // long enough to cancel mid-flight.
    let engine: Arc<dyn WorkflowEngine> = Arc::new(ScriptedEngine::new(vec![
        EngineEvent::MessageChunk {
            agent: "researcher".into(),
            role: "assistant".into(),
            content: "working".into(),
            finish_reason: None,
        },
        EngineEvent::Interrupt {
            agent: "researcher".into(),
            role: "assistant".into(),
            options: vec![],
        },
    ]));

    let manager = TaskManager::new(registry.clone(), event_log.clone(), engine, 4);
    let task_id = manager.create_task(common::config("th1")).await.unwrap();

    tokio::time::sleep(Duration::from_millis(30)).await;
    manager.cancel_task(&task_id).await.unwrap();
    common::wait_for_terminal(&registry, &task_id).await;

    let task = registry.get(&task_id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Cancelled);

    let stream_key = format!("chat:th1:{task_id}");
    let events = event_log.range(&stream_key, Cursor::Start, 100).await.unwrap();
    match &events.last().unwrap().kind {
        EventKind::Error { reason, .. } => assert_eq!(reason.as_deref(), Some("cancelled")),
        other => panic!("expected a terminal error event, got {other:?}"),
    }

    // Idempotent: cancelling again doesn't change anything or error.
    manager.cancel_task(&task_id).await.unwrap();
    assert_eq!(registry.get(&task_id).await.unwrap().status, TaskStatus::Cancelled);
}
