//! S5 — alias resolution: `query_id = "default"`/`"latest"` resolves to the
//! thread's most recent non-cancelled task end to end, through the Task
//! Manager and Replayer together.

mod common;

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use taskstream_rs::engine::scripted::ScriptedEngine;
use taskstream_rs::engine::{EngineEvent, WorkflowEngine};
use taskstream_rs::event_log::{EventLog, InMemoryEventLog};
use taskstream_rs::replayer::{ReplayParams, Replayer};
use taskstream_rs::task_manager::TaskManager;
use taskstream_rs::task_registry::TaskRegistry;
use taskstream_rs::types::EventKind;

fn engine_with_message(text: &str) -> Arc<dyn WorkflowEngine> {
    Arc::new(ScriptedEngine::new(vec![EngineEvent::MessageChunk {
        agent: "researcher".into(),
        role: "assistant".into(),
        content: text.to_string(),
        finish_reason: None,
    }]))
}

#[tokio::test]
async fn default_alias_skips_cancelled_task() {
    let registry = Arc::new(TaskRegistry::new());
    let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());

    let manager_a = TaskManager::new(registry.clone(), event_log.clone(), engine_with_message("first"), 4);
    let first_id = manager_a.create_task(common::config("th1")).await.unwrap();
    common::wait_for_terminal(&registry, &first_id).await;

    // Second task never gets to run (ceiling 0) and is cancelled while pending.
    let manager_b = TaskManager::new(registry.clone(), event_log.clone(), engine_with_message("second"), 0);
    let second_id = manager_b.create_task(common::config("th1")).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    manager_b.cancel_task(&second_id).await.unwrap();

    let replayer = Arc::new(Replayer::new(event_log, registry, Duration::from_millis(50)));
    let events: Vec<_> = replayer
        .serve(ReplayParams {
            thread_id: "th1".into(),
            query_id: "default".into(),
            offset: "0".into(),
            continuous: false,
        })
        .collect()
        .await;

    match &events[0].kind {
        EventKind::MessageChunk { content, .. } => assert_eq!(content, "first"),
        other => panic!("expected the first task's stream, got {other:?}"),
    }
}
