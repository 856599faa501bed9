//! In-process HTTP surface tests — exercise the axum router via
//! `tower::ServiceExt::oneshot` rather than a bound TCP listener, matching
//! the ambient stack's axum-in-process testing convention.

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

use taskstream_rs::engine::scripted::ScriptedEngine;
use taskstream_rs::engine::{EngineEvent, WorkflowEngine};
use taskstream_rs::event_log::{EventLog, InMemoryEventLog};
use taskstream_rs::http;
use taskstream_rs::state::AppState;

fn build_state(engine: Arc<dyn WorkflowEngine>) -> AppState {
    let event_log: Arc<dyn EventLog> = Arc::new(InMemoryEventLog::new());
    AppState::new(event_log, engine, 4, Duration::from_millis(50), 7)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn healthz_reports_ok() {
    let state = build_state(Arc::new(ScriptedEngine::new(vec![])));
    let app = http::router(state);

    let response = app
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "status": "ok" }));
}

#[tokio::test]
async fn create_get_list_and_cancel_round_trip() {
    let state = build_state(Arc::new(ScriptedEngine::new(vec![EngineEvent::ResearchEnd {
        agent: "researcher".into(),
        role: "assistant".into(),
        step: "done".into(),
    }])));
    let app = http::router(state);

    let create_body = json!({ "thread_id": "th1", "messages": [{"content": "hi"}] });
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/async")
                .header("content-type", "application/json")
                .body(Body::from(create_body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let created = body_json(response).await;
    let task_id = created["task_id"].as_str().unwrap().to_string();
    assert_eq!(created["thread_id"], "th1");

    // Missing thread_id is rejected before a task is ever created.
    let rejected = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/chat/async")
                .header("content-type", "application/json")
                .body(Body::from(json!({}).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);

    for _ in 0..100 {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/tasks/{task_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let task = body_json(response).await;
        if task["status"] == "completed" {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/tasks?thread_id=th1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let tasks = body_json(response).await;
    assert_eq!(tasks.as_array().unwrap().len(), 1);

    // Already terminal: cancel is still accepted (idempotent no-op).
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/tasks/{task_id}/cancel"))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn unknown_task_is_404() {
    let state = build_state(Arc::new(ScriptedEngine::new(vec![])));
    let app = http::router(state);

    let response = app
        .oneshot(Request::builder().uri("/tasks/nope").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn feedback_for_task_not_waiting_is_409() {
    let state = build_state(Arc::new(ScriptedEngine::new(vec![EngineEvent::ResearchEnd {
        agent: "researcher".into(),
        role: "assistant".into(),
        step: "done".into(),
    }])));
    let app = http::router(state.clone());

    let task_id = state.task_manager.create_task(common::config("th1")).await.unwrap();
    for _ in 0..100 {
        if state.registry.get(&task_id).await.unwrap().status.is_terminal() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(format!("/tasks/{task_id}/feedback"))
                .header("content-type", "application/json")
                .body(Body::from(json!({ "option": "continue" }).to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn worker_stats_and_cleanup() {
    let state = build_state(Arc::new(ScriptedEngine::new(vec![])));
    let app = http::router(state);

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/worker/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let stats = body_json(response).await;
    assert_eq!(stats["concurrency_ceiling"], 4);

    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/worker/cleanup?days=0")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
