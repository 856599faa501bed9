//! HTTP/SSE surface (C7) — axum router wiring every external endpoint to the
//! Task Manager, Task Registry, and Replayer.
//!
//! Structured the way the teacher's `axum_integration` module is: a router
//! builder function taking the service container, one handler function per
//! route, `State` extraction for shared components, errors converted to
//! responses via `IntoResponse` (here `AppError` does that job directly
//! instead of the teacher's JSON-RPC error-code mapping).

pub mod sse;

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::sse::{KeepAlive, Sse};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::offset::ZERO;
use crate::replayer::ReplayParams;
use crate::state::AppState;
use crate::task_registry::TaskListParams;
use crate::types::{TaskConfig, TaskInfo, TaskStatus};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/chat/async", post(create_task))
        .route("/tasks/{id}", get(get_task))
        .route("/tasks", get(list_tasks))
        .route("/tasks/{id}/cancel", post(cancel_task))
        .route("/tasks/{id}/feedback", post(submit_feedback))
        .route("/chat/replay", get(replay))
        .route("/threads/{id}/running-task", get(running_task))
        .route("/threads/{id}/research-status", get(research_status))
        .route("/worker/stats", get(worker_stats))
        .route("/worker/cleanup", post(worker_cleanup))
        .route("/healthz", get(healthz))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(Arc::new(state))
}

#[derive(Debug, Serialize)]
struct CreateTaskResponse {
    task_id: String,
    thread_id: String,
    status: TaskStatus,
    created_at: chrono::DateTime<chrono::Utc>,
}

async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(config): Json<TaskConfig>,
) -> AppResult<Json<CreateTaskResponse>> {
    if config.thread_id.is_empty() {
        return Err(AppError::invalid_params("thread_id is required"));
    }
    let task_id = state.task_manager.create_task(config).await?;
    let task = state.registry.get(&task_id).await?;
    Ok(Json(CreateTaskResponse {
        task_id: task.task_id,
        thread_id: task.thread_id,
        status: task.status,
        created_at: task.created_at,
    }))
}

async fn get_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> AppResult<Json<TaskInfo>> {
    Ok(Json(state.registry.get(&task_id).await?))
}

#[derive(Debug, Deserialize)]
struct ListTasksQuery {
    thread_id: Option<String>,
    status: Option<TaskStatus>,
    limit: Option<usize>,
}

async fn list_tasks(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
) -> Json<Vec<TaskInfo>> {
    let tasks = state
        .registry
        .list(&TaskListParams {
            thread_id: query.thread_id,
            status: query.status,
            limit: query.limit,
        })
        .await;
    Json(tasks)
}

async fn cancel_task(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
) -> AppResult<impl IntoResponse> {
    state.task_manager.cancel_task(&task_id).await?;
    info!(task_id = %task_id, "task cancelled");
    Ok(Json(serde_json::json!({ "task_id": task_id, "status": "cancelled" })))
}

#[derive(Debug, Deserialize)]
struct FeedbackBody {
    option: Value,
}

async fn submit_feedback(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    Json(body): Json<FeedbackBody>,
) -> AppResult<impl IntoResponse> {
    state
        .task_manager
        .submit_interrupt_feedback(&task_id, body.option)
        .await?;
    Ok(Json(serde_json::json!({ "task_id": task_id, "accepted": true })))
}

#[derive(Debug, Deserialize)]
struct ReplayQuery {
    thread_id: String,
    #[serde(default = "default_query_id")]
    query_id: String,
    #[serde(default = "default_offset")]
    offset: String,
    #[serde(default)]
    continuous: bool,
}

fn default_query_id() -> String {
    "default".to_string()
}

fn default_offset() -> String {
    ZERO.to_string()
}

async fn replay(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReplayQuery>,
) -> Sse<impl futures::Stream<Item = Result<axum::response::sse::Event, std::convert::Infallible>>> {
    let events = Arc::clone(&state.replayer).serve(ReplayParams {
        thread_id: query.thread_id,
        query_id: query.query_id,
        offset: query.offset,
        continuous: query.continuous,
    });
    Sse::new(sse::to_sse_stream(events)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Serialize)]
struct RunningTaskResponse {
    has_running_task: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    task_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<TaskStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    progress: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    current_step: Option<String>,
}

async fn running_task(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Json<RunningTaskResponse> {
    let latest = state.registry.find_latest_by_thread(&thread_id).await;
    let response = match latest.filter(|t| !t.status.is_terminal()) {
        Some(task) => RunningTaskResponse {
            has_running_task: true,
            task_id: Some(task.task_id),
            status: Some(task.status),
            progress: Some(task.progress),
            current_step: Some(task.current_step),
        },
        None => RunningTaskResponse {
            has_running_task: false,
            task_id: None,
            status: None,
            progress: None,
            current_step: None,
        },
    };
    Json(response)
}

#[derive(Debug, Serialize)]
struct ResearchStatusResponse {
    ongoing: Vec<TaskInfo>,
    completed: Vec<TaskInfo>,
}

async fn research_status(
    State(state): State<Arc<AppState>>,
    Path(thread_id): Path<String>,
) -> Json<ResearchStatusResponse> {
    let tasks = state
        .registry
        .list(&TaskListParams {
            thread_id: Some(thread_id),
            status: None,
            limit: None,
        })
        .await;
    let (ongoing, completed) = tasks.into_iter().partition(|t| !t.status.is_terminal());
    Json(ResearchStatusResponse { ongoing, completed })
}

async fn worker_stats(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    Json(state.task_manager.get_stats().await)
}

#[derive(Debug, Deserialize)]
struct CleanupQuery {
    days: Option<u64>,
}

async fn worker_cleanup(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CleanupQuery>,
) -> impl IntoResponse {
    let days = query.days.unwrap_or(state.task_ttl_days);
    let swept = state.task_manager.cleanup(days).await;
    Json(serde_json::json!({ "swept": swept }))
}

async fn healthz() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}
