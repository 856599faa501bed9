//! `taskstream-rs` — the task execution and event-replay substrate for a
//! server-side research agent platform.
//!
//! A client kicks off a task with a prompt and a bag of options, gets an
//! id back immediately, and can reconnect to the same task's event stream
//! at any point before or after it finishes — from the start, from an
//! offset, or just to tail whatever happens next. One append-only log per
//! task is the ground truth; everything else (the Task Registry, the HTTP
//! surface) is a view over it or a cache of where it's at.
//!
//! ## Components
//!
//! - [`event_log`] — the append-only per-task log (`EventLog` trait,
//!   [`event_log::InMemoryEventLog`])
//! - [`offset`] — stream id parsing, ordering, and the `next_id` function
//!   every cursor-advancing caller must go through
//! - [`task_registry`] — `TaskInfo` storage and the task-lifecycle state
//!   machine
//! - [`engine`] — the `WorkflowEngine` contract an external planner/
//!   researcher/reporter pipeline plugs into
//! - [`stream_runner`] — drives one engine invocation, translates its
//!   output into canonical events, and keeps the registry in sync
//! - [`task_manager`] — creates tasks, owns runner lifecycles, enforces the
//!   concurrency ceiling
//! - [`replayer`] — serves one client's historical-then-live event sequence
//! - [`http`] — the axum router and SSE framing
//! - [`state`] — the service container wiring the above together
//! - [`config`] — environment-driven process configuration
//! - [`error`] — the `AppError` taxonomy and its HTTP mapping
//! - [`types`] — wire and domain types shared across every component

pub mod config;
pub mod engine;
pub mod error;
pub mod event_log;
pub mod http;
pub mod offset;
pub mod replayer;
pub mod state;
pub mod stream_runner;
pub mod task_manager;
pub mod task_registry;
pub mod types;

pub use error::{AppError, AppResult};
