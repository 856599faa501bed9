//! Wire and domain types: task lifecycle, canonical events, and the
//! task-creation configuration accepted from clients.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// ============================================================================
// Task lifecycle
// ============================================================================

/// The lifecycle state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// Terminal states are frozen: `completed`, `failed`, `cancelled`.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        };
        write!(f, "{}", s)
    }
}

/// The fields a client may set when creating a task. Unknown fields on the
/// wire are ignored by `serde`'s default (non-`deny_unknown_fields`) behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TaskConfig {
    #[serde(default)]
    pub messages: Vec<Value>,
    #[serde(default)]
    pub resources: Vec<Value>,
    pub thread_id: String,
    #[serde(default)]
    pub auto_accepted_plan: bool,
    #[serde(default)]
    pub max_plan_iterations: Option<u32>,
    #[serde(default)]
    pub max_step_num: Option<u32>,
    #[serde(default)]
    pub max_search_results: Option<u32>,
    #[serde(default)]
    pub enable_deep_thinking: bool,
    #[serde(default)]
    pub enable_background_investigation: bool,
    #[serde(default)]
    pub report_style: Option<String>,
    #[serde(default)]
    pub interrupt_feedback: Option<String>,
    #[serde(default)]
    pub mcp_settings: Option<Value>,
}

/// A task's full registry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskInfo {
    pub task_id: String,
    pub thread_id: String,
    pub user_input: String,
    pub status: TaskStatus,
    pub progress: f64,
    pub current_step: String,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
    pub config: TaskConfig,
}

impl TaskInfo {
    pub fn new(task_id: String, user_input: String, config: TaskConfig) -> Self {
        let thread_id = config.thread_id.clone();
        Self {
            task_id,
            thread_id,
            user_input,
            status: TaskStatus::Pending,
            progress: 0.0,
            current_step: String::new(),
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
            error_message: None,
            config,
        }
    }

    /// The Event Log stream key owning this task's events.
    pub fn stream_key(&self) -> String {
        format!("chat:{}:{}", self.thread_id, self.task_id)
    }
}

// ============================================================================
// Canonical events (wire vocabulary, §6.2)
// ============================================================================

/// A tool call announced in full (as opposed to streamed in fragments).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// A fragment of a tool call's arguments, streamed incrementally.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallChunk {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub args_fragment: String,
}

/// One choice offered to the user at an interrupt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptOption {
    pub text: String,
    pub value: String,
}

/// The kind-specific payload of a canonical event. Serialized flat alongside
/// the envelope fields (`id`, `thread_id`, `agent`, `role`) by `Event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EventKind {
    MessageChunk {
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
    ToolCalls {
        tool_calls: Vec<ToolCall>,
    },
    ToolCallChunks {
        tool_call_chunks: Vec<ToolCallChunk>,
    },
    ToolCallResult {
        tool_call_id: String,
        content: String,
    },
    Interrupt {
        options: Vec<InterruptOption>,
    },
    ResearchStart {
        step: String,
    },
    ResearchEnd {
        step: String,
    },
    Error {
        error: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    ReplayEnd {
        mode: ReplayMode,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        total_events: Option<u64>,
    },
}

impl EventKind {
    /// The wire-level kind name, used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            EventKind::MessageChunk { .. } => "message_chunk",
            EventKind::ToolCalls { .. } => "tool_calls",
            EventKind::ToolCallChunks { .. } => "tool_call_chunks",
            EventKind::ToolCallResult { .. } => "tool_call_result",
            EventKind::Interrupt { .. } => "interrupt",
            EventKind::ResearchStart { .. } => "research_start",
            EventKind::ResearchEnd { .. } => "research_end",
            EventKind::Error { .. } => "error",
            EventKind::ReplayEnd { .. } => "replay_end",
        }
    }

    /// Terminal event kinds end a stream: `replay_end` or `error`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, EventKind::ReplayEnd { .. } | EventKind::Error { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplayMode {
    Static,
    Live,
}

/// One immutable, appended event. `id` is assigned by the Event Log at
/// append time and is never reused.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub thread_id: String,
    pub agent: String,
    pub role: String,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl Event {
    pub fn name(&self) -> &'static str {
        self.kind.name()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind.is_terminal()
    }
}

// ============================================================================
// Task Manager stats
// ============================================================================

#[derive(Debug, Clone, Serialize)]
pub struct TaskManagerStats {
    pub by_status: HashMap<String, usize>,
    pub running: usize,
    pub pending: usize,
    pub concurrency_ceiling: usize,
    pub uptime_seconds: u64,
}
