//! Workflow Engine contract (C3, external) — the typed event sequence the
//! Stream Runner drives and translates into canonical events.
//!
//! The real multi-agent planner/researcher/reporter workflow lives outside
//! this crate; `WorkflowEngine` is the trait object seam it would plug into.
//! The only concrete implementation shipped here is [`scripted::ScriptedEngine`],
//! used for integration tests and as a runnable demonstration of the
//! substrate end to end.

pub mod scripted;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde_json::Value;

use crate::types::{InterruptOption, ToolCall, ToolCallChunk};

/// One unit of the Workflow Engine's internal event union. The Stream Runner
/// is a total function from this union to canonical events (§4.3); an engine
/// event kind this crate doesn't recognize still parses into `Unknown` for
/// forward compatibility rather than being rejected.
#[derive(Debug, Clone)]
pub enum EngineEvent {
    MessageChunk {
        agent: String,
        role: String,
        content: String,
        finish_reason: Option<String>,
    },
    ToolCalls {
        agent: String,
        role: String,
        tool_calls: Vec<ToolCall>,
    },
    ToolCallChunks {
        agent: String,
        role: String,
        tool_call_chunks: Vec<ToolCallChunk>,
    },
    ToolCallResult {
        agent: String,
        role: String,
        tool_call_id: String,
        content: String,
    },
    Interrupt {
        agent: String,
        role: String,
        options: Vec<InterruptOption>,
    },
    ResearchStart {
        agent: String,
        role: String,
        step: String,
    },
    ResearchEnd {
        agent: String,
        role: String,
        step: String,
    },
    /// The engine invocation failed. Terminal: the Stream Runner stops
    /// draining after this and finalizes the task as `failed` (§4.3 step 7).
    Error {
        message: String,
    },
    /// An engine event kind this crate doesn't recognize. Logged at `warn`
    /// and dropped by the Stream Runner rather than rejected.
    Unknown {
        kind: String,
    },
}

/// An opaque, running invocation of the Workflow Engine for one task.
pub type EngineStream = BoxStream<'static, EngineEvent>;

/// The contract a Workflow Engine implementation fulfills: given a task's
/// user input and opaque config, produce an async stream of engine events.
///
/// Interrupt handling is cooperative: the engine itself decides when to
/// yield an `Interrupt` event; resuming it is the Stream Runner's job, not
/// this trait's — the engine is driven purely by what it yields.
#[async_trait]
pub trait WorkflowEngine: Send + Sync {
    async fn run(&self, user_input: &str, config: &Value) -> EngineStream;
}
