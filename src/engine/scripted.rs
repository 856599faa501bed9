//! `ScriptedEngine` — a `WorkflowEngine` driven by a fixed or programmable
//! sequence of [`EngineEvent`]s, for integration tests and demonstration.

use async_trait::async_trait;
use futures::stream;
use serde_json::Value;
use tokio::sync::Mutex;

use super::{EngineEvent, EngineStream, WorkflowEngine};

/// Replays a pre-recorded sequence of engine events for every invocation,
/// ignoring `user_input`/`config`. Useful when a test only cares about the
/// Stream Runner's translation and ordering behavior.
pub struct ScriptedEngine {
    script: Vec<EngineEvent>,
}

impl ScriptedEngine {
    pub fn new(script: Vec<EngineEvent>) -> Self {
        Self { script }
    }
}

#[async_trait]
impl WorkflowEngine for ScriptedEngine {
    async fn run(&self, _user_input: &str, _config: &Value) -> EngineStream {
        Box::pin(stream::iter(self.script.clone()))
    }
}

/// A `WorkflowEngine` that yields a fixed prefix, then an `Interrupt`, then
/// waits to be told what to yield next via [`InterruptibleEngine::resume`].
/// Grounds the Stream Runner's suspend/resume await point in a driveable
/// test double rather than leaving it unexercised.
pub struct InterruptibleEngine {
    prefix: Vec<EngineEvent>,
    interrupt: EngineEvent,
    suffix: Mutex<Option<Vec<EngineEvent>>>,
}

impl InterruptibleEngine {
    pub fn new(prefix: Vec<EngineEvent>, interrupt: EngineEvent) -> Self {
        Self {
            prefix,
            interrupt,
            suffix: Mutex::new(None),
        }
    }

    /// Supplies the events to yield after the interrupt resumes. Must be
    /// called before the engine's stream reaches the suffix, i.e. before or
    /// shortly after feedback is submitted to the task.
    pub async fn resume(&self, suffix: Vec<EngineEvent>) {
        *self.suffix.lock().await = Some(suffix);
    }
}

#[async_trait]
impl WorkflowEngine for InterruptibleEngine {
    async fn run(&self, _user_input: &str, _config: &Value) -> EngineStream {
        let mut events = self.prefix.clone();
        events.push(self.interrupt.clone());

        // Poll briefly for `resume` to be called; the real engine would
        // suspend on its own await point instead of polling, but this
        // double only needs to simulate the two-phase shape.
        for _ in 0..200 {
            if let Some(suffix) = self.suffix.lock().await.take() {
                events.extend(suffix);
                break;
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }

        Box::pin(stream::iter(events))
    }
}
