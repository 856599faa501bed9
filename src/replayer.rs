//! Replayer (C6) — serves one client's SSE stream by ranging the Event Log
//! and, in continuous mode, tailing live appends.
//!
//! Built the same way the teacher's `make_sse_stream` builds its SSE body:
//! an `async_stream::stream!` block owning a loop with explicit `yield`
//! points. The domain difference is the two-phase historical-then-live
//! structure and offset bookkeeping, which has no analogue in the teacher's
//! single-phase broadcast forwarding.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::stream::BoxStream;

use crate::event_log::EventLog;
use crate::offset::{Cursor, StreamId};
use crate::task_registry::TaskRegistry;
use crate::types::{Event, EventKind, ReplayMode};

const HISTORICAL_BATCH: usize = 256;

/// Resolved request parameters for a single SSE connection.
#[derive(Debug, Clone)]
pub struct ReplayParams {
    pub thread_id: String,
    /// A task id, or the literal `"default"`/`"latest"` alias meaning "the
    /// newest non-cancelled task on this thread".
    pub query_id: String,
    pub offset: String,
    pub continuous: bool,
}

fn is_alias(query_id: &str) -> bool {
    query_id == "default" || query_id == "latest"
}

pub struct Replayer {
    event_log: Arc<dyn EventLog>,
    registry: Arc<TaskRegistry>,
    tail_block: Duration,
}

impl Replayer {
    pub fn new(event_log: Arc<dyn EventLog>, registry: Arc<TaskRegistry>, tail_block: Duration) -> Self {
        Self {
            event_log,
            registry,
            tail_block,
        }
    }

    /// Produces the event sequence for one client connection. The caller
    /// (the HTTP layer) is responsible for turning each `Event` into an SSE
    /// frame and for detecting client disconnect, at which point dropping
    /// this stream ends the Replayer cleanly without mutating any state.
    pub fn serve(self: Arc<Self>, params: ReplayParams) -> BoxStream<'static, Event> {
        Box::pin(stream! {
            let task_id = if is_alias(&params.query_id) {
                match self.registry.find_latest_by_thread(&params.thread_id).await {
                    Some(task) => task.task_id,
                    None => {
                        yield empty_replay_end(&params.thread_id);
                        return;
                    }
                }
            } else {
                params.query_id.clone()
            };

            let stream_key = format!("chat:{}:{}", params.thread_id, task_id);

            let mut cursor = match Cursor::parse(&params.offset) {
                Ok(c) => c,
                Err(_) => Cursor::Start,
            };

            let mut total: u64 = 0;

            // Historical phase: range until exhausted.
            loop {
                let batch = match self.event_log.range(&stream_key, cursor, HISTORICAL_BATCH).await {
                    Ok(batch) => batch,
                    Err(_) => break,
                };
                if batch.is_empty() {
                    break;
                }
                for event in batch {
                    let id = StreamId::parse(&event.id).expect("event log only stores valid ids");
                    cursor = Cursor::After(id);
                    total += 1;
                    yield event;
                }
            }

            if !params.continuous {
                yield Event {
                    id: format!("{}-synthetic", chrono::Utc::now().timestamp_millis()),
                    thread_id: params.thread_id.clone(),
                    agent: "system".to_string(),
                    role: "system".to_string(),
                    kind: EventKind::ReplayEnd {
                        mode: ReplayMode::Static,
                        total_events: Some(total),
                    },
                };
                return;
            }

            // Continuous phase: tail live appends until a terminal event,
            // the task reaches a terminal registry state with nothing left
            // to tail, or the client disconnects (stream simply stops being
            // polled, which this loop can't observe directly — it just
            // keeps looping, and dropping the stream ends it).
            loop {
                let batch = match self.event_log.tail(&stream_key, cursor, self.tail_block).await {
                    Ok(batch) => batch,
                    Err(_) => break,
                };

                if batch.is_empty() {
                    let task_terminal = self
                        .registry
                        .try_get(&task_id)
                        .await
                        .map(|t| t.status.is_terminal())
                        .unwrap_or(true);
                    if task_terminal {
                        break;
                    }
                    continue;
                }

                let mut saw_terminal = false;
                for event in batch {
                    let id = StreamId::parse(&event.id).expect("event log only stores valid ids");
                    cursor = Cursor::After(id);
                    if event.is_terminal() {
                        saw_terminal = true;
                    }
                    yield event;
                }
                if saw_terminal {
                    break;
                }
            }
        })
    }
}

fn empty_replay_end(thread_id: &str) -> Event {
    Event {
        id: format!("{}-synthetic", chrono::Utc::now().timestamp_millis()),
        thread_id: thread_id.to_string(),
        agent: "system".to_string(),
        role: "system".to_string(),
        kind: EventKind::ReplayEnd {
            mode: ReplayMode::Static,
            total_events: Some(0),
        },
    }
}
