//! Append-only per-task event log with offset semantics (C1).
//!
//! Conceptually equivalent to Redis Streams: one ordered log per stream key,
//! many independent fan-out readers, no queue semantics. The only backing
//! store shipped here is the in-process one; `EventLog` is the seam a real
//! durable store would implement.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, Notify};
use tokio::time::{timeout, Duration};

use crate::error::AppError;
use crate::offset::{Cursor, StreamId};
use crate::types::{Event, EventKind};

/// Interface a backing store must implement to serve as the Event Log.
#[async_trait]
pub trait EventLog: Send + Sync {
    /// Atomically appends an event, assigning it an id strictly greater than
    /// all prior ids on `key`. Returns the assigned id.
    async fn append(
        &self,
        key: &str,
        thread_id: &str,
        agent: &str,
        role: &str,
        kind: EventKind,
    ) -> Result<String, AppError>;

    /// Returns events with ids in the half-open interval `(from, +∞)`, in
    /// order, up to `limit`.
    async fn range(&self, key: &str, from: Cursor, limit: usize) -> Result<Vec<Event>, AppError>;

    /// Blocks up to `block` for events strictly newer than `from`; returns
    /// as soon as at least one is available, or empty on timeout.
    async fn tail(
        &self,
        key: &str,
        from: Cursor,
        block: Duration,
    ) -> Result<Vec<Event>, AppError>;

    /// Total number of events ever appended to `key`.
    async fn length(&self, key: &str) -> Result<usize, AppError>;

    /// Keys matching a simple prefix pattern, for administrative use.
    async fn keys(&self, prefix: &str) -> Result<Vec<String>, AppError>;

    /// Deletes a stream entirely (retention sweep).
    async fn delete(&self, key: &str) -> Result<(), AppError>;
}

#[derive(Default)]
struct Stream {
    events: Vec<Event>,
    notify: Arc<Notify>,
}

/// In-memory `EventLog`. Loses history on process restart — acceptable per
/// the documented failure mode, since this is the only store this crate
/// provides; liveness over durability during an outage of a real store is a
/// deployment concern handled by swapping the trait implementation.
pub struct InMemoryEventLog {
    streams: Mutex<HashMap<String, Stream>>,
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
        }
    }

    /// Produces the next id for `key`, given the current wall-clock
    /// millisecond. Ids within the same millisecond get an incrementing
    /// sequence so they remain strictly increasing even when the clock
    /// doesn't advance between two appends.
    fn next_append_id(stream: &mut Stream) -> StreamId {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        match stream.events.last() {
            Some(last) => {
                let last_id = StreamId::parse(&last.id).expect("log only ever stores valid ids");
                if now_ms > last_id.ms {
                    StreamId::new(now_ms, 0)
                } else {
                    last_id.next()
                }
            }
            None => StreamId::new(now_ms, 0),
        }
    }
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(
        &self,
        key: &str,
        thread_id: &str,
        agent: &str,
        role: &str,
        kind: EventKind,
    ) -> Result<String, AppError> {
        let mut streams = self.streams.lock().await;
        let stream = streams.entry(key.to_string()).or_default();
        let id = Self::next_append_id(stream);
        let rendered = id.render();
        stream.events.push(Event {
            id: rendered.clone(),
            thread_id: thread_id.to_string(),
            agent: agent.to_string(),
            role: role.to_string(),
            kind,
        });
        stream.notify.notify_waiters();
        Ok(rendered)
    }

    async fn range(&self, key: &str, from: Cursor, limit: usize) -> Result<Vec<Event>, AppError> {
        let streams = self.streams.lock().await;
        let Some(stream) = streams.get(key) else {
            return Ok(Vec::new());
        };
        Ok(events_after(&stream.events, from, limit))
    }

    async fn tail(
        &self,
        key: &str,
        from: Cursor,
        block: Duration,
    ) -> Result<Vec<Event>, AppError> {
        let notify = {
            let mut streams = self.streams.lock().await;
            let stream = streams.entry(key.to_string()).or_default();
            let ready = events_after(&stream.events, from, usize::MAX);
            if !ready.is_empty() {
                return Ok(ready);
            }
            Arc::clone(&stream.notify)
        };

        // Wait for a wake-up or the block timeout, then check once more —
        // avoids busy-polling while bounding cancellation/reconnect latency.
        let _ = timeout(block, notify.notified()).await;

        let streams = self.streams.lock().await;
        let Some(stream) = streams.get(key) else {
            return Ok(Vec::new());
        };
        Ok(events_after(&stream.events, from, usize::MAX))
    }

    async fn length(&self, key: &str) -> Result<usize, AppError> {
        let streams = self.streams.lock().await;
        Ok(streams.get(key).map(|s| s.events.len()).unwrap_or(0))
    }

    async fn keys(&self, prefix: &str) -> Result<Vec<String>, AppError> {
        let streams = self.streams.lock().await;
        Ok(streams
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn delete(&self, key: &str) -> Result<(), AppError> {
        let mut streams = self.streams.lock().await;
        streams.remove(key);
        Ok(())
    }
}

fn events_after(events: &[Event], from: Cursor, limit: usize) -> Vec<Event> {
    events
        .iter()
        .filter(|e| {
            let id = StreamId::parse(&e.id).expect("log only ever stores valid ids");
            from.admits(id)
        })
        .take(limit)
        .cloned()
        .collect()
}
