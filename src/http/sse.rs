//! SSE framing — turns a [`crate::types::Event`] stream into axum
//! `Sse`-compatible frames.
//!
//! Adapts the teacher's `make_sse_stream`: an `async_stream::stream!` block
//! that matches on what the inner stream yields and wraps each item as
//! `Event::default().event(kind).data(json)`. The teacher drives this off a
//! `broadcast::Receiver` and stops on a `StatusUpdate::final` flag or a
//! closed channel; here the Replayer stream itself is the source of truth
//! for when to stop, so this layer only needs to serialize and frame.

use std::convert::Infallible;

use axum::response::sse::Event as SseEvent;
use futures::stream::{BoxStream, Stream, StreamExt};
use tracing::error;

use crate::types::Event;

/// Wraps a domain event stream as SSE frames, terminating with a bare `done`
/// frame once the source stream ends (terminal event delivered, or the
/// Replayer decided there is nothing further to send).
pub fn to_sse_stream(
    events: BoxStream<'static, Event>,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    async_stream::stream! {
        tokio::pin!(events);
        while let Some(event) = events.next().await {
            let kind = event.name();
            match serde_json::to_string(&event) {
                Ok(json) => yield Ok(SseEvent::default().event(kind).data(json)),
                Err(err) => {
                    error!(error = %err, "failed to serialize SSE event");
                }
            }
        }
        yield Ok(SseEvent::default().event("done").data(""));
    }
}
