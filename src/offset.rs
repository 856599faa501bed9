//! Stream offset arithmetic — `<ms-timestamp>-<seq>` IDs and the `next_id` function.
//!
//! The event log's ordering guarantees rest entirely on two properties of this
//! module: IDs compare correctly both numerically and lexicographically, and
//! `next_id` always produces the smallest offset strictly greater than its
//! input. Every other component (the replayer, the stream runner, the event
//! log itself) treats IDs as opaque strings and defers to these functions —
//! get this wrong and replay loops forever or drops events.

use std::cmp::Ordering;

use crate::error::AppError;

/// Sentinel meaning "from the very start of the stream" in a `range` call.
pub const ZERO: &str = "0";

/// Sentinel meaning "unbounded upper end" in a `range` call.
pub const UNBOUNDED: &str = "+";

/// A parsed stream ID: milliseconds since epoch plus a disambiguating sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamId {
    pub ms: u64,
    pub seq: u64,
}

impl StreamId {
    pub fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }

    /// Format as the wire representation `<ms>-<seq>`.
    pub fn render(&self) -> String {
        format!("{}-{}", self.ms, self.seq)
    }

    /// Parse a wire-format ID. Does not accept the `"0"` or `"+"` sentinels —
    /// callers must special-case those before calling this.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let (ms_part, seq_part) = raw.split_once('-').ok_or_else(|| {
            AppError::invalid_params(format!("malformed stream id: {raw:?}"))
        })?;
        let ms = ms_part
            .parse::<u64>()
            .map_err(|_| AppError::invalid_params(format!("malformed stream id: {raw:?}")))?;
        let seq = seq_part
            .parse::<u64>()
            .map_err(|_| AppError::invalid_params(format!("malformed stream id: {raw:?}")))?;
        Ok(Self { ms, seq })
    }

    /// The smallest ID strictly greater than this one.
    pub fn next(&self) -> Self {
        Self {
            ms: self.ms,
            seq: self.seq + 1,
        }
    }
}

impl Ord for StreamId {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.ms, self.seq).cmp(&(other.ms, other.seq))
    }
}

impl PartialOrd for StreamId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// A cursor used as the `from_id` argument to `range`/`tail`: either the zero
/// sentinel (from the start) or a concrete parsed ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    Start,
    After(StreamId),
}

impl Cursor {
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        if raw == ZERO {
            Ok(Cursor::Start)
        } else {
            Ok(Cursor::After(StreamId::parse(raw)?))
        }
    }

    /// Whether `id` lies strictly after this cursor — i.e. should be
    /// delivered on a `range`/`tail` call starting from this cursor.
    pub fn admits(&self, id: StreamId) -> bool {
        match self {
            Cursor::Start => true,
            Cursor::After(cur) => id > *cur,
        }
    }
}

/// Compute the next offset to resume from after delivering `last_id`.
///
/// This is the single function every caller must use instead of re-passing
/// `last_id` itself — passing `last_id` back in would cause the same event
/// to be redelivered on every subsequent call (the "infinite replay loop"
/// failure class called out in the design notes).
pub fn next_id(last_id: &str) -> Result<String, AppError> {
    Ok(StreamId::parse(last_id)?.next().render())
}
