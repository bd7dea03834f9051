//! Ephemeral per-participant cursor state.
//!
//! Never merged into the document and never persisted.

use crate::shapes::SerializableColor;
use kurbo::Point;
use std::collections::BTreeMap;

/// Pointer position of another participant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemoteCursor {
    pub peer_id: u64,
    pub position: Point,
    pub color: SerializableColor,
}

/// Local cursor broadcast throttle plus the cursors of remote peers.
#[derive(Debug, Clone)]
pub struct Awareness {
    color: SerializableColor,
    throttle_ms: u64,
    last_sent_ms: Option<u64>,
    remote: BTreeMap<u64, RemoteCursor>,
}

impl Awareness {
    pub fn new(color: SerializableColor, throttle_ms: u64) -> Self {
        Self {
            color,
            throttle_ms,
            last_sent_ms: None,
            remote: BTreeMap::new(),
        }
    }

    /// Color other participants draw our cursor with.
    pub fn color(&self) -> SerializableColor {
        self.color
    }

    /// Whether a cursor update at `timestamp_ms` should go out. Records it if so.
    pub fn should_broadcast(&mut self, timestamp_ms: u64) -> bool {
        let due = self
            .last_sent_ms
            .is_none_or(|last| timestamp_ms.saturating_sub(last) >= self.throttle_ms);
        if due {
            self.last_sent_ms = Some(timestamp_ms);
        }
        due
    }

    /// Whether we have announced a cursor since the last leave.
    pub fn is_visible(&self) -> bool {
        self.last_sent_ms.is_some()
    }

    /// Local pointer left; the next move broadcasts immediately.
    pub fn hide(&mut self) {
        self.last_sent_ms = None;
    }

    pub fn upsert(&mut self, cursor: RemoteCursor) {
        self.remote.insert(cursor.peer_id, cursor);
    }

    pub fn remove(&mut self, peer_id: u64) -> bool {
        self.remote.remove(&peer_id).is_some()
    }

    /// Remote cursors ordered by peer id.
    pub fn cursors(&self) -> Vec<RemoteCursor> {
        self.remote.values().copied().collect()
    }
}
