//! Transport messages exchanged between replicas.
//!
//! Document-carrying messages hold a base64-encoded CRDT update in `data`.
//! The variant names what the sender did; receivers merge every payload the
//! same way.

use crate::error::{EngineError, EngineResult};
use crate::shapes::ElementId;
use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

/// One message on the room channel. Symmetric: replicas send and receive the same set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WireMessage {
    /// An element was created or replaced.
    Set { id: ElementId, data: String },
    /// Elements were deleted in one transaction.
    Delete { ids: Vec<ElementId>, data: String },
    /// Every element was deleted in one transaction.
    ClearAll { data: String },
    /// Z-order changed.
    Reorder { data: String },
    /// Full document state, sent on (re)connection.
    Resync { data: String },
    /// Ephemeral pointer position of a participant.
    Cursor {
        peer_id: u64,
        x: f64,
        y: f64,
        /// Display color as `#rrggbb` or `#rrggbbaa`.
        color: String,
    },
    /// Participant's pointer left the canvas.
    CursorLeft { peer_id: u64 },
}

impl WireMessage {
    /// Decode one inbound message. Anything unrecognized is a malformed remote operation.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        serde_json::from_str(json).map_err(|e| EngineError::MalformedRemote(e.to_string()))
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Encoded CRDT update carried by document messages.
    pub fn payload(&self) -> Option<&str> {
        match self {
            WireMessage::Set { data, .. }
            | WireMessage::Delete { data, .. }
            | WireMessage::ClearAll { data }
            | WireMessage::Reorder { data }
            | WireMessage::Resync { data } => Some(data),
            WireMessage::Cursor { .. } | WireMessage::CursorLeft { .. } => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            WireMessage::Set { .. } => "set",
            WireMessage::Delete { .. } => "delete",
            WireMessage::ClearAll { .. } => "clear_all",
            WireMessage::Reorder { .. } => "reorder",
            WireMessage::Resync { .. } => "resync",
            WireMessage::Cursor { .. } => "cursor",
            WireMessage::CursorLeft { .. } => "cursor_left",
        }
    }
}

pub fn encode_payload(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}

pub fn decode_payload(data: &str) -> EngineResult<Vec<u8>> {
    Ok(STANDARD.decode(data)?)
}
