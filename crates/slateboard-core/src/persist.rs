//! Serialized form of a session's history, for the persistence collaborator.
//!
//! Only a trailing window of snapshots is kept. Where and when the JSON is
//! stored is up to the host.

use crate::error::{EngineError, EngineResult};
use crate::history::History;
use crate::shapes::Element;
use crate::store::Snapshot;
use serde::{Deserialize, Serialize};

/// Current persisted format version.
pub const PERSIST_VERSION: u32 = 1;

/// Stored history: ordered element records per snapshot plus the cursor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistedDocument {
    pub version: u32,
    pub snapshots: Vec<Vec<Element>>,
    pub cursor: usize,
}

impl Default for PersistedDocument {
    fn default() -> Self {
        Self {
            version: PERSIST_VERSION,
            snapshots: vec![Vec::new()],
            cursor: 0,
        }
    }
}

impl PersistedDocument {
    /// Keep at most `window` snapshots ending at the tail of `history`.
    pub fn from_history(history: &History, window: usize) -> Self {
        let (snapshots, cursor) = history.window(window);
        Self {
            version: PERSIST_VERSION,
            snapshots: snapshots.iter().map(Snapshot::to_elements).collect(),
            cursor,
        }
    }

    /// A single-snapshot document, e.g. to seed a session from an export.
    pub fn from_elements(elements: Vec<Element>) -> Self {
        Self {
            version: PERSIST_VERSION,
            snapshots: vec![elements],
            cursor: 0,
        }
    }

    /// Rebuild the history log. Duplicate ids within a snapshot keep their
    /// last record and an out-of-range cursor is clamped.
    pub fn into_history(self) -> History {
        let snapshots = self.snapshots.into_iter().map(Snapshot::from_elements).collect();
        History::from_snapshots(snapshots, self.cursor)
    }

    /// Elements at the cursor.
    pub fn current(&self) -> &[Element] {
        self.snapshots
            .get(self.cursor)
            .or(self.snapshots.last())
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> EngineResult<Self> {
        let doc: Self = serde_json::from_str(json)?;
        if doc.version > PERSIST_VERSION {
            return Err(EngineError::UnsupportedVersion {
                found: doc.version,
                supported: PERSIST_VERSION,
            });
        }
        Ok(doc)
    }
}
