//! Engine error types.

use thiserror::Error;

/// Errors surfaced by the parsing, persistence and replication boundaries.
///
/// Interactive commands never return these; they log and degrade to a no-op.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
    #[error("Malformed remote operation: {0}")]
    MalformedRemote(String),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CRDT error: {0}")]
    Crdt(#[from] loro::LoroError),
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unsupported document version {found} (expected at most {supported})")]
    UnsupportedVersion { found: u32, supported: u32 },
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
