//! Slateboard Core Library
//!
//! Element engine for the Slateboard collaborative whiteboard: the element
//! model, hit testing, undo history, the tool interaction state machine, and
//! replication between participants. Pixel output, persistence storage and
//! the network transport belong to the host.

pub mod config;
pub mod engine;
pub mod error;
pub mod geometry;
pub mod history;
pub mod input;
pub mod interaction;
pub mod persist;
pub mod replication;
pub mod selection;
pub mod shapes;
pub mod store;
pub mod tools;

pub use config::EngineConfig;
pub use engine::{Engine, Frame, RenderSink};
pub use error::{EngineError, EngineResult};
pub use history::History;
pub use input::{InputEvent, InputKind, Key, Modifiers};
pub use interaction::{InteractionSession, InteractionState};
pub use persist::PersistedDocument;
pub use replication::{Collaboration, LoroStore, RemoteCursor, ReplicatedStore, WireMessage};
pub use selection::{Handle, HandleKind, Selection};
pub use shapes::{Element, ElementId, ElementTrait, SerializableColor};
pub use store::Snapshot;
pub use tools::{ToolKind, ToolStyle};
