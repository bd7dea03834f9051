//! The engine: one whiteboard session.
//!
//! Owns the element store, history, selection and gesture state, and is
//! the only way to change them. Every command is total; failures in the
//! replication layer are logged and local editing carries on.

use crate::config::EngineConfig;
use crate::error::EngineResult;
use crate::history::History;
use crate::input::{InputEvent, InputKind};
use crate::interaction::{Interaction, InteractionSession, InteractionState, ToolContext};
use crate::persist::PersistedDocument;
use crate::replication::{Collaboration, Inbound, RemoteCursor, ReplicatedStore};
use crate::selection::{self, Handle, Selection};
use crate::shapes::{Element, ElementId, Image, ImageRef, SerializableColor};
use crate::store::Snapshot;
use crate::tools::{ToolKind, ToolStyle};
use kurbo::Point;
use std::sync::Arc;

/// Live store, history and selection. Mutated only by the engine and the
/// interaction state machine.
#[derive(Debug, Clone, Default)]
pub(crate) struct Document {
    pub(crate) store: Snapshot,
    pub(crate) history: History,
    pub(crate) selection: Selection,
    /// A committed change has not been handed to replication yet.
    unsynced: bool,
}

impl Document {
    fn from_history(history: History) -> Self {
        Self {
            store: history.current().clone(),
            history,
            selection: Selection::new(),
            unsynced: false,
        }
    }

    /// Show `next` without recording it.
    pub(crate) fn stage(&mut self, next: Snapshot) {
        self.store = next;
        self.selection.retain_existing(&self.store);
    }

    /// Record the change `base` → `next` as one history step and show it.
    /// An unchanged document records nothing.
    pub(crate) fn commit(&mut self, base: Snapshot, next: Snapshot) -> bool {
        if next == base {
            self.stage(next);
            return false;
        }
        self.history.commit_from(base, next.clone());
        self.stage(next);
        self.unsynced = true;
        true
    }

    pub(crate) fn undo(&mut self) -> bool {
        match self.history.undo(&self.store) {
            Some(previous) => {
                self.stage(previous);
                self.unsynced = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn redo(&mut self) -> bool {
        match self.history.redo(&self.store) {
            Some(next) => {
                self.stage(next);
                self.unsynced = true;
                true
            }
            None => false,
        }
    }

    pub(crate) fn delete_selected(&mut self) -> bool {
        if self.selection.is_empty() {
            return false;
        }
        let ids = self.selection.ids();
        self.selection.clear();
        let base = self.store.clone();
        let next = base.remove(&ids);
        log::debug!("Deleting {} selected elements", ids.len());
        self.commit(base, next)
    }

    fn take_unsynced(&mut self) -> bool {
        std::mem::take(&mut self.unsynced)
    }
}

/// Everything a rendering sink needs for one frame.
#[derive(Debug, Clone, Default)]
pub struct Frame {
    /// Committed elements bottom to top, minus the element whose text is being edited.
    pub elements: Snapshot,
    pub selection: Vec<ElementId>,
    /// Handles of a single selected element.
    pub handles: Vec<Handle>,
    /// In-progress gesture, drawn over `elements`.
    pub preview: InteractionSession,
    pub remote_cursors: Vec<RemoteCursor>,
}

/// Receives a frame after every visible change. Owns all pixel output.
pub trait RenderSink {
    fn render(&mut self, frame: &Frame);
}

/// One whiteboard session.
pub struct Engine {
    config: EngineConfig,
    style: ToolStyle,
    tool: ToolKind,
    doc: Document,
    interaction: Interaction,
    collab: Option<Collaboration>,
    sink: Option<Box<dyn RenderSink>>,
    /// Document as last handed to replication.
    last_synced: Snapshot,
}

impl Engine {
    /// Start an empty session. An invalid config falls back to defaults.
    pub fn new(config: EngineConfig, style: ToolStyle) -> Self {
        Self::with_history(config, style, History::new())
    }

    /// Start from a persisted history.
    pub fn with_seed(config: EngineConfig, style: ToolStyle, seed: PersistedDocument) -> Self {
        log::info!("Seeding session with {} snapshots", seed.snapshots.len());
        Self::with_history(config, style, seed.into_history())
    }

    fn with_history(config: EngineConfig, style: ToolStyle, history: History) -> Self {
        let config = match config.validate() {
            Ok(()) => config,
            Err(err) => {
                log::warn!("{err}; using default configuration");
                EngineConfig::default()
            }
        };
        Self {
            config,
            style,
            tool: ToolKind::default(),
            doc: Document::from_history(history),
            interaction: Interaction::new(),
            collab: None,
            sink: None,
            last_synced: Snapshot::empty(),
        }
    }

    // --- Accessors ---

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn style(&self) -> &ToolStyle {
        &self.style
    }

    pub fn tool(&self) -> ToolKind {
        self.tool
    }

    /// Point-in-time copy of the live document. Cheap; safe to hand to exporters.
    pub fn snapshot(&self) -> Snapshot {
        self.doc.store.clone()
    }

    pub fn selection(&self) -> &Selection {
        &self.doc.selection
    }

    pub fn interaction_state(&self) -> &InteractionState {
        self.interaction.state()
    }

    /// Id of the element whose text is being edited.
    pub fn editing(&self) -> Option<ElementId> {
        self.interaction.editing()
    }

    pub fn can_undo(&self) -> bool {
        self.doc.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.doc.history.can_redo()
    }

    pub fn history(&self) -> &History {
        &self.doc.history
    }

    /// Current state for the rendering sink.
    pub fn frame(&self) -> Frame {
        let elements = match self.interaction.editing() {
            Some(id) => self.doc.store.remove(&[id]),
            None => self.doc.store.clone(),
        };
        let handles = self
            .doc
            .selection
            .single()
            .filter(|&id| self.interaction.editing() != Some(id))
            .and_then(|id| self.doc.store.get(id))
            .map(|e| selection::handles(e, &self.config))
            .unwrap_or_default();
        Frame {
            elements,
            selection: self.doc.selection.ids(),
            handles,
            preview: self.interaction.preview(),
            remote_cursors: self.remote_cursors(),
        }
    }

    /// History window for the persistence collaborator.
    pub fn persist(&self) -> PersistedDocument {
        PersistedDocument::from_history(&self.doc.history, self.config.persisted_history_window)
    }

    // --- Commands ---

    /// Feed one input event. Returns true if anything visible changed.
    pub fn apply_event(&mut self, event: &InputEvent) -> bool {
        let ctx = ToolContext {
            tool: self.tool,
            style: &self.style,
            config: &self.config,
        };
        let changed = self.interaction.handle(event, &mut self.doc, ctx);
        self.track_cursor(event);
        self.after(changed)
    }

    /// Switch tools. Commits a pending text edit, abandons any other gesture,
    /// and drops the selection unless switching to select.
    pub fn set_tool(&mut self, tool: ToolKind) {
        let mut changed = self.settle();
        if tool != self.tool {
            log::debug!("Tool {} -> {}", self.tool, tool);
            self.tool = tool;
        }
        if tool != ToolKind::Select && !self.doc.selection.is_empty() {
            self.doc.selection.clear();
            changed = true;
        }
        self.after(changed);
    }

    pub fn set_style(&mut self, style: ToolStyle) {
        self.style = style;
    }

    /// Commit a pending text edit.
    pub fn commit(&mut self) -> bool {
        let ctx = ToolContext {
            tool: self.tool,
            style: &self.style,
            config: &self.config,
        };
        let changed = self.interaction.finish_edit(&mut self.doc, ctx);
        self.after(changed)
    }

    /// Abandon the gesture in progress without committing.
    pub fn cancel(&mut self) -> bool {
        let changed = self.interaction.cancel(&mut self.doc);
        self.after(changed)
    }

    pub fn undo(&mut self) -> bool {
        let settled = self.settle();
        let changed = self.doc.undo();
        self.after(settled || changed)
    }

    pub fn redo(&mut self) -> bool {
        let settled = self.settle();
        let changed = self.doc.redo();
        self.after(settled || changed)
    }

    /// Select exactly `ids`. Unknown ids are ignored.
    pub fn select(&mut self, ids: impl IntoIterator<Item = ElementId>) {
        self.doc.selection.set(ids, &self.doc.store);
        self.after(true);
    }

    pub fn select_all(&mut self) {
        let ids = self.doc.store.ids();
        self.select(ids);
    }

    pub fn clear_selection(&mut self) {
        let changed = !self.doc.selection.is_empty();
        self.doc.selection.clear();
        self.after(changed);
    }

    pub fn delete_selected(&mut self) -> bool {
        let settled = self.settle();
        let changed = self.doc.delete_selected();
        self.after(settled || changed)
    }

    /// Remove every element as one history step.
    pub fn clear_canvas(&mut self) -> bool {
        let settled = self.settle();
        self.doc.selection.clear();
        let base = self.doc.store.clone();
        let changed = self.doc.commit(base, Snapshot::empty());
        self.after(settled || changed)
    }

    /// Place an image at its intrinsic size centered on `center` and select it.
    pub fn insert_image(&mut self, source: ImageRef, center: Point) -> Option<ElementId> {
        let settled = self.settle();
        let element = Element::Image(Image::centered(center, source));
        if let Err(reason) = element.validate() {
            log::warn!("Rejecting image: {reason}");
            self.after(settled);
            return None;
        }
        let id = element.id();
        let base = self.doc.store.clone();
        let next = base.insert(element);
        self.doc.commit(base, next);
        self.doc.selection.set([id], &self.doc.store);
        self.after(true);
        Some(id)
    }

    pub fn bring_to_front(&mut self, ids: &[ElementId]) -> bool {
        self.restack(ids, true)
    }

    pub fn send_to_back(&mut self, ids: &[ElementId]) -> bool {
        self.restack(ids, false)
    }

    fn restack(&mut self, ids: &[ElementId], to_front: bool) -> bool {
        let settled = self.settle();
        let base = self.doc.store.clone();
        let next = base.restack(ids, to_front);
        let changed = self.doc.commit(base, next);
        self.after(settled || changed)
    }

    pub fn set_render_sink(&mut self, sink: Box<dyn RenderSink>) {
        self.sink = Some(sink);
        self.notify();
    }

    /// Finish a text edit and drop any other gesture.
    fn settle(&mut self) -> bool {
        let ctx = ToolContext {
            tool: self.tool,
            style: &self.style,
            config: &self.config,
        };
        let finished = self.interaction.finish_edit(&mut self.doc, ctx);
        let cancelled = self.interaction.cancel(&mut self.doc);
        finished || cancelled
    }

    /// Propagate committed changes, then redraw if anything changed.
    fn after(&mut self, changed: bool) -> bool {
        self.sync();
        if changed {
            self.notify();
        }
        changed
    }

    fn notify(&mut self) {
        if let Some(mut sink) = self.sink.take() {
            sink.render(&self.frame());
            self.sink = Some(sink);
        }
    }

    /// The document peers should see: the store without an uncommitted placeholder.
    fn shared_view(&self) -> Snapshot {
        match self.interaction.staged() {
            Some(id) => self.doc.store.remove(&[id]),
            None => self.doc.store.clone(),
        }
    }

    fn sync(&mut self) {
        if !self.doc.take_unsynced() {
            return;
        }
        let view = self.shared_view();
        if let Some(collab) = self.collab.as_mut() {
            collab.publish(&self.last_synced, &view);
        }
        self.last_synced = view;
    }

    // --- Collaboration ---

    /// Attach a replica. Call [`Engine::connected`] once the transport is up.
    ///
    /// Local commits made before connecting are applied to the replica
    /// right away; if the shared document turns out to be non-empty on
    /// connection, it replaces the local elements.
    pub fn enable_collaboration(&mut self, replica: Box<dyn ReplicatedStore>, color: SerializableColor) {
        log::info!("Collaboration enabled as peer {}", replica.peer_id());
        self.last_synced = self.shared_view();
        self.collab = Some(Collaboration::new(replica, color, self.config.cursor_throttle_ms));
    }

    pub fn collaboration(&self) -> Option<&Collaboration> {
        self.collab.as_ref()
    }

    pub fn is_collaborating(&self) -> bool {
        self.collab.is_some()
    }

    /// The transport (re)connected: seed or resync, then adopt the merged document.
    pub fn connected(&mut self) {
        let view = self.shared_view();
        let Some(collab) = self.collab.as_mut() else {
            log::warn!("connected() without collaboration enabled");
            return;
        };
        collab.connected(&view);
        self.adopt_replica();
    }

    /// Merge one inbound transport message. Malformed messages are dropped
    /// without touching the document and reported as an error.
    pub fn receive(&mut self, json: &str) -> EngineResult<()> {
        let Some(collab) = self.collab.as_mut() else {
            log::warn!("Dropping inbound message, collaboration is not enabled");
            return Ok(());
        };
        match collab.receive(json)? {
            Inbound::Document => self.adopt_replica(),
            Inbound::Cursors => self.notify(),
            Inbound::Nothing => {}
        }
        Ok(())
    }

    /// Drain queued outbound messages for the transport.
    pub fn take_outgoing(&mut self) -> Vec<String> {
        self.collab.as_mut().map(Collaboration::take_outgoing).unwrap_or_default()
    }

    pub fn remote_cursors(&self) -> Vec<RemoteCursor> {
        self.collab.as_ref().map(Collaboration::remote_cursors).unwrap_or_default()
    }

    /// Show the merged replica. No history entry is recorded.
    fn adopt_replica(&mut self) {
        let Some(collab) = self.collab.as_ref() else {
            return;
        };
        let merged = self.doc.store.replace_all(collab.replica_elements());
        let mut next = merged.clone();
        if let Some(id) = self.interaction.staged() {
            if let Some(placeholder) = self.doc.store.get_shared(id) {
                next = next.insert_shared(Arc::clone(placeholder));
            }
        }
        self.doc.stage(next);
        if let Some(id) = self.interaction.editing() {
            if !self.doc.store.contains(id) {
                log::info!("Element {id} was removed remotely during its text edit");
                self.interaction.cancel(&mut self.doc);
            }
        }
        self.last_synced = merged;
        self.notify();
    }

    fn track_cursor(&mut self, event: &InputEvent) {
        let Some(collab) = self.collab.as_mut() else {
            return;
        };
        match event.kind {
            InputKind::Down | InputKind::Move | InputKind::Up => {
                collab.move_cursor(event.position, event.timestamp_ms)
            }
            InputKind::Leave => collab.leave(),
            InputKind::KeyDown(_) => {}
        }
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new(EngineConfig::default(), ToolStyle::default())
    }
}
