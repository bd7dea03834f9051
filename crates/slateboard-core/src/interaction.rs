//! Interaction state machine.
//!
//! Turns pointer and key events into document changes. Moves only update
//! the in-progress gesture; the document changes when a gesture ends, and
//! each finished gesture is one history entry.

use crate::config::EngineConfig;
use crate::engine::Document;
use crate::geometry::{elements_within, hit_test, topmost_hit};
use crate::input::{ClickTracker, InputEvent, InputKind, Key, Modifiers};
use crate::selection::{self, HandleKind};
use crate::shapes::{
    Element, ElementId, Image, Shape, ShapeKind, StickyNote, Stroke, TextBlock, strip_list_markers,
};
use crate::tools::{ToolKind, ToolStyle};
use kurbo::{Point, Rect, Vec2};
use std::sync::Arc;

/// Read-only inputs for one event.
#[derive(Debug, Clone, Copy)]
pub(crate) struct ToolContext<'a> {
    pub tool: ToolKind,
    pub style: &'a ToolStyle,
    pub config: &'a EngineConfig,
}

/// State of the gesture in progress.
#[derive(Debug, Clone, Default)]
pub enum InteractionState {
    #[default]
    Idle,
    /// Freehand stroke being drawn.
    Drawing { stroke: Stroke },
    /// Shape being dragged out from its anchor.
    PlacingShape { shape: Shape },
    /// Selected elements being moved. Originals are captured once at pointer-down.
    Dragging {
        start: Point,
        current: Point,
        originals: Vec<Arc<Element>>,
    },
    /// Corner or endpoint of one element being dragged.
    Resizing {
        handle: HandleKind,
        original: Arc<Element>,
        aspect_lock: bool,
        current: Point,
    },
    Rotating {
        original: Arc<Element>,
        centroid: Point,
        start: Point,
        current: Point,
    },
    /// Marquee selection.
    RubberBand { anchor: Point, current: Point, additive: bool },
    /// Text of one element being typed. `fresh` elements were placed by this
    /// edit and are not in history yet.
    EditingText {
        id: ElementId,
        buffer: String,
        fresh: bool,
    },
}

impl InteractionState {
    pub fn name(&self) -> &'static str {
        match self {
            InteractionState::Idle => "idle",
            InteractionState::Drawing { .. } => "drawing",
            InteractionState::PlacingShape { .. } => "placing_shape",
            InteractionState::Dragging { .. } => "dragging",
            InteractionState::Resizing { .. } => "resizing",
            InteractionState::Rotating { .. } => "rotating",
            InteractionState::RubberBand { .. } => "rubber_band",
            InteractionState::EditingText { .. } => "editing_text",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, InteractionState::Idle)
    }
}

/// Text currently being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct TextEditPreview {
    pub id: ElementId,
    pub buffer: String,
}

/// Live gesture geometry for the rendering sink to draw over the committed elements.
///
/// A preview element with the id of a committed element stands in for it
/// until the gesture ends.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InteractionSession {
    pub elements: Vec<Element>,
    pub marquee: Option<Rect>,
    pub editing: Option<TextEditPreview>,
}

impl InteractionSession {
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty() && self.marquee.is_none() && self.editing.is_none()
    }
}

/// Gesture state plus double-click tracking.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    state: InteractionState,
    clicks: ClickTracker,
}

impl Interaction {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &InteractionState {
        &self.state
    }

    /// Id of the element whose text is being edited.
    pub fn editing(&self) -> Option<ElementId> {
        match &self.state {
            InteractionState::EditingText { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// Id of a placed element that only exists until its edit ends.
    pub(crate) fn staged(&self) -> Option<ElementId> {
        match &self.state {
            InteractionState::EditingText { id, fresh: true, .. } => Some(*id),
            _ => None,
        }
    }

    /// Feed one event. Returns true if anything visible changed.
    pub(crate) fn handle(&mut self, event: &InputEvent, doc: &mut Document, ctx: ToolContext<'_>) -> bool {
        match &event.kind {
            InputKind::Down => self.pointer_down(event, doc, ctx),
            InputKind::Move => self.pointer_move(event.position),
            InputKind::Up => self.pointer_up(event.position, doc, ctx),
            InputKind::KeyDown(key) => self.key_down(key, event.modifiers, doc),
            InputKind::Leave => {
                if self.state.is_idle() || self.editing().is_some() {
                    false
                } else {
                    self.cancel(doc)
                }
            }
        }
    }

    /// Abandon the gesture without committing. A freshly placed text element is removed.
    pub(crate) fn cancel(&mut self, doc: &mut Document) -> bool {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => false,
            InteractionState::EditingText { id, fresh, .. } => {
                log::debug!("Cancelled text edit of {id}");
                if fresh {
                    let next = doc.store.remove(&[id]);
                    doc.stage(next);
                }
                true
            }
            other => {
                log::debug!("Cancelled {} gesture", other.name());
                true
            }
        }
    }

    /// Commit a pending text edit. Empty text (ignoring list markers) removes the element.
    pub(crate) fn finish_edit(&mut self, doc: &mut Document, ctx: ToolContext<'_>) -> bool {
        let (id, buffer, fresh) = match std::mem::take(&mut self.state) {
            InteractionState::EditingText { id, buffer, fresh } => (id, buffer, fresh),
            other => {
                self.state = other;
                return false;
            }
        };
        let base = if fresh {
            doc.store.remove(&[id])
        } else {
            doc.store.clone()
        };
        let next = if strip_list_markers(&buffer).trim().is_empty() {
            log::debug!("Text of {id} is empty, removing element");
            doc.store.remove(&[id])
        } else {
            doc.store.patch(id, |e| {
                let mut edited = e.clone();
                edited.set_text_content(buffer);
                edited
            })
        };
        doc.commit(base, next);
        if ctx.tool != ToolKind::Select {
            doc.selection.clear();
        }
        true
    }

    /// Geometry of the gesture in progress.
    pub fn preview(&self) -> InteractionSession {
        let mut session = InteractionSession::default();
        match &self.state {
            InteractionState::Idle => {}
            InteractionState::Drawing { stroke } => session.elements.push(Element::Stroke(stroke.clone())),
            InteractionState::PlacingShape { shape } => session.elements.push(Element::Shape(shape.clone())),
            InteractionState::Dragging {
                start,
                current,
                originals,
            } => {
                let delta = *current - *start;
                session.elements = originals.iter().map(|e| selection::apply_move(e, delta)).collect();
            }
            InteractionState::Resizing {
                handle,
                original,
                aspect_lock,
                current,
            } => {
                if let Some(resized) = resized(original, *handle, *current, *aspect_lock) {
                    session.elements.push(resized);
                }
            }
            InteractionState::Rotating {
                original,
                centroid,
                start,
                current,
            } => session
                .elements
                .push(selection::apply_rotation(original, *centroid, *start, *current)),
            InteractionState::RubberBand { anchor, current, .. } => {
                session.marquee = Some(Rect::from_points(*anchor, *current));
            }
            InteractionState::EditingText { id, buffer, .. } => {
                session.editing = Some(TextEditPreview {
                    id: *id,
                    buffer: buffer.clone(),
                });
            }
        }
        session
    }

    /// Element under the pointer: the host's hit if it still exists, else our own hit test.
    fn resolve_target(event: &InputEvent, doc: &Document, config: &EngineConfig) -> Option<ElementId> {
        event
            .target_hit
            .filter(|&id| doc.store.contains(id))
            .or_else(|| topmost_hit(doc.store.iter(), event.position, config).map(Element::id))
    }

    fn pointer_down(&mut self, event: &InputEvent, doc: &mut Document, ctx: ToolContext<'_>) -> bool {
        let mut changed = false;
        if let Some(id) = self.editing() {
            let on_edited = event.target_hit == Some(id)
                || doc.store.get(id).is_some_and(|e| hit_test(event.position, e, ctx.config));
            if on_edited {
                return false;
            }
            changed |= self.finish_edit(doc, ctx);
        }
        if !self.state.is_idle() {
            log::debug!("Pointer-down during {} gesture, dropping it", self.state.name());
            self.state = InteractionState::Idle;
        }

        let target = Self::resolve_target(event, doc, ctx.config);
        let double = self.clicks.register(target, event.timestamp_ms, ctx.config.double_click_ms);
        let p = event.position;

        changed |= match ctx.tool {
            ToolKind::Select => self.select_down(event, target, double, doc, ctx),
            tool if tool.places_text() => self.text_down(p, target, doc, ctx),
            ToolKind::ImageInsert => place_pending_image(p, doc, ctx),
            ToolKind::Pen | ToolKind::Eraser | ToolKind::Highlighter => {
                let blend = ctx.tool.stroke_blend().unwrap_or_default();
                let (width, color) = ctx.style.stroke_params(blend);
                self.state = InteractionState::Drawing {
                    stroke: Stroke::from_points(vec![p], width, color, blend),
                };
                true
            }
            tool => match tool.shape_kind() {
                Some(kind) => {
                    self.state = InteractionState::PlacingShape {
                        shape: styled_shape(kind, p, p, ctx.style),
                    };
                    true
                }
                None => false,
            },
        };
        changed
    }

    fn select_down(
        &mut self,
        event: &InputEvent,
        target: Option<ElementId>,
        double: bool,
        doc: &mut Document,
        ctx: ToolContext<'_>,
    ) -> bool {
        let p = event.position;

        // Handles of a single selected element take priority over element bodies.
        if let Some(selected) = doc.selection.single().and_then(|id| doc.store.get_shared(id)) {
            if let Some(handle) = selection::hit_test_handles(selected, p, ctx.config) {
                let original = Arc::clone(selected);
                self.state = match handle {
                    HandleKind::Rotate => InteractionState::Rotating {
                        centroid: selection::rotation_centroid(&original),
                        original,
                        start: p,
                        current: p,
                    },
                    _ => InteractionState::Resizing {
                        handle,
                        original,
                        aspect_lock: event.modifiers.shift,
                        current: p,
                    },
                };
                return true;
            }
        }

        let Some(id) = target else {
            if !event.modifiers.shift {
                doc.selection.clear();
            }
            self.state = InteractionState::RubberBand {
                anchor: p,
                current: p,
                additive: event.modifiers.shift,
            };
            return true;
        };

        if double && doc.store.get(id).is_some_and(Element::is_text_bearing) {
            doc.selection.set([id], &doc.store);
            self.begin_edit(id, doc);
            return true;
        }

        if event.modifiers.shift {
            doc.selection.toggle(id);
            if !doc.selection.contains(id) {
                return true;
            }
        } else if !doc.selection.contains(id) {
            doc.selection.set([id], &doc.store);
        }

        let originals: Vec<Arc<Element>> = doc
            .store
            .shared()
            .iter()
            .filter(|e| doc.selection.contains(e.id()))
            .cloned()
            .collect();
        self.state = InteractionState::Dragging {
            start: p,
            current: p,
            originals,
        };
        true
    }

    fn text_down(&mut self, p: Point, target: Option<ElementId>, doc: &mut Document, ctx: ToolContext<'_>) -> bool {
        if let Some(id) = target.filter(|&id| doc.store.get(id).is_some_and(Element::is_text_bearing)) {
            self.begin_edit(id, doc);
            return true;
        }

        let initial = ctx.style.list_format.marker(0);
        let element = if ctx.tool == ToolKind::Sticky {
            let mut note = StickyNote::centered(p, ctx.config.sticky_note_size);
            note.color = ctx.style.note_color;
            note.font_size = ctx.style.font_size;
            note.list_format = ctx.style.list_format;
            note.content = initial.clone();
            Element::StickyNote(note)
        } else {
            let mut text = TextBlock::new(p, initial.clone());
            text.color = ctx.style.stroke_color;
            text.font_size = ctx.style.font_size;
            text.list_format = ctx.style.list_format;
            Element::Text(text)
        };
        let id = element.id();
        let next = doc.store.insert(element);
        doc.stage(next);
        self.state = InteractionState::EditingText {
            id,
            buffer: initial,
            fresh: true,
        };
        true
    }

    fn begin_edit(&mut self, id: ElementId, doc: &Document) {
        let buffer = doc
            .store
            .get(id)
            .and_then(Element::text_content)
            .unwrap_or_default()
            .to_string();
        self.clicks.reset();
        self.state = InteractionState::EditingText {
            id,
            buffer,
            fresh: false,
        };
    }

    fn pointer_move(&mut self, p: Point) -> bool {
        match &mut self.state {
            InteractionState::Idle | InteractionState::EditingText { .. } => false,
            InteractionState::Drawing { stroke } => {
                if stroke.points.last() == Some(&p) {
                    return false;
                }
                stroke.points.push(p);
                true
            }
            InteractionState::PlacingShape { shape } => {
                shape.set_endpoint(1, p);
                true
            }
            InteractionState::Dragging { current, .. }
            | InteractionState::Resizing { current, .. }
            | InteractionState::Rotating { current, .. }
            | InteractionState::RubberBand { current, .. } => {
                *current = p;
                true
            }
        }
    }

    fn pointer_up(&mut self, p: Point, doc: &mut Document, ctx: ToolContext<'_>) -> bool {
        match std::mem::take(&mut self.state) {
            InteractionState::Idle => {
                log::debug!("Pointer-up without a gesture");
                false
            }
            editing @ InteractionState::EditingText { .. } => {
                self.state = editing;
                false
            }
            InteractionState::Drawing { mut stroke } => {
                if stroke.points.last() != Some(&p) {
                    stroke.points.push(p);
                }
                let element = Element::Stroke(stroke);
                if let Err(reason) = element.validate() {
                    log::debug!("Discarding stroke: {reason}");
                    return true;
                }
                commit_new(element, doc, ctx);
                true
            }
            InteractionState::PlacingShape { mut shape } => {
                shape.set_endpoint(1, p);
                if shape.start().distance(shape.end()) < ctx.config.min_gesture_distance {
                    log::debug!("Shape gesture below threshold, ignoring");
                    return true;
                }
                commit_new(Element::Shape(shape), doc, ctx);
                true
            }
            InteractionState::Dragging { start, originals, .. } => {
                if originals.is_empty() {
                    return false;
                }
                let delta: Vec2 = p - start;
                if delta == Vec2::ZERO {
                    return true;
                }
                let moved = originals.iter().map(|e| selection::apply_move(e, delta));
                let base = doc.store.clone();
                let next = base.patch_many(moved);
                doc.commit(base, next);
                true
            }
            InteractionState::Resizing {
                handle,
                original,
                aspect_lock,
                ..
            } => {
                let Some(updated) = resized(&original, handle, p, aspect_lock) else {
                    return true;
                };
                let base = doc.store.clone();
                let next = base.patch_many([updated]);
                doc.commit(base, next);
                true
            }
            InteractionState::Rotating {
                original,
                centroid,
                start,
                ..
            } => {
                let updated = selection::apply_rotation(&original, centroid, start, p);
                let base = doc.store.clone();
                let next = base.patch_many([updated]);
                doc.commit(base, next);
                true
            }
            InteractionState::RubberBand { anchor, additive, .. } => {
                let mut ids = elements_within(doc.store.iter(), Rect::from_points(anchor, p));
                if additive {
                    ids.extend(doc.selection.ids());
                }
                doc.selection.set(ids, &doc.store);
                true
            }
        }
    }

    fn key_down(&mut self, key: &Key, modifiers: Modifiers, doc: &mut Document) -> bool {
        if self.editing().is_some() {
            if *key == Key::Escape {
                return self.cancel(doc);
            }
            return self.edit_key(key, modifiers, doc);
        }
        if !self.state.is_idle() {
            return *key == Key::Escape && self.cancel(doc);
        }

        match key {
            Key::Escape => {
                let had_selection = !doc.selection.is_empty();
                doc.selection.clear();
                had_selection
            }
            Key::Delete | Key::Backspace => doc.delete_selected(),
            Key::Char(c) if modifiers.command() => match c.to_ascii_lowercase() {
                'z' if modifiers.shift => doc.redo(),
                'z' => doc.undo(),
                'y' => doc.redo(),
                'a' => {
                    let ids = doc.store.ids();
                    doc.selection.set(ids, &doc.store);
                    true
                }
                _ => false,
            },
            _ => false,
        }
    }

    /// Typing into the edit buffer. Enter continues the element's list format.
    fn edit_key(&mut self, key: &Key, modifiers: Modifiers, doc: &Document) -> bool {
        let InteractionState::EditingText { id, buffer, .. } = &mut self.state else {
            return false;
        };
        match key {
            Key::Enter => {
                let list = doc.store.get(*id).and_then(Element::list_format).unwrap_or_default();
                let next_line = buffer.split('\n').count();
                buffer.push('\n');
                buffer.push_str(&list.marker(next_line));
            }
            Key::Backspace => {
                buffer.pop();
            }
            Key::Char(c) if !modifiers.command() => buffer.push(*c),
            _ => return false,
        }
        true
    }
}

fn styled_shape(kind: ShapeKind, start: Point, end: Point, style: &ToolStyle) -> Shape {
    let mut shape = Shape::new(kind, start, end);
    shape.stroke_color = style.stroke_color;
    shape.stroke_width = style.stroke_width;
    shape.fill_color = if kind.is_linear() { None } else { style.fill_color };
    shape
}

fn resized(original: &Element, handle: HandleKind, pointer: Point, aspect_lock: bool) -> Option<Element> {
    match handle {
        HandleKind::Endpoint(index) => Some(selection::apply_endpoint(original, index, pointer)),
        HandleKind::Corner(corner) => Some(selection::apply_resize(original, corner, pointer, aspect_lock)),
        HandleKind::Rotate => None,
    }
}

/// Commit a newly created element on top. Creating with a drawing tool drops the selection.
fn commit_new(element: Element, doc: &mut Document, ctx: ToolContext<'_>) {
    log::debug!("Committing new {} {}", element.kind_name(), element.id());
    let base = doc.store.clone();
    let next = base.insert(element);
    doc.commit(base, next);
    if ctx.tool != ToolKind::Select {
        doc.selection.clear();
    }
}

fn place_pending_image(center: Point, doc: &mut Document, ctx: ToolContext<'_>) -> bool {
    let Some(source) = ctx.style.pending_image.clone() else {
        log::debug!("Image tool click without a pending image");
        return false;
    };
    let element = Element::Image(Image::centered(center, source));
    if let Err(reason) = element.validate() {
        log::warn!("Rejecting image: {reason}");
        return false;
    }
    commit_new(element, doc, ctx);
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shapes::{ImageRef, ListFormat};

    struct Harness {
        doc: Document,
        interaction: Interaction,
        style: ToolStyle,
        config: EngineConfig,
        tool: ToolKind,
    }

    impl Harness {
        fn new(tool: ToolKind) -> Self {
            Self {
                doc: Document::default(),
                interaction: Interaction::new(),
                style: ToolStyle::default(),
                config: EngineConfig::default(),
                tool,
            }
        }

        fn send(&mut self, event: InputEvent) -> bool {
            let ctx = ToolContext {
                tool: self.tool,
                style: &self.style,
                config: &self.config,
            };
            self.interaction.handle(&event, &mut self.doc, ctx)
        }

        fn drag(&mut self, from: Point, to: Point, steps: usize) {
            self.send(InputEvent::down(from));
            for i in 1..=steps {
                let t = i as f64 / steps as f64;
                self.send(InputEvent::moved(from.lerp(to, t)));
            }
            self.send(InputEvent::up(to));
        }

        fn add(&mut self, element: Element) -> ElementId {
            let id = element.id();
            let base = self.doc.store.clone();
            let next = base.insert(element);
            self.doc.commit(base, next);
            id
        }
    }

    fn rect(x0: f64, y0: f64, x1: f64, y1: f64) -> Element {
        Element::Shape(Shape::new(ShapeKind::Rectangle, Point::new(x0, y0), Point::new(x1, y1)))
    }

    #[test]
    fn test_drag_delta_independent_of_move_count() {
        for steps in [1, 7, 40] {
            let mut h = Harness::new(ToolKind::Select);
            let a = h.add(rect(0.0, 0.0, 20.0, 20.0));
            let b = h.add(rect(100.0, 100.0, 120.0, 120.0));
            h.doc.selection.set([a, b], &h.doc.store);

            h.drag(Point::new(10.0, 10.0), Point::new(35.0, -5.0), steps);

            let bounds_a = h.doc.store.get(a).unwrap().bounds();
            let bounds_b = h.doc.store.get(b).unwrap().bounds();
            assert_eq!(bounds_a.origin(), Point::new(25.0, -15.0));
            assert_eq!(bounds_b.origin(), Point::new(125.0, 85.0));
            assert_eq!(h.doc.history.len(), 4);
        }
    }

    #[test]
    fn test_moves_do_not_commit() {
        let mut h = Harness::new(ToolKind::Pen);
        h.send(InputEvent::down(Point::new(0.0, 0.0)));
        for i in 1..10 {
            h.send(InputEvent::moved(Point::new(i as f64, 0.0)));
        }
        assert!(h.doc.store.is_empty());
        assert_eq!(h.interaction.preview().elements.len(), 1);
        h.send(InputEvent::up(Point::new(10.0, 0.0)));
        assert_eq!(h.doc.store.len(), 1);
        assert_eq!(h.doc.history.len(), 2);
    }

    #[test]
    fn test_shape_below_threshold_rejected() {
        let mut h = Harness::new(ToolKind::Ellipse);
        h.drag(Point::new(10.0, 10.0), Point::new(12.0, 11.0), 2);
        assert!(h.doc.store.is_empty());
        assert!(h.interaction.state().is_idle());

        h.drag(Point::new(10.0, 10.0), Point::new(60.0, 40.0), 2);
        assert_eq!(h.doc.store.len(), 1);
    }

    #[test]
    fn test_escape_cancels_without_commit() {
        let mut h = Harness::new(ToolKind::Rectangle);
        h.send(InputEvent::down(Point::new(0.0, 0.0)));
        h.send(InputEvent::moved(Point::new(50.0, 50.0)));
        assert!(h.send(InputEvent::key(Key::Escape)));
        assert!(h.interaction.state().is_idle());
        assert!(!h.send(InputEvent::up(Point::new(50.0, 50.0))));
        assert!(h.doc.store.is_empty());
        assert_eq!(h.doc.history.len(), 1);
    }

    #[test]
    fn test_pointer_leave_abandons_gesture() {
        let mut h = Harness::new(ToolKind::Pen);
        h.send(InputEvent::down(Point::new(0.0, 0.0)));
        h.send(InputEvent::moved(Point::new(5.0, 5.0)));
        assert!(h.send(InputEvent::leave()));
        assert!(h.interaction.state().is_idle());
        assert!(h.doc.store.is_empty());
    }

    #[test]
    fn test_up_without_gesture_is_noop() {
        let mut h = Harness::new(ToolKind::Select);
        assert!(!h.send(InputEvent::up(Point::new(5.0, 5.0))));
        assert!(h.interaction.state().is_idle());
    }

    #[test]
    fn test_rubber_band_selects_fully_enclosed_only() {
        let mut h = Harness::new(ToolKind::Select);
        let note = h.add(Element::StickyNote(StickyNote::new(Point::new(10.0, 10.0), 20.0, 20.0)));
        h.add(rect(90.0, 90.0, 150.0, 150.0));
        h.drag(Point::new(0.0, 0.0), Point::new(100.0, 100.0), 3);
        assert_eq!(h.doc.selection.ids(), vec![note]);
    }

    #[test]
    fn test_rubber_band_preview() {
        let mut h = Harness::new(ToolKind::Select);
        h.send(InputEvent::down(Point::new(50.0, 50.0)));
        h.send(InputEvent::moved(Point::new(10.0, 20.0)));
        assert_eq!(h.interaction.preview().marquee, Some(Rect::new(10.0, 20.0, 50.0, 50.0)));
    }

    #[test]
    fn test_shift_click_toggles() {
        let mut h = Harness::new(ToolKind::Select);
        let a = h.add(rect(0.0, 0.0, 20.0, 20.0));
        let b = h.add(rect(50.0, 0.0, 70.0, 20.0));
        let shift = Modifiers {
            shift: true,
            ..Modifiers::NONE
        };
        h.send(InputEvent::down(Point::new(10.0, 10.0)).at_time(0));
        h.send(InputEvent::up(Point::new(10.0, 10.0)).at_time(10));
        h.send(InputEvent::down(Point::new(60.0, 10.0)).with_modifiers(shift).at_time(1000));
        h.send(InputEvent::up(Point::new(60.0, 10.0)).with_modifiers(shift).at_time(1010));
        assert_eq!(h.doc.selection.len(), 2);
        h.send(InputEvent::down(Point::new(10.0, 10.0)).with_modifiers(shift).at_time(2000));
        h.send(InputEvent::up(Point::new(10.0, 10.0)).at_time(2010));
        assert!(!h.doc.selection.contains(a));
        assert!(h.doc.selection.contains(b));
    }

    #[test]
    fn test_double_click_edits_and_empty_text_deletes() {
        let mut h = Harness::new(ToolKind::Select);
        let mut text = TextBlock::new(Point::new(10.0, 10.0), "• hello".into());
        text.list_format = ListFormat::Bullet;
        let id = h.add(Element::Text(text));
        let p = Point::new(15.0, 15.0);

        h.send(InputEvent::down(p).at_time(100));
        h.send(InputEvent::up(p).at_time(120));
        h.send(InputEvent::down(p).at_time(300));
        assert_eq!(h.interaction.editing(), Some(id));

        for _ in 0.."hello".len() {
            h.send(InputEvent::key(Key::Backspace));
        }
        let ctx = ToolContext {
            tool: h.tool,
            style: &h.style,
            config: &h.config,
        };
        assert!(h.interaction.finish_edit(&mut h.doc, ctx));
        assert!(!h.doc.store.contains(id));
        // Undo brings the text back.
        assert!(h.doc.undo());
        assert!(h.doc.store.contains(id));
    }

    #[test]
    fn test_slow_clicks_do_not_edit() {
        let mut h = Harness::new(ToolKind::Select);
        let id = h.add(Element::Text(TextBlock::new(Point::new(10.0, 10.0), "hi".into())));
        let p = Point::new(12.0, 12.0);
        h.send(InputEvent::down(p).at_time(0));
        h.send(InputEvent::up(p).at_time(10));
        h.send(InputEvent::down(p).at_time(2000));
        assert_eq!(h.interaction.editing(), None);
        assert!(h.doc.selection.contains(id));
    }

    #[test]
    fn test_enter_continues_numbered_list() {
        let mut h = Harness::new(ToolKind::Text);
        h.style.list_format = ListFormat::Numbered;
        h.send(InputEvent::down(Point::new(0.0, 0.0)));
        for key in [Key::Char('a'), Key::Enter, Key::Char('b'), Key::Enter, Key::Char('c')] {
            h.send(InputEvent::key(key));
        }
        let preview = h.interaction.preview().editing.unwrap();
        assert_eq!(preview.buffer, "1. a\n2. b\n3. c");
    }

    #[test]
    fn test_shortcuts_suspended_while_editing() {
        let mut h = Harness::new(ToolKind::Text);
        let existing = h.add(rect(200.0, 200.0, 220.0, 220.0));
        h.doc.selection.set([existing], &h.doc.store);
        h.send(InputEvent::down(Point::new(0.0, 0.0)));
        h.send(InputEvent::key(Key::Delete));
        assert!(h.doc.store.contains(existing));
        let cmd = Modifiers {
            ctrl: true,
            ..Modifiers::NONE
        };
        assert!(!h.send(InputEvent::key(Key::Char('z')).with_modifiers(cmd)));
        assert!(h.doc.store.contains(existing));
    }

    #[test]
    fn test_cancel_fresh_text_removes_placeholder() {
        let mut h = Harness::new(ToolKind::Sticky);
        h.send(InputEvent::down(Point::new(100.0, 100.0)));
        let id = h.interaction.editing().unwrap();
        assert!(h.doc.store.contains(id));
        assert_eq!(h.interaction.staged(), Some(id));
        assert!(h.send(InputEvent::key(Key::Escape)));
        assert!(!h.doc.store.contains(id));
        assert_eq!(h.doc.history.len(), 1);
    }

    #[test]
    fn test_sticky_placement() {
        let mut h = Harness::new(ToolKind::Sticky);
        h.send(InputEvent::down(Point::new(100.0, 100.0)));
        h.send(InputEvent::key(Key::Char('x')));
        // Clicking elsewhere commits, then places a second note.
        h.send(InputEvent::down(Point::new(600.0, 600.0)));
        assert_eq!(h.doc.history.len(), 2);
        let first = h.doc.store.iter().next().unwrap();
        assert_eq!(first.bounds(), Rect::new(0.0, 0.0, 200.0, 200.0));
        assert_eq!(first.text_content(), Some("x"));
    }

    #[test]
    fn test_text_tool_edits_existing_text() {
        let mut h = Harness::new(ToolKind::Text);
        let id = h.add(Element::Text(TextBlock::new(Point::new(10.0, 10.0), "hi".into())));
        h.send(InputEvent::down(Point::new(12.0, 12.0)));
        assert_eq!(h.interaction.editing(), Some(id));
        assert_eq!(h.interaction.staged(), None);
        assert_eq!(h.doc.store.len(), 1);
    }

    #[test]
    fn test_host_target_hit_wins_over_geometry() {
        let mut h = Harness::new(ToolKind::Select);
        let a = h.add(rect(0.0, 0.0, 20.0, 20.0));
        let b = h.add(rect(100.0, 100.0, 120.0, 120.0));
        h.send(InputEvent::down(Point::new(10.0, 10.0)).with_target(b));
        h.send(InputEvent::moved(Point::new(30.0, 10.0)));
        h.send(InputEvent::up(Point::new(30.0, 10.0)));
        assert_eq!(h.doc.selection.ids(), vec![b]);
        assert_eq!(h.doc.store.get(b).unwrap().bounds(), Rect::new(120.0, 100.0, 140.0, 120.0));
        assert_eq!(h.doc.store.get(a).unwrap().bounds(), Rect::new(0.0, 0.0, 20.0, 20.0));
    }

    #[test]
    fn test_stale_target_falls_back_to_hit_test() {
        let mut h = Harness::new(ToolKind::Select);
        let a = h.add(rect(0.0, 0.0, 20.0, 20.0));
        let gone = h.add(rect(100.0, 100.0, 120.0, 120.0));
        let base = h.doc.store.clone();
        h.doc.store = base.remove(&[gone]);
        h.send(InputEvent::down(Point::new(10.0, 10.0)).with_target(gone));
        h.send(InputEvent::up(Point::new(10.0, 10.0)));
        assert_eq!(h.doc.selection.ids(), vec![a]);
    }

    #[test]
    fn test_host_target_on_edited_element_keeps_editing() {
        let mut h = Harness::new(ToolKind::Text);
        let id = h.add(Element::Text(TextBlock::new(Point::new(10.0, 10.0), "hi".into())));
        h.send(InputEvent::down(Point::new(12.0, 12.0)));
        assert_eq!(h.interaction.editing(), Some(id));

        assert!(!h.send(InputEvent::down(Point::new(500.0, 500.0)).with_target(id)));
        assert_eq!(h.interaction.editing(), Some(id));

        // Without the host's hit the same point is outside the text and commits it.
        h.send(InputEvent::down(Point::new(500.0, 500.0)));
        assert_ne!(h.interaction.editing(), Some(id));
    }

    #[test]
    fn test_image_resize_keeps_aspect() {
        let mut h = Harness::new(ToolKind::Select);
        let id = h.add(Element::Image(Image::new(Point::ZERO, ImageRef::new("cat.png", 100, 50))));
        h.doc.selection.set([id], &h.doc.store);
        h.drag(Point::new(100.0, 50.0), Point::new(200.0, 60.0), 3);
        let Some(Element::Image(image)) = h.doc.store.get(id) else {
            panic!("expected image");
        };
        assert_eq!(image.as_rect(), Rect::new(0.0, 0.0, 200.0, 100.0));
    }

    #[test]
    fn test_rotate_handle() {
        let mut h = Harness::new(ToolKind::Select);
        let id = h.add(rect(0.0, 0.0, 100.0, 50.0));
        h.doc.selection.set([id], &h.doc.store);
        // Rotate handle sits 25 above the top edge; sweep a quarter turn clockwise.
        h.drag(Point::new(50.0, -25.0), Point::new(150.0, 25.0), 4);
        let rotation = h.doc.store.get(id).unwrap().rotation();
        assert!((rotation - 90.0).abs() < 1e-9);
        assert_eq!(h.doc.history.len(), 3);
    }

    #[test]
    fn test_line_endpoint_drag() {
        let mut h = Harness::new(ToolKind::Select);
        let line = Element::Shape(Shape::new(ShapeKind::Line, Point::new(0.0, 0.0), Point::new(100.0, 0.0)));
        let id = h.add(line);
        h.doc.selection.set([id], &h.doc.store);
        h.drag(Point::new(100.0, 0.0), Point::new(100.0, 80.0), 2);
        let Some(Element::Shape(shape)) = h.doc.store.get(id) else {
            panic!("expected shape");
        };
        assert_eq!(shape.start(), Point::new(0.0, 0.0));
        assert_eq!(shape.end(), Point::new(100.0, 80.0));
    }

    #[test]
    fn test_image_tool_needs_pending_image() {
        let mut h = Harness::new(ToolKind::ImageInsert);
        assert!(!h.send(InputEvent::down(Point::new(10.0, 10.0))));
        h.style.pending_image = Some(ImageRef::new("cat.png", 40, 20));
        assert!(h.send(InputEvent::down(Point::new(10.0, 10.0))));
        assert_eq!(h.doc.store.len(), 1);
    }

    #[test]
    fn test_drawing_clears_selection() {
        let mut h = Harness::new(ToolKind::Select);
        let id = h.add(rect(0.0, 0.0, 20.0, 20.0));
        h.doc.selection.set([id], &h.doc.store);
        h.tool = ToolKind::Rectangle;
        h.drag(Point::new(50.0, 50.0), Point::new(90.0, 90.0), 1);
        assert!(h.doc.selection.is_empty());
    }
}
