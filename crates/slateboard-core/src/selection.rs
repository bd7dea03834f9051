//! Selection set and manipulation handles.

use crate::config::EngineConfig;
use crate::geometry::{angle_around, normalize_degrees};
use crate::shapes::{Element, ElementId};
use crate::store::Snapshot;
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Smallest width or height a resize can produce.
pub const MIN_RESIZE_EXTENT: f64 = 1.0;

/// Ids of the selected elements.
///
/// Every member exists in the document; call [`Selection::retain_existing`]
/// after each store change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<ElementId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the selection with the ids present in `snapshot`.
    pub fn set(&mut self, ids: impl IntoIterator<Item = ElementId>, snapshot: &Snapshot) {
        self.ids = ids.into_iter().filter(|&id| snapshot.contains(id)).collect();
    }

    /// Add or remove one id.
    pub fn toggle(&mut self, id: ElementId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.ids.contains(&id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn ids(&self) -> Vec<ElementId> {
        self.ids.iter().copied().collect()
    }

    /// The only selected id, if exactly one is selected.
    pub fn single(&self) -> Option<ElementId> {
        match self.ids.len() {
            1 => self.ids.first().copied(),
            _ => None,
        }
    }

    /// Drop ids no longer present. Returns true if anything was dropped.
    pub fn retain_existing(&mut self, snapshot: &Snapshot) -> bool {
        let before = self.ids.len();
        self.ids.retain(|&id| snapshot.contains(id));
        self.ids.len() != before
    }
}

/// Corner positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Corner {
    TopLeft,
    TopRight,
    BottomLeft,
    BottomRight,
}

impl Corner {
    pub const ALL: [Corner; 4] = [Corner::TopLeft, Corner::TopRight, Corner::BottomLeft, Corner::BottomRight];

    /// This corner of `rect`.
    pub fn of(self, rect: Rect) -> Point {
        match self {
            Corner::TopLeft => Point::new(rect.x0, rect.y0),
            Corner::TopRight => Point::new(rect.x1, rect.y0),
            Corner::BottomLeft => Point::new(rect.x0, rect.y1),
            Corner::BottomRight => Point::new(rect.x1, rect.y1),
        }
    }

    pub fn opposite(self) -> Corner {
        match self {
            Corner::TopLeft => Corner::BottomRight,
            Corner::TopRight => Corner::BottomLeft,
            Corner::BottomLeft => Corner::TopRight,
            Corner::BottomRight => Corner::TopLeft,
        }
    }
}

/// Type of selection handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HandleKind {
    /// Endpoint of a line or arrow (0 = start, 1 = end).
    Endpoint(usize),
    /// Resize corner.
    Corner(Corner),
    /// Rotation handle above the top edge.
    Rotate,
}

/// A selection handle with its world position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Handle {
    pub position: Point,
    pub kind: HandleKind,
}

impl Handle {
    pub fn new(position: Point, kind: HandleKind) -> Self {
        Self { position, kind }
    }

    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        self.position.distance(point) <= tolerance
    }
}

/// Unrotated frame of a resizable element, with its rotation in degrees.
fn frame_of(element: &Element) -> Option<(Rect, f64)> {
    match element {
        Element::Shape(s) if !s.kind.is_linear() => Some((s.box_rect(), s.rotation)),
        Element::Image(i) => Some((i.as_rect(), i.rotation)),
        Element::StickyNote(n) => Some((n.as_rect(), 0.0)),
        Element::Stroke(_) => Some((element.bounds(), 0.0)),
        _ => None,
    }
}

fn corner_handles(rect: Rect, degrees: f64) -> impl Iterator<Item = Handle> {
    let rotate = Affine::rotate_about(degrees.to_radians(), rect.center());
    Corner::ALL
        .into_iter()
        .map(move |c| Handle::new(rotate * c.of(rect), HandleKind::Corner(c)))
}

/// Handles for one element. Text has none.
pub fn handles(element: &Element, config: &EngineConfig) -> Vec<Handle> {
    if let Element::Shape(shape) = element {
        if shape.kind.is_linear() {
            return vec![
                Handle::new(shape.start(), HandleKind::Endpoint(0)),
                Handle::new(shape.end(), HandleKind::Endpoint(1)),
            ];
        }
    }
    let Some((rect, degrees)) = frame_of(element) else {
        return Vec::new();
    };
    let mut result: Vec<Handle> = corner_handles(rect, degrees).collect();
    if element.supports_rotation() {
        let rotate = Affine::rotate_about(degrees.to_radians(), rect.center());
        let top = Point::new(rect.center().x, rect.y0 - config.rotate_handle_offset);
        result.push(Handle::new(rotate * top, HandleKind::Rotate));
    }
    result
}

/// Find which handle of `element` (if any) is under `point`.
pub fn hit_test_handles(element: &Element, point: Point, config: &EngineConfig) -> Option<HandleKind> {
    handles(element, config)
        .into_iter()
        .find(|h| h.hit_test(point, config.handle_tolerance))
        .map(|h| h.kind)
}

/// Point about which an element rotates.
pub fn rotation_centroid(element: &Element) -> Point {
    frame_of(element).map_or_else(|| element.bounds().center(), |(rect, _)| rect.center())
}

/// Rotate `original` by the angle swept from `start` to `pointer` around `centroid`.
///
/// The result is normalized into [0, 360) degrees.
pub fn apply_rotation(original: &Element, centroid: Point, start: Point, pointer: Point) -> Element {
    let swept = angle_around(centroid, pointer) - angle_around(centroid, start);
    let mut rotated = original.clone();
    rotated.set_rotation(normalize_degrees(original.rotation() + swept));
    rotated
}

/// Move one endpoint of a line or arrow to `pointer`.
pub fn apply_endpoint(original: &Element, index: usize, pointer: Point) -> Element {
    let mut moved = original.clone();
    if let Element::Shape(shape) = &mut moved {
        if shape.kind.is_linear() {
            shape.set_endpoint(index, pointer);
        }
    }
    moved
}

/// New unrotated frame for dragging `corner` of `rect` to `local` (in the unrotated frame).
///
/// The opposite corner stays put. With `keep_aspect` the original ratio is kept,
/// scaling by whichever axis grew more.
fn resized_rect(rect: Rect, corner: Corner, local: Point, keep_aspect: bool) -> Rect {
    let anchor = corner.opposite().of(rect);
    let dx = local.x - anchor.x;
    let dy = local.y - anchor.y;
    let (width, height) = if keep_aspect {
        let old_w = rect.width().max(MIN_RESIZE_EXTENT);
        let old_h = rect.height().max(MIN_RESIZE_EXTENT);
        let scale = (dx.abs() / old_w).max(dy.abs() / old_h);
        let scale = scale.max(MIN_RESIZE_EXTENT / old_w.min(old_h));
        (old_w * scale, old_h * scale)
    } else {
        (dx.abs().max(MIN_RESIZE_EXTENT), dy.abs().max(MIN_RESIZE_EXTENT))
    };
    let far = Point::new(
        anchor.x + width.copysign(if dx == 0.0 { 1.0 } else { dx }),
        anchor.y + height.copysign(if dy == 0.0 { 1.0 } else { dy }),
    );
    Rect::from_points(anchor, far)
}

fn set_frame(element: &mut Element, old: Rect, new: Rect) {
    match element {
        Element::Shape(shape) => shape.set_box(new),
        Element::Image(image) => image.set_rect(new),
        Element::StickyNote(note) => note.set_rect(new),
        Element::Stroke(stroke) => {
            let sx = new.width() / old.width().max(MIN_RESIZE_EXTENT);
            let sy = new.height() / old.height().max(MIN_RESIZE_EXTENT);
            for p in &mut stroke.points {
                p.x = new.x0 + (p.x - old.x0) * sx;
                p.y = new.y0 + (p.y - old.y0) * sy;
            }
        }
        Element::Text(_) => {}
    }
}

/// Resize `original` by dragging `corner` to `pointer`.
///
/// Images always keep their aspect ratio; other elements only when
/// `aspect_lock` is set. Rotated elements resize in their own frame and keep
/// the opposite corner fixed on screen.
pub fn apply_resize(original: &Element, corner: Corner, pointer: Point, aspect_lock: bool) -> Element {
    let Some((rect, degrees)) = frame_of(original) else {
        return original.clone();
    };
    let keep_aspect = aspect_lock || original.locks_aspect_ratio();
    let to_world = Affine::rotate_about(degrees.to_radians(), rect.center());
    let local = to_world.inverse() * pointer;
    let mut next = resized_rect(rect, corner, local, keep_aspect);

    if degrees != 0.0 {
        // Rotating about the new center shifts the anchor; pull it back.
        let anchor = corner.opposite();
        let before = to_world * anchor.of(rect);
        let after = Affine::rotate_about(degrees.to_radians(), next.center()) * anchor.of(next);
        next = next + (before - after);
    }

    let mut resized = original.clone();
    set_frame(&mut resized, rect, next);
    resized
}

/// Translate `original` by `delta`.
pub fn apply_move(original: &Element, delta: Vec2) -> Element {
    original.translated(delta)
}
