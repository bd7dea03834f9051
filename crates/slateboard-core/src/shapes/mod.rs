//! Element definitions for the whiteboard.

mod image;
mod note;
mod shape;
mod stroke;
mod text;

pub use image::{Image, ImageRef};
pub use note::StickyNote;
pub use shape::{Shape, ShapeKind};
pub use stroke::{BlendMode, Stroke};
pub use text::{ListFormat, TextBlock, strip_list_markers};

use kurbo::{Affine, Point, Rect, Vec2};
use peniko::Color;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    pub fn black() -> Self {
        Self::new(0, 0, 0, 255)
    }

    pub fn white() -> Self {
        Self::new(255, 255, 255, 255)
    }

    /// Default sticky note yellow.
    pub fn note_yellow() -> Self {
        Self::new(255, 235, 130, 255)
    }

    /// Same color with a different alpha.
    pub fn with_alpha(self, a: u8) -> Self {
        Self { a, ..self }
    }

    /// Parse `#rgb`, `#rrggbb` or `#rrggbbaa`. Returns `None` for anything else.
    pub fn from_hex(color: &str) -> Option<Self> {
        let hex = color.trim().strip_prefix('#')?;
        // Byte slicing below requires ASCII; also rules out a `+` sign.
        if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return None;
        }
        let channel = |s: &str| u8::from_str_radix(s, 16).ok();
        match hex.len() {
            3 => {
                let r = channel(&hex[0..1])? * 17;
                let g = channel(&hex[1..2])? * 17;
                let b = channel(&hex[2..3])? * 17;
                Some(Self::new(r, g, b, 255))
            }
            6 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                255,
            )),
            8 => Some(Self::new(
                channel(&hex[0..2])?,
                channel(&hex[2..4])?,
                channel(&hex[4..6])?,
                channel(&hex[6..8])?,
            )),
            _ => None,
        }
    }

    /// Format as `#rrggbbaa`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}{:02x}", self.r, self.g, self.b, self.a)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Unique identifier for elements.
///
/// UUID v7: a millisecond timestamp followed by random bits, so ids minted
/// by different participants do not collide.
pub type ElementId = Uuid;

/// Mint a fresh element id.
pub fn new_element_id() -> ElementId {
    Uuid::now_v7()
}

/// Common behaviour of every element variant.
pub trait ElementTrait {
    /// Get the unique identifier.
    fn id(&self) -> ElementId;

    /// Axis-aligned bounding box in world coordinates.
    fn bounds(&self) -> Rect;

    /// Apply a translation or axis-aligned scale.
    fn transform(&mut self, affine: Affine);

    /// Check that the payload is internally consistent for its variant.
    fn validate(&self) -> Result<(), String>;
}

/// A visual object on the whiteboard.
///
/// Records serialize externally tagged by variant, e.g. `{"Stroke": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Element {
    Stroke(Stroke),
    Shape(Shape),
    StickyNote(StickyNote),
    Text(TextBlock),
    Image(Image),
}

impl Element {
    pub fn id(&self) -> ElementId {
        match self {
            Element::Stroke(e) => e.id(),
            Element::Shape(e) => e.id(),
            Element::StickyNote(e) => e.id(),
            Element::Text(e) => e.id(),
            Element::Image(e) => e.id(),
        }
    }

    pub fn bounds(&self) -> Rect {
        match self {
            Element::Stroke(e) => e.bounds(),
            Element::Shape(e) => e.bounds(),
            Element::StickyNote(e) => e.bounds(),
            Element::Text(e) => e.bounds(),
            Element::Image(e) => e.bounds(),
        }
    }

    pub fn transform(&mut self, affine: Affine) {
        match self {
            Element::Stroke(e) => e.transform(affine),
            Element::Shape(e) => e.transform(affine),
            Element::StickyNote(e) => e.transform(affine),
            Element::Text(e) => e.transform(affine),
            Element::Image(e) => e.transform(affine),
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        match self {
            Element::Stroke(e) => e.validate(),
            Element::Shape(e) => e.validate(),
            Element::StickyNote(e) => e.validate(),
            Element::Text(e) => e.validate(),
            Element::Image(e) => e.validate(),
        }
    }

    /// Return a copy moved by `delta`.
    pub fn translated(&self, delta: Vec2) -> Element {
        let mut moved = self.clone();
        moved.transform(Affine::translate(delta));
        moved
    }

    /// Short variant name, used in logs and tagged records.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Element::Stroke(_) => "stroke",
            Element::Shape(_) => "shape",
            Element::StickyNote(_) => "sticky_note",
            Element::Text(_) => "text",
            Element::Image(_) => "image",
        }
    }

    /// Text content for text-bearing variants.
    pub fn text_content(&self) -> Option<&str> {
        match self {
            Element::StickyNote(n) => Some(&n.content),
            Element::Text(t) => Some(&t.content),
            _ => None,
        }
    }

    /// List format for text-bearing variants.
    pub fn list_format(&self) -> Option<ListFormat> {
        match self {
            Element::StickyNote(n) => Some(n.list_format),
            Element::Text(t) => Some(t.list_format),
            _ => None,
        }
    }

    /// Replace the text content of a text-bearing element.
    pub fn set_text_content(&mut self, content: String) {
        match self {
            Element::StickyNote(n) => n.content = content,
            Element::Text(t) => t.content = content,
            _ => {}
        }
    }

    /// Check if this element carries editable text.
    pub fn is_text_bearing(&self) -> bool {
        matches!(self, Element::StickyNote(_) | Element::Text(_))
    }

    /// Get the rotation angle in degrees (0 for elements that don't rotate).
    pub fn rotation(&self) -> f64 {
        match self {
            Element::Shape(s) if s.supports_rotation() => s.rotation,
            Element::Image(i) => i.rotation,
            _ => 0.0,
        }
    }

    /// Set the rotation angle in degrees. Ignored by elements that don't rotate.
    pub fn set_rotation(&mut self, degrees: f64) {
        match self {
            Element::Shape(s) if s.supports_rotation() => s.rotation = degrees,
            Element::Image(i) => i.rotation = degrees,
            _ => {}
        }
    }

    /// Check if this element supports rotation.
    pub fn supports_rotation(&self) -> bool {
        match self {
            Element::Shape(s) => s.supports_rotation(),
            Element::Image(_) => true,
            _ => false,
        }
    }

    /// Check if resizing must keep the original aspect ratio.
    pub fn locks_aspect_ratio(&self) -> bool {
        matches!(self, Element::Image(_))
    }

    /// Check if this element is a line or arrow (resized by its endpoints).
    pub fn is_linear(&self) -> bool {
        matches!(self, Element::Shape(s) if s.kind.is_linear())
    }
}

/// Bounding box of a rectangle rotated by `degrees` around its center.
pub(crate) fn rotated_bounds(rect: Rect, degrees: f64) -> Rect {
    if degrees == 0.0 {
        return rect;
    }
    let center = rect.center();
    let rotate = Affine::rotate_about(degrees.to_radians(), center);
    let corners = [
        Point::new(rect.x0, rect.y0),
        Point::new(rect.x1, rect.y0),
        Point::new(rect.x1, rect.y1),
        Point::new(rect.x0, rect.y1),
    ];
    corners
        .iter()
        .map(|&p| rotate * p)
        .fold(Rect::from_points(rotate * corners[0], rotate * corners[0]), |acc, p| {
            acc.union_pt(p)
        })
}

/// Check every coordinate of a point is finite.
pub(crate) fn finite_point(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}
