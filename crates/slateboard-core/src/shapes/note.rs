//! Sticky note element.

use super::{ElementId, ElementTrait, ListFormat, SerializableColor, finite_point, new_element_id};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// A filled square carrying text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StickyNote {
    pub(crate) id: ElementId,
    /// Top-left corner position.
    pub position: Point,
    pub width: f64,
    pub height: f64,
    pub content: String,
    /// Background color.
    pub color: SerializableColor,
    pub font_size: f64,
    #[serde(default)]
    pub list_format: ListFormat,
}

impl StickyNote {
    pub const DEFAULT_FONT_SIZE: f64 = 18.0;

    pub fn new(position: Point, width: f64, height: f64) -> Self {
        Self {
            id: new_element_id(),
            position,
            width,
            height,
            content: String::new(),
            color: SerializableColor::note_yellow(),
            font_size: Self::DEFAULT_FONT_SIZE,
            list_format: ListFormat::None,
        }
    }

    /// Create a square note of `size` centered on `center`.
    pub fn centered(center: Point, size: f64) -> Self {
        let half = size / 2.0;
        Self::new(Point::new(center.x - half, center.y - half), size, size)
    }

    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    pub fn set_rect(&mut self, rect: Rect) {
        self.position = Point::new(rect.x0, rect.y0);
        self.width = rect.width();
        self.height = rect.height();
    }
}

impl ElementTrait for StickyNote {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        self.as_rect()
    }

    fn transform(&mut self, affine: Affine) {
        let rect = affine.transform_rect_bbox(self.as_rect());
        self.set_rect(rect);
    }

    fn validate(&self) -> Result<(), String> {
        if !finite_point(self.position) {
            return Err("note position is not finite".into());
        }
        if !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0) {
            return Err(format!("note size {}x{} is not a positive finite size", self.width, self.height));
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(format!("font size {} is not positive", self.font_size));
        }
        Ok(())
    }
}
