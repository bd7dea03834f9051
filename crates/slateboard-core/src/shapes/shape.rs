//! Geometric shape element: rectangle, ellipse, triangle, line and arrow.

use super::{ElementId, ElementTrait, SerializableColor, finite_point, new_element_id, rotated_bounds};
use kurbo::{Affine, Point, Rect, Vec2};
use serde::{Deserialize, Serialize};

/// Kind of geometric shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeKind {
    Rectangle,
    Ellipse,
    Triangle,
    Line,
    Arrow,
}

impl ShapeKind {
    /// Lines and arrows are segments; the others fill a box.
    pub fn is_linear(self) -> bool {
        matches!(self, ShapeKind::Line | ShapeKind::Arrow)
    }
}

/// A shape defined by an anchor point and an extent vector.
///
/// Boxed kinds occupy the rectangle spanned by `anchor` and `anchor + extent`.
/// Linear kinds run from `anchor` to `anchor + extent`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Shape {
    pub(crate) id: ElementId,
    pub kind: ShapeKind,
    /// Gesture start point.
    pub anchor: Point,
    /// Offset from the anchor to the opposite corner or endpoint.
    pub extent: Vec2,
    /// Rotation in degrees about the box center, in [0, 360). Boxed kinds only.
    #[serde(default)]
    pub rotation: f64,
    pub stroke_color: SerializableColor,
    /// Fill color (None = outline only).
    pub fill_color: Option<SerializableColor>,
    pub stroke_width: f64,
}

impl Shape {
    /// Create a shape from its two gesture points.
    pub fn new(kind: ShapeKind, start: Point, end: Point) -> Self {
        Self {
            id: new_element_id(),
            kind,
            anchor: start,
            extent: end - start,
            rotation: 0.0,
            stroke_color: SerializableColor::black(),
            fill_color: None,
            stroke_width: 2.0,
        }
    }

    /// Start point (the anchor).
    pub fn start(&self) -> Point {
        self.anchor
    }

    /// End point (anchor + extent).
    pub fn end(&self) -> Point {
        self.anchor + self.extent
    }

    /// Normalized, unrotated box spanned by the two gesture points.
    pub fn box_rect(&self) -> Rect {
        Rect::from_points(self.start(), self.end())
    }

    /// Replace the gesture points with the corners of `rect`.
    pub fn set_box(&mut self, rect: Rect) {
        self.anchor = Point::new(rect.x0, rect.y0);
        self.extent = Vec2::new(rect.width(), rect.height());
    }

    /// Move one endpoint of a linear shape (0 = start, 1 = end).
    pub fn set_endpoint(&mut self, index: usize, point: Point) {
        let end = self.end();
        if index == 0 {
            self.anchor = point;
            self.extent = end - point;
        } else {
            self.extent = point - self.anchor;
        }
    }

    /// Vertices of the triangle (apex top-center, base along the bottom edge).
    pub fn triangle_vertices(&self) -> [Point; 3] {
        let r = self.box_rect();
        [
            Point::new(r.center().x, r.y0),
            Point::new(r.x1, r.y1),
            Point::new(r.x0, r.y1),
        ]
    }

    pub fn supports_rotation(&self) -> bool {
        !self.kind.is_linear()
    }
}

impl ElementTrait for Shape {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let rect = self.box_rect();
        if self.supports_rotation() {
            rotated_bounds(rect, self.rotation)
        } else {
            rect
        }
    }

    fn transform(&mut self, affine: Affine) {
        let start = affine * self.start();
        let end = affine * self.end();
        self.anchor = start;
        self.extent = end - start;
    }

    fn validate(&self) -> Result<(), String> {
        if !finite_point(self.anchor) || !self.extent.is_finite() {
            return Err("shape geometry is not finite".into());
        }
        if !(self.stroke_width.is_finite() && self.stroke_width >= 0.0) {
            return Err(format!("shape stroke width {} is negative", self.stroke_width));
        }
        if !self.rotation.is_finite() {
            return Err("shape rotation is not finite".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_box_is_normalized() {
        let shape = Shape::new(ShapeKind::Rectangle, Point::new(60.0, 40.0), Point::new(10.0, 10.0));
        let r = shape.box_rect();
        assert_eq!(r, Rect::new(10.0, 10.0, 60.0, 40.0));
    }

    #[test]
    fn test_line_keeps_direction() {
        let line = Shape::new(ShapeKind::Line, Point::new(100.0, 0.0), Point::new(0.0, 50.0));
        assert_eq!(line.start(), Point::new(100.0, 0.0));
        assert_eq!(line.end(), Point::new(0.0, 50.0));
    }

    #[test]
    fn test_set_endpoint() {
        let mut line = Shape::new(ShapeKind::Arrow, Point::new(0.0, 0.0), Point::new(10.0, 10.0));
        line.set_endpoint(0, Point::new(-5.0, 0.0));
        assert_eq!(line.start(), Point::new(-5.0, 0.0));
        assert_eq!(line.end(), Point::new(10.0, 10.0));
        line.set_endpoint(1, Point::new(20.0, 0.0));
        assert_eq!(line.end(), Point::new(20.0, 0.0));
    }

    #[test]
    fn test_rotation_only_affects_boxed_bounds() {
        let mut rect = Shape::new(ShapeKind::Rectangle, Point::new(0.0, 0.0), Point::new(100.0, 20.0));
        rect.rotation = 90.0;
        assert!((rect.bounds().height() - 100.0).abs() < 1e-9);

        let mut line = Shape::new(ShapeKind::Line, Point::new(0.0, 0.0), Point::new(100.0, 0.0));
        line.rotation = 90.0;
        assert!((line.bounds().width() - 100.0).abs() < 1e-9);
    }
}
