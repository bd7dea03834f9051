//! Hit testing and containment queries.
//!
//! Everything here is pure: functions take elements by reference and never
//! touch the store.

use crate::config::EngineConfig;
use crate::shapes::{Element, ElementId, Shape, ShapeKind};
use kurbo::{Affine, Point, Rect, Vec2};

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = b - a;
    let pv = point - a;
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    point.distance(a + seg * t)
}

/// Minimum distance from a point to a polyline.
///
/// A single point is treated as a degenerate segment.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => point.distance(*only),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}

/// Hit distance for a stroked path of the given width.
fn stroke_reach(width: f64, config: &EngineConfig) -> f64 {
    (width / 2.0 + config.hit_tolerance).max(config.min_hit_tolerance)
}

/// Map a world point into the unrotated frame of a box rotated about its center.
fn unrotate(point: Point, rect: Rect, degrees: f64) -> Point {
    if degrees == 0.0 {
        return point;
    }
    Affine::rotate_about(-degrees.to_radians(), rect.center()) * point
}

fn point_in_ellipse(point: Point, rect: Rect, grow: f64) -> bool {
    let rx = rect.width() / 2.0 + grow;
    let ry = rect.height() / 2.0 + grow;
    if rx < f64::EPSILON || ry < f64::EPSILON {
        return false;
    }
    let c = rect.center();
    let dx = (point.x - c.x) / rx;
    let dy = (point.y - c.y) / ry;
    dx * dx + dy * dy <= 1.0
}

fn point_in_triangle(point: Point, [a, b, c]: [Point; 3]) -> bool {
    let cross = |p: Point, q: Point, r: Point| (q - p).cross(r - p);
    let d1 = cross(a, b, point);
    let d2 = cross(b, c, point);
    let d3 = cross(c, a, point);
    let has_neg = d1 < 0.0 || d2 < 0.0 || d3 < 0.0;
    let has_pos = d1 > 0.0 || d2 > 0.0 || d3 > 0.0;
    !(has_neg && has_pos)
}

fn hit_shape(point: Point, shape: &Shape, config: &EngineConfig) -> bool {
    let half = shape.stroke_width / 2.0;
    match shape.kind {
        ShapeKind::Line | ShapeKind::Arrow => {
            point_to_segment_dist(point, shape.start(), shape.end()) <= stroke_reach(shape.stroke_width, config)
        }
        ShapeKind::Rectangle => {
            let rect = shape.box_rect();
            let local = unrotate(point, rect, shape.rotation);
            rect.inflate(half, half).contains(local)
        }
        ShapeKind::Ellipse => {
            let rect = shape.box_rect();
            point_in_ellipse(unrotate(point, rect, shape.rotation), rect, half)
        }
        ShapeKind::Triangle => {
            let rect = shape.box_rect();
            let local = unrotate(point, rect, shape.rotation);
            let vertices = shape.triangle_vertices();
            point_in_triangle(local, vertices)
                || [(0, 1), (1, 2), (2, 0)]
                    .iter()
                    .any(|&(i, j)| point_to_segment_dist(local, vertices[i], vertices[j]) <= half)
        }
    }
}

/// Check whether `point` hits `element`.
///
/// Filled kinds use containment; strokes, lines and arrows use distance to
/// the path; text uses its measured box.
pub fn hit_test(point: Point, element: &Element, config: &EngineConfig) -> bool {
    match element {
        Element::Stroke(stroke) => {
            point_to_polyline_dist(point, &stroke.points) <= stroke_reach(stroke.width, config)
        }
        Element::Shape(shape) => hit_shape(point, shape, config),
        Element::StickyNote(note) => note.as_rect().contains(point),
        Element::Text(_) => element.bounds().contains(point),
        Element::Image(image) => {
            let rect = image.as_rect();
            rect.contains(unrotate(point, rect, image.rotation))
        }
    }
}

/// First element hit when scanning from the top of the z-order down.
pub fn topmost_hit<'a, I>(elements: I, point: Point, config: &EngineConfig) -> Option<&'a Element>
where
    I: IntoIterator<Item = &'a Element>,
    I::IntoIter: DoubleEndedIterator,
{
    elements.into_iter().rev().find(|e| hit_test(point, e, config))
}

/// Check that `inner` lies entirely inside `outer` (edges inclusive).
pub fn rect_contains_rect(outer: Rect, inner: Rect) -> bool {
    inner.x0 >= outer.x0 && inner.y0 >= outer.y0 && inner.x1 <= outer.x1 && inner.y1 <= outer.y1
}

/// Ids of elements whose whole bounding box lies inside `rect`, in z-order.
///
/// Partially overlapping elements are excluded.
pub fn elements_within<'a, I>(elements: I, rect: Rect) -> Vec<ElementId>
where
    I: IntoIterator<Item = &'a Element>,
{
    let rect = rect.abs();
    elements
        .into_iter()
        .filter(|e| rect_contains_rect(rect, e.bounds()))
        .map(Element::id)
        .collect()
}

/// Signed angle of `point` around `center`, in degrees.
pub fn angle_around(center: Point, point: Point) -> f64 {
    let v: Vec2 = point - center;
    v.y.atan2(v.x).to_degrees()
}

/// Normalize an angle in degrees into [0, 360).
pub fn normalize_degrees(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped >= 360.0 { 0.0 } else { wrapped }
}
