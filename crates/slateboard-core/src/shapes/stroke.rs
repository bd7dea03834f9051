//! Freehand stroke element.

use super::{ElementId, ElementTrait, SerializableColor, finite_point, new_element_id};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// How a stroke composites over what is beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlendMode {
    #[default]
    Normal,
    /// Clears pixels beneath the stroke (eraser).
    Erase,
    /// Translucent marker (highlighter).
    Highlight,
}

/// A freehand drawing (ordered series of points).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stroke {
    pub(crate) id: ElementId,
    /// Points in the stroke path.
    pub points: Vec<Point>,
    /// Stroke width.
    pub width: f64,
    /// Stroke color.
    pub color: SerializableColor,
    /// Compositing mode.
    #[serde(default)]
    pub blend: BlendMode,
}

impl Stroke {
    /// A stroke over already-sampled points.
    pub fn from_points(points: Vec<Point>, width: f64, color: SerializableColor, blend: BlendMode) -> Self {
        Self {
            id: new_element_id(),
            points,
            width,
            color,
            blend,
        }
    }

    /// Number of sampled points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

impl ElementTrait for Stroke {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        let Some(&first) = self.points.first() else {
            return Rect::ZERO;
        };
        self.points
            .iter()
            .fold(Rect::from_points(first, first), |acc, &p| acc.union_pt(p))
    }

    fn transform(&mut self, affine: Affine) {
        for point in &mut self.points {
            *point = affine * *point;
        }
    }

    fn validate(&self) -> Result<(), String> {
        if self.points.is_empty() {
            return Err("stroke has no points".into());
        }
        if !self.points.iter().all(|&p| finite_point(p)) {
            return Err("stroke has a non-finite point".into());
        }
        if !(self.width.is_finite() && self.width > 0.0) {
            return Err(format!("stroke width {} is not positive", self.width));
        }
        Ok(())
    }
}
