//! Image element referencing an external raster payload.

use super::{ElementId, ElementTrait, finite_point, new_element_id, rotated_bounds};
use kurbo::{Affine, Point, Rect};
use serde::{Deserialize, Serialize};

/// Reference to pixel data plus its intrinsic size.
///
/// The engine never decodes pixels; `source` is a URL or a `data:` URI
/// handed through to the rendering sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub source: String,
    pub pixel_width: u32,
    pub pixel_height: u32,
}

impl ImageRef {
    pub fn new(source: impl Into<String>, pixel_width: u32, pixel_height: u32) -> Self {
        Self {
            source: source.into(),
            pixel_width,
            pixel_height,
        }
    }
}

/// A placed image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub(crate) id: ElementId,
    /// Top-left corner position (before rotation).
    pub position: Point,
    /// Display width.
    pub width: f64,
    /// Display height.
    pub height: f64,
    /// Rotation in degrees about the center, in [0, 360).
    #[serde(default)]
    pub rotation: f64,
    pub source: ImageRef,
}

impl Image {
    /// Place an image at its intrinsic size.
    pub fn new(position: Point, source: ImageRef) -> Self {
        Self {
            id: new_element_id(),
            position,
            width: source.pixel_width.max(1) as f64,
            height: source.pixel_height.max(1) as f64,
            rotation: 0.0,
            source,
        }
    }

    /// Place an image at its intrinsic size centered on `center`.
    pub fn centered(center: Point, source: ImageRef) -> Self {
        let mut image = Self::new(center, source);
        image.position = Point::new(center.x - image.width / 2.0, center.y - image.height / 2.0);
        image
    }

    /// Unrotated display rectangle.
    pub fn as_rect(&self) -> Rect {
        Rect::from_origin_size(self.position, (self.width, self.height))
    }

    /// Replace the unrotated display rectangle.
    pub fn set_rect(&mut self, rect: Rect) {
        self.position = Point::new(rect.x0, rect.y0);
        self.width = rect.width();
        self.height = rect.height();
    }
}

impl ElementTrait for Image {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        rotated_bounds(self.as_rect(), self.rotation)
    }

    fn transform(&mut self, affine: Affine) {
        let rect = affine.transform_rect_bbox(self.as_rect());
        self.set_rect(rect);
    }

    fn validate(&self) -> Result<(), String> {
        if !finite_point(self.position) || !self.rotation.is_finite() {
            return Err("image geometry is not finite".into());
        }
        if !(self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0) {
            return Err(format!("image size {}x{} is not a positive finite size", self.width, self.height));
        }
        if self.source.source.is_empty() {
            return Err("image has no source".into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intrinsic_size_and_centering() {
        let img = Image::centered(Point::new(100.0, 100.0), ImageRef::new("cat.png", 100, 50));
        assert_eq!(img.as_rect(), Rect::new(50.0, 75.0, 150.0, 125.0));
        assert_eq!(img.bounds(), img.as_rect());
    }

    #[test]
    fn test_zero_pixel_size_still_placeable() {
        let img = Image::new(Point::ZERO, ImageRef::new("blank.png", 0, 0));
        assert!(img.validate().is_ok());
        assert_eq!(img.as_rect().size(), kurbo::Size::new(1.0, 1.0));
    }

    #[test]
    fn test_rotated_bounds_grow() {
        let mut img = Image::new(Point::ZERO, ImageRef::new("cat.png", 100, 50));
        img.rotation = 90.0;
        let bounds = img.bounds();
        assert!((bounds.width() - 50.0).abs() < 1e-9);
        assert!((bounds.height() - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_scale_transform() {
        let mut img = Image::new(Point::new(10.0, 10.0), ImageRef::new("cat.png", 100, 50));
        img.transform(Affine::scale(2.0));
        assert_eq!(img.as_rect(), Rect::new(20.0, 20.0, 220.0, 120.0));
    }

    #[test]
    fn test_infinite_size_is_invalid() {
        let mut img = Image::new(Point::ZERO, ImageRef::new("cat.png", 10, 10));
        img.width = f64::INFINITY;
        assert!(img.validate().is_err());
        img.width = 10.0;
        img.height = f64::NAN;
        assert!(img.validate().is_err());
    }

    #[test]
    fn test_missing_source_is_invalid() {
        let img = Image::new(Point::ZERO, ImageRef::new("", 10, 10));
        assert!(img.validate().is_err());
    }
}
