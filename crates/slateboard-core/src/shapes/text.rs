//! Text block element and shared text helpers.

use super::{ElementId, ElementTrait, SerializableColor, finite_point, new_element_id};
use kurbo::{Affine, Point, Rect, Size};
use serde::{Deserialize, Serialize};

/// Average glyph advance as a fraction of the font size.
pub(crate) const CHAR_WIDTH_FACTOR: f64 = 0.55;
/// Line box height as a fraction of the font size.
pub(crate) const LINE_HEIGHT_FACTOR: f64 = 1.25;

/// List formatting applied to each line of a text-bearing element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ListFormat {
    #[default]
    None,
    Bullet,
    Numbered,
}

impl ListFormat {
    /// Marker prefixed to line `index` (0-based).
    pub fn marker(self, index: usize) -> String {
        match self {
            ListFormat::None => String::new(),
            ListFormat::Bullet => "• ".to_string(),
            ListFormat::Numbered => format!("{}. ", index + 1),
        }
    }
}

/// Remove a leading bullet (`•`, `-`, `*`) or number (`12.`) marker from one line.
fn strip_line_marker(line: &str) -> &str {
    let trimmed = line.trim_start();
    for bullet in ['•', '-', '*'] {
        if let Some(rest) = trimmed.strip_prefix(bullet) {
            return rest;
        }
    }
    let digits = trimmed.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        if let Some(rest) = trimmed[digits..].strip_prefix('.') {
            return rest;
        }
    }
    trimmed
}

/// Content with list markers removed from every line.
pub fn strip_list_markers(content: &str) -> String {
    content
        .lines()
        .map(|line| strip_line_marker(line).trim())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Approximate layout size of `content` at `font_size`.
pub(crate) fn measure(content: &str, font_size: f64) -> Size {
    let lines = content.split('\n').count().max(1);
    let widest = content
        .split('\n')
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0)
        .max(1);
    Size::new(
        widest as f64 * font_size * CHAR_WIDTH_FACTOR,
        lines as f64 * font_size * LINE_HEIGHT_FACTOR,
    )
}

/// A free-standing block of text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub(crate) id: ElementId,
    /// Top-left corner of the text box.
    pub position: Point,
    pub content: String,
    /// Font size in pixels.
    pub font_size: f64,
    pub color: SerializableColor,
    #[serde(default)]
    pub list_format: ListFormat,
}

impl TextBlock {
    /// Default font size.
    pub const DEFAULT_FONT_SIZE: f64 = 20.0;

    pub fn new(position: Point, content: String) -> Self {
        Self {
            id: new_element_id(),
            position,
            content,
            font_size: Self::DEFAULT_FONT_SIZE,
            color: SerializableColor::black(),
            list_format: ListFormat::None,
        }
    }

    /// Measured size of the current content.
    pub fn size(&self) -> Size {
        measure(&self.content, self.font_size)
    }
}

impl ElementTrait for TextBlock {
    fn id(&self) -> ElementId {
        self.id
    }

    fn bounds(&self) -> Rect {
        Rect::from_origin_size(self.position, self.size())
    }

    fn transform(&mut self, affine: Affine) {
        self.position = affine * self.position;
    }

    fn validate(&self) -> Result<(), String> {
        if !finite_point(self.position) {
            return Err("text position is not finite".into());
        }
        if !(self.font_size.is_finite() && self.font_size > 0.0) {
            return Err(format!("font size {} is not positive", self.font_size));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_list_markers() {
        assert_eq!(strip_list_markers("• \n• "), "\n");
        assert!(strip_list_markers("1. \n2.  ").trim().is_empty());
        assert_eq!(strip_list_markers("- milk\n- eggs"), "milk\neggs");
        assert_eq!(strip_list_markers("plain"), "plain");
    }

    #[test]
    fn test_numbers_without_dot_are_content() {
        assert_eq!(strip_list_markers("2024 plans"), "2024 plans");
    }

    #[test]
    fn test_markers() {
        assert_eq!(ListFormat::Bullet.marker(3), "• ");
        assert_eq!(ListFormat::Numbered.marker(1), "2. ");
        assert_eq!(ListFormat::None.marker(0), "");
    }

    #[test]
    fn test_bounds_grow_with_lines() {
        let one = TextBlock::new(Point::ZERO, "hello".into());
        let two = TextBlock::new(Point::ZERO, "hello\nworld".into());
        assert!((one.bounds().width() - two.bounds().width()).abs() < f64::EPSILON);
        assert!(two.bounds().height() > one.bounds().height());
    }

    #[test]
    fn test_empty_text_still_has_area() {
        let t = TextBlock::new(Point::new(5.0, 5.0), String::new());
        assert!(t.bounds().area() > 0.0);
    }
}
