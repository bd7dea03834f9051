//! Active tool and the style applied to new elements.

use crate::error::EngineError;
use crate::shapes::{BlendMode, ImageRef, ListFormat, SerializableColor, ShapeKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Available tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToolKind {
    #[default]
    Select,
    Pen,
    Eraser,
    Highlighter,
    Rectangle,
    Ellipse,
    Triangle,
    Line,
    Arrow,
    Text,
    Sticky,
    ImageInsert,
}

impl ToolKind {
    pub const ALL: [ToolKind; 12] = [
        ToolKind::Select,
        ToolKind::Pen,
        ToolKind::Eraser,
        ToolKind::Highlighter,
        ToolKind::Rectangle,
        ToolKind::Ellipse,
        ToolKind::Triangle,
        ToolKind::Line,
        ToolKind::Arrow,
        ToolKind::Text,
        ToolKind::Sticky,
        ToolKind::ImageInsert,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ToolKind::Select => "select",
            ToolKind::Pen => "pen",
            ToolKind::Eraser => "eraser",
            ToolKind::Highlighter => "highlighter",
            ToolKind::Rectangle => "rectangle",
            ToolKind::Ellipse => "ellipse",
            ToolKind::Triangle => "triangle",
            ToolKind::Line => "line",
            ToolKind::Arrow => "arrow",
            ToolKind::Text => "text",
            ToolKind::Sticky => "sticky",
            ToolKind::ImageInsert => "image-insert",
        }
    }

    /// Shape drawn by a drag with this tool.
    pub fn shape_kind(self) -> Option<ShapeKind> {
        match self {
            ToolKind::Rectangle => Some(ShapeKind::Rectangle),
            ToolKind::Ellipse => Some(ShapeKind::Ellipse),
            ToolKind::Triangle => Some(ShapeKind::Triangle),
            ToolKind::Line => Some(ShapeKind::Line),
            ToolKind::Arrow => Some(ShapeKind::Arrow),
            _ => None,
        }
    }

    /// Blend mode for tools that lay down freehand strokes.
    pub fn stroke_blend(self) -> Option<BlendMode> {
        match self {
            ToolKind::Pen => Some(BlendMode::Normal),
            ToolKind::Eraser => Some(BlendMode::Erase),
            ToolKind::Highlighter => Some(BlendMode::Highlight),
            _ => None,
        }
    }

    /// Tools that place a text-bearing element with a single click.
    pub fn places_text(self) -> bool {
        matches!(self, ToolKind::Text | ToolKind::Sticky)
    }
}

impl fmt::Display for ToolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ToolKind {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ToolKind::ALL
            .into_iter()
            .find(|tool| tool.as_str() == s)
            .ok_or_else(|| EngineError::UnknownTool(s.to_string()))
    }
}

/// Highlighter strokes are drawn at this alpha.
const HIGHLIGHTER_ALPHA: u8 = 96;

/// Style parameters for new elements. The engine only reads these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolStyle {
    pub stroke_color: SerializableColor,
    pub fill_color: Option<SerializableColor>,
    pub stroke_width: f64,
    pub eraser_width: f64,
    pub highlighter_width: f64,
    pub font_size: f64,
    pub list_format: ListFormat,
    pub note_color: SerializableColor,
    /// Image placed by the next image-insert click.
    pub pending_image: Option<ImageRef>,
}

impl Default for ToolStyle {
    fn default() -> Self {
        Self {
            stroke_color: SerializableColor::black(),
            fill_color: None,
            stroke_width: 2.0,
            eraser_width: 20.0,
            highlighter_width: 16.0,
            font_size: 20.0,
            list_format: ListFormat::None,
            note_color: SerializableColor::note_yellow(),
            pending_image: None,
        }
    }
}

impl ToolStyle {
    /// Width and color of a freehand stroke laid down with `blend`.
    pub fn stroke_params(&self, blend: BlendMode) -> (f64, SerializableColor) {
        match blend {
            BlendMode::Normal => (self.stroke_width, self.stroke_color),
            BlendMode::Erase => (self.eraser_width, SerializableColor::white()),
            BlendMode::Highlight => (self.highlighter_width, self.stroke_color.with_alpha(HIGHLIGHTER_ALPHA)),
        }
    }
}
