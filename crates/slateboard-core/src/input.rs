//! Input events consumed by the engine.

use crate::shapes::ElementId;
use kurbo::Point;
use serde::{Deserialize, Serialize};

/// Modifier keys state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    /// Ctrl on most platforms, Cmd on macOS.
    pub fn command(&self) -> bool {
        self.ctrl || self.meta
    }
}

/// Keys the engine reacts to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Enter,
    Char(char),
    Other(String),
}

/// What happened.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputKind {
    Down,
    Move,
    Up,
    KeyDown(Key),
    /// Pointer left the canvas; abandons any gesture.
    Leave,
}

/// One input event, in world coordinates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputEvent {
    pub kind: InputKind,
    pub position: Point,
    #[serde(default)]
    pub modifiers: Modifiers,
    /// Element the host already found under the pointer, if it did its own hit test.
    #[serde(default)]
    pub target_hit: Option<ElementId>,
    /// Monotonic milliseconds, used for double-click detection and cursor throttling.
    #[serde(default)]
    pub timestamp_ms: u64,
}

impl InputEvent {
    pub fn new(kind: InputKind, position: Point) -> Self {
        Self {
            kind,
            position,
            modifiers: Modifiers::NONE,
            target_hit: None,
            timestamp_ms: 0,
        }
    }

    pub fn down(position: Point) -> Self {
        Self::new(InputKind::Down, position)
    }

    pub fn moved(position: Point) -> Self {
        Self::new(InputKind::Move, position)
    }

    pub fn up(position: Point) -> Self {
        Self::new(InputKind::Up, position)
    }

    pub fn key(key: Key) -> Self {
        Self::new(InputKind::KeyDown(key), Point::ZERO)
    }

    pub fn leave() -> Self {
        Self::new(InputKind::Leave, Point::ZERO)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_target(mut self, target: ElementId) -> Self {
        self.target_hit = Some(target);
        self
    }

    pub fn at_time(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }
}

/// Last pointer-down, for double-click detection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickRecord {
    pub target: Option<ElementId>,
    pub timestamp_ms: u64,
}

/// Double-click tracker.
#[derive(Debug, Clone, Default)]
pub struct ClickTracker {
    last: Option<ClickRecord>,
}

impl ClickTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a pointer-down on `target`. Returns true if it completes a
    /// double click on the same element within `window_ms`.
    pub fn register(&mut self, target: Option<ElementId>, timestamp_ms: u64, window_ms: u64) -> bool {
        let double = match (self.last, target) {
            (Some(last), Some(id)) => {
                last.target == Some(id) && timestamp_ms.saturating_sub(last.timestamp_ms) <= window_ms
            }
            _ => false,
        };
        // A completed double click does not start another one.
        self.last = if double {
            None
        } else {
            Some(ClickRecord { target, timestamp_ms })
        };
        double
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}
