//! Engine tuning parameters.

use crate::error::{EngineError, EngineResult};
use serde::{Deserialize, Serialize};

/// Tolerances and thresholds used by hit testing and the interaction state machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra distance added to half the stroke width when hitting strokes and lines.
    pub hit_tolerance: f64,
    /// Lower bound on the stroke hit distance, so thin strokes stay clickable.
    pub min_hit_tolerance: f64,
    /// Radius around a selection handle that grabs it.
    pub handle_tolerance: f64,
    /// Distance of the rotate handle above the top edge.
    pub rotate_handle_offset: f64,
    /// Pointer travel below which a shape gesture is treated as a click.
    pub min_gesture_distance: f64,
    /// Window for two pointer-downs to count as a double click.
    pub double_click_ms: u64,
    /// Minimum interval between outgoing cursor broadcasts.
    pub cursor_throttle_ms: u64,
    /// Snapshots kept when exporting history for persistence.
    pub persisted_history_window: usize,
    /// Edge length of a newly placed sticky note.
    pub sticky_note_size: f64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            hit_tolerance: 3.0,
            min_hit_tolerance: 6.0,
            handle_tolerance: 10.0,
            rotate_handle_offset: 25.0,
            min_gesture_distance: 4.0,
            double_click_ms: 400,
            cursor_throttle_ms: 50,
            persisted_history_window: 50,
            sticky_note_size: 200.0,
        }
    }
}

impl EngineConfig {
    /// Parse from JSON; missing fields take their defaults.
    pub fn from_json(json: &str) -> EngineResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> EngineResult<()> {
        let lengths = [
            ("hit_tolerance", self.hit_tolerance),
            ("min_hit_tolerance", self.min_hit_tolerance),
            ("handle_tolerance", self.handle_tolerance),
            ("rotate_handle_offset", self.rotate_handle_offset),
            ("min_gesture_distance", self.min_gesture_distance),
        ];
        for (name, value) in lengths {
            if !(value.is_finite() && value >= 0.0) {
                return Err(EngineError::InvalidConfig(format!("{name} must be non-negative, got {value}")));
            }
        }
        if !(self.sticky_note_size.is_finite() && self.sticky_note_size > 0.0) {
            return Err(EngineError::InvalidConfig(format!(
                "sticky_note_size must be positive, got {}",
                self.sticky_note_size
            )));
        }
        if self.persisted_history_window == 0 {
            return Err(EngineError::InvalidConfig("persisted_history_window must be at least 1".into()));
        }
        Ok(())
    }
}
