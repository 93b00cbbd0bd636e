//! Active tool configuration.

use crate::stroke::ToolKind;
use serde::{Deserialize, Serialize};

pub const DEFAULT_COLOR: &str = "#000000";
pub const DEFAULT_STROKE_WIDTH: f64 = 3.0;

/// Tool, color and stroke width applied to new strokes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolSettings {
    pub tool: ToolKind,
    pub color: String,
    pub stroke_width: f64,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            tool: ToolKind::default(),
            color: DEFAULT_COLOR.to_string(),
            stroke_width: DEFAULT_STROKE_WIDTH,
        }
    }
}

impl ToolSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_tool(&mut self, tool: ToolKind) {
        self.tool = tool;
    }

    pub fn set_color(&mut self, color: impl Into<String>) {
        self.color = color.into();
    }

    /// Set the stroke width. Non-positive or non-finite widths are ignored.
    pub fn set_stroke_width(&mut self, width: f64) {
        if width.is_finite() && width > 0.0 {
            self.stroke_width = width;
        } else {
            log::warn!("Ignoring invalid stroke width {width}");
        }
    }
}
