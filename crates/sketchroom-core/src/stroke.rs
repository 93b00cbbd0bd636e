//! Stroke events: the atomic drawable unit exchanged between clients.

use kurbo::Point;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Color token carried by eraser strokes.
pub const TRANSPARENT: &str = "transparent";

/// Drawing tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ToolKind {
    /// Freehand brush.
    #[default]
    #[serde(alias = "freehand")]
    Brush,
    Eraser,
    Line,
    Rectangle,
    Circle,
}

impl ToolKind {
    /// All tools in toolbar order.
    pub const ALL: [ToolKind; 5] = [
        ToolKind::Brush,
        ToolKind::Eraser,
        ToolKind::Line,
        ToolKind::Rectangle,
        ToolKind::Circle,
    ];

    /// Freehand tools emit a segment per pointer sample.
    pub fn is_freehand(self) -> bool {
        matches!(self, ToolKind::Brush | ToolKind::Eraser)
    }

    /// Shape tools preview locally and commit once on release.
    pub fn is_shape(self) -> bool {
        !self.is_freehand()
    }

    /// Display name for status readouts.
    pub fn name(self) -> &'static str {
        match self {
            ToolKind::Brush => "Brush",
            ToolKind::Eraser => "Eraser",
            ToolKind::Line => "Line",
            ToolKind::Rectangle => "Rectangle",
            ToolKind::Circle => "Circle",
        }
    }
}

/// Opaque token grouping all segments of one gesture.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StrokeId(String);

impl StrokeId {
    /// Generate a time-based id with a random suffix.
    ///
    /// Collisions are unlikely but not impossible; ids only scope undo grouping.
    pub fn generate() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let suffix: u32 = rand::rng().random_range(0..100_000);
        Self(format!("s-{millis}-{suffix}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for StrokeId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for StrokeId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for StrokeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One drawable instruction: a freehand segment or a committed shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeEvent {
    pub from_x: f64,
    pub from_y: f64,
    pub to_x: f64,
    pub to_y: f64,
    pub color: String,
    pub width: f64,
    pub tool: ToolKind,
    pub stroke_id: StrokeId,
}

impl StrokeEvent {
    /// Build an event between two points.
    ///
    /// Eraser events always carry the transparent color token.
    pub fn new(
        tool: ToolKind,
        from: Point,
        to: Point,
        color: impl Into<String>,
        width: f64,
        stroke_id: StrokeId,
    ) -> Self {
        let color = if tool == ToolKind::Eraser {
            TRANSPARENT.to_string()
        } else {
            color.into()
        };
        Self {
            from_x: from.x,
            from_y: from.y,
            to_x: to.x,
            to_y: to.y,
            color,
            width,
            tool,
            stroke_id,
        }
    }

    pub fn from_point(&self) -> Point {
        Point::new(self.from_x, self.from_y)
    }

    pub fn to_point(&self) -> Point {
        Point::new(self.to_x, self.to_y)
    }

    /// Whether the renderer can draw this event.
    pub fn is_drawable(&self) -> bool {
        [self.from_x, self.from_y, self.to_x, self.to_y, self.width]
            .iter()
            .all(|v| v.is_finite())
            && self.width > 0.0
    }
}
