//! Drawing surface abstraction and the shared stroke dispatch.
//!
//! Local immediate rendering, remote replica rendering and full-history replay
//! all go through [`render_stroke`], so the three paths cannot drift apart.

use crate::stroke::{StrokeEvent, ToolKind};
use kurbo::{Circle, Point, Rect};

/// Paint parameters for stroked primitives.
#[derive(Debug, Clone, PartialEq)]
pub struct StrokeStyle {
    /// Color token (`#rrggbb`, CSS name, ...); interpretation is up to the surface.
    pub color: String,
    pub width: f64,
}

impl StrokeStyle {
    pub fn new(color: impl Into<String>, width: f64) -> Self {
        Self {
            color: color.into(),
            width,
        }
    }
}

/// Raster drawing capability.
///
/// Implementations draw with round caps and joins. Snapshots capture the whole
/// raster and restoring one replaces every pixel.
pub trait Surface {
    /// Full-raster capture type.
    type Snapshot: Clone;

    /// Surface size in pixels.
    fn size(&self) -> (u32, u32);

    /// Change the surface size, keeping the overlapping content.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear every pixel to transparent.
    fn clear(&mut self);

    /// Clear an axis-aligned box to transparent.
    fn clear_rect(&mut self, rect: Rect);

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle);

    fn stroke_rect(&mut self, rect: Rect, style: &StrokeStyle);

    fn stroke_circle(&mut self, circle: Circle, style: &StrokeStyle);

    fn snapshot(&self) -> Self::Snapshot;

    fn restore(&mut self, snapshot: &Self::Snapshot);
}

/// Box of `size × size` centred on `center`.
fn eraser_box(center: Point, size: f64) -> Rect {
    let half = size / 2.0;
    Rect::new(center.x - half, center.y - half, center.x + half, center.y + half)
}

/// Render one stroke event with its tool's semantics.
///
/// Returns `false` (and draws nothing) when the event is not drawable.
pub fn render_stroke<S: Surface + ?Sized>(surface: &mut S, event: &StrokeEvent) -> bool {
    if !event.is_drawable() {
        log::warn!("Skipping undrawable stroke {}", event.stroke_id);
        return false;
    }

    let from = event.from_point();
    let to = event.to_point();
    let style = StrokeStyle::new(event.color.clone(), event.width);

    match event.tool {
        ToolKind::Brush | ToolKind::Line => surface.stroke_line(from, to, &style),
        // Only the endpoints are erased, not the path between them.
        ToolKind::Eraser => {
            surface.clear_rect(eraser_box(from, event.width));
            surface.clear_rect(eraser_box(to, event.width));
        }
        ToolKind::Rectangle => surface.stroke_rect(Rect::from_points(from, to), &style),
        ToolKind::Circle => surface.stroke_circle(Circle::new(from, from.distance(to)), &style),
    }
    true
}

/// Replay a stroke log in order. Returns the number of strokes drawn.
pub fn replay<'a, S, I>(surface: &mut S, strokes: I) -> usize
where
    S: Surface + ?Sized,
    I: IntoIterator<Item = &'a StrokeEvent>,
{
    strokes
        .into_iter()
        .filter(|stroke| render_stroke(surface, stroke))
        .count()
}

/// A recorded drawing command.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOp {
    Line {
        from: Point,
        to: Point,
        style: StrokeStyle,
    },
    Rect {
        rect: Rect,
        style: StrokeStyle,
    },
    Circle {
        circle: Circle,
        style: StrokeStyle,
    },
    ClearRect(Rect),
}

/// Display-list surface for testing and headless use.
///
/// Records drawing commands instead of rasterizing them. A full clear empties
/// the list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    /// Commands drawn since the last clear.
    pub fn ops(&self) -> &[DrawOp] {
        &self.ops
    }

    pub fn is_blank(&self) -> bool {
        self.ops.is_empty()
    }
}

impl Surface for RecordingSurface {
    type Snapshot = Vec<DrawOp>;

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
    }

    fn clear(&mut self) {
        self.ops.clear();
    }

    fn clear_rect(&mut self, rect: Rect) {
        self.ops.push(DrawOp::ClearRect(rect));
    }

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle) {
        self.ops.push(DrawOp::Line {
            from,
            to,
            style: style.clone(),
        });
    }

    fn stroke_rect(&mut self, rect: Rect, style: &StrokeStyle) {
        self.ops.push(DrawOp::Rect {
            rect,
            style: style.clone(),
        });
    }

    fn stroke_circle(&mut self, circle: Circle, style: &StrokeStyle) {
        self.ops.push(DrawOp::Circle {
            circle,
            style: style.clone(),
        });
    }

    fn snapshot(&self) -> Self::Snapshot {
        self.ops.clone()
    }

    fn restore(&mut self, snapshot: &Self::Snapshot) {
        self.ops = snapshot.clone();
    }
}
