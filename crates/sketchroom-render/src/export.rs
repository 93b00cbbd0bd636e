//! Stroke log export.

use crate::error::RenderResult;
use crate::raster::RasterSurface;
use sketchroom_core::error::SessionError;
use sketchroom_core::protocol::AuthorityEvent;
use sketchroom_core::stroke::{StrokeEvent, ToolKind};
use sketchroom_core::surface::replay;

/// Canvas size used when a log has no strokes.
pub const DEFAULT_SIZE: (u32, u32) = (800, 600);

/// Largest dimension [`fit_size`] will produce.
pub const MAX_DIMENSION: u32 = 8192;

/// Read a stroke log.
///
/// Accepts a bare JSON array of stroke events, or a `canonical-history-replace`
/// / `join-backlog` message. Malformed entries are skipped.
pub fn load_history(text: &str) -> RenderResult<Vec<StrokeEvent>> {
    let value: serde_json::Value = serde_json::from_str(text).map_err(SessionError::from)?;
    let value = match value {
        serde_json::Value::Array(entries) => serde_json::json!({
            "type": "canonical-history-replace",
            "history": entries,
        }),
        other => other,
    };
    match serde_json::from_value::<AuthorityEvent>(value).map_err(SessionError::from)? {
        AuthorityEvent::CanonicalHistoryReplace { history } | AuthorityEvent::JoinBacklog { history } => {
            Ok(history)
        }
        other => Err(SessionError::MalformedEvent(format!("not a stroke log: {:?}", other)).into()),
    }
}

/// Smallest canvas that holds every stroke, anchored at the origin.
pub fn fit_size(strokes: &[StrokeEvent]) -> (u32, u32) {
    if strokes.is_empty() {
        return DEFAULT_SIZE;
    }
    let (mut max_x, mut max_y) = (1.0_f64, 1.0_f64);
    for stroke in strokes {
        let (from, to) = (stroke.from_point(), stroke.to_point());
        let (x, y) = if stroke.tool == ToolKind::Circle {
            let r = from.distance(to);
            (from.x + r, from.y + r)
        } else {
            (from.x.max(to.x), from.y.max(to.y))
        };
        max_x = max_x.max(x + stroke.width);
        max_y = max_y.max(y + stroke.width);
    }
    let clamp = |v: f64| (v.ceil() as u32).clamp(1, MAX_DIMENSION);
    (clamp(max_x), clamp(max_y))
}

/// Replay `strokes` onto a fresh surface.
pub fn render_history(strokes: &[StrokeEvent], width: u32, height: u32) -> RenderResult<RasterSurface> {
    let mut surface = RasterSurface::new(width, height)?;
    let drawn = replay(&mut surface, strokes);
    log::info!("Rendered {} of {} strokes at {}x{}", drawn, strokes.len(), width, height);
    Ok(surface)
}
