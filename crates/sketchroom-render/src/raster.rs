//! tiny-skia backed [`Surface`].

use crate::error::{RenderError, RenderResult};
use kurbo::{BezPath, Circle, PathEl, Point, Rect, Shape};
use sketchroom_core::surface::{StrokeStyle, Surface};
use std::path::Path;
use tiny_skia::{
    BlendMode, Color, LineCap, LineJoin, Paint, PathBuilder, Pixmap, PixmapPaint, Stroke, Transform,
};

/// Curve flattening tolerance for kurbo shapes.
const PATH_TOLERANCE: f64 = 0.1;

/// A pixel raster implementing [`Surface`].
#[derive(Clone)]
pub struct RasterSurface {
    pixmap: Pixmap,
}

impl RasterSurface {
    /// Create a transparent surface. Both dimensions must be non-zero.
    pub fn new(width: u32, height: u32) -> RenderResult<Self> {
        let pixmap = Pixmap::new(width, height).ok_or(RenderError::InvalidSize { width, height })?;
        Ok(Self { pixmap })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn into_pixmap(self) -> Pixmap {
        self.pixmap
    }

    /// Alpha of the pixel at (`x`, `y`); zero outside the surface.
    pub fn alpha_at(&self, x: u32, y: u32) -> u8 {
        self.pixmap.pixel(x, y).map(|p| p.alpha()).unwrap_or(0)
    }

    /// True if every pixel is fully transparent.
    pub fn is_blank(&self) -> bool {
        self.pixmap.data().chunks_exact(4).all(|px| px[3] == 0)
    }

    pub fn encode_png(&self) -> RenderResult<Vec<u8>> {
        self.pixmap
            .encode_png()
            .map_err(|e| RenderError::Encode(e.to_string()))
    }

    pub fn save_png(&self, path: &Path) -> RenderResult<()> {
        let bytes = self.encode_png()?;
        std::fs::write(path, bytes).map_err(|e| RenderError::Io(e.to_string()))
    }

    fn stroke_shape(&mut self, path: Option<tiny_skia::Path>, style: &StrokeStyle) {
        let Some(path) = path else {
            log::debug!("Skipping degenerate path");
            return;
        };
        let mut paint = Paint::default();
        paint.set_color(color_or_black(&style.color));
        paint.anti_alias = true;
        let stroke = Stroke {
            width: style.width as f32,
            line_cap: LineCap::Round,
            line_join: LineJoin::Round,
            ..Stroke::default()
        };
        self.pixmap
            .stroke_path(&path, &paint, &stroke, Transform::identity(), None);
    }
}

/// Convert a kurbo shape to a tiny-skia path.
fn to_path(shape: &impl Shape) -> Option<tiny_skia::Path> {
    let mut pb = PathBuilder::new();
    for el in shape.path_elements(PATH_TOLERANCE) {
        match el {
            PathEl::MoveTo(p) => pb.move_to(p.x as f32, p.y as f32),
            PathEl::LineTo(p) => pb.line_to(p.x as f32, p.y as f32),
            PathEl::QuadTo(p1, p2) => pb.quad_to(p1.x as f32, p1.y as f32, p2.x as f32, p2.y as f32),
            PathEl::CurveTo(p1, p2, p3) => pb.cubic_to(
                p1.x as f32,
                p1.y as f32,
                p2.x as f32,
                p2.y as f32,
                p3.x as f32,
                p3.y as f32,
            ),
            PathEl::ClosePath => pb.close(),
        }
    }
    pb.finish()
}

impl Surface for RasterSurface {
    type Snapshot = Pixmap;

    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        if (width, height) == self.size() {
            return;
        }
        let Some(mut next) = Pixmap::new(width.max(1), height.max(1)) else {
            log::warn!("Cannot resize surface to {}x{}", width, height);
            return;
        };
        next.draw_pixmap(
            0,
            0,
            self.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
        self.pixmap = next;
    }

    fn clear(&mut self) {
        self.pixmap.fill(Color::TRANSPARENT);
    }

    fn clear_rect(&mut self, rect: Rect) {
        let Some(rect) =
            tiny_skia::Rect::from_ltrb(rect.x0 as f32, rect.y0 as f32, rect.x1 as f32, rect.y1 as f32)
        else {
            return;
        };
        let mut paint = Paint::default();
        paint.blend_mode = BlendMode::Clear;
        self.pixmap.fill_rect(rect, &paint, Transform::identity(), None);
    }

    fn stroke_line(&mut self, from: Point, to: Point, style: &StrokeStyle) {
        let mut path = BezPath::new();
        path.move_to(from);
        path.line_to(to);
        self.stroke_shape(to_path(&path), style);
    }

    fn stroke_rect(&mut self, rect: Rect, style: &StrokeStyle) {
        self.stroke_shape(to_path(&rect), style);
    }

    fn stroke_circle(&mut self, circle: Circle, style: &StrokeStyle) {
        self.stroke_shape(to_path(&circle), style);
    }

    fn snapshot(&self) -> Pixmap {
        self.pixmap.clone()
    }

    fn restore(&mut self, snapshot: &Pixmap) {
        if (snapshot.width(), snapshot.height()) == self.size() {
            self.pixmap.data_mut().copy_from_slice(snapshot.data());
            return;
        }
        self.clear();
        let paint = PixmapPaint {
            blend_mode: BlendMode::Source,
            ..PixmapPaint::default()
        };
        self.pixmap
            .draw_pixmap(0, 0, snapshot.as_ref(), &paint, Transform::identity(), None);
    }
}

/// Flatten the remote overlay on top of the local surface.
///
/// The result has the local surface's size.
pub fn composite(local: &RasterSurface, remote: &RasterSurface) -> RenderResult<RasterSurface> {
    let (width, height) = local.size();
    let mut out = RasterSurface::new(width, height)?;
    for layer in [local, remote] {
        out.pixmap.draw_pixmap(
            0,
            0,
            layer.pixmap.as_ref(),
            &PixmapPaint::default(),
            Transform::identity(),
            None,
        );
    }
    Ok(out)
}

/// Parse a color token: `#rgb`, `#rrggbb`, `#rrggbbaa`, `transparent` or a
/// basic CSS color name.
pub fn parse_color(token: &str) -> Option<Color> {
    let token = token.trim();
    if let Some(hex) = token.strip_prefix('#') {
        return parse_hex(hex);
    }
    let (r, g, b) = match token.to_ascii_lowercase().as_str() {
        "transparent" => return Some(Color::TRANSPARENT),
        "black" => (0, 0, 0),
        "white" => (255, 255, 255),
        "red" => (255, 0, 0),
        "green" => (0, 128, 0),
        "blue" => (0, 0, 255),
        "yellow" => (255, 255, 0),
        "orange" => (255, 165, 0),
        "purple" => (128, 0, 128),
        "gray" | "grey" => (128, 128, 128),
        _ => return None,
    };
    Some(Color::from_rgba8(r, g, b, 255))
}

fn parse_hex(hex: &str) -> Option<Color> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();
    match hex.len() {
        3 => {
            let nibble = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|n| n * 17);
            Some(Color::from_rgba8(nibble(0)?, nibble(1)?, nibble(2)?, 255))
        }
        6 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, 255)),
        8 => Some(Color::from_rgba8(byte(0)?, byte(2)?, byte(4)?, byte(6)?)),
        _ => None,
    }
}

/// [`parse_color`], falling back to black.
pub fn color_or_black(token: &str) -> Color {
    parse_color(token).unwrap_or_else(|| {
        log::warn!("Unknown color {:?}, using black", token);
        Color::BLACK
    })
}
