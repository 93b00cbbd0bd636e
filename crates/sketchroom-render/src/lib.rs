//! SketchRoom Render Library
//!
//! CPU raster backend for SketchRoom surfaces, built on tiny-skia.

mod error;
pub mod export;
pub mod raster;

pub use error::{RenderError, RenderResult};
pub use export::{fit_size, load_history, render_history};
pub use raster::{RasterSurface, color_or_black, composite, parse_color};
