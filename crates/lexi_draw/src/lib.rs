//! lexi_draw - drawing primitives for layered annotation overlays.
//!
//! Every overlay layer draws through the [`Surface`] trait. Three backends are
//! provided: [`PixmapSurface`] (tiny-skia raster), [`RecordingSurface`]
//! (command log, used for instrumentation) and, on wasm32, `CanvasSurface`
//! (a browser 2D canvas).

mod color;
mod error;
mod geometry;
mod glyphs;
mod image;
mod raster;
mod surface;
mod text_metrics;

#[cfg(target_arch = "wasm32")]
mod canvas;

pub use color::Color;
pub use error::{DrawError, Result};
pub use geometry::{Point, Rect, Size};
pub use image::ImageHandle;
pub use glyphs::GlyphRasterizer;
pub use raster::{composite, PixmapSurface};
pub use surface::{Counted, DrawCommand, RecordingSurface, Surface};
pub use text_metrics::TextMetrics;

#[cfg(target_arch = "wasm32")]
pub use canvas::CanvasSurface;
