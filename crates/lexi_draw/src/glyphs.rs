//! Glyph rasterization for the CPU backend.
//!
//! Text is shaped with cosmic-text and rendered to coverage through its swash
//! cache. Callers receive one straight-alpha pixel at a time, relative to the
//! top-left corner of the line box.

use cosmic_text::{Attrs, Buffer, FontSystem, Metrics, Shaping, SwashCache};

use crate::Color;

/// Line box height as a multiple of the font size, matching [`TextMetrics`](crate::TextMetrics).
const LINE_HEIGHT_RATIO: f32 = 1.25;

pub struct GlyphRasterizer {
    fonts: FontSystem,
    cache: SwashCache,
}

impl GlyphRasterizer {
    /// Load the system font database. This is slow; keep one per surface.
    pub fn new() -> Self {
        let fonts = FontSystem::new();
        if fonts.db().is_empty() {
            log::warn!("No system fonts found, text will not be rasterized");
        }
        Self {
            fonts,
            cache: SwashCache::new(),
        }
    }

    pub fn has_fonts(&self) -> bool {
        !self.fonts.db().is_empty()
    }

    /// Shape and rasterize one line of `text`, calling `plot(x, y, rgba)` for
    /// every pixel with non-zero coverage.
    pub fn rasterize(
        &mut self,
        text: &str,
        size: f32,
        color: Color,
        mut plot: impl FnMut(i32, i32, [u8; 4]),
    ) {
        if text.is_empty() || !size.is_finite() || size <= 0.0 {
            return;
        }
        let metrics = Metrics::new(size, (size * LINE_HEIGHT_RATIO).ceil());
        let mut buffer = Buffer::new(&mut self.fonts, metrics);
        buffer.set_size(&mut self.fonts, None, None);
        buffer.set_text(&mut self.fonts, text, &Attrs::new(), Shaping::Advanced);
        buffer.shape_until_scroll(&mut self.fonts, false);

        let [r, g, b, a] = color.to_rgba8();
        let ink = cosmic_text::Color::rgba(r, g, b, a);
        buffer.draw(&mut self.fonts, &mut self.cache, ink, |x, y, _, _, c| {
            if c.a() > 0 {
                plot(x, y, c.as_rgba());
            }
        });
    }
}

impl Default for GlyphRasterizer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlyphRasterizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphRasterizer")
            .field("faces", &self.fonts.db().len())
            .finish()
    }
}
