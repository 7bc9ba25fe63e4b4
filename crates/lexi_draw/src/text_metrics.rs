//! Text measurement estimates.
//!
//! Label chips are laid out before any glyphs are shaped, so sizes come from
//! per-font ratios rather than real shaping.

/// Width and height estimates for one font at one pixel size.
#[derive(Debug, Clone, Copy)]
pub struct TextMetrics {
    pub size: f32,
    /// Mean advance per character, relative to `size`
    pub char_width_ratio: f32,
    /// Baseline-to-baseline distance, relative to `size`
    pub line_height_ratio: f32,
}

impl TextMetrics {
    /// Ratios tuned for a typical proportional sans-serif.
    pub const SANS: TextMetrics = TextMetrics {
        size: 14.0,
        char_width_ratio: 0.55,
        line_height_ratio: 1.25,
    };

    pub fn new(size: f32) -> Self {
        Self {
            size,
            ..Self::SANS
        }
    }

    pub fn line_width(&self, text: &str) -> f32 {
        text.chars().count() as f32 * self.size * self.char_width_ratio
    }

    pub fn line_height(&self) -> f32 {
        self.size * self.line_height_ratio
    }

    /// Bounding `(width, height)` of `text`, split on newlines. Empty text
    /// still occupies one line.
    pub fn measure(&self, text: &str) -> (f32, f32) {
        let (widest, lines) = text
            .lines()
            .fold((0.0f32, 0usize), |(w, n), line| (w.max(self.line_width(line)), n + 1));
        (widest, lines.max(1) as f32 * self.line_height())
    }
}

impl Default for TextMetrics {
    fn default() -> Self {
        Self::SANS
    }
}
