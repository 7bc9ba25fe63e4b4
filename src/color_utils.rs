//! Color conversion helpers used to build the annotation palette.

use lexi_draw::Color;

/// HSV to linear RGB components in 0.0-1.0. Hue is in degrees and wraps.
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let hue = h.rem_euclid(360.0) / 60.0;
    let chroma = v * s;
    let second = chroma * (1.0 - (hue % 2.0 - 1.0).abs());
    let base = v - chroma;

    let (r, g, b) = match hue as u32 {
        0 => (chroma, second, 0.0),
        1 => (second, chroma, 0.0),
        2 => (0.0, chroma, second),
        3 => (0.0, second, chroma),
        4 => (second, 0.0, chroma),
        _ => (chroma, 0.0, second),
    };
    (r + base, g + base, b + base)
}

/// Opaque color from HSV components.
pub fn hsv_color(h: f32, s: f32, v: f32) -> Color {
    let (r, g, b) = hsv_to_rgb(h, s, v);
    Color::rgb(r, g, b)
}

/// Evenly spaced hue for slot `index` out of `count`, offset so the first
/// slot is not pure red.
pub fn palette_hue(index: usize, count: usize) -> f32 {
    let count = count.max(1) as f32;
    (30.0 + 360.0 * index as f32 / count) % 360.0
}
