//! The three stacked drawing layers.
//!
//! Each layer owns exactly one surface and redraws only that surface. They
//! read the annotation set and interaction state through [`RenderContext`]
//! and never mutate either.

mod hover;
mod interactive;
mod static_layer;

pub use hover::HoverLayer;
pub use interactive::InteractiveLayer;
pub use static_layer::{BaseImage, StaticLayer};

pub(crate) use hover::emphasis_extent;

use lexi_draw::{Rect, Size, Surface, TextMetrics};

use crate::annotation::AnnotationSet;
use crate::dirty::DirtyRegion;
use crate::hit_test::PlacedAnnotation;
use crate::interaction::InteractionState;
use crate::scheduler::LayerId;
use crate::theme::Theme;

/// Everything a layer may read while redrawing.
pub struct RenderContext<'a> {
    pub annotations: &'a AnnotationSet,
    /// Display rects of the visible annotations, in z-order
    pub placed: &'a [PlacedAnnotation],
    pub interaction: &'a InteractionState,
    pub theme: &'a Theme,
    pub show_labels: bool,
    pub display: Size,
}

impl RenderContext<'_> {
    pub fn bounds(&self) -> Rect {
        Rect::from_size(self.display)
    }
}

/// Redraw counters, for instrumentation and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LayerStats {
    /// Number of `redraw` passes that touched the surface
    pub redraws: usize,
    /// Clears and paints issued over the layer's lifetime
    pub draw_calls: usize,
}

impl LayerStats {
    pub(crate) fn record(&mut self, draw_calls: usize) {
        self.redraws += 1;
        self.draw_calls += draw_calls;
    }
}

pub trait Layer<S: Surface> {
    fn id(&self) -> LayerId;

    fn surface(&self) -> &S;

    fn surface_mut(&mut self) -> &mut S;

    /// Repaint `regions` of this layer's surface. Returns the draw calls
    /// issued.
    fn redraw(&mut self, regions: &[DirtyRegion], ctx: &RenderContext<'_>) -> usize;

    fn stats(&self) -> LayerStats;

    /// Reallocate the surface. The caller schedules the redraw.
    fn resize(&mut self, width: u32, height: u32) {
        self.surface_mut().resize(width, height);
    }
}

/// Where a text chip goes and where its lines start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct ChipLayout {
    pub rect: Rect,
    pub text_x: f32,
    pub text_y: f32,
    pub line_height: f32,
}

/// Which side of the anchor a chip prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ChipSide {
    Above,
    Below,
}

/// Size a chip for `lines` and place it against `anchor`.
///
/// The chip flips to the other side when it would leave `bounds` (for labels
/// above a box at the top edge this means drawing just inside the box), and
/// slides left to stay within the right edge.
pub(crate) fn layout_chip(
    anchor: Rect,
    lines: &[&str],
    side: ChipSide,
    theme: &Theme,
    bounds: Rect,
) -> ChipLayout {
    let metrics = TextMetrics::new(theme.label_size);
    let width = lines
        .iter()
        .map(|l| metrics.line_width(l))
        .fold(0.0f32, f32::max)
        + theme.label_padding * 2.0;
    let line_height = metrics.line_height();
    let height = line_height * lines.len().max(1) as f32 + theme.label_padding * 2.0;

    let above = anchor.y - height;
    let below = anchor.bottom();
    let y = match side {
        ChipSide::Above if above >= bounds.y => above,
        ChipSide::Above => anchor.y,
        ChipSide::Below if below + height <= bounds.bottom() => below,
        ChipSide::Below => (anchor.y - height).max(bounds.y),
    };
    let x = anchor.x.min(bounds.right() - width).max(bounds.x);

    let rect = Rect::new(x, y, width, height);
    ChipLayout {
        rect,
        text_x: rect.x + theme.label_padding,
        text_y: rect.y + theme.label_padding,
        line_height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds() -> Rect {
        Rect::new(0.0, 0.0, 600.0, 450.0)
    }

    #[test]
    fn test_label_sits_above_box() {
        let theme = Theme::dark();
        let anchor = Rect::new(300.0, 180.0, 60.0, 45.0);
        let chip = layout_chip(anchor, &["el ojo"], ChipSide::Above, &theme, bounds());
        // 6 chars * 14 * 0.55 + 8 wide, 14 * 1.25 + 8 tall
        assert!((chip.rect.width - 54.2).abs() < 1e-3);
        assert!((chip.rect.bottom() - 180.0).abs() < 1e-3);
        assert_eq!(chip.rect.x, 300.0);
        assert_eq!(chip.text_x, 304.0);
    }

    #[test]
    fn test_label_flips_inside_at_top_edge() {
        let theme = Theme::dark();
        let anchor = Rect::new(10.0, 5.0, 60.0, 45.0);
        let chip = layout_chip(anchor, &["la cresta"], ChipSide::Above, &theme, bounds());
        assert_eq!(chip.rect.y, 5.0);
    }

    #[test]
    fn test_chip_stays_within_right_edge() {
        let theme = Theme::dark();
        let anchor = Rect::new(590.0, 100.0, 10.0, 10.0);
        let chip = layout_chip(anchor, &["las plumas"], ChipSide::Below, &theme, bounds());
        assert!(chip.rect.right() <= 600.0 + 1e-3);
        assert_eq!(chip.rect.y, 110.0);
    }

    #[test]
    fn test_tooltip_flips_above_at_bottom_edge() {
        let theme = Theme::dark();
        let anchor = Rect::new(100.0, 420.0, 20.0, 20.0);
        let chip = layout_chip(anchor, &["a", "b"], ChipSide::Below, &theme, bounds());
        assert!((chip.rect.bottom() - 420.0).abs() < 1e-3);
    }
}
