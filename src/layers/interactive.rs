use lexi_draw::{Counted, Point, Rect, Surface};

use super::{ChipSide, Layer, LayerStats, RenderContext, layout_chip};
use crate::annotation::Annotation;
use crate::dirty::DirtyRegion;
use crate::scheduler::LayerId;
use crate::theme::Theme;

/// Annotation boxes and label chips.
///
/// Redraws on annotation-set, viewport and label-toggle changes only; hover
/// and focus never reach this layer.
pub struct InteractiveLayer<S: Surface> {
    surface: S,
    stats: LayerStats,
}

impl<S: Surface> InteractiveLayer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            stats: LayerStats::default(),
        }
    }
}

/// Pixels an annotation touches on this layer: its box, the stroke, and its
/// label chip when labels are on.
pub(crate) fn annotation_extent(
    rect: Rect,
    annotation: &Annotation,
    theme: &Theme,
    show_labels: bool,
    bounds: Rect,
) -> Rect {
    let mut extent = rect.expand(theme.stroke_width);
    if show_labels {
        let chip = layout_chip(rect, &[&annotation.label], ChipSide::Above, theme, bounds);
        extent = extent.union(&chip.rect);
    }
    extent.round_out()
}

fn draw_annotation<S: Surface + ?Sized>(
    s: &mut S,
    rect: Rect,
    annotation: &Annotation,
    ctx: &RenderContext<'_>,
) {
    let theme = ctx.theme;
    s.fill_rect(rect, theme.kind_fill(annotation.kind));
    s.stroke_rect(rect, theme.kind_color(annotation.kind), theme.stroke_width);

    if ctx.show_labels {
        let chip = layout_chip(rect, &[&annotation.label], ChipSide::Above, theme, ctx.bounds());
        s.fill_rect(chip.rect, theme.label_background());
        s.draw_text(
            &annotation.label,
            Point::new(chip.text_x, chip.text_y),
            theme.label_size,
            theme.label_text(),
        );
    }
}

impl<S: Surface> Layer<S> for InteractiveLayer<S> {
    fn id(&self) -> LayerId {
        LayerId::Interactive
    }

    fn surface(&self) -> &S {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    fn redraw(&mut self, regions: &[DirtyRegion], ctx: &RenderContext<'_>) -> usize {
        if regions.is_empty() {
            return 0;
        }
        let bounds = ctx.bounds();
        let mut s = Counted::new(&mut self.surface);

        for region in regions {
            let area = match region {
                DirtyRegion::Full => None,
                DirtyRegion::Rect(r) => match r.round_out().intersection(&bounds) {
                    Some(clipped) => Some(clipped),
                    None => continue,
                },
            };

            if let Some(area) = area {
                s.push_clip(area);
            }
            s.clear(area);

            for placed in ctx.placed {
                let Some(annotation) = ctx.annotations.get_index(placed.z) else {
                    continue;
                };
                if !annotation.visible {
                    continue;
                }
                if let Some(area) = area {
                    let extent =
                        annotation_extent(placed.rect, annotation, ctx.theme, ctx.show_labels, bounds);
                    if !extent.intersects(&area) {
                        continue;
                    }
                }
                draw_annotation(&mut s, placed.rect, annotation, ctx);
            }

            if area.is_some() {
                s.pop_clip();
            }
        }

        let calls = s.calls();
        self.stats.record(calls);
        log::trace!(
            "interactive layer redrew {} regions ({} calls)",
            regions.len(),
            calls
        );
        calls
    }

    fn stats(&self) -> LayerStats {
        self.stats
    }
}
