use lexi_draw::{Counted, Point, Rect, Surface};

use super::{ChipSide, Layer, LayerStats, RenderContext, layout_chip};
use crate::annotation::{Annotation, AnnotationId};
use crate::dirty::DirtyRegion;
use crate::scheduler::LayerId;
use crate::theme::{Emphasis, Theme};

/// Transient emphasis for the hovered and focused annotations.
///
/// Every redraw first erases what the previous redraw painted, then paints
/// the current emphasis and remembers where it went.
pub struct HoverLayer<S: Surface> {
    surface: S,
    drawn: Vec<Rect>,
    stats: LayerStats,
}

fn tooltip_lines(annotation: &Annotation) -> Vec<&str> {
    let mut lines = vec![annotation.label.as_str()];
    if let Some(secondary) = &annotation.secondary_label {
        lines.push(secondary.as_str());
    }
    lines
}

/// Pixels the emphasis for an annotation at `rect` covers: glow, outline and
/// tooltip.
pub(crate) fn emphasis_extent(rect: Rect, annotation: &Annotation, theme: &Theme, bounds: Rect) -> Rect {
    let glow = rect.expand(theme.glow_radius.max(theme.emphasis_width));
    let tooltip = layout_chip(rect, &tooltip_lines(annotation), ChipSide::Below, theme, bounds);
    glow.union(&tooltip.rect).expand(1.0).round_out()
}

impl<S: Surface> HoverLayer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            drawn: Vec::new(),
            stats: LayerStats::default(),
        }
    }

    /// Extents painted by the last redraw.
    pub fn drawn(&self) -> &[Rect] {
        &self.drawn
    }

    /// Forget painted extents after the surface was reallocated.
    pub fn forget_drawn(&mut self) {
        self.drawn.clear();
    }
}

fn emphasized<'a>(ctx: &'a RenderContext<'_>) -> Vec<(&'a AnnotationId, Emphasis)> {
    let mut out: Vec<(&AnnotationId, Emphasis)> = Vec::with_capacity(2);
    // Focus first so the hover effect paints on top.
    for id in [ctx.interaction.focused_id(), ctx.interaction.hovered_id()]
        .into_iter()
        .flatten()
    {
        if out.iter().any(|(seen, _)| *seen == id) {
            continue;
        }
        if let Some(emphasis) = ctx.interaction.emphasis_for(id) {
            out.push((id, emphasis));
        }
    }
    out
}

fn draw_emphasis<S: Surface + ?Sized>(
    s: &mut S,
    rect: Rect,
    annotation: &Annotation,
    emphasis: Emphasis,
    ctx: &RenderContext<'_>,
) {
    let theme = ctx.theme;
    s.fill_rect(rect.expand(theme.glow_radius), theme.glow_color(emphasis));
    s.stroke_rect(rect, theme.emphasis_color(emphasis), theme.emphasis_width);

    let lines = tooltip_lines(annotation);
    let chip = layout_chip(rect, &lines, ChipSide::Below, theme, ctx.bounds());
    s.fill_rect(chip.rect, theme.label_background());
    for (i, line) in lines.iter().enumerate() {
        let color = if i == 0 {
            theme.label_text()
        } else {
            theme.secondary_text()
        };
        let origin = Point::new(chip.text_x, chip.text_y + chip.line_height * i as f32);
        s.draw_text(line, origin, theme.label_size, color);
    }
}

impl<S: Surface> Layer<S> for HoverLayer<S> {
    fn id(&self) -> LayerId {
        LayerId::Hover
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

        if regions.contains(&DirtyRegion::Full) {
            s.clear(None);
        } else {
            for extent in self.drawn.drain(..) {
                s.clear(Some(extent));
            }
        }
        self.drawn.clear();

        for (id, emphasis) in emphasized(ctx) {
            let Some(placed) = ctx.placed.iter().find(|p| &p.id == id) else {
                continue;
            };
            let Some(annotation) = ctx.annotations.get_index(placed.z) else {
                continue;
            };
            draw_emphasis(&mut s, placed.rect, annotation, emphasis, ctx);
            self.drawn
                .push(emphasis_extent(placed.rect, annotation, ctx.theme, bounds));
        }

        let calls = s.calls();
        self.stats.record(calls);
        calls
    }

    fn stats(&self) -> LayerStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::{AnnotationKind, AnnotationSet, NormalizedBox};
    use crate::config::SpatialIndexKind;
    use crate::hit_test::HitTester;
    use crate::input::{DeviceKind, Tolerance};
    use crate::interaction::InteractionState;
    use crate::mapper::CoordinateMapper;
    use crate::viewport::ViewportState;
    use lexi_draw::{DrawCommand, RecordingSurface, Size};
    use std::time::Duration;
    use web_time::Instant;

    fn setup() -> (AnnotationSet, HitTester) {
        let annotations = AnnotationSet::from_records(vec![
            Annotation::new(
                "eye",
                NormalizedBox::new(0.5, 0.4, 0.1, 0.1),
                AnnotationKind::Anatomical,
                "el ojo",
            )
            .with_secondary("eye"),
            Annotation::new(
                "tail",
                NormalizedBox::new(0.1, 0.1, 0.1, 0.1),
                AnnotationKind::Anatomical,
                "la cola",
            ),
        ])
        .0;
        let mut vp = ViewportState::new(Size::new(600.0, 450.0));
        vp.set_natural(Size::new(1200.0, 900.0));
        let mut hits = HitTester::new(SpatialIndexKind::Linear, 64.0, Tolerance::default());
        hits.rebuild(&annotations, &CoordinateMapper::new(&vp));
        (annotations, hits)
    }

    #[test]
    fn test_hover_draws_tooltip_and_clears_previous() {
        let (annotations, hits) = setup();
        let theme = Theme::dark();
        let mut interaction = InteractionState::new(Duration::from_secs(3));
        let mut layer = HoverLayer::new(RecordingSurface::new(600, 450));
        let now = Instant::now();

        interaction.set_hover(Some(AnnotationId::from("eye")), DeviceKind::Mouse, now);
        let ctx = RenderContext {
            annotations: &annotations,
            placed: hits.placed(),
            interaction: &interaction,
            theme: &theme,
            show_labels: true,
            display: Size::new(600.0, 450.0),
        };
        layer.redraw(&[DirtyRegion::Rect(Rect::new(300.0, 180.0, 60.0, 45.0))], &ctx);
        assert_eq!(layer.surface().texts(), vec!["el ojo", "eye"]);
        assert_eq!(layer.drawn().len(), 1);
        let first_extent = layer.drawn()[0];
        layer.surface_mut().take_commands();

        interaction.set_hover(None, DeviceKind::Mouse, now);
        let ctx = RenderContext {
            annotations: &annotations,
            placed: hits.placed(),
            interaction: &interaction,
            theme: &theme,
            show_labels: true,
            display: Size::new(600.0, 450.0),
        };
        layer.redraw(&[DirtyRegion::Rect(first_extent)], &ctx);
        assert_eq!(
            layer.surface().commands(),
            &[DrawCommand::Clear {
                region: Some(first_extent)
            }]
        );
        assert!(layer.drawn().is_empty());
        assert_eq!(layer.stats().redraws, 2);
    }

    #[test]
    fn test_focus_and_hover_both_drawn() {
        let (annotations, hits) = setup();
        let theme = Theme::dark();
        let mut interaction = InteractionState::new(Duration::from_secs(3));
        interaction.set_focus(Some(AnnotationId::from("tail")));
        interaction.set_hover(Some(AnnotationId::from("eye")), DeviceKind::Mouse, Instant::now());
        let ctx = RenderContext {
            annotations: &annotations,
            placed: hits.placed(),
            interaction: &interaction,
            theme: &theme,
            show_labels: false,
            display: Size::new(600.0, 450.0),
        };
        let mut layer = HoverLayer::new(RecordingSurface::new(600, 450));
        layer.redraw(&[DirtyRegion::Full], &ctx);
        assert_eq!(layer.surface().texts(), vec!["la cola", "el ojo", "eye"]);
        assert_eq!(layer.drawn().len(), 2);
    }

    #[test]
    fn test_extent_covers_glow_and_tooltip() {
        let (annotations, _) = setup();
        let theme = Theme::dark();
        let rect = Rect::new(300.0, 180.0, 60.0, 45.0);
        let extent = emphasis_extent(
            rect,
            annotations.get_index(0).unwrap(),
            &theme,
            Rect::new(0.0, 0.0, 600.0, 450.0),
        );
        assert!(extent.x <= rect.x - theme.glow_radius);
        assert!(extent.bottom() >= rect.bottom() + 2.0 * theme.label_size);
    }
}
