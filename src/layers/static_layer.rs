use lexi_draw::{Counted, ImageHandle, Surface};

use super::{Layer, LayerStats, RenderContext};
use crate::dirty::DirtyRegion;
use crate::scheduler::LayerId;

/// What the base layer shows.
#[derive(Debug, Clone, Default)]
pub enum BaseImage {
    /// Nothing loaded yet
    #[default]
    Empty,
    Loaded(ImageHandle),
    /// The load failed; a placeholder is drawn
    Failed,
}

/// The decoded image, drawn once per load or resize.
pub struct StaticLayer<S: Surface> {
    surface: S,
    image: BaseImage,
    stats: LayerStats,
}

impl<S: Surface> StaticLayer<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            image: BaseImage::Empty,
            stats: LayerStats::default(),
        }
    }

    pub fn image(&self) -> &BaseImage {
        &self.image
    }

    pub fn set_image(&mut self, image: BaseImage) {
        self.image = image;
    }
}

impl<S: Surface> Layer<S> for StaticLayer<S> {
    fn id(&self) -> LayerId {
        LayerId::Static
    }

    fn surface(&self) -> &S {
        &self.surface
    }

    fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    /// Always repaints the full surface; the image covers all of it.
    fn redraw(&mut self, regions: &[DirtyRegion], ctx: &RenderContext<'_>) -> usize {
        if regions.is_empty() {
            return 0;
        }
        let bounds = ctx.bounds();
        let mut s = Counted::new(&mut self.surface);
        s.clear(None);
        match &self.image {
            BaseImage::Empty => {}
            BaseImage::Loaded(image) => s.draw_image(image, bounds),
            BaseImage::Failed => {
                s.fill_rect(bounds, ctx.theme.placeholder_color());
                s.stroke_rect(
                    bounds.expand(-ctx.theme.stroke_width / 2.0),
                    ctx.theme.placeholder_border(),
                    ctx.theme.stroke_width,
                );
            }
        }
        let calls = s.calls();
        self.stats.record(calls);
        log::trace!("static layer redrawn ({} calls)", calls);
        calls
    }

    fn stats(&self) -> LayerStats {
        self.stats
    }
}
