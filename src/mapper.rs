//! Conversions between the four coordinate spaces.
//!
//! - normalized: unit coordinates relative to the natural image size
//! - natural: image pixels
//! - display: pixels of the rendered surface
//! - pointer: client coordinates reported by the host's input events
//!
//! Every conversion that needs the natural size returns `None` until the
//! image has loaded. Callers treat `None` as "nothing to draw or hit".

use lexi_draw::{Point, Rect, Size};

use crate::annotation::NormalizedBox;
use crate::input::SurfaceRect;
use crate::viewport::ViewportState;

/// A snapshot of the viewport scales. Cheap to copy into layers.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoordinateMapper {
    natural: Size,
    scale_x: f32,
    scale_y: f32,
}

impl CoordinateMapper {
    pub fn new(viewport: &ViewportState) -> Self {
        Self {
            natural: viewport.natural(),
            scale_x: viewport.scale_x(),
            scale_y: viewport.scale_y(),
        }
    }

    pub fn is_determinate(&self) -> bool {
        !self.natural.is_empty()
    }

    pub fn to_display(self, b: &NormalizedBox) -> Option<Rect> {
        if !self.is_determinate() {
            return None;
        }
        let (nw, nh) = (self.natural.width, self.natural.height);
        Some(Rect::new(
            b.x * nw * self.scale_x,
            b.y * nh * self.scale_y,
            b.width * nw * self.scale_x,
            b.height * nh * self.scale_y,
        ))
    }

    /// Display pixels to natural image pixels.
    pub fn to_natural(self, display: Point) -> Option<Point> {
        if !self.is_determinate() || self.scale_x <= 0.0 || self.scale_y <= 0.0 {
            return None;
        }
        Some(Point::new(display.x / self.scale_x, display.y / self.scale_y))
    }

    /// Display pixels to unit coordinates.
    pub fn to_normalized(self, display: Point) -> Option<Point> {
        let natural = self.to_natural(display)?;
        Some(Point::new(
            natural.x / self.natural.width,
            natural.y / self.natural.height,
        ))
    }

    /// Client coordinates to display pixels.
    ///
    /// The surface offset is removed first. When the surface is laid out at a
    /// different size than its backing store (CSS scaling), the result is then
    /// scaled into backing-store pixels.
    pub fn from_pointer_event(client: Point, surface: &SurfaceRect, display: Size) -> Point {
        let local = Point::new(client.x - surface.left, client.y - surface.top);
        if surface.width > 0.0 && surface.height > 0.0 {
            Point::new(
                local.x * display.width / surface.width,
                local.y * display.height / surface.height,
            )
        } else {
            local
        }
    }
}
