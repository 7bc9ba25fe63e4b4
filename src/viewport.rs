//! Natural and display dimensions of the overlaid image.

use lexi_draw::Size;

/// Image size and on-screen size, with the scales derived from them.
///
/// Scales are only ever written by `recompute`, which updates both axes
/// together from the current sizes. A natural dimension of zero means the
/// image has not loaded and both scales are zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ViewportState {
    natural: Size,
    display: Size,
    scale_x: f32,
    scale_y: f32,
}

impl ViewportState {
    pub fn new(display: Size) -> Self {
        let mut viewport = Self {
            display,
            ..Self::default()
        };
        viewport.recompute();
        viewport
    }

    pub fn natural(&self) -> Size {
        self.natural
    }

    pub fn display(&self) -> Size {
        self.display
    }

    pub fn scale_x(&self) -> f32 {
        self.scale_x
    }

    pub fn scale_y(&self) -> f32 {
        self.scale_y
    }

    /// True once a natural size is known.
    pub fn is_determinate(&self) -> bool {
        !self.natural.is_empty()
    }

    /// Returns true when the size changed.
    pub fn set_natural(&mut self, natural: Size) -> bool {
        if self.natural == natural {
            return false;
        }
        self.natural = natural;
        self.recompute();
        true
    }

    /// Returns true when the size changed.
    pub fn set_display(&mut self, display: Size) -> bool {
        if self.display == display {
            return false;
        }
        self.display = display;
        self.recompute();
        true
    }

    /// Forget the image size, e.g. when a new image starts loading.
    pub fn clear_natural(&mut self) {
        self.natural = Size::default();
        self.recompute();
    }

    fn recompute(&mut self) {
        let (scale_x, scale_y) = if self.natural.is_empty() {
            (0.0, 0.0)
        } else {
            (
                self.display.width / self.natural.width,
                self.display.height / self.natural.height,
            )
        };
        self.scale_x = scale_x;
        self.scale_y = scale_y;
    }
}
