//! The drawing surface abstraction shared by every overlay layer.

use crate::{Color, ImageHandle, Point, Rect};

/// A retained drawing surface owned by exactly one layer.
///
/// Coordinates are surface pixels with the origin at the top-left corner.
/// Clips nest: each `push_clip` intersects with the current clip and must be
/// balanced by a `pop_clip`.
pub trait Surface {
    /// Current pixel size.
    fn size(&self) -> (u32, u32);

    /// Reallocate to a new pixel size. Content is discarded.
    fn resize(&mut self, width: u32, height: u32);

    /// Make `region` (or the whole surface when `None`) fully transparent.
    fn clear(&mut self, region: Option<Rect>);

    fn push_clip(&mut self, rect: Rect);

    fn pop_clip(&mut self);

    fn fill_rect(&mut self, rect: Rect, color: Color);

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32);

    /// Draw `image` scaled to fill `dest`.
    fn draw_image(&mut self, image: &ImageHandle, dest: Rect);

    /// Draw a single line of text with its top-left corner at `origin`.
    fn draw_text(&mut self, text: &str, origin: Point, size: f32, color: Color);
}

/// A draw command as captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    Resize {
        width: u32,
        height: u32,
    },
    Clear {
        region: Option<Rect>,
    },
    PushClip {
        rect: Rect,
    },
    PopClip,
    FillRect {
        rect: Rect,
        color: Color,
    },
    StrokeRect {
        rect: Rect,
        color: Color,
        width: f32,
    },
    DrawImage {
        image_id: usize,
        dest: Rect,
    },
    DrawText {
        text: String,
        origin: Point,
        size: f32,
        color: Color,
    },
}

impl DrawCommand {
    /// True for commands that put pixels on the surface.
    pub fn is_paint(&self) -> bool {
        matches!(
            self,
            DrawCommand::FillRect { .. }
                | DrawCommand::StrokeRect { .. }
                | DrawCommand::DrawImage { .. }
                | DrawCommand::DrawText { .. }
        )
    }
}

/// A surface that draws nothing and records every command.
#[derive(Debug, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    commands: Vec<DrawCommand>,
    clip_depth: usize,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    /// Commands recorded since the last [`take_commands`](Self::take_commands).
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn take_commands(&mut self) -> Vec<DrawCommand> {
        std::mem::take(&mut self.commands)
    }

    /// Number of recorded commands that put pixels on the surface.
    pub fn paint_count(&self) -> usize {
        self.commands.iter().filter(|c| c.is_paint()).count()
    }

    /// Strings passed to `draw_text`, in order.
    pub fn texts(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                DrawCommand::DrawText { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Current clip nesting depth; zero when pushes and pops are balanced.
    pub fn clip_depth(&self) -> usize {
        self.clip_depth
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.commands.push(DrawCommand::Resize { width, height });
    }

    fn clear(&mut self, region: Option<Rect>) {
        self.commands.push(DrawCommand::Clear { region });
    }

    fn push_clip(&mut self, rect: Rect) {
        self.clip_depth += 1;
        self.commands.push(DrawCommand::PushClip { rect });
    }

    fn pop_clip(&mut self) {
        self.clip_depth = self.clip_depth.saturating_sub(1);
        self.commands.push(DrawCommand::PopClip);
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.commands.push(DrawCommand::FillRect { rect, color });
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.commands
            .push(DrawCommand::StrokeRect { rect, color, width });
    }

    fn draw_image(&mut self, image: &ImageHandle, dest: Rect) {
        self.commands.push(DrawCommand::DrawImage {
            image_id: image.id(),
            dest,
        });
    }

    fn draw_text(&mut self, text: &str, origin: Point, size: f32, color: Color) {
        self.commands.push(DrawCommand::DrawText {
            text: text.to_string(),
            origin,
            size,
            color,
        });
    }
}

/// Borrowing wrapper that counts draw calls issued to the inner surface.
///
/// Clears and paints count; clip bookkeeping does not.
pub struct Counted<'a, S: Surface + ?Sized> {
    inner: &'a mut S,
    calls: usize,
}

impl<'a, S: Surface + ?Sized> Counted<'a, S> {
    pub fn new(inner: &'a mut S) -> Self {
        Self { inner, calls: 0 }
    }

    pub fn calls(&self) -> usize {
        self.calls
    }
}

impl<S: Surface + ?Sized> Surface for Counted<'_, S> {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.inner.resize(width, height);
    }

    fn clear(&mut self, region: Option<Rect>) {
        self.calls += 1;
        self.inner.clear(region);
    }

    fn push_clip(&mut self, rect: Rect) {
        self.inner.push_clip(rect);
    }

    fn pop_clip(&mut self) {
        self.inner.pop_clip();
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.calls += 1;
        self.inner.fill_rect(rect, color);
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.calls += 1;
        self.inner.stroke_rect(rect, color, width);
    }

    fn draw_image(&mut self, image: &ImageHandle, dest: Rect) {
        self.calls += 1;
        self.inner.draw_image(image, dest);
    }

    fn draw_text(&mut self, text: &str, origin: Point, size: f32, color: Color) {
        self.calls += 1;
        self.inner.draw_text(text, origin, size, color);
    }
}
