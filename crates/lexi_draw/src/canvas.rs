//! Browser backend: one `<canvas>` element per layer.
//!
//! Canvas2D calls that can fail are logged and skipped; a failed draw call
//! must not take down the frame.

use std::collections::HashMap;

use wasm_bindgen::{Clamped, JsCast, JsValue};
use web_sys::{CanvasRenderingContext2d, HtmlCanvasElement, ImageData};

use crate::{Color, ImageHandle, Point, Rect, Surface};

/// A [`Surface`] drawing into an `HtmlCanvasElement`'s 2D context.
pub struct CanvasSurface {
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    clip_depth: usize,
    /// Offscreen canvases holding uploaded image pixels, keyed by `ImageHandle::id`
    images: HashMap<usize, (ImageHandle, HtmlCanvasElement)>,
}

impl CanvasSurface {
    /// Wrap a canvas element, acquiring its 2D context.
    pub fn new(canvas: HtmlCanvasElement) -> Result<Self, JsValue> {
        let ctx = context_2d(&canvas)?;
        Ok(Self {
            canvas,
            ctx,
            clip_depth: 0,
            images: HashMap::new(),
        })
    }

    pub fn canvas(&self) -> &HtmlCanvasElement {
        &self.canvas
    }

    fn upload(image: &ImageHandle) -> Result<HtmlCanvasElement, JsValue> {
        let document = web_sys::window()
            .and_then(|w| w.document())
            .ok_or_else(|| JsValue::from_str("no document available"))?;
        let offscreen: HtmlCanvasElement = document.create_element("canvas")?.dyn_into()?;
        offscreen.set_width(image.width());
        offscreen.set_height(image.height());
        let data = ImageData::new_with_u8_clamped_array_and_sh(
            Clamped(image.data()),
            image.width(),
            image.height(),
        )?;
        context_2d(&offscreen)?.put_image_data(&data, 0.0, 0.0)?;
        Ok(offscreen)
    }
}

fn context_2d(canvas: &HtmlCanvasElement) -> Result<CanvasRenderingContext2d, JsValue> {
    canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("2d context unavailable"))?
        .dyn_into::<CanvasRenderingContext2d>()
        .map_err(JsValue::from)
}

fn log_js_error(op: &str, result: Result<(), JsValue>) {
    if let Err(e) = result {
        log::warn!("canvas {} failed: {:?}", op, e);
    }
}

impl Surface for CanvasSurface {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width(), self.canvas.height())
    }

    fn resize(&mut self, width: u32, height: u32) {
        // Setting the size resets the context state, including clips.
        self.canvas.set_width(width);
        self.canvas.set_height(height);
        self.clip_depth = 0;
    }

    fn clear(&mut self, region: Option<Rect>) {
        let (w, h) = self.size();
        let r = region.unwrap_or(Rect::new(0.0, 0.0, w as f32, h as f32));
        self.ctx
            .clear_rect(r.x.into(), r.y.into(), r.width.into(), r.height.into());
    }

    fn push_clip(&mut self, rect: Rect) {
        self.ctx.save();
        self.ctx.begin_path();
        self.ctx
            .rect(rect.x.into(), rect.y.into(), rect.width.into(), rect.height.into());
        self.ctx.clip();
        self.clip_depth += 1;
    }

    fn pop_clip(&mut self) {
        if self.clip_depth > 0 {
            self.ctx.restore();
            self.clip_depth -= 1;
        }
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx
            .fill_rect(rect.x.into(), rect.y.into(), rect.width.into(), rect.height.into());
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        self.ctx.set_stroke_style_str(&color.to_css());
        self.ctx.set_line_width(width.into());
        self.ctx
            .stroke_rect(rect.x.into(), rect.y.into(), rect.width.into(), rect.height.into());
    }

    fn draw_image(&mut self, image: &ImageHandle, dest: Rect) {
        if !self.images.contains_key(&image.id()) {
            match Self::upload(image) {
                Ok(offscreen) => {
                    self.images.clear();
                    self.images.insert(image.id(), (image.clone(), offscreen));
                }
                Err(e) => {
                    log::warn!("canvas image upload failed: {:?}", e);
                    return;
                }
            }
        }
        if let Some((_, offscreen)) = self.images.get(&image.id()) {
            log_js_error(
                "draw_image",
                self.ctx.draw_image_with_html_canvas_element_and_dw_and_dh(
                    offscreen,
                    dest.x.into(),
                    dest.y.into(),
                    dest.width.into(),
                    dest.height.into(),
                ),
            );
        }
    }

    fn draw_text(&mut self, text: &str, origin: Point, size: f32, color: Color) {
        self.ctx.set_fill_style_str(&color.to_css());
        self.ctx.set_font(&format!("{}px sans-serif", size.round()));
        self.ctx.set_text_baseline("top");
        log_js_error(
            "fill_text",
            self.ctx.fill_text(text, origin.x.into(), origin.y.into()),
        );
    }
}
