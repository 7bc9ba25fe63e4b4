//! CPU raster backend on top of tiny-skia.

use std::collections::HashMap;
use std::path::Path;

use tiny_skia::{
    BlendMode, FillRule, FilterQuality, IntSize, Mask, Paint, PathBuilder, Pixmap, PixmapPaint,
    PremultipliedColorU8, Stroke, Transform,
};

use crate::error::{DrawError, Result};
use crate::glyphs::GlyphRasterizer;
use crate::{Color, ImageHandle, Point, Rect, Surface};

/// Converted images kept per surface before the cache is flushed.
const MAX_CACHED_IMAGES: usize = 4;

/// A [`Surface`] backed by a tiny-skia pixmap.
pub struct PixmapSurface {
    /// `None` while the surface has zero area
    pixmap: Option<Pixmap>,
    clip_stack: Vec<Rect>,
    /// Mask for the innermost clip, rebuilt on push/pop
    mask: Option<Mask>,
    /// Premultiplied copies of drawn images, keyed by `ImageHandle::id`.
    /// The handle is kept alive so its id can't be reused by another buffer.
    image_cache: HashMap<usize, (ImageHandle, Pixmap)>,
    /// Created on the first `draw_text`
    glyphs: Option<Box<GlyphRasterizer>>,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixmap: Pixmap::new(width, height),
            clip_stack: Vec::new(),
            mask: None,
            image_cache: HashMap::new(),
            glyphs: None,
        }
    }

    pub fn pixmap(&self) -> Option<&Pixmap> {
        self.pixmap.as_ref()
    }

    /// Straight-alpha RGBA at a pixel, or `None` when out of range.
    pub fn pixel_rgba(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        let c = self.pixmap.as_ref()?.pixel(x, y)?.demultiply();
        Some([c.red(), c.green(), c.blue(), c.alpha()])
    }

    /// Drop cached image conversions.
    pub fn clear_image_cache(&mut self) {
        self.image_cache.clear();
    }

    fn current_clip(&self) -> Option<Rect> {
        self.clip_stack
            .iter()
            .copied()
            .try_fold(None::<Rect>, |acc, r| match acc {
                None => Some(Some(r)),
                Some(a) => a.intersection(&r).map(Some),
            })
            .unwrap_or(Some(Rect::default()))
    }

    fn rebuild_mask(&mut self) {
        self.mask = None;
        let Some(pixmap) = self.pixmap.as_ref() else {
            return;
        };
        let Some(clip) = self.current_clip() else {
            return;
        };
        let Some(mut mask) = Mask::new(pixmap.width(), pixmap.height()) else {
            return;
        };
        if let Some(rect) = to_skia_rect(clip) {
            let path = PathBuilder::from_rect(rect);
            mask.fill_path(&path, FillRule::Winding, false, Transform::identity());
        }
        // An empty clip leaves the mask fully transparent, which discards all drawing.
        self.mask = Some(mask);
    }

    fn premultiplied(image: &ImageHandle) -> Option<Pixmap> {
        let data: Vec<u8> = image
            .data()
            .chunks_exact(4)
            .flat_map(|px| {
                let a = u16::from(px[3]);
                let mul = |c: u8| ((u16::from(c) * a + 127) / 255) as u8;
                [mul(px[0]), mul(px[1]), mul(px[2]), px[3]]
            })
            .collect();
        let size = IntSize::from_wh(image.width(), image.height())?;
        Pixmap::from_vec(data, size)
    }
}

impl Surface for PixmapSurface {
    fn size(&self) -> (u32, u32) {
        self.pixmap
            .as_ref()
            .map_or((0, 0), |p| (p.width(), p.height()))
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.pixmap = Pixmap::new(width, height);
        self.rebuild_mask();
    }

    fn clear(&mut self, region: Option<Rect>) {
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        match region {
            None => pixmap.fill(tiny_skia::Color::TRANSPARENT),
            Some(region) => {
                if let Some(rect) = to_skia_rect(region) {
                    let mut paint = Paint::default();
                    paint.set_color(tiny_skia::Color::TRANSPARENT);
                    paint.blend_mode = BlendMode::Source;
                    paint.anti_alias = false;
                    pixmap.fill_rect(rect, &paint, Transform::identity(), self.mask.as_ref());
                }
            }
        }
    }

    fn push_clip(&mut self, rect: Rect) {
        self.clip_stack.push(rect);
        self.rebuild_mask();
    }

    fn pop_clip(&mut self) {
        self.clip_stack.pop();
        self.rebuild_mask();
    }

    fn fill_rect(&mut self, rect: Rect, color: Color) {
        let (Some(pixmap), Some(rect)) = (self.pixmap.as_mut(), to_skia_rect(rect)) else {
            return;
        };
        let paint = solid_paint(color);
        pixmap.fill_rect(rect, &paint, Transform::identity(), self.mask.as_ref());
    }

    fn stroke_rect(&mut self, rect: Rect, color: Color, width: f32) {
        let (Some(pixmap), Some(rect)) = (self.pixmap.as_mut(), to_skia_rect(rect)) else {
            return;
        };
        let path = PathBuilder::from_rect(rect);
        let stroke = Stroke {
            width,
            ..Stroke::default()
        };
        pixmap.stroke_path(
            &path,
            &solid_paint(color),
            &stroke,
            Transform::identity(),
            self.mask.as_ref(),
        );
    }

    fn draw_image(&mut self, image: &ImageHandle, dest: Rect) {
        if dest.is_empty() || self.pixmap.is_none() {
            return;
        }
        if !self.image_cache.contains_key(&image.id()) {
            match Self::premultiplied(image) {
                Some(converted) => {
                    if self.image_cache.len() >= MAX_CACHED_IMAGES {
                        self.image_cache.clear();
                    }
                    self.image_cache
                        .insert(image.id(), (image.clone(), converted));
                }
                None => {
                    log::warn!(
                        "Skipping {}x{} image: conversion to pixmap failed",
                        image.width(),
                        image.height()
                    );
                    return;
                }
            }
        }
        let (Some(pixmap), Some((_, source))) =
            (self.pixmap.as_mut(), self.image_cache.get(&image.id()))
        else {
            return;
        };

        let sx = dest.width / source.width() as f32;
        let sy = dest.height / source.height() as f32;
        let paint = PixmapPaint {
            quality: FilterQuality::Bilinear,
            ..PixmapPaint::default()
        };
        pixmap.draw_pixmap(
            0,
            0,
            source.as_ref(),
            &paint,
            Transform::from_row(sx, 0.0, 0.0, sy, dest.x, dest.y),
            self.mask.as_ref(),
        );
    }

    fn draw_text(&mut self, text: &str, origin: Point, size: f32, color: Color) {
        let clip = self.current_clip();
        let Some(pixmap) = self.pixmap.as_mut() else {
            return;
        };
        if clip.is_some_and(|c| c.is_empty()) {
            return;
        }
        let glyphs = self.glyphs.get_or_insert_with(Box::default);
        let (ox, oy) = (origin.x.round() as i32, origin.y.round() as i32);
        glyphs.rasterize(text, size, color, |x, y, rgba| {
            let (px, py) = (ox + x, oy + y);
            let center = Point::new(px as f32 + 0.5, py as f32 + 0.5);
            if clip.is_none_or(|c| c.contains(center)) {
                blend_over(pixmap, px, py, rgba);
            }
        });
    }
}

/// Source-over one straight-alpha pixel onto a premultiplied pixmap.
fn blend_over(pixmap: &mut Pixmap, x: i32, y: i32, [r, g, b, a]: [u8; 4]) {
    let (Ok(x), Ok(y)) = (u32::try_from(x), u32::try_from(y)) else {
        return;
    };
    if x >= pixmap.width() || y >= pixmap.height() || a == 0 {
        return;
    }
    let idx = (y * pixmap.width() + x) as usize;
    let alpha = u16::from(a);
    let keep = 255 - alpha;
    let src = |c: u8| (u16::from(c) * alpha + 127) / 255;
    let dst = pixmap.pixels()[idx];
    let over = |s: u16, d: u8| (s + (u16::from(d) * keep + 127) / 255).min(255) as u8;
    let out = PremultipliedColorU8::from_rgba(
        over(src(r), dst.red()),
        over(src(g), dst.green()),
        over(src(b), dst.blue()),
        over(alpha, dst.alpha()),
    );
    if let Some(out) = out {
        pixmap.pixels_mut()[idx] = out;
    }
}

/// Flatten surfaces bottom-to-top into a new pixmap the size of the first.
pub fn composite(layers: &[&PixmapSurface]) -> Result<Pixmap> {
    let base = layers
        .first()
        .and_then(|s| s.pixmap())
        .ok_or(DrawError::EmptySurface)?;
    let mut out = Pixmap::new(base.width(), base.height()).ok_or(DrawError::EmptySurface)?;
    for layer in layers {
        if let Some(pixmap) = layer.pixmap() {
            out.draw_pixmap(
                0,
                0,
                pixmap.as_ref(),
                &PixmapPaint::default(),
                Transform::identity(),
                None,
            );
        }
    }
    Ok(out)
}

impl PixmapSurface {
    /// Encode the surface as PNG at `path`.
    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<()> {
        let pixmap = self.pixmap.as_ref().ok_or(DrawError::EmptySurface)?;
        pixmap
            .save_png(path)
            .map_err(|e| DrawError::Encode(e.to_string()))
    }
}

fn to_skia_rect(rect: Rect) -> Option<tiny_skia::Rect> {
    if rect.is_empty() {
        return None;
    }
    tiny_skia::Rect::from_xywh(rect.x, rect.y, rect.width, rect.height)
}

fn solid_paint(color: Color) -> Paint<'static> {
    let [r, g, b, a] = color.to_rgba8();
    let mut paint = Paint::default();
    paint.set_color_rgba8(r, g, b, a);
    paint.anti_alias = true;
    paint
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_and_clear_region() {
        let mut s = PixmapSurface::new(20, 20);
        s.fill_rect(Rect::new(0.0, 0.0, 20.0, 20.0), Color::rgb(1.0, 0.0, 0.0));
        assert_eq!(s.pixel_rgba(5, 5), Some([255, 0, 0, 255]));

        s.clear(Some(Rect::new(0.0, 0.0, 10.0, 10.0)));
        assert_eq!(s.pixel_rgba(5, 5).map(|p| p[3]), Some(0));
        assert_eq!(s.pixel_rgba(15, 15), Some([255, 0, 0, 255]));
    }

    #[test]
    fn test_clip_limits_fill() {
        let mut s = PixmapSurface::new(20, 20);
        s.push_clip(Rect::new(0.0, 0.0, 10.0, 20.0));
        s.fill_rect(Rect::new(0.0, 0.0, 20.0, 20.0), Color::WHITE);
        s.pop_clip();
        assert_eq!(s.pixel_rgba(5, 5).map(|p| p[3]), Some(255));
        assert_eq!(s.pixel_rgba(15, 5).map(|p| p[3]), Some(0));
    }

    #[test]
    fn test_draw_image_scales_to_dest() {
        let image = ImageHandle::from_rgba8([0u8, 0, 255, 255].repeat(4), 2, 2).unwrap();
        let mut s = PixmapSurface::new(8, 8);
        s.draw_image(&image, Rect::new(0.0, 0.0, 8.0, 8.0));
        let [r, _, b, a] = s.pixel_rgba(4, 4).unwrap();
        assert!(r < 5 && b > 250 && a > 250);
    }

    fn inked(s: &PixmapSurface, area: Rect) -> usize {
        let mut count = 0;
        for y in area.y as u32..area.bottom() as u32 {
            for x in area.x as u32..area.right() as u32 {
                if s.pixel_rgba(x, y).is_some_and(|p| p[3] > 0) {
                    count += 1;
                }
            }
        }
        count
    }

    #[test]
    fn test_draw_text_puts_glyphs_on_pixmap() {
        if !GlyphRasterizer::new().has_fonts() {
            return;
        }
        let mut s = PixmapSurface::new(200, 50);
        s.draw_text("el ojo", Point::new(10.0, 10.0), 24.0, Color::WHITE);
        assert!(inked(&s, Rect::new(0.0, 0.0, 200.0, 50.0)) > 20);
        assert_eq!(inked(&s, Rect::new(0.0, 0.0, 200.0, 8.0)), 0);
        assert_eq!(inked(&s, Rect::new(0.0, 0.0, 8.0, 50.0)), 0);

        s.clear(None);
        assert_eq!(inked(&s, Rect::new(0.0, 0.0, 200.0, 50.0)), 0);
    }

    #[test]
    fn test_draw_text_honours_clip() {
        if !GlyphRasterizer::new().has_fonts() {
            return;
        }
        let mut s = PixmapSurface::new(200, 50);
        s.push_clip(Rect::new(0.0, 0.0, 40.0, 50.0));
        s.draw_text("heron heron", Point::new(4.0, 10.0), 24.0, Color::WHITE);
        s.pop_clip();
        assert!(inked(&s, Rect::new(0.0, 0.0, 40.0, 50.0)) > 0);
        assert_eq!(inked(&s, Rect::new(40.0, 0.0, 160.0, 50.0)), 0);
    }

    #[test]
    fn test_blend_over_mixes_with_background() {
        let mut s = PixmapSurface::new(2, 1);
        s.fill_rect(Rect::new(0.0, 0.0, 2.0, 1.0), Color::rgb(0.0, 0.0, 1.0));
        let pixmap = s.pixmap.as_mut().unwrap();
        blend_over(pixmap, 0, 0, [255, 0, 0, 128]);
        blend_over(pixmap, 5, 0, [255, 0, 0, 255]);
        blend_over(pixmap, -1, 0, [255, 0, 0, 255]);
        let [r, _, b, a] = s.pixel_rgba(0, 0).unwrap();
        assert!((120..=135).contains(&r) && (120..=135).contains(&b));
        assert_eq!(a, 255);
        assert_eq!(s.pixel_rgba(1, 0), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_zero_sized_surface_ignores_drawing() {
        let mut s = PixmapSurface::new(0, 0);
        assert_eq!(s.size(), (0, 0));
        s.fill_rect(Rect::new(0.0, 0.0, 5.0, 5.0), Color::WHITE);
        assert!(s.pixmap().is_none());
        assert!(composite(&[&s]).is_err());
    }

    #[test]
    fn test_composite_stacks_layers() {
        let mut bottom = PixmapSurface::new(4, 4);
        bottom.fill_rect(Rect::new(0.0, 0.0, 4.0, 4.0), Color::rgb(1.0, 0.0, 0.0));
        let mut top = PixmapSurface::new(4, 4);
        top.fill_rect(Rect::new(0.0, 0.0, 2.0, 4.0), Color::rgb(0.0, 1.0, 0.0));

        let out = composite(&[&bottom, &top]).unwrap();
        let left = out.pixel(0, 0).unwrap();
        let right = out.pixel(3, 0).unwrap();
        assert_eq!((left.red(), left.green()), (0, 255));
        assert_eq!((right.red(), right.green()), (255, 0));
    }
}
