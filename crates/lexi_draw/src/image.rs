use std::sync::Arc;

use crate::error::{DrawError, Result};

/// A handle to decoded RGBA8 image data.
///
/// Cloning is cheap; clones share the pixel buffer. Backends cache their
/// converted copies keyed by [`ImageHandle::id`].
#[derive(Clone, Debug)]
pub struct ImageHandle {
    /// Straight-alpha RGBA8 pixels, row-major
    data: Arc<Vec<u8>>,
    width: u32,
    height: u32,
}

impl ImageHandle {
    /// Wrap RGBA8 pixel data. Fails on a zero-sized image or when the buffer
    /// length doesn't match `width * height * 4`.
    pub fn from_rgba8(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(DrawError::ZeroSize { width, height });
        }
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(DrawError::BufferSize {
                width,
                height,
                expected,
                actual: data.len(),
            });
        }

        Ok(Self {
            data: Arc::new(data),
            width,
            height,
        })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Identity of the shared buffer; equal for clones of the same handle.
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.data) as usize
    }
}
