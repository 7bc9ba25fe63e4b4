//! Fetching and decoding the base image.

use std::collections::HashMap;
use std::path::PathBuf;

use lexi_draw::ImageHandle;

use crate::error::ImageLoadError;

/// Supported image file extensions.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "bmp", "webp", "tiff", "tif"];

/// Check if a filename has a supported image extension.
pub fn is_image_file(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IMAGE_EXTENSIONS.iter().any(|ext| lower.ends_with(ext))
}

/// Resolves an image URL to encoded bytes.
///
/// Synchronous hosts implement this directly. Hosts with asynchronous
/// fetching use the two-phase `begin_image_load` / `complete_image_load`
/// API on the overlay instead.
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageLoadError>;
}

/// Reads `file://` URLs and plain paths from the local filesystem.
#[derive(Debug, Clone, Default)]
pub struct FileFetcher {
    /// Relative paths are resolved against this directory
    root: Option<PathBuf>,
}

impl FileFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: Some(root.into()),
        }
    }

    fn resolve(&self, url: &str) -> PathBuf {
        let path = PathBuf::from(url.strip_prefix("file://").unwrap_or(url));
        match &self.root {
            Some(root) if path.is_relative() => root.join(path),
            _ => path,
        }
    }
}

impl ImageFetcher for FileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageLoadError> {
        let path = self.resolve(url);
        log::debug!("reading image {:?}", path);
        std::fs::read(&path).map_err(|e| ImageLoadError::Fetch {
            url: url.to_string(),
            message: e.to_string(),
        })
    }
}

/// Serves encoded images from memory, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct MemoryFetcher {
    images: HashMap<String, Vec<u8>>,
}

impl MemoryFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, url: impl Into<String>, bytes: Vec<u8>) {
        self.images.insert(url.into(), bytes);
    }
}

impl ImageFetcher for MemoryFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, ImageLoadError> {
        self.images
            .get(url)
            .cloned()
            .ok_or_else(|| ImageLoadError::Fetch {
                url: url.to_string(),
                message: "not found".to_string(),
            })
    }
}

/// Decode encoded image bytes into an RGBA handle.
pub fn decode_image(url: &str, bytes: &[u8]) -> Result<ImageHandle, ImageLoadError> {
    let format = image::guess_format(bytes).map_err(|_| ImageLoadError::UnsupportedFormat {
        url: url.to_string(),
    })?;

    let rgba = image::load_from_memory_with_format(bytes, format)
        .map_err(|source| ImageLoadError::Decode {
            url: url.to_string(),
            source,
        })?
        .to_rgba8();

    let (width, height) = rgba.dimensions();
    if width == 0 || height == 0 {
        return Err(ImageLoadError::EmptyImage {
            url: url.to_string(),
        });
    }

    let handle = ImageHandle::from_rgba8(rgba.into_raw(), width, height).map_err(|source| {
        ImageLoadError::Buffer {
            url: url.to_string(),
            source,
        }
    })?;
    log::debug!("decoded {} ({}x{}, {:?})", url, width, height, format);
    Ok(handle)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Cursor;

    pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([200, 40, 40, 255]));
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, image::ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    #[test]
    fn test_is_image_file() {
        assert!(is_image_file("owl.PNG"));
        assert!(is_image_file("path/to/heron.jpeg"));
        assert!(!is_image_file("annotations.json"));
        assert!(!is_image_file(""));
    }

    #[test]
    fn test_decode_png() {
        let handle = decode_image("mem://owl.png", &png_bytes(4, 3)).unwrap();
        assert_eq!((handle.width(), handle.height()), (4, 3));
        assert_eq!(&handle.data()[..4], &[200, 40, 40, 255]);
    }

    #[test]
    fn test_decode_garbage() {
        let err = decode_image("mem://bad", b"definitely not an image").unwrap_err();
        assert!(matches!(err, ImageLoadError::UnsupportedFormat { .. }));
        assert_eq!(err.url(), "mem://bad");
    }

    #[test]
    fn test_decode_truncated_png() {
        let bytes = png_bytes(8, 8);
        let err = decode_image("mem://cut.png", &bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, ImageLoadError::Decode { .. }));
    }

    #[test]
    fn test_memory_fetcher() {
        let mut fetcher = MemoryFetcher::new();
        fetcher.insert("a.png", vec![1, 2, 3]);
        assert_eq!(fetcher.fetch("a.png").unwrap(), vec![1, 2, 3]);
        assert!(matches!(
            fetcher.fetch("b.png"),
            Err(ImageLoadError::Fetch { .. })
        ));
    }

    #[test]
    fn test_file_fetcher_missing_file() {
        let fetcher = FileFetcher::with_root("/definitely/not/here");
        let err = fetcher.fetch("file://owl.png").unwrap_err();
        assert!(matches!(err, ImageLoadError::Fetch { .. }));
    }
}
