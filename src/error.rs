//! Error types surfaced to the host.

use thiserror::Error;

use crate::annotation::AnnotationId;

/// The base image could not be fetched or decoded.
///
/// Recoverable by the host (retry, different URL). The overlay leaves the
/// static layer showing a placeholder and keeps running.
#[derive(Debug, Error)]
pub enum ImageLoadError {
    #[error("failed to fetch image {url}: {message}")]
    Fetch { url: String, message: String },

    #[error("unrecognized image format for {url}")]
    UnsupportedFormat { url: String },

    #[error("failed to decode image {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: image::ImageError,
    },

    #[error("image {url} has zero size")]
    EmptyImage { url: String },

    #[error("image {url} produced an unusable pixel buffer: {source}")]
    Buffer {
        url: String,
        #[source]
        source: lexi_draw::DrawError,
    },
}

impl ImageLoadError {
    /// The URL the failed load was for.
    pub fn url(&self) -> &str {
        match self {
            ImageLoadError::Fetch { url, .. }
            | ImageLoadError::UnsupportedFormat { url }
            | ImageLoadError::Decode { url, .. }
            | ImageLoadError::EmptyImage { url }
            | ImageLoadError::Buffer { url, .. } => url,
        }
    }
}

/// Why an annotation record was rejected at ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InvalidReason {
    #[error("bounding box has non-finite coordinates")]
    NonFinite,

    #[error("bounding box origin is negative")]
    NegativeOrigin,

    #[error("bounding box width or height is not positive")]
    NonPositiveSize,

    #[error("bounding box extends past the image edge")]
    OutOfBounds,

    #[error("annotation id is used by an earlier record")]
    DuplicateId,

    #[error("pixel box given before the image size is known")]
    UnknownImageSize,
}

/// A single annotation that was skipped. The rest of the set still renders.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("annotation {id} skipped: {reason}")]
pub struct InvalidAnnotationError {
    pub id: AnnotationId,
    pub reason: InvalidReason,
}
