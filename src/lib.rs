//! Lexicanvas - interactive vocabulary annotations over images
//!
//! Draws labelled boxes over a picture on three stacked surfaces (base
//! image, annotation boxes, hover/focus emphasis) and turns pointer, touch
//! and keyboard input into hover and discovery callbacks. Only the layers
//! whose pixels changed are redrawn, and only inside their dirty regions.
//!
//! The host owns the event loop: it feeds [`RawInput`] into
//! [`AnnotationOverlay::handle_input`], polls [`AnnotationOverlay::poll_frame_request`]
//! for a [`FrameToken`] and hands it back through [`AnnotationOverlay::tick`]
//! when the display is ready for a frame.

pub mod annotation;
pub mod color_utils;
pub mod config;
pub mod dirty;
pub mod error;
pub mod image_cache;
pub mod input;
pub mod interaction;
pub mod keybindings;
pub mod layers;
pub mod loader;
pub mod mapper;
pub mod overlay;
pub mod perf;
pub mod scheduler;
pub mod theme;
pub mod viewport;

#[cfg(test)]
mod tests;

pub use annotation::{Annotation, AnnotationId, AnnotationKind, AnnotationSet, BoxUnits, NormalizedBox};
pub use config::{ConfigError, LogLevel, OverlayConfig, SpatialIndexKind};
pub use dirty::{DirtyRegion, DirtyRegionTracker};
pub use error::{ImageLoadError, InvalidAnnotationError, InvalidReason};
pub use hit_test::{HitTester, PlacedAnnotation, SpatialIndex};
pub use image_cache::ImageCache;
pub use input::{DeviceKind, Key, Modifiers, RawInput, SurfaceRect, Tolerance};
pub use interaction::{HoverState, InteractionState};
pub use layers::{BaseImage, Layer, LayerStats};
pub use loader::{FileFetcher, ImageFetcher, MemoryFetcher};
pub use mapper::CoordinateMapper;
pub use overlay::{AnnotationOverlay, FrameReport, LoadOutcome, LoadTicket};
pub use perf::{PerfReport, PerformanceMonitor};
pub use scheduler::{FrameToken, LayerId, RenderScheduler};
pub use theme::{Theme, ThemeChoice};
pub use viewport::ViewportState;

pub use lexi_draw;
