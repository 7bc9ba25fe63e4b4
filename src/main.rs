//! Headless renderer: draws an image with its annotations into a PNG.
//!
//! ```text
//! lexicanvas-render <image> <annotations.json> <out.png> [x y [mouse|touch]]
//!                   [--config overlay.json] [--pixels]
//! ```
//!
//! With a point given, the pointer is moved there (mouse) or tapped there
//! (touch) before the final frame, so the emphasis shows in the output.

#[cfg(not(target_arch = "wasm32"))]
fn main() {
    use clap::Parser;

    if let Err(e) = native::run(native::Args::parse()) {
        eprintln!("lexicanvas-render: {}", e);
        std::process::exit(1);
    }
}

// The renderer needs a filesystem; on wasm the library is driven by the host.
#[cfg(target_arch = "wasm32")]
fn main() {}

#[cfg(not(target_arch = "wasm32"))]
mod native {
    use std::error::Error;
    use std::time::Duration;

    use clap::{Parser, ValueEnum};

    use lexicanvas::lexi_draw::{PixmapSurface, Point, Size, composite};
    use lexicanvas::loader::is_image_file;
    use lexicanvas::{
        AnnotationOverlay, AnnotationSet, BoxUnits, DeviceKind, FileFetcher, ImageCache,
        LoadOutcome, OverlayConfig, RawInput, SurfaceRect,
    };
    use web_time::Instant;

    /// Longest display edge; larger images are scaled down to fit.
    const MAX_DISPLAY_EDGE: u32 = 1600;
    const FRAME_STEP: Duration = Duration::from_millis(17);
    const MAX_FRAMES: usize = 16;

    /// Pointer device used for the simulated interaction.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
    enum Pointer {
        Mouse,
        Touch,
    }

    impl From<Pointer> for DeviceKind {
        fn from(pointer: Pointer) -> Self {
            match pointer {
                Pointer::Mouse => DeviceKind::Mouse,
                Pointer::Touch => DeviceKind::Touch,
            }
        }
    }

    #[derive(Parser, Debug)]
    #[command(
        name = "lexicanvas-render",
        version,
        about = "Draw an image with its annotations into a PNG"
    )]
    pub struct Args {
        /// Image to annotate
        image: String,

        /// Annotations JSON document
        annotations: String,

        /// Output PNG path
        output: String,

        /// Display-space x of the simulated pointer
        #[arg(requires = "y", allow_negative_numbers = true)]
        x: Option<f32>,

        #[arg(allow_negative_numbers = true)]
        y: Option<f32>,

        /// Device for the simulated pointer
        #[arg(value_enum, requires = "y")]
        device: Option<Pointer>,

        /// Overlay config JSON
        #[arg(long)]
        config: Option<String>,

        /// Boxes in the annotations file are in natural image pixels
        #[arg(long = "pixels")]
        pixel_boxes: bool,
    }

    impl Args {
        fn point(&self) -> Option<(Point, DeviceKind)> {
            let (x, y) = (self.x?, self.y?);
            let device = self.device.map_or(DeviceKind::Mouse, DeviceKind::from);
            Some((Point::new(x, y), device))
        }
    }

    fn load_config(path: Option<&str>) -> Result<OverlayConfig, Box<dyn Error>> {
        match path {
            Some(path) => Ok(OverlayConfig::from_json(&std::fs::read_to_string(path)?)?),
            None => Ok(OverlayConfig::default()),
        }
    }

    fn fit(width: u32, height: u32) -> (u32, u32) {
        let longest = width.max(height);
        if longest <= MAX_DISPLAY_EDGE {
            return (width, height);
        }
        let scale = MAX_DISPLAY_EDGE as f32 / longest as f32;
        (
            ((width as f32 * scale).round() as u32).max(1),
            ((height as f32 * scale).round() as u32).max(1),
        )
    }

    pub fn run(args: Args) -> Result<(), Box<dyn Error>> {
        let config = load_config(args.config.as_deref())?;

        env_logger::Builder::new()
            .filter_level(config.log_level.to_level_filter())
            .parse_default_env()
            .init();

        if !is_image_file(&args.image) {
            log::warn!("{} has no known image extension, trying anyway", args.image);
        }
        let fetcher = FileFetcher::new();
        let mut cache = ImageCache::new(config.image_cache_capacity.max(1));
        let image = cache.get_or_load(&args.image, &fetcher)?;
        let (width, height) = fit(image.width(), image.height());
        log::info!(
            "{}: {}x{} shown at {}x{}",
            args.image,
            image.width(),
            image.height(),
            width,
            height
        );

        let json = std::fs::read_to_string(&args.annotations)?;
        let units = if args.pixel_boxes {
            BoxUnits::Pixels {
                natural: Size::new(image.width() as f32, image.height() as f32),
            }
        } else {
            BoxUnits::Normalized
        };
        let (set, invalid) = AnnotationSet::from_json(&json, units)?;
        for e in &invalid {
            log::warn!("{}", e);
        }

        let mut overlay = AnnotationOverlay::new(
            config,
            PixmapSurface::new(width, height),
            PixmapSurface::new(width, height),
            PixmapSurface::new(width, height),
        )
        .on_hover(|a| match a {
            Some(a) => log::info!("hover: {} ({})", a.label, a.id),
            None => log::info!("hover: none"),
        })
        .on_discover(|a| log::info!("discovered: {} ({})", a.label, a.id))
        .on_image_load_error(|e| log::error!("image failed: {}", e));

        if let LoadOutcome::Failed = overlay.load_image(&args.image, &fetcher, &mut cache) {
            return Err(format!("could not load {}", args.image).into());
        }
        overlay.set_annotation_set(set);

        let mut now = Instant::now();
        if let Some((client, device)) = args.point() {
            let surface = SurfaceRect::new(0.0, 0.0, width as f32, height as f32);
            let events = match device {
                DeviceKind::Touch => vec![
                    RawInput::TouchStart { client },
                    RawInput::TouchEnd { client: Some(client) },
                ],
                _ => vec![RawInput::PointerMove { device, client }],
            };
            for event in events {
                overlay.handle_input(event, &surface, now);
            }
        }

        for _ in 0..MAX_FRAMES {
            let Some(token) = overlay.poll_frame_request() else {
                break;
            };
            let report = overlay.tick(token, now);
            log::debug!("frame: {:?}", report);
            now += FRAME_STEP;
        }

        let pixmap = composite(&overlay.surfaces())?;
        pixmap.save_png(&args.output).map_err(|e| e.to_string())?;
        log::info!("wrote {}", args.output);
        Ok(())
    }

}
