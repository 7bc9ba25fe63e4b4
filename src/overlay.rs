//! The top-level controller.
//!
//! [`AnnotationOverlay`] is the single owner of every mutable structure:
//! viewport, interaction state, hit tester, scheduler and the three layers.
//! Input and load completions mutate state and mark dirty regions
//! synchronously; layers only draw when the host hands a frame token back
//! through [`AnnotationOverlay::tick`].

use std::time::Duration;

use lexi_draw::{ImageHandle, Point, Rect, Size, Surface};
use web_time::Instant;

use crate::annotation::{Annotation, AnnotationId, AnnotationSet};
use crate::config::OverlayConfig;
use crate::error::{ImageLoadError, InvalidAnnotationError};
use crate::hit_test::HitTester;
use crate::image_cache::ImageCache;
use crate::input::{
    DeviceKind, InputAction, InputController, InteractionEvent, RawInput, SurfaceRect, Tolerance,
};
use crate::interaction::InteractionState;
use crate::layers::{
    BaseImage, HoverLayer, InteractiveLayer, Layer, LayerStats, RenderContext, StaticLayer,
    emphasis_extent,
};
use crate::loader::{ImageFetcher, decode_image};
use crate::mapper::CoordinateMapper;
use crate::perf::{PerfReport, PerformanceMonitor};
use crate::scheduler::{FrameToken, LayerId, RenderScheduler};
use crate::theme::Theme;
use crate::viewport::ViewportState;

type HoverCallback = Box<dyn FnMut(Option<&Annotation>)>;
type DiscoverCallback = Box<dyn FnMut(&Annotation)>;
type ErrorCallback = Box<dyn FnMut(&ImageLoadError)>;

#[derive(Default)]
struct Callbacks {
    on_hover: Option<HoverCallback>,
    on_discover: Option<DiscoverCallback>,
    on_image_load_error: Option<ErrorCallback>,
}

/// Identifies one image load. Completing a ticket that is no longer current
/// (a newer load started, or the overlay was disposed) does nothing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    epoch: u64,
    url: String,
}

impl LoadTicket {
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LoadOutcome {
    /// Image decoded; carries its natural size
    Loaded(Size),
    /// The error callback fired and a placeholder will be drawn
    Failed,
    /// The ticket was superseded; nothing changed
    Stale,
}

/// What one frame did.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameReport {
    pub redrawn: Vec<LayerId>,
    pub draw_calls: usize,
    /// Work is still queued; poll for another frame
    pub reschedule: bool,
}

#[derive(Debug, Default)]
struct LoadState {
    epoch: u64,
    pending: Option<String>,
    current: Option<String>,
}

pub struct AnnotationOverlay<S: Surface> {
    config: OverlayConfig,
    theme: Theme,
    annotations: AnnotationSet,
    viewport: ViewportState,
    interaction: InteractionState,
    hits: HitTester,
    input: InputController,
    scheduler: RenderScheduler,
    perf: PerformanceMonitor,
    static_layer: StaticLayer<S>,
    interactive_layer: InteractiveLayer<S>,
    hover_layer: HoverLayer<S>,
    load: LoadState,
    last_frame: Option<Instant>,
    callbacks: Callbacks,
    disposed: bool,
}

impl<S: Surface> AnnotationOverlay<S> {
    /// Build an overlay over three equally sized surfaces, bottom to top.
    pub fn new(
        config: OverlayConfig,
        static_surface: S,
        interactive_surface: S,
        hover_surface: S,
    ) -> Self {
        let (w, h) = static_surface.size();
        let display = Size::new(w as f32, h as f32);

        let mut scheduler = RenderScheduler::new(
            config.merge_ratio,
            config.max_dirty_regions,
            config.hover_debounce(),
        );
        scheduler.set_bounds(Rect::from_size(display));

        Self {
            theme: Theme::default(),
            annotations: AnnotationSet::new(),
            viewport: ViewportState::new(display),
            interaction: InteractionState::new(config.touch_hover_timeout()),
            hits: HitTester::new(
                config.spatial_index,
                config.grid_cell_px,
                Tolerance::from_config(&config),
            ),
            input: InputController::new(config.input_debounce(), config.keybindings.clone()),
            scheduler,
            perf: PerformanceMonitor::new(config.perf_window, config.perf_report_interval()),
            static_layer: StaticLayer::new(static_surface),
            interactive_layer: InteractiveLayer::new(interactive_surface),
            hover_layer: HoverLayer::new(hover_surface),
            load: LoadState::default(),
            last_frame: None,
            callbacks: Callbacks::default(),
            disposed: false,
            config,
        }
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Called on every hover transition, with `None` when hover ends.
    pub fn on_hover(mut self, f: impl FnMut(Option<&Annotation>) + 'static) -> Self {
        self.callbacks.on_hover = Some(Box::new(f));
        self
    }

    /// Called on each deliberate select (click, tap, keyboard activate).
    pub fn on_discover(mut self, f: impl FnMut(&Annotation) + 'static) -> Self {
        self.callbacks.on_discover = Some(Box::new(f));
        self
    }

    pub fn on_image_load_error(mut self, f: impl FnMut(&ImageLoadError) + 'static) -> Self {
        self.callbacks.on_image_load_error = Some(Box::new(f));
        self
    }

    // --- accessors ---

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn annotations(&self) -> &AnnotationSet {
        &self.annotations
    }

    pub fn viewport(&self) -> &ViewportState {
        &self.viewport
    }

    pub fn mapper(&self) -> CoordinateMapper {
        CoordinateMapper::new(&self.viewport)
    }

    pub fn interaction(&self) -> &InteractionState {
        &self.interaction
    }

    pub fn hit_tester(&self) -> &HitTester {
        &self.hits
    }

    pub fn static_layer(&self) -> &StaticLayer<S> {
        &self.static_layer
    }

    pub fn interactive_layer(&self) -> &InteractiveLayer<S> {
        &self.interactive_layer
    }

    pub fn hover_layer(&self) -> &HoverLayer<S> {
        &self.hover_layer
    }

    pub fn layer_stats(&self, layer: LayerId) -> LayerStats {
        match layer {
            LayerId::Static => self.static_layer.stats(),
            LayerId::Interactive => self.interactive_layer.stats(),
            LayerId::Hover => self.hover_layer.stats(),
        }
    }

    /// Surfaces bottom to top, for compositing.
    pub fn surfaces(&self) -> [&S; 3] {
        [
            self.static_layer.surface(),
            self.interactive_layer.surface(),
            self.hover_layer.surface(),
        ]
    }

    pub fn perf_report(&self) -> PerfReport {
        self.perf.report()
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// The annotation under a display point, as the input path would see it.
    pub fn annotation_at(&self, point: Point, device: DeviceKind) -> Option<&Annotation> {
        self.hits
            .hit_test(point, device)
            .and_then(|id| self.annotations.get(id))
    }

    // --- annotation set ---

    /// Replace the annotation set. Invalid records are skipped, logged and
    /// returned. A disposed overlay ignores the call and reports nothing.
    pub fn set_annotations(&mut self, records: Vec<Annotation>) -> Vec<InvalidAnnotationError> {
        if self.disposed {
            return Vec::new();
        }
        let (set, invalid) = AnnotationSet::from_records(records);
        for e in &invalid {
            log::warn!("{}", e);
        }
        self.set_annotation_set(set);
        invalid
    }

    /// Replace the annotation set with one validated elsewhere.
    pub fn set_annotation_set(&mut self, set: AnnotationSet) {
        if self.disposed {
            return;
        }
        log::debug!("annotation set replaced ({} records)", set.len());
        self.annotations = set;
        self.reset_interaction();
        self.rebuild_geometry();
        self.scheduler.mark_full_dirty(LayerId::Interactive);
        self.scheduler.mark_full_dirty(LayerId::Hover);
    }

    // --- image loading ---

    /// Start loading `url`. The current image is dropped immediately.
    pub fn begin_image_load(&mut self, url: &str) -> LoadTicket {
        self.load.epoch += 1;
        let ticket = LoadTicket {
            epoch: self.load.epoch,
            url: url.to_string(),
        };
        if self.disposed {
            return ticket;
        }

        log::info!("loading image {}", url);
        self.load.pending = Some(url.to_string());
        self.load.current = None;
        self.viewport.clear_natural();
        self.static_layer.set_image(BaseImage::Empty);
        self.reset_interaction();
        self.rebuild_geometry();
        for layer in LayerId::ALL {
            self.scheduler.mark_full_dirty(layer);
        }
        ticket
    }

    /// Finish a load with the fetched bytes (or the fetch error).
    pub fn complete_image_load(
        &mut self,
        ticket: &LoadTicket,
        bytes: Result<Vec<u8>, ImageLoadError>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            log::debug!("dropping stale load of {}", ticket.url);
            return LoadOutcome::Stale;
        }
        let decoded = bytes.and_then(|b| decode_image(&ticket.url, &b));
        self.complete_image_load_decoded(ticket, decoded)
    }

    /// Finish a load with an already decoded image.
    pub fn complete_image_load_decoded(
        &mut self,
        ticket: &LoadTicket,
        image: Result<ImageHandle, ImageLoadError>,
    ) -> LoadOutcome {
        if !self.is_current(ticket) {
            log::debug!("dropping stale load of {}", ticket.url);
            return LoadOutcome::Stale;
        }
        self.load.pending = None;

        match image {
            Ok(handle) => {
                let natural = Size::new(handle.width() as f32, handle.height() as f32);
                log::info!(
                    "image {} loaded ({}x{})",
                    ticket.url,
                    handle.width(),
                    handle.height()
                );
                self.load.current = Some(ticket.url.clone());
                self.static_layer.set_image(BaseImage::Loaded(handle));
                self.viewport.set_natural(natural);
                self.rebuild_geometry();
                for layer in LayerId::ALL {
                    self.scheduler.mark_full_dirty(layer);
                }
                LoadOutcome::Loaded(natural)
            }
            Err(e) => {
                log::error!("{}", e);
                self.static_layer.set_image(BaseImage::Failed);
                self.scheduler.mark_full_dirty(LayerId::Static);
                if let Some(cb) = self.callbacks.on_image_load_error.as_mut() {
                    cb(&e);
                }
                LoadOutcome::Failed
            }
        }
    }

    /// Load synchronously through `fetcher`, reusing `cache`.
    pub fn load_image(
        &mut self,
        url: &str,
        fetcher: &dyn ImageFetcher,
        cache: &mut ImageCache,
    ) -> LoadOutcome {
        let ticket = self.begin_image_load(url);
        let result = cache.get_or_load(url, fetcher);
        self.complete_image_load_decoded(&ticket, result)
    }

    /// URL of the image currently shown, if one loaded.
    pub fn current_image(&self) -> Option<&str> {
        self.load.current.as_deref()
    }

    fn is_current(&self, ticket: &LoadTicket) -> bool {
        !self.disposed
            && ticket.epoch == self.load.epoch
            && self.load.pending.as_deref() == Some(ticket.url.as_str())
    }

    // --- viewport and options ---

    /// The container changed size. Surfaces are reallocated and every layer
    /// redraws.
    pub fn resize(&mut self, width: u32, height: u32) {
        let display = Size::new(width as f32, height as f32);
        if self.disposed || display == self.viewport.display() {
            return;
        }
        self.static_layer.resize(width, height);
        self.interactive_layer.resize(width, height);
        self.hover_layer.resize(width, height);
        self.hover_layer.forget_drawn();

        self.viewport.set_display(display);
        self.scheduler.set_bounds(Rect::from_size(display));
        self.rebuild_geometry();
        for layer in LayerId::ALL {
            self.scheduler.mark_full_dirty(layer);
        }
    }

    pub fn set_show_labels(&mut self, show: bool) {
        if self.config.show_labels == show {
            return;
        }
        self.config.show_labels = show;
        self.scheduler.mark_full_dirty(LayerId::Interactive);
    }

    /// Disabling interaction drops hover and focus.
    pub fn set_interactive(&mut self, interactive: bool) {
        if self.config.interactive == interactive {
            return;
        }
        self.config.interactive = interactive;
        if !interactive {
            self.input.reset();
            self.reset_interaction();
            self.scheduler.mark_full_dirty(LayerId::Hover);
        }
    }

    // --- input ---

    /// Feed one host input event. `surface` is the drawing surface's current
    /// client-space layout box.
    pub fn handle_input(&mut self, raw: RawInput, surface: &SurfaceRect, now: Instant) {
        if self.disposed || !self.config.interactive {
            return;
        }
        if let Some(event) = self.input.push(raw, surface, self.viewport.display(), now) {
            self.apply_event(event, now);
        }
    }

    /// Forward a throttled move once it is due.
    pub fn flush_input(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        if let Some(event) = self.input.flush(now) {
            self.apply_event(event, now);
        }
    }

    /// Run time-based transitions: throttled moves and touch hover expiry.
    pub fn poll_timers(&mut self, now: Instant) {
        if self.disposed {
            return;
        }
        self.flush_input(now);
        if let Some(expired) = self.interaction.expire(now) {
            log::debug!("touch hover on {} timed out", expired);
            self.mark_emphasis_dirty(Some(&expired));
            self.fire_hover();
        }
    }

    /// Earliest time `poll_timers` has work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        match (self.input.next_deadline(), self.interaction.next_deadline()) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn apply_event(&mut self, event: InteractionEvent, now: Instant) {
        self.interaction.set_last_device(event.device);
        match event.action {
            InputAction::Move => {
                let hit = self.hit_at(event.point, event.device);
                self.update_hover(hit, event.device, now);
            }
            InputAction::Select => {
                let hit = self.hit_at(event.point, event.device);
                self.update_hover(hit.clone(), event.device, now);
                if let Some(id) = hit {
                    self.discover(&id, now);
                }
            }
            InputAction::Leave => self.update_hover(None, event.device, now),
            InputAction::FocusNext => self.move_focus(true),
            InputAction::FocusPrev => self.move_focus(false),
            InputAction::Activate => {
                if let Some(id) = self.interaction.focused_id().cloned() {
                    self.discover(&id, now);
                }
            }
            InputAction::ClearFocus => self.set_focus(None),
        }
    }

    fn hit_at(&self, point: Option<Point>, device: DeviceKind) -> Option<AnnotationId> {
        point.and_then(|p| self.hits.hit_test(p, device).cloned())
    }

    fn update_hover(&mut self, id: Option<AnnotationId>, device: DeviceKind, now: Instant) {
        let previous = self.interaction.hovered_id().cloned();
        if !self.interaction.set_hover(id, device, now) {
            return;
        }
        self.mark_emphasis_dirty(previous.as_ref());
        let current = self.interaction.hovered_id().cloned();
        self.mark_emphasis_dirty(current.as_ref());
        self.fire_hover();
    }

    fn discover(&mut self, id: &AnnotationId, now: Instant) {
        if self.interaction.mark_discovered(id, now) {
            self.mark_emphasis_dirty(Some(id));
        }
        if let Some(annotation) = self.annotations.get(id) {
            log::debug!("discovered {} ({})", id, annotation.label);
            if let Some(cb) = self.callbacks.on_discover.as_mut() {
                cb(annotation);
            }
        }
    }

    /// Cycle keyboard focus through the visible annotations in list order.
    fn move_focus(&mut self, forward: bool) {
        let placed = self.hits.placed();
        if placed.is_empty() {
            return;
        }
        let current = self
            .interaction
            .focused_id()
            .and_then(|id| placed.iter().position(|p| &p.id == id));
        let len = placed.len();
        let next = match (current, forward) {
            (Some(i), true) => (i + 1) % len,
            (Some(i), false) => (i + len - 1) % len,
            (None, true) => 0,
            (None, false) => len - 1,
        };
        let id = placed[next].id.clone();
        self.set_focus(Some(id));
    }

    fn set_focus(&mut self, id: Option<AnnotationId>) {
        let previous = self.interaction.focused_id().cloned();
        if self.interaction.set_focus(id) {
            self.mark_emphasis_dirty(previous.as_ref());
            let current = self.interaction.focused_id().cloned();
            self.mark_emphasis_dirty(current.as_ref());
        }
    }

    fn mark_emphasis_dirty(&mut self, id: Option<&AnnotationId>) {
        let Some(id) = id else {
            return;
        };
        let bounds = Rect::from_size(self.viewport.display());
        let extent = self.hits.rect_of(id).and_then(|rect| {
            self.annotations
                .get(id)
                .map(|a| emphasis_extent(rect, a, &self.theme, bounds))
        });
        match extent {
            Some(extent) => self.scheduler.mark_dirty(LayerId::Hover, extent),
            None => self.scheduler.request_frame(LayerId::Hover),
        }
    }

    fn fire_hover(&mut self) {
        let annotation = self
            .interaction
            .hovered_id()
            .and_then(|id| self.annotations.get(id));
        if let Some(cb) = self.callbacks.on_hover.as_mut() {
            cb(annotation);
        }
    }

    fn reset_interaction(&mut self) {
        let was_hovering = self.interaction.hovered_id().is_some();
        self.interaction.reset();
        self.input.reset();
        if was_hovering {
            self.fire_hover();
        }
    }

    fn rebuild_geometry(&mut self) {
        let mapper = CoordinateMapper::new(&self.viewport);
        self.hits.rebuild(&self.annotations, &mapper);
    }

    // --- frames ---

    /// Token for the next frame, if one is needed and not yet handed out.
    pub fn poll_frame_request(&mut self) -> Option<FrameToken> {
        self.scheduler.poll_frame_request()
    }

    /// Redraw what the frame for `token` covers. Returns `None` for stale
    /// tokens, including any that fire after `dispose`.
    pub fn tick(&mut self, token: FrameToken, now: Instant) -> Option<FrameReport> {
        if self.disposed {
            return None;
        }
        let plan = self.scheduler.begin_frame(token, now)?;

        let ctx = RenderContext {
            annotations: &self.annotations,
            placed: self.hits.placed(),
            interaction: &self.interaction,
            theme: &self.theme,
            show_labels: self.config.show_labels,
            display: self.viewport.display(),
        };

        let mut redrawn = Vec::new();
        let mut draw_calls = 0;
        for layer in plan.layers() {
            let regions = plan.regions(layer);
            draw_calls += match layer {
                LayerId::Static => self.static_layer.redraw(regions, &ctx),
                LayerId::Interactive => self.interactive_layer.redraw(regions, &ctx),
                LayerId::Hover => self.hover_layer.redraw(regions, &ctx),
            };
            redrawn.push(layer);
        }

        let interval = self
            .last_frame
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_frame = Some(now);
        self.perf
            .record_frame(draw_calls, interval.as_secs_f32() * 1000.0);
        if self.perf.should_report(now) {
            let r = self.perf.report();
            log::debug!(
                "overlay perf: {:.1} fps (avg {:.1}), {:.1} draw calls/frame over {} frames",
                r.current_fps,
                r.average_fps,
                r.average_draw_calls,
                r.frames
            );
        }

        Some(FrameReport {
            redrawn,
            draw_calls,
            reschedule: self.scheduler.has_frame_request(),
        })
    }

    /// Tear down. Pending frames and loads become no-ops; no callback fires
    /// afterwards.
    pub fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        log::debug!("overlay disposed");
        self.disposed = true;
        self.scheduler.dispose();
        self.load.epoch += 1;
        self.load.pending = None;
        self.input.reset();
        self.interaction.reset();
        self.hits.clear();
        self.perf.reset();
        self.callbacks = Callbacks::default();
    }
}
