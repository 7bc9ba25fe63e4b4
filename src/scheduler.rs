//! Deciding when each layer redraws.
//!
//! The scheduler never calls into the host. It raises a frame request, the
//! host picks it up with [`RenderScheduler::poll_frame_request`], waits for
//! its next display refresh (`requestAnimationFrame` in a browser) and hands
//! the token back through [`RenderScheduler::begin_frame`]. Tokens carry the
//! scheduler epoch, so a callback that fires after `dispose` finds a stale
//! epoch and does nothing.

use std::time::Duration;

use lexi_draw::Rect;
use web_time::Instant;

use crate::dirty::{DirtyRegion, DirtyRegionTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LayerId {
    /// Base image
    Static,
    /// Annotation boxes and labels
    Interactive,
    /// Hover and focus emphasis
    Hover,
}

impl LayerId {
    pub const ALL: [LayerId; 3] = [LayerId::Static, LayerId::Interactive, LayerId::Hover];

    fn index(self) -> usize {
        match self {
            LayerId::Static => 0,
            LayerId::Interactive => 1,
            LayerId::Hover => 2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            LayerId::Static => "static",
            LayerId::Interactive => "interactive",
            LayerId::Hover => "hover",
        }
    }
}

/// Handle for one scheduled frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameToken {
    epoch: u64,
    serial: u64,
}

/// Regions each layer must redraw this frame.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FramePlan {
    regions: [Vec<DirtyRegion>; 3],
}

impl FramePlan {
    pub fn regions(&self, layer: LayerId) -> &[DirtyRegion] {
        &self.regions[layer.index()]
    }

    pub fn is_empty(&self) -> bool {
        self.regions.iter().all(Vec::is_empty)
    }

    /// Layers with work, bottom to top.
    pub fn layers(&self) -> impl Iterator<Item = LayerId> + '_ {
        LayerId::ALL
            .into_iter()
            .filter(|l| !self.regions[l.index()].is_empty())
    }
}

pub struct RenderScheduler {
    trackers: [DirtyRegionTracker; 3],
    /// Layers asked to redraw without a specific region
    requested: [bool; 3],
    epoch: u64,
    serial: u64,
    frame_requested: bool,
    token_issued: bool,
    hover_debounce: Duration,
    last_hover_redraw: Option<Instant>,
    disposed: bool,
}

impl RenderScheduler {
    pub fn new(merge_ratio: f32, max_regions: usize, hover_debounce: Duration) -> Self {
        let tracker = DirtyRegionTracker::new(merge_ratio, max_regions);
        Self {
            trackers: [tracker.clone(), tracker.clone(), tracker],
            requested: [false; 3],
            epoch: 0,
            serial: 0,
            frame_requested: false,
            token_issued: false,
            hover_debounce,
            last_hover_redraw: None,
            disposed: false,
        }
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        for tracker in &mut self.trackers {
            tracker.set_bounds(bounds);
        }
    }

    /// Ask for `layer` to redraw on the next frame. Repeated requests before
    /// that frame collapse into one redraw.
    pub fn request_frame(&mut self, layer: LayerId) {
        if self.disposed {
            return;
        }
        self.requested[layer.index()] = true;
        self.frame_requested = true;
    }

    pub fn mark_dirty(&mut self, layer: LayerId, rect: Rect) {
        if self.disposed {
            return;
        }
        self.trackers[layer.index()].mark_dirty(rect);
        self.request_frame(layer);
    }

    pub fn mark_full_dirty(&mut self, layer: LayerId) {
        if self.disposed {
            return;
        }
        self.trackers[layer.index()].mark_full_dirty();
        self.request_frame(layer);
    }

    pub fn is_pending(&self, layer: LayerId) -> bool {
        self.requested[layer.index()] || self.trackers[layer.index()].is_dirty()
    }

    pub fn has_frame_request(&self) -> bool {
        self.frame_requested
    }

    /// Hand out a token for the outstanding frame, at most once per frame.
    pub fn poll_frame_request(&mut self) -> Option<FrameToken> {
        if self.disposed || !self.frame_requested || self.token_issued {
            return None;
        }
        self.token_issued = true;
        Some(FrameToken {
            epoch: self.epoch,
            serial: self.serial,
        })
    }

    /// Drain the dirty trackers for the frame `token` stands for.
    ///
    /// Returns `None` for tokens from before `dispose` or superseded tokens.
    /// A hover redraw inside the debounce interval stays queued and raises a
    /// new frame request instead.
    pub fn begin_frame(&mut self, token: FrameToken, now: Instant) -> Option<FramePlan> {
        if self.disposed || token.epoch != self.epoch || token.serial != self.serial {
            log::debug!("ignoring stale frame token {:?}", token);
            return None;
        }
        self.serial += 1;
        self.token_issued = false;
        self.frame_requested = false;

        let mut plan = FramePlan::default();
        for layer in LayerId::ALL {
            if !self.is_pending(layer) {
                continue;
            }
            if layer == LayerId::Hover && self.hover_held_back(now) {
                self.frame_requested = true;
                continue;
            }

            let i = layer.index();
            let mut regions = self.trackers[i].drain();
            if regions.is_empty() {
                regions.push(DirtyRegion::Full);
            }
            self.requested[i] = false;
            if layer == LayerId::Hover {
                self.last_hover_redraw = Some(now);
            }
            plan.regions[i] = regions;
        }
        Some(plan)
    }

    fn hover_held_back(&self, now: Instant) -> bool {
        self.last_hover_redraw
            .is_some_and(|last| now.saturating_duration_since(last) < self.hover_debounce)
    }

    /// Cancel everything. Outstanding tokens become stale.
    pub fn dispose(&mut self) {
        self.disposed = true;
        self.epoch += 1;
        self.frame_requested = false;
        self.token_issued = false;
        self.requested = [false; 3];
        for tracker in &mut self.trackers {
            tracker.clear();
        }
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }
}
