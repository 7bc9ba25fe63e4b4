//! Frame timing and draw-call statistics.
//!
//! Nothing here feeds back into rendering. Degenerate inputs (no samples,
//! zero durations) report zero rather than failing.

use std::collections::VecDeque;
use std::time::Duration;

use web_time::Instant;

#[derive(Debug, Clone, Copy, PartialEq)]
struct FrameSample {
    draw_calls: usize,
    duration_ms: f32,
}

/// Snapshot handed to diagnostics.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PerfReport {
    pub current_fps: f32,
    pub average_fps: f32,
    pub average_draw_calls: f32,
    /// Samples in the window
    pub frames: usize,
}

#[derive(Debug)]
pub struct PerformanceMonitor {
    samples: VecDeque<FrameSample>,
    window: usize,
    report_interval: Duration,
    last_report: Option<Instant>,
}

impl PerformanceMonitor {
    pub fn new(window: usize, report_interval: Duration) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
            report_interval,
            last_report: None,
        }
    }

    /// Record one frame: draw calls issued and time since the previous frame.
    pub fn record_frame(&mut self, draw_calls: usize, duration_ms: f32) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(FrameSample {
            draw_calls,
            duration_ms,
        });
    }

    /// FPS implied by the latest frame.
    pub fn current_fps(&self) -> f32 {
        match self.samples.back() {
            Some(s) if s.duration_ms.is_finite() && s.duration_ms > 0.0 => 1000.0 / s.duration_ms,
            _ => 0.0,
        }
    }

    /// FPS over the rolling window.
    pub fn average_fps(&self) -> f32 {
        let (count, total) = self
            .samples
            .iter()
            .map(|s| s.duration_ms)
            .filter(|d| d.is_finite() && *d > 0.0)
            .fold((0usize, 0.0f32), |(n, sum), d| (n + 1, sum + d));
        if count == 0 {
            return 0.0;
        }
        count as f32 * 1000.0 / total
    }

    pub fn average_draw_calls(&self) -> f32 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let total: usize = self.samples.iter().map(|s| s.draw_calls).sum();
        total as f32 / self.samples.len() as f32
    }

    pub fn frames(&self) -> usize {
        self.samples.len()
    }

    /// True at most once per report interval.
    pub fn should_report(&mut self, now: Instant) -> bool {
        let due = self
            .last_report
            .is_none_or(|last| now.saturating_duration_since(last) >= self.report_interval);
        if due {
            self.last_report = Some(now);
        }
        due
    }

    pub fn report(&self) -> PerfReport {
        PerfReport {
            current_fps: self.current_fps(),
            average_fps: self.average_fps(),
            average_draw_calls: self.average_draw_calls(),
            frames: self.frames(),
        }
    }

    pub fn reset(&mut self) {
        self.samples.clear();
        self.last_report = None;
    }
}
