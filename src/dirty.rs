//! Dirty region tracking for incremental layer redraws.

use lexi_draw::Rect;

/// One unit of redraw work.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DirtyRegion {
    /// The whole surface
    Full,
    /// A display-space rectangle
    Rect(Rect),
}

impl DirtyRegion {
    pub fn intersects(&self, rect: &Rect) -> bool {
        match self {
            DirtyRegion::Full => true,
            DirtyRegion::Rect(r) => r.intersects(rect),
        }
    }

    /// The rectangle this region covers on a surface of `bounds`.
    pub fn to_rect(self, bounds: Rect) -> Rect {
        match self {
            DirtyRegion::Full => bounds,
            DirtyRegion::Rect(r) => r,
        }
    }
}

/// Accumulates invalidated rectangles between redraw passes.
#[derive(Debug, Clone)]
pub struct DirtyRegionTracker {
    regions: Vec<Rect>,
    full: bool,
    /// Surface bounds; marked rects are clipped to these
    bounds: Option<Rect>,
    merge_ratio: f32,
    max_regions: usize,
}

impl Default for DirtyRegionTracker {
    fn default() -> Self {
        Self::new(1.5, 32)
    }
}

impl DirtyRegionTracker {
    pub fn new(merge_ratio: f32, max_regions: usize) -> Self {
        Self {
            regions: Vec::new(),
            full: false,
            bounds: None,
            merge_ratio,
            max_regions: max_regions.max(1),
        }
    }

    pub fn set_bounds(&mut self, bounds: Rect) {
        self.bounds = Some(bounds);
    }

    /// Record a rectangle to redraw.
    pub fn mark_dirty(&mut self, rect: Rect) {
        if self.full {
            return;
        }
        let rect = match self.bounds {
            Some(bounds) => match rect.intersection(&bounds) {
                Some(clipped) => clipped,
                None => return,
            },
            None if rect.is_empty() => return,
            None => rect,
        };
        self.regions.push(rect);
    }

    /// Record the whole surface. Subsumes every rect until the next drain.
    pub fn mark_full_dirty(&mut self) {
        self.full = true;
        self.regions.clear();
    }

    pub fn is_dirty(&self) -> bool {
        self.full || !self.regions.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.full
    }

    pub fn pending(&self) -> usize {
        if self.full { 1 } else { self.regions.len() }
    }

    /// Merge pending rects whose union costs at most `merge_ratio` times
    /// their combined area.
    ///
    /// Greedy: rects are sorted by origin and the first mergeable pair is
    /// collapsed, then the scan restarts. Falls back to a full redraw when
    /// more than `max_regions` rects survive.
    pub fn optimize(&mut self) {
        if self.full || self.regions.len() < 2 {
            return;
        }

        self.regions.sort_by(|a, b| a.x.total_cmp(&b.x).then(a.y.total_cmp(&b.y)));

        'restart: loop {
            for i in 0..self.regions.len() {
                for j in (i + 1)..self.regions.len() {
                    let (a, b) = (self.regions[i], self.regions[j]);
                    let union = a.union(&b);
                    if union.area() <= self.merge_ratio * (a.area() + b.area()) {
                        self.regions[i] = union;
                        self.regions.remove(j);
                        continue 'restart;
                    }
                }
            }
            break;
        }

        if self.regions.len() > self.max_regions {
            log::trace!(
                "{} dirty regions exceed limit {}, redrawing full surface",
                self.regions.len(),
                self.max_regions
            );
            self.mark_full_dirty();
        }
    }

    /// Optimize, then hand out and clear the pending regions.
    pub fn drain(&mut self) -> Vec<DirtyRegion> {
        self.optimize();
        let out = if self.full {
            vec![DirtyRegion::Full]
        } else {
            self.regions.drain(..).map(DirtyRegion::Rect).collect()
        };
        self.clear();
        out
    }

    /// Drop pending work without redrawing.
    pub fn clear(&mut self) {
        self.regions.clear();
        self.full = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_dirty_idempotent() {
        let mut t = DirtyRegionTracker::default();
        t.mark_dirty(Rect::new(0.0, 0.0, 10.0, 10.0));
        for _ in 0..5 {
            t.mark_full_dirty();
        }
        t.mark_dirty(Rect::new(20.0, 20.0, 10.0, 10.0));
        assert_eq!(t.drain(), vec![DirtyRegion::Full]);
        assert!(!t.is_dirty());
        assert!(t.drain().is_empty());
    }

    #[test]
    fn test_overlapping_rects_merge() {
        let mut t = DirtyRegionTracker::default();
        t.mark_dirty(Rect::new(0.0, 0.0, 10.0, 10.0));
        t.mark_dirty(Rect::new(5.0, 0.0, 10.0, 10.0));
        // union 150 <= 1.5 * 200
        assert_eq!(
            t.drain(),
            vec![DirtyRegion::Rect(Rect::new(0.0, 0.0, 15.0, 10.0))]
        );
    }

    #[test]
    fn test_distant_rects_stay_separate() {
        let mut t = DirtyRegionTracker::default();
        t.mark_dirty(Rect::new(100.0, 100.0, 10.0, 10.0));
        t.mark_dirty(Rect::new(0.0, 0.0, 10.0, 10.0));
        let regions = t.drain();
        assert_eq!(regions.len(), 2);
        // sorted by origin
        assert_eq!(regions[0], DirtyRegion::Rect(Rect::new(0.0, 0.0, 10.0, 10.0)));
    }

    #[test]
    fn test_chain_merges_after_restart() {
        let mut t = DirtyRegionTracker::default();
        t.mark_dirty(Rect::new(0.0, 0.0, 10.0, 10.0));
        t.mark_dirty(Rect::new(40.0, 0.0, 10.0, 10.0));
        t.mark_dirty(Rect::new(10.0, 0.0, 30.0, 10.0));
        assert_eq!(
            t.drain(),
            vec![DirtyRegion::Rect(Rect::new(0.0, 0.0, 50.0, 10.0))]
        );
    }

    #[test]
    fn test_rects_clipped_to_bounds() {
        let mut t = DirtyRegionTracker::default();
        t.set_bounds(Rect::new(0.0, 0.0, 100.0, 100.0));
        t.mark_dirty(Rect::new(90.0, 90.0, 20.0, 20.0));
        t.mark_dirty(Rect::new(200.0, 200.0, 5.0, 5.0));
        t.mark_dirty(Rect::new(10.0, 10.0, 0.0, 5.0));
        assert_eq!(
            t.drain(),
            vec![DirtyRegion::Rect(Rect::new(90.0, 90.0, 10.0, 10.0))]
        );
    }

    #[test]
    fn test_too_many_regions_fall_back_to_full() {
        let mut t = DirtyRegionTracker::new(1.0, 3);
        for i in 0..5 {
            t.mark_dirty(Rect::new(i as f32 * 100.0, 0.0, 10.0, 10.0));
        }
        assert_eq!(t.drain(), vec![DirtyRegion::Full]);
    }
}
