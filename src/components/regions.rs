use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::{AlphaBuffer, PixelRect};

// ============================================================================
// REGIONS – tracked rectangles over the overlay
// ============================================================================

/// What clearing a region does to the session.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum RegionEffect {
    /// Scorable icon: apply a score delta through the multiplier path.
    Score { points: i32 },
    /// Time trigger: apply a timer delta (clamped to the timer cap).
    Timer { delta: f32 },
    /// Reveal interlude: pause the session for `pause_ticks` ticks, then
    /// award `points`. An eligible ignore flag skips the pause entirely.
    Reveal { points: i32, pause_ticks: u32 },
    /// Hazard: request immediate session resolution.
    EndGame,
}

/// A tracked rectangular sub-area of the buffer tied to a scorable entity.
#[derive(Clone, Debug)]
pub struct Region {
    pub id: Uuid,
    pub name: String,
    pub rect: PixelRect,
    pub effect: RegionEffect,
    cleared: bool,
}

impl Region {
    pub fn new(name: impl Into<String>, rect: PixelRect, effect: RegionEffect) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            rect,
            effect,
            cleared: false,
        }
    }

    /// One-way flag: set by the tracker on first threshold crossing,
    /// never reset.
    pub fn is_cleared(&self) -> bool {
        self.cleared
    }
}

// ============================================================================
// CLEARANCE TRACKER
// ============================================================================

/// Owns the region set and decides, per buffer change, which regions have
/// been sufficiently revealed.
///
/// Each region fires exactly once for the life of the session: once
/// `cleared` is set, later stamps skip it, so the caller can treat every
/// returned index as a fresh notification.
pub struct RegionClearanceTracker {
    regions: Vec<Region>,
    alpha_threshold: f32,
    required_ratio: f32,
}

impl RegionClearanceTracker {
    pub fn new(regions: Vec<Region>, alpha_threshold: f32, required_ratio: f32) -> Self {
        Self {
            regions,
            alpha_threshold: alpha_threshold.clamp(0.0, 1.0),
            required_ratio: required_ratio.clamp(0.0, 1.0),
        }
    }

    /// Recheck regions touched by `dirty` against the buffer and return the
    /// indices of regions that crossed the clearance threshold just now.
    ///
    /// The bounding-box overlap test prunes the scan: a stamp far from a
    /// region costs nothing for it. Zero-area rects never clear (the ratio
    /// denominator would be meaningless), they are skipped outright.
    pub fn on_buffer_changed(&mut self, buffer: &AlphaBuffer, dirty: PixelRect) -> Vec<usize> {
        let mut newly_cleared = Vec::new();

        for (idx, region) in self.regions.iter_mut().enumerate() {
            if region.cleared {
                continue;
            }
            if !region.rect.overlaps(&dirty) {
                continue;
            }
            let total = region.rect.area();
            if total == 0 {
                continue;
            }

            let cleared = buffer.count_at_or_below(&region.rect, self.alpha_threshold);
            let ratio = cleared as f32 / total as f32;
            if ratio >= self.required_ratio {
                region.cleared = true;
                newly_cleared.push(idx);
            }
        }

        newly_cleared
    }

    pub fn region(&self, idx: usize) -> Option<&Region> {
        self.regions.get(idx)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn total_count(&self) -> usize {
        self.regions.len()
    }

    pub fn cleared_count(&self) -> usize {
        self.regions.iter().filter(|r| r.cleared).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::brush::BrushKernel;

    fn single_pixel_kernel() -> BrushKernel {
        BrushKernel::from_weights(1, 1, vec![1.0]).unwrap()
    }

    /// 4×4 region, threshold 0.1, ratio 0.75: 11 erased pixels stay short,
    /// the 12th crosses, and the notification fires exactly once.
    #[test]
    fn test_clearance_threshold_crossing() {
        let mut buf = AlphaBuffer::opaque(8, 8);
        let region = Region::new("icon", PixelRect::new(0, 0, 3, 3), RegionEffect::Score { points: 5 });
        let mut tracker = RegionClearanceTracker::new(vec![region], 0.1, 0.75);
        let kernel = single_pixel_kernel();

        // Erase 11 of the 16 pixels, one stamp each.
        let cells: Vec<(i32, i32)> = (0..4)
            .flat_map(|y| (0..4).map(move |x| (x, y)))
            .take(11)
            .collect();
        for (x, y) in cells {
            let dirty = buf.stamp(x, y, &kernel).unwrap();
            let fired = tracker.on_buffer_changed(&buf, dirty);
            assert!(fired.is_empty(), "11/16 is below the 0.75 ratio");
        }

        // The 12th pixel crosses 0.75.
        let dirty = buf.stamp(3, 2, &kernel).unwrap();
        let fired = tracker.on_buffer_changed(&buf, dirty);
        assert_eq!(fired, vec![0]);
        assert!(tracker.region(0).unwrap().is_cleared());

        // Further stamps over the region never re-fire.
        let dirty = buf.stamp(3, 3, &kernel).unwrap();
        assert!(tracker.on_buffer_changed(&buf, dirty).is_empty());
    }

    #[test]
    fn test_clearance_is_one_way() {
        let mut buf = AlphaBuffer::opaque(4, 4);
        let region = Region::new("r", PixelRect::new(0, 0, 1, 1), RegionEffect::EndGame);
        let mut tracker = RegionClearanceTracker::new(vec![region], 0.1, 0.5);
        let kernel = BrushKernel::from_weights(4, 4, vec![1.0; 16]).unwrap();

        let dirty = buf.stamp(1, 1, &kernel).unwrap();
        assert_eq!(tracker.on_buffer_changed(&buf, dirty).len(), 1);
        for _ in 0..5 {
            if let Some(dirty) = buf.stamp(1, 1, &kernel) {
                tracker.on_buffer_changed(&buf, dirty);
            }
            assert!(tracker.region(0).unwrap().is_cleared());
        }
    }

    #[test]
    fn test_non_overlapping_region_untouched() {
        let mut buf = AlphaBuffer::opaque(16, 16);
        let far = Region::new("far", PixelRect::new(12, 12, 15, 15), RegionEffect::Score { points: 1 });
        let mut tracker = RegionClearanceTracker::new(vec![far], 0.1, 0.1);
        let kernel = single_pixel_kernel();

        let dirty = buf.stamp(0, 0, &kernel).unwrap();
        assert!(tracker.on_buffer_changed(&buf, dirty).is_empty());
        assert!(!tracker.region(0).unwrap().is_cleared());
    }

    #[test]
    fn test_ratio_counts_full_area_for_edge_hanging_rect() {
        // Rect hangs off an 4-wide buffer: only 2 of its 4 columns exist.
        let mut buf = AlphaBuffer::opaque(4, 4);
        let hanging = Region::new("h", PixelRect::new(2, 0, 5, 0), RegionEffect::Score { points: 1 });
        let mut tracker = RegionClearanceTracker::new(vec![hanging], 0.1, 0.75);
        let kernel = BrushKernel::from_weights(4, 1, vec![1.0; 4]).unwrap();

        // Erase the two in-bounds pixels. 2/4 of the nominal area is below
        // the 0.75 ratio, so the region cannot clear.
        let dirty = buf.stamp(3, 0, &kernel).unwrap();
        assert!(tracker.on_buffer_changed(&buf, dirty).is_empty());
    }
}
