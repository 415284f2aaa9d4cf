use serde::{Deserialize, Serialize};

// ============================================================================
// COORDINATE MAPPING – overlay layout space → buffer pixel space
// ============================================================================

/// The overlay's rectangle in its own layout space. Pointer samples arrive
/// in this space.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct OverlayRect {
    pub min_x: f32,
    pub min_y: f32,
    pub width: f32,
    pub height: f32,
}

/// The sub-rectangle of texture space the overlay displays. The buffer may
/// back only part of a larger texture, so `u`/`v` give the origin and
/// `width`/`height` the extent, all in `[0, 1]` texture units.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct UvRect {
    pub u: f32,
    pub v: f32,
    pub width: f32,
    pub height: f32,
}

impl Default for UvRect {
    /// The whole texture.
    fn default() -> Self {
        Self { u: 0.0, v: 0.0, width: 1.0, height: 1.0 }
    }
}

/// Converts a pointer position in overlay layout space into integer buffer
/// pixel coordinates, or rejects it.
///
/// Rejection happens twice, before any clamping: once when the normalized
/// position leaves the overlay rectangle, and once when the mapped UV
/// leaves `[0, 1]` (the overlay may display only a sub-rectangle of the
/// texture). Clamping to valid indices is a final formality for samples
/// that already passed both checks, never a way to drag outside samples
/// back in.
#[derive(Clone, Copy, Debug)]
pub struct CoordinateMapper {
    overlay: OverlayRect,
    uv: UvRect,
    buffer_width: u32,
    buffer_height: u32,
}

impl CoordinateMapper {
    pub fn new(overlay: OverlayRect, uv: UvRect, buffer_width: u32, buffer_height: u32) -> Self {
        Self { overlay, uv, buffer_width, buffer_height }
    }

    /// Map `(x, y)` in overlay layout space to buffer pixel coordinates.
    /// `None` means the sample is off the overlay or off the displayed
    /// texture region; no erosion should happen.
    pub fn map(&self, x: f32, y: f32) -> Option<(u32, u32)> {
        if self.overlay.width <= 0.0 || self.overlay.height <= 0.0 {
            return None;
        }

        let norm_x = (x - self.overlay.min_x) / self.overlay.width;
        let norm_y = (y - self.overlay.min_y) / self.overlay.height;
        if !(0.0..=1.0).contains(&norm_x) || !(0.0..=1.0).contains(&norm_y) {
            return None;
        }

        let u = self.uv.u + norm_x * self.uv.width;
        let v = self.uv.v + norm_y * self.uv.height;
        if !(0.0..=1.0).contains(&u) || !(0.0..=1.0).contains(&v) {
            return None;
        }

        let px = (u * self.buffer_width as f32).floor() as i64;
        let py = (v * self.buffer_height as f32).floor() as i64;

        // u == 1.0 floors to `width`; clamp it onto the last pixel.
        let px = px.clamp(0, self.buffer_width.saturating_sub(1) as i64) as u32;
        let py = py.clamp(0, self.buffer_height.saturating_sub(1) as i64) as u32;
        Some((px, py))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mapper() -> CoordinateMapper {
        CoordinateMapper::new(
            OverlayRect { min_x: -50.0, min_y: -50.0, width: 100.0, height: 100.0 },
            UvRect::default(),
            64,
            64,
        )
    }

    #[test]
    fn test_maps_center_and_corners() {
        let m = mapper();
        assert_eq!(m.map(0.0, 0.0), Some((32, 32)));
        assert_eq!(m.map(-50.0, -50.0), Some((0, 0)));
        // The far corner normalizes to exactly 1.0 and clamps onto the
        // last pixel instead of falling off the grid.
        assert_eq!(m.map(50.0, 50.0), Some((63, 63)));
    }

    #[test]
    fn test_rejects_outside_overlay() {
        let m = mapper();
        assert_eq!(m.map(-50.1, 0.0), None);
        assert_eq!(m.map(0.0, 51.0), None);
        assert_eq!(m.map(1000.0, 1000.0), None);
    }

    #[test]
    fn test_uv_subrect_offsets_and_rejects() {
        // Overlay shows the right half of the texture.
        let m = CoordinateMapper::new(
            OverlayRect { min_x: 0.0, min_y: 0.0, width: 10.0, height: 10.0 },
            UvRect { u: 0.5, v: 0.0, width: 0.5, height: 1.0 },
            64,
            64,
        );
        assert_eq!(m.map(0.0, 0.0), Some((32, 0)));
        assert_eq!(m.map(5.0, 5.0), Some((48, 32)));

        // A sub-rectangle reaching past texture space rejects rather than
        // clamping into it.
        let m = CoordinateMapper::new(
            OverlayRect { min_x: 0.0, min_y: 0.0, width: 10.0, height: 10.0 },
            UvRect { u: 0.75, v: 0.0, width: 0.5, height: 1.0 },
            64,
            64,
        );
        assert!(m.map(9.0, 5.0).is_none(), "u would exceed 1.0");
        assert!(m.map(1.0, 5.0).is_some());
    }

    #[test]
    fn test_degenerate_overlay_rejects_everything() {
        let m = CoordinateMapper::new(
            OverlayRect { min_x: 0.0, min_y: 0.0, width: 0.0, height: 10.0 },
            UvRect::default(),
            64,
            64,
        );
        assert_eq!(m.map(0.0, 5.0), None);
    }
}
