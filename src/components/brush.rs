use image::GrayImage;

// ============================================================================
// BRUSH KERNEL – fixed 2D stamp of per-pixel erosion strengths
// ============================================================================

/// Immutable grid of erosion strengths in `[0, 1]`, centered on the stamp
/// point. Strength `1.0` erases a cell outright, `0.0` leaves it untouched.
///
/// Kernels come from two places: the procedural circle (diameter, hardness)
/// or a grayscale tip image rescaled to a target diameter.
#[derive(Clone, Debug)]
pub struct BrushKernel {
    width: u32,
    height: u32,
    weights: Vec<f32>,
}

impl BrushKernel {
    /// Build from raw weights. `None` when the dimensions don't match the
    /// weight count or the kernel is empty.
    pub fn from_weights(width: u32, height: u32, weights: Vec<f32>) -> Option<Self> {
        if width == 0 || height == 0 || weights.len() != (width * height) as usize {
            return None;
        }
        let weights = weights.into_iter().map(|w| w.clamp(0.0, 1.0)).collect();
        Some(Self { width, height, weights })
    }

    /// Procedural circular kernel.
    ///
    /// `hardness` shapes the edge falloff: 1.0 is a hard-edged disc, lower
    /// values feather the rim with a smoothstep fade. `strength` scales the
    /// whole kernel (peak erosion per stamp). Hardness is remapped so the
    /// bottom of the slider is airbrush-soft instead of collapsing to zero,
    /// and tiny brushes get an extended fade ring so they never alias down
    /// to a single harsh pixel.
    pub fn circle(diameter: u32, hardness: f32, strength: f32) -> Self {
        let diameter = diameter.max(1);
        let radius = diameter as f32 / 2.0;
        let strength = strength.clamp(0.0, 1.0);

        let remapped_hardness = 0.02 + hardness.clamp(0.0, 1.0) * 0.98;
        let safe_hardness = remapped_hardness.clamp(0.0, 0.99);

        // Small kernels need at least ~1.5px of fade to avoid a blocky rim.
        let (effective_radius, fade_width) = if radius < 3.0 {
            let aa_extend = 1.5;
            (radius + aa_extend, aa_extend + radius * (1.0 - safe_hardness))
        } else {
            (radius, (radius * (1.0 - safe_hardness)).max(1.0))
        };
        let solid_radius = effective_radius - fade_width;

        // The grid must cover the extended fade ring.
        let size = (effective_radius * 2.0).ceil() as u32;
        let center = size as f32 / 2.0;

        let mut weights = vec![0.0; (size * size) as usize];
        for y in 0..size {
            for x in 0..size {
                let dx = x as f32 + 0.5 - center;
                let dy = y as f32 + 0.5 - center;
                let dist = (dx * dx + dy * dy).sqrt();
                let alpha = if dist <= solid_radius {
                    1.0
                } else if dist >= effective_radius {
                    0.0
                } else {
                    // Smoothstep from 1 at the solid rim to 0 at the edge.
                    let t = (dist - solid_radius) / fade_width;
                    let x = 1.0 - t.clamp(0.0, 1.0);
                    x * x * (3.0 - 2.0 * x)
                };
                weights[(y * size + x) as usize] = alpha * strength;
            }
        }

        Self { width: size, height: size, weights }
    }

    /// Kernel from a grayscale tip image: luma 255 is full strength.
    /// The image is used at its native size; call [`BrushKernel::scaled`]
    /// to fit a target diameter.
    pub fn from_image(tip: &GrayImage, strength: f32) -> Option<Self> {
        let (w, h) = tip.dimensions();
        if w == 0 || h == 0 {
            return None;
        }
        let strength = strength.clamp(0.0, 1.0);
        let weights = tip
            .pixels()
            .map(|px| px.0[0] as f32 / 255.0 * strength)
            .collect();
        Some(Self { width: w, height: h, weights })
    }

    /// Rescale to `target_w` × `target_h` with bilinear interpolation.
    /// Returns `self` cloned when the size already matches.
    pub fn scaled(&self, target_w: u32, target_h: u32) -> BrushKernel {
        let target_w = target_w.max(1);
        let target_h = target_h.max(1);
        if (target_w, target_h) == (self.width, self.height) {
            return self.clone();
        }

        let scale_x = self.width as f32 / target_w as f32;
        let scale_y = self.height as f32 / target_h as f32;
        let mut weights = vec![0.0; (target_w * target_h) as usize];

        for dy in 0..target_h {
            for dx in 0..target_w {
                let sx = dx as f32 * scale_x;
                let sy = dy as f32 * scale_y;
                let sx0 = sx.floor() as u32;
                let sy0 = sy.floor() as u32;
                let sx1 = (sx0 + 1).min(self.width - 1);
                let sy1 = (sy0 + 1).min(self.height - 1);
                let fx = sx - sx0 as f32;
                let fy = sy - sy0 as f32;

                let v00 = self.weights[(sy0 * self.width + sx0) as usize];
                let v10 = self.weights[(sy0 * self.width + sx1) as usize];
                let v01 = self.weights[(sy1 * self.width + sx0) as usize];
                let v11 = self.weights[(sy1 * self.width + sx1) as usize];

                let top = v00 * (1.0 - fx) + v10 * fx;
                let bot = v01 * (1.0 - fx) + v11 * fx;
                weights[(dy * target_w + dx) as usize] = top * (1.0 - fy) + bot * fy;
            }
        }

        BrushKernel { width: target_w, height: target_h, weights }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Strength at kernel cell `(x, y)`; `0.0` outside the grid.
    pub fn strength(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.weights[(y * self.width + x) as usize]
    }
}

// ============================================================================
// BRUSH SET – the selectable roster
// ============================================================================

/// The brushes a session offers, with the currently selected index.
/// Selection is clamped to the roster, never rejected: a stale index from a
/// UI button still lands on a valid brush.
pub struct BrushSet {
    kernels: Vec<BrushKernel>,
    current: usize,
}

impl BrushSet {
    pub fn new(kernels: Vec<BrushKernel>) -> Self {
        Self { kernels, current: 0 }
    }

    pub fn is_empty(&self) -> bool {
        self.kernels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kernels.len()
    }

    /// Select by index, clamped to the available range.
    pub fn select(&mut self, index: usize) {
        if !self.kernels.is_empty() {
            self.current = index.min(self.kernels.len() - 1);
        }
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    /// The active kernel; `None` only for an empty roster.
    pub fn current(&self) -> Option<&BrushKernel> {
        self.kernels.get(self.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_circle_kernel_peaks_at_center() {
        let k = BrushKernel::circle(9, 0.8, 1.0);
        let cx = k.width() / 2;
        let cy = k.height() / 2;
        assert!(k.strength(cx, cy) > 0.99);
        // Corners sit outside the disc.
        assert_eq!(k.strength(0, 0), 0.0);
    }

    #[test]
    fn test_circle_hardness_softens_edge() {
        let hard = BrushKernel::circle(16, 1.0, 1.0);
        let soft = BrushKernel::circle(16, 0.0, 1.0);
        // Sample just inside the rim on the center row.
        let y = hard.height() / 2;
        let x = hard.width() - 2;
        assert!(
            soft.strength(x, y) < hard.strength(x, y),
            "soft rim {} should fall below hard rim {}",
            soft.strength(x, y),
            hard.strength(x, y)
        );
    }

    #[test]
    fn test_circle_strength_scales_kernel() {
        let k = BrushKernel::circle(9, 1.0, 0.25);
        let cx = k.width() / 2;
        assert!((k.strength(cx, cx) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn test_from_image_and_scaled() {
        let mut tip = GrayImage::new(4, 4);
        for y in 0..4 {
            for x in 0..4 {
                tip.put_pixel(x, y, image::Luma([255]));
            }
        }
        let k = BrushKernel::from_image(&tip, 1.0).unwrap();
        assert_eq!((k.width(), k.height()), (4, 4));
        let scaled = k.scaled(8, 8);
        assert_eq!((scaled.width(), scaled.height()), (8, 8));
        // A constant tip stays constant under bilinear rescale.
        assert!((scaled.strength(4, 4) - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_from_weights_rejects_mismatch() {
        assert!(BrushKernel::from_weights(2, 2, vec![1.0; 3]).is_none());
        assert!(BrushKernel::from_weights(0, 2, vec![]).is_none());
    }

    #[test]
    fn test_brush_set_select_clamps() {
        let mut set = BrushSet::new(vec![
            BrushKernel::circle(4, 1.0, 1.0),
            BrushKernel::circle(8, 1.0, 1.0),
        ]);
        set.select(99);
        assert_eq!(set.current_index(), 1);
        set.select(0);
        assert_eq!(set.current_index(), 0);
        assert!(set.current().is_some());
    }
}
