use rayon::prelude::*;

use crate::components::brush::BrushKernel;

/// Alpha values closer than this to the current value are treated as no-ops.
/// Skipping them keeps every write a strict decrease, so erosion stays
/// monotonic even under accumulated floating-point noise.
pub const ALPHA_WRITE_EPSILON: f32 = 1e-4;

/// Hard cap on buffer area (overlays are screen-sized, not photo-sized).
const MAX_BUFFER_PIXELS: u64 = 16_000_000;

// ============================================================================
// PIXEL RECT – inclusive-bounds axis-aligned rectangle in buffer space
// ============================================================================

/// Axis-aligned pixel rectangle with **inclusive** bounds.
/// A single pixel is `min == max`; `area()` of a 4×4 rect is 16.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PixelRect {
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
}

impl PixelRect {
    pub fn new(min_x: u32, min_y: u32, max_x: u32, max_y: u32) -> Self {
        Self {
            min_x: min_x.min(max_x),
            min_y: min_y.min(max_y),
            max_x: min_x.max(max_x),
            max_y: min_y.max(max_y),
        }
    }

    /// Single-pixel rectangle.
    pub fn pixel(x: u32, y: u32) -> Self {
        Self { min_x: x, min_y: y, max_x: x, max_y: y }
    }

    pub fn width(&self) -> u32 {
        self.max_x - self.min_x + 1
    }

    pub fn height(&self) -> u32 {
        self.max_y - self.min_y + 1
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    /// Inclusive-bounds overlap test (sharing an edge pixel counts).
    pub fn overlaps(&self, other: &PixelRect) -> bool {
        self.min_x <= other.max_x
            && other.min_x <= self.max_x
            && self.min_y <= other.max_y
            && other.min_y <= self.max_y
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Smallest rectangle covering both.
    pub fn union(&self, other: &PixelRect) -> PixelRect {
        PixelRect {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    /// Expand to cover `(x, y)`.
    pub fn include(&mut self, x: u32, y: u32) {
        self.min_x = self.min_x.min(x);
        self.min_y = self.min_y.min(y);
        self.max_x = self.max_x.max(x);
        self.max_y = self.max_y.max(y);
    }

    /// Clip to a `width` × `height` grid. `None` when fully outside.
    pub fn clipped(&self, width: u32, height: u32) -> Option<PixelRect> {
        if width == 0 || height == 0 || self.min_x >= width || self.min_y >= height {
            return None;
        }
        Some(PixelRect {
            min_x: self.min_x,
            min_y: self.min_y,
            max_x: self.max_x.min(width - 1),
            max_y: self.max_y.min(height - 1),
        })
    }
}

// ============================================================================
// ALPHA BUFFER – the erasable overlay
// ============================================================================

/// Mutable grid of transparency values in `[0, 1]`.
///
/// `1.0` is fully opaque (unscratched), `0.0` fully erased. The only mutation
/// path is [`AlphaBuffer::stamp`], which multiplies cells down by a brush
/// kernel, so values never increase after construction.
#[derive(Clone)]
pub struct AlphaBuffer {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl AlphaBuffer {
    /// Create a buffer filled with `fill` (clamped to `[0, 1]`).
    /// Degenerate or oversized dimensions collapse to 1×1 with a logged
    /// diagnostic rather than a panic, mirroring how level validation treats
    /// them as unrecoverable input errors.
    pub fn new(width: u32, height: u32, fill: f32) -> Self {
        let (width, height) = {
            let total = width as u64 * height as u64;
            if width == 0 || height == 0 || total > MAX_BUFFER_PIXELS {
                crate::log_warn!(
                    "AlphaBuffer::new: invalid dimensions {}x{}, clamped to 1x1",
                    width,
                    height
                );
                (1, 1)
            } else {
                (width, height)
            }
        };
        Self {
            width,
            height,
            data: vec![fill.clamp(0.0, 1.0); (width * height) as usize],
        }
    }

    /// Fully opaque buffer, the usual session start.
    pub fn opaque(width: u32, height: u32) -> Self {
        Self::new(width, height, 1.0)
    }

    /// Initial alpha from a grayscale mask (luma 255 is opaque).
    /// Lets a level start with parts of the overlay already thin or open.
    pub fn from_mask(mask: &image::GrayImage) -> Self {
        let mut buf = Self::new(mask.width(), mask.height(), 1.0);
        if (buf.width, buf.height) != (mask.width(), mask.height()) {
            // Dimension guard already rejected the mask shape; keep the 1x1.
            return buf;
        }
        for (i, px) in mask.pixels().enumerate() {
            buf.data[i] = px.0[0] as f32 / 255.0;
        }
        buf
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Alpha at `(x, y)`. Out-of-bounds reads return `0.0` (nothing to erase).
    pub fn get(&self, x: u32, y: u32) -> f32 {
        if x >= self.width || y >= self.height {
            return 0.0;
        }
        self.data[(y * self.width + x) as usize]
    }

    /// Stamp `kernel` centered on `(center_x, center_y)`, eroding every
    /// covered in-bounds cell: `alpha = alpha * (1 - strength)`.
    ///
    /// A cell is written only when the new value is a strict decrease (by
    /// more than [`ALPHA_WRITE_EPSILON`]), so repeated stamping of an already
    /// erased area is free and erosion is monotonic. Returns the bounding
    /// rect of the cells actually written, `None` when nothing changed.
    ///
    /// The center may lie outside the buffer; only the overlapping part of
    /// the kernel is applied. All writes complete before the caller sees the
    /// dirty rect, so clearance checks always observe a settled buffer.
    pub fn stamp(&mut self, center_x: i32, center_y: i32, kernel: &BrushKernel) -> Option<PixelRect> {
        let half_w = kernel.width() as i32 / 2;
        let half_h = kernel.height() as i32 / 2;

        let mut dirty: Option<PixelRect> = None;

        for j in 0..kernel.height() as i32 {
            let py = center_y + j - half_h;
            if py < 0 || py >= self.height as i32 {
                continue;
            }
            for i in 0..kernel.width() as i32 {
                let px = center_x + i - half_w;
                if px < 0 || px >= self.width as i32 {
                    continue;
                }
                let strength = kernel.strength(i as u32, j as u32);
                if strength <= 0.0 {
                    continue;
                }
                let idx = (py as u32 * self.width + px as u32) as usize;
                let current = self.data[idx];
                let eroded = current * (1.0 - strength);
                if eroded < current - ALPHA_WRITE_EPSILON {
                    self.data[idx] = eroded;
                    match dirty.as_mut() {
                        Some(rect) => rect.include(px as u32, py as u32),
                        None => dirty = Some(PixelRect::pixel(px as u32, py as u32)),
                    }
                }
            }
        }

        dirty
    }

    /// Count cells inside `rect` (clipped to the buffer) with
    /// `alpha <= threshold`. The denominator for clearance ratios is the
    /// rect's full area, not the clipped count, so callers keep the same
    /// semantics for rects that hang off the buffer edge.
    pub fn count_at_or_below(&self, rect: &PixelRect, threshold: f32) -> usize {
        let Some(clipped) = rect.clipped(self.width, self.height) else {
            return 0;
        };
        let mut count = 0;
        for y in clipped.min_y..=clipped.max_y {
            let row = (y * self.width) as usize;
            for x in clipped.min_x..=clipped.max_x {
                if self.data[row + x as usize] <= threshold {
                    count += 1;
                }
            }
        }
        count
    }

    /// Fraction of the whole buffer at or below `threshold`.
    /// Used for end-of-session statistics; the scan is parallelised per row
    /// block since it touches every cell.
    pub fn coverage(&self, threshold: f32) -> f32 {
        if self.data.is_empty() {
            return 0.0;
        }
        let cleared: usize = self
            .data
            .par_chunks(self.width.max(1) as usize)
            .map(|row| row.iter().filter(|&&a| a <= threshold).count())
            .sum();
        cleared as f32 / self.data.len() as f32
    }
}

// ============================================================================
// Tests
// ============================================================================
