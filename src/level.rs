use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::canvas::{AlphaBuffer, PixelRect};
use crate::components::brush::BrushKernel;
use crate::components::regions::{Region, RegionEffect};
use crate::mapping::{OverlayRect, UvRect};
use crate::session::PausePolicy;

// ============================================================================
// LEVEL DATA – everything a session needs at start
// ============================================================================

/// Errors from loading or validating level data.
#[derive(Debug)]
pub enum LevelError {
    Io(std::io::Error),
    Parse(String),
    Image(String),
    Invalid(String),
}

impl fmt::Display for LevelError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LevelError::Io(e) => write!(f, "I/O error: {}", e),
            LevelError::Parse(e) => write!(f, "Parse error: {}", e),
            LevelError::Image(e) => write!(f, "Image error: {}", e),
            LevelError::Invalid(e) => write!(f, "Invalid level: {}", e),
        }
    }
}

impl std::error::Error for LevelError {}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        LevelError::Io(e)
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(e: serde_json::Error) -> Self {
        LevelError::Parse(e.to_string())
    }
}

/// The overlay buffer's shape and initial contents.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BufferDesc {
    pub width: u32,
    pub height: u32,
    /// Uniform initial alpha, usually `1.0` (fully opaque).
    #[serde(default = "default_fill")]
    pub fill: f32,
    /// Optional grayscale mask overriding `fill`; must match the buffer
    /// dimensions. Luma 255 is opaque.
    #[serde(default)]
    pub mask: Option<PathBuf>,
}

fn default_fill() -> f32 {
    1.0
}

/// One entry in the brush roster.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum BrushDesc {
    /// Procedural circle.
    Circle {
        diameter: u32,
        #[serde(default = "default_hardness")]
        hardness: f32,
        #[serde(default = "default_strength")]
        strength: f32,
    },
    /// Grayscale tip image, optionally rescaled to `diameter`.
    Image {
        path: PathBuf,
        #[serde(default)]
        diameter: Option<u32>,
        #[serde(default = "default_strength")]
        strength: f32,
    },
}

fn default_hardness() -> f32 {
    0.75
}

fn default_strength() -> f32 {
    1.0
}

/// One tracked region: an inclusive pixel rectangle plus its effect.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RegionDesc {
    pub name: String,
    pub min_x: u32,
    pub min_y: u32,
    pub max_x: u32,
    pub max_y: u32,
    pub effect: RegionEffect,
}

impl RegionDesc {
    pub fn rect(&self) -> PixelRect {
        PixelRect::new(self.min_x, self.min_y, self.max_x, self.max_y)
    }
}

/// Complete session-start input: buffer, mapping, brushes, regions, and the
/// scoring/timer configuration. Loaded from a hand-authored JSON file or
/// built in code (see [`LevelData::demo`]).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelData {
    pub name: String,
    pub buffer: BufferDesc,
    pub overlay: OverlayRect,
    #[serde(default)]
    pub uv: UvRect,
    pub brushes: Vec<BrushDesc>,
    pub regions: Vec<RegionDesc>,
    /// A pixel counts as erased when its alpha is at or below this.
    #[serde(default = "default_alpha_threshold")]
    pub alpha_threshold: f32,
    /// Fraction of a region's pixels that must be erased to clear it.
    #[serde(default = "default_required_ratio")]
    pub required_ratio: f32,
    pub score_threshold: i32,
    pub timer_start: f32,
    pub timer_cap: f32,
    #[serde(default)]
    pub pause_policy: PausePolicy,
}

fn default_alpha_threshold() -> f32 {
    0.1
}

fn default_required_ratio() -> f32 {
    2.0 / 3.0
}

impl LevelData {
    /// Structural validation. Runs before any buffer or kernel is built so
    /// a bad file fails with one message instead of a half-built session.
    pub fn validate(&self) -> Result<(), LevelError> {
        let invalid = |msg: String| Err(LevelError::Invalid(msg));

        if self.buffer.width == 0 || self.buffer.height == 0 {
            return invalid(format!(
                "buffer dimensions {}x{} are degenerate",
                self.buffer.width, self.buffer.height
            ));
        }
        if !(0.0..=1.0).contains(&self.buffer.fill) {
            return invalid(format!("buffer fill {} outside [0, 1]", self.buffer.fill));
        }
        if self.brushes.is_empty() {
            return invalid("brush roster is empty".into());
        }
        for (i, brush) in self.brushes.iter().enumerate() {
            if let BrushDesc::Circle { diameter: 0, .. } = brush {
                return invalid(format!("brush {} has zero diameter", i));
            }
        }
        if !(0.0..=1.0).contains(&self.alpha_threshold) {
            return invalid(format!("alpha_threshold {} outside [0, 1]", self.alpha_threshold));
        }
        if !(0.0..=1.0).contains(&self.required_ratio) || self.required_ratio == 0.0 {
            return invalid(format!("required_ratio {} outside (0, 1]", self.required_ratio));
        }
        if self.timer_cap <= 0.0 {
            return invalid(format!("timer_cap {} must be positive", self.timer_cap));
        }
        if self.timer_start < 0.0 {
            return invalid(format!("timer_start {} must not be negative", self.timer_start));
        }
        for region in &self.regions {
            if region.min_x > region.max_x || region.min_y > region.max_y {
                return invalid(format!("region '{}' has inverted bounds", region.name));
            }
            if region.max_x >= self.buffer.width || region.max_y >= self.buffer.height {
                return invalid(format!(
                    "region '{}' reaches outside the {}x{} buffer",
                    region.name, self.buffer.width, self.buffer.height
                ));
            }
        }
        Ok(())
    }

    /// Build the overlay buffer, loading the optional alpha mask relative
    /// to `base_dir`. A mask must match the declared dimensions exactly;
    /// a mismatch is a level-authoring error, not something to resample
    /// around.
    pub fn build_buffer(&self, base_dir: &Path) -> Result<AlphaBuffer, LevelError> {
        match &self.buffer.mask {
            Some(path) => {
                let full = resolve_path(base_dir, path);
                let mask = load_gray(&full)?;
                if mask.dimensions() != (self.buffer.width, self.buffer.height) {
                    return Err(LevelError::Invalid(format!(
                        "mask {} is {}x{}, buffer is {}x{}",
                        full.display(),
                        mask.width(),
                        mask.height(),
                        self.buffer.width,
                        self.buffer.height
                    )));
                }
                Ok(AlphaBuffer::from_mask(&mask))
            }
            None => Ok(AlphaBuffer::new(
                self.buffer.width,
                self.buffer.height,
                self.buffer.fill,
            )),
        }
    }

    /// Build the brush roster, loading tip images relative to `base_dir`.
    pub fn build_brushes(&self, base_dir: &Path) -> Result<Vec<BrushKernel>, LevelError> {
        let mut kernels = Vec::with_capacity(self.brushes.len());
        for desc in &self.brushes {
            let kernel = match desc {
                BrushDesc::Circle { diameter, hardness, strength } => {
                    BrushKernel::circle(*diameter, *hardness, *strength)
                }
                BrushDesc::Image { path, diameter, strength } => {
                    let full = resolve_path(base_dir, path);
                    let tip = load_gray(&full)?;
                    let kernel = BrushKernel::from_image(&tip, *strength).ok_or_else(|| {
                        LevelError::Image(format!("empty tip image {}", full.display()))
                    })?;
                    match diameter {
                        Some(d) => kernel.scaled(*d, *d),
                        None => kernel,
                    }
                }
            };
            kernels.push(kernel);
        }
        Ok(kernels)
    }

    pub fn regions(&self) -> Vec<Region> {
        self.regions
            .iter()
            .map(|desc| Region::new(desc.name.clone(), desc.rect(), desc.effect))
            .collect()
    }

    /// A small built-in level: one scorable icon per corner, a time bonus,
    /// a reveal flower in the middle, and a hazard. Used when exercising
    /// the engine without authoring a file.
    pub fn demo() -> LevelData {
        LevelData {
            name: "demo".into(),
            buffer: BufferDesc { width: 256, height: 256, fill: 1.0, mask: None },
            overlay: OverlayRect { min_x: -128.0, min_y: -128.0, width: 256.0, height: 256.0 },
            uv: UvRect::default(),
            brushes: vec![
                BrushDesc::Circle { diameter: 24, hardness: 0.75, strength: 0.9 },
                BrushDesc::Circle { diameter: 48, hardness: 0.4, strength: 0.6 },
            ],
            regions: vec![
                RegionDesc {
                    name: "coin-nw".into(),
                    min_x: 16, min_y: 16, max_x: 47, max_y: 47,
                    effect: RegionEffect::Score { points: 5 },
                },
                RegionDesc {
                    name: "coin-se".into(),
                    min_x: 208, min_y: 208, max_x: 239, max_y: 239,
                    effect: RegionEffect::Score { points: 5 },
                },
                RegionDesc {
                    name: "hourglass".into(),
                    min_x: 208, min_y: 16, max_x: 239, max_y: 47,
                    effect: RegionEffect::Timer { delta: 5.0 },
                },
                RegionDesc {
                    name: "flower".into(),
                    min_x: 112, min_y: 112, max_x: 143, max_y: 143,
                    effect: RegionEffect::Reveal { points: 6, pause_ticks: 180 },
                },
                RegionDesc {
                    name: "bomb".into(),
                    min_x: 16, min_y: 208, max_x: 47, max_y: 239,
                    effect: RegionEffect::EndGame,
                },
            ],
            alpha_threshold: 0.1,
            required_ratio: 2.0 / 3.0,
            score_threshold: 10,
            timer_start: 59.0,
            timer_cap: 59.0,
            pause_policy: PausePolicy::FreezeClocks,
        }
    }
}

/// Load and validate a level file.
pub fn load_level(path: &Path) -> Result<LevelData, LevelError> {
    let raw = fs::read_to_string(path)?;
    let level: LevelData = serde_json::from_str(&raw)?;
    level.validate()?;
    Ok(level)
}

/// Load a grayscale image, converting other color types down to luma.
pub fn load_gray(path: &Path) -> Result<image::GrayImage, LevelError> {
    let img = image::open(path)
        .map_err(|e| LevelError::Image(format!("{}: {}", path.display(), e)))?;
    Ok(img.into_luma8())
}

fn resolve_path(base_dir: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base_dir.join(path)
    }
}
