//! ScratchFE — a scratch-and-reveal game core.
//!
//! A pointer drags a brush across an opaque alpha overlay, progressively
//! eroding it; tracked regions clear once enough of their pixels are
//! erased, feeding a score/timer state machine with temporary multipliers,
//! a one-shot "ignore the next adverse event" rule, and a terminal
//! win/lose resolution.
//!
//! The crate is presentation-free. Front-ends (GUI, wasm, audio) construct
//! a [`session::ScratchSession`] from [`level::LevelData`], feed it pointer
//! samples and per-tick updates, and drain [`events::GameEvent`]s to react.

pub mod canvas;
pub mod cli;
pub mod components;
pub mod events;
pub mod level;
pub mod logger;
pub mod mapping;
pub mod session;

pub use canvas::{AlphaBuffer, PixelRect};
pub use components::brush::{BrushKernel, BrushSet};
pub use components::lifecycle::{GameLifecycle, GameOutcome};
pub use components::regions::{Region, RegionClearanceTracker, RegionEffect};
pub use components::scoring::{Multiplier, MultiplierKind, ScoreTimerState};
pub use events::GameEvent;
pub use level::{LevelData, LevelError};
pub use mapping::{CoordinateMapper, OverlayRect, UvRect};
pub use session::{PausePolicy, ScratchSession};
