use std::fmt;

use uuid::Uuid;

use crate::components::lifecycle::GameOutcome;

/// Notifications produced by the core and consumed by presentation, audio,
/// and UI collaborators. Drained from the session queue in emission order.
#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    /// A tracked region crossed its clearance threshold. Fires once per
    /// region per session. `applied_score` is the score delta applied at
    /// clearance time (zero for timer regions and deferred reveal awards).
    RegionCleared {
        region: Uuid,
        name: String,
        applied_score: i32,
    },
    ScoreChanged {
        score: i32,
        delta: i32,
    },
    TimerChanged {
        timer: f32,
        delta: f32,
    },
    /// A reveal interlude began; the session stays paused until
    /// `resume_tick`.
    RevealStarted {
        region: Uuid,
        resume_tick: u64,
    },
    RevealEnded {
        region: Uuid,
    },
    /// Terminal event, emitted exactly once per session.
    GameFinished {
        outcome: GameOutcome,
        final_score: i32,
    },
}

impl fmt::Display for GameEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GameEvent::RegionCleared { name, applied_score, .. } => {
                write!(f, "region cleared: {} ({:+} pts)", name, applied_score)
            }
            GameEvent::ScoreChanged { score, delta } => {
                write!(f, "score {:+} -> {}", delta, score)
            }
            GameEvent::TimerChanged { timer, delta } => {
                write!(f, "timer {:+.1}s -> {:.1}s", delta, timer)
            }
            GameEvent::RevealStarted { resume_tick, .. } => {
                write!(f, "reveal started (until tick {})", resume_tick)
            }
            GameEvent::RevealEnded { .. } => write!(f, "reveal ended"),
            GameEvent::GameFinished { outcome, final_score } => {
                write!(f, "game {} with {} points", outcome.label(), final_score)
            }
        }
    }
}
