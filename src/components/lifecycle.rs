use serde::{Deserialize, Serialize};

// ============================================================================
// GAME LIFECYCLE – Running → Finished, terminal once entered
// ============================================================================

/// Terminal result of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameOutcome {
    Won,
    Lost,
}

impl GameOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            GameOutcome::Won => "won",
            GameOutcome::Lost => "lost",
        }
    }
}

/// Declares the win/lose outcome exactly once.
///
/// The first `resolve` call compares the score against the configured
/// threshold and records the outcome; every later call is ignored and
/// returns `None`, so double triggers (timer expiry racing a hazard
/// region) can never produce a second `GameFinished`.
pub struct GameLifecycle {
    score_threshold: i32,
    finished: Option<(GameOutcome, i32)>,
}

impl GameLifecycle {
    pub fn new(score_threshold: i32) -> Self {
        Self { score_threshold, finished: None }
    }

    /// Resolve with the given final score. Returns the outcome on the first
    /// call only.
    pub fn resolve(&mut self, score: i32) -> Option<GameOutcome> {
        if self.finished.is_some() {
            return None;
        }
        let outcome = if score >= self.score_threshold {
            GameOutcome::Won
        } else {
            GameOutcome::Lost
        };
        self.finished = Some((outcome, score));
        Some(outcome)
    }

    pub fn is_finished(&self) -> bool {
        self.finished.is_some()
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.finished.map(|(o, _)| o)
    }

    /// Score captured at the moment of resolution.
    pub fn final_score(&self) -> Option<i32> {
        self.finished.map(|(_, s)| s)
    }

    pub fn score_threshold(&self) -> i32 {
        self.score_threshold
    }
}
