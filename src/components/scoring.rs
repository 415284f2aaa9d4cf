use crate::log_warn;

// ============================================================================
// SCORE / TIMER STATE
// ============================================================================

/// Which sign of score delta a temporary multiplier applies to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MultiplierKind {
    Positive,
    Negative,
}

/// Temporary scalar on score deltas of one sign. At rest the factor is 1
/// and the countdown 0; a new activation overwrites the previous pair
/// rather than stacking on it.
#[derive(Clone, Copy, Debug)]
pub struct Multiplier {
    factor: f32,
    remaining: f32,
}

impl Default for Multiplier {
    fn default() -> Self {
        Self { factor: 1.0, remaining: 0.0 }
    }
}

impl Multiplier {
    pub fn factor(&self) -> f32 {
        self.factor
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    fn count_down(&mut self, dt: f32) {
        if self.remaining <= 0.0 {
            return;
        }
        self.remaining -= dt;
        if self.remaining <= 0.0 {
            self.factor = 1.0;
            self.remaining = 0.0;
        }
    }
}

/// Score, timer, active multipliers, and the one-shot ignore flag.
///
/// Score is mutated only through [`ScoreTimerState::change_score`]; the
/// timer only through [`ScoreTimerState::change_timer`] and the per-tick
/// countdown. The struct also owns the session's monotonic tick counter,
/// advanced exactly once per update, which is what the ignore flag's
/// same-tick rule is measured against.
pub struct ScoreTimerState {
    score: i32,
    timer: f32,
    timer_cap: f32,
    tick: u64,
    /// Tick index at which the ignore flag was armed, `None` when unset.
    ignore_set_at: Option<u64>,
    positive: Multiplier,
    negative: Multiplier,
}

impl ScoreTimerState {
    pub fn new(timer_start: f32, timer_cap: f32) -> Self {
        let timer_cap = timer_cap.max(0.0);
        Self {
            score: 0,
            timer: timer_start.clamp(0.0, timer_cap),
            timer_cap,
            tick: 0,
            ignore_set_at: None,
            positive: Multiplier::default(),
            negative: Multiplier::default(),
        }
    }

    pub fn score(&self) -> i32 {
        self.score
    }

    pub fn timer(&self) -> f32 {
        self.timer
    }

    pub fn timer_cap(&self) -> f32 {
        self.timer_cap
    }

    pub fn timer_expired(&self) -> bool {
        self.timer <= 0.0
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    /// Advance the tick counter. Called once at the top of every session
    /// update; everything that happens until the next call shares this tick
    /// index, which is what makes the ignore flag's same-tick rule coherent.
    pub fn begin_tick(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    /// Count the clocks down by `dt` seconds: the session timer toward zero
    /// and each active multiplier toward its reset. Kept separate from
    /// [`ScoreTimerState::begin_tick`] so a paused interlude can freeze the
    /// clocks without stopping the tick counter.
    pub fn advance_clocks(&mut self, dt: f32) {
        if dt <= 0.0 {
            return;
        }
        self.timer = (self.timer - dt).max(0.0);
        self.positive.count_down(dt);
        self.negative.count_down(dt);
    }

    /// Arm the one-shot ignore: the next adverse event (score decrease,
    /// timer decrease, or reveal) on a *later* tick is swallowed.
    pub fn set_ignore_next_adverse(&mut self) {
        self.ignore_set_at = Some(self.tick);
    }

    pub fn ignore_armed(&self) -> bool {
        self.ignore_set_at.is_some()
    }

    /// Single authority for ignore consumption. Returns `false` when the
    /// flag is unset or was armed on the current tick (the operation that
    /// armed it must not cancel itself); otherwise clears the flag and
    /// returns `true`. Each activation is consumable at most once.
    pub fn consume_ignore_if_eligible(&mut self) -> bool {
        match self.ignore_set_at {
            None => false,
            Some(set_at) if self.tick <= set_at => false,
            Some(_) => {
                self.ignore_set_at = None;
                true
            }
        }
    }

    /// Apply a score delta and return what was actually added.
    ///
    /// A negative delta first offers itself to the ignore flag; if consumed
    /// the score is untouched and `0` comes back. Otherwise the multiplier
    /// matching the delta's sign scales it (zero deltas bypass multipliers
    /// entirely) and the rounded result lands on the score.
    pub fn change_score(&mut self, points: i32) -> i32 {
        if points == 0 {
            return 0;
        }
        if points < 0 && self.consume_ignore_if_eligible() {
            return 0;
        }
        let factor = if points > 0 {
            self.positive.factor
        } else {
            self.negative.factor
        };
        let applied = (points as f32 * factor).round() as i32;
        self.score += applied;
        applied
    }

    /// Apply a timer delta, clamped into `[0, timer_cap]`, and return the
    /// clamped change. The same ignore rule as for score applies to
    /// negative deltas.
    pub fn change_timer(&mut self, delta: f32) -> f32 {
        if delta < 0.0 && self.consume_ignore_if_eligible() {
            return 0.0;
        }
        let before = self.timer;
        self.timer = (self.timer + delta).clamp(0.0, self.timer_cap);
        self.timer - before
    }

    /// Install a temporary multiplier for one sign of score delta.
    /// Non-positive factors or durations are rejected at the boundary (the
    /// current pair stays in place); an accepted pair overwrites whatever
    /// was active, it does not stack.
    pub fn apply_temporary_multiplier(
        &mut self,
        kind: MultiplierKind,
        factor: f32,
        duration: f32,
    ) -> bool {
        if factor <= 0.0 || duration <= 0.0 {
            log_warn!(
                "ScoreTimerState: rejected multiplier {:?} x{} for {}s",
                kind,
                factor,
                duration
            );
            return false;
        }
        let slot = match kind {
            MultiplierKind::Positive => &mut self.positive,
            MultiplierKind::Negative => &mut self.negative,
        };
        slot.factor = factor;
        slot.remaining = duration;
        true
    }

    pub fn multiplier(&self, kind: MultiplierKind) -> &Multiplier {
        match kind {
            MultiplierKind::Positive => &self.positive,
            MultiplierKind::Negative => &self.negative,
        }
    }
}
