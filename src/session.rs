use std::collections::VecDeque;
use std::path::Path;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::canvas::AlphaBuffer;
use crate::components::brush::BrushSet;
use crate::components::lifecycle::{GameLifecycle, GameOutcome};
use crate::components::regions::{RegionClearanceTracker, RegionEffect};
use crate::components::scoring::{MultiplierKind, ScoreTimerState};
use crate::events::GameEvent;
use crate::level::{LevelData, LevelError};
use crate::log_warn;
use crate::mapping::CoordinateMapper;

// ============================================================================
// SCRATCH SESSION – one play-through, wired at construction
// ============================================================================

/// What a reveal pause does to the session clocks.
///
/// The tick counter and pointer erosion always keep running; the policy only
/// governs the timer and multiplier countdowns. `FreezeClocks` matches the
/// classic behavior where an interlude stops scaled time while input stays
/// live; `RunClocks` lets the countdown eat into the pause.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PausePolicy {
    #[default]
    FreezeClocks,
    RunClocks,
}

/// Work deferred to a later tick, processed by the update loop.
#[derive(Clone, Debug)]
enum DeferredAction {
    /// Close a reveal interlude and award its points.
    EndReveal { region: Uuid, points: i32 },
}

#[derive(Clone, Debug)]
struct ScheduledAction {
    resume_at_tick: u64,
    action: DeferredAction,
}

/// A single play session: the overlay buffer, its tracked regions, the
/// score/timer state, and the lifecycle, all wired together at construction
/// (components never look each other up at runtime).
///
/// Drive it with [`ScratchSession::pointer_sample`] for input,
/// [`ScratchSession::update`] once per tick, and drain
/// [`ScratchSession::take_events`] for everything presentation needs to
/// react to. Once the session finishes, every mutation becomes a no-op.
pub struct ScratchSession {
    pub id: Uuid,
    name: String,
    buffer: AlphaBuffer,
    mapper: CoordinateMapper,
    brushes: BrushSet,
    tracker: RegionClearanceTracker,
    state: ScoreTimerState,
    lifecycle: GameLifecycle,
    pause_policy: PausePolicy,
    /// Tick the current pause runs to, if any. Overlapping reveals extend
    /// it, they don't queue separate pauses.
    paused_until: Option<u64>,
    scheduled: Vec<ScheduledAction>,
    events: VecDeque<GameEvent>,
}

impl ScratchSession {
    /// Build a session from level data. Tip images and masks are loaded
    /// relative to `base_dir`.
    pub fn from_level(level: &LevelData, base_dir: &Path) -> Result<Self, LevelError> {
        level.validate()?;
        let buffer = level.build_buffer(base_dir)?;
        let kernels = level.build_brushes(base_dir)?;
        let mapper = CoordinateMapper::new(
            level.overlay,
            level.uv,
            buffer.width(),
            buffer.height(),
        );
        Ok(Self {
            id: Uuid::new_v4(),
            name: level.name.clone(),
            buffer,
            mapper,
            brushes: BrushSet::new(kernels),
            tracker: RegionClearanceTracker::new(
                level.regions(),
                level.alpha_threshold,
                level.required_ratio,
            ),
            state: ScoreTimerState::new(level.timer_start, level.timer_cap),
            lifecycle: GameLifecycle::new(level.score_threshold),
            pause_policy: level.pause_policy,
            paused_until: None,
            scheduled: Vec::new(),
            events: VecDeque::new(),
        })
    }

    // ---- input ---------------------------------------------------------

    /// Feed one pointer sample in overlay layout space. Inactive samples
    /// and samples off the overlay are ignored silently; both are routine.
    /// Erosion keeps working during a reveal pause, only the clocks may
    /// freeze.
    pub fn pointer_sample(&mut self, x: f32, y: f32, active: bool) {
        if !active || self.lifecycle.is_finished() {
            return;
        }
        let Some(kernel) = self.brushes.current() else {
            log_warn!("session '{}': no brush available, erosion skipped", self.name);
            return;
        };
        let Some((px, py)) = self.mapper.map(x, y) else {
            return;
        };
        let Some(dirty) = self.buffer.stamp(px as i32, py as i32, kernel) else {
            return;
        };
        // The stamp is settled before any region is rechecked.
        let cleared = self.tracker.on_buffer_changed(&self.buffer, dirty);
        for idx in cleared {
            self.apply_region_effect(idx);
        }
    }

    /// Switch the active brush; the index is clamped to the roster.
    pub fn select_brush(&mut self, index: usize) {
        self.brushes.select(index);
    }

    // ---- per-tick update -------------------------------------------------

    /// Advance the session one tick: run due continuations, count the
    /// clocks down (unless a pause froze them), and resolve the game when
    /// the timer runs out. `dt` is the elapsed seconds for this tick.
    pub fn update(&mut self, dt: f32) {
        if self.lifecycle.is_finished() {
            return;
        }
        let now = self.state.begin_tick();

        // Continuations scheduled for this tick or earlier fire first, so
        // a reveal that ends now unfreezes the clocks below.
        if !self.scheduled.is_empty() {
            let mut due = Vec::new();
            self.scheduled.retain(|s| {
                if s.resume_at_tick <= now {
                    due.push(s.clone());
                    false
                } else {
                    true
                }
            });
            for entry in due {
                self.run_deferred(entry.action);
            }
        }
        if let Some(until) = self.paused_until {
            if now >= until {
                self.paused_until = None;
            }
        }

        let frozen = self.is_paused() && self.pause_policy == PausePolicy::FreezeClocks;
        if !frozen {
            self.state.advance_clocks(dt);
        }

        if self.state.timer_expired() {
            self.finish();
        }
    }

    // ---- external triggers ------------------------------------------------

    /// Apply a score delta from an external source (store purchase, UI
    /// hook). Returns the applied delta after multiplier and ignore
    /// handling; zero once the session has finished.
    pub fn change_score(&mut self, points: i32) -> i32 {
        if self.lifecycle.is_finished() {
            return 0;
        }
        self.apply_score_delta(points)
    }

    /// Apply a timer delta from an external source, clamped to the cap.
    pub fn change_timer(&mut self, delta: f32) -> f32 {
        if self.lifecycle.is_finished() {
            return 0.0;
        }
        self.apply_timer_delta(delta)
    }

    /// Arm the ignore-next-adverse flag, then pay for it. The flag only
    /// becomes consumable on a later tick, so the purchase price itself
    /// always lands.
    pub fn buy_shield(&mut self, cost: i32) {
        if self.lifecycle.is_finished() {
            return;
        }
        self.state.set_ignore_next_adverse();
        self.apply_score_delta(-cost.max(0));
    }

    /// Pay `cost`, then double down: the factor applies to both positive
    /// and negative score deltas for `duration` seconds. The price is paid
    /// before the new factor installs.
    pub fn buy_doubler(&mut self, cost: i32, factor: f32, duration: f32) {
        if self.lifecycle.is_finished() {
            return;
        }
        self.apply_score_delta(-cost.max(0));
        self.state
            .apply_temporary_multiplier(MultiplierKind::Positive, factor, duration);
        self.state
            .apply_temporary_multiplier(MultiplierKind::Negative, factor, duration);
    }

    /// Trade points for time.
    pub fn buy_time(&mut self, cost: i32, delta: f32) {
        if self.lifecycle.is_finished() {
            return;
        }
        self.apply_score_delta(-cost.max(0));
        self.apply_timer_delta(delta);
    }

    /// Explicit end request (menu quit, debug command). Resolves with the
    /// current score as if the timer had just expired.
    pub fn request_end(&mut self) {
        self.finish();
    }

    // ---- observers --------------------------------------------------------

    pub fn take_events(&mut self) -> Vec<GameEvent> {
        self.events.drain(..).collect()
    }

    pub fn score(&self) -> i32 {
        self.state.score()
    }

    pub fn timer(&self) -> f32 {
        self.state.timer()
    }

    pub fn current_tick(&self) -> u64 {
        self.state.current_tick()
    }

    pub fn is_paused(&self) -> bool {
        self.paused_until
            .is_some_and(|until| self.state.current_tick() < until)
    }

    pub fn is_finished(&self) -> bool {
        self.lifecycle.is_finished()
    }

    pub fn outcome(&self) -> Option<GameOutcome> {
        self.lifecycle.outcome()
    }

    pub fn buffer(&self) -> &AlphaBuffer {
        &self.buffer
    }

    pub fn tracker(&self) -> &RegionClearanceTracker {
        &self.tracker
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // ---- internals ----------------------------------------------------------

    fn apply_score_delta(&mut self, points: i32) -> i32 {
        let applied = self.state.change_score(points);
        if applied != 0 {
            self.events.push_back(GameEvent::ScoreChanged {
                score: self.state.score(),
                delta: applied,
            });
        }
        applied
    }

    fn apply_timer_delta(&mut self, delta: f32) -> f32 {
        let applied = self.state.change_timer(delta);
        if applied != 0.0 {
            self.events.push_back(GameEvent::TimerChanged {
                timer: self.state.timer(),
                delta: applied,
            });
        }
        applied
    }

    fn apply_region_effect(&mut self, idx: usize) {
        let Some(region) = self.tracker.region(idx) else {
            log_warn!("session '{}': cleared region {} not found", self.name, idx);
            return;
        };
        let (id, name, effect) = (region.id, region.name.clone(), region.effect);

        match effect {
            RegionEffect::Score { points } => {
                let applied = self.state.change_score(points);
                self.events.push_back(GameEvent::RegionCleared {
                    region: id,
                    name,
                    applied_score: applied,
                });
                if applied != 0 {
                    self.events.push_back(GameEvent::ScoreChanged {
                        score: self.state.score(),
                        delta: applied,
                    });
                }
            }
            RegionEffect::Timer { delta } => {
                self.events.push_back(GameEvent::RegionCleared {
                    region: id,
                    name,
                    applied_score: 0,
                });
                self.apply_timer_delta(delta);
            }
            RegionEffect::Reveal { points, pause_ticks } => {
                self.events.push_back(GameEvent::RegionCleared {
                    region: id,
                    name: name.clone(),
                    applied_score: 0,
                });
                // A reveal is an adverse interruption: an eligible ignore
                // swallows the pause but the award still applies.
                if self.state.consume_ignore_if_eligible() {
                    crate::log_info!("session '{}': reveal on '{}' ignored", self.name, name);
                    self.apply_score_delta(points);
                } else {
                    let resume = self.state.current_tick() + pause_ticks as u64;
                    self.paused_until =
                        Some(self.paused_until.map_or(resume, |t| t.max(resume)));
                    self.scheduled.push(ScheduledAction {
                        resume_at_tick: resume,
                        action: DeferredAction::EndReveal { region: id, points },
                    });
                    self.events.push_back(GameEvent::RevealStarted {
                        region: id,
                        resume_tick: resume,
                    });
                }
            }
            RegionEffect::EndGame => {
                self.events.push_back(GameEvent::RegionCleared {
                    region: id,
                    name: name.clone(),
                    applied_score: 0,
                });
                if self.state.consume_ignore_if_eligible() {
                    crate::log_info!("session '{}': hazard '{}' ignored", self.name, name);
                } else {
                    self.finish();
                }
            }
        }
    }

    fn run_deferred(&mut self, action: DeferredAction) {
        match action {
            DeferredAction::EndReveal { region, points } => {
                self.events.push_back(GameEvent::RevealEnded { region });
                self.apply_score_delta(points);
            }
        }
    }

    fn finish(&mut self) {
        let score = self.state.score();
        if let Some(outcome) = self.lifecycle.resolve(score) {
            crate::log_info!(
                "session '{}': finished {} with {} points",
                self.name,
                outcome.label(),
                score
            );
            self.events.push_back(GameEvent::GameFinished {
                outcome,
                final_score: score,
            });
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::{BrushDesc, BufferDesc, RegionDesc};
    use crate::mapping::{OverlayRect, UvRect};

    /// 8×8 buffer with an identity-ish overlay mapping, one hard small
    /// brush, and whatever regions the test wants.
    fn test_level(regions: Vec<RegionDesc>) -> LevelData {
        LevelData {
            name: "test".into(),
            buffer: BufferDesc { width: 8, height: 8, fill: 1.0, mask: None },
            overlay: OverlayRect { min_x: 0.0, min_y: 0.0, width: 8.0, height: 8.0 },
            uv: UvRect::default(),
            brushes: vec![BrushDesc::Circle { diameter: 2, hardness: 1.0, strength: 1.0 }],
            regions,
            alpha_threshold: 0.1,
            required_ratio: 0.3,
            score_threshold: 5,
            timer_start: 59.0,
            timer_cap: 59.0,
            pause_policy: PausePolicy::FreezeClocks,
        }
    }

    fn region(name: &str, bounds: (u32, u32, u32, u32), effect: RegionEffect) -> RegionDesc {
        RegionDesc {
            name: name.into(),
            min_x: bounds.0,
            min_y: bounds.1,
            max_x: bounds.2,
            max_y: bounds.3,
            effect,
        }
    }

    fn session(regions: Vec<RegionDesc>) -> ScratchSession {
        ScratchSession::from_level(&test_level(regions), Path::new(".")).unwrap()
    }

    /// Scrub the pointer across a region until it clears or we give up.
    fn scrub(session: &mut ScratchSession, bounds: (u32, u32, u32, u32)) {
        for y in bounds.1..=bounds.3 {
            for x in bounds.0..=bounds.2 {
                session.pointer_sample(x as f32 + 0.5, y as f32 + 0.5, true);
            }
        }
    }

    #[test]
    fn test_scratch_clears_region_and_scores() {
        let mut s = session(vec![region(
            "coin",
            (0, 0, 3, 3),
            RegionEffect::Score { points: 5 },
        )]);
        s.update(1.0 / 60.0);
        scrub(&mut s, (0, 0, 3, 3));

        let events = s.take_events();
        let cleared: Vec<_> = events
            .iter()
            .filter(|e| matches!(e, GameEvent::RegionCleared { .. }))
            .collect();
        assert_eq!(cleared.len(), 1, "one region, one notification: {:?}", events);
        assert_eq!(s.score(), 5);
        assert!(events.iter().any(
            |e| matches!(e, GameEvent::ScoreChanged { score: 5, delta: 5 })
        ));
    }

    #[test]
    fn test_inactive_and_off_overlay_samples_do_nothing() {
        let mut s = session(vec![region(
            "coin",
            (0, 0, 7, 7),
            RegionEffect::Score { points: 5 },
        )]);
        s.pointer_sample(4.0, 4.0, false);
        s.pointer_sample(-3.0, 4.0, true);
        s.pointer_sample(4.0, 9.5, true);
        assert!(s.take_events().is_empty());
        assert_eq!(s.buffer().coverage(0.1), 0.0);
    }

    #[test]
    fn test_timer_region_extends_timer() {
        let mut s = session(vec![region(
            "hourglass",
            (0, 0, 3, 3),
            RegionEffect::Timer { delta: 5.0 },
        )]);
        // Burn some headroom so the bonus isn't clamped away.
        for _ in 0..600 {
            s.update(1.0 / 60.0);
        }
        let before = s.timer();
        scrub(&mut s, (0, 0, 3, 3));
        assert!((s.timer() - (before + 5.0)).abs() < 1e-3);
        assert!(s
            .take_events()
            .iter()
            .any(|e| matches!(e, GameEvent::TimerChanged { .. })));
    }

    #[test]
    fn test_reveal_pauses_then_awards() {
        let mut s = session(vec![region(
            "flower",
            (0, 0, 3, 3),
            RegionEffect::Reveal { points: 6, pause_ticks: 3 },
        )]);
        s.update(1.0); // tick 1
        scrub(&mut s, (0, 0, 3, 3));
        assert!(s.is_paused());
        let events = s.take_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::RevealStarted { .. })));
        assert_eq!(s.score(), 0, "award is deferred to the end of the pause");

        let timer_at_pause = s.timer();
        s.update(1.0); // tick 2: frozen
        s.update(1.0); // tick 3: frozen
        assert!(s.is_paused());
        assert_eq!(s.timer(), timer_at_pause, "FreezeClocks halts the countdown");

        s.update(1.0); // tick 4: continuation due, clocks resume
        assert!(!s.is_paused());
        assert_eq!(s.score(), 6);
        let events = s.take_events();
        assert!(events.iter().any(|e| matches!(e, GameEvent::RevealEnded { .. })));
        assert!((s.timer() - (timer_at_pause - 1.0)).abs() < 1e-3);
    }

    #[test]
    fn test_run_clocks_policy_keeps_counting() {
        let mut level = test_level(vec![region(
            "flower",
            (0, 0, 3, 3),
            RegionEffect::Reveal { points: 6, pause_ticks: 3 },
        )]);
        level.pause_policy = PausePolicy::RunClocks;
        let mut s = ScratchSession::from_level(&level, Path::new(".")).unwrap();

        s.update(1.0);
        scrub(&mut s, (0, 0, 3, 3));
        let timer_at_pause = s.timer();
        s.update(1.0);
        s.update(1.0);
        assert!((s.timer() - (timer_at_pause - 2.0)).abs() < 1e-3);
    }

    #[test]
    fn test_shield_swallows_reveal_pause() {
        let mut s = session(vec![region(
            "flower",
            (0, 0, 3, 3),
            RegionEffect::Reveal { points: 6, pause_ticks: 30 },
        )]);
        s.update(1.0);
        s.buy_shield(4);
        assert_eq!(s.score(), -4, "the purchase price always lands");
        s.update(1.0); // the flag becomes eligible on a later tick
        scrub(&mut s, (0, 0, 3, 3));
        assert!(!s.is_paused(), "ignored reveal must not pause");
        assert_eq!(s.score(), 2, "award applies immediately when ignored");
    }

    #[test]
    fn test_shield_swallows_hazard() {
        let mut s = session(vec![region("bomb", (0, 0, 3, 3), RegionEffect::EndGame)]);
        s.update(1.0);
        s.buy_shield(0);
        s.update(1.0);
        scrub(&mut s, (0, 0, 3, 3));
        assert!(!s.is_finished(), "shielded hazard must not end the game");
    }

    #[test]
    fn test_hazard_finishes_once() {
        let mut s = session(vec![
            region("bomb", (0, 0, 3, 3), RegionEffect::EndGame),
            region("coin", (4, 4, 7, 7), RegionEffect::Score { points: 5 }),
        ]);
        s.update(1.0);
        scrub(&mut s, (0, 0, 3, 3));
        assert!(s.is_finished());
        assert_eq!(s.outcome(), Some(GameOutcome::Lost), "0 < threshold 5");
        let finishes = s
            .take_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::GameFinished { .. }))
            .count();
        assert_eq!(finishes, 1);

        // Everything after the terminal transition is a no-op.
        scrub(&mut s, (4, 4, 7, 7));
        assert_eq!(s.change_score(100), 0);
        assert_eq!(s.change_timer(10.0), 0.0);
        s.update(1.0);
        assert!(s.take_events().is_empty());
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn test_timer_expiry_resolves_by_threshold() {
        let mut level = test_level(vec![]);
        level.timer_start = 2.0;
        level.score_threshold = 0;
        let mut s = ScratchSession::from_level(&level, Path::new(".")).unwrap();
        s.update(1.0);
        assert!(!s.is_finished());
        s.update(1.0);
        assert!(s.is_finished());
        assert_eq!(s.outcome(), Some(GameOutcome::Won), "0 >= threshold 0");
        let finishes = s
            .take_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::GameFinished { .. }))
            .count();
        assert_eq!(finishes, 1);
        s.update(1.0);
        assert!(s.take_events().is_empty());
    }

    #[test]
    fn test_doubler_pays_then_scales_both_signs() {
        let mut s = session(vec![region(
            "coin",
            (0, 0, 3, 3),
            RegionEffect::Score { points: 5 },
        )]);
        s.update(1.0);
        s.buy_doubler(7, 2.0, 10.0);
        assert_eq!(s.score(), -7, "price paid before the factor installs");
        scrub(&mut s, (0, 0, 3, 3));
        assert_eq!(s.score(), 3, "-7 + 5*2");
        assert_eq!(s.change_score(-2), -4, "negative deltas double too");
    }

    #[test]
    fn test_buy_time_trades_points_for_seconds() {
        let mut s = session(vec![]);
        for _ in 0..600 {
            s.update(1.0 / 60.0);
        }
        let before = s.timer();
        s.buy_time(5, 10.0);
        assert_eq!(s.score(), -5);
        assert!((s.timer() - (before + 10.0)).abs() < 1e-3);
    }

    #[test]
    fn test_brush_selection_clamps() {
        let mut s = session(vec![]);
        s.select_brush(500);
        // Still erodes with the last brush in the roster.
        s.pointer_sample(4.0, 4.0, true);
        assert!(s.buffer().coverage(0.99) > 0.0);
    }

    #[test]
    fn test_request_end_is_terminal() {
        let mut s = session(vec![]);
        s.update(1.0);
        s.request_end();
        assert!(s.is_finished());
        s.request_end();
        let finishes = s
            .take_events()
            .iter()
            .filter(|e| matches!(e, GameEvent::GameFinished { .. }))
            .count();
        assert_eq!(finishes, 1);
    }
}
