//! Combo and score tracking
//!
//! Every trigger call is a pure state transition: points and combo are
//! updated from the match count and the time since the previous trigger,
//! and a particle-burst intent is emitted for the simulator.

use std::time::{Duration, Instant};

use serde::Serialize;

use crate::config::{GameConfig, ParticleConfig};

/// Score, combo, and trigger timing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameState {
    /// Accumulated points
    pub score: u64,
    /// Current combo multiplier, never below 1
    pub combo: u32,
    /// Highest combo reached this session
    pub max_combo: u32,
    /// When the last trigger landed
    pub last_trigger: Option<Instant>,
}

impl GameState {
    /// Fresh state: zero score, combo 1
    #[must_use]
    pub const fn new() -> Self {
        Self {
            score: 0,
            combo: 1,
            max_combo: 1,
            last_trigger: None,
        }
    }
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

/// Serializable projection of [`GameState`] for render snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GameView {
    pub score: u64,
    pub combo: u32,
    #[serde(rename = "maxCombo")]
    pub max_combo: u32,
}

/// Result of one trigger call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerOutcome {
    /// Points awarded by this call
    pub points: u64,
    /// Combo after the call
    pub combo: u32,
    /// Particle bursts to spawn, one per matched occurrence
    pub bursts: Vec<u32>,
}

/// Consumes match counts and owns the game state
pub struct ScoreEngine {
    state: GameState,
    combo_window: Duration,
    points_per_match: u64,
    base_burst: u32,
    burst_combo_cap: u32,
}

impl ScoreEngine {
    /// Create an engine from game and particle tuning
    #[must_use]
    pub const fn new(game: &GameConfig, particles: &ParticleConfig) -> Self {
        Self {
            state: GameState::new(),
            combo_window: Duration::from_millis(game.combo_window_ms),
            points_per_match: game.points_per_match,
            base_burst: particles.base_burst,
            burst_combo_cap: particles.burst_combo_cap,
        }
    }

    /// Current state
    #[must_use]
    pub const fn state(&self) -> &GameState {
        &self.state
    }

    /// Snapshot projection of the current state
    #[must_use]
    pub const fn view(&self) -> GameView {
        GameView {
            score: self.state.score,
            combo: self.state.combo,
            max_combo: self.state.max_combo,
        }
    }

    /// Apply one trigger with `match_count` occurrences at `now`
    ///
    /// A trigger within the combo window extends the streak by the match
    /// count; at or past the window boundary the streak resets to 1 (the
    /// match count still scores, it just no longer compounds). Burst sizes
    /// use the pre-update combo: the explosion reflects the streak the
    /// player had going into this trigger.
    pub fn trigger(&mut self, match_count: u32, now: Instant) -> TriggerOutcome {
        if match_count == 0 {
            return TriggerOutcome {
                points: 0,
                combo: self.state.combo,
                bursts: Vec::new(),
            };
        }

        let previous_combo = self.state.combo;
        let continued = self
            .state
            .last_trigger
            .is_some_and(|last| now.duration_since(last) < self.combo_window);

        let combo = if continued {
            previous_combo + match_count
        } else {
            1
        };

        let points = u64::from(match_count) * self.points_per_match * u64::from(combo);
        self.state.score += points;
        self.state.combo = combo;
        self.state.max_combo = self.state.max_combo.max(combo);
        self.state.last_trigger = Some(now);

        let burst_size = self.base_burst + previous_combo.min(self.burst_combo_cap);
        let bursts = vec![burst_size; match_count as usize];

        tracing::debug!(
            match_count,
            points,
            combo,
            score = self.state.score,
            "trigger scored"
        );

        TriggerOutcome {
            points,
            combo,
            bursts,
        }
    }

    /// Drop the streak and timing without touching the score
    pub fn reset_streak(&mut self) {
        self.state.combo = 1;
        self.state.last_trigger = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> ScoreEngine {
        ScoreEngine::new(&GameConfig::default(), &ParticleConfig::default())
    }

    #[test]
    fn first_trigger_scores_at_combo_one() {
        let mut engine = engine();
        let outcome = engine.trigger(1, Instant::now());

        assert_eq!(outcome.points, 100);
        assert_eq!(outcome.combo, 1);
        assert_eq!(engine.state().score, 100);
    }

    #[test]
    fn scoring_walkthrough_matches_reference() {
        let mut engine = engine();
        let t0 = Instant::now();

        let first = engine.trigger(1, t0);
        assert_eq!(engine.state().score, 100);
        assert_eq!(first.combo, 1);

        let second = engine.trigger(2, t0 + Duration::from_millis(500));
        assert_eq!(second.combo, 3);
        assert_eq!(second.points, 600);
        assert_eq!(engine.state().score, 700);
        assert_eq!(engine.state().max_combo, 3);
    }

    #[test]
    fn trigger_within_window_extends_combo() {
        let mut engine = engine();
        let t0 = Instant::now();

        engine.trigger(1, t0);
        let outcome = engine.trigger(1, t0 + Duration::from_millis(1999));
        assert_eq!(outcome.combo, 2);
    }

    #[test]
    fn trigger_past_window_resets_combo() {
        let mut engine = engine();
        let t0 = Instant::now();

        engine.trigger(3, t0);
        let outcome = engine.trigger(2, t0 + Duration::from_millis(2001));
        assert_eq!(outcome.combo, 1);
        // the reset branch discards the match count for the multiplier
        assert_eq!(outcome.points, 200);
    }

    #[test]
    fn window_boundary_resets_combo() {
        let mut engine = engine();
        let t0 = Instant::now();

        engine.trigger(1, t0);
        let outcome = engine.trigger(1, t0 + Duration::from_millis(2000));
        assert_eq!(outcome.combo, 1, "exactly 2000ms must reset");
    }

    #[test]
    fn max_combo_survives_reset() {
        let mut engine = engine();
        let t0 = Instant::now();

        engine.trigger(4, t0);
        engine.trigger(1, t0 + Duration::from_millis(100));
        assert_eq!(engine.state().max_combo, 5);

        engine.trigger(1, t0 + Duration::from_secs(10));
        assert_eq!(engine.state().combo, 1);
        assert_eq!(engine.state().max_combo, 5);
    }

    #[test]
    fn bursts_use_pre_update_combo() {
        let mut engine = engine();
        let t0 = Instant::now();

        // combo 1 going in: 5 + min(1, 10) = 6 per occurrence
        let first = engine.trigger(2, t0);
        assert_eq!(first.bursts, vec![6, 6]);
        assert_eq!(first.combo, 1);

        // combo 1 going in again, new combo 3 — burst still sized from 1
        let second = engine.trigger(2, t0 + Duration::from_millis(200));
        assert_eq!(second.combo, 3);
        assert_eq!(second.bursts, vec![6, 6]);

        // combo 3 going in: 5 + min(3, 10) = 8
        let third = engine.trigger(1, t0 + Duration::from_millis(400));
        assert_eq!(third.bursts, vec![8]);
    }

    #[test]
    fn burst_combo_bonus_is_capped() {
        let mut engine = engine();
        let t0 = Instant::now();

        engine.trigger(20, t0);
        let outcome = engine.trigger(1, t0 + Duration::from_millis(100));
        // combo 21 going in, capped at 10: 5 + 10 = 15
        assert_eq!(outcome.bursts, vec![15]);
    }

    #[test]
    fn zero_matches_is_a_no_op() {
        let mut engine = engine();
        engine.trigger(2, Instant::now());
        let before = engine.state().clone();

        let outcome = engine.trigger(0, Instant::now());
        assert_eq!(outcome.points, 0);
        assert!(outcome.bursts.is_empty());
        assert_eq!(*engine.state(), before);
    }
}
