//! Particle burst simulation
//!
//! A retained population of effect particles advanced once per render
//! tick: ballistic motion under constant gravity, spin, and life decay.
//! Particle lifetime is fully decoupled from session and game state.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use crate::config::ParticleConfig;

/// Downward acceleration applied to `vy` every tick
pub const GRAVITY: f32 = 0.5;

/// Upward bias subtracted from `vy` at spawn
const UPWARD_BIAS: f32 = 5.0;

/// Life at or below this is dead; absorbs float dust from repeated decay
/// subtraction so a 0.02 decay retires at exactly tick 50
const LIFE_EPSILON: f32 = 1e-6;

/// One effect particle
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Particle {
    /// Unique id from the field's monotonic counter
    pub id: u64,
    pub x: f32,
    pub y: f32,
    pub vx: f32,
    pub vy: f32,
    /// Degrees
    pub rotation: f32,
    /// Degrees per tick
    #[serde(rename = "angularVelocity")]
    pub angular_velocity: f32,
    pub scale: f32,
    /// Palette tag
    pub color: String,
    /// Remaining life in (0, 1]
    pub life: f32,
    /// Life lost per tick
    #[serde(rename = "decayRate")]
    pub decay_rate: f32,
}

/// The live particle population
pub struct ParticleField {
    particles: Vec<Particle>,
    next_id: u64,
    rng: StdRng,
    anchor: (f32, f32),
    jitter_radius: f32,
    palette: Vec<String>,
}

impl ParticleField {
    /// Create an empty field
    #[must_use]
    pub fn new(config: &ParticleConfig) -> Self {
        Self::with_rng(config, StdRng::from_entropy())
    }

    /// Create an empty field with a fixed seed (deterministic tests)
    #[must_use]
    pub fn with_seed(config: &ParticleConfig, seed: u64) -> Self {
        Self::with_rng(config, StdRng::seed_from_u64(seed))
    }

    fn with_rng(config: &ParticleConfig, rng: StdRng) -> Self {
        Self {
            particles: Vec::new(),
            next_id: 0,
            rng,
            anchor: config.anchor,
            jitter_radius: config.jitter_radius,
            palette: config.palette.clone(),
        }
    }

    /// Spawn one burst of `count` particles around the anchor
    pub fn spawn(&mut self, count: u32) {
        self.particles.reserve(count as usize);

        for _ in 0..count {
            self.next_id += 1;

            let origin_angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let origin_radius = self.rng.gen_range(0.0..=self.jitter_radius);
            let velocity_angle = self.rng.gen_range(0.0..std::f32::consts::TAU);
            let velocity_magnitude = self.rng.gen_range(5.0..=15.0);
            let color = self
                .palette
                .choose(&mut self.rng)
                .cloned()
                .unwrap_or_default();

            self.particles.push(Particle {
                id: self.next_id,
                x: self.anchor.0 + origin_angle.cos() * origin_radius,
                y: self.anchor.1 + origin_angle.sin() * origin_radius,
                vx: velocity_angle.cos() * velocity_magnitude,
                vy: velocity_angle.sin() * velocity_magnitude - UPWARD_BIAS,
                rotation: self.rng.gen_range(0.0..360.0),
                angular_velocity: self.rng.gen_range(-10.0..=10.0),
                scale: self.rng.gen_range(2.0..=5.0),
                color,
                life: 1.0,
                decay_rate: self.rng.gen_range(0.01..=0.03),
            });
        }

        tracing::trace!(count, population = self.particles.len(), "burst spawned");
    }

    /// Advance every particle one tick, then retire the dead
    ///
    /// Position integrates the pre-gravity velocity; retirement happens in
    /// the same tick life crosses zero. An empty field is a no-op.
    pub fn step(&mut self) {
        if self.particles.is_empty() {
            return;
        }

        for p in &mut self.particles {
            p.x += p.vx;
            p.y += p.vy;
            p.vy += GRAVITY;
            p.rotation += p.angular_velocity;
            p.life -= p.decay_rate;
        }

        self.particles.retain(|p| p.life > LIFE_EPSILON);
    }

    /// The live population, unordered for simulation purposes
    #[must_use]
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// Number of live particles
    #[must_use]
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Whether the field is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }
}
