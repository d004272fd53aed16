//! Game logic: trigger spotting, scoring, and particle effects

mod particles;
mod score;
mod spotter;

pub use particles::{GRAVITY, Particle, ParticleField};
pub use score::{GameState, GameView, ScoreEngine, TriggerOutcome};
pub use spotter::KeywordSpotter;
