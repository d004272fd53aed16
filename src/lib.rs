//! voxburst - Voice-reactive combo game core
//!
//! This library provides the core of the voxburst game:
//! - Audio capture, resampling, and wire encoding
//! - Streaming session lifecycle around an opaque transcription channel
//! - Trigger-word spotting, combo scoring, and particle bursts
//! - A read-only snapshot stream for renderers
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                   Microphone                         │
//! └────────────────────┬────────────────────────────────┘
//!                      │ frames
//! ┌────────────────────▼────────────────────────────────┐
//! │                voxburst Engine                       │
//! │  Encode │ Session │ Spotter │ Score │ Particles     │
//! └──────┬──────────────────────────────────────┬───────┘
//!        │ audio payloads            transcripts │
//! ┌──────▼──────────────────────────────────────┴───────┐
//! │        Transcription bridge (opaque channel)         │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod audio;
pub mod channel;
pub mod config;
pub mod engine;
pub mod error;
pub mod game;
pub mod session;

pub use api::ApiServer;
pub use audio::{AudioCapture, AudioFrame, EncodedPayload, encode, samples_to_wav};
pub use channel::{ChannelConnector, ChannelEvent, ChannelSink, TcpConnector};
pub use config::Config;
pub use engine::{Engine, Snapshot};
pub use error::{Error, Result};
pub use game::{GameState, GameView, KeywordSpotter, Particle, ParticleField, ScoreEngine};
pub use session::{CaptureMode, Session, SessionState};
