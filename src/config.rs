//! Configuration management for voxburst
//!
//! Layered: built-in defaults → optional TOML file → environment overrides.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Environment variable overriding the channel endpoint
const ENV_ENDPOINT: &str = "VOXBURST_ENDPOINT";

/// Environment variable overriding the trigger word
const ENV_TRIGGER: &str = "VOXBURST_TRIGGER";

/// Environment variable overriding the snapshot server port
const ENV_PORT: &str = "VOXBURST_PORT";

/// voxburst configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Streaming channel configuration
    pub channel: ChannelConfig,

    /// Trigger word and scoring configuration
    pub game: GameConfig,

    /// Particle field tuning
    pub particles: ParticleConfig,

    /// Snapshot server configuration
    pub server: ServerConfig,
}

/// Streaming channel configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChannelConfig {
    /// Transcription bridge endpoint (`host:port`)
    pub endpoint: String,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            endpoint: "127.0.0.1:8090".to_string(),
        }
    }
}

/// Trigger word and scoring configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GameConfig {
    /// Canonical trigger word
    pub trigger_word: String,

    /// Known homophone/mis-transcription variants, counted like the
    /// canonical word
    pub variants: Vec<String>,

    /// Combo continuation window in milliseconds
    pub combo_window_ms: u64,

    /// Base points per matched occurrence (multiplied by the combo)
    pub points_per_match: u64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            trigger_word: "bo".to_string(),
            variants: ["bó", "bow", "boh", "beau"]
                .map(String::from)
                .to_vec(),
            combo_window_ms: 2000,
            points_per_match: 100,
        }
    }
}

/// Particle field tuning
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ParticleConfig {
    /// Burst anchor point (screen center in render coordinates)
    pub anchor: (f32, f32),

    /// Spawn jitter radius around the anchor
    pub jitter_radius: f32,

    /// Palette particles draw their color tag from
    pub palette: Vec<String>,

    /// Render tick cadence in Hz
    pub tick_hz: u32,

    /// Particles per burst before the combo bonus
    pub base_burst: u32,

    /// Cap on the combo-derived burst bonus
    pub burst_combo_cap: u32,
}

impl Default for ParticleConfig {
    fn default() -> Self {
        Self {
            anchor: (480.0, 270.0),
            jitter_radius: 20.0,
            palette: ["#ff5252", "#ffd740", "#64ffda", "#448aff", "#e040fb", "#ffffff"]
                .map(String::from)
                .to_vec(),
            tick_hz: 60,
            base_burst: 5,
            burst_combo_cap: 10,
        }
    }
}

/// Snapshot server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    /// Port the snapshot server listens on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 18791 }
    }
}

impl Config {
    /// Load configuration from the default file location plus environment
    /// overrides
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be read or parsed,
    /// or if the resulting configuration is invalid
    pub fn load() -> Result<Self> {
        let mut config = match Self::config_path() {
            Some(path) if path.exists() => {
                let raw = std::fs::read_to_string(&path)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                toml::from_str(&raw)?
            }
            _ => Self::default(),
        };

        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a TOML string plus environment overrides
    ///
    /// # Errors
    ///
    /// Returns error if the TOML is malformed or the configuration invalid
    pub fn from_toml(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file path (`~/.config/voxburst/voxburst.toml` on Linux)
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "omni", "voxburst")
            .map(|dirs| dirs.config_dir().join("voxburst.toml"))
    }

    /// All trigger spellings: canonical word first, then variants
    #[must_use]
    pub fn trigger_spellings(&self) -> Vec<String> {
        let mut spellings = Vec::with_capacity(1 + self.game.variants.len());
        spellings.push(self.game.trigger_word.clone());
        spellings.extend(self.game.variants.iter().cloned());
        spellings
    }

    fn apply_env(&mut self) {
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.channel.endpoint = endpoint;
        }
        if let Ok(trigger) = std::env::var(ENV_TRIGGER) {
            self.game.trigger_word = trigger;
        }
        if let Some(port) = std::env::var(ENV_PORT)
            .ok()
            .and_then(|s| s.parse().ok())
        {
            self.server.port = port;
        }
    }

    fn validate(&self) -> Result<()> {
        if self.game.trigger_word.trim().is_empty() {
            return Err(Error::Config("trigger word must not be empty".to_string()));
        }
        if self.particles.tick_hz == 0 {
            return Err(Error::Config("tick_hz must be at least 1".to_string()));
        }
        if self.particles.palette.is_empty() {
            return Err(Error::Config("particle palette must not be empty".to_string()));
        }
        if self.channel.endpoint.trim().is_empty() {
            return Err(Error::Config("channel endpoint must not be empty".to_string()));
        }
        Ok(())
    }
}
