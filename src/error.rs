//! Error types for voxburst

use thiserror::Error;

/// Result type alias for voxburst operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in voxburst
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Capture device refused or unavailable
    #[error("capture permission denied: {0}")]
    PermissionDenied(String),

    /// Streaming channel could not be opened
    #[error("channel open failed: {0}")]
    ChannelOpen(String),

    /// Streaming channel failed after a successful open
    #[error("channel error: {0}")]
    Channel(String),

    /// Audio error
    #[error("audio error: {0}")]
    Audio(String),

    /// Payload encoding error
    #[error("encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}
