//! Streaming transcription channel boundary
//!
//! The remote service is consumed as an opaque bidirectional channel: audio
//! payloads go out, transcript/closed/error events come back. Everything
//! about the vendor wire protocol stays behind [`ChannelConnector`].

mod tcp;

pub use tcp::TcpConnector;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::Result;
use crate::audio::EncodedPayload;

/// Inbound event delivered by the streaming channel
///
/// Events are dispatched in delivery order; the session manager never
/// reorders or coalesces them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A transcription result
    Transcript(String),
    /// The remote side closed the channel
    Closed,
    /// The channel failed after opening
    Error(String),
}

/// Outbound half of an open channel
#[async_trait]
pub trait ChannelSink: Send {
    /// Send one encoded audio payload
    ///
    /// # Errors
    ///
    /// Returns error if the channel rejects the payload or has closed
    async fn send(&mut self, payload: EncodedPayload) -> Result<()>;

    /// Close the channel
    ///
    /// # Errors
    ///
    /// Returns error if the close handshake fails; the channel is
    /// considered closed regardless
    async fn close(&mut self) -> Result<()>;
}

/// Opens streaming channels to the transcription service
#[async_trait]
pub trait ChannelConnector: Send + Sync {
    /// Open the channel
    ///
    /// Returns the outbound sink plus the inbound event stream. A returned
    /// `Ok` is the open confirmation: the sink accepts payloads from this
    /// point on.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::ChannelOpen`] if the channel cannot be
    /// established
    async fn connect(&self) -> Result<(Box<dyn ChannelSink>, mpsc::Receiver<ChannelEvent>)>;
}
