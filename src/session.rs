//! Streaming session lifecycle
//!
//! Owns the `Disconnected → Connecting → Connected → {Disconnected, Error}`
//! state machine around the transcription channel, the ordered outbound
//! frame queue, and the inbound event pump. All other components only read
//! the state through the watch channel.

use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::audio::{AudioCapture, AudioFrame, EncodedPayload, encode};
use crate::channel::{ChannelConnector, ChannelEvent, ChannelSink};
use crate::{Error, Result};

/// Lifecycle state of the streaming session
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SessionState {
    /// No channel, no capture
    Disconnected,
    /// Channel handshake and capture acquisition in progress
    Connecting,
    /// Channel open, frames flowing
    Connected,
    /// Terminal failure; requires an explicit new connect
    Error {
        /// Human-readable cause
        message: String,
    },
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Error { message } => write!(f, "error: {message}"),
        }
    }
}

/// Whether `connect` should acquire the microphone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureMode {
    /// Open the default input device and stream frames into the session
    Device,
    /// No capture; frames are fed externally (headless and test runs)
    Disabled,
}

/// Resources held while a connection is live
struct Connection {
    capture: Option<AudioCapture>,
    sender_task: JoinHandle<()>,
    pump_task: JoinHandle<()>,
}

impl Connection {
    /// Tear everything down; safe to run at most once per connection
    fn release(mut self) {
        if let Some(mut capture) = self.capture.take() {
            capture.stop();
        }
        self.sender_task.abort();
        self.pump_task.abort();
    }
}

/// Streaming session manager
pub struct Session {
    state_tx: watch::Sender<SessionState>,
    transcript_tx: mpsc::UnboundedSender<String>,
    /// Installed for the whole Connecting+Connected span so capture frames
    /// queue in order even before the handshake completes
    outbound_tx: StdMutex<Option<mpsc::UnboundedSender<EncodedPayload>>>,
    conn: Mutex<Option<Connection>>,
}

impl Session {
    /// Create a session plus the stream of non-empty transcripts it forwards
    #[must_use]
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (state_tx, _) = watch::channel(SessionState::Disconnected);
        let (transcript_tx, transcript_rx) = mpsc::unbounded_channel();

        let session = Arc::new(Self {
            state_tx,
            transcript_tx,
            outbound_tx: StdMutex::new(None),
            conn: Mutex::new(None),
        });

        (session, transcript_rx)
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Subscribe to state changes
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Open the channel (and, in [`CaptureMode::Device`], the microphone)
    ///
    /// Transitions `Disconnected → Connecting → Connected`. A failure at any
    /// step releases whatever was acquired and leaves the session in
    /// `Error` with a human-readable cause.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if the capture device refuses,
    /// [`Error::ChannelOpen`] if the channel cannot be established
    pub async fn connect(
        self: &Arc<Self>,
        connector: &dyn ChannelConnector,
        capture_mode: CaptureMode,
    ) -> Result<()> {
        let mut conn = self.conn.lock().await;

        match self.state() {
            SessionState::Connecting | SessionState::Connected => {
                tracing::warn!(state = %self.state(), "connect ignored");
                return Ok(());
            }
            SessionState::Disconnected | SessionState::Error { .. } => {}
        }

        self.set_state(SessionState::Connecting);

        // Queue first: frames captured during the handshake must buffer in
        // arrival order rather than drop
        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        self.install_outbound(Some(outbound_tx));

        let capture = match capture_mode {
            CaptureMode::Device => {
                let session = Arc::clone(self);
                match AudioCapture::start(move |frame| session.send(&frame)) {
                    Ok(capture) => Some(capture),
                    Err(e) => {
                        self.install_outbound(None);
                        self.set_state(SessionState::Error {
                            message: e.to_string(),
                        });
                        return Err(e);
                    }
                }
            }
            CaptureMode::Disabled => None,
        };

        let (sink, event_rx) = match connector.connect().await {
            Ok(open) => open,
            Err(e) => {
                drop(capture);
                self.install_outbound(None);
                self.set_state(SessionState::Error {
                    message: e.to_string(),
                });
                return Err(e);
            }
        };

        let sender_task = tokio::spawn(send_loop(sink, outbound_rx, Arc::clone(self)));
        let pump_task = tokio::spawn(pump_loop(event_rx, Arc::clone(self)));

        *conn = Some(Connection {
            capture,
            sender_task,
            pump_task,
        });

        self.set_state(SessionState::Connected);
        Ok(())
    }

    /// Encode and enqueue one capture frame
    ///
    /// Non-blocking; safe to call from the capture thread. Frames arriving
    /// while no session is open are dropped.
    pub fn send(&self, frame: &AudioFrame) {
        let payload = encode(frame);
        if payload.is_empty() {
            return;
        }

        if let Ok(guard) = self.outbound_tx.lock() {
            match guard.as_ref() {
                Some(tx) => {
                    if tx.send(payload).is_err() {
                        tracing::debug!("frame dropped, session tearing down");
                    }
                }
                None => tracing::trace!("frame dropped, no session"),
            }
        }
    }

    /// Close the channel and release every resource
    ///
    /// Always leaves the session `Disconnected` (including from `Error`);
    /// idempotent and safe from any state.
    pub async fn disconnect(&self) {
        self.install_outbound(None);

        if let Some(connection) = self.conn.lock().await.take() {
            connection.release();
        }

        if self.state() != SessionState::Disconnected {
            self.set_state(SessionState::Disconnected);
        }
    }

    /// Forced release after a runtime channel failure
    async fn fail(&self, message: String) {
        self.install_outbound(None);

        if let Some(connection) = self.conn.lock().await.take() {
            connection.release();
        }

        self.set_state(SessionState::Error { message });
    }

    fn install_outbound(&self, tx: Option<mpsc::UnboundedSender<EncodedPayload>>) {
        if let Ok(mut guard) = self.outbound_tx.lock() {
            *guard = tx;
        }
    }

    fn set_state(&self, next: SessionState) {
        let previous = self.state();
        if previous == next {
            return;
        }
        tracing::info!(from = %previous, to = %next, "session state");
        let _ = self.state_tx.send(next);
    }
}

/// Drain the outbound queue into the sink, preserving order
///
/// Send failures during an intentional teardown are logged and swallowed;
/// failures while connected flip the session into `Error`.
async fn send_loop(
    mut sink: Box<dyn ChannelSink>,
    mut outbound_rx: mpsc::UnboundedReceiver<EncodedPayload>,
    session: Arc<Session>,
) {
    while let Some(payload) = outbound_rx.recv().await {
        if let Err(e) = sink.send(payload).await {
            if session.state() == SessionState::Disconnected {
                tracing::debug!(error = %e, "send after disconnect ignored");
            } else {
                tracing::error!(error = %e, "channel send failed");
                session.fail(e.to_string()).await;
            }
            return;
        }
    }

    // Queue closed by disconnect: best-effort close handshake
    if let Err(e) = sink.close().await {
        tracing::debug!(error = %e, "channel close failed");
    }
}

/// Dispatch inbound channel events in delivery order
async fn pump_loop(mut event_rx: mpsc::Receiver<ChannelEvent>, session: Arc<Session>) {
    while let Some(event) = event_rx.recv().await {
        match event {
            ChannelEvent::Transcript(text) => {
                if text.trim().is_empty() {
                    continue;
                }
                tracing::debug!(transcript = %text, "transcript received");
                if session.transcript_tx.send(text).is_err() {
                    return;
                }
            }
            ChannelEvent::Closed => {
                tracing::info!("channel closed by remote");
                session.disconnect().await;
                return;
            }
            ChannelEvent::Error(cause) => {
                tracing::error!(cause = %cause, "channel error");
                session.fail(Error::Channel(cause).to_string()).await;
                return;
            }
        }
    }
}
