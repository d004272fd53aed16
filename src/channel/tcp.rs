//! Newline-delimited JSON channel over TCP
//!
//! Connects to a transcription bridge endpoint. Each outbound line carries
//! one audio payload envelope; each inbound line carries a transcript or an
//! error. EOF maps to [`ChannelEvent::Closed`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, BufWriter};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ChannelConnector, ChannelEvent, ChannelSink};
use crate::audio::EncodedPayload;
use crate::{Error, Result};

/// Inbound event buffer; the session pump drains it continuously
const EVENT_BUFFER: usize = 64;

/// Session start envelope, sent once after the socket opens
#[derive(Serialize)]
struct StartMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    session: &'a str,
    #[serde(rename = "mimeType")]
    mime_type: &'static str,
}

/// Audio payload envelope
#[derive(Serialize)]
struct AudioMessage<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    audio: &'a EncodedPayload,
}

/// Inbound line shape; unknown fields are ignored
#[derive(Deserialize)]
struct InboundMessage {
    #[serde(default)]
    transcript: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Opens NDJSON-over-TCP channels to a transcription bridge
pub struct TcpConnector {
    endpoint: String,
}

impl TcpConnector {
    /// Create a connector for `host:port`
    #[must_use]
    pub const fn new(endpoint: String) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl ChannelConnector for TcpConnector {
    async fn connect(&self) -> Result<(Box<dyn ChannelSink>, mpsc::Receiver<ChannelEvent>)> {
        let stream = TcpStream::connect(&self.endpoint)
            .await
            .map_err(|e| Error::ChannelOpen(format!("{}: {e}", self.endpoint)))?;

        let session_id = Uuid::new_v4();
        let (read_half, write_half) = stream.into_split();
        let mut sink = TcpSink {
            writer: BufWriter::new(write_half),
        };

        sink.write_line(&StartMessage {
            kind: "start",
            session: &session_id.to_string(),
            mime_type: crate::audio::PCM_MIME_TYPE,
        })
        .await
        .map_err(|e| Error::ChannelOpen(e.to_string()))?;

        let (event_tx, event_rx) = mpsc::channel(EVENT_BUFFER);
        tokio::spawn(read_loop(read_half, event_tx, session_id));

        tracing::info!(endpoint = %self.endpoint, session = %session_id, "channel open");

        Ok((Box::new(sink), event_rx))
    }
}

/// Outbound half of a TCP channel
struct TcpSink {
    writer: BufWriter<OwnedWriteHalf>,
}

impl TcpSink {
    async fn write_line<T: Serialize>(&mut self, message: &T) -> Result<()> {
        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        self.writer
            .flush()
            .await
            .map_err(|e| Error::Channel(e.to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl ChannelSink for TcpSink {
    async fn send(&mut self, payload: EncodedPayload) -> Result<()> {
        self.write_line(&AudioMessage {
            kind: "audio",
            audio: &payload,
        })
        .await
    }

    async fn close(&mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|e| Error::Channel(e.to_string()))
    }
}

/// Read inbound lines until EOF or error, mapping them to channel events
async fn read_loop(
    read_half: OwnedReadHalf,
    event_tx: mpsc::Sender<ChannelEvent>,
    session_id: Uuid,
) {
    let mut lines = BufReader::new(read_half).lines();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                let Some(event) = parse_line(&line) else {
                    tracing::trace!(session = %session_id, line = %line, "ignoring channel line");
                    continue;
                };
                if event_tx.send(event).await.is_err() {
                    // Receiver gone: the session released the channel
                    return;
                }
            }
            Ok(None) => {
                tracing::debug!(session = %session_id, "channel closed by remote");
                let _ = event_tx.send(ChannelEvent::Closed).await;
                return;
            }
            Err(e) => {
                tracing::warn!(session = %session_id, error = %e, "channel read failed");
                let _ = event_tx.send(ChannelEvent::Error(e.to_string())).await;
                return;
            }
        }
    }
}

/// Map one inbound line to an event; `None` for unrecognized lines
fn parse_line(line: &str) -> Option<ChannelEvent> {
    let message: InboundMessage = serde_json::from_str(line).ok()?;
    if let Some(cause) = message.error {
        return Some(ChannelEvent::Error(cause));
    }
    message.transcript.map(ChannelEvent::Transcript)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_transcript_lines() {
        let event = parse_line(r#"{"transcript": "bo bo"}"#);
        assert_eq!(event, Some(ChannelEvent::Transcript("bo bo".to_string())));
    }

    #[test]
    fn parses_error_lines() {
        let event = parse_line(r#"{"error": "quota exceeded"}"#);
        assert_eq!(
            event,
            Some(ChannelEvent::Error("quota exceeded".to_string()))
        );
    }

    #[test]
    fn error_takes_precedence_over_transcript() {
        let event = parse_line(r#"{"transcript": "bo", "error": "late failure"}"#);
        assert!(matches!(event, Some(ChannelEvent::Error(_))));
    }

    #[test]
    fn ignores_unrecognized_lines() {
        assert_eq!(parse_line(r#"{"keepalive": true}"#), None);
        assert_eq!(parse_line("not json"), None);
    }

    #[test]
    fn audio_envelope_serializes_payload() {
        let payload = crate::audio::encode(&crate::audio::AudioFrame::new(
            vec![0.5; 8],
            crate::audio::TARGET_SAMPLE_RATE,
        ));
        let json = serde_json::to_string(&AudioMessage {
            kind: "audio",
            audio: &payload,
        })
        .unwrap();
        assert!(json.contains("\"type\":\"audio\""));
        assert!(json.contains("\"mimeType\":\"audio/pcm;rate=16000\""));
    }
}
