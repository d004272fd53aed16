//! Shared test utilities
//!
//! Hardware-free channel doubles: a scripted connector whose inbound events
//! are driven by the test body and whose sink records every payload.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use voxburst::Result;
use voxburst::audio::EncodedPayload;
use voxburst::channel::{ChannelConnector, ChannelEvent, ChannelSink};

/// Connector for one scripted session
pub struct ScriptedChannel {
    /// Everything the session sent through the sink
    pub sent: Arc<Mutex<Vec<EncodedPayload>>>,
    events: Mutex<Option<mpsc::Receiver<ChannelEvent>>>,
}

impl ScriptedChannel {
    /// Create a connector plus the handle that feeds its inbound events
    pub fn pair() -> (Arc<Self>, mpsc::Sender<ChannelEvent>) {
        let (event_tx, event_rx) = mpsc::channel(32);
        let channel = Arc::new(Self {
            sent: Arc::new(Mutex::new(Vec::new())),
            events: Mutex::new(Some(event_rx)),
        });
        (channel, event_tx)
    }

    /// Number of payloads sent so far
    pub fn sent_count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl ChannelConnector for ScriptedChannel {
    async fn connect(&self) -> Result<(Box<dyn ChannelSink>, mpsc::Receiver<ChannelEvent>)> {
        let events = self
            .events
            .lock()
            .unwrap()
            .take()
            .expect("scripted channel connected twice");
        let sink = RecordingSink {
            sent: Arc::clone(&self.sent),
        };
        Ok((Box::new(sink), events))
    }
}

/// Sink that records payloads in arrival order
struct RecordingSink {
    sent: Arc<Mutex<Vec<EncodedPayload>>>,
}

#[async_trait]
impl ChannelSink for RecordingSink {
    async fn send(&mut self, payload: EncodedPayload) -> Result<()> {
        self.sent.lock().unwrap().push(payload);
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Poll until `condition` holds, panicking after a generous timeout
pub async fn wait_until<F: Fn() -> bool>(what: &str, condition: F) {
    for _ in 0..2000 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("timed out waiting for {what}");
}
