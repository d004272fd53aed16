//! Game engine composition
//!
//! Wires the session's transcript stream into the spotter and score engine,
//! advances the particle field on the render tick, and publishes a fresh
//! read-only snapshot every tick for presentation. Three independent
//! sources drive it: capture frames (handled inside the session), inbound
//! channel events, and the render interval.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::channel::{ChannelConnector, TcpConnector};
use crate::config::Config;
use crate::game::{GameView, KeywordSpotter, Particle, ParticleField, ScoreEngine};
use crate::session::{CaptureMode, Session, SessionState};
use crate::{Error, Result};

/// Read-only render snapshot, replaced wholesale every tick
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// Monotonic tick counter
    pub tick: u64,
    /// When this snapshot was produced
    pub timestamp: DateTime<Utc>,
    /// Session lifecycle state
    pub session: SessionState,
    /// Score/combo projection
    pub game: GameView,
    /// Live particle population
    pub particles: Vec<Particle>,
}

impl Snapshot {
    fn initial() -> Self {
        Self {
            tick: 0,
            timestamp: Utc::now(),
            session: SessionState::Disconnected,
            game: GameView {
                score: 0,
                combo: 1,
                max_combo: 1,
            },
            particles: Vec::new(),
        }
    }
}

/// The voice-reactive game engine
pub struct Engine {
    config: Config,
    session: Arc<Session>,
    transcript_rx: mpsc::UnboundedReceiver<String>,
    spotter: KeywordSpotter,
    score: ScoreEngine,
    field: ParticleField,
    snapshot_tx: watch::Sender<Snapshot>,
    pending_bursts: VecDeque<u32>,
    tick: u64,
}

impl Engine {
    /// Build an engine from configuration
    ///
    /// # Errors
    ///
    /// Returns error if the trigger spellings do not compile
    pub fn new(config: Config) -> Result<Self> {
        let spotter = KeywordSpotter::new(&config.trigger_spellings())?;
        let score = ScoreEngine::new(&config.game, &config.particles);
        let field = ParticleField::new(&config.particles);
        let (session, transcript_rx) = Session::new();
        let (snapshot_tx, _) = watch::channel(Snapshot::initial());

        tracing::debug!(
            trigger = %config.game.trigger_word,
            tick_hz = config.particles.tick_hz,
            "engine initialized"
        );

        Ok(Self {
            config,
            session,
            transcript_rx,
            spotter,
            score,
            field,
            snapshot_tx,
            pending_bursts: VecDeque::new(),
            tick: 0,
        })
    }

    /// Handle to the session manager
    #[must_use]
    pub fn session(&self) -> Arc<Session> {
        Arc::clone(&self.session)
    }

    /// Subscribe to render snapshots
    #[must_use]
    pub fn snapshot_rx(&self) -> watch::Receiver<Snapshot> {
        self.snapshot_tx.subscribe()
    }

    /// Connect to the configured transcription bridge with the microphone
    ///
    /// # Errors
    ///
    /// Returns error if capture or the channel cannot be opened; the
    /// session is left in `Error` with the cause
    pub async fn connect(&self) -> Result<()> {
        let connector = TcpConnector::new(self.config.channel.endpoint.clone());
        self.session
            .connect(&connector, CaptureMode::Device)
            .await
    }

    /// Connect through a caller-supplied channel connector
    ///
    /// # Errors
    ///
    /// Returns error if the connection fails
    pub async fn connect_with(
        &self,
        connector: &dyn ChannelConnector,
        capture_mode: CaptureMode,
    ) -> Result<()> {
        self.session.connect(connector, capture_mode).await
    }

    /// Run until ctrl-c
    ///
    /// # Errors
    ///
    /// Returns error if the tick cadence is invalid
    pub async fn run(self) -> Result<()> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                let _ = shutdown_tx.send(()).await;
            }
        });
        self.run_with_shutdown(shutdown_rx).await
    }

    /// Run until the shutdown channel fires
    ///
    /// # Errors
    ///
    /// Returns error if the tick cadence is invalid
    pub async fn run_with_shutdown(
        mut self,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) -> Result<()> {
        let period = tick_period(self.config.particles.tick_hz)?;
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        tracing::info!(
            tick_hz = self.config.particles.tick_hz,
            "engine running"
        );

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                maybe_text = self.transcript_rx.recv() => {
                    if let Some(text) = maybe_text {
                        self.handle_transcript(&text);
                    }
                }
                _ = ticker.tick() => self.advance_tick(),
            }
        }

        self.session.disconnect().await;
        Ok(())
    }

    /// Score one transcript and queue its particle bursts
    fn handle_transcript(&mut self, text: &str) {
        let matches = self.spotter.spot(text);
        if matches == 0 {
            return;
        }

        let match_count = u32::try_from(matches).unwrap_or(u32::MAX);
        let outcome = self.score.trigger(match_count, Instant::now());

        tracing::info!(
            matches = match_count,
            points = outcome.points,
            combo = outcome.combo,
            score = self.score.state().score,
            "trigger"
        );

        self.pending_bursts.extend(outcome.bursts);
    }

    /// One render tick: spawn queued bursts, advance, publish
    fn advance_tick(&mut self) {
        while let Some(count) = self.pending_bursts.pop_front() {
            self.field.spawn(count);
        }

        self.field.step();
        self.tick += 1;

        let _ = self.snapshot_tx.send(Snapshot {
            tick: self.tick,
            timestamp: Utc::now(),
            session: self.session.state(),
            game: self.score.view(),
            particles: self.field.particles().to_vec(),
        });
    }
}

/// Render tick period for a cadence in Hz
fn tick_period(tick_hz: u32) -> Result<Duration> {
    if tick_hz == 0 {
        return Err(Error::Config("tick_hz must be at least 1".to_string()));
    }
    Ok(Duration::from_secs_f64(1.0 / f64::from(tick_hz)))
}
