use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voxburst::audio::{AudioCapture, samples_to_wav};
use voxburst::{ApiServer, Config, Engine, KeywordSpotter};

/// voxburst - shout the trigger word, chain combos, burst particles
#[derive(Parser)]
#[command(name = "voxburst", version, about)]
struct Cli {
    /// Transcription bridge endpoint (host:port)
    #[arg(long, env = "VOXBURST_ENDPOINT")]
    endpoint: Option<String>,

    /// Snapshot server port
    #[arg(long, env = "VOXBURST_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Run without acquiring the microphone (frames must come from elsewhere)
    #[arg(long)]
    no_capture: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,

        /// Write the captured audio to a WAV file afterwards
        #[arg(long)]
        dump: Option<PathBuf>,
    },
    /// Count trigger-word matches in a piece of text
    Spot {
        /// Text to scan
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voxburst=info",
        1 => "info,voxburst=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::TestMic { duration, dump } => test_mic(duration, dump.as_deref()).await,
            Command::Spot { text } => spot(&text),
        };
    }

    let mut config = Config::load()?;
    if let Some(endpoint) = cli.endpoint {
        config.channel.endpoint = endpoint;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }

    tracing::info!(
        endpoint = %config.channel.endpoint,
        trigger = %config.game.trigger_word,
        port = config.server.port,
        "starting voxburst"
    );

    let engine = Engine::new(config.clone())?;
    let _api = ApiServer::new(config.server.port, engine.snapshot_rx()).spawn();

    if cli.no_capture {
        tracing::info!("running without microphone capture");
    } else if let Err(e) = engine.connect().await {
        // The session carries the terminal Error state for renderers; an
        // explicit restart is required to reconnect
        tracing::error!(error = %e, "connect failed");
    } else {
        tracing::info!("voxburst ready - shout \"{}\"", config.game.trigger_word);
    }

    engine.run().await?;

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64, dump: Option<&std::path::Path>) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let buffer = Arc::new(Mutex::new(Vec::<f32>::new()));
    let sink = Arc::clone(&buffer);
    let mut capture = AudioCapture::start(move |frame| {
        if let Ok(mut buf) = sink.lock() {
            buf.extend_from_slice(&frame.samples);
        }
    })?;

    let sample_rate = capture.sample_rate();
    println!("Sample rate: {sample_rate} Hz");
    println!("---");

    let mut recorded = Vec::new();

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = buffer
            .lock()
            .map(|mut buf| std::mem::take(&mut *buf))
            .unwrap_or_default();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );

        if dump.is_some() {
            recorded.extend_from_slice(&samples);
        }
    }

    capture.stop();

    if let Some(path) = dump {
        let wav = samples_to_wav(&recorded, sample_rate)?;
        std::fs::write(path, wav)?;
        println!("\nWrote {} samples to {}", recorded.len(), path.display());
    }

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");
    println!("  4. Try: pavucontrol (to check levels)");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Count trigger matches in a piece of text
fn spot(text: &str) -> anyhow::Result<()> {
    let config = Config::load()?;
    let spotter = KeywordSpotter::new(&config.trigger_spellings())?;

    let matches = spotter.spot(text);
    println!(
        "{matches} match(es) for {:?} in: {text}",
        spotter.spellings()
    );

    Ok(())
}
