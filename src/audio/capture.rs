//! Audio capture from the default input device
//!
//! The cpal stream lives on a dedicated thread (the stream handle is not
//! `Send`); captured samples are downmixed to mono, sliced into fixed-size
//! frames tagged with the true device rate, and handed to a caller-supplied
//! callback. The callback runs on the audio thread and must not block.

use std::sync::mpsc;
use std::thread::JoinHandle;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::audio::AudioFrame;
use crate::{Error, Result};

/// Samples per emitted frame (~256 ms at 16 kHz, ~85 ms at 48 kHz)
pub const FRAME_SAMPLES: usize = 4096;

/// Captures audio from the default input device
///
/// Dropping the handle (or calling [`stop`](Self::stop)) releases the
/// device. Release is idempotent and safe from any state.
pub struct AudioCapture {
    stop_tx: Option<mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
    sample_rate: u32,
}

impl AudioCapture {
    /// Open the default input device and start capturing
    ///
    /// `on_frame` is invoked once per assembled frame on the capture thread.
    ///
    /// # Errors
    ///
    /// Returns [`Error::PermissionDenied`] if no input device is available
    /// or the device refuses to open, [`Error::Audio`] for other stream
    /// failures
    pub fn start<F>(on_frame: F) -> Result<Self>
    where
        F: FnMut(AudioFrame) + Send + 'static,
    {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let (ready_tx, ready_rx) = mpsc::channel::<Result<u32>>();

        let thread = std::thread::Builder::new()
            .name("voxburst-capture".to_string())
            .spawn(move || capture_thread(&stop_rx, &ready_tx, on_frame))
            .map_err(|e| Error::Audio(format!("failed to spawn capture thread: {e}")))?;

        match ready_rx.recv() {
            Ok(Ok(sample_rate)) => {
                tracing::debug!(sample_rate, "audio capture started");
                Ok(Self {
                    stop_tx: Some(stop_tx),
                    thread: Some(thread),
                    sample_rate,
                })
            }
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(Error::Audio("capture thread exited during setup".to_string()))
            }
        }
    }

    /// True device sample rate in Hz
    #[must_use]
    pub const fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Whether the capture thread is still running
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.thread.is_some()
    }

    /// Stop capturing and release the device
    ///
    /// Safe to call multiple times and from any state.
    pub fn stop(&mut self) {
        if let Some(stop_tx) = self.stop_tx.take() {
            drop(stop_tx);
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
            tracing::debug!("audio capture stopped");
        }
    }
}

impl Drop for AudioCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Body of the capture thread: owns the cpal stream for its whole lifetime
fn capture_thread<F>(stop_rx: &mpsc::Receiver<()>, ready_tx: &mpsc::Sender<Result<u32>>, on_frame: F)
where
    F: FnMut(AudioFrame) + Send + 'static,
{
    let host = cpal::default_host();

    let Some(device) = host.default_input_device() else {
        let _ = ready_tx.send(Err(Error::PermissionDenied(
            "no input device available".to_string(),
        )));
        return;
    };

    let supported = match device.default_input_config() {
        Ok(config) => config,
        Err(e) => {
            let _ = ready_tx.send(Err(Error::PermissionDenied(e.to_string())));
            return;
        }
    };

    let sample_rate = supported.sample_rate().0;
    let channels = supported.channels();
    let config = supported.config();
    let mut assembler = FrameAssembler::new(usize::from(channels), sample_rate, on_frame);

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate,
        channels,
        format = ?supported.sample_format(),
        "audio capture initialized"
    );

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_input_stream(
            &config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| assembler.push(data),
            |err| tracing::error!(error = %err, "audio capture error"),
            None,
        ),
        cpal::SampleFormat::I16 => device.build_input_stream(
            &config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let converted: Vec<f32> =
                    data.iter().map(|&s| f32::from(s) / 32768.0).collect();
                assembler.push(&converted);
            },
            |err| tracing::error!(error = %err, "audio capture error"),
            None,
        ),
        other => {
            let _ = ready_tx.send(Err(Error::Audio(format!(
                "unsupported input sample format: {other:?}"
            ))));
            return;
        }
    };

    let stream = match stream {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(Error::PermissionDenied(e.to_string())));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(Error::Audio(e.to_string())));
        return;
    }

    let _ = ready_tx.send(Ok(sample_rate));

    // Park until the handle drops its stop sender, then release the stream
    let _ = stop_rx.recv();
    drop(stream);
}

/// Downmixes interleaved input to mono and emits fixed-size frames
struct FrameAssembler<F> {
    channels: usize,
    sample_rate: u32,
    pending: Vec<f32>,
    on_frame: F,
}

impl<F> FrameAssembler<F>
where
    F: FnMut(AudioFrame),
{
    fn new(channels: usize, sample_rate: u32, on_frame: F) -> Self {
        Self {
            channels: channels.max(1),
            sample_rate,
            pending: Vec::with_capacity(FRAME_SAMPLES),
            on_frame,
        }
    }

    /// Feed interleaved samples; emits a frame per `FRAME_SAMPLES` mono
    /// samples accumulated
    #[allow(clippy::cast_precision_loss)]
    fn push(&mut self, interleaved: &[f32]) {
        for group in interleaved.chunks_exact(self.channels) {
            let sum: f32 = group.iter().sum();
            self.pending.push(sum / self.channels as f32);

            if self.pending.len() == FRAME_SAMPLES {
                let samples = std::mem::replace(
                    &mut self.pending,
                    Vec::with_capacity(FRAME_SAMPLES),
                );
                (self.on_frame)(AudioFrame::new(samples, self.sample_rate));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    fn collecting_assembler(
        channels: usize,
    ) -> (FrameAssembler<impl FnMut(AudioFrame)>, Arc<Mutex<Vec<AudioFrame>>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&frames);
        let assembler = FrameAssembler::new(channels, 48_000, move |frame| {
            sink.lock().unwrap().push(frame);
        });
        (assembler, frames)
    }

    #[test]
    fn emits_fixed_size_frames() {
        let (mut assembler, frames) = collecting_assembler(1);

        assembler.push(&vec![0.1; FRAME_SAMPLES - 1]);
        assert!(frames.lock().unwrap().is_empty());

        assembler.push(&[0.1, 0.1]);
        let emitted = frames.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert_eq!(emitted[0].samples.len(), FRAME_SAMPLES);
        assert_eq!(emitted[0].sample_rate, 48_000);
    }

    #[test]
    fn downmixes_stereo_to_mono() {
        let (mut assembler, frames) = collecting_assembler(2);

        // left = 1.0, right = 0.0 → mono 0.5
        let interleaved: Vec<f32> = (0..FRAME_SAMPLES * 2)
            .map(|i| if i % 2 == 0 { 1.0 } else { 0.0 })
            .collect();
        assembler.push(&interleaved);

        let emitted = frames.lock().unwrap();
        assert_eq!(emitted.len(), 1);
        assert!(emitted[0].samples.iter().all(|&s| (s - 0.5).abs() < f32::EPSILON));
    }

    #[test]
    fn spans_multiple_pushes() {
        let (mut assembler, frames) = collecting_assembler(1);

        for _ in 0..4 {
            assembler.push(&vec![0.0; FRAME_SAMPLES / 2]);
        }
        assert_eq!(frames.lock().unwrap().len(), 2);
    }
}
