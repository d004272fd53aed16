//! Audio frame resampling and wire encoding
//!
//! Converts raw capture frames into the fixed-rate PCM payload the
//! streaming channel expects: 16 kHz mono 16-bit little-endian, carried as
//! base64 text.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::Serialize;

use crate::Result;

/// Sample rate of every encoded payload (16 kHz for speech)
pub const TARGET_SAMPLE_RATE: u32 = 16_000;

/// MIME descriptor attached to every payload
pub const PCM_MIME_TYPE: &str = "audio/pcm;rate=16000";

/// One captured slice of mono audio, tagged with the true device rate
///
/// Samples are normalized to [-1.0, 1.0]. Frames are ephemeral: produced by
/// the capture boundary, encoded, and dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Mono samples in [-1.0, 1.0]
    pub samples: Vec<f32>,
    /// Source sample rate in Hz
    pub sample_rate: u32,
}

impl AudioFrame {
    /// Create a frame from raw samples
    #[must_use]
    pub const fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }
}

/// Encoded audio ready for the streaming channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncodedPayload {
    /// Base64 (standard alphabet, padded) PCM16LE bytes
    pub data: String,
    /// MIME descriptor, always [`PCM_MIME_TYPE`]
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

impl EncodedPayload {
    /// Whether the payload carries no audio
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Encode a capture frame into the channel payload format
///
/// Pure and deterministic. Resamples to 16 kHz with linear interpolation,
/// clamps to [-1.0, 1.0], quantizes to 16-bit signed integers, and base64s
/// the little-endian bytes. Defensive by design: an empty frame or a zero
/// sample rate yields an empty payload rather than an error.
#[must_use]
pub fn encode(frame: &AudioFrame) -> EncodedPayload {
    if frame.samples.is_empty() || frame.sample_rate == 0 {
        return EncodedPayload {
            data: String::new(),
            mime_type: PCM_MIME_TYPE,
        };
    }

    let resampled;
    let samples: &[f32] = if frame.sample_rate == TARGET_SAMPLE_RATE {
        &frame.samples
    } else {
        resampled = resample_linear(&frame.samples, frame.sample_rate);
        &resampled
    };

    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for &sample in samples {
        bytes.extend_from_slice(&quantize(sample).to_le_bytes());
    }

    EncodedPayload {
        data: BASE64.encode(bytes),
        mime_type: PCM_MIME_TYPE,
    }
}

/// Resample to 16 kHz by linear interpolation
///
/// Output length is `ceil(len / ratio)` where `ratio = rate / 16000`. For
/// output index `i` the source position is `p = i * ratio`; the sample is
/// interpolated between `floor(p)` and `min(ceil(p), len - 1)`. Source
/// indices outside the input read as silence.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn resample_linear(samples: &[f32], sample_rate: u32) -> Vec<f32> {
    let ratio = f64::from(sample_rate) / f64::from(TARGET_SAMPLE_RATE);
    let out_len = (samples.len() as f64 / ratio).ceil() as usize;
    let mut out = Vec::with_capacity(out_len);

    for i in 0..out_len {
        let p = i as f64 * ratio;
        let i0 = p.floor() as usize;
        let i1 = (p.ceil() as usize).min(samples.len() - 1);
        let frac = (p - p.floor()) as f32;

        let s0 = samples.get(i0).copied().unwrap_or(0.0);
        let s1 = samples.get(i1).copied().unwrap_or(0.0);
        out.push(s0 * (1.0 - frac) + s1 * frac);
    }

    out
}

/// Quantize a normalized sample to a 16-bit signed integer
///
/// Clamps to [-1.0, 1.0] first. Negative values scale by 32768 and
/// non-negative by 32767, with a truncating cast — the asymmetric,
/// truncating conversion matches the reference fixed-point encoder and is
/// pinned by the round-trip tests.
#[allow(clippy::cast_possible_truncation)]
fn quantize(sample: f32) -> i16 {
    let clamped = sample.clamp(-1.0, 1.0);
    if clamped < 0.0 {
        (clamped * 32768.0) as i16
    } else {
        (clamped * 32767.0) as i16
    }
}

/// Convert f32 samples to WAV bytes for offline inspection
///
/// # Errors
///
/// Returns error if WAV encoding fails
pub fn samples_to_wav(samples: &[f32], sample_rate: u32) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = std::io::Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|e| crate::Error::Encoding(e.to_string()))?;

        for &sample in samples {
            writer
                .write_sample(quantize(sample))
                .map_err(|e| crate::Error::Encoding(e.to_string()))?;
        }

        writer
            .finalize()
            .map_err(|e| crate::Error::Encoding(e.to_string()))?;
    }

    Ok(cursor.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Decode a payload back into i16 samples
    fn decode_pcm(payload: &EncodedPayload) -> Vec<i16> {
        let bytes = BASE64.decode(&payload.data).unwrap();
        bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// Inverse of `quantize`, for round-trip checks
    fn dequantize(value: i16) -> f32 {
        if value < 0 {
            f32::from(value) / 32768.0
        } else {
            f32::from(value) / 32767.0
        }
    }

    #[test]
    fn empty_frame_yields_empty_payload() {
        let payload = encode(&AudioFrame::new(Vec::new(), 48_000));
        assert!(payload.is_empty());
        assert_eq!(payload.mime_type, PCM_MIME_TYPE);
    }

    #[test]
    fn zero_sample_rate_yields_empty_payload() {
        let payload = encode(&AudioFrame::new(vec![0.5; 128], 0));
        assert!(payload.is_empty());
    }

    #[test]
    fn sixteen_khz_input_is_identity_modulo_quantization() {
        let samples: Vec<f32> = (0..256)
            .map(|i| (f64::from(i) * 0.05).sin() as f32 * 0.8)
            .collect();
        let payload = encode(&AudioFrame::new(samples.clone(), TARGET_SAMPLE_RATE));
        let decoded = decode_pcm(&payload);

        assert_eq!(decoded.len(), samples.len());
        for (&pcm, &original) in decoded.iter().zip(&samples) {
            let drift = (dequantize(pcm) - original).abs();
            assert!(drift <= 1.0 / 32767.0, "drift {drift} exceeds one step");
        }
    }

    #[test]
    fn output_length_matches_ceil_formula() {
        for (len, rate) in [(4096, 48_000), (4096, 44_100), (1000, 22_050), (7, 48_000)] {
            let payload = encode(&AudioFrame::new(vec![0.1; len], rate));
            let expected =
                (len as f64 * f64::from(TARGET_SAMPLE_RATE) / f64::from(rate)).ceil() as usize;
            assert_eq!(
                decode_pcm(&payload).len(),
                expected,
                "len {len} at {rate} Hz"
            );
        }
    }

    #[test]
    fn payload_byte_length_is_twice_sample_count() {
        let payload = encode(&AudioFrame::new(vec![0.25; 320], TARGET_SAMPLE_RATE));
        let bytes = BASE64.decode(&payload.data).unwrap();
        assert_eq!(bytes.len(), 320 * 2);
    }

    #[test]
    fn out_of_range_samples_are_clamped() {
        let payload = encode(&AudioFrame::new(
            vec![2.5, -3.0, 1.0, -1.0],
            TARGET_SAMPLE_RATE,
        ));
        let decoded = decode_pcm(&payload);
        assert_eq!(decoded, vec![32767, -32768, 32767, -32768]);
    }

    #[test]
    fn quantization_round_trip_stays_within_one_step() {
        let samples = [-1.0, -0.733, -0.001, 0.0, 0.001, 0.5, 0.999, 1.0];
        for &original in &samples {
            let first = quantize(original);
            let second = quantize(dequantize(first));
            assert!(
                (i32::from(first) - i32::from(second)).abs() <= 1,
                "sample {original} drifted from {first} to {second}"
            );
        }
    }

    #[test]
    fn resampled_constant_signal_stays_constant() {
        let payload = encode(&AudioFrame::new(vec![0.5; 4410], 44_100));
        let decoded = decode_pcm(&payload);
        let expected = quantize(0.5);
        assert!(decoded.iter().all(|&s| s == expected));
    }

    #[test]
    fn wav_helper_produces_riff_header() {
        let wav = samples_to_wav(&[0.0, 0.1, -0.1], TARGET_SAMPLE_RATE).unwrap();
        assert_eq!(&wav[..4], b"RIFF");
        assert_eq!(&wav[8..12], b"WAVE");
    }
}
