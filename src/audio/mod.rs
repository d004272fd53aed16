//! Audio capture and wire encoding

mod capture;
mod encode;

pub use capture::{AudioCapture, FRAME_SAMPLES};
pub use encode::{
    AudioFrame, EncodedPayload, PCM_MIME_TYPE, TARGET_SAMPLE_RATE, encode, samples_to_wav,
};
