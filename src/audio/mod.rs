//! # Audio Codec Module
//!
//! Conversions between the float samples handled by capture devices and the
//! 16-bit PCM the realtime speech API expects, plus the WAV container used
//! for local playback.
//!
//! ## Audio Format:
//! - **Sample Rate**: 24kHz end to end (capture, upstream, synthesis)
//! - **Bit Depth**: 16-bit PCM
//! - **Channels**: Mono
//! - **Encoding**: Little-endian signed integers, base64 over JSON frames

pub mod codec; // PCM scaling, byte packing, base64, resampling
pub mod wav; // Minimal RIFF/WAVE container

/// Sample rate used on every audio path in the relay.
pub const SAMPLE_RATE: u32 = 24_000;
