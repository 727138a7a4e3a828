//! # PCM Codec Utilities
//!
//! Conversions between the float samples produced by capture devices and the
//! 16-bit PCM format the realtime speech API consumes, plus the base64
//! framing used to carry audio over JSON messages.
//!
//! ## Conventions:
//! - **Float samples**: 32-bit, nominal range [-1.0, 1.0]
//! - **PCM samples**: 16-bit signed, little-endian on the wire
//! - **Asymmetric scaling**: negative samples scale by 0x8000, non-negative
//!   by 0x7FFF, so both endpoints of the int16 range are reachable
//!
//! All conversions are total; malformed base64 is the only error condition
//! and is returned to the caller rather than swallowed.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Convert float samples to 16-bit PCM.
///
/// Each sample is clamped to [-1.0, 1.0], scaled by 0x8000 (negative) or
/// 0x7FFF (non-negative), and truncated toward zero. Lossy by design.
pub fn float_to_pcm16(samples: &[f32]) -> Vec<i16> {
    samples
        .iter()
        .map(|&sample| {
            let clamped = sample.clamp(-1.0, 1.0);
            if clamped < 0.0 {
                (clamped * 32768.0) as i16
            } else {
                (clamped * 32767.0) as i16
            }
        })
        .collect()
}

/// Convert 16-bit PCM samples back to floats in [-1.0, 1.0].
///
/// Inverse of [`float_to_pcm16`]: the divisor depends on the sign of the
/// source sample so the scaling is symmetric with the encoder.
pub fn pcm16_to_float(samples: &[i16]) -> Vec<f32> {
    samples
        .iter()
        .map(|&sample| {
            if sample < 0 {
                sample as f32 / 32768.0
            } else {
                sample as f32 / 32767.0
            }
        })
        .collect()
}

/// Pack PCM samples into little-endian bytes for the wire.
pub fn pcm16_to_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}

/// Read little-endian bytes back into PCM samples.
///
/// A trailing odd byte (half a sample) is ignored.
pub fn bytes_to_pcm16(data: &[u8]) -> Vec<i16> {
    let mut cursor = Cursor::new(data);
    let mut samples = Vec::with_capacity(data.len() / 2);
    while let Ok(sample) = cursor.read_i16::<LittleEndian>() {
        samples.push(sample);
    }
    samples
}

/// Encode bytes as standard base64 for JSON transport.
pub fn encode_base64(bytes: &[u8]) -> String {
    BASE64.encode(bytes)
}

/// Decode standard base64, surfacing malformed input to the caller.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(encoded)
}

/// Resample float audio between two rates using linear interpolation.
///
/// Returns the input unchanged when the rates match. Output length is
/// `round(len / (from_rate / to_rate))`.
///
/// No anti-aliasing filter is applied; for speech-bandwidth signals between
/// the 24kHz capture rate and nearby device rates this is acceptable.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).round() as usize;
    let last = samples.len() - 1;

    let mut output = Vec::with_capacity(output_len);
    for i in 0..output_len {
        let src = i as f64 * ratio;
        let lower = (src.floor() as usize).min(last);
        let upper = (lower + 1).min(last);
        let frac = (src - src.floor()) as f32;
        output.push(samples[lower] * (1.0 - frac) + samples[upper] * frac);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_round_trip_within_quantization_tolerance() {
        let tolerance = 1.0 / 32767.0;
        for &sample in &[-1.0f32, -0.5, -0.001, 0.0, 0.001, 0.25, 0.5, 0.9999, 1.0] {
            let pcm = float_to_pcm16(&[sample]);
            let back = pcm16_to_float(&pcm);
            assert!(
                (back[0] - sample).abs() <= tolerance,
                "round trip drifted: {} -> {} -> {}",
                sample,
                pcm[0],
                back[0]
            );
        }
    }

    #[test]
    fn test_float_to_pcm16_clamps_out_of_range() {
        let pcm = float_to_pcm16(&[-2.0, 2.0]);
        assert_eq!(pcm, vec![-32768, 32767]);
    }

    #[test]
    fn test_byte_packing_round_trip() {
        let samples = vec![0i16, 1, -1, 32767, -32768, 12345];
        let bytes = pcm16_to_bytes(&samples);
        assert_eq!(bytes.len(), samples.len() * 2);
        assert_eq!(bytes_to_pcm16(&bytes), samples);
    }

    #[test]
    fn test_bytes_to_pcm16_ignores_trailing_odd_byte() {
        let mut bytes = pcm16_to_bytes(&[100, -100]);
        bytes.push(0x7f);
        assert_eq!(bytes_to_pcm16(&bytes), vec![100, -100]);
    }

    #[test]
    fn test_base64_round_trip_and_error() {
        let payload = vec![0u8, 1, 2, 254, 255];
        let encoded = encode_base64(&payload);
        assert_eq!(decode_base64(&encoded).unwrap(), payload);
        assert!(decode_base64("not*valid*base64!").is_err());
    }

    #[test]
    fn test_resample_identity_when_rates_match() {
        let samples = vec![0.1f32, -0.2, 0.3, -0.4];
        assert_eq!(resample(&samples, 24000, 24000), samples);
    }

    #[test]
    fn test_resample_halves_and_doubles_length() {
        let samples: Vec<f32> = (0..100).map(|i| (i as f32) / 100.0).collect();
        let down = resample(&samples, 48000, 24000);
        assert_eq!(down.len(), 50);
        let up = resample(&samples, 24000, 48000);
        assert_eq!(up.len(), 200);
        // Linear interpolation preserves a linear ramp
        assert!((up[100] - samples[50]).abs() < 0.02);
    }
}
