//! # WAV Container
//!
//! Builds and parses the minimal mono 16-bit RIFF/WAVE container used to
//! hand synthesized audio to a native player. The 44-byte header layout is
//! the contract: byte rate = sample_rate * 2, block align = 2.

use crate::error::AppError;
use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

/// Size of the canonical RIFF/WAVE header for mono 16-bit PCM.
pub const WAV_HEADER_LEN: usize = 44;

/// Build a complete WAV file: 44-byte header followed by the raw samples.
///
/// Always emits exactly `44 + pcm.len() * 2` bytes.
pub fn build_wav(pcm: &[i16], sample_rate: u32) -> Vec<u8> {
    let data_len = (pcm.len() * 2) as u32;
    let byte_rate = sample_rate * 2;

    let mut out = Vec::with_capacity(WAV_HEADER_LEN + data_len as usize);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");
    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample
    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());

    for sample in pcm {
        out.extend_from_slice(&sample.to_le_bytes());
    }

    out
}

/// Parse a canonical mono 16-bit WAV file back into samples and sample rate.
///
/// Only the fixed 44-byte layout produced by [`build_wav`] is accepted;
/// anything else is a decode error.
pub fn parse_wav(bytes: &[u8]) -> Result<(Vec<i16>, u32), AppError> {
    if bytes.len() < WAV_HEADER_LEN {
        return Err(AppError::Decode(format!(
            "WAV data too short: {} bytes",
            bytes.len()
        )));
    }

    if &bytes[0..4] != b"RIFF" || &bytes[8..12] != b"WAVE" || &bytes[12..16] != b"fmt " {
        return Err(AppError::Decode("not a RIFF/WAVE container".to_string()));
    }

    let mut cursor = Cursor::new(&bytes[20..36]);
    let audio_format = cursor.read_u16::<LittleEndian>().unwrap_or(0);
    let channels = cursor.read_u16::<LittleEndian>().unwrap_or(0);
    let sample_rate = cursor.read_u32::<LittleEndian>().unwrap_or(0);
    let _byte_rate = cursor.read_u32::<LittleEndian>().unwrap_or(0);
    let _block_align = cursor.read_u16::<LittleEndian>().unwrap_or(0);

    if audio_format != 1 || channels != 1 {
        return Err(AppError::Decode(format!(
            "unsupported WAV format: format={}, channels={}",
            audio_format, channels
        )));
    }

    if &bytes[36..40] != b"data" {
        return Err(AppError::Decode("missing data chunk".to_string()));
    }

    let samples = crate::audio::codec::bytes_to_pcm16(&bytes[WAV_HEADER_LEN..]);
    Ok((samples, sample_rate))
}
