//! Compressed audio to [`AudioClip`] decoding.

use std::io::Cursor;

use rodio::{Decoder, Source};

use crate::audio::clip::AudioClip;
use crate::error::{Result, VoxpipeError};

/// Decodes an encoded audio body (MP3 from the synthesis API) into an
/// interleaved f32 clip. Decoding is CPU-bound; callers on the async
/// runtime wrap this in `spawn_blocking`.
pub fn decode(bytes: Vec<u8>) -> Result<AudioClip> {
    let decoder = Decoder::new(Cursor::new(bytes)).map_err(|e| VoxpipeError::AudioDecode {
        message: e.to_string(),
    })?;
    let channels = decoder.channels();
    let sample_rate = decoder.sample_rate();
    let samples: Vec<f32> = decoder.collect();
    if samples.is_empty() {
        return Err(VoxpipeError::AudioDecode {
            message: "decoded stream held no samples".to_string(),
        });
    }
    Ok(AudioClip::new(samples, sample_rate, channels))
}
