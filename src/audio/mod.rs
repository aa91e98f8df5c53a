//! Audio clips, decoding, and playback.

pub mod clip;
#[cfg(feature = "playback")]
pub mod decode;
pub mod playback;

pub use clip::AudioClip;
#[cfg(feature = "playback")]
pub use playback::DeviceSink;
pub use playback::{DiscardSink, PlaybackSink};
