//! Speech synthesis backends.

#[cfg(feature = "elevenlabs")]
pub mod elevenlabs;
pub mod service;

#[cfg(feature = "elevenlabs")]
pub use elevenlabs::ElevenLabsSynthesizer;
pub use service::{MockSynthesizer, SpeechSynthesizer, SynthesisRequest};
