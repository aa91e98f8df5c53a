//! voxpipe - Streaming text-to-speech for LLM output
//!
//! Segments an incremental text stream into sentences, synthesizes them
//! concurrently against a remote service, and plays them back in order.

// Error handling discipline: propagate, never unwrap in library code
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod directive;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod synth;

// Composition root - needs the full stack
#[cfg(all(feature = "elevenlabs", feature = "cli"))]
pub mod app;

// Core traits (stream → segment → synthesize → play)
pub use audio::playback::{DiscardSink, PlaybackSink};
pub use directive::{DirectiveTarget, DiscardTarget};
pub use pipeline::sink::{CollectorSink, MuteSink, TerminalSink, ToolSink, TranscriptSink};
pub use synth::service::{MockSynthesizer, SpeechSynthesizer, SynthesisRequest};

// Pipeline
pub use pipeline::orchestrator::{PipelineOptions, TurnOutcome, TurnPipeline};
pub use pipeline::turn::{SpeechContext, Turn};
pub use pipeline::types::{StreamEvent, ToolEvent, ToolInvocation};

// Error handling
pub use error::{Result, VoxpipeError};

// Config
pub use config::Config;

// Audio
pub use audio::clip::AudioClip;
#[cfg(feature = "playback")]
pub use audio::playback::DeviceSink;

#[cfg(feature = "elevenlabs")]
pub use synth::elevenlabs::ElevenLabsSynthesizer;

/// Build version string with optional git commit hash.
///
/// Returns `"0.0.1+abc1234"` when git hash is available, `"0.0.1"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_string_starts_with_cargo_version() {
        let ver = version_string();
        assert!(
            ver.starts_with(env!("CARGO_PKG_VERSION")),
            "version_string should start with CARGO_PKG_VERSION, got: {}",
            ver
        );
    }

    #[test]
    fn version_string_contains_plus_when_git_hash_present() {
        let ver = version_string();
        // In a git repo build, GIT_HASH is set → expect "0.0.1+<hash>"
        // In CI without git, expect plain "0.0.1"
        if option_env!("GIT_HASH").is_some_and(|h| !h.is_empty()) {
            assert!(
                ver.contains('+'),
                "With GIT_HASH set, version should contain '+', got: {}",
                ver
            );
            let hash_part = ver.split('+').nth(1).unwrap_or("");
            assert_eq!(
                hash_part.len(),
                7,
                "Git hash should be 7 chars, got: {}",
                hash_part
            );
        } else {
            assert_eq!(ver, env!("CARGO_PKG_VERSION"));
        }
    }
}
