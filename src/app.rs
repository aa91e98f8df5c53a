//! Application entry points for the voxpipe binary.
//!
//! Drives the complete voicing flow:
//! stream text → segment → synthesize → play

use crate::audio::playback::DeviceSink;
use crate::config::Config;
use crate::defaults;
use crate::directive::HttpDirectiveTarget;
use crate::error::Result;
use crate::output;
use crate::pipeline::orchestrator::{PipelineOptions, TurnOutcome, TurnPipeline};
use crate::pipeline::sink::{MuteSink, TerminalSink, TranscriptSink};
use crate::pipeline::turn::Turn;
use crate::pipeline::types::{StreamEvent, ToolEvent};
use crate::synth::elevenlabs::ElevenLabsSynthesizer;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::sync::mpsc;

/// Capacity of the stdin-to-segmenter channel.
const STREAM_CHANNEL_CAPACITY: usize = 8;

/// Run the default pipe mode: voice stdin as it streams in.
///
/// # Arguments
/// * `config` - Base configuration (can be overridden by CLI args)
/// * `voice` - Optional voice override from CLI
/// * `model` - Optional model override from CLI
/// * `stall_timeout` - Optional stall timeout override from CLI, in seconds
/// * `quiet` - Suppress the transcript echo
/// * `verbosity` - Verbosity level (0=default, 1=turn diagnostics)
///
/// # Returns
/// The turn outcome, or an error if the pipeline could not be built
pub async fn run_pipe_command(
    mut config: Config,
    voice: Option<String>,
    model: Option<String>,
    stall_timeout: Option<u64>,
    quiet: bool,
    verbosity: u8,
) -> Result<TurnOutcome> {
    apply_overrides(&mut config, voice, model, stall_timeout);
    config.validate()?;

    let stall = Duration::from_secs(config.stream.stall_timeout_secs);
    let pipeline = build_pipeline(&config, quiet)?;

    let turn = Arc::new(Turn::new());
    let (stream_tx, stream_rx) = mpsc::channel(STREAM_CHANNEL_CAPACITY);
    let (tool_tx, tool_rx) = mpsc::channel::<ToolEvent>(1);
    // No tool producer in pipe mode; dropping the sender finalizes the lane.
    drop(tool_tx);

    let (outcome, _) = tokio::join!(
        pipeline.run_turn(Arc::clone(&turn), stream_rx, tool_rx),
        feed_stdin(stream_tx, Arc::clone(&turn), stall, verbosity),
    );

    if outcome.aborted && !quiet {
        output::clear_line();
        eprintln!("Interrupted.");
    }
    if verbosity >= 1 {
        eprintln!("{} segments voiced.", outcome.segments);
    }

    Ok(outcome)
}

/// Voice one piece of text and exit.
pub async fn run_say_command(
    mut config: Config,
    voice: Option<String>,
    model: Option<String>,
    text: String,
    quiet: bool,
    verbosity: u8,
) -> Result<TurnOutcome> {
    apply_overrides(&mut config, voice, model, None);
    config.validate()?;

    let pipeline = build_pipeline(&config, quiet)?;

    let turn = Arc::new(Turn::new());
    let (stream_tx, stream_rx) = mpsc::channel(4);
    let (tool_tx, tool_rx) = mpsc::channel::<ToolEvent>(1);
    drop(tool_tx);

    // Both events fit the channel capacity, so sending before the turn
    // starts cannot block.
    stream_tx.send(StreamEvent::Delta(text)).await.ok();
    stream_tx.send(StreamEvent::Finalize).await.ok();
    drop(stream_tx);

    let outcome = pipeline.run_turn(turn, stream_rx, tool_rx).await;
    if verbosity >= 1 {
        eprintln!("{} segments voiced.", outcome.segments);
    }
    Ok(outcome)
}

/// Apply CLI overrides onto the loaded configuration.
fn apply_overrides(
    config: &mut Config,
    voice: Option<String>,
    model: Option<String>,
    stall_timeout: Option<u64>,
) {
    if let Some(v) = voice {
        config.synthesis.voice_id = v;
    }
    if let Some(m) = model {
        config.synthesis.model_id = m;
    }
    if let Some(s) = stall_timeout {
        config.stream.stall_timeout_secs = s;
    }
}

/// Build a pipeline from the effective configuration.
///
/// Opens the output device and constructs the remote synthesizer, so this
/// fails fast on a missing API key or missing audio hardware.
fn build_pipeline(config: &Config, quiet: bool) -> Result<TurnPipeline> {
    let api_key = config.resolve_api_key()?;
    let synthesizer = Arc::new(ElevenLabsSynthesizer::new(&config.synthesis, api_key)?);
    let playback = Arc::new(DeviceSink::open()?);

    let directive_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(defaults::DIRECTIVE_TIMEOUT_SECS))
        .build()?;
    let directives = Arc::new(HttpDirectiveTarget::new(
        directive_client,
        config.directives.endpoint.clone(),
    ));

    let transcript: Arc<dyn TranscriptSink> = if quiet {
        Arc::new(MuteSink)
    } else {
        Arc::new(TerminalSink)
    };

    Ok(
        TurnPipeline::new(PipelineOptions::from_config(config), synthesizer)
            .with_transcript(transcript)
            .with_playback(playback)
            .with_directives(directives),
    )
}

/// Forward stdin to the stream lane as it arrives.
///
/// Deltas are cut at UTF-8 boundaries, not line boundaries, so a sentence
/// can start synthesizing before its line is complete. The turn is
/// finalized on end of input, on a stall longer than `stall`, or on a read
/// error; Ctrl+C aborts the turn instead.
async fn feed_stdin(
    tx: mpsc::Sender<StreamEvent>,
    turn: Arc<Turn>,
    stall: Duration,
    verbosity: u8,
) {
    let mut stdin = tokio::io::stdin();
    let mut pending: Vec<u8> = Vec::new();
    let mut chunk = [0u8; 4096];

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        // A fresh sleep each iteration: the stall window restarts on
        // every received chunk.
        let read = tokio::select! {
            read = stdin.read(&mut chunk) => read,
            _ = tokio::time::sleep(stall), if !stall.is_zero() => {
                if verbosity >= 1 {
                    eprintln!("Stream stalled for {}s, finalizing turn.", stall.as_secs());
                }
                break;
            }
            _ = &mut ctrl_c => {
                turn.abort();
                break;
            }
        };

        match read {
            Ok(0) => break,
            Ok(n) => {
                pending.extend_from_slice(&chunk[..n]);
                if let Some(delta) = drain_utf8(&mut pending)
                    && tx.send(StreamEvent::Delta(delta)).await.is_err()
                {
                    break;
                }
            }
            Err(e) => {
                output::error_line(&format!("stdin read failed: {e}"));
                break;
            }
        }
    }

    tx.send(StreamEvent::Finalize).await.ok();
}

/// Decode every complete UTF-8 sequence out of `pending`.
///
/// A read can end mid-codepoint; the trailing bytes stay buffered until
/// the rest of the sequence arrives. Invalid sequences become replacement
/// characters rather than wedging the buffer.
fn drain_utf8(pending: &mut Vec<u8>) -> Option<String> {
    let mut text = String::new();

    loop {
        match std::str::from_utf8(pending) {
            Ok(s) => {
                text.push_str(s);
                pending.clear();
                break;
            }
            Err(e) => {
                let valid = e.valid_up_to();
                text.push_str(&String::from_utf8_lossy(&pending[..valid]));
                match e.error_len() {
                    Some(skip) => {
                        text.push(char::REPLACEMENT_CHARACTER);
                        let tail = pending.split_off(valid + skip);
                        *pending = tail;
                    }
                    None => {
                        // Incomplete sequence at the tail: keep it buffered.
                        let tail = pending.split_off(valid);
                        *pending = tail;
                        break;
                    }
                }
            }
        }
    }

    if text.is_empty() { None } else { Some(text) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::VoxpipeError;

    #[test]
    fn test_apply_overrides_sets_all_fields() {
        let mut config = Config::default();
        apply_overrides(
            &mut config,
            Some("other-voice".to_string()),
            Some("eleven_turbo_v2".to_string()),
            Some(5),
        );

        assert_eq!(config.synthesis.voice_id, "other-voice");
        assert_eq!(config.synthesis.model_id, "eleven_turbo_v2");
        assert_eq!(config.stream.stall_timeout_secs, 5);
    }

    #[test]
    fn test_apply_overrides_none_keeps_config() {
        let mut config = Config::default();
        config.synthesis.voice_id = "from-file".to_string();

        apply_overrides(&mut config, None, None, None);

        assert_eq!(config.synthesis.voice_id, "from-file");
        assert_eq!(config.stream.stall_timeout_secs, 20);
    }

    #[test]
    fn test_build_pipeline_requires_api_key() {
        let config = Config::default();
        let err = build_pipeline(&config, false).unwrap_err();
        assert!(matches!(err, VoxpipeError::MissingApiKey));
    }

    #[test]
    fn test_drain_utf8_ascii() {
        let mut pending = b"Hello there.".to_vec();
        assert_eq!(drain_utf8(&mut pending).as_deref(), Some("Hello there."));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_utf8_empty() {
        let mut pending = Vec::new();
        assert_eq!(drain_utf8(&mut pending), None);
    }

    #[test]
    fn test_drain_utf8_holds_split_codepoint() {
        // "é" is [0xC3, 0xA9]; the first byte alone is incomplete.
        let mut pending = vec![b'a', 0xC3];
        assert_eq!(drain_utf8(&mut pending).as_deref(), Some("a"));
        assert_eq!(pending, vec![0xC3]);

        pending.push(0xA9);
        assert_eq!(drain_utf8(&mut pending).as_deref(), Some("é"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_utf8_replaces_invalid_bytes() {
        let mut pending = vec![b'a', 0xFF, b'b'];
        assert_eq!(drain_utf8(&mut pending).as_deref(), Some("a\u{FFFD}b"));
        assert!(pending.is_empty());
    }

    #[test]
    fn test_drain_utf8_incomplete_only() {
        let mut pending = vec![0xC3];
        assert_eq!(drain_utf8(&mut pending), None);
        assert_eq!(pending, vec![0xC3]);
    }
}
