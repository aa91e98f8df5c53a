//! Pluggable output handlers for the sequencer.
//!
//! The terminal sink renders the live transcript; [`CollectorSink`] records
//! every output event in arrival order so tests can assert on interleaving.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::audio::clip::AudioClip;
use crate::audio::playback::PlaybackSink;
use crate::directive::DirectiveTarget;
use crate::error::Result;
use crate::output;
use crate::pipeline::types::ToolInvocation;

/// Receives transcript lines as segments reach the playback cursor.
pub trait TranscriptSink: Send + Sync {
    /// The stream opened; nothing has been segmented yet.
    fn turn_started(&self) {}
    /// A speech segment is about to play.
    fn speech_line(&self, text: &str);
    /// A silence segment passed the cursor.
    fn silence_line(&self, text: &str);
    /// A directive was dispatched at this position.
    fn note_line(&self, text: &str);
}

/// Receives tool invocations from the tool lane.
pub trait ToolSink: Send + Sync {
    fn invocation(&self, call: &ToolInvocation);
}

/// Renders the transcript to the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

impl TranscriptSink for TerminalSink {
    fn turn_started(&self) {
        output::show_receiving();
    }

    fn speech_line(&self, text: &str) {
        output::speech_line(text);
    }

    fn silence_line(&self, text: &str) {
        output::silence_line(text);
    }

    fn note_line(&self, text: &str) {
        output::note_line(text);
    }
}

/// Discards transcript lines. Used by `--quiet`.
#[derive(Debug, Default, Clone, Copy)]
pub struct MuteSink;

impl TranscriptSink for MuteSink {
    fn speech_line(&self, _text: &str) {}
    fn silence_line(&self, _text: &str) {}
    fn note_line(&self, _text: &str) {}
}

/// Discards tool invocations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopToolSink;

impl ToolSink for NoopToolSink {
    fn invocation(&self, _call: &ToolInvocation) {}
}

/// One recorded output, in the order it was produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutputEvent {
    Speech(String),
    Silence(String),
    Note(String),
    /// A clip reached the playback sink; payload is its frame count.
    Clip(usize),
    /// A directive payload reached the directive target.
    Directive(String),
    Tool(String),
}

/// Records everything instead of rendering or playing it.
///
/// Implements every output seam, so one collector observes the full
/// interleaving of transcript lines, clips, and directives.
#[derive(Debug, Default)]
pub struct CollectorSink {
    events: Mutex<Vec<OutputEvent>>,
}

impl CollectorSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<OutputEvent> {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn push(&self, event: OutputEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event);
    }
}

impl TranscriptSink for CollectorSink {
    fn speech_line(&self, text: &str) {
        self.push(OutputEvent::Speech(text.to_string()));
    }

    fn silence_line(&self, text: &str) {
        self.push(OutputEvent::Silence(text.to_string()));
    }

    fn note_line(&self, text: &str) {
        self.push(OutputEvent::Note(text.to_string()));
    }
}

#[async_trait]
impl PlaybackSink for CollectorSink {
    async fn play(&self, clip: AudioClip) -> Result<()> {
        self.push(OutputEvent::Clip(clip.frame_count()));
        Ok(())
    }
}

#[async_trait]
impl DirectiveTarget for CollectorSink {
    async fn dispatch(&self, payload: &str) -> Result<()> {
        self.push(OutputEvent::Directive(payload.to_string()));
        Ok(())
    }
}

impl ToolSink for CollectorSink {
    fn invocation(&self, call: &ToolInvocation) {
        self.push(OutputEvent::Tool(call.name.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_collector_preserves_interleaving() {
        let sink = CollectorSink::new();
        sink.speech_line("Hello.");
        sink.play(AudioClip::new(vec![0.0; 32], 16_000, 1))
            .await
            .unwrap();
        sink.silence_line("");
        sink.dispatch("[SYSTEM] [note=C4] [/SYSTEM]").await.unwrap();
        sink.note_line("C4");

        assert_eq!(
            sink.events(),
            vec![
                OutputEvent::Speech("Hello.".to_string()),
                OutputEvent::Clip(32),
                OutputEvent::Silence(String::new()),
                OutputEvent::Directive("[SYSTEM] [note=C4] [/SYSTEM]".to_string()),
                OutputEvent::Note("C4".to_string()),
            ]
        );
    }

    #[test]
    fn test_collector_records_tools() {
        let sink = CollectorSink::new();
        sink.invocation(&ToolInvocation {
            name: "lookup".to_string(),
            arguments: "{}".to_string(),
        });
        assert_eq!(sink.events(), vec![OutputEvent::Tool("lookup".to_string())]);
    }

    #[test]
    fn test_terminal_sink_renders_without_panicking() {
        let sink = TerminalSink;
        sink.speech_line("Hello.");
        sink.silence_line("");
        sink.note_line("C4");
    }
}
