//! Segment and event types for the speaking pipeline.
//!
//! Defines the data structures that flow between pipeline stations.

use crate::audio::clip::AudioClip;

/// Classification of one segment of the incoming text stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    /// Speakable text, sent to synthesis.
    Speech,
    /// No alphanumeric content; echoed but never synthesized.
    Silence,
    /// Embedded control block, executed at its slot in playback order.
    Directive,
}

/// One ordered unit extracted from the text stream.
///
/// Sequence numbers are dense per turn, starting at 0.
#[derive(Debug, Clone)]
pub struct Segment {
    pub sequence: u64,
    pub kind: SegmentKind,
    /// Text as it appeared in the stream. Silence segments store it
    /// whitespace-stripped, so a blank line becomes the empty string.
    pub raw_text: String,
    /// Markup-stripped form used for synthesis and neighboring context.
    pub clean_text: String,
}

impl Segment {
    pub fn speech(sequence: u64, raw_text: String, clean_text: String) -> Self {
        Self {
            sequence,
            kind: SegmentKind::Speech,
            raw_text,
            clean_text,
        }
    }

    pub fn silence(sequence: u64, raw_text: String) -> Self {
        Self {
            sequence,
            kind: SegmentKind::Silence,
            clean_text: raw_text.clone(),
            raw_text,
        }
    }

    pub fn directive(sequence: u64, payload: String) -> Self {
        Self {
            sequence,
            kind: SegmentKind::Directive,
            clean_text: payload.clone(),
            raw_text: payload,
        }
    }

    pub fn is_speech(&self) -> bool {
        self.kind == SegmentKind::Speech
    }
}

/// Outcome stored in a turn's slot table, exactly one per sequence number.
///
/// Entries are written once and consumed once, in order, by the sequencer.
#[derive(Debug, Clone)]
pub enum ResolvedEntry {
    /// Decoded, shaped audio ready to play.
    Audio(AudioClip),
    /// Nothing to play; the transcript line is echoed instead.
    Silence,
    /// Control payload to dispatch at this position.
    Directive(String),
    /// Synthesis failed; the slot is skipped at playback time.
    Failed(String),
}

impl ResolvedEntry {
    pub fn is_audio(&self) -> bool {
        matches!(self, ResolvedEntry::Audio(_))
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, ResolvedEntry::Failed(_))
    }

    /// Extracts the clip if this is an Audio entry.
    pub fn into_audio(self) -> Option<AudioClip> {
        match self {
            ResolvedEntry::Audio(clip) => Some(clip),
            _ => None,
        }
    }
}

/// Events on the text lane, producer → segmenter.
#[derive(Debug, Clone)]
pub enum StreamEvent {
    /// Incremental text from the upstream stream.
    Delta(String),
    /// Stream ended; flush the buffer and mark the text lane finalized.
    Finalize,
}

impl StreamEvent {
    pub fn is_finalize(&self) -> bool {
        matches!(self, StreamEvent::Finalize)
    }

    pub fn into_delta(self) -> Option<String> {
        match self {
            StreamEvent::Delta(text) => Some(text),
            _ => None,
        }
    }
}

/// A tool call captured from the upstream stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolInvocation {
    pub name: String,
    /// Raw argument payload, accumulated by the producer.
    pub arguments: String,
}

/// Events on the tool lane.
///
/// Tool calls ride a separate lane so the end-of-turn barrier can wait on
/// both lanes before declaring the turn over.
#[derive(Debug, Clone)]
pub enum ToolEvent {
    Call(ToolInvocation),
    Finalize,
}

impl ToolEvent {
    pub fn is_finalize(&self) -> bool {
        matches!(self, ToolEvent::Finalize)
    }
}
