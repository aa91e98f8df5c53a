//! Streaming turn pipeline.
//!
//! Stations run as tokio tasks per turn, connected by bounded channels:
//! the segmenter cuts the incoming text stream into ordered segments, the
//! synthesizer fans requests out under a shared limiter, and the sequencer
//! replays results in exact text order.

pub mod orchestrator;
pub mod segmenter;
pub mod sequencer;
pub mod sink;
pub mod synthesizer;
pub mod turn;
pub mod types;

pub use orchestrator::{PipelineOptions, TurnOutcome, TurnPipeline};
pub use segmenter::Segmenter;
pub use sequencer::SequencerStation;
pub use sink::{
    CollectorSink, MuteSink, NoopToolSink, OutputEvent, TerminalSink, ToolSink, TranscriptSink,
};
pub use synthesizer::{SpeechJob, SynthesizerStation};
pub use turn::{SpeechContext, Turn};
pub use types::{ResolvedEntry, Segment, SegmentKind, StreamEvent, ToolEvent, ToolInvocation};
