//! Turn orchestration.
//!
//! Wires the stations of one turn together:
//!
//! ```text
//! stream ──► Segmenter ──► Synthesizer (fan-out, limited) ──► slots
//!                │                                              │
//!                └── silence / directives resolve directly ─────┤
//!                                                               ▼
//! tools ───► tool lane                                     Sequencer ──► sinks
//! ```
//!
//! `run_turn` returns only when every lane has finalized and the sequencer
//! has drained, so a caller can start the next turn the moment it returns.
//! The concurrency limiter lives in the pipeline, not the turn, and is
//! shared across turns.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::audio::playback::{DiscardSink, PlaybackSink};
use crate::config::Config;
use crate::defaults;
use crate::directive::{DirectiveTarget, DiscardTarget};
use crate::output;
use crate::pipeline::segmenter::{Segmenter, clean_text};
use crate::pipeline::sequencer::SequencerStation;
use crate::pipeline::sink::{NoopToolSink, TerminalSink, ToolSink, TranscriptSink};
use crate::pipeline::synthesizer::{SpeechJob, SynthesizerStation};
use crate::pipeline::turn::Turn;
use crate::pipeline::types::{ResolvedEntry, Segment, SegmentKind, StreamEvent, ToolEvent};
use crate::synth::service::SpeechSynthesizer;

/// Capacity of the segmenter-to-synthesizer job channel.
const JOB_CHANNEL_CAPACITY: usize = 32;

/// Tuning knobs for the pipeline, detached from the config file format.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub max_concurrent: usize,
    pub tail_trim_ms: u32,
    pub fade_out_ms: u32,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            max_concurrent: defaults::MAX_CONCURRENT,
            tail_trim_ms: defaults::TAIL_TRIM_MS,
            fade_out_ms: defaults::FADE_OUT_MS,
        }
    }
}

impl PipelineOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_concurrent: config.synthesis.max_concurrent,
            tail_trim_ms: config.synthesis.tail_trim_ms,
            fade_out_ms: config.synthesis.fade_out_ms,
        }
    }
}

/// What happened during one turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TurnOutcome {
    /// Entries the sequencer consumed before draining.
    pub segments: u64,
    pub aborted: bool,
}

/// Reusable turn runner. Build once, run any number of turns through it.
pub struct TurnPipeline {
    options: PipelineOptions,
    limiter: Arc<Semaphore>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    transcript: Arc<dyn TranscriptSink>,
    playback: Arc<dyn PlaybackSink>,
    directives: Arc<dyn DirectiveTarget>,
    tools: Arc<dyn ToolSink>,
}

impl std::fmt::Debug for TurnPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TurnPipeline")
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl TurnPipeline {
    pub fn new(options: PipelineOptions, synthesizer: Arc<dyn SpeechSynthesizer>) -> Self {
        let permits = options.max_concurrent.max(1);
        Self {
            options,
            limiter: Arc::new(Semaphore::new(permits)),
            synthesizer,
            transcript: Arc::new(TerminalSink),
            playback: Arc::new(DiscardSink),
            directives: Arc::new(DiscardTarget),
            tools: Arc::new(NoopToolSink),
        }
    }

    pub fn with_transcript(mut self, sink: Arc<dyn TranscriptSink>) -> Self {
        self.transcript = sink;
        self
    }

    pub fn with_playback(mut self, sink: Arc<dyn PlaybackSink>) -> Self {
        self.playback = sink;
        self
    }

    pub fn with_directives(mut self, target: Arc<dyn DirectiveTarget>) -> Self {
        self.directives = target;
        self
    }

    pub fn with_tools(mut self, sink: Arc<dyn ToolSink>) -> Self {
        self.tools = sink;
        self
    }

    /// Runs one turn to completion.
    ///
    /// The caller keeps a clone of `turn` to abort from outside. Closing
    /// `stream_rx` counts as finalizing the text lane; closing `tool_rx`
    /// counts as finalizing the tool lane.
    pub async fn run_turn(
        &self,
        turn: Arc<Turn>,
        stream_rx: mpsc::Receiver<StreamEvent>,
        tool_rx: mpsc::Receiver<ToolEvent>,
    ) -> TurnOutcome {
        let (job_tx, job_rx) = mpsc::channel(JOB_CHANNEL_CAPACITY);

        self.transcript.turn_started();

        let segmenter = tokio::spawn(segmenter_loop(Arc::clone(&turn), stream_rx, job_tx));

        let station = SynthesizerStation::new(
            Arc::clone(&self.synthesizer),
            Arc::clone(&turn),
            Arc::clone(&self.limiter),
            self.options.max_concurrent.max(1) as u32,
            self.options.tail_trim_ms,
            self.options.fade_out_ms,
        );
        let synthesizer = tokio::spawn(station.run(job_rx));

        let sequencer = tokio::spawn(
            SequencerStation::new(
                Arc::clone(&turn),
                Arc::clone(&self.transcript),
                Arc::clone(&self.playback),
                Arc::clone(&self.directives),
            )
            .run(),
        );

        let tools = tokio::spawn(tool_loop(Arc::clone(&turn), tool_rx, Arc::clone(&self.tools)));

        let (segmenter_res, synthesizer_res, sequencer_res, tools_res) =
            tokio::join!(segmenter, synthesizer, sequencer, tools);
        for res in [segmenter_res, synthesizer_res, tools_res] {
            if let Err(e) = res {
                output::error_line(&format!("pipeline task failed: {e}"));
            }
        }
        let segments = match sequencer_res {
            Ok(consumed) => consumed,
            Err(e) => {
                output::error_line(&format!("pipeline task failed: {e}"));
                0
            }
        };

        TurnOutcome {
            segments,
            aborted: turn.is_aborted(),
        }
    }
}

/// Feeds stream events into the segmenter and routes segments. Runs until
/// the stream finalizes, closes, or the turn aborts. Always finalizes the
/// text lane on the way out.
async fn segmenter_loop(
    turn: Arc<Turn>,
    mut rx: mpsc::Receiver<StreamEvent>,
    jobs: mpsc::Sender<SpeechJob>,
) {
    let mut segmenter = Segmenter::new();

    while let Some(event) = rx.recv().await {
        if turn.is_aborted() {
            break;
        }
        match event {
            StreamEvent::Delta(delta) => {
                let segments = segmenter.feed(&delta);
                route_segments(&turn, &jobs, segments, &segmenter).await;
            }
            StreamEvent::Finalize => {
                let segments = segmenter.finalize();
                route_segments(&turn, &jobs, segments, &segmenter).await;
                break;
            }
        }
    }

    // A closed channel without an explicit finalize still flushes.
    if !segmenter.is_finalized() && !turn.is_aborted() {
        let segments = segmenter.finalize();
        route_segments(&turn, &jobs, segments, &segmenter).await;
    }
    turn.finalize_text();
}

async fn route_segments(
    turn: &Arc<Turn>,
    jobs: &mpsc::Sender<SpeechJob>,
    segments: Vec<Segment>,
    segmenter: &Segmenter,
) {
    for segment in segments {
        turn.record_segment(&segment);
        match segment.kind {
            SegmentKind::Speech => {
                if segment.sequence == 0 {
                    // Provisional forward context for the very first request,
                    // taken from whatever is still buffered.
                    turn.record_lookahead(1, clean_text(segmenter.pending()));
                }
                let job = SpeechJob {
                    sequence: segment.sequence,
                    text: segment.clean_text,
                };
                if jobs.send(job).await.is_err() {
                    return;
                }
            }
            SegmentKind::Silence => {
                if !turn.resolve(segment.sequence, ResolvedEntry::Silence) {
                    output::warn(&format!("duplicate result for segment {}", segment.sequence));
                }
            }
            SegmentKind::Directive => {
                let entry = ResolvedEntry::Directive(segment.raw_text);
                if !turn.resolve(segment.sequence, entry) {
                    output::warn(&format!("duplicate result for segment {}", segment.sequence));
                }
            }
        }
    }
}

/// Drains the tool lane and finalizes it when the producer is done.
async fn tool_loop(turn: Arc<Turn>, mut rx: mpsc::Receiver<ToolEvent>, sink: Arc<dyn ToolSink>) {
    while let Some(event) = rx.recv().await {
        match event {
            ToolEvent::Call(call) => sink.invocation(&call),
            ToolEvent::Finalize => break,
        }
    }
    turn.finalize_tools();
}
