//! Concurrent synthesis station.
//!
//! Speech jobs fan out to the synthesis service, one task per segment,
//! under a process-wide concurrency limiter. A permit is taken before the
//! task is spawned and held until the result slot is written, so draining
//! the limiter guarantees every in-flight request has landed.
//!
//! Results go straight into the turn's slot table; order is restored by
//! the sequencer, not here.

use std::sync::Arc;

use tokio::sync::{Semaphore, mpsc};

use crate::output;
use crate::pipeline::turn::Turn;
use crate::pipeline::types::ResolvedEntry;
use crate::synth::service::{SpeechSynthesizer, SynthesisRequest};

/// Work item for one speech segment.
#[derive(Debug, Clone)]
pub struct SpeechJob {
    pub sequence: u64,
    /// Markup-stripped text to synthesize.
    pub text: String,
}

pub struct SynthesizerStation<S: ?Sized> {
    synthesizer: Arc<S>,
    turn: Arc<Turn>,
    limiter: Arc<Semaphore>,
    max_concurrent: u32,
    tail_trim_ms: u32,
    fade_out_ms: u32,
}

impl<S: SpeechSynthesizer + ?Sized + 'static> SynthesizerStation<S> {
    pub fn new(
        synthesizer: Arc<S>,
        turn: Arc<Turn>,
        limiter: Arc<Semaphore>,
        max_concurrent: u32,
        tail_trim_ms: u32,
        fade_out_ms: u32,
    ) -> Self {
        Self {
            synthesizer,
            turn,
            limiter,
            max_concurrent,
            tail_trim_ms,
            fade_out_ms,
        }
    }

    /// Consumes jobs until the channel closes, then waits for every
    /// in-flight request to write its slot before returning.
    pub async fn run(self, mut rx: mpsc::Receiver<SpeechJob>) {
        while let Some(job) = rx.recv().await {
            if self.turn.is_aborted() {
                let entry = ResolvedEntry::Failed("turn aborted".to_string());
                if !self.turn.resolve(job.sequence, entry) {
                    output::warn(&format!("duplicate result for segment {}", job.sequence));
                }
                continue;
            }

            let Ok(permit) = self.limiter.clone().acquire_owned().await else {
                break;
            };
            let synthesizer = Arc::clone(&self.synthesizer);
            let turn = Arc::clone(&self.turn);
            let (trim, fade) = (self.tail_trim_ms, self.fade_out_ms);
            tokio::spawn(async move {
                let _permit = permit;
                // Context is sampled late so following segments that arrived
                // while this job queued still make it in.
                let context = turn.context_for(job.sequence);
                let request = SynthesisRequest::with_context(job.text, context);
                let entry = match synthesizer.synthesize(&request).await {
                    Ok(mut clip) => {
                        clip.shape_tail(trim, fade);
                        ResolvedEntry::Audio(clip)
                    }
                    Err(e) => {
                        output::warn(&format!("segment {} failed: {e}", job.sequence));
                        ResolvedEntry::Failed(e.to_string())
                    }
                };
                if !turn.resolve(job.sequence, entry) {
                    output::warn(&format!("duplicate result for segment {}", job.sequence));
                }
            });
        }

        // Every spawned request holds a permit until its slot is written, so
        // reacquiring the full count is the completion barrier.
        let _ = self.limiter.acquire_many(self.max_concurrent).await;
    }
}
