//! Ordered playback station.
//!
//! Single consumer of the turn's slot table. The cursor only ever moves
//! forward, one sequence number at a time, so output order matches text
//! order no matter how synthesis completions interleave. A missing slot
//! blocks the cursor; a failed slot is skipped with a diagnostic.

use std::sync::Arc;

use crate::audio::playback::PlaybackSink;
use crate::directive::{DirectiveTarget, parse_directive};
use crate::output;
use crate::pipeline::sink::TranscriptSink;
use crate::pipeline::turn::Turn;
use crate::pipeline::types::ResolvedEntry;

/// Display form of a transcript line. One leading space (left over from a
/// sentence split) and one leading newline (from a line split) come off;
/// everything else prints as it streamed.
pub fn echo_text(raw: &str) -> &str {
    let text = raw.strip_prefix(' ').unwrap_or(raw);
    text.strip_prefix('\n').unwrap_or(text)
}

pub struct SequencerStation {
    turn: Arc<Turn>,
    transcript: Arc<dyn TranscriptSink>,
    playback: Arc<dyn PlaybackSink>,
    directives: Arc<dyn DirectiveTarget>,
}

impl SequencerStation {
    pub fn new(
        turn: Arc<Turn>,
        transcript: Arc<dyn TranscriptSink>,
        playback: Arc<dyn PlaybackSink>,
        directives: Arc<dyn DirectiveTarget>,
    ) -> Self {
        Self {
            turn,
            transcript,
            playback,
            directives,
        }
    }

    /// Consumes entries in sequence order until the turn drains or aborts.
    /// Returns the number of entries consumed.
    pub async fn run(self) -> u64 {
        let mut cursor: u64 = 0;
        loop {
            if self.turn.is_aborted() {
                return cursor;
            }
            if let Some(entry) = self.turn.take_entry(cursor) {
                self.consume(cursor, entry).await;
                cursor += 1;
                continue;
            }
            if self.turn.is_text_finalized() && cursor >= self.turn.assigned() {
                return cursor;
            }
            self.turn.wait_progress(cursor).await;
        }
    }

    async fn consume(&self, sequence: u64, entry: ResolvedEntry) {
        match entry {
            ResolvedEntry::Audio(clip) => {
                let raw = self.turn.raw_text_for(sequence).unwrap_or_default();
                self.transcript.speech_line(echo_text(&raw));
                if let Err(e) = self.playback.play(clip).await {
                    output::warn(&format!("playback failed: {e}"));
                }
            }
            ResolvedEntry::Silence => {
                let raw = self.turn.raw_text_for(sequence).unwrap_or_default();
                self.transcript.silence_line(&raw);
            }
            ResolvedEntry::Directive(payload) => {
                match parse_directive(&payload) {
                    Some(action) => self.transcript.note_line(action.display()),
                    None => self.transcript.note_line(&payload),
                }
                if let Err(e) = self.directives.dispatch(&payload).await {
                    output::warn(&format!("directive failed: {e}"));
                }
            }
            ResolvedEntry::Failed(message) => {
                output::warn(&format!("segment {sequence} skipped: {message}"));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::clip::AudioClip;
    use crate::pipeline::sink::{CollectorSink, OutputEvent};
    use crate::pipeline::types::Segment;
    use std::time::Duration;

    fn clip(frames: usize) -> AudioClip {
        AudioClip::new(vec![0.1; frames], 16_000, 1)
    }

    fn wire(turn: &Arc<Turn>) -> (SequencerStation, Arc<CollectorSink>) {
        let sink = Arc::new(CollectorSink::new());
        let station = SequencerStation::new(
            Arc::clone(turn),
            sink.clone(),
            sink.clone(),
            sink.clone(),
        );
        (station, sink)
    }

    #[test]
    fn test_echo_text_trims_one_space_then_one_newline() {
        assert_eq!(echo_text(" Hello"), "Hello");
        assert_eq!(echo_text("\nHow"), "How");
        assert_eq!(echo_text(" \nBoth"), "Both");
        assert_eq!(echo_text("  double"), " double");
        assert_eq!(echo_text("plain"), "plain");
    }

    #[tokio::test]
    async fn test_out_of_order_resolution_plays_in_order() {
        let turn = Arc::new(Turn::new());
        for (i, text) in ["One.", " Two.", " Three."].iter().enumerate() {
            turn.record_segment(&Segment::speech(
                i as u64,
                text.to_string(),
                text.trim().to_string(),
            ));
        }
        // Completions land backwards
        turn.resolve(2, ResolvedEntry::Audio(clip(30)));
        turn.resolve(1, ResolvedEntry::Audio(clip(20)));
        turn.resolve(0, ResolvedEntry::Audio(clip(10)));
        turn.finalize_text();

        let (station, sink) = wire(&turn);
        assert_eq!(station.run().await, 3);

        assert_eq!(
            sink.events(),
            vec![
                OutputEvent::Speech("One.".to_string()),
                OutputEvent::Clip(10),
                OutputEvent::Speech("Two.".to_string()),
                OutputEvent::Clip(20),
                OutputEvent::Speech("Three.".to_string()),
                OutputEvent::Clip(30),
            ]
        );
    }

    #[tokio::test]
    async fn test_cursor_blocks_on_missing_slot() {
        let turn = Arc::new(Turn::new());
        turn.record_segment(&Segment::speech(0, "A.".to_string(), "A.".to_string()));
        turn.record_segment(&Segment::speech(1, "B.".to_string(), "B.".to_string()));

        let (station, sink) = wire(&turn);
        let runner = tokio::spawn(station.run());

        // Slot 1 first: nothing may play yet
        turn.resolve(1, ResolvedEntry::Audio(clip(2)));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(sink.events().is_empty());

        turn.resolve(0, ResolvedEntry::Audio(clip(1)));
        turn.finalize_text();
        assert_eq!(runner.await.unwrap(), 2);

        assert_eq!(
            sink.events(),
            vec![
                OutputEvent::Speech("A.".to_string()),
                OutputEvent::Clip(1),
                OutputEvent::Speech("B.".to_string()),
                OutputEvent::Clip(2),
            ]
        );
    }

    #[tokio::test]
    async fn test_failed_slot_is_skipped() {
        let turn = Arc::new(Turn::new());
        turn.resolve(0, ResolvedEntry::Audio(clip(5)));
        turn.resolve(1, ResolvedEntry::Failed("timeout".to_string()));
        turn.resolve(2, ResolvedEntry::Audio(clip(7)));
        for i in 0..3u64 {
            turn.record_segment(&Segment::speech(i, format!("s{i}."), format!("s{i}.")));
        }
        turn.finalize_text();

        let (station, sink) = wire(&turn);
        assert_eq!(station.run().await, 3);

        let frame_counts: Vec<usize> = sink
            .events()
            .iter()
            .filter_map(|e| match e {
                OutputEvent::Clip(frames) => Some(*frames),
                _ => None,
            })
            .collect();
        assert_eq!(frame_counts, vec![5, 7]);
    }

    #[tokio::test]
    async fn test_silence_and_directive_interleave_in_order() {
        let turn = Arc::new(Turn::new());
        turn.record_segment(&Segment::speech(
            0,
            "Play it.".to_string(),
            "Play it.".to_string(),
        ));
        turn.record_segment(&Segment::silence(1, String::new()));
        turn.record_segment(&Segment::directive(
            2,
            "[SYSTEM] [note=C4] [/SYSTEM]".to_string(),
        ));
        turn.resolve(0, ResolvedEntry::Audio(clip(4)));
        turn.resolve(1, ResolvedEntry::Silence);
        turn.resolve(2, ResolvedEntry::Directive("[SYSTEM] [note=C4] [/SYSTEM]".to_string()));
        turn.finalize_text();

        let (station, sink) = wire(&turn);
        assert_eq!(station.run().await, 3);

        assert_eq!(
            sink.events(),
            vec![
                OutputEvent::Speech("Play it.".to_string()),
                OutputEvent::Clip(4),
                OutputEvent::Silence(String::new()),
                OutputEvent::Note("C4".to_string()),
                OutputEvent::Directive("[SYSTEM] [note=C4] [/SYSTEM]".to_string()),
            ]
        );
    }

    #[tokio::test]
    async fn test_abort_before_run_consumes_nothing() {
        let turn = Arc::new(Turn::new());
        turn.resolve(0, ResolvedEntry::Audio(clip(3)));
        turn.abort();

        let (station, sink) = wire(&turn);
        assert_eq!(station.run().await, 0);
        assert!(sink.events().is_empty());
    }

    #[tokio::test]
    async fn test_abort_wakes_a_blocked_cursor() {
        let turn = Arc::new(Turn::new());
        turn.record_segment(&Segment::speech(0, "Stuck.".to_string(), "Stuck.".to_string()));

        let (station, _sink) = wire(&turn);
        let runner = tokio::spawn(station.run());
        tokio::time::sleep(Duration::from_millis(10)).await;
        turn.abort();
        assert_eq!(runner.await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_empty_finalized_turn_drains_immediately() {
        let turn = Arc::new(Turn::new());
        turn.finalize_text();
        let (station, sink) = wire(&turn);
        assert_eq!(station.run().await, 0);
        assert!(sink.events().is_empty());
    }
}
