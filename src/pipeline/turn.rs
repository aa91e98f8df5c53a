//! Per-turn ordering state.
//!
//! A `Turn` owns everything that must reset between answers: the slot table
//! the sequencer drains, the transcript used for neighboring context and
//! echo, the lane-finalized flags, and the abort flag. Dropping the turn is
//! the reset; a straggler task still holding an `Arc` to an old turn writes
//! into that turn's table and can never touch the next one.

use crate::pipeline::types::{ResolvedEntry, Segment, SegmentKind};
use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::Notify;

/// A raise-once flag with an async wait.
///
/// Wakeups use `notify_one`, which stores a permit when nobody is waiting,
/// so a raise can never be lost. Consumers re-check state after waking.
#[derive(Debug, Default)]
pub struct Flag {
    raised: AtomicBool,
    notify: Notify,
}

impl Flag {
    pub fn raise(&self) {
        self.raised.store(true, Ordering::SeqCst);
        self.notify.notify_one();
    }

    pub fn is_raised(&self) -> bool {
        self.raised.load(Ordering::SeqCst)
    }

    pub async fn wait(&self) {
        while !self.is_raised() {
            self.notify.notified().await;
        }
    }
}

/// Append-only results keyed by sequence number.
///
/// One producer per slot by construction; a single consumer (the sequencer)
/// takes entries in order.
#[derive(Debug, Default)]
pub struct SlotTable {
    slots: Mutex<Vec<Option<ResolvedEntry>>>,
    filled: Notify,
}

impl SlotTable {
    /// Write-once insert. Returns false (and drops the entry) if the slot
    /// was already written; the first writer wins.
    pub fn insert(&self, sequence: u64, entry: ResolvedEntry) -> bool {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        let idx = sequence as usize;
        if slots.len() <= idx {
            slots.resize_with(idx + 1, || None);
        }
        if slots[idx].is_some() {
            return false;
        }
        slots[idx] = Some(entry);
        drop(slots);
        self.filled.notify_one();
        true
    }

    /// Removes and returns the entry at `sequence`, if present.
    pub fn take(&self, sequence: u64) -> Option<ResolvedEntry> {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.get_mut(sequence as usize).and_then(Option::take)
    }

    pub fn is_filled(&self, sequence: u64) -> bool {
        let slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots
            .get(sequence as usize)
            .is_some_and(|slot| slot.is_some())
    }

    fn notified(&self) -> tokio::sync::futures::Notified<'_> {
        self.filled.notified()
    }
}

/// Transcript record for one sequence number.
#[derive(Debug, Clone)]
pub struct TranscriptEntry {
    pub kind: SegmentKind,
    pub raw_text: String,
    pub clean_text: String,
}

/// Neighboring text handed to the synthesis service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeechContext {
    pub previous: Option<String>,
    pub next: Option<String>,
}

/// Ordering state for a single turn.
#[derive(Debug, Default)]
pub struct Turn {
    table: SlotTable,
    transcript: Mutex<BTreeMap<u64, TranscriptEntry>>,
    /// Count of assigned sequence numbers (highest + 1).
    assigned: AtomicU64,
    text_done: Flag,
    tools_done: Flag,
    aborted: Flag,
}

impl Turn {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a segment in the transcript and extends the assigned range.
    pub fn record_segment(&self, segment: &Segment) {
        let mut transcript = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
        transcript.insert(
            segment.sequence,
            TranscriptEntry {
                kind: segment.kind,
                raw_text: segment.raw_text.clone(),
                clean_text: segment.clean_text.clone(),
            },
        );
        drop(transcript);
        self.assigned
            .fetch_max(segment.sequence + 1, Ordering::SeqCst);
    }

    /// Records provisional forward context at a not-yet-assigned sequence
    /// number. Does not extend the assigned range; a real segment at the
    /// same number overwrites it.
    pub fn record_lookahead(&self, sequence: u64, clean_text: String) {
        if clean_text.is_empty() {
            return;
        }
        let mut transcript = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
        transcript.entry(sequence).or_insert(TranscriptEntry {
            kind: SegmentKind::Speech,
            raw_text: String::new(),
            clean_text,
        });
    }

    /// Collects up to 2 preceding and 2 following speech texts around
    /// `sequence`, skipping silence and directive entries without counting
    /// them. Texts are joined in reading order.
    pub fn context_for(&self, sequence: u64) -> SpeechContext {
        let transcript = self.transcript.lock().unwrap_or_else(|e| e.into_inner());

        let mut previous: Vec<&str> = transcript
            .range(..sequence)
            .rev()
            .filter(|(_, e)| e.kind == SegmentKind::Speech && !e.clean_text.is_empty())
            .take(2)
            .map(|(_, e)| e.clean_text.as_str())
            .collect();
        previous.reverse();

        let next: Vec<&str> = transcript
            .range(sequence + 1..)
            .filter(|(_, e)| e.kind == SegmentKind::Speech && !e.clean_text.is_empty())
            .take(2)
            .map(|(_, e)| e.clean_text.as_str())
            .collect();

        SpeechContext {
            previous: (!previous.is_empty()).then(|| previous.join(" ")),
            next: (!next.is_empty()).then(|| next.join(" ")),
        }
    }

    /// Returns the transcript text echoed when `sequence` plays.
    pub fn raw_text_for(&self, sequence: u64) -> Option<String> {
        let transcript = self.transcript.lock().unwrap_or_else(|e| e.into_inner());
        transcript.get(&sequence).map(|e| e.raw_text.clone())
    }

    /// Count of assigned sequence numbers so far.
    pub fn assigned(&self) -> u64 {
        self.assigned.load(Ordering::SeqCst)
    }

    /// Stores a resolved entry. Returns false if the slot was already
    /// written.
    pub fn resolve(&self, sequence: u64, entry: ResolvedEntry) -> bool {
        self.table.insert(sequence, entry)
    }

    /// Removes the entry at `sequence` for consumption.
    pub fn take_entry(&self, sequence: u64) -> Option<ResolvedEntry> {
        self.table.take(sequence)
    }

    pub fn is_resolved(&self, sequence: u64) -> bool {
        self.table.is_filled(sequence)
    }

    pub fn finalize_text(&self) {
        self.text_done.raise();
    }

    pub fn is_text_finalized(&self) -> bool {
        self.text_done.is_raised()
    }

    pub fn finalize_tools(&self) {
        self.tools_done.raise();
    }

    pub fn is_tools_finalized(&self) -> bool {
        self.tools_done.is_raised()
    }

    /// Raises the abort flag. The segmenter stops accepting input, in-flight
    /// synthesis writes into slots that will never be consumed, and the
    /// sequencer jumps its cursor past everything assigned.
    pub fn abort(&self) {
        self.aborted.raise();
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_raised()
    }

    /// Waits until the slot at `sequence` may have filled, the text lane
    /// finalized, or the turn aborted. Spurious wakeups are possible;
    /// callers re-check. Single-consumer: only the sequencer may wait here.
    ///
    /// The text-done edge is a wake source only until it fires; after that
    /// the sequencer can still be waiting on slow synthesis, and only a
    /// slot write or an abort counts as progress.
    pub async fn wait_progress(&self, sequence: u64) {
        if self.table.is_filled(sequence) || self.aborted.is_raised() {
            return;
        }
        if self.text_done.is_raised() {
            tokio::select! {
                _ = self.table.notified() => {}
                _ = self.aborted.notify.notified() => {}
            }
        } else {
            tokio::select! {
                _ = self.table.notified() => {}
                _ = self.text_done.notify.notified() => {}
                _ = self.aborted.notify.notified() => {}
            }
        }
    }
}
