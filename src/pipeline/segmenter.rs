//! Text segmentation station.
//!
//! Accumulates streamed text deltas and splits them into ordered segments
//! as soon as a boundary is visible, so synthesis starts long before the
//! stream ends. Boundaries:
//!
//! - after sentence-final `.` `!` `?` when two non-digit, non-space
//!   characters precede it and whitespace (or the end of the buffer)
//!   follows, unless an emphasis marker follows;
//! - before a newline with at least two characters in front of it;
//! - a leading run of two or more newlines, emitted on its own;
//! - between a colon and an immediately following newline.
//!
//! Complete `[SYSTEM] ... [/SYSTEM]` blocks are pulled out before boundary
//! scanning; an unterminated block keeps everything from its opening marker
//! buffered until the terminator (or the end of the turn) arrives.

use crate::pipeline::types::Segment;

const SYSTEM_OPEN: &str = "[SYSTEM]";
const SYSTEM_CLOSE: &str = "[/SYSTEM]";

/// Strips listing and emphasis markup for synthesis.
///
/// Bullets and heading marks disappear; asterisks read better as
/// apostrophes than as "asterisk" when a model leaks markdown.
pub fn clean_text(text: &str) -> String {
    text.replace("- ", "")
        .replace('#', "")
        .replace('*', "'")
        .trim()
        .to_string()
}

/// Byte length of a leading newline run that forms its own segment:
/// two or more newlines followed by something that is not a newline.
fn leading_blank_run(text: &str) -> Option<usize> {
    let run = text.chars().take_while(|&c| c == '\n').count();
    if run >= 2 && run < text.chars().count() {
        Some(run) // '\n' is one byte, so char count == byte length
    } else {
        None
    }
}

/// Finds the earliest split point in `text`, returning the byte index at
/// which the ready segment ends.
fn scan_boundary(text: &str) -> Option<usize> {
    let chars: Vec<(usize, char)> = text.char_indices().collect();
    for pos in 0..chars.len() {
        let (byte_idx, c) = chars[pos];
        match c {
            '.' | '!' | '?' => {
                if pos < 2 {
                    continue;
                }
                let before_ok = [chars[pos - 1].1, chars[pos - 2].1]
                    .iter()
                    .all(|p| !p.is_whitespace() && !p.is_ascii_digit());
                if !before_ok {
                    continue;
                }
                match chars.get(pos + 1) {
                    None => return Some(text.len()),
                    Some(&(_, '*')) | Some(&(_, '_')) => continue,
                    Some(&(next_byte, next)) if next.is_whitespace() => {
                        return Some(next_byte);
                    }
                    Some(_) => continue,
                }
            }
            '\n' => {
                if pos >= 2 {
                    return Some(byte_idx);
                }
            }
            ':' => {
                if let Some(&(_, '\n')) = chars.get(pos + 1) {
                    return Some(byte_idx + 1);
                }
            }
            _ => {}
        }
    }
    None
}

/// Stateful segmenter for one turn.
#[derive(Debug, Default)]
pub struct Segmenter {
    buffer: String,
    next_sequence: u64,
    finalized: bool,
}

impl Segmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a delta and returns every segment that became ready.
    pub fn feed(&mut self, delta: &str) -> Vec<Segment> {
        if self.finalized || delta.is_empty() {
            return Vec::new();
        }
        self.buffer.push_str(delta);
        self.drain_ready()
    }

    /// Flushes the remaining buffer and closes the segmenter.
    ///
    /// A whitespace-only remainder is dropped. A second finalize is a no-op.
    /// An unterminated `[SYSTEM]` block in the remainder is flushed as
    /// ordinary text.
    pub fn finalize(&mut self) -> Vec<Segment> {
        if self.finalized {
            return Vec::new();
        }
        let mut out = self.drain_ready();
        if self.buffer.trim().is_empty() {
            self.buffer.clear();
        } else {
            let remainder = std::mem::take(&mut self.buffer);
            out.push(self.classify(remainder));
        }
        self.finalized = true;
        out
    }

    /// Text accumulated but not yet emitted as a segment.
    pub fn pending(&self) -> &str {
        &self.buffer
    }

    /// The sequence number the next segment will receive.
    pub fn next_sequence(&self) -> u64 {
        self.next_sequence
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn drain_ready(&mut self) -> Vec<Segment> {
        let mut out = Vec::new();
        loop {
            if let Some(split) = leading_blank_run(&self.buffer) {
                let run: String = self.buffer.drain(..split).collect();
                out.push(self.classify(run));
                continue;
            }

            if let Some(start) = self.buffer.find(SYSTEM_OPEN) {
                if let Some(rel_end) = self.buffer[start..].find(SYSTEM_CLOSE) {
                    let end = start + rel_end + SYSTEM_CLOSE.len();
                    let pre = self.buffer[..start].to_string();
                    let block = self.buffer[start..end].to_string();
                    self.buffer = self.buffer[end..].trim_start().to_string();
                    if !pre.trim().is_empty() {
                        out.push(self.classify(pre));
                    }
                    let sequence = self.bump();
                    out.push(Segment::directive(sequence, block));
                    continue;
                }
                // Unterminated block: only the text in front of the opening
                // marker may split.
                if start > 0
                    && let Some(split) = scan_boundary(&self.buffer[..start])
                {
                    let segment: String = self.buffer.drain(..split).collect();
                    out.push(self.classify(segment));
                    continue;
                }
                break;
            }

            match scan_boundary(&self.buffer) {
                Some(split) => {
                    let segment: String = self.buffer.drain(..split).collect();
                    out.push(self.classify(segment));
                }
                None => break,
            }
        }
        out
    }

    fn classify(&mut self, raw: String) -> Segment {
        let sequence = self.bump();
        if raw.chars().any(char::is_alphanumeric) {
            let clean = clean_text(&raw);
            Segment::speech(sequence, raw, clean)
        } else {
            Segment::silence(sequence, raw.trim().to_string())
        }
    }

    fn bump(&mut self) -> u64 {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        sequence
    }
}
