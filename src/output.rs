//! Terminal rendering for the transcript echo.
//!
//! Everything goes to stderr; stdout stays free for piping. The receiving
//! banner is drawn without a newline and wiped by the next line, the same
//! way a progress indicator would be.

use std::io::{self, Write};

const DIM: &str = "\x1b[2m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Shown while deltas stream in and nothing has played yet.
const RECEIVING_BANNER: &str = ">>>>>>  Receiving...  <<<<<<";

/// Clear the current terminal line (replaces the banner etc.)
pub fn clear_line() {
    eprint!("\r\x1b[2K");
}

/// Draws the receiving banner on the current line.
pub fn show_receiving() {
    eprint!("\r\x1b[2K{DIM}{RECEIVING_BANNER}{RESET}");
    io::stderr().flush().ok();
}

/// Prints one spoken segment as it starts playing.
pub fn speech_line(text: &str) {
    clear_line();
    eprintln!("{text}");
}

/// Prints a silence segment; usually an empty line marking a paragraph gap.
pub fn silence_line(text: &str) {
    clear_line();
    eprintln!("{DIM}{text}{RESET}");
}

/// Prints a directive marker at its position in the transcript.
pub fn note_line(text: &str) {
    clear_line();
    eprintln!("{DIM}\u{1f3b5} {text}{RESET}");
}

/// Non-fatal diagnostics.
pub fn warn(message: &str) {
    clear_line();
    eprintln!("{YELLOW}voxpipe: {message}{RESET}");
}

pub fn error_line(message: &str) {
    clear_line();
    eprintln!("{RED}voxpipe: {message}{RESET}");
}
