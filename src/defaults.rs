//! Default configuration constants for voxpipe.
//!
//! This module provides shared constants used across different configuration types
//! to ensure consistency and eliminate duplication.

/// Default synthesis service base URL.
pub const API_BASE_URL: &str = "https://api.elevenlabs.io";

/// Default voice identifier.
///
/// ElevenLabs' stock "Rachel" voice, available on every account tier.
/// Override with `synthesis.voice_id` or `--voice`.
pub const VOICE_ID: &str = "21m00Tcm4TlvDq8ikWAM";

/// Default synthesis model identifier.
///
/// The flash model trades a little quality for the low latency a
/// sentence-at-a-time pipeline needs.
pub const MODEL_ID: &str = "eleven_flash_v2_5";

/// Default maximum number of simultaneous synthesis requests.
///
/// The service accepts bursts well above this, but 18 keeps a long answer
/// fully pipelined without tripping per-account rate limits.
pub const MAX_CONCURRENT: usize = 18;

/// Default synthesis request timeout in seconds.
///
/// A single sentence rarely takes more than a few seconds to synthesize;
/// anything beyond this is a stuck connection and the slot is better spent
/// marking the segment failed.
pub const REQUEST_TIMEOUT_SECS: u64 = 15;

/// Default duration trimmed from the end of each decoded clip, in milliseconds.
///
/// The service pads clips with trailing room tone; cutting it tightens the
/// gap between consecutive sentences.
pub const TAIL_TRIM_MS: u32 = 180;

/// Default fade-out duration in milliseconds.
///
/// A short linear fade after the tail trim removes the click a hard cut
/// would leave at the clip boundary.
pub const FADE_OUT_MS: u32 = 30;

/// Default endpoint for directive dispatch.
///
/// Directives embedded in the text stream are forwarded here as query
/// parameters; the receiver is expected to be a local bridge process.
pub const DIRECTIVE_ENDPOINT: &str = "http://127.0.0.1:5000/play";

/// Directive dispatch timeout in seconds.
///
/// Dispatch happens at the playback cursor; an unreachable bridge must
/// not hold up the next clip for long.
pub const DIRECTIVE_TIMEOUT_SECS: u64 = 2;

/// Default upstream stall timeout in seconds.
///
/// If the text stream goes quiet for this long mid-turn, the turn is
/// finalized early so whatever was already segmented still plays out.
pub const STALL_TIMEOUT_SECS: u64 = 20;
