//! Decoded audio clips and end-of-clip shaping.
//!
//! Clips are interleaved f32 samples. Shaping (tail trim + fade-out) runs
//! once, right after decode, so stored clips are ready to play as-is.

/// A decoded audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// Interleaved samples in the range -1.0..=1.0.
    pub samples: Vec<f32>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of interleaved channels.
    pub channels: u16,
}

impl AudioClip {
    /// Creates a clip from raw interleaved samples.
    pub fn new(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Self {
        Self {
            samples,
            sample_rate,
            channels,
        }
    }

    /// Returns the clip duration in milliseconds.
    pub fn duration_ms(&self) -> u32 {
        if self.sample_rate == 0 {
            return 0;
        }
        (self.frame_count() as u64 * 1000 / self.sample_rate as u64) as u32
    }

    /// Returns true if the clip holds no samples.
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Number of sample frames (samples per channel).
    pub fn frame_count(&self) -> usize {
        self.samples.len() / self.channels.max(1) as usize
    }

    fn frames_for_ms(&self, ms: u32) -> usize {
        (self.sample_rate as u64 * ms as u64 / 1000) as usize
    }

    /// Drops up to `ms` milliseconds from the end of the clip.
    pub fn trim_tail(&mut self, ms: u32) {
        let channels = self.channels.max(1) as usize;
        let cut = self.frames_for_ms(ms);
        let keep = self.frame_count().saturating_sub(cut);
        self.samples.truncate(keep * channels);
    }

    /// Applies a linear fade over the final `ms` milliseconds.
    ///
    /// The last frame lands on zero so a trimmed clip ends without a click.
    pub fn fade_out(&mut self, ms: u32) {
        let channels = self.channels.max(1) as usize;
        let span = self.frames_for_ms(ms).min(self.frame_count());
        if span == 0 {
            return;
        }
        let start = self.frame_count() - span;
        for frame in 0..span {
            let gain = 1.0 - (frame as f32 + 1.0) / span as f32;
            let base = (start + frame) * channels;
            for sample in &mut self.samples[base..base + channels] {
                *sample *= gain;
            }
        }
    }

    /// Trims the tail, then applies the fade to the samples that remain.
    ///
    /// A clip that does not outlast the trim span is left whole: trimming
    /// it would silence a short utterance entirely.
    pub fn shape_tail(&mut self, trim_ms: u32, fade_ms: u32) {
        if self.duration_ms() <= trim_ms {
            return;
        }
        self.trim_tail(trim_ms);
        self.fade_out(fade_ms);
    }
}
