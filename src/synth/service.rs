//! The synthesis seam.
//!
//! Stations talk to a [`SpeechSynthesizer`] trait object, so tests swap in
//! [`MockSynthesizer`] and the binary wires up the ElevenLabs client.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use crate::audio::clip::AudioClip;
use crate::error::{Result, VoxpipeError};
use crate::pipeline::turn::SpeechContext;

/// One synthesis request: the text to speak plus the neighboring transcript
/// text the voice uses for prosody across segment boundaries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SynthesisRequest {
    pub text: String,
    pub context: SpeechContext,
}

impl SynthesisRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            context: SpeechContext::default(),
        }
    }

    pub fn with_context(text: impl Into<String>, context: SpeechContext) -> Self {
        Self {
            text: text.into(),
            context,
        }
    }
}

/// Turns a piece of text into a playable clip.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip>;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for std::sync::Arc<T> {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip> {
        (**self).synthesize(request).await
    }
}

/// In-process synthesizer for tests and benchmarks.
///
/// Produces a short clip whose length tracks the request text, with
/// configurable per-request delays and failures. Tracks peak concurrency so
/// tests can assert the limiter holds.
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    delay: Duration,
    delays: Mutex<HashMap<String, Duration>>,
    fail_on: Mutex<HashSet<String>>,
    concurrent: AtomicU32,
    peak: AtomicU32,
    requests: Mutex<Vec<SynthesisRequest>>,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Uniform delay applied to every request without its own override.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Overrides the delay for one exact request text.
    pub fn delay_for(self, text: impl Into<String>, delay: Duration) -> Self {
        self.delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(text.into(), delay);
        self
    }

    /// Makes requests with this exact text fail.
    pub fn fail_on(self, text: impl Into<String>) -> Self {
        self.fail_on
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(text.into());
        self
    }

    /// Highest number of requests that were in flight at the same time.
    pub fn peak_concurrency(&self) -> u32 {
        self.peak.load(Ordering::SeqCst)
    }

    /// Every request seen so far, in arrival order.
    pub fn requests(&self) -> Vec<SynthesisRequest> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    fn delay_of(&self, text: &str) -> Duration {
        self.delays
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(text)
            .copied()
            .unwrap_or(self.delay)
    }

    fn should_fail(&self, text: &str) -> bool {
        self.fail_on
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .contains(text)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request.clone());

        let now = self.concurrent.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);

        let delay = self.delay_of(&request.text);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        self.concurrent.fetch_sub(1, Ordering::SeqCst);

        if self.should_fail(&request.text) {
            return Err(VoxpipeError::Synthesis {
                message: format!("mock failure for {:?}", request.text),
            });
        }

        // One frame per character keeps clip length proportional to input.
        let frames = request.text.chars().count().max(1) * 40;
        Ok(AudioClip::new(vec![0.25; frames], 16_000, 1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_object_safe(_: &dyn SpeechSynthesizer) {}

    #[tokio::test]
    async fn test_mock_records_requests_in_order() {
        let mock = MockSynthesizer::new();
        mock.synthesize(&SynthesisRequest::new("first"))
            .await
            .unwrap();
        mock.synthesize(&SynthesisRequest::new("second"))
            .await
            .unwrap();

        let texts: Vec<String> = mock.requests().into_iter().map(|r| r.text).collect();
        assert_eq!(texts, vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_mock_clip_length_tracks_text() {
        let mock = MockSynthesizer::new();
        let short = mock.synthesize(&SynthesisRequest::new("ab")).await.unwrap();
        let long = mock
            .synthesize(&SynthesisRequest::new("a much longer sentence"))
            .await
            .unwrap();
        assert!(long.samples.len() > short.samples.len());
    }

    #[tokio::test]
    async fn test_mock_failure_is_an_error() {
        let mock = MockSynthesizer::new().fail_on("bad");
        let err = mock
            .synthesize(&SynthesisRequest::new("bad"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("bad"));
        assert!(mock.synthesize(&SynthesisRequest::new("good")).await.is_ok());
    }

    #[tokio::test]
    async fn test_per_text_delay_overrides_uniform_delay() {
        let mock = MockSynthesizer::new()
            .with_delay(Duration::from_millis(50))
            .delay_for("quick", Duration::ZERO);
        let start = std::time::Instant::now();
        mock.synthesize(&SynthesisRequest::new("quick"))
            .await
            .unwrap();
        assert!(start.elapsed() < Duration::from_millis(40));
    }

    #[tokio::test]
    async fn test_arc_impl_forwards() {
        let mock = std::sync::Arc::new(MockSynthesizer::new());
        assert_object_safe(&*mock);
        let clip = mock.synthesize(&SynthesisRequest::new("hi")).await.unwrap();
        assert!(!clip.is_empty());
        assert_eq!(mock.requests().len(), 1);
    }

    #[test]
    fn test_request_with_context_carries_neighbours() {
        let context = SpeechContext {
            previous: Some("Before.".into()),
            next: Some("After.".into()),
        };
        let request = SynthesisRequest::with_context("Middle.", context.clone());
        assert_eq!(request.context, context);
    }
}
