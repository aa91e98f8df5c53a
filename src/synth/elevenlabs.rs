//! ElevenLabs synthesis client.
//!
//! One POST per segment against the streaming endpoint. Neighboring
//! transcript text rides along as `previous_text` / `next_text` so prosody
//! carries across segment boundaries.

use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use crate::audio::clip::AudioClip;
use crate::audio::decode;
use crate::config::SynthesisConfig;
use crate::error::{Result, VoxpipeError};
use crate::synth::service::{SpeechSynthesizer, SynthesisRequest};

#[derive(Debug, Serialize)]
struct SynthesisBody<'a> {
    text: &'a str,
    model_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    previous_text: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    next_text: Option<&'a str>,
}

fn stream_url(base: &str, voice_id: &str) -> String {
    format!(
        "{}/v1/text-to-speech/{voice_id}/stream",
        base.trim_end_matches('/')
    )
}

pub struct ElevenLabsSynthesizer {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model_id: String,
}

impl ElevenLabsSynthesizer {
    /// Builds a client with the configured per-request timeout baked in.
    pub fn new(config: &SynthesisConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;
        Ok(Self {
            client,
            url: stream_url(&config.api_url, &config.voice_id),
            api_key,
            model_id: config.model_id.clone(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    async fn synthesize(&self, request: &SynthesisRequest) -> Result<AudioClip> {
        let body = SynthesisBody {
            text: &request.text,
            model_id: &self.model_id,
            previous_text: request.context.previous.as_deref(),
            next_text: request.context.next.as_deref(),
        };
        let response = self
            .client
            .post(&self.url)
            .header("xi-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(VoxpipeError::SynthesisRejected {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response.bytes().await?.to_vec();
        tokio::task::spawn_blocking(move || decode::decode(bytes))
            .await
            .map_err(|e| VoxpipeError::Synthesis {
                message: e.to_string(),
            })?
    }
}
