use crate::defaults;
use crate::error::{Result, VoxpipeError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub synthesis: SynthesisConfig,
    pub directives: DirectiveConfig,
    pub stream: StreamConfig,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SynthesisConfig {
    pub api_url: String,
    pub voice_id: String,
    pub model_id: String,
    /// API key; environment variables take precedence over this field.
    pub api_key: Option<String>,
    pub max_concurrent: usize,
    pub request_timeout_secs: u64,
    pub tail_trim_ms: u32,
    pub fade_out_ms: u32,
}

/// Directive dispatch configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DirectiveConfig {
    pub endpoint: String,
}

/// Upstream text stream configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StreamConfig {
    pub stall_timeout_secs: u64,
}

impl Default for SynthesisConfig {
    fn default() -> Self {
        Self {
            api_url: defaults::API_BASE_URL.to_string(),
            voice_id: defaults::VOICE_ID.to_string(),
            model_id: defaults::MODEL_ID.to_string(),
            api_key: None,
            max_concurrent: defaults::MAX_CONCURRENT,
            request_timeout_secs: defaults::REQUEST_TIMEOUT_SECS,
            tail_trim_ms: defaults::TAIL_TRIM_MS,
            fade_out_ms: defaults::FADE_OUT_MS,
        }
    }
}

impl Default for DirectiveConfig {
    fn default() -> Self {
        Self {
            endpoint: defaults::DIRECTIVE_ENDPOINT.to_string(),
        }
    }
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            stall_timeout_secs: defaults::STALL_TIMEOUT_SECS,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// A missing file is reported as [`VoxpipeError::ConfigFileNotFound`]
    /// carrying the path it looked for. Returns an error if the file
    /// contains invalid TOML. Missing fields will use default values.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VoxpipeError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
                .into());
            }
            Err(e) => return Err(e.into()),
        };
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Only returns defaults if the file is missing.
    /// Returns errors for invalid TOML.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if matches!(
                    e.downcast_ref::<VoxpipeError>(),
                    Some(VoxpipeError::ConfigFileNotFound { .. })
                ) {
                    Self::default()
                } else {
                    panic!("Failed to load config from {}: {}", path.display(), e);
                }
            }
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOXPIPE_VOICE → synthesis.voice_id
    /// - VOXPIPE_MODEL → synthesis.model_id
    /// - VOXPIPE_API_KEY → synthesis.api_key
    /// - ELEVENLABS_API_KEY → synthesis.api_key (lower precedence)
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(voice) = std::env::var("VOXPIPE_VOICE")
            && !voice.is_empty()
        {
            self.synthesis.voice_id = voice;
        }

        if let Ok(model) = std::env::var("VOXPIPE_MODEL")
            && !model.is_empty()
        {
            self.synthesis.model_id = model;
        }

        if let Ok(key) = std::env::var("ELEVENLABS_API_KEY")
            && !key.is_empty()
        {
            self.synthesis.api_key = Some(key);
        }

        if let Ok(key) = std::env::var("VOXPIPE_API_KEY")
            && !key.is_empty()
        {
            self.synthesis.api_key = Some(key);
        }

        self
    }

    /// Resolve the synthesis API key after env overrides have been applied.
    pub fn resolve_api_key(&self) -> Result<String> {
        self.synthesis
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or(VoxpipeError::MissingApiKey)
    }

    /// Validate values that would misbehave deep inside the pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.synthesis.max_concurrent == 0 {
            return Err(VoxpipeError::ConfigInvalidValue {
                key: "synthesis.max_concurrent".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.synthesis.request_timeout_secs == 0 {
            return Err(VoxpipeError::ConfigInvalidValue {
                key: "synthesis.request_timeout_secs".to_string(),
                message: "must be positive".to_string(),
            });
        }
        if self.directives.endpoint.is_empty() {
            return Err(VoxpipeError::ConfigInvalidValue {
                key: "directives.endpoint".to_string(),
                message: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Annotated default configuration, suitable for a fresh config file.
    pub fn template() -> String {
        format!(
            r#"# voxpipe configuration
#
# Every value below is the built-in default; delete anything you do
# not want to override. The environment variables VOXPIPE_VOICE,
# VOXPIPE_MODEL, and VOXPIPE_API_KEY (or ELEVENLABS_API_KEY) take
# precedence over this file.

[synthesis]
# Base URL of the synthesis service.
api_url = "{api_url}"
# Voice to synthesize with.
voice_id = "{voice_id}"
# Synthesis model.
model_id = "{model_id}"
# Upper bound on simultaneous synthesis requests.
max_concurrent = {max_concurrent}
# Per-request timeout in seconds.
request_timeout_secs = {request_timeout_secs}
# Milliseconds of trailing room tone cut from each clip.
tail_trim_ms = {tail_trim_ms}
# Linear fade applied after the trim, in milliseconds.
fade_out_ms = {fade_out_ms}
# api_key = "..."  # prefer the environment variables above

[directives]
# Where bracketed directives in the stream are forwarded.
endpoint = "{endpoint}"

[stream]
# Finalize the turn after this long without new input, in seconds.
stall_timeout_secs = {stall_timeout_secs}
"#,
            api_url = defaults::API_BASE_URL,
            voice_id = defaults::VOICE_ID,
            model_id = defaults::MODEL_ID,
            max_concurrent = defaults::MAX_CONCURRENT,
            request_timeout_secs = defaults::REQUEST_TIMEOUT_SECS,
            tail_trim_ms = defaults::TAIL_TRIM_MS,
            fade_out_ms = defaults::FADE_OUT_MS,
            endpoint = defaults::DIRECTIVE_ENDPOINT,
            stall_timeout_secs = defaults::STALL_TIMEOUT_SECS,
        )
    }

    /// Write the configuration template to `path`.
    ///
    /// Refuses to overwrite an existing file unless `force` is set.
    pub fn write_template(path: &Path, force: bool) -> Result<()> {
        if path.exists() && !force {
            return Err(VoxpipeError::Other(format!(
                "{} already exists (pass --force to overwrite)",
                path.display()
            )));
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, Self::template())?;
        Ok(())
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voxpipe/config.toml on Linux
    #[cfg(feature = "cli")]
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .expect("Could not determine config directory")
            .join("voxpipe")
            .join("config.toml")
    }

    #[cfg(not(feature = "cli"))]
    pub fn default_path() -> PathBuf {
        PathBuf::from("config.toml")
    }
}
