//! Error types for voxpipe.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoxpipeError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Synthesis errors
    #[error("No synthesis API key: set ELEVENLABS_API_KEY or VOXPIPE_API_KEY")]
    MissingApiKey,

    #[error("Synthesis request rejected with status {status}: {message}")]
    SynthesisRejected { status: u16, message: String },

    #[error("Synthesis failed: {message}")]
    Synthesis { message: String },

    // Audio errors
    #[error("Audio decode failed: {message}")]
    AudioDecode { message: String },

    #[error("Playback failed: {message}")]
    Playback { message: String },

    // Directive errors
    #[error("Directive dispatch failed: {message}")]
    Directive { message: String },

    // HTTP transport errors
    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Generic error for cases not covered above
    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, VoxpipeError>;
