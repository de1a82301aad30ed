use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Settings for the hosted Gemini models.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct GeminiConfig {
    /// Base URL of the `generateContent` REST API.
    pub base_url: String,
    /// Model used for every first attempt.
    pub primary_model: String,
    /// More lenient model used to retry transcriptions classified as
    /// "no speech".
    pub fallback_model: String,
    /// Sampling temperature for transcription.
    pub temperature: f32,
    /// Upper bound on generated tokens for transcription.
    pub max_output_tokens: u32,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            primary_model: "gemini-2.0-flash".to_string(),
            fallback_model: "gemini-1.5-flash".to_string(),
            temperature: 0.2,
            max_output_tokens: 4096,
        }
    }
}

/// Retry policy of the frontend's messaging layer.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct MessagingConfig {
    /// Attempts per request, including the first one.
    pub max_attempts: u32,
    /// Base delay between attempts in milliseconds; attempt `n` waits
    /// `n * retry_delay_ms`.
    pub retry_delay_ms: u64,
}

impl Default for MessagingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            retry_delay_ms: 1000,
        }
    }
}

/// Global application configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    /// API key for the generative-AI service. The `GEMINI_API_KEY`
    /// environment variable takes precedence.
    pub api_key: Option<String>,
    /// Model selection and generation parameters.
    pub gemini: GeminiConfig,
    /// Largest audio payload accepted for transcription, in bytes.
    pub max_audio_bytes: u64,
    /// Timeout for every call to the AI service, in seconds.
    pub request_timeout_secs: u64,
    /// Whether new memos get an AI-generated title instead of the start of
    /// their transcription.
    pub generate_names: bool,
    /// Translation language used until the user picks one.
    pub default_target_language: String,
    /// Retry policy of the frontend.
    pub messaging: MessagingConfig,
    /// Overrides the platform data directory for memo storage.
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: None,
            gemini: GeminiConfig::default(),
            max_audio_bytes: 10 * 1024 * 1024,
            request_timeout_secs: 30,
            generate_names: false,
            default_target_language: "Malayalam".to_string(),
            messaging: MessagingConfig::default(),
            data_dir: None,
        }
    }
}
