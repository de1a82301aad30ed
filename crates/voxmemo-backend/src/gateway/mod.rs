//! Access to the hosted generative-AI service.
//!
//! [`AiGateway`] is what the router talks to. [`ModelGateway`] implements it
//! on top of any [`ContentGenerator`] (the Gemini REST client in production)
//! and owns input validation, per-call timeouts and the single "no speech"
//! fallback retry of transcriptions.

mod gemini;
mod prompts;

use std::time::Duration;

use async_trait::async_trait;
use voxmemo_bridge::{AudioPayload, ErrorKind, Failure, config::Config, language};

pub use crate::gateway::gemini::GeminiClient;

/// Audio formats the service accepts for transcription.
pub const SUPPORTED_FORMATS: &[&str] = &[
    "audio/mpeg",
    "audio/wav",
    "audio/webm",
    "audio/ogg",
    "audio/aac",
    "audio/mp4",
];

/// Errors produced by the AI gateway.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GatewayError {
    /// Nothing to process.
    #[error("no {0} provided")]
    EmptyInput(&'static str),
    /// The MIME type is not one of [`SUPPORTED_FORMATS`].
    #[error("unsupported audio format: {0}. Supported formats: {formats}", formats = SUPPORTED_FORMATS.join(", "))]
    UnsupportedFormat(String),
    /// The payload exceeds the configured limit.
    #[error("audio file too large: {size} bytes, maximum is {limit} bytes")]
    TooLarge { size: u64, limit: u64 },
    /// Even the lenient fallback found nothing to transcribe.
    #[error("audio may be silent or too unclear")]
    NoSpeech,
    /// The service rejected the call or could not be reached.
    #[error("{0}")]
    Provider(String),
    /// The service answered without any text.
    #[error("the AI service returned an empty response")]
    EmptyResponse,
    /// The call did not finish in time.
    #[error("the AI service did not answer within {0:?}")]
    Timeout(Duration),
    #[error("transcription failed: {0}")]
    Transcription(Box<GatewayError>),
    #[error("failed to translate text: {0}")]
    Translation(Box<GatewayError>),
    #[error("failed to summarize text: {0}")]
    Summarization(Box<GatewayError>),
}

impl GatewayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            GatewayError::EmptyInput(_)
            | GatewayError::UnsupportedFormat(_)
            | GatewayError::TooLarge { .. } => ErrorKind::InputValidation,
            GatewayError::Timeout(_) => ErrorKind::Timeout,
            GatewayError::NoSpeech | GatewayError::Provider(_) | GatewayError::EmptyResponse => {
                ErrorKind::Provider
            }
            GatewayError::Transcription(inner)
            | GatewayError::Translation(inner)
            | GatewayError::Summarization(inner) => inner.kind(),
        }
    }

    /// Whether the service classified the audio as containing no usable
    /// speech, which warrants one retry with the lenient configuration.
    fn is_no_speech(&self) -> bool {
        match self {
            GatewayError::EmptyResponse => true,
            GatewayError::Provider(message) => {
                let message = message.to_lowercase();
                message.contains("too short") || message.contains("no speech")
            }
            _ => false,
        }
    }
}

impl From<GatewayError> for Failure {
    fn from(error: GatewayError) -> Self {
        Failure::new(error.kind(), error.to_string())
    }
}

/// Operations the router needs from the AI service.
#[async_trait]
pub trait AiGateway: Send + Sync {
    /// Turns recorded audio into text.
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String, GatewayError>;

    /// Translates text into the target language (code or name).
    async fn translate(&self, text: &str, target_language: &str) -> Result<String, GatewayError>;

    /// Produces a concise summary.
    async fn summarize(&self, text: &str) -> Result<String, GatewayError>;

    /// Produces a short title for a memo.
    async fn generate_name(&self, transcription: &str) -> Result<String, GatewayError>;
}

/// A single generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub model: String,
    pub prompt: String,
    /// Inline audio sent alongside the prompt.
    pub audio: Option<AudioPayload>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// Something that can run one prompt against a model and return its text.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError>;
}

/// [`AiGateway`] backed by a [`ContentGenerator`].
pub struct ModelGateway<G> {
    generator: G,
    primary_model: String,
    fallback_model: String,
    temperature: f32,
    max_output_tokens: u32,
    max_audio_bytes: u64,
    timeout: Duration,
}

impl<G: ContentGenerator> ModelGateway<G> {
    pub fn new(generator: G, config: &Config) -> Self {
        Self {
            generator,
            primary_model: config.gemini.primary_model.clone(),
            fallback_model: config.gemini.fallback_model.clone(),
            temperature: config.gemini.temperature,
            max_output_tokens: config.gemini.max_output_tokens,
            max_audio_bytes: config.max_audio_bytes,
            timeout: Duration::from_secs(config.request_timeout_secs),
        }
    }

    fn text_request(&self, model: &str, prompt: String) -> GenerationRequest {
        GenerationRequest {
            model: model.to_string(),
            prompt,
            audio: None,
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Runs one call under the configured timeout and rejects blank output.
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let model = request.model.clone();
        let text = tokio::time::timeout(self.timeout, self.generator.generate(request))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout))??;
        if text.trim().is_empty() {
            log::warn!("Model {model} returned an empty response");
            return Err(GatewayError::EmptyResponse);
        }
        Ok(text)
    }

    fn validate_audio(&self, audio: &AudioPayload) -> Result<(), GatewayError> {
        if audio.is_empty() {
            return Err(GatewayError::EmptyInput("audio data"));
        }
        let essence = audio.essence();
        if !SUPPORTED_FORMATS.contains(&essence) {
            return Err(GatewayError::UnsupportedFormat(audio.mime_type.clone()));
        }
        let size = audio.len() as u64;
        if size > self.max_audio_bytes {
            return Err(GatewayError::TooLarge {
                size,
                limit: self.max_audio_bytes,
            });
        }
        Ok(())
    }
}

fn require_text(text: &str, what: &'static str) -> Result<(), GatewayError> {
    if text.trim().is_empty() {
        Err(GatewayError::EmptyInput(what))
    } else {
        Ok(())
    }
}

#[async_trait]
impl<G: ContentGenerator> AiGateway for ModelGateway<G> {
    async fn transcribe(&self, audio: &AudioPayload) -> Result<String, GatewayError> {
        self.validate_audio(audio)?;
        log::info!(
            "Transcribing {} bytes of {} with {}",
            audio.len(),
            audio.mime_type,
            self.primary_model
        );

        let primary = GenerationRequest {
            model: self.primary_model.clone(),
            prompt: prompts::TRANSCRIPTION.to_string(),
            audio: Some(audio.clone()),
            temperature: Some(self.temperature),
            max_output_tokens: Some(self.max_output_tokens),
        };
        let err = match self.generate(primary).await {
            Ok(text) => return Ok(text),
            Err(err) if err.is_no_speech() => err,
            Err(err) => return Err(GatewayError::Transcription(Box::new(err))),
        };

        log::info!(
            "Primary transcription found no speech ({err}), retrying with {}",
            self.fallback_model
        );
        let fallback = GenerationRequest {
            model: self.fallback_model.clone(),
            prompt: prompts::SHORT_AUDIO_FALLBACK.to_string(),
            audio: Some(audio.clone()),
            temperature: None,
            max_output_tokens: None,
        };
        match self.generate(fallback).await {
            Ok(text) => Ok(text),
            Err(GatewayError::EmptyResponse) => Err(GatewayError::NoSpeech),
            Err(err) => Err(GatewayError::Transcription(Box::new(err))),
        }
    }

    async fn translate(&self, text: &str, target_language: &str) -> Result<String, GatewayError> {
        require_text(text, "text")?;
        require_text(target_language, "target language")?;
        let language = language::display_name(target_language);
        let request = self.text_request(&self.primary_model, prompts::translation(text, language));
        self.generate(request)
            .await
            .map_err(|err| GatewayError::Translation(Box::new(err)))
    }

    async fn summarize(&self, text: &str) -> Result<String, GatewayError> {
        require_text(text, "transcript")?;
        let request = self.text_request(&self.primary_model, prompts::summary(text));
        self.generate(request)
            .await
            .map_err(|err| GatewayError::Summarization(Box::new(err)))
    }

    async fn generate_name(&self, transcription: &str) -> Result<String, GatewayError> {
        require_text(transcription, "transcription")?;
        let request = self.text_request(&self.fallback_model, prompts::title(transcription));
        let title = self.generate(request).await?;
        Ok(title.trim().trim_matches('"').to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records every request.
    #[derive(Default)]
    struct ScriptedGenerator {
        results: Mutex<VecDeque<Result<String, GatewayError>>>,
        requests: Mutex<Vec<GenerationRequest>>,
        delay: Option<Duration>,
    }

    impl ScriptedGenerator {
        fn new(results: Vec<Result<String, GatewayError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                ..Self::default()
            }
        }

        fn models(&self) -> Vec<String> {
            self.requests
                .lock()
                .unwrap()
                .iter()
                .map(|request| request.model.clone())
                .collect()
        }
    }

    #[async_trait]
    impl ContentGenerator for ScriptedGenerator {
        async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
            self.requests.lock().unwrap().push(request);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("unexpected call".to_string()))
        }
    }

    fn gateway(generator: ScriptedGenerator) -> ModelGateway<ScriptedGenerator> {
        ModelGateway::new(generator, &Config::default())
    }

    fn webm(len: usize) -> AudioPayload {
        AudioPayload::new(vec![1; len], "audio/webm;codecs=opus")
    }

    #[tokio::test]
    async fn transcribes_with_the_primary_model() {
        let gateway = gateway(ScriptedGenerator::new(vec![Ok("hello there".into())]));
        assert_eq!(gateway.transcribe(&webm(16)).await.unwrap(), "hello there");
        assert_eq!(gateway.generator.models(), vec!["gemini-2.0-flash"]);
        let requests = gateway.generator.requests.lock().unwrap();
        assert_eq!(requests[0].audio.as_ref().map(AudioPayload::len), Some(16));
        assert_eq!(requests[0].temperature, Some(0.2));
    }

    #[tokio::test]
    async fn no_speech_retries_once_with_the_fallback_model() {
        let gateway = gateway(ScriptedGenerator::new(vec![
            Err(GatewayError::Provider("Audio is too short".into())),
            Ok("uh, hi".into()),
        ]));
        assert_eq!(gateway.transcribe(&webm(16)).await.unwrap(), "uh, hi");
        assert_eq!(
            gateway.generator.models(),
            vec!["gemini-2.0-flash", "gemini-1.5-flash"]
        );
    }

    #[tokio::test]
    async fn empty_fallback_result_is_no_speech() {
        let gateway = gateway(ScriptedGenerator::new(vec![
            Ok("   ".into()),
            Ok("".into()),
        ]));
        assert_eq!(
            gateway.transcribe(&webm(16)).await,
            Err(GatewayError::NoSpeech)
        );
        assert_eq!(gateway.generator.models().len(), 2);
    }

    #[tokio::test]
    async fn other_provider_errors_are_not_retried() {
        let gateway = gateway(ScriptedGenerator::new(vec![Err(GatewayError::Provider(
            "quota exceeded".into(),
        ))]));
        let err = gateway.transcribe(&webm(16)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Provider);
        assert_eq!(gateway.generator.models().len(), 1);
    }

    #[tokio::test]
    async fn rejects_invalid_audio_before_calling_the_service() {
        let mut config = Config::default();
        config.max_audio_bytes = 8;
        let gateway = ModelGateway::new(ScriptedGenerator::default(), &config);

        assert_eq!(
            gateway.transcribe(&webm(0)).await,
            Err(GatewayError::EmptyInput("audio data"))
        );
        assert!(matches!(
            gateway
                .transcribe(&AudioPayload::new(vec![1], "video/x-flv"))
                .await,
            Err(GatewayError::UnsupportedFormat(_))
        ));
        assert_eq!(
            gateway.transcribe(&webm(9)).await,
            Err(GatewayError::TooLarge { size: 9, limit: 8 })
        );
        assert!(gateway.generator.models().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_calls_time_out() {
        let mut config = Config::default();
        config.request_timeout_secs = 1;
        let generator = ScriptedGenerator {
            delay: Some(Duration::from_secs(5)),
            ..ScriptedGenerator::new(vec![Ok("late".into())])
        };
        let gateway = ModelGateway::new(generator, &config);
        let err = gateway.summarize("some text").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Timeout);
    }

    #[tokio::test]
    async fn translation_prompt_uses_the_language_name() {
        let gateway = gateway(ScriptedGenerator::new(vec![Ok("hola".into())]));
        assert_eq!(gateway.translate("hello", "es").await.unwrap(), "hola");
        let requests = gateway.generator.requests.lock().unwrap();
        assert!(requests[0].prompt.contains("to Spanish"));
        assert!(requests[0].prompt.ends_with("hello"));
    }

    #[tokio::test]
    async fn translation_failure_wraps_the_provider_error() {
        let gateway = gateway(ScriptedGenerator::new(vec![Err(GatewayError::Provider(
            "503".into(),
        ))]));
        let err = gateway.translate("hello", "fr").await.unwrap_err();
        assert!(matches!(err, GatewayError::Translation(_)));
        assert_eq!(err.to_string(), "failed to translate text: 503");
    }

    #[tokio::test]
    async fn generated_names_are_trimmed() {
        let gateway = gateway(ScriptedGenerator::new(vec![Ok(" \"Grocery List\"\n".into())]));
        assert_eq!(
            gateway.generate_name("buy milk and eggs").await.unwrap(),
            "Grocery List"
        );
    }
}
