//! Gemini `generateContent` REST client.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use super::{ContentGenerator, GatewayError, GenerationRequest};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    generation_config: Option<GenerationConfig>,
}

#[derive(Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part {
    InlineData { inline_data: InlineData },
    Text { text: String },
}

#[derive(Serialize)]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_output_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

/// Client for the Gemini REST API.
#[derive(Debug, Clone)]
pub struct GeminiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
}

impl GeminiClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key
                .map(|key| key.trim().to_string())
                .filter(|key| !key.is_empty()),
        }
    }

    fn endpoint(&self, model: &str) -> String {
        format!(
            "{}/models/{model}:generateContent",
            self.base_url.trim_end_matches('/')
        )
    }
}

fn build_body(request: GenerationRequest) -> GenerateContentRequest {
    let mut parts = Vec::with_capacity(2);
    if let Some(audio) = request.audio {
        parts.push(Part::InlineData {
            inline_data: InlineData {
                mime_type: audio.mime_type,
                data: STANDARD.encode(&audio.bytes),
            },
        });
    }
    parts.push(Part::Text {
        text: request.prompt,
    });

    let generation_config = match (request.temperature, request.max_output_tokens) {
        (None, None) => None,
        (temperature, max_output_tokens) => Some(GenerationConfig {
            temperature,
            max_output_tokens,
        }),
    };

    GenerateContentRequest {
        contents: vec![Content { parts }],
        generation_config,
    }
}

fn extract_text(response: GenerateContentResponse) -> String {
    response
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default()
}

#[async_trait]
impl ContentGenerator for GeminiClient {
    async fn generate(&self, request: GenerationRequest) -> Result<String, GatewayError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(GatewayError::Provider("API key not configured".to_string()));
        };

        let url = self.endpoint(&request.model);
        log::debug!("Calling {url}");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(&build_body(request))
            .send()
            .await
            .map_err(|err| GatewayError::Provider(err.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|envelope| envelope.error.message)
                .unwrap_or(body);
            return Err(GatewayError::Provider(format!(
                "Gemini API error {status}: {message}"
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|err| GatewayError::Provider(format!("unreadable Gemini response: {err}")))?;
        Ok(extract_text(parsed))
    }
}
