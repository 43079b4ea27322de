//! Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::provider::{
    CompletionRequest, CompletionResponse, FinishReason, LlmProvider, Role,
};
use crate::error::ServiceError;

const SERVICE: &str = "gemini";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 2048;

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(rename = "systemInstruction", skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'static str>,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    candidates: Option<Vec<Candidate>>,
    #[serde(rename = "usageMetadata")]
    usage_metadata: Option<UsageMetadata>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
    #[serde(rename = "finishReason")]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsageMetadata {
    #[serde(rename = "promptTokenCount", default)]
    prompt_token_count: u32,
    #[serde(rename = "candidatesTokenCount", default)]
    candidates_token_count: u32,
}

/// Gemini provider using an API key.
pub struct GeminiProvider {
    client: Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl GeminiProvider {
    pub fn new(api_key: SecretString, model: &str) -> Self {
        Self {
            client: Client::new(),
            api_key,
            model: model.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }

    /// Point the client at a different endpoint (proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn endpoint(&self) -> String {
        let model = self.model.strip_prefix("models/").unwrap_or(&self.model);
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn build_request(request: &CompletionRequest) -> GenerateContentRequest {
        let contents = request
            .messages
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| Content {
                role: Some(match m.role {
                    Role::Assistant => "model",
                    _ => "user",
                }),
                parts: vec![Part {
                    text: m.content.clone(),
                }],
            })
            .collect();

        let system_instruction = request.system_instruction().map(|text| Content {
            role: None,
            parts: vec![Part { text }],
        });

        GenerateContentRequest {
            contents,
            system_instruction,
            generation_config: GenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens.unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            },
        }
    }

    fn parse_response(body: GenerateContentResponse) -> Result<CompletionResponse, ServiceError> {
        let candidate = body
            .candidates
            .and_then(|c| c.into_iter().next())
            .ok_or_else(|| ServiceError::InvalidResponse {
                service: SERVICE.into(),
                reason: "no candidates in response".into(),
            })?;

        let finish_reason = match candidate.finish_reason.as_deref() {
            Some("STOP") => FinishReason::Stop,
            Some("MAX_TOKENS") => FinishReason::Length,
            Some("SAFETY") | Some("BLOCKLIST") | Some("PROHIBITED_CONTENT") => {
                FinishReason::Safety
            }
            _ => FinishReason::Unknown,
        };

        let content: String = candidate
            .content
            .map(|c| {
                c.parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .collect::<Vec<_>>()
                    .join("")
            })
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ServiceError::InvalidResponse {
                service: SERVICE.into(),
                reason: format!("empty response (finish reason {finish_reason:?})"),
            });
        }

        let (input_tokens, output_tokens) = body
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((0, 0));

        Ok(CompletionResponse {
            content,
            input_tokens,
            output_tokens,
            finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ServiceError> {
        let body = Self::build_request(&request);
        debug!(model = %self.model, messages = body.contents.len(), "Gemini request");

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::RequestFailed {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
            return Err(ServiceError::AuthFailed {
                service: SERVICE.into(),
            });
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ServiceError::RateLimited {
                service: SERVICE.into(),
            });
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::RequestFailed {
                service: SERVICE.into(),
                reason: format!("HTTP {status}: {}", text.chars().take(200).collect::<String>()),
            });
        }

        let parsed: GenerateContentResponse =
            response.json().await.map_err(|e| ServiceError::InvalidResponse {
                service: SERVICE.into(),
                reason: e.to_string(),
            })?;
        Self::parse_response(parsed)
    }
}
