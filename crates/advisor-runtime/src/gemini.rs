//! Gemini LLM Provider
//!
//! Implementation of `LlmProvider` over the Gemini `generateContent` REST
//! API. Streaming uses `streamGenerateContent?alt=sse`.

use std::time::Duration;

use advisor_core::{
    error::{ProviderError, Result},
    message::{Message, Role},
    provider::{
        Completion, CompletionStream, FinishReason, GenerationOptions, LlmProvider, StreamChunk,
    },
};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};

use crate::lines::{lines, sse_data};

/// Gemini provider configuration
#[derive(Clone, Debug)]
pub struct GeminiConfig {
    /// API base URL
    pub base_url: String,

    /// API key (sent as `x-goog-api-key`)
    pub api_key: String,

    /// Default model
    pub model: String,

    /// Connection timeout in seconds
    pub connect_timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://generativelanguage.googleapis.com/v1beta".into(),
            api_key: String::new(),
            model: "gemini-1.5-flash".into(),
            connect_timeout_secs: 10,
        }
    }
}

impl GeminiConfig {
    /// Read `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_BASE_URL`
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ProviderError::Config("GEMINI_API_KEY not set".into()))?;

        let defaults = Self::default();
        Ok(Self {
            base_url: std::env::var("GEMINI_BASE_URL").unwrap_or(defaults.base_url),
            api_key,
            model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.model),
            ..defaults
        })
    }
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    top_p: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl Candidate {
    fn text(&self) -> String {
        self.content
            .as_ref()
            .map(|c| c.parts.iter().filter_map(|p| p.text.as_deref()).collect())
            .unwrap_or_default()
    }
}

fn finish_reason(raw: &str) -> FinishReason {
    match raw {
        "STOP" => FinishReason::Stop,
        "MAX_TOKENS" => FinishReason::Length,
        "SAFETY" | "RECITATION" | "BLOCKLIST" | "PROHIBITED_CONTENT" | "SPII" => {
            FinishReason::ContentFilter
        }
        _ => FinishReason::Error,
    }
}

/// Finish reason of `candidate`, or an error when the backend cut the
/// generation short (blocked content, internal failure)
fn checked_finish(candidate: &Candidate) -> Result<Option<FinishReason>> {
    let Some(raw) = candidate.finish_reason.as_deref() else {
        return Ok(None);
    };
    match finish_reason(raw) {
        FinishReason::ContentFilter | FinishReason::Error => Err(ProviderError::Provider(
            format!("generation stopped: {raw}"),
        )),
        reason => Ok(Some(reason)),
    }
}

// ============================================================================
// Provider
// ============================================================================

/// Gemini LLM provider
#[derive(Debug)]
pub struct GeminiProvider {
    client: Client,
    config: GeminiConfig,
}

impl GeminiProvider {
    /// Create from configuration
    pub fn from_config(config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()
            .map_err(|e| ProviderError::Config(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(GeminiConfig::from_env()?)
    }

    /// Configured default model
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Convert prompt messages to Gemini contents; system messages become
    /// the system instruction
    fn build_request(messages: &[Message], options: &GenerationOptions) -> GenerateRequest {
        let mut system = Vec::new();
        let mut contents = Vec::new();

        for m in messages {
            let part = Part {
                text: Some(m.content.clone()),
            };
            match m.role {
                Role::System => system.push(part),
                Role::User => contents.push(Content {
                    role: Some("user".into()),
                    parts: vec![part],
                }),
            }
        }

        GenerateRequest {
            contents,
            system_instruction: (!system.is_empty()).then_some(Content {
                role: None,
                parts: system,
            }),
            generation_config: GenerationConfig {
                temperature: options.temperature,
                top_p: options.top_p,
                max_output_tokens: options.max_tokens,
            },
        }
    }

    async fn post(&self, url: &str, body: &GenerateRequest) -> Result<Response> {
        let response = self
            .client
            .post(url)
            .header("x-goog-api-key", &self.config.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| ProviderError::ProviderUnavailable(e.to_string()))?;

        check_status(response).await
    }

    fn model_for<'a>(&'a self, options: &'a GenerationOptions) -> &'a str {
        if options.model.is_empty() {
            &self.config.model
        } else {
            &options.model
        }
    }
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<GenerateResponse>(&body)
        .ok()
        .and_then(|r| r.error)
        .map_or_else(|| format!("HTTP {status}"), |e| format!("HTTP {status}: {}", e.message));

    Err(match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => ProviderError::Auth(detail),
        StatusCode::TOO_MANY_REQUESTS => ProviderError::RateLimited(detail),
        s if s.is_server_error() => ProviderError::ProviderUnavailable(detail),
        _ => ProviderError::Provider(detail),
    })
}

/// Turn one SSE payload into a chunk; `Ok(None)` for keep-alive payloads
/// that carry no candidate. A blocking finish reason is an error, so the
/// consumer never treats a cut-off generation as complete.
fn parse_stream_event(payload: &str) -> Result<Option<StreamChunk>> {
    let event: GenerateResponse =
        serde_json::from_str(payload).map_err(|e| ProviderError::Parse(e.to_string()))?;

    if let Some(error) = event.error {
        return Err(ProviderError::Provider(error.message));
    }
    if let Some(reason) = event.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::Provider(format!("prompt blocked: {reason}")));
    }

    let Some(candidate) = event.candidates.first() else {
        return Ok(None);
    };

    let finish = checked_finish(candidate)?;
    Ok(Some(StreamChunk {
        delta: candidate.text(),
        done: finish.is_some(),
    }))
}

#[async_trait]
impl LlmProvider for GeminiProvider {
    fn name(&self) -> &str {
        "Gemini"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models/{}", self.config.base_url, self.config.model);
        let result = self
            .client
            .get(&url)
            .header("x-goog-api-key", &self.config.api_key)
            .send()
            .await;

        match result {
            Ok(r) if r.status().is_success() => Ok(true),
            Ok(r) => {
                tracing::warn!(status = %r.status(), "Gemini health check failed");
                Ok(false)
            }
            Err(e) => {
                tracing::warn!("Gemini health check failed: {}", e);
                Ok(false)
            }
        }
    }

    #[tracing::instrument(skip_all, fields(model = %self.model_for(options)))]
    async fn complete(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let model = self.model_for(options).to_string();
        let url = format!("{}/models/{}:generateContent", self.config.base_url, model);
        let request = Self::build_request(messages, options);

        let response: GenerateResponse = self
            .post(&url, &request)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
            return Err(ProviderError::Provider(format!("prompt blocked: {reason}")));
        }

        let candidate = response
            .candidates
            .first()
            .ok_or_else(|| ProviderError::NoCandidates("Gemini".into()))?;

        let finish_reason = checked_finish(candidate)?;
        Ok(Completion {
            content: candidate.text(),
            model,
            finish_reason,
        })
    }

    #[tracing::instrument(skip_all, fields(model = %self.model_for(options)))]
    async fn complete_stream(
        &self,
        messages: &[Message],
        options: &GenerationOptions,
    ) -> Result<CompletionStream> {
        let url = format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.config.base_url,
            self.model_for(options)
        );
        let request = Self::build_request(messages, options);

        let response = self.post(&url, &request).await?;

        let chunks = lines(response.bytes_stream()).filter_map(|line| async move {
            match line {
                Ok(line) => match sse_data(&line) {
                    Some(payload) => parse_stream_event(payload).transpose(),
                    None => None,
                },
                Err(e) => Some(Err(e)),
            }
        });

        Ok(Box::pin(chunks))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = GeminiConfig::default();
        assert_eq!(config.model, "gemini-1.5-flash");
        assert!(config.base_url.ends_with("/v1beta"));
    }

    #[test]
    fn test_build_request_splits_system_prompt() {
        let messages = vec![Message::system("Be brief."), Message::user("Hello")];
        let request = GeminiProvider::build_request(&messages, &GenerationOptions::default());

        assert_eq!(request.contents.len(), 1);
        assert_eq!(request.contents[0].role.as_deref(), Some("user"));
        assert!(request.system_instruction.is_some());

        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("systemInstruction").is_some());
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 2048);
    }

    #[test]
    fn test_parse_stream_event_text() {
        let chunk = parse_stream_event(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"Hel"},{"text":"lo"}]}}]}"#,
        )
        .unwrap()
        .unwrap();
        assert_eq!(chunk.delta, "Hello");
        assert!(!chunk.done);
    }

    #[test]
    fn test_parse_stream_event_finish() {
        let chunk = parse_stream_event(
            r#"{"candidates":[{"content":{"parts":[{"text":"."}]},"finishReason":"STOP"}],
               "usageMetadata":{"promptTokenCount":3,"candidatesTokenCount":5,"totalTokenCount":8}}"#,
        )
        .unwrap()
        .unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.delta, ".");

        let truncated = parse_stream_event(
            r#"{"candidates":[{"content":{"parts":[{"text":"..."}]},"finishReason":"MAX_TOKENS"}]}"#,
        )
        .unwrap()
        .unwrap();
        assert!(truncated.done);
    }

    #[test]
    fn test_parse_stream_event_safety_stop_is_error() {
        for reason in ["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT", "OTHER"] {
            let payload = format!(
                r#"{{"candidates":[{{"content":{{"parts":[{{"text":"x"}}]}},"finishReason":"{reason}"}}]}}"#
            );
            let result = parse_stream_event(&payload);
            assert!(
                matches!(&result, Err(ProviderError::Provider(msg)) if msg.contains(reason)),
                "{reason}: {result:?}"
            );
        }
    }

    #[test]
    fn test_parse_stream_event_error() {
        let result = parse_stream_event(r#"{"error":{"code":500,"message":"internal"}}"#);
        assert!(matches!(result, Err(ProviderError::Provider(msg)) if msg == "internal"));
    }

    #[test]
    fn test_parse_stream_event_without_candidates() {
        assert!(parse_stream_event(r#"{"candidates":[]}"#).unwrap().is_none());
    }

    #[test]
    fn test_finish_reason_mapping() {
        assert_eq!(finish_reason("STOP"), FinishReason::Stop);
        assert_eq!(finish_reason("MAX_TOKENS"), FinishReason::Length);
        assert_eq!(finish_reason("SAFETY"), FinishReason::ContentFilter);
        assert_eq!(finish_reason("OTHER"), FinishReason::Error);
    }
}
