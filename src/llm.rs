//! Language model access
//!
//! The extractor and the itinerary generator only see the [`LanguageModel`]
//! trait. [`OpenAiCompatibleClient`] speaks the `/chat/completions` protocol,
//! which Gemini, OpenAI and most local servers expose.

use crate::config::LlmSettings;
use crate::{Result, TravelError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

/// A single prompt sent to a model
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    /// Ask the provider for a JSON object instead of free text
    pub json_output: bool,
}

impl CompletionRequest {
    pub fn text(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            json_output: false,
        }
    }

    pub fn json(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            json_output: true,
        }
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Run one completion and return the model's text
    async fn complete(&self, request: CompletionRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Client for any OpenAI-compatible chat-completions endpoint
pub struct OpenAiCompatibleClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(settings: &LlmSettings, timeout: Duration) -> Result<Self> {
        let http_client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAiCompatibleClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatibleClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatibleClient {
    #[instrument(level = "info", skip(self, request), fields(model = %self.model, json = request.json_output))]
    async fn complete(&self, request: CompletionRequest) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: request
                .json_output
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, prompt_length = request.prompt.len(), "Sending completion request");

        let start_time = std::time::Instant::now();
        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;
        let status = response.status();

        info!(
            status = %status,
            duration_ms = start_time.elapsed().as_millis(),
            "Completion request finished"
        );

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ApiErrorBody>(&text)
                .map(|body| body.error.message)
                .unwrap_or(text);
            error!(status = %status, message = %message, "Completion request failed");
            return Err(TravelError::api("LLM", status.as_u16(), message));
        }

        let chat: ChatResponse = response.json().await?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| TravelError::llm("completion contained no text"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn settings(base_url: String) -> LlmSettings {
        LlmSettings {
            api_key: "test-key".to_string(),
            base_url,
            model: "test-model".to_string(),
        }
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("authorization", "Bearer test-key")
                    .body_contains("\"json_object\"")
                    .body_contains("\"test-model\"");
                then.status(200).json_body(json!({
                    "choices": [{"message": {"role": "assistant", "content": "{\"origin\":\"Oslo\"}"}}]
                }));
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url()), Duration::from_secs(5)).unwrap();
        let text = client
            .complete(CompletionRequest::json("system", "prompt"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(text, "{\"origin\":\"Oslo\"}");
    }

    #[tokio::test]
    async fn test_error_body_is_surfaced() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(401)
                    .json_body(json!({"error": {"message": "API key not valid"}}));
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url()), Duration::from_secs(5)).unwrap();
        let err = client
            .complete(CompletionRequest::text("system", "prompt"))
            .await
            .unwrap_err();

        match err {
            TravelError::Api { status, message, .. } => {
                assert_eq!(status, 401);
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choice_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let client = OpenAiCompatibleClient::new(&settings(server.base_url()), Duration::from_secs(5)).unwrap();
        let result = client.complete(CompletionRequest::text("s", "p")).await;
        assert!(matches!(result, Err(TravelError::Llm(_))));
    }

    #[test]
    fn test_debug_hides_key() {
        let client = OpenAiCompatibleClient::new(
            &settings("http://localhost".to_string()),
            Duration::from_secs(5),
        )
        .unwrap();
        assert!(!format!("{client:?}").contains("test-key"));
        assert_eq!(client.model(), "test-model");
    }
}
