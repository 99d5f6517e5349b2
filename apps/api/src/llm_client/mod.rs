//! LLM Gateway: the single point of entry for every provider call in the API.
//!
//! No other module may call a provider HTTP API directly. Handlers resolve the
//! selected provider into a `ProviderConfig` and pass it into `complete`.
//!
//! One round trip per call: no retry, no streaming, no client-side timeout.
use std::fmt;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const ANTHROPIC_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("LLM returned empty content")]
    EmptyContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// Per-call-site generation knobs. Fixed by the caller, never user-supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

/// Which wire protocol a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAi,
    Anthropic,
}

/// Credentials and model for one call, resolved from the selected `ai_providers` row.
#[derive(Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub model: String,
    pub api_key: String,
}

impl ProviderConfig {
    pub fn kind(&self) -> ProviderKind {
        let name = self.name.to_lowercase();
        if name.contains("anthropic") || name.contains("claude") {
            ProviderKind::Anthropic
        } else {
            ProviderKind::OpenAi
        }
    }
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// The gateway trait. Implement this to swap transports without touching
/// the pipelines or handlers.
///
/// Carried in `AppState` as `Arc<dyn LlmGateway>`.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    async fn complete(
        &self,
        provider: &ProviderConfig,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: Role,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: AnthropicUsage,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

/// Both providers wrap failures as `{"error": {"message": ...}}`.
#[derive(Debug, Deserialize)]
struct ProviderError {
    error: ProviderErrorBody,
}

#[derive(Debug, Deserialize)]
struct ProviderErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP gateway
// ────────────────────────────────────────────────────────────────────────────

/// Default gateway: OpenAI-compatible Chat Completions or Anthropic Messages over HTTPS.
#[derive(Clone)]
pub struct HttpLlmGateway {
    client: Client,
    openai_base_url: String,
    anthropic_base_url: String,
}

impl HttpLlmGateway {
    pub fn new(openai_base_url: impl Into<String>, anthropic_base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            openai_base_url: openai_base_url.into().trim_end_matches('/').to_string(),
            anthropic_base_url: anthropic_base_url.into().trim_end_matches('/').to_string(),
        }
    }

    async fn complete_openai(
        &self,
        provider: &ProviderConfig,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        let body = OpenAiRequest {
            model: &provider.model,
            messages,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.openai_base_url))
            .bearer_auth(&provider.api_key)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: OpenAiResponse = response.json().await?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "LLM call succeeded: model={}, prompt_tokens={}, completion_tokens={}",
                provider.model, usage.prompt_tokens, usage.completion_tokens
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyContent)
    }

    async fn complete_anthropic(
        &self,
        provider: &ProviderConfig,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let body = AnthropicRequest {
            model: &provider.model,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages: messages
                .iter()
                .filter(|m| m.role != Role::System)
                .map(|m| AnthropicMessage {
                    role: m.role,
                    content: &m.content,
                })
                .collect(),
        };

        let response = self
            .client
            .post(format!("{}/messages", self.anthropic_base_url))
            .header("x-api-key", &provider.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await?;
        let response = check_status(response).await?;
        let parsed: AnthropicResponse = response.json().await?;

        debug!(
            "LLM call succeeded: model={}, input_tokens={}, output_tokens={}",
            provider.model, parsed.usage.input_tokens, parsed.usage.output_tokens
        );

        parsed
            .content
            .into_iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text)
            .filter(|text| !text.is_empty())
            .ok_or(LlmError::EmptyContent)
    }
}

#[async_trait]
impl LlmGateway for HttpLlmGateway {
    async fn complete(
        &self,
        provider: &ProviderConfig,
        messages: &[ChatMessage],
        params: GenerationParams,
    ) -> Result<String, LlmError> {
        match provider.kind() {
            ProviderKind::OpenAi => self.complete_openai(provider, messages, params).await,
            ProviderKind::Anthropic => self.complete_anthropic(provider, messages, params).await,
        }
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, LlmError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<ProviderError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body);
    Err(LlmError::Api {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Scripted gateway: returns queued replies in order and records every call.
    #[derive(Default)]
    pub struct StubGateway {
        replies: Mutex<VecDeque<Result<String, LlmError>>>,
        pub calls: Mutex<Vec<(Vec<ChatMessage>, GenerationParams)>>,
    }

    impl StubGateway {
        pub fn replying(replies: &[&str]) -> Self {
            let stub = Self::default();
            {
                let mut queue = stub.replies.lock().unwrap();
                for reply in replies {
                    queue.push_back(Ok(reply.to_string()));
                }
            }
            stub
        }

        pub fn failing() -> Self {
            let stub = Self::default();
            stub.replies.lock().unwrap().push_back(Err(LlmError::Api {
                status: 500,
                message: "upstream down".to_string(),
            }));
            stub
        }
    }

    #[async_trait]
    impl LlmGateway for StubGateway {
        async fn complete(
            &self,
            _provider: &ProviderConfig,
            messages: &[ChatMessage],
            params: GenerationParams,
        ) -> Result<String, LlmError> {
            self.calls
                .lock()
                .unwrap()
                .push((messages.to_vec(), params));
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(LlmError::EmptyContent))
        }
    }

    pub fn provider() -> ProviderConfig {
        ProviderConfig {
            name: "openai".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: "sk-test".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    use super::*;

    type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    async fn openai_ok(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        captured.lock().unwrap().push((headers, body));
        Json(json!({
            "choices": [{"message": {"role": "assistant", "content": "olá"}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2}
        }))
    }

    async fn anthropic_ok(
        State(captured): State<Captured>,
        headers: HeaderMap,
        Json(body): Json<Value>,
    ) -> Json<Value> {
        captured.lock().unwrap().push((headers, body));
        Json(json!({
            "content": [{"type": "text", "text": "resumo"}],
            "usage": {"input_tokens": 10, "output_tokens": 2}
        }))
    }

    async fn failing() -> (StatusCode, Json<Value>) {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({"error": {"message": "Incorrect API key provided"}})),
        )
    }

    async fn spawn_fake(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn params() -> GenerationParams {
        GenerationParams {
            max_tokens: 4096,
            temperature: 0.2,
        }
    }

    #[test]
    fn test_provider_kind_from_name() {
        let mut provider = testing::provider();
        assert_eq!(provider.kind(), ProviderKind::OpenAi);
        provider.name = "Anthropic".to_string();
        assert_eq!(provider.kind(), ProviderKind::Anthropic);
        provider.name = "claude-prod".to_string();
        assert_eq!(provider.kind(), ProviderKind::Anthropic);
    }

    #[test]
    fn test_provider_debug_redacts_api_key() {
        let rendered = format!("{:?}", testing::provider());
        assert!(!rendered.contains("sk-test"));
        assert!(rendered.contains("<redacted>"));
    }

    #[tokio::test]
    async fn test_openai_request_carries_messages_and_params() {
        let captured: Captured = Arc::default();
        let base = spawn_fake(
            Router::new()
                .route("/chat/completions", post(openai_ok))
                .with_state(captured.clone()),
        )
        .await;
        let gateway = HttpLlmGateway::new(base, "http://unused.invalid");

        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("pergunta")];
        let text = gateway
            .complete(&testing::provider(), &messages, params())
            .await
            .unwrap();
        assert_eq!(text, "olá");

        let calls = captured.lock().unwrap();
        let (headers, body) = &calls[0];
        assert_eq!(headers["authorization"], "Bearer sk-test");
        assert_eq!(body["model"], "gpt-4o-mini");
        assert_eq!(body["max_tokens"], 4096);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "pergunta");
    }

    #[tokio::test]
    async fn test_anthropic_lifts_system_messages() {
        let captured: Captured = Arc::default();
        let base = spawn_fake(
            Router::new()
                .route("/messages", post(anthropic_ok))
                .with_state(captured.clone()),
        )
        .await;
        let gateway = HttpLlmGateway::new("http://unused.invalid", format!("{base}/"));
        let provider = ProviderConfig {
            name: "anthropic".to_string(),
            model: "claude-sonnet-4-5".to_string(),
            api_key: "ak-test".to_string(),
        };

        let messages = vec![ChatMessage::system("sys"), ChatMessage::user("pergunta")];
        let text = gateway.complete(&provider, &messages, params()).await.unwrap();
        assert_eq!(text, "resumo");

        let calls = captured.lock().unwrap();
        let (headers, body) = &calls[0];
        assert_eq!(headers["x-api-key"], "ak-test");
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn test_provider_error_is_surfaced_without_retry() {
        let base = spawn_fake(Router::new().route("/chat/completions", post(failing))).await;
        let gateway = HttpLlmGateway::new(base, "http://unused.invalid");

        let err = gateway
            .complete(&testing::provider(), &[ChatMessage::user("x")], params())
            .await
            .unwrap_err();
        match err {
            LlmError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Incorrect API key provided");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
