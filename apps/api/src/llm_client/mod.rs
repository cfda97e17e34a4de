//! LLM client: the single point of entry for every third-party LLM call.
//!
//! No other module talks to a provider directly. Providers are tried in the
//! configured order, once each; the first one that returns parseable JSON wins.
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::models::report::ProviderFailure;

pub mod prompts;

const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;
const TEMPERATURE: f64 = 0.2;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("provider {0} has no API key")]
    MissingKey(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    Ollama,
    Groq,
    OpenAi,
    Gemini,
    Anthropic,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Ollama => "ollama",
            ProviderKind::Groq => "groq",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Gemini => "gemini",
            ProviderKind::Anthropic => "anthropic",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub kind: ProviderKind,
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
}

/// One text-in, text-out completion backend.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &str;
    fn model(&self) -> &str;
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError>;
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

// ────────────────────────────────────────────────────────────────────────────
// HTTP provider
// ────────────────────────────────────────────────────────────────────────────

pub struct HttpProvider {
    client: Client,
    config: ProviderConfig,
}

impl HttpProvider {
    pub fn new(config: ProviderConfig, timeout: Duration) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            config,
        })
    }

    fn api_key(&self) -> Result<&str, LlmError> {
        self.config
            .api_key
            .as_deref()
            .ok_or(LlmError::MissingKey(self.config.kind.as_str()))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> Result<reqwest::Response, LlmError> {
        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: body,
            });
        }
        Ok(response)
    }
}

fn non_empty(text: Option<String>) -> Result<String, LlmError> {
    text.filter(|t| !t.trim().is_empty())
        .ok_or(LlmError::EmptyContent)
}

#[async_trait]
impl LlmProvider for HttpProvider {
    fn name(&self) -> &str {
        self.config.kind.as_str()
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    async fn complete(&self, system: &str, prompt: &str) -> Result<String, LlmError> {
        let base = self.config.base_url.trim_end_matches('/');
        let model = self.config.model.as_str();

        match self.config.kind {
            ProviderKind::Ollama => {
                let body = json!({
                    "model": model,
                    "prompt": format!("{system}\n\n{prompt}"),
                    "stream": false,
                    "format": "json",
                });
                let response = self
                    .send(self.client.post(format!("{base}/api/generate")).json(&body))
                    .await?;
                let parsed: OllamaResponse = response.json().await?;
                non_empty(Some(parsed.response))
            }
            ProviderKind::Groq | ProviderKind::OpenAi => {
                let body = json!({
                    "model": model,
                    "temperature": TEMPERATURE,
                    "messages": [
                        { "role": "system", "content": system },
                        { "role": "user", "content": prompt },
                    ],
                });
                let request = self
                    .client
                    .post(format!("{base}/chat/completions"))
                    .bearer_auth(self.api_key()?)
                    .json(&body);
                let parsed: ChatCompletionResponse = self.send(request).await?.json().await?;
                non_empty(parsed.choices.into_iter().next().and_then(|c| c.message.content))
            }
            ProviderKind::Gemini => {
                let body = json!({
                    "systemInstruction": { "parts": [{ "text": system }] },
                    "contents": [{ "role": "user", "parts": [{ "text": prompt }] }],
                    "generationConfig": { "temperature": TEMPERATURE },
                });
                let request = self
                    .client
                    .post(format!("{base}/models/{model}:generateContent"))
                    .header("x-goog-api-key", self.api_key()?)
                    .json(&body);
                let parsed: GeminiResponse = self.send(request).await?.json().await?;
                non_empty(
                    parsed
                        .candidates
                        .into_iter()
                        .next()
                        .and_then(|c| c.content.parts.into_iter().find_map(|p| p.text)),
                )
            }
            ProviderKind::Anthropic => {
                let body = AnthropicRequest {
                    model,
                    max_tokens: MAX_TOKENS,
                    system,
                    messages: vec![ChatMessage {
                        role: "user",
                        content: prompt,
                    }],
                };
                let request = self
                    .client
                    .post(format!("{base}/messages"))
                    .header("x-api-key", self.api_key()?)
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json(&body);
                let parsed: AnthropicResponse = self.send(request).await?.json().await?;
                non_empty(
                    parsed
                        .content
                        .into_iter()
                        .find(|b| b.block_type == "text")
                        .and_then(|b| b.text),
                )
            }
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Provider chain
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Generated<T> {
    pub provider: String,
    pub model: String,
    pub value: T,
}

#[derive(Debug, Clone)]
pub struct ChainOutcome<T> {
    /// `None` when every provider failed or none is configured.
    pub generated: Option<Generated<T>>,
    pub failures: Vec<ProviderFailure>,
}

/// Ordered providers; each is attempted at most once per call.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn LlmProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn LlmProvider>>) -> Self {
        Self { providers }
    }

    pub fn from_configs(configs: &[ProviderConfig], timeout: Duration) -> Result<Self, LlmError> {
        let providers = configs
            .iter()
            .map(|c| Ok(Arc::new(HttpProvider::new(c.clone(), timeout)?) as Arc<dyn LlmProvider>))
            .collect::<Result<Vec<_>, LlmError>>()?;
        Ok(Self::new(providers))
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.providers.iter().map(|p| p.name().to_string()).collect()
    }

    /// Calls each provider in order and returns the first response that parses as `T`.
    pub async fn generate_json<T: DeserializeOwned>(&self, system: &str, prompt: &str) -> ChainOutcome<T> {
        let mut failures = Vec::new();

        for provider in &self.providers {
            let attempt = match provider.complete(system, prompt).await {
                Ok(text) => serde_json::from_str::<T>(strip_json_fences(&text)).map_err(LlmError::Parse),
                Err(e) => Err(e),
            };

            match attempt {
                Ok(value) => {
                    info!("LLM provider {} ({}) succeeded", provider.name(), provider.model());
                    return ChainOutcome {
                        generated: Some(Generated {
                            provider: provider.name().to_string(),
                            model: provider.model().to_string(),
                            value,
                        }),
                        failures,
                    };
                }
                Err(e) => {
                    warn!("LLM provider {} failed: {e}", provider.name());
                    failures.push(ProviderFailure {
                        provider: provider.name().to_string(),
                        error: e.to_string(),
                    });
                }
            }
        }

        debug!("No LLM provider produced a result ({} tried)", failures.len());
        ChainOutcome {
            generated: None,
            failures,
        }
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProvider {
        name: &'static str,
        reply: Result<&'static str, u16>,
        calls: AtomicUsize,
    }

    impl FakeProvider {
        fn new(name: &'static str, reply: Result<&'static str, u16>) -> Arc<Self> {
            Arc::new(Self {
                name,
                reply,
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl LlmProvider for FakeProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn model(&self) -> &str {
            "fake-model"
        }

        async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, LlmError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match self.reply {
                Ok(text) => Ok(text.to_string()),
                Err(status) => Err(LlmError::Api {
                    status,
                    message: "boom".to_string(),
                }),
            }
        }
    }

    #[derive(Debug, Deserialize)]
    struct Answer {
        ok: bool,
    }

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_without_tag() {
        let input = "```\n{\"key\": \"value\"}\n```";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        let input = "{\"key\": \"value\"}";
        assert_eq!(strip_json_fences(input), "{\"key\": \"value\"}");
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let first = FakeProvider::new("groq", Err(401));
        let second = FakeProvider::new("openai", Ok("```json\n{\"ok\": true}\n```"));
        let third = FakeProvider::new("gemini", Ok("{\"ok\": false}"));
        let providers: Vec<Arc<dyn LlmProvider>> = vec![first.clone(), second.clone(), third.clone()];
        let chain = ProviderChain::new(providers);

        let outcome = chain.generate_json::<Answer>("sys", "prompt").await;
        let generated = outcome.generated.unwrap();
        assert_eq!(generated.provider, "openai");
        assert!(generated.value.ok);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(outcome.failures[0].provider, "groq");
        assert_eq!(third.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_json_counts_as_failure() {
        let providers: Vec<Arc<dyn LlmProvider>> = vec![FakeProvider::new("ollama", Ok("Sure! Here you go."))];
        let chain = ProviderChain::new(providers);
        let outcome = chain.generate_json::<Answer>("sys", "prompt").await;
        assert!(outcome.generated.is_none());
        assert_eq!(outcome.failures.len(), 1);
    }

    #[tokio::test]
    async fn test_each_provider_tried_once() {
        let only = FakeProvider::new("anthropic", Err(503));
        let providers: Vec<Arc<dyn LlmProvider>> = vec![only.clone()];
        let chain = ProviderChain::new(providers);
        let outcome = chain.generate_json::<Answer>("sys", "prompt").await;
        assert!(outcome.generated.is_none());
        assert_eq!(only.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_chain_yields_nothing() {
        let chain = ProviderChain::default();
        assert!(chain.is_empty());
        let outcome = chain.generate_json::<Answer>("sys", "prompt").await;
        assert!(outcome.generated.is_none());
        assert!(outcome.failures.is_empty());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let provider = HttpProvider::new(
            ProviderConfig {
                kind: ProviderKind::OpenAi,
                base_url: "https://api.openai.com/v1".to_string(),
                model: "gpt-4o-mini".to_string(),
                api_key: None,
            },
            Duration::from_secs(1),
        )
        .unwrap();
        assert!(matches!(provider.api_key(), Err(LlmError::MissingKey("openai"))));
    }

    // ── wire formats ──

    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(kind: ProviderKind, server: &MockServer, api_key: Option<&str>) -> HttpProvider {
        HttpProvider::new(
            ProviderConfig {
                kind,
                base_url: server.uri(),
                model: "test-model".to_string(),
                api_key: api_key.map(str::to_string),
            },
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_ollama_generate_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(json!({"model": "test-model", "stream": false, "format": "json"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "{\"ok\": true}"})))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(ProviderKind::Ollama, &server, None)
            .complete("sys", "prompt")
            .await
            .unwrap();
        assert_eq!(text, "{\"ok\": true}");
    }

    #[tokio::test]
    async fn test_openai_compatible_request() {
        for kind in [ProviderKind::Groq, ProviderKind::OpenAi] {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/chat/completions"))
                .and(header("authorization", "Bearer secret"))
                .and(body_partial_json(json!({
                    "model": "test-model",
                    "messages": [{"role": "system", "content": "sys"}, {"role": "user", "content": "prompt"}],
                })))
                .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                    "choices": [{"message": {"role": "assistant", "content": "hello"}}]
                })))
                .expect(1)
                .mount(&server)
                .await;

            let text = provider(kind, &server, Some("secret"))
                .complete("sys", "prompt")
                .await
                .unwrap();
            assert_eq!(text, "hello");
        }
    }

    #[tokio::test]
    async fn test_gemini_generate_content_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/models/test-model:generateContent"))
            .and(header("x-goog-api-key", "secret"))
            .and(body_partial_json(json!({
                "systemInstruction": {"parts": [{"text": "sys"}]},
                "contents": [{"role": "user", "parts": [{"text": "prompt"}]}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "candidates": [{"content": {"parts": [{"text": "hello"}]}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(ProviderKind::Gemini, &server, Some("secret"))
            .complete("sys", "prompt")
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_anthropic_messages_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "secret"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_partial_json(json!({
                "model": "test-model",
                "system": "sys",
                "messages": [{"role": "user", "content": "prompt"}],
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{"type": "text", "text": "hello"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let text = provider(ProviderKind::Anthropic, &server, Some("secret"))
            .complete("sys", "prompt")
            .await
            .unwrap();
        assert_eq!(text, "hello");
    }

    #[tokio::test]
    async fn test_error_status_and_empty_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;
        let err = provider(ProviderKind::Groq, &server, Some("secret"))
            .complete("sys", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Api { status: 429, .. }));

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"response": "  "})))
            .mount(&server)
            .await;
        let err = provider(ProviderKind::Ollama, &server, None)
            .complete("sys", "prompt")
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::EmptyContent));
    }
}
