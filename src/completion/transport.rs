//! Chat completion transport.
//!
//! The client's rotation and retry logic only sees the `ChatTransport`
//! trait; `OpenRouterTransport` is the HTTP implementation.

use super::credentials::Credential;
use async_openai::config::OpenAIConfig;
use async_openai::error::OpenAIError;
use async_openai::types::{
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
    ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs,
};
use async_openai::Client;
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use serde_json::error::Category;
use std::time::Duration;
use thiserror::Error;

/// A single request to the provider.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub model: &'a str,
    pub credential: &'a Credential,
    pub system_prompt: &'a str,
    pub user_message: &'a str,
}

/// Failure of a single request. Consumed by the client, never returned to callers.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("network error: {0}")]
    Network(String),

    /// The body was not JSON at all, e.g. an HTML page from a gateway.
    #[error("unreadable provider response: {0}")]
    Unreadable(String),

    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("malformed provider response: {0}")]
    Malformed(String),
}

impl TransportError {
    /// Whether the same (model, credential) pair is worth trying again.
    ///
    /// Retried: failures that never reached the provider, and bodies that
    /// are not JSON. Once the provider has given a readable verdict for a
    /// key, it stands.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            TransportError::Timeout(_) | TransportError::Network(_) | TransportError::Unreadable(_)
        )
    }
}

/// Sends one chat completion request and returns the generated text
/// (possibly empty).
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn send(&self, request: &CompletionRequest<'_>) -> Result<String, TransportError>;
}

/// OpenAI-compatible transport pointed at OpenRouter.
pub struct OpenRouterTransport {
    http: reqwest::Client,
    api_base: String,
    temperature: f32,
    timeout: Duration,
}

impl OpenRouterTransport {
    /// Create a transport whose HTTP client enforces `timeout` per request.
    pub fn new(
        api_base: &str,
        temperature: f32,
        timeout: Duration,
    ) -> crate::error::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| {
                crate::error::LawDecoderError::Config(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            http,
            api_base: api_base.trim_end_matches('/').to_string(),
            temperature,
            timeout,
        })
    }

    fn client_for(&self, credential: &Credential) -> Client<OpenAIConfig> {
        let config = OpenAIConfig::new()
            .with_api_base(&self.api_base)
            .with_api_key(credential.expose());
        // Rate limits surface immediately as `Rejected` so the caller can
        // rotate to the next credential instead of waiting on this one.
        let no_retry: ExponentialBackoff = ExponentialBackoffBuilder::new()
            .with_max_elapsed_time(Some(Duration::ZERO))
            .build();
        Client::with_config(config)
            .with_http_client(self.http.clone())
            .with_backoff(no_retry)
    }

    fn classify(&self, error: OpenAIError) -> TransportError {
        match error {
            OpenAIError::Reqwest(e) if e.is_timeout() => TransportError::Timeout(self.timeout),
            OpenAIError::Reqwest(e) => TransportError::Network(e.to_string()),
            OpenAIError::ApiError(api) => TransportError::Rejected(api.message),
            OpenAIError::JSONDeserialize(e) => match e.classify() {
                Category::Syntax | Category::Eof => TransportError::Unreadable(e.to_string()),
                Category::Data | Category::Io => TransportError::Malformed(e.to_string()),
            },
            other => TransportError::Malformed(other.to_string()),
        }
    }
}

#[async_trait]
impl ChatTransport for OpenRouterTransport {
    async fn send(&self, request: &CompletionRequest<'_>) -> Result<String, TransportError> {
        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.system_prompt)
                .build()
                .map_err(|e| TransportError::Malformed(e.to_string()))?
                .into(),
            ChatCompletionRequestUserMessageArgs::default()
                .content(request.user_message)
                .build()
                .map_err(|e| TransportError::Malformed(e.to_string()))?
                .into(),
        ];

        let body = CreateChatCompletionRequestArgs::default()
            .model(request.model)
            .messages(messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| TransportError::Malformed(e.to_string()))?;

        let response = self
            .client_for(request.credential)
            .chat()
            .create(body)
            .await
            .map_err(|e| self.classify(e))?;

        Ok(response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion_body(content: &str) -> serde_json::Value {
        json!({
            "id": "gen-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "qwen/qwen3-4b:free",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        })
    }

    fn transport(server: &MockServer) -> OpenRouterTransport {
        OpenRouterTransport::new(&server.uri(), 0.15, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_sends_system_and_user_messages_with_bearer_key() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer key-one"))
            .and(body_partial_json(json!({
                "model": "qwen/qwen3-4b:free",
                "messages": [
                    { "role": "system", "content": "be kind" },
                    { "role": "user", "content": "my phone was stolen" }
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("File an FIR.")))
            .expect(1)
            .mount(&server)
            .await;

        let credential = Credential::new("key-one");
        let text = transport(&server)
            .send(&CompletionRequest {
                model: "qwen/qwen3-4b:free",
                credential: &credential,
                system_prompt: "be kind",
                user_message: "my phone was stolen",
            })
            .await
            .unwrap();

        assert_eq!(text, "File an FIR.");
    }

    #[tokio::test]
    async fn test_auth_failure_is_not_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": { "message": "No auth credentials found", "type": null, "param": null, "code": null }
            })))
            .mount(&server)
            .await;

        let credential = Credential::new("bad");
        let err = transport(&server)
            .send(&CompletionRequest {
                model: "m",
                credential: &credential,
                system_prompt: "s",
                user_message: "u",
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::Rejected(_)));
        assert!(!err.is_retryable());
    }

    fn request<'a>(credential: &'a Credential) -> CompletionRequest<'a> {
        CompletionRequest {
            model: "m",
            credential,
            system_prompt: "s",
            user_message: "u",
        }
    }

    #[tokio::test]
    async fn test_gateway_html_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(502).set_body_string("<html><body>Bad Gateway</body></html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let credential = Credential::new("k1");
        let err = transport(&server).send(&request(&credential)).await.unwrap_err();

        assert!(matches!(err, TransportError::Unreadable(_)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_unexpected_json_shape_is_not_retried() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let credential = Credential::new("k1");
        let err = transport(&server).send(&request(&credential)).await.unwrap_err();

        assert!(matches!(err, TransportError::Malformed(_)));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_rate_limited_key_rotates_to_next_credential() {
        use crate::completion::{
            CompletionClient, CompletionOutcome, CredentialPool, ModelPriorityList, RetryPolicy,
        };
        use std::sync::Arc;
        use tokio_util::sync::CancellationToken;

        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer k1"))
            .respond_with(ResponseTemplate::new(429).set_body_json(json!({
                "error": {
                    "message": "Rate limit exceeded",
                    "type": "requests",
                    "param": null,
                    "code": "rate_limit_exceeded"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("authorization", "Bearer k2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(completion_body("File an FIR.")))
            .expect(1)
            .mount(&server)
            .await;

        let pool =
            CredentialPool::new(vec![Credential::new("k1"), Credential::new("k2")]).unwrap();
        let models = ModelPriorityList::new(vec!["qwen/qwen3-4b:free".to_string()]).unwrap();
        let policy = RetryPolicy {
            max_tries: 4,
            attempt_timeout: Duration::from_secs(2),
            deadline: Some(Duration::from_secs(6)),
        };
        let client = CompletionClient::new(
            Arc::new(transport(&server)),
            Arc::new(pool),
            models,
            policy,
        );

        let started = std::time::Instant::now();
        let outcome = client.complete("sys", "q", &CancellationToken::new()).await;

        assert_eq!(
            outcome,
            CompletionOutcome::Completed {
                text: "File an FIR.".to_string(),
                model: "qwen/qwen3-4b:free".to_string(),
            }
        );
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(TransportError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(TransportError::Network("reset".into()).is_retryable());
        assert!(TransportError::Unreadable("<html>".into()).is_retryable());
        assert!(!TransportError::Malformed("missing choices".into()).is_retryable());
        assert!(!TransportError::Rejected("rate limited".into()).is_retryable());
    }
}
