//! LLM collaborator trait consumed by Tier 3, plus the parsing rules for
//! the emotion-tag wire format and the rule-based fallback tagger.

mod emotion_parse;

pub use emotion_parse::{fallback_tag, parse_trailing_emotion};

use async_trait::async_trait;
use std::time::Duration;

#[non_exhaustive]
#[derive(Debug, Clone, thiserror::Error)]
pub enum LlmError {
    #[error("request timed out")]
    Timeout,
    #[error("rate limited")]
    RateLimit,
    #[error("server error: {0}")]
    ServerError(String),
    #[error("authentication failed")]
    Auth,
    #[error("invalid parameters: {0}")]
    InvalidParams(String),
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl LlmError {
    /// Whether UCM's fallback chain should retry this category, per
    /// the propagation policy (timeout, rate limit, server error retry;
    /// auth and invalid-params do not).
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Timeout | LlmError::RateLimit | LlmError::ServerError(_))
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[derive(Debug, Clone)]
pub struct LlmResponse {
    pub text: String,
    pub finish_reason: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn call(&self, prompt: &str, max_tokens: u32, temperature: f32, timeout: Duration) -> Result<LlmResponse>;
}

/// Adapts a `companion_runtime::llm::LlmClient` to
/// `memory_core::llm::LlmClient`'s synchronous trait so the same
/// collaborator drives both Tier 3 and `LifecycleManager` reflections.
pub struct BlockingAdapter<'a, T: LlmClient> {
    inner: &'a T,
    handle: tokio::runtime::Handle,
}

impl<'a, T: LlmClient> BlockingAdapter<'a, T> {
    pub fn new(inner: &'a T, handle: tokio::runtime::Handle) -> Self {
        Self { inner, handle }
    }
}

impl<T: LlmClient> memory_core::llm::LlmClient for BlockingAdapter<'_, T> {
    fn generate(&self, prompt: &str) -> memory_core::llm::Result<String> {
        let response = self
            .handle
            .block_on(self.inner.call(prompt, 512, 0.7, Duration::from_secs(30)))
            .map_err(|e| memory_core::llm::LlmError::RequestFailed(e.to_string()))?;
        Ok(response.text)
    }
}

/// Deterministic mock for tests: always returns the same text, unless
/// `delay` is set, in which case it sleeps past any caller-supplied
/// timeout to exercise the fallback chain.
pub struct MockLlmClient {
    pub text: String,
    pub delay: Option<Duration>,
}

impl MockLlmClient {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), delay: None }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn call(&self, _prompt: &str, _max_tokens: u32, _temperature: f32, timeout: Duration) -> Result<LlmResponse> {
        let respond = async {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            LlmResponse {
                text: self.text.clone(),
                finish_reason: "stop".into(),
                prompt_tokens: 0,
                completion_tokens: 0,
            }
        };

        tokio::time::timeout(timeout, respond).await.map_err(|_| LlmError::Timeout)
    }
}
