//! LLM collaborator seam shared by [`crate::lifecycle::LifecycleManager`]
//! reflection generation and companion-runtime's tier-3 handler.

#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

pub type Result<T> = std::result::Result<T, LlmError>;

/// A single text-completion call. Kept synchronous and blocking-call
/// shaped so it composes with `Store`'s own synchronous API; callers on
/// an async runtime wrap it in `spawn_blocking`.
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String>;
}

/// Deterministic stand-in for tests.
pub struct MockLlmClient {
    pub response: String,
}

impl MockLlmClient {
    pub fn new(response: impl Into<String>) -> Self {
        Self { response: response.into() }
    }
}

impl LlmClient for MockLlmClient {
    fn generate(&self, _prompt: &str) -> Result<String> {
        Ok(self.response.clone())
    }
}
