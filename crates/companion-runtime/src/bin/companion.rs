//! Demo entry point: sends a single chat message through the unified
//! context manager and prints the response.

use clap::Parser;
use companion_runtime::llm::{LlmClient, LlmError, LlmResponse};
use companion_runtime::{InteractionRequest, InteractionSource, RuntimeConfig, UnifiedContextManager};
use memory_core::embeddings::MockEmbeddingClient;
use memory_core::llm::MockLlmClient as CoreMockLlmClient;
use memory_core::queue::VectorizeQueue;
use memory_core::search::VectorIndex;
use memory_core::storage::Store;

#[derive(Parser)]
#[command(name = "companion")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Demo driver for the companion runtime")]
struct Cli {
    /// Message to send as a single chat turn.
    message: String,

    /// Path to the SQLite database; defaults to the platform data dir.
    #[arg(long)]
    db_path: Option<std::path::PathBuf>,
}

struct DemoLlmClient {
    inner: CoreMockLlmClient,
}

#[async_trait::async_trait]
impl LlmClient for DemoLlmClient {
    async fn call(
        &self,
        prompt: &str,
        _max_tokens: u32,
        _temperature: f32,
        _timeout: std::time::Duration,
    ) -> companion_runtime::llm::Result<LlmResponse> {
        use memory_core::llm::LlmClient as _;
        let text = self
            .inner
            .generate(prompt)
            .map_err(|e| LlmError::ServerError(e.to_string()))?;
        Ok(LlmResponse {
            text: format!("{text} [EMOTION:happy:0.6]"),
            finish_reason: "stop".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let store = Store::open(cli.db_path)?;
    let index = VectorIndex::new()?;
    let embedder = MockEmbeddingClient::new(384);
    let queue = VectorizeQueue::new();
    let llm = DemoLlmClient {
        inner: CoreMockLlmClient::new("That's good to know."),
    };
    let config = RuntimeConfig::default();

    let ucm = UnifiedContextManager::new(&store, &index, &embedder, &queue, &llm, &config, "cli-session");

    let request = InteractionRequest {
        source: InteractionSource::ChatInput,
        event_type: "message".into(),
        payload: serde_json::json!({ "text": cli.message }),
    };

    let response = ucm.process_interaction(request).await?;
    println!("{}", response.response_text);
    tracing::info!(emotion = ?response.emotion, "interaction complete");

    Ok(())
}
