//! The assembled prompt must never exceed the selected mode's token
//! ceiling, even when the working-memory buffer alone would blow past
//! it — truncation must drop the oldest turns first.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use companion_runtime::config::PromptMode;
use companion_runtime::llm::{LlmClient, LlmResponse, Result as LlmResult};
use companion_runtime::prompt::{PromptAssembler, PromptInputs};
use companion_runtime::working_memory::estimate_tokens;
use companion_runtime::RuntimeConfig;
use e2e_harness::mocks::fixtures::long_conversation;
use e2e_harness::TestEnvironment;

#[test]
fn oversized_working_memory_is_truncated_to_fit_the_selected_mode() {
    let config = RuntimeConfig::default();
    let assembler = PromptAssembler::new(&config);
    let turns = long_conversation(4000, "session-budget");

    let inputs = PromptInputs {
        identity: "You are a small desktop companion.",
        working_memory: &turns,
        environment: "",
        long_term_summary: "",
        ranked_memories: &[],
        no_relevant_memory: true,
    };

    let prompt = assembler.assemble(PromptMode::Lite, &inputs);
    assert!(estimate_tokens(&prompt) <= PromptMode::Lite.total_tokens());
    assert!(!prompt.contains("padding turn number 0 "), "the oldest turn should have been dropped first");
}

struct PromptCapturingLlm {
    captured: Arc<Mutex<Option<String>>>,
}

#[async_trait::async_trait]
impl LlmClient for PromptCapturingLlm {
    async fn call(&self, prompt: &str, _max_tokens: u32, _temperature: f32, _timeout: Duration) -> LlmResult<LlmResponse> {
        *self.captured.lock().unwrap() = Some(prompt.to_string());
        Ok(LlmResponse {
            text: "okay. [EMOTION:neutral:0.5]".into(),
            finish_reason: "stop".into(),
            prompt_tokens: 0,
            completion_tokens: 0,
        })
    }
}

#[tokio::test]
async fn a_long_running_chat_session_never_sends_an_over_budget_prompt_to_tier_three() {
    let captured = Arc::new(Mutex::new(None));
    let env = TestEnvironment::new_temp().with_llm(PromptCapturingLlm { captured: captured.clone() });

    let ucm = env.ucm("session-long-running");
    for i in 0..40 {
        let request = env.chat("session-long-running", &format!("here is message number {i} in a very long running conversation"));
        ucm.process_interaction(request).await.expect("interaction failed");
    }

    let prompt = captured.lock().unwrap().clone().expect("tier 3 should have been invoked");
    assert!(estimate_tokens(&prompt) <= PromptMode::Standard.total_tokens());
}
