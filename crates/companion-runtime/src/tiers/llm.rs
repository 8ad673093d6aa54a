//! Tier 3: prompt assembly, the LLM call under a deadline, and
//! emotion-marker parsing.

use crate::config::{PromptMode, RuntimeConfig};
use crate::llm::{parse_trailing_emotion, LlmClient, Result};
use crate::prompt::{PromptAssembler, PromptInputs};

use super::GeneratedResponse;

pub async fn generate(
    client: &dyn LlmClient,
    inputs: &PromptInputs<'_>,
    config: &RuntimeConfig,
    mode: PromptMode,
) -> Result<GeneratedResponse> {
    let assembler = PromptAssembler::new(config);
    let prompt = assembler.assemble(mode, inputs);

    let response = client
        .call(&prompt, config.prompt_budget(mode).reserved_output as u32, 0.7, config.tier3_timeout)
        .await?;

    let (text, emotion) = parse_trailing_emotion(&response.text);

    Ok(GeneratedResponse {
        text,
        emotion_tag: emotion.tag,
        emotion_intensity: emotion.intensity,
        animation_hint: None,
        tier_used: 3,
    })
}
