//! Prompt assembly, scene classification, tiered response generation,
//! and the unified context manager sitting on top of `memory-core`.
//!
//! - `config`: runtime tunables (prompt budgets, scene table, timeouts).
//! - `working_memory`: the rolling conversation buffer (C6).
//! - `prompt`: the prompt assembler (C7).
//! - `scene`: the scene classifier (C8).
//! - `tiers`: template / rule / LLM response producers and the fallback
//!   chain (C9).
//! - `cache`: the fallback chain's response cache.
//! - `llm`: the async LLM collaborator trait used by tier 3.
//! - `ucm`: the unified context manager (C10), the sole entry point.

pub mod cache;
pub mod config;
pub mod llm;
pub mod prompt;
pub mod scene;
pub mod tiers;
pub mod ucm;
pub mod working_memory;

pub use config::RuntimeConfig;
pub use scene::{InteractionRequest, InteractionSource};
pub use ucm::{InteractionResponse, UnifiedContextManager};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
