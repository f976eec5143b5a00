//! LLM provider implementations.
//!
//! `build(config, api_key)` is the factory called at startup.
//! Adding a new backend = new module + new match arm.

pub mod dummy;
pub mod nvidia;
pub mod openai_compatible;
pub mod scripted;
pub mod sse;

use tracing::info;

use crate::core::config::LlmConfig;
use crate::llm::{LlmProvider, ProviderError};

/// Construct a `LlmProvider` from config and an optional API key.
///
/// `api_key` is sourced from `LLM_API_KEY` env (never TOML) and is `None`
/// for keyless local models. The scripted provider is built directly by
/// callers that own its replies, so it has no config name here.
pub fn build(config: &LlmConfig, api_key: Option<String>) -> Result<LlmProvider, ProviderError> {
    let provider = match config.provider.as_str() {
        "dummy" => LlmProvider::Dummy(dummy::DummyProvider),
        "openai" | "openai-compatible" => LlmProvider::OpenAiCompatible(
            openai_compatible::OpenAiCompatibleProvider::new(&config.openai, api_key)?,
        ),
        "nvidia" => LlmProvider::Nvidia(nvidia::NvidiaProvider::new(&config.nvidia, api_key)?),
        _ => return Err(ProviderError::UnknownProvider(config.provider.clone())),
    };

    let active = config.active();
    info!(
        provider = provider.name(),
        model = %active.model,
        stream = active.stream,
        "llm provider built"
    );
    Ok(provider)
}
