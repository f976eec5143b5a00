//! NVIDIA hosted endpoint provider.
//!
//! Wraps the generic OpenAI-compatible provider and uses `[llm.nvidia]` config
//! (integrate.api.nvidia.com, Nemotron model, streamed reasoning with a
//! thinking budget) so it can be selected with `llm.default = "nvidia"`.

use crate::core::config::OpenAiConfig;
use crate::llm::{LlmResponse, ProviderError};

use super::openai_compatible::OpenAiCompatibleProvider;

#[derive(Debug, Clone)]
pub struct NvidiaProvider {
    inner: OpenAiCompatibleProvider,
}

impl NvidiaProvider {
    pub fn new(config: &OpenAiConfig, api_key: Option<String>) -> Result<Self, ProviderError> {
        let inner = OpenAiCompatibleProvider::new(config, api_key)?;
        Ok(Self { inner })
    }

    pub fn with_api_key(&self, api_key: String) -> Self {
        Self { inner: self.inner.with_api_key(api_key) }
    }

    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        self.inner.complete(content, system).await
    }
}
