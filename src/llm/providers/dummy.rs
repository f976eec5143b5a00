//! Dummy LLM provider — echoes input back prefixed with `[echo]`.
//! Used for running the full simulation flow without a real API key.

use crate::llm::{LlmResponse, ProviderError};

#[derive(Debug, Clone)]
pub struct DummyProvider;

impl DummyProvider {
    pub async fn complete(&self, content: &str, _system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        Ok(LlmResponse {
            text: format!("[echo] {content}"),
            reasoning: String::new(),
            usage: None,
        })
    }
}
