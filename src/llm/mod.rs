//! LLM provider abstraction.
//!
//! `LlmProvider` is an enum over concrete provider implementations.
//! Add a new variant + module in `providers/` for each additional backend.
//!
//! Provider instances are shared immutable capabilities — clone them freely.
//! Async is delegated to the underlying provider; the `complete` method is
//! `async fn` on the enum so callers need no trait-object machinery.

pub mod providers;

use thiserror::Error;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("unknown provider: {0}")]
    UnknownProvider(String),
    #[error("provider request failed: {0}")]
    Request(String),
    #[error("malformed stream: {0}")]
    Stream(String),
}

// ── Response ──────────────────────────────────────────────────────────────────

/// Token usage as reported by the endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LlmUsage {
    pub input_tokens: u64,
    pub output_tokens: u64,
}

/// One completed round-trip.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Generated answer text.
    pub text: String,
    /// Thinking text for models that stream `reasoning_content`; empty otherwise.
    pub reasoning: String,
    pub usage: Option<LlmUsage>,
}

// ── Provider enum ─────────────────────────────────────────────────────────────

/// All available provider backends.
///
/// Enum dispatch avoids `dyn` trait objects and the `async-trait` dependency.
/// Adding a backend = new module + new variant + new `complete` arm.
#[derive(Debug, Clone)]
pub enum LlmProvider {
    Dummy(providers::dummy::DummyProvider),
    Scripted(providers::scripted::ScriptedProvider),
    OpenAiCompatible(providers::openai_compatible::OpenAiCompatibleProvider),
    Nvidia(providers::nvidia::NvidiaProvider),
}

impl LlmProvider {
    /// Send `content` as the user turn (with an optional system prompt) and
    /// return the provider's reply.
    pub async fn complete(&self, content: &str, system: Option<&str>) -> Result<LlmResponse, ProviderError> {
        match self {
            LlmProvider::Dummy(p) => p.complete(content, system).await,
            LlmProvider::Scripted(p) => p.complete(content, system).await,
            LlmProvider::OpenAiCompatible(p) => p.complete(content, system).await,
            LlmProvider::Nvidia(p) => p.complete(content, system).await,
        }
    }

    /// A copy of this provider that authenticates with `api_key`.
    ///
    /// Keyless providers are returned unchanged.
    pub fn with_api_key(&self, api_key: String) -> Self {
        match self {
            LlmProvider::OpenAiCompatible(p) => LlmProvider::OpenAiCompatible(p.with_api_key(api_key)),
            LlmProvider::Nvidia(p) => LlmProvider::Nvidia(p.with_api_key(api_key)),
            other => other.clone(),
        }
    }

    /// Short name used in logs and the health endpoint.
    pub fn name(&self) -> &'static str {
        match self {
            LlmProvider::Dummy(_) => "dummy",
            LlmProvider::Scripted(_) => "scripted",
            LlmProvider::OpenAiCompatible(_) => "openai",
            LlmProvider::Nvidia(_) => "nvidia",
        }
    }
}
