//! Public configuration types.
//!
//! These are the resolved, ready-to-use structs that subsystems consume.
//! Raw TOML deserialization types live in `raw.rs`.

use std::path::PathBuf;

// ── Comms ───────────────────────────────────────────────────────────────────

/// PTY (console) channel configuration.
#[derive(Debug, Clone)]
pub struct PtyConfig {
    /// Whether the PTY channel is explicitly enabled.
    pub enabled: bool,
}

/// Axum HTTP channel configuration.
#[derive(Debug, Clone)]
pub struct AxumChannelConfig {
    /// Whether the axum channel is explicitly enabled.
    pub enabled: bool,
    /// Socket address to bind the axum listener to.
    pub bind: String,
    /// Upper bound for one simulation turn (four sequential LLM calls).
    pub turn_timeout_seconds: u64,
}

/// Limits on the in-memory session registry (`[comms.sessions]`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimitsConfig {
    /// Sessions untouched for this long are dropped.
    pub idle_timeout_seconds: u64,
    /// Registry size cap; the least recently used session makes room.
    pub max_sessions: usize,
}

/// Comms subsystem configuration.
#[derive(Debug, Clone)]
pub struct CommsConfig {
    pub pty: PtyConfig,
    pub axum_channel: AxumChannelConfig,
    pub sessions: SessionLimitsConfig,
}

// ── LLM ──────────────────────────────────────────────────────────────────────

/// Sampling and transport settings shared by the OpenAI-compatible presets.
/// Populated from `[llm.openai]` or `[llm.nvidia]` in the TOML.
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    /// Full chat completions endpoint URL.
    pub api_base_url: String,
    /// Model name passed in the request body.
    pub model: String,
    /// Sampling temperature (ignored for models that forbid it).
    pub temperature: f32,
    pub top_p: f32,
    pub max_tokens: u32,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Request a Server-Sent Events stream instead of a single JSON body.
    pub stream: bool,
    /// Reasoning budget forwarded to models that support it.
    pub thinking: Option<ThinkingBudget>,
}

/// `min_thinking_tokens` / `max_thinking_tokens` request extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThinkingBudget {
    pub min_tokens: u32,
    pub max_tokens: u32,
}

/// LLM subsystem configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Which provider is active (`"dummy"`, `"openai"`, `"nvidia"`).
    /// Maps to `default` in `[llm]` TOML.
    pub provider: String,
    /// Config for the generic OpenAI-compatible provider (`[llm.openai]`).
    pub openai: OpenAiConfig,
    /// Config for the NVIDIA hosted endpoint preset (`[llm.nvidia]`).
    pub nvidia: OpenAiConfig,
}

impl LlmConfig {
    /// Settings of the provider selected by `provider`.
    pub fn active(&self) -> &OpenAiConfig {
        match self.provider.as_str() {
            "nvidia" => &self.nvidia,
            _ => &self.openai,
        }
    }
}

// ── Simulation ───────────────────────────────────────────────────────────────

/// Career day settings (`[simulation]`).
#[derive(Debug, Clone)]
pub struct SimulationConfig {
    /// Decisions the user makes before the day ends.
    pub max_scenarios: u32,
    /// Clock labels the day walks through; the first one is the start time.
    pub time_slots: Vec<String>,
    /// Directory holding per-role system prompt overrides.
    pub prompts_dir: PathBuf,
    /// Write each session's agent log to `<work_dir>/agent_logs/`.
    pub save_agent_log: bool,
}

// ── Top-level ────────────────────────────────────────────────────────────────

/// Fully-resolved application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub app_name: String,
    /// Working directory for all persistent data (already expanded, no `~`).
    pub work_dir: PathBuf,
    pub log_level: String,
    /// Optional log file; stderr when unset.
    pub log_file: Option<PathBuf>,
    pub comms: CommsConfig,
    pub llm: LlmConfig,
    /// API key from `LLM_API_KEY` env var — `None` for keyless local models.
    /// Never sourced from TOML.
    pub llm_api_key: Option<String>,
    pub simulation: SimulationConfig,
}

impl Config {
    /// Returns `true` if the PTY channel should be loaded.
    pub fn comms_pty_should_load(&self) -> bool {
        self.comms.pty.enabled
    }

    /// Returns `true` if the axum channel should be loaded.
    pub fn comms_axum_should_load(&self) -> bool {
        self.comms.axum_channel.enabled
    }

    /// Directory agent logs are exported to.
    pub fn agent_log_dir(&self) -> PathBuf {
        self.work_dir.join("agent_logs")
    }
}
