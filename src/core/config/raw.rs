//! Raw TOML deserialization types.
//!
//! These structs mirror the TOML file shape and use `serde` defaults.
//! The `load` module converts them into the public `types` structs.

use serde::Deserialize;

// ── Top-level ────────────────────────────────────────────────────────────────

/// Raw TOML shape — serde target before resolution.
#[derive(Deserialize)]
pub(super) struct RawConfig {
    pub app: RawApp,
    #[serde(default)]
    pub comms: RawComms,
    #[serde(default)]
    pub llm: RawLlm,
    #[serde(default)]
    pub simulation: RawSimulation,
}

#[derive(Deserialize)]
pub(super) struct RawApp {
    #[serde(default = "default_app_name")]
    pub name: String,
    pub work_dir: String,
    pub log_level: String,
    #[serde(default)]
    pub log_file: Option<String>,
}

// ── Comms ───────────────────────────────────────────────────────────────────

#[derive(Deserialize, Default)]
pub(super) struct RawComms {
    #[serde(default)]
    pub pty: RawPty,
    #[serde(default)]
    pub axum_channel: RawAxumChannel,
    #[serde(default)]
    pub sessions: RawSessions,
}

#[derive(Deserialize)]
pub(super) struct RawSessions {
    #[serde(default = "default_session_idle_seconds")]
    pub idle_timeout_seconds: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

#[derive(Deserialize)]
pub(super) struct RawPty {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

#[derive(Deserialize)]
pub(super) struct RawAxumChannel {
    #[serde(default = "default_false")]
    pub enabled: bool,
    #[serde(default = "default_http_bind")]
    pub bind: String,
    #[serde(default = "default_turn_timeout_seconds")]
    pub turn_timeout_seconds: u64,
}

// ── LLM ─────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawLlm {
    #[serde(rename = "default", default = "default_llm_provider")]
    pub provider: String,
    #[serde(default)]
    pub openai: RawOpenAiConfig,
    #[serde(default)]
    pub nvidia: RawOpenAiConfig,
}

impl Default for RawLlm {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            openai: RawOpenAiConfig::default(),
            nvidia: RawOpenAiConfig::default(),
        }
    }
}

/// Every field is optional so `[llm.openai]` and `[llm.nvidia]` can share
/// one shape while keeping different defaults; `load` fills the gaps.
#[derive(Deserialize, Default)]
pub(super) struct RawOpenAiConfig {
    pub api_base_url: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub max_tokens: Option<u32>,
    pub timeout_seconds: Option<u64>,
    pub stream: Option<bool>,
    pub min_thinking_tokens: Option<u32>,
    pub max_thinking_tokens: Option<u32>,
}

// ── Simulation ───────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(super) struct RawSimulation {
    #[serde(default = "default_max_scenarios")]
    pub max_scenarios: u32,
    #[serde(default = "default_time_slots")]
    pub time_slots: Vec<String>,
    #[serde(default = "default_prompts_dir")]
    pub prompts_dir: String,
    #[serde(default = "default_false")]
    pub save_agent_log: bool,
}

impl Default for RawSimulation {
    fn default() -> Self {
        Self {
            max_scenarios: default_max_scenarios(),
            time_slots: default_time_slots(),
            prompts_dir: default_prompts_dir(),
            save_agent_log: false,
        }
    }
}

// ── Defaults ─────────────────────────────────────────────────────────────────

impl Default for RawPty {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl Default for RawAxumChannel {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_http_bind(),
            turn_timeout_seconds: default_turn_timeout_seconds(),
        }
    }
}

impl Default for RawSessions {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: default_session_idle_seconds(),
            max_sessions: default_max_sessions(),
        }
    }
}

pub(crate) fn default_app_name() -> String { "career-sim".to_string() }
pub(crate) fn default_http_bind() -> String { "127.0.0.1:8080".to_string() }
pub(crate) fn default_turn_timeout_seconds() -> u64 { 300 }
pub(crate) fn default_session_idle_seconds() -> u64 { 3600 }
pub(crate) fn default_max_sessions() -> usize { 100 }
pub(crate) fn default_llm_provider() -> String { "dummy".to_string() }

pub(crate) const OPENAI_API_BASE_URL: &str = "https://api.openai.com/v1/chat/completions";
pub(crate) const OPENAI_MODEL: &str = "gpt-4o-mini";
pub(crate) const NVIDIA_API_BASE_URL: &str = "https://integrate.api.nvidia.com/v1/chat/completions";
pub(crate) const NVIDIA_MODEL: &str = "nvidia/nvidia-nemotron-nano-9b-v2";
pub(crate) const DEFAULT_TEMPERATURE: f32 = 0.7;
pub(crate) const DEFAULT_TOP_P: f32 = 0.95;
pub(crate) const DEFAULT_MAX_TOKENS: u32 = 1024;
pub(crate) const DEFAULT_TIMEOUT_SECONDS: u64 = 120;
pub(crate) const DEFAULT_MIN_THINKING_TOKENS: u32 = 256;
pub(crate) const DEFAULT_MAX_THINKING_TOKENS: u32 = 512;

pub(crate) fn default_max_scenarios() -> u32 { 5 }
pub(crate) fn default_prompts_dir() -> String { "config/prompts".to_string() }

pub(crate) fn default_time_slots() -> Vec<String> {
    ["9:00 AM", "10:30 AM", "12:00 PM", "2:00 PM", "4:00 PM", "5:30 PM"]
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_false() -> bool {
    false
}
