//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` relative to the current working directory,
//! then applies `CAREER_SIM_WORK_DIR` and `CAREER_SIM_LOG_LEVEL` env overrides.
//!
//! # Module layout
//!
//! - **types** — Public configuration structs consumed by subsystems
//!   (`Config`, `LlmConfig`, `SimulationConfig`, etc.).
//! - **raw** — Raw TOML deserialization types (`RawConfig`, `RawLlm`, …).
//!   These mirror the file shape and use serde defaults; kept private.
//! - **load** — Loading logic: `merge_toml`, `load_raw_merged`, `load`,
//!   `load_from`, `expand_home`.

mod load;
mod raw;
mod types;

pub use load::{expand_home, load, load_from};
pub use types::*;

impl Default for SessionLimitsConfig {
    fn default() -> Self {
        Self {
            idle_timeout_seconds: raw::default_session_idle_seconds(),
            max_sessions: raw::default_max_sessions(),
        }
    }
}

impl Config {
    /// Safe `Config` for tests — dummy LLM, no API keys, no external calls.
    pub fn test_default(work_dir: &std::path::Path) -> Self {
        let openai = OpenAiConfig {
            api_base_url: "http://localhost:0/v1/chat/completions".into(),
            model: "test-model".into(),
            temperature: 0.0,
            top_p: 1.0,
            max_tokens: 64,
            timeout_seconds: 1,
            stream: false,
            thinking: None,
        };
        Self {
            app_name: "test".into(),
            work_dir: work_dir.to_path_buf(),
            log_level: "info".into(),
            log_file: None,
            comms: CommsConfig {
                pty: PtyConfig { enabled: false },
                axum_channel: AxumChannelConfig {
                    enabled: false,
                    bind: raw::default_http_bind(),
                    turn_timeout_seconds: 5,
                },
                sessions: SessionLimitsConfig::default(),
            },
            llm: LlmConfig {
                provider: "dummy".into(),
                nvidia: openai.clone(),
                openai,
            },
            llm_api_key: None,
            simulation: SimulationConfig {
                max_scenarios: raw::default_max_scenarios(),
                time_slots: raw::default_time_slots(),
                prompts_dir: work_dir.join("prompts"),
                save_agent_log: false,
            },
        }
    }
}
