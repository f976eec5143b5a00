//! Configuration loading with env-var overrides.
//!
//! Reads TOML files, supports `[meta] base = "..."` inheritance chains,
//! and applies `CAREER_SIM_WORK_DIR` and `CAREER_SIM_LOG_LEVEL` env overrides.

use std::collections::HashSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::core::error::AppError;

use super::raw::{self, RawConfig, RawOpenAiConfig};
use super::types::*;

/// Used when no config file is given and `config/default.toml` is absent.
const BUILTIN_TOML: &str = r#"
[app]
work_dir = "~/.career-sim"
log_level = "info"
"#;

/// Deep-merge two TOML values.
/// Tables are merged recursively — the overlay only needs to specify keys that
/// differ from the base. For every other type (string, integer, array, …)
/// the overlay value replaces the base value wholesale.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_tbl), toml::Value::Table(overlay_tbl)) => {
            for (key, ov_val) in overlay_tbl {
                let merged = match base_tbl.remove(&key) {
                    Some(base_val) => merge_toml(base_val, ov_val),
                    None => ov_val,
                };
                base_tbl.insert(key, merged);
            }
            toml::Value::Table(base_tbl)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file, follow any `[meta] base = "..."` chain, and return the
/// fully merged `toml::Value`. `visited` carries canonicalized paths already
/// seen in this chain so circular references are caught early.
fn load_raw_merged(
    path: &Path,
    visited: &mut HashSet<PathBuf>,
) -> Result<toml::Value, AppError> {
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
    if !visited.insert(canonical) {
        return Err(AppError::Config(format!(
            "circular base reference detected at: {}",
            path.display()
        )));
    }

    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let overlay_val: toml::Value = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    if let Some(base_str) = overlay_val
        .get("meta")
        .and_then(|m| m.get("base"))
        .and_then(|b| b.as_str())
    {
        let base_path = if Path::new(base_str).is_absolute() {
            PathBuf::from(base_str)
        } else {
            path.parent().unwrap_or(Path::new(".")).join(base_str)
        };
        let base_val = load_raw_merged(&base_path, visited)?;
        Ok(merge_toml(base_val, overlay_val))
    } else {
        Ok(overlay_val)
    }
}

/// Load config from the given path, or `config/default.toml`, then apply env-var overrides.
/// If no path is given and `config/default.toml` does not exist, the built-in
/// minimal config is used.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let work_dir_override = env::var("CAREER_SIM_WORK_DIR").ok();
    let log_level_override = env::var("CAREER_SIM_LOG_LEVEL").ok();

    if let Some(path) = config_path {
        return load_from(
            Path::new(path),
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        );
    }

    let default_path = Path::new("config/default.toml");
    if default_path.exists() {
        load_from(
            default_path,
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        )
    } else {
        let parsed: RawConfig = toml::from_str(BUILTIN_TOML)
            .map_err(|e| AppError::Config(format!("built-in config: {e}")))?;
        Ok(resolve(
            parsed,
            work_dir_override.as_deref(),
            log_level_override.as_deref(),
        ))
    }
}

/// Internal loader — accepts an explicit path and optional overrides.
/// Tests pass overrides directly instead of mutating env vars.
/// Follows `[meta] base = "..."` inheritance chains before resolving.
pub fn load_from(
    path: &Path,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Result<Config, AppError> {
    let merged_val = load_raw_merged(path, &mut HashSet::new())?;

    let parsed: RawConfig = Deserialize::deserialize(merged_val)
        .map_err(|e: toml::de::Error| {
            AppError::Config(format!("config error in {}: {e}", path.display()))
        })?;

    let cfg = resolve(parsed, work_dir_override, log_level_override);

    if cfg.simulation.time_slots.is_empty() {
        return Err(AppError::Config(format!(
            "simulation.time_slots must not be empty in {}",
            path.display()
        )));
    }
    Ok(cfg)
}

/// Turn raw TOML into the resolved [`Config`].
fn resolve(
    parsed: RawConfig,
    work_dir_override: Option<&str>,
    log_level_override: Option<&str>,
) -> Config {
    let app = parsed.app;

    let work_dir_str = work_dir_override.unwrap_or(&app.work_dir).to_string();
    let work_dir = expand_home(&work_dir_str);
    let log_level = log_level_override.unwrap_or(&app.log_level).to_string();
    let log_file = app.log_file.map(|p| {
        let p = expand_home(&p);
        if p.is_absolute() { p } else { work_dir.join(p) }
    });

    Config {
        app_name: app.name,
        work_dir,
        log_level,
        log_file,
        comms: CommsConfig {
            pty: PtyConfig {
                enabled: parsed.comms.pty.enabled,
            },
            axum_channel: AxumChannelConfig {
                enabled: parsed.comms.axum_channel.enabled,
                bind: parsed.comms.axum_channel.bind,
                turn_timeout_seconds: parsed.comms.axum_channel.turn_timeout_seconds.max(1),
            },
            sessions: SessionLimitsConfig {
                idle_timeout_seconds: parsed.comms.sessions.idle_timeout_seconds.max(1),
                max_sessions: parsed.comms.sessions.max_sessions.max(1),
            },
        },
        llm: LlmConfig {
            provider: parsed.llm.provider,
            openai: resolve_openai(
                parsed.llm.openai,
                raw::OPENAI_API_BASE_URL,
                raw::OPENAI_MODEL,
                false,
                None,
            ),
            nvidia: resolve_openai(
                parsed.llm.nvidia,
                raw::NVIDIA_API_BASE_URL,
                raw::NVIDIA_MODEL,
                true,
                Some(ThinkingBudget {
                    min_tokens: raw::DEFAULT_MIN_THINKING_TOKENS,
                    max_tokens: raw::DEFAULT_MAX_THINKING_TOKENS,
                }),
            ),
        },
        llm_api_key: env::var("LLM_API_KEY").ok().filter(|k| !k.trim().is_empty()),
        simulation: SimulationConfig {
            max_scenarios: parsed.simulation.max_scenarios.max(1),
            time_slots: parsed.simulation.time_slots,
            prompts_dir: PathBuf::from(parsed.simulation.prompts_dir),
            save_agent_log: parsed.simulation.save_agent_log,
        },
    }
}

/// Fill unset `[llm.*]` keys with the preset's defaults.
///
/// The thinking budget is sent only when both bounds are known, either from
/// the file or from the preset.
fn resolve_openai(
    raw: RawOpenAiConfig,
    base_url: &str,
    model: &str,
    stream: bool,
    thinking: Option<ThinkingBudget>,
) -> OpenAiConfig {
    let thinking = match (raw.min_thinking_tokens, raw.max_thinking_tokens, thinking) {
        (Some(min), Some(max), _) => Some(ThinkingBudget { min_tokens: min, max_tokens: max }),
        (min, max, Some(preset)) => Some(ThinkingBudget {
            min_tokens: min.unwrap_or(preset.min_tokens),
            max_tokens: max.unwrap_or(preset.max_tokens),
        }),
        _ => None,
    };

    OpenAiConfig {
        api_base_url: raw.api_base_url.unwrap_or_else(|| base_url.to_string()),
        model: raw.model.unwrap_or_else(|| model.to_string()),
        temperature: raw.temperature.unwrap_or(raw::DEFAULT_TEMPERATURE),
        top_p: raw.top_p.unwrap_or(raw::DEFAULT_TOP_P),
        max_tokens: raw.max_tokens.unwrap_or(raw::DEFAULT_MAX_TOKENS),
        timeout_seconds: raw.timeout_seconds.unwrap_or(raw::DEFAULT_TIMEOUT_SECONDS),
        stream: raw.stream.unwrap_or(stream),
        thinking,
    }
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}
