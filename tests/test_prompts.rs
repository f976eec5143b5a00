//! Shipped prompt files and config files.

use std::fs;
use std::path::Path;

use career_sim::core::config;
use career_sim::llm::providers::dummy::DummyProvider;
use career_sim::llm::LlmProvider;
use career_sim::subsystems::agents::{Agent, AgentRole};

const PROMPTS_DIR: &str = "config/prompts";

#[test]
fn every_role_has_a_prompt_file() {
    for role in AgentRole::ALL {
        let path = Path::new(PROMPTS_DIR).join(role.prompt_file());
        assert!(path.is_file(), "{} missing", path.display());
    }
}

#[test]
fn shipped_prompts_match_builtin_text() {
    let empty = tempfile::TempDir::new().unwrap();
    for role in AgentRole::ALL {
        let provider = LlmProvider::Dummy(DummyProvider);
        let from_file = Agent::new(role, provider.clone(), Path::new(PROMPTS_DIR));
        let builtin = Agent::new(role, provider, empty.path());
        assert_eq!(
            from_file.system_prompt(),
            builtin.system_prompt(),
            "{} drifted from the built-in prompt",
            role.prompt_file()
        );
    }
}

#[test]
fn evaluator_prompt_requests_skills() {
    let text = fs::read_to_string(Path::new(PROMPTS_DIR).join("evaluator.md")).unwrap();
    assert!(text.contains("\"skills_used\""));
    assert!(text.contains("\"consequence\""));
}

#[test]
fn default_config_loads() {
    let cfg = config::load_from(Path::new("config/default.toml"), Some("/tmp/career-sim-test"), None).unwrap();
    assert_eq!(cfg.app_name, "career-sim");
    assert_eq!(cfg.llm.provider, "nvidia");
    assert_eq!(cfg.llm.active().model, "nvidia/nvidia-nemotron-nano-9b-v2");
    assert!(cfg.llm.active().stream);
    assert_eq!(cfg.simulation.max_scenarios, 5);
    assert_eq!(cfg.simulation.time_slots.len(), 6);
    assert_eq!(cfg.simulation.prompts_dir, Path::new(PROMPTS_DIR));
}

#[test]
fn dev_config_inherits_default() {
    let cfg = config::load_from(Path::new("config/dev.toml"), None, None).unwrap();
    assert_eq!(cfg.llm.provider, "dummy");
    assert!(cfg.comms_axum_should_load());
    assert_eq!(cfg.comms.axum_channel.bind, "127.0.0.1:8080");
    assert_eq!(cfg.simulation.max_scenarios, 3);
    assert_eq!(cfg.simulation.time_slots[0], "9:00 AM");
    assert!(cfg.simulation.save_agent_log);
}
