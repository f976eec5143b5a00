//! Agents: named prompt templates sent to the inference endpoint.
//!
//! An agent is not an autonomous process: it is a role, a system prompt, and
//! a shared [`LlmProvider`]. [`Agent::think_and_act`] performs exactly one
//! round-trip and records it as an [`AgentTurn`] for the agent log.

pub mod core;
pub mod prompts;

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info_span, Instrument};

use crate::llm::{LlmProvider, ProviderError};
use self::core::prompt::PromptBuilder;

// ── Roles ─────────────────────────────────────────────────────────────────────

/// The four fixed roles of the simulation pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Research,
    ScenarioDesigner,
    Evaluator,
    Narrator,
}

impl AgentRole {
    pub const ALL: [AgentRole; 4] = [
        AgentRole::Research,
        AgentRole::ScenarioDesigner,
        AgentRole::Evaluator,
        AgentRole::Narrator,
    ];

    /// Human-readable name used in the agent log.
    pub fn label(self) -> &'static str {
        match self {
            AgentRole::Research => "Research",
            AgentRole::ScenarioDesigner => "Scenario Designer",
            AgentRole::Evaluator => "Evaluator",
            AgentRole::Narrator => "Narrator",
        }
    }

    /// File in the prompts directory that overrides the built-in system prompt.
    pub fn prompt_file(self) -> &'static str {
        match self {
            AgentRole::Research => "research.md",
            AgentRole::ScenarioDesigner => "scenario.md",
            AgentRole::Evaluator => "evaluator.md",
            AgentRole::Narrator => "narrator.md",
        }
    }

    fn builtin_system(self) -> &'static str {
        match self {
            AgentRole::Research => prompts::RESEARCH_SYSTEM,
            AgentRole::ScenarioDesigner => prompts::SCENARIO_SYSTEM,
            AgentRole::Evaluator => prompts::EVALUATOR_SYSTEM,
            AgentRole::Narrator => prompts::NARRATOR_SYSTEM,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ── Agent log entry ───────────────────────────────────────────────────────────

/// One agent round-trip as kept in the agent log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTurn {
    /// Role label, e.g. `"Scenario Designer"`.
    pub agent: String,
    /// Model thinking text; empty for models that do not stream it.
    pub reasoning: String,
    /// The generated content.
    pub action: String,
    /// RFC 3339 time the reply was received.
    pub timestamp: String,
}

// ── Agent ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct Agent {
    role: AgentRole,
    system_prompt: String,
    provider: LlmProvider,
}

impl Agent {
    /// Build an agent, loading `<prompts_dir>/<role>.md` as its system prompt
    /// when present.
    pub fn new(role: AgentRole, provider: LlmProvider, prompts_dir: &Path) -> Self {
        let system_prompt = PromptBuilder::new(prompts_dir)
            .layer_or(role.prompt_file(), role.builtin_system())
            .build();
        Self { role, system_prompt, provider }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Reason → act: one completion with this agent's system prompt.
    pub async fn think_and_act(
        &self,
        task: &str,
        context: Option<&Value>,
    ) -> Result<AgentTurn, ProviderError> {
        let user = format_prompt(task, context);
        debug!(agent = %self.role, prompt_len = user.len(), "agent request");

        let resp = self
            .provider
            .complete(&user, Some(&self.system_prompt))
            .instrument(info_span!("agent", role = %self.role))
            .await?;
        if let Some(usage) = resp.usage {
            debug!(
                agent = %self.role,
                input_tokens = usage.input_tokens,
                output_tokens = usage.output_tokens,
                "agent token usage"
            );
        }

        Ok(AgentTurn {
            agent: self.role.label().to_string(),
            reasoning: resp.reasoning,
            action: resp.text,
            timestamp: chrono::Local::now().to_rfc3339(),
        })
    }
}

/// User message for one agent call: the JSON context (if any) followed by
/// the task.
pub fn format_prompt(task: &str, context: Option<&Value>) -> String {
    match context {
        Some(ctx) if !ctx.is_null() => format!("Context: {ctx}\n\nTask: {task}"),
        _ => task.to_string(),
    }
}
