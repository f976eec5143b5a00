//! Career day orchestration.
//!
//! A [`Simulator`] owns the four agents and the day's state. Each turn is a
//! fixed straight-line sequence of agent calls:
//!
//! - **start**: Research → Scenario Designer → Narrator
//! - **decide**: Evaluator → Scenario Designer → Narrator
//! - **summarize**: Evaluator → Narrator
//!
//! Stage outputs are collected locally and committed only after the last
//! call of the turn succeeds, so a provider error leaves the day exactly as
//! it was before the turn.

pub mod evaluation;
pub mod session;
pub mod state;

use serde_json::json;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::core::config::SimulationConfig;
use crate::llm::{LlmProvider, ProviderError};
use crate::subsystems::agents::{prompts, Agent, AgentRole, AgentTurn};

pub use session::{ChatMessage, ChatRole, Session, SessionView};
pub use state::{CareerKnowledge, SimulationState, Summary};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
    #[error("simulation has not started")]
    NotStarted,
    #[error("simulation already started")]
    AlreadyStarted,
    #[error("career day complete: {0} scenarios played")]
    DayComplete(u32),
    #[error("{0} must not be empty")]
    EmptyInput(&'static str),
}

// ── Progress ──────────────────────────────────────────────────────────────────

/// Progress notifications emitted while a turn runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Researching { career: String },
    DesigningOpening,
    DesigningNext,
    Narrating,
    Evaluating,
    Summarizing,
    /// Leading excerpt of an agent's thinking text.
    Reasoning { agent: AgentRole, excerpt: String },
}

impl Stage {
    /// Console banner for this stage.
    pub fn banner(&self) -> String {
        match self {
            Stage::Researching { career } => format!("[Research Agent] Analyzing career: {career}..."),
            Stage::DesigningOpening => "[Scenario Designer] Creating opening scenario...".into(),
            Stage::DesigningNext => "[Scenario Designer] Planning next step...".into(),
            Stage::Narrating => "[Narrator] Crafting narrative...".into(),
            Stage::Evaluating => "[Evaluator] Analyzing decision...".into(),
            Stage::Summarizing => "[All Agents] Generating summary...".into(),
            Stage::Reasoning { excerpt, .. } => format!("   Reasoning: {excerpt}..."),
        }
    }
}

const REASONING_EXCERPT_CHARS: usize = 100;

// ── Simulator ─────────────────────────────────────────────────────────────────

pub struct Simulator {
    research: Agent,
    scenario: Agent,
    evaluator: Agent,
    narrator: Agent,
    knowledge: Option<CareerKnowledge>,
    state: SimulationState,
    log: Vec<AgentTurn>,
    max_scenarios: u32,
    time_slots: Vec<String>,
    progress: Option<mpsc::UnboundedSender<Stage>>,
}

impl Simulator {
    /// Build a simulator whose agents all share `provider`.
    pub fn new(provider: LlmProvider, config: &SimulationConfig) -> Self {
        let dir = config.prompts_dir.as_path();
        let mut time_slots = config.time_slots.clone();
        if time_slots.is_empty() {
            time_slots.push("9:00 AM".to_string());
        }
        Self {
            research: Agent::new(AgentRole::Research, provider.clone(), dir),
            scenario: Agent::new(AgentRole::ScenarioDesigner, provider.clone(), dir),
            evaluator: Agent::new(AgentRole::Evaluator, provider.clone(), dir),
            narrator: Agent::new(AgentRole::Narrator, provider, dir),
            knowledge: None,
            state: SimulationState::new(time_slots[0].clone()),
            log: Vec::new(),
            max_scenarios: config.max_scenarios.max(1),
            time_slots,
            progress: None,
        }
    }

    /// Emit [`Stage`] notifications on `tx` while turns run.
    pub fn with_progress(mut self, tx: mpsc::UnboundedSender<Stage>) -> Self {
        self.progress = Some(tx);
        self
    }

    pub fn state(&self) -> &SimulationState {
        &self.state
    }

    pub fn career(&self) -> Option<&str> {
        self.knowledge.as_ref().map(|k| k.career.as_str())
    }

    /// Every agent round-trip of `start` and `decide`, oldest first.
    pub fn agent_log(&self) -> &[AgentTurn] {
        &self.log
    }

    pub fn max_scenarios(&self) -> u32 {
        self.max_scenarios
    }

    pub fn is_started(&self) -> bool {
        self.knowledge.is_some()
    }

    /// `true` once `max_scenarios` decisions have been played.
    pub fn is_complete(&self) -> bool {
        self.state.scenarios_completed >= self.max_scenarios
    }

    /// Clock label after `completed` decisions; sticks at the last slot.
    pub fn clock_for(&self, completed: u32) -> &str {
        let idx = (completed as usize).min(self.time_slots.len() - 1);
        &self.time_slots[idx]
    }

    /// Research the career, design the opening scenario and narrate it.
    pub async fn start(&mut self, career: &str) -> Result<String, SimError> {
        let career = career.trim();
        if career.is_empty() {
            return Err(SimError::EmptyInput("career"));
        }
        if self.is_started() {
            return Err(SimError::AlreadyStarted);
        }
        info!(career, "simulation starting");

        self.emit(Stage::Researching { career: career.to_string() });
        let task = prompts::render(prompts::TASK_RESEARCH, &[("career", career)]);
        let research = self.research.think_and_act(&task, Some(&json!({ "career": career }))).await?;
        self.emit_reasoning(&research, AgentRole::Research);

        let knowledge = CareerKnowledge::for_career(career);
        let start_time = self.clock_for(0).to_string();

        self.emit(Stage::DesigningOpening);
        let task = prompts::render(
            prompts::TASK_OPENING_SCENARIO,
            &[("career", career), ("time", start_time.as_str())],
        );
        let scenario = self.scenario.think_and_act(&task, Some(&json!(knowledge))).await?;

        self.emit(Stage::Narrating);
        let task = prompts::render(prompts::TASK_PRESENT_SCENARIO, &[("scenario", scenario.action.as_str())]);
        let narrative = self
            .narrator
            .think_and_act(&task, Some(&json!({ "career": career, "time": start_time })))
            .await?;

        let opening = narrative.action.clone();
        self.knowledge = Some(knowledge);
        self.state.time = start_time;
        self.state.current_scenario = Some(scenario.clone());
        self.log.extend([research, scenario, narrative]);
        debug!(log_len = self.log.len(), "simulation started");
        Ok(opening)
    }

    /// Evaluate the user's choice, move the clock, and narrate what happens next.
    pub async fn decide(&mut self, choice: &str) -> Result<String, SimError> {
        let choice = choice.trim();
        let career = match &self.knowledge {
            Some(k) => k.career.clone(),
            None => return Err(SimError::NotStarted),
        };
        if self.is_complete() {
            return Err(SimError::DayComplete(self.state.scenarios_completed));
        }
        if choice.is_empty() {
            return Err(SimError::EmptyInput("decision"));
        }

        self.emit(Stage::Evaluating);
        let task = prompts::render(prompts::TASK_EVALUATE_DECISION, &[("choice", choice)]);
        let eval = self
            .evaluator
            .think_and_act(
                &task,
                Some(&json!({ "scenario": self.state.current_scenario, "career": career })),
            )
            .await?;
        self.emit_reasoning(&eval, AgentRole::Evaluator);
        let evaluation::Evaluation { skills_used, professional_insight } =
            evaluation::parse(&eval.action).unwrap_or_default();

        let completed = self.state.scenarios_completed + 1;
        let time = self.clock_for(completed).to_string();

        self.emit(Stage::DesigningNext);
        let next = self
            .scenario
            .think_and_act(
                prompts::TASK_NEXT_SCENARIO,
                Some(&json!({
                    "previous_choice": choice,
                    "consequence": eval.action,
                    "time": time,
                    "career": career,
                })),
            )
            .await?;

        self.emit(Stage::Narrating);
        let narrative = self
            .narrator
            .think_and_act(
                prompts::TASK_NARRATE_CONSEQUENCE,
                Some(&json!({
                    "choice": choice,
                    "consequence": eval.action,
                    "next_scenario": next.action,
                })),
            )
            .await?;

        let reply = narrative.action.clone();
        self.state.skills_demonstrated.extend(skills_used);
        self.state.last_insight = professional_insight;
        self.state.scenarios_completed = completed;
        self.state.time = time;
        self.state.current_scenario = Some(next.clone());
        self.log.extend([eval, next, narrative]);
        info!(
            career = %career,
            completed,
            time = %self.state.time,
            "decision processed"
        );
        Ok(reply)
    }

    /// Ask the evaluator and narrator for an end-of-day report.
    ///
    /// The two summary calls are not added to the agent log.
    pub async fn summarize(&self) -> Result<Summary, SimError> {
        let career = self.career().ok_or(SimError::NotStarted)?.to_string();

        self.emit(Stage::Summarizing);
        let eval = self
            .evaluator
            .think_and_act(prompts::TASK_SUMMARIZE_SKILLS, Some(&json!(self.state)))
            .await?;
        let narrative = self
            .narrator
            .think_and_act(
                prompts::TASK_NARRATE_SUMMARY,
                Some(&json!({ "state": self.state, "evaluation": eval.action })),
            )
            .await?;

        Ok(Summary {
            career,
            scenarios_completed: self.state.scenarios_completed,
            skills: self.state.distinct_skills(),
            summary: narrative.action,
            agent_interactions: self.log.len(),
        })
    }

    fn emit(&self, stage: Stage) {
        if let Some(tx) = &self.progress {
            // Receiver gone just means nobody is watching.
            let _ = tx.send(stage);
        }
    }

    fn emit_reasoning(&self, turn: &AgentTurn, agent: AgentRole) {
        let excerpt: String = turn.reasoning.chars().take(REASONING_EXCERPT_CHARS).collect();
        self.emit(Stage::Reasoning { agent, excerpt });
    }
}

impl std::fmt::Debug for Simulator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulator")
            .field("career", &self.career())
            .field("state", &self.state)
            .field("log_len", &self.log.len())
            .finish()
    }
}
