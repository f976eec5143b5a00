//! Plain data carried by a running career day.

use serde::{Deserialize, Serialize};

use crate::subsystems::agents::AgentTurn;

/// Where the day currently stands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    /// Clock label, e.g. `"10:30 AM"`.
    pub time: String,
    pub scenarios_completed: u32,
    /// Skills in the order the evaluator reported them; duplicates kept.
    pub skills_demonstrated: Vec<String>,
    /// Scenario Designer output the user is currently responding to.
    pub current_scenario: Option<AgentTurn>,
    /// Evaluator's `professional_insight` for the latest decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_insight: Option<String>,
}

impl SimulationState {
    pub fn new(start_time: impl Into<String>) -> Self {
        Self {
            time: start_time.into(),
            scenarios_completed: 0,
            skills_demonstrated: Vec::new(),
            current_scenario: None,
            last_insight: None,
        }
    }

    /// Distinct skills in first-seen order.
    pub fn distinct_skills(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for s in &self.skills_demonstrated {
            if !out.iter().any(|seen| seen == s) {
                out.push(s.clone());
            }
        }
        out
    }
}

/// What the simulator knows about the chosen career.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CareerKnowledge {
    pub career: String,
    pub researched: bool,
    pub typical_challenges: String,
    pub tools: String,
}

impl CareerKnowledge {
    pub fn for_career(career: &str) -> Self {
        Self {
            career: career.to_string(),
            researched: true,
            typical_challenges: format!("Common challenges for {career}"),
            tools: format!("Tools used in {career}"),
        }
    }
}

/// End-of-day report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub career: String,
    pub scenarios_completed: u32,
    /// Distinct skills, first-seen order.
    pub skills: Vec<String>,
    /// Narrator's closing story.
    pub summary: String,
    /// Agent log length when the summary was requested.
    pub agent_interactions: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_skills_keeps_first_seen_order() {
        let mut st = SimulationState::new("9:00 AM");
        st.skills_demonstrated = ["triage", "communication", "triage", "planning", "communication"]
            .map(String::from)
            .to_vec();
        assert_eq!(st.distinct_skills(), vec!["triage", "communication", "planning"]);
    }

    #[test]
    fn knowledge_mentions_career() {
        let k = CareerKnowledge::for_career("Chef");
        assert!(k.researched);
        assert_eq!(k.typical_challenges, "Common challenges for Chef");
        assert_eq!(k.tools, "Tools used in Chef");
    }

    #[test]
    fn state_serializes_with_null_scenario() {
        let st = SimulationState::new("9:00 AM");
        let v = serde_json::to_value(&st).unwrap();
        assert_eq!(v["time"], "9:00 AM");
        assert_eq!(v["scenarios_completed"], 0);
        assert!(v["current_scenario"].is_null());
    }
}
