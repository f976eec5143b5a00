//! A simulator plus the conversation the user sees.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{SimError, SimulationState, Simulator, Summary};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry of the visible conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: ChatRole::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: ChatRole::Assistant, content: content.into() }
    }
}

/// Serializable snapshot of a session for channels.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub id: Uuid,
    pub career: Option<String>,
    pub messages: Vec<ChatMessage>,
    pub state: SimulationState,
    pub max_scenarios: u32,
    pub complete: bool,
    pub summary: Option<Summary>,
}

#[derive(Debug)]
pub struct Session {
    id: Uuid,
    simulator: Simulator,
    messages: Vec<ChatMessage>,
    summary: Option<Summary>,
}

impl Session {
    pub fn new(simulator: Simulator) -> Self {
        Self {
            id: Uuid::new_v4(),
            simulator,
            messages: Vec::new(),
            summary: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn simulator(&self) -> &Simulator {
        &self.simulator
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Start the day; the opening narrative becomes the first assistant message.
    pub async fn open(&mut self, career: &str) -> Result<String, SimError> {
        let opening = self.simulator.start(career).await?;
        self.messages.push(ChatMessage::assistant(opening.clone()));
        Ok(opening)
    }

    /// Play one decision; the choice and the reply are recorded only on success.
    pub async fn decide(&mut self, choice: &str) -> Result<String, SimError> {
        let reply = self.simulator.decide(choice).await?;
        self.messages.push(ChatMessage::user(choice.trim()));
        self.messages.push(ChatMessage::assistant(reply.clone()));
        self.summary = None;
        Ok(reply)
    }

    /// End-of-day summary, generated once and cached until the next decision.
    pub async fn summarize(&mut self) -> Result<Summary, SimError> {
        if let Some(s) = &self.summary {
            return Ok(s.clone());
        }
        let summary = self.simulator.summarize().await?;
        self.summary = Some(summary.clone());
        Ok(summary)
    }

    pub fn view(&self) -> SessionView {
        SessionView {
            id: self.id,
            career: self.simulator.career().map(str::to_string),
            messages: self.messages.clone(),
            state: self.simulator.state().clone(),
            max_scenarios: self.simulator.max_scenarios(),
            complete: self.simulator.is_complete(),
            summary: self.summary.clone(),
        }
    }

    /// Write the agent log as pretty JSON to `<dir>/<session id>.json`.
    pub async fn export_log(&self, dir: &Path) -> std::io::Result<PathBuf> {
        tokio::fs::create_dir_all(dir).await?;
        let path = dir.join(format!("{}.json", self.id));
        let body = serde_json::to_vec_pretty(self.simulator.agent_log())
            .map_err(std::io::Error::other)?;
        tokio::fs::write(&path, body).await?;
        info!(session = %self.id, path = %path.display(), "agent log exported");
        Ok(path)
    }
}
