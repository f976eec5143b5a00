//! Shared state for the comms channels.
//!
//! Channels receive an `Arc<CommsState>` and drive simulations only through
//! the typed session methods below. The provider and the session registry
//! are private.
//!
//! Each session sits behind its own `tokio::sync::Mutex`: turns on one
//! session run strictly one after another, different sessions never wait on
//! each other.
//!
//! Browsers never say goodbye, so the registry is bounded: sessions idle for
//! longer than the configured timeout are dropped, and opening a session when
//! the registry is full drops the least recently used one.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::time::Instant;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::config::{Config, SessionLimitsConfig, SimulationConfig};
use crate::llm::LlmProvider;
use crate::subsystems::agents::AgentTurn;
use crate::subsystems::simulation::{Session, SessionView, SimError, Simulator, Stage, Summary};

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("unknown session: {0}")]
    UnknownSession(Uuid),
    #[error(transparent)]
    Sim(#[from] SimError),
}

// ── Events ────────────────────────────────────────────────────────────────────

/// Events sent back to the comms manager task.
#[derive(Debug)]
pub enum CommsEvent {
    /// Channel has stopped (clean exit or EOF).
    ChannelShutdown { channel_id: String },
    /// A career day was opened on the channel.
    SessionStarted { channel_id: String, session_id: Uuid },
    /// A session was discarded.
    SessionReset { session_id: Uuid },
    /// A session was dropped for being idle or to make room.
    SessionExpired { session_id: Uuid },
}

// ── Open options ──────────────────────────────────────────────────────────────

/// Per-session overrides for [`CommsState::open`].
#[derive(Debug, Default)]
pub struct OpenOptions {
    /// API key used instead of the process-wide `LLM_API_KEY`.
    pub api_key: Option<String>,
    /// Receives [`Stage`] notifications for every turn of the session.
    pub progress: Option<mpsc::UnboundedSender<Stage>>,
}

/// Result of opening a session.
#[derive(Debug, Clone)]
pub struct Opened {
    pub session_id: Uuid,
    pub opening: String,
    pub view: SessionView,
}

// ── State ─────────────────────────────────────────────────────────────────────

type SharedSession = Arc<Mutex<Session>>;

struct SessionSlot {
    session: SharedSession,
    /// Last time a request looked the session up.
    touched: Instant,
}

impl SessionSlot {
    /// `false` while a turn holds the session lock.
    fn is_free(&self) -> bool {
        self.session.try_lock().is_ok()
    }
}

/// Shared state passed as `Arc<CommsState>` to every channel task.
pub struct CommsState {
    provider: LlmProvider,
    simulation: SimulationConfig,
    /// Set when agent logs are exported after every turn.
    agent_log_dir: Option<PathBuf>,
    idle_timeout: Duration,
    max_sessions: usize,
    sessions: RwLock<HashMap<Uuid, SessionSlot>>,
    event_tx: mpsc::Sender<CommsEvent>,
}

impl CommsState {
    pub fn new(
        provider: LlmProvider,
        simulation: SimulationConfig,
        agent_log_dir: Option<PathBuf>,
        event_tx: mpsc::Sender<CommsEvent>,
    ) -> Self {
        let limits = SessionLimitsConfig::default();
        Self {
            provider,
            simulation,
            agent_log_dir,
            idle_timeout: Duration::from_secs(limits.idle_timeout_seconds),
            max_sessions: limits.max_sessions,
            sessions: RwLock::new(HashMap::new()),
            event_tx,
        }
    }

    /// Replace the default registry limits.
    pub fn with_limits(mut self, limits: SessionLimitsConfig) -> Self {
        self.idle_timeout = Duration::from_secs(limits.idle_timeout_seconds.max(1));
        self.max_sessions = limits.max_sessions.max(1);
        self
    }

    pub fn from_config(config: &Config, provider: LlmProvider, event_tx: mpsc::Sender<CommsEvent>) -> Self {
        let log_dir = config.simulation.save_agent_log.then(|| config.agent_log_dir());
        Self::new(provider, config.simulation.clone(), log_dir, event_tx).with_limits(config.comms.sessions)
    }

    /// How often [`CommsState::sweep`] should run to honour the idle timeout.
    pub fn sweep_interval(&self) -> Duration {
        (self.idle_timeout / 4).clamp(Duration::from_secs(1), Duration::from_secs(60))
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn max_scenarios(&self) -> u32 {
        self.simulation.max_scenarios
    }

    pub fn session_count(&self) -> usize {
        self.read_sessions().len()
    }

    /// Create a session and run its opening turn.
    ///
    /// The session is registered only when the opening succeeds.
    pub async fn open(&self, channel_id: &str, career: &str, opts: OpenOptions) -> Result<Opened, SessionError> {
        let provider = match opts.api_key.filter(|k| !k.trim().is_empty()) {
            Some(key) => self.provider.with_api_key(key),
            None => self.provider.clone(),
        };
        let mut simulator = Simulator::new(provider, &self.simulation);
        if let Some(tx) = opts.progress {
            simulator = simulator.with_progress(tx);
        }

        let mut session = Session::new(simulator);
        let opening = session.open(career).await?;
        let session_id = session.id();
        self.export(&session).await;
        let view = session.view();

        let evicted = {
            let mut sessions = self.write_sessions();
            let evicted = self.make_room(&mut sessions);
            sessions.insert(
                session_id,
                SessionSlot {
                    session: Arc::new(Mutex::new(session)),
                    touched: Instant::now(),
                },
            );
            evicted
        };
        self.report_expired(evicted);
        info!(%channel_id, %session_id, career = career.trim(), "session opened");
        self.report_event(CommsEvent::SessionStarted {
            channel_id: channel_id.to_string(),
            session_id,
        });
        Ok(Opened { session_id, opening, view })
    }

    /// Play one decision on `session_id` and return the narrated reply.
    pub async fn decide(&self, session_id: Uuid, choice: &str) -> Result<(String, SessionView), SessionError> {
        let slot = self.slot(session_id)?;
        let mut session = slot.lock().await;
        let reply = session.decide(choice).await?;
        self.export(&session).await;
        Ok((reply, session.view()))
    }

    pub async fn summarize(&self, session_id: Uuid) -> Result<Summary, SessionError> {
        let slot = self.slot(session_id)?;
        let mut session = slot.lock().await;
        Ok(session.summarize().await?)
    }

    pub async fn view(&self, session_id: Uuid) -> Result<SessionView, SessionError> {
        let slot = self.slot(session_id)?;
        let session = slot.lock().await;
        Ok(session.view())
    }

    pub async fn agent_log(&self, session_id: Uuid) -> Result<Vec<AgentTurn>, SessionError> {
        let slot = self.slot(session_id)?;
        let session = slot.lock().await;
        Ok(session.simulator().agent_log().to_vec())
    }

    /// Discard a session.
    pub fn reset(&self, session_id: Uuid) -> Result<(), SessionError> {
        self.write_sessions()
            .remove(&session_id)
            .ok_or(SessionError::UnknownSession(session_id))?;
        info!(%session_id, "session reset");
        self.report_event(CommsEvent::SessionReset { session_id });
        Ok(())
    }

    /// Drop sessions idle for longer than the idle timeout; returns how many.
    pub fn sweep(&self) -> usize {
        let expired = self.remove_idle(&mut self.write_sessions());
        let n = expired.len();
        self.report_expired(expired);
        n
    }

    /// Report an event to the comms manager.
    ///
    /// Non-blocking: drops the event and logs a warning if the manager is not
    /// keeping up or has already exited.
    pub fn report_event(&self, event: CommsEvent) {
        if let Err(e) = self.event_tx.try_send(event) {
            warn!("comms event dropped: {e}");
        }
    }

    fn slot(&self, session_id: Uuid) -> Result<SharedSession, SessionError> {
        let mut sessions = self.write_sessions();
        let slot = sessions
            .get_mut(&session_id)
            .ok_or(SessionError::UnknownSession(session_id))?;
        slot.touched = Instant::now();
        Ok(slot.session.clone())
    }

    /// Expire idle sessions, then evict least recently used ones until a new
    /// session fits. Sessions with a turn in flight are never removed.
    fn make_room(&self, sessions: &mut HashMap<Uuid, SessionSlot>) -> Vec<Uuid> {
        let mut evicted = self.remove_idle(sessions);
        while sessions.len() >= self.max_sessions {
            let Some(oldest) = sessions
                .iter()
                .filter(|(_, slot)| slot.is_free())
                .min_by_key(|(_, slot)| slot.touched)
                .map(|(id, _)| *id)
            else {
                break;
            };
            sessions.remove(&oldest);
            evicted.push(oldest);
        }
        evicted
    }

    fn remove_idle(&self, sessions: &mut HashMap<Uuid, SessionSlot>) -> Vec<Uuid> {
        let now = Instant::now();
        let idle: Vec<Uuid> = sessions
            .iter()
            .filter(|(_, slot)| slot.is_free() && now.duration_since(slot.touched) >= self.idle_timeout)
            .map(|(id, _)| *id)
            .collect();
        for id in &idle {
            sessions.remove(id);
        }
        idle
    }

    fn report_expired(&self, ids: Vec<Uuid>) {
        for session_id in ids {
            info!(%session_id, "session expired");
            self.report_event(CommsEvent::SessionExpired { session_id });
        }
    }

    async fn export(&self, session: &Session) {
        if let Some(dir) = &self.agent_log_dir {
            if let Err(e) = session.export_log(dir).await {
                warn!(session = %session.id(), "agent log export failed: {e}");
            }
        }
    }

    fn read_sessions(&self) -> std::sync::RwLockReadGuard<'_, HashMap<Uuid, SessionSlot>> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_sessions(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<Uuid, SessionSlot>> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }
}
