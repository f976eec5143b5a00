//! Comms subsystem — the user-facing channels.
//!
//! Each channel (PTY console, axum web) implements [`Component`] and is
//! spawned as an independent task by [`start`]. Channels capture their
//! shared [`Arc<CommsState>`] at construction.
//!
//! An intra-subsystem [`mpsc`] channel lets running channels signal the
//! comms manager (lifecycle events, session tracking). It is drained in a
//! background task that ends when every sender is dropped.

mod state;
#[cfg(feature = "channel-pty")]
pub mod pty;
#[cfg(feature = "channel-axum")]
pub mod axum_channel;

pub use state::{CommsEvent, CommsState, OpenOptions, Opened, SessionError};

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::core::config::Config;
use crate::llm::LlmProvider;
use crate::subsystems::runtime::{spawn_components, Component, SubsystemHandle};

/// Spawn all configured channels and return a [`SubsystemHandle`].
///
/// Synchronous: returns as soon as the tasks are spawned. When no channel is
/// configured the handle resolves immediately.
pub fn start(config: &Config, provider: LlmProvider, shutdown: CancellationToken) -> SubsystemHandle {
    let (event_tx, event_rx) = mpsc::channel::<CommsEvent>(32);
    let state = Arc::new(CommsState::from_config(config, provider, event_tx));

    let mut components: Vec<Box<dyn Component>> = Vec::new();

    #[cfg(feature = "channel-pty")]
    if config.comms_pty_should_load() {
        info!("loading pty channel");
        // Console-only runs end with the career day.
        let exit_on_finish = !config.comms_axum_should_load() || cfg!(not(feature = "channel-axum"));
        components.push(Box::new(pty::PtyChannel::new("pty0", state.clone(), exit_on_finish)));
    }

    #[cfg(feature = "channel-axum")]
    if config.comms_axum_should_load() {
        info!(bind = %config.comms.axum_channel.bind, "loading axum channel");
        components.push(Box::new(axum_channel::AxumChannel::new(
            "axum0",
            config.comms.axum_channel.bind.clone(),
            std::time::Duration::from_secs(config.comms.axum_channel.turn_timeout_seconds),
            state.clone(),
        )));
        spawn_sweeper(state.clone(), shutdown.clone());
    }
    #[cfg(not(feature = "channel-axum"))]
    if config.comms_axum_should_load() {
        tracing::warn!(
            "config has [comms.axum_channel] enabled = true but this binary was compiled \
             without the `channel-axum` feature; channel will not start"
        );
    }

    if components.is_empty() {
        info!("no comms channels configured");
    }

    tokio::spawn(async move {
        let mut rx = event_rx;
        while let Some(event) = rx.recv().await {
            match event {
                CommsEvent::ChannelShutdown { channel_id } => {
                    debug!(%channel_id, "channel reported shutdown");
                }
                CommsEvent::SessionStarted { channel_id, session_id } => {
                    debug!(%channel_id, %session_id, "session started");
                }
                CommsEvent::SessionReset { session_id } => {
                    debug!(%session_id, "session reset");
                }
                CommsEvent::SessionExpired { session_id } => {
                    debug!(%session_id, "session expired");
                }
            }
        }
    });

    spawn_components(components, shutdown)
}

/// Periodically drop idle web sessions until shutdown.
#[cfg(feature = "channel-axum")]
fn spawn_sweeper(state: Arc<CommsState>, shutdown: CancellationToken) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(state.sweep_interval());
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let n = state.sweep();
                    if n > 0 {
                        debug!(expired = n, "idle sessions swept");
                    }
                }
            }
        }
    });
}
