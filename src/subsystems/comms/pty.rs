//! PTY (console) channel. Plays one career day on stdin/stdout.
//!
//! Asks for a career, prints the opening, then loops on decisions until the
//! day is complete or the user types `quit`/`exit`/`end`, and finishes with
//! the summary. Agent progress banners are printed while each turn runs.
//!
//! Runs until the day ends, stdin closes, or `shutdown` is cancelled. The
//! session is released from the registry on every way out.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::state::{CommsEvent, CommsState, OpenOptions, SessionError};
use crate::core::error::AppError;
use crate::subsystems::runtime::{Component, ComponentFuture};
use crate::subsystems::simulation::{Stage, Summary};

const RULE: &str = "======================================================================";
const THIN_RULE: &str = "----------------------------------------------------------------------";
/// Console-only: the web API treats these as ordinary decisions.
const STOP_WORDS: [&str; 3] = ["quit", "exit", "end"];
const SUMMARY_SKILLS_SHOWN: usize = 5;

// ── PtyChannel ───────────────────────────────────────────────────────────────

pub struct PtyChannel {
    channel_id: String,
    state: Arc<CommsState>,
    /// Cancel the shared token when the day is over (console-only runs).
    exit_on_finish: bool,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>, state: Arc<CommsState>, exit_on_finish: bool) -> Self {
        Self {
            channel_id: channel_id.into(),
            state,
            exit_on_finish,
        }
    }
}

impl Component for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, shutdown: CancellationToken) -> ComponentFuture {
        Box::pin(async move {
            info!(channel_id = %self.channel_id, "pty channel started");
            let stdin = BufReader::new(tokio::io::stdin());
            let mut out = std::io::stdout();
            let result = run_console(&self.channel_id, &self.state, stdin, &mut out, &shutdown).await;

            self.state.report_event(CommsEvent::ChannelShutdown {
                channel_id: self.channel_id.clone(),
            });
            if self.exit_on_finish {
                shutdown.cancel();
            }
            result
        })
    }
}

// ── Console flow ──────────────────────────────────────────────────────────────

/// Line source that gives up on EOF or shutdown.
struct Prompter<R> {
    lines: Lines<R>,
}

impl<R: AsyncBufRead + Unpin> Prompter<R> {
    async fn ask<W: Write>(
        &mut self,
        out: &mut W,
        prompt: &str,
        shutdown: &CancellationToken,
    ) -> Result<Option<String>, AppError> {
        write!(out, "{prompt}")?;
        out.flush()?;
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                writeln!(out)?;
                Ok(None)
            }
            line = self.lines.next_line() => match line {
                Ok(Some(l)) => Ok(Some(l.trim().to_string())),
                Ok(None) => {
                    info!("pty stdin closed");
                    Ok(None)
                }
                Err(e) => {
                    warn!("pty read error: {e}");
                    Ok(None)
                }
            },
        }
    }
}

/// Drive `turn` to completion while printing progress banners from `progress`.
/// Returns `None` when shutdown wins.
async fn with_progress<T, W: Write>(
    turn: impl Future<Output = T>,
    progress: &mut mpsc::UnboundedReceiver<Stage>,
    out: &mut W,
    shutdown: &CancellationToken,
) -> Result<Option<T>, AppError> {
    tokio::pin!(turn);
    loop {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => return Ok(None),
            Some(stage) = progress.recv() => print_stage(out, &stage)?,
            res = &mut turn => {
                while let Ok(stage) = progress.try_recv() {
                    print_stage(out, &stage)?;
                }
                return Ok(Some(res));
            }
        }
    }
}

fn print_stage<W: Write>(out: &mut W, stage: &Stage) -> std::io::Result<()> {
    match stage {
        Stage::Reasoning { .. } => writeln!(out, "{}", stage.banner()),
        _ => writeln!(out, "\n{}", stage.banner()),
    }
}

fn heading<W: Write>(out: &mut W, title: &str) -> std::io::Result<()> {
    writeln!(out, "\n{RULE}\n{title}\n{RULE}")
}

/// The whole console session: career prompt, decision loop, summary.
pub(crate) async fn run_console<R, W>(
    channel_id: &str,
    state: &CommsState,
    input: R,
    out: &mut W,
    shutdown: &CancellationToken,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    let mut prompter = Prompter { lines: input.lines() };
    let (progress_tx, mut progress) = mpsc::unbounded_channel();

    writeln!(out, "{RULE}")?;
    writeln!(out, "MULTI-AGENT CAREER SIMULATION")?;
    writeln!(out, "   Research -> Design -> Evaluate -> Narrate")?;
    writeln!(out, "{RULE}")?;

    // Career prompt; a failed opening asks again.
    let (session_id, opening): (Uuid, String) = loop {
        let Some(career) = prompter
            .ask(out, "\nWhat career would you like to experience? ", shutdown)
            .await?
        else {
            return Ok(());
        };
        if career.is_empty() {
            continue;
        }

        heading(out, "AGENT COLLABORATION IN PROGRESS...")?;
        let opts = OpenOptions {
            api_key: None,
            progress: Some(progress_tx.clone()),
        };
        let Some(res) = with_progress(state.open(channel_id, &career, opts), &mut progress, out, shutdown).await?
        else {
            return Ok(());
        };
        match res {
            Ok(opened) => break (opened.session_id, opened.opening),
            Err(e) => {
                warn!(%channel_id, "opening failed: {e}");
                writeln!(out, "\nerror: {e}")?;
            }
        }
    };

    let result = async {
        heading(out, "YOUR CAREER DAY BEGINS:")?;
        writeln!(out, "{opening}")?;
        play_day(channel_id, state, &mut prompter, &mut progress, out, shutdown, session_id).await
    }
    .await;
    if let Err(e) = state.reset(session_id) {
        debug!(%channel_id, "session already gone: {e}");
    }
    result
}

/// Decision loop and summary for an opened session.
async fn play_day<R, W>(
    channel_id: &str,
    state: &CommsState,
    prompter: &mut Prompter<R>,
    progress: &mut mpsc::UnboundedReceiver<Stage>,
    out: &mut W,
    shutdown: &CancellationToken,
    session_id: Uuid,
) -> Result<(), AppError>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    loop {
        let view = state.view(session_id).await.map_err(comms_err)?;
        if view.complete {
            break;
        }
        writeln!(out, "\n{THIN_RULE}")?;
        let Some(choice) = prompter
            .ask(out, "\nWhat do you do? (or 'quit' to end): ", shutdown)
            .await?
        else {
            return Ok(());
        };
        if STOP_WORDS.contains(&choice.to_lowercase().as_str()) {
            debug!(%channel_id, "user ended the day early");
            break;
        }
        if choice.is_empty() {
            continue;
        }

        heading(out, "AGENTS PROCESSING YOUR DECISION...")?;
        let Some(res) = with_progress(state.decide(session_id, &choice), progress, out, shutdown).await? else {
            return Ok(());
        };
        match res {
            Ok((reply, view)) => {
                heading(out, "WHAT HAPPENS NEXT:")?;
                writeln!(out, "{reply}")?;
                if let Some(insight) = &view.state.last_insight {
                    writeln!(out, "\nProfessional insight: {insight}")?;
                }
            }
            Err(e) => {
                warn!(%channel_id, "decision failed: {e}");
                writeln!(out, "\nerror: {e}")?;
            }
        }
    }

    heading(out, "CAREER DAY COMPLETE - GENERATING INSIGHTS...")?;
    let Some(res) = with_progress(state.summarize(session_id), progress, out, shutdown).await? else {
        return Ok(());
    };
    match res {
        Ok(summary) => print_summary(out, &summary)?,
        Err(e) => writeln!(out, "\nerror: {e}")?,
    }

    let log_len = state.agent_log(session_id).await.map_err(comms_err)?.len();
    writeln!(out, "\nAgent collaboration log: {log_len} interactions")?;
    out.flush()?;
    Ok(())
}

fn print_summary<W: Write>(out: &mut W, summary: &Summary) -> std::io::Result<()> {
    let skills: Vec<&str> = summary
        .skills
        .iter()
        .take(SUMMARY_SKILLS_SHOWN)
        .map(String::as_str)
        .collect();
    writeln!(out, "\nSUMMARY:")?;
    writeln!(out, "   Career: {}", summary.career)?;
    writeln!(out, "   Scenarios Completed: {}", summary.scenarios_completed)?;
    writeln!(out, "   Skills Demonstrated: {}", skills.join(", "))?;
    writeln!(out, "   Agent Interactions: {}", summary.agent_interactions)?;
    writeln!(out, "\n{}", summary.summary)
}

fn comms_err(e: SessionError) -> AppError {
    AppError::Comms(e.to_string())
}
