//! Process-wide `tracing` setup for career-sim.
//!
//! The console channel shares the terminal with log output, so `[app]
//! log_file` can redirect logs to a file. [`init`] runs once from `main`.

use std::path::Path;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::BoxMakeWriter;

use crate::core::error::AppError;

/// Install the global subscriber.
///
/// `cli_wins` is set when the level came from `-v` flags: the flag level is
/// used and `RUST_LOG` only rescues an unparseable one. Otherwise `RUST_LOG`
/// overrides the configured level when it is set.
pub fn init(level: &str, cli_wins: bool, log_file: Option<&Path>) -> Result<(), AppError> {
    let filter = filter_for(level, cli_wins)?;
    let writer = match log_file {
        Some(path) => BoxMakeWriter::new(open_log_file(path)?),
        None => BoxMakeWriter::new(std::io::stderr),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(log_file.is_none())
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

fn filter_for(level: &str, cli_wins: bool) -> Result<EnvFilter, AppError> {
    if cli_wins {
        return EnvFilter::try_new(level).or_else(|level_err| {
            EnvFilter::try_from_default_env().map_err(|env_err| {
                AppError::Logger(format!(
                    "invalid log level '{level}': {level_err}; RUST_LOG parse failed: {env_err}"
                ))
            })
        });
    }
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .map_err(|e| AppError::Logger(format!("invalid log level '{level}': {e}")))
}

/// Append-mode handle on `path`, creating missing parent directories.
fn open_log_file(path: &Path) -> Result<std::fs::File, AppError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| AppError::Logger(format!("failed to create {}: {e}", parent.display())))?;
    }
    std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| AppError::Logger(format!("failed to open log file '{}': {e}", path.display())))
}
