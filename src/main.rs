//! career-sim — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Parse CLI flags, load config
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build the LLM provider
//!   6. Spawn Ctrl-C → shutdown signal watcher
//!   7. Run comms channels until the day ends or shutdown

use std::io::Write as _;

use tokio_util::sync::CancellationToken;
use tracing::info;

use career_sim::bootstrap::logger;
use career_sim::core::config::{self, Config};
use career_sim::core::error::AppError;
use career_sim::llm::providers;
use career_sim::subsystems::comms;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // Load .env if present — ignore errors (file is optional).
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();

    let mut config = config::load(args.config_path.as_deref())?;

    // Without -i the console stays off (daemon-safe default).
    if !args.interactive {
        config.comms.pty.enabled = false;
    }
    if args.serve {
        config.comms.axum_channel.enabled = true;
    }

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    let force_cli_level = args.log_level.is_some();

    logger::init(effective_log_level, force_cli_level, config.log_file.as_deref())?;

    info!(
        app = %config.app_name,
        work_dir = %config.work_dir.display(),
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        interactive = %args.interactive,
        "config loaded"
    );

    let provider = providers::build(&config.llm, config.llm_api_key.clone())
        .map_err(|e| AppError::Llm(e.to_string()))?;

    if !config.comms_pty_should_load() && !config.comms_axum_should_load() {
        eprintln!("nothing to do: pass -i for the console or -s to serve the web UI (see --help)");
        return Ok(());
    }

    // Shared shutdown token — Ctrl-C cancels it, all tasks watch it.
    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received — initiating shutdown");
            ctrlc_token.cancel();
        }
    });

    print_startup_summary(&config, provider.name());

    let channels = comms::start(&config, provider, shutdown.clone());
    let result = channels.join().await;
    shutdown.cancel();

    if args.interactive {
        println!("\nBye :) ...");
        let _ = std::io::stdout().flush();
    }
    let _ = std::io::stderr().flush();

    result
}

fn print_startup_summary(config: &Config, provider_name: &str) {
    let fit = |text: String| -> String {
        const WIDTH: usize = 58;
        let char_count = text.chars().count();
        if char_count >= WIDTH {
            let mut out = text.chars().take(WIDTH - 1).collect::<String>();
            out.push('…');
            out
        } else {
            format!("{text:<WIDTH$}")
        }
    };

    let llm_line = if provider_name == "dummy" {
        "provider=dummy (echo, no network)".to_string()
    } else {
        let active = config.llm.active();
        format!(
            "provider={} model={} stream={}",
            provider_name, active.model, active.stream
        )
    };
    let key_line = match &config.llm_api_key {
        Some(_) => "api key: LLM_API_KEY".to_string(),
        None => "api key: none (set LLM_API_KEY or per session)".to_string(),
    };

    let mut comms_lines = Vec::new();
    #[cfg(feature = "channel-pty")]
    comms_lines.push(format!(
        "pty: {}",
        if config.comms.pty.enabled { "enabled" } else { "disabled" }
    ));
    #[cfg(feature = "channel-axum")]
    comms_lines.push(if config.comms.axum_channel.enabled {
        format!("axum: http://{}", config.comms.axum_channel.bind)
    } else {
        "axum: disabled".to_string()
    });
    #[cfg(not(feature = "channel-axum"))]
    if config.comms.axum_channel.enabled {
        comms_lines.push("axum: configured but not compiled in".to_string());
    }

    let sim = &config.simulation;
    let sim_line = format!(
        "{} scenarios, {} -> {}",
        sim.max_scenarios,
        sim.time_slots.first().map(String::as_str).unwrap_or("?"),
        sim.time_slots.last().map(String::as_str).unwrap_or("?"),
    );

    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ Career Day Simulator                                         ║");
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ App: {:<56}║", config.app_name);
    println!("║ PID: {:<56}║", std::process::id());
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ Comms                                                        ║");
    for line in comms_lines {
        println!("║   {}   ║", fit(line));
    }
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ LLM                                                          ║");
    println!("║   {}   ║", fit(llm_line));
    println!("║   {}   ║", fit(key_line));
    println!("╟──────────────────────────────────────────────────────────────╢");
    println!("║ Simulation                                                   ║");
    println!("║   {}   ║", fit(sim_line));
    println!("╚══════════════════════════════════════════════════════════════╝");
}

struct CliArgs {
    log_level: Option<&'static str>,
    interactive: bool,
    serve: bool,
    config_path: Option<String>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut interactive = false;
    let mut serve = false;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        if arg == "--" {
            break;
        }

        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: career-sim [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -i, --interactive          Play a career day in the console");
                println!("  -s, --serve                Serve the web UI ([comms.axum_channel] bind)");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                println!();
                println!("Environment:");
                println!("  LLM_API_KEY                API key for the chat-completion endpoint");
                println!("  CAREER_SIM_WORK_DIR        Override [app] work_dir");
                println!("  CAREER_SIM_LOG_LEVEL       Override [app] log_level");
                std::process::exit(0);
            }
            "-i" | "--interactive" => interactive = true,
            "-s" | "--serve" => serve = true,
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            other => eprintln!("warning: ignoring unknown argument '{other}'"),
        }
    }

    // Each -v raises verbosity one tier:
    //   -v      → warn
    //   -vv     → info
    //   -vvv    → debug  (agent requests, stage timing)
    //   -vvvv+  → trace  (full payload dumps)
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { log_level, interactive, serve, config_path }
}
