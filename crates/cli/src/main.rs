//! CareOps CLI - command-line client for the CareOps API

mod commands;
mod config;
mod logging;
mod state_dir;
mod terminal;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use commands::Commands;
use state_dir::StateDir;
use std::path::PathBuf;
use tracing::{Level, debug, error};

#[derive(Parser)]
#[command(name = "careops")]
#[command(about = "Command-line client for the CareOps API")]
#[command(version)]
struct Cli {
    /// Set logging level
    #[arg(short = 'l', long, global = true, default_value = "warn")]
    log_level: LogLevel,

    /// Directory for the stored session, configuration and logs
    #[arg(short = 'd', long, global = true, env = "CAREOPS_STATE_DIR")]
    state_dir: Option<PathBuf>,

    /// Client configuration file (defaults to <state-dir>/config.json)
    #[arg(short = 'c', long, global = true)]
    config: Option<PathBuf>,

    /// Disable file logging (only log to stderr)
    #[arg(long, global = true)]
    no_file_log: bool,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let state = match cli.state_dir {
        Some(dir) => StateDir::with_override(dir),
        None => StateDir::new(),
    };

    let log_file = (!cli.no_file_log).then(|| state.log_file());
    logging::init_logging(cli.log_level.into(), log_file)?;

    debug!(state_dir = %state.root().display(), "starting careops cli");

    if let Err(e) = cli.command.execute(&state, cli.config).await {
        error!("Command failed: {e:#}");
        eprintln!("error: {e}");
        std::process::exit(1);
    }

    Ok(())
}

#[derive(Clone, Debug, ValueEnum)]
enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for Level {
    fn from(log_level: LogLevel) -> Self {
        match log_level {
            LogLevel::Error => Self::ERROR,
            LogLevel::Warn => Self::WARN,
            LogLevel::Info => Self::INFO,
            LogLevel::Debug => Self::DEBUG,
            LogLevel::Trace => Self::TRACE,
        }
    }
}
