//! CLI argument definitions and shared statics.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::OnceLock;

pub static FILE_GUARD: OnceLock<tracing_appender::non_blocking::WorkerGuard> = OnceLock::new();

#[derive(Parser, Debug)]
#[command(name = "pump", version, about = "Infusion pump simulator CLI")]
pub struct Cli {
    /// Path to config TOML; built-in defaults apply when the file is absent
    #[arg(long, value_name = "FILE", default_value = "etc/pump_config.toml")]
    pub config: PathBuf,

    /// Emit events as JSON lines on stdout instead of pretty logs
    #[arg(long, action = ArgAction::SetTrue)]
    pub json: bool,

    /// Console log level (error|warn|info|debug|trace).
    /// Falls back to `logging.level` from the config, then "info".
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Append JSON-line logs to this file
    #[arg(long = "log-file", value_name = "FILE")]
    pub log_file: Option<PathBuf>,

    /// Command to execute
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a simulated infusion until it finishes (or ctrl-c stops it)
    Infuse {
        /// Target volume in microliters
        #[arg(long, value_name = "UL")]
        volume: f64,
        /// Infusion speed in microliters per second
        #[arg(long, value_name = "UL_S")]
        speed: f64,
        /// Override reservoir capacity from the config
        #[arg(long, value_name = "UL")]
        capacity_ul: Option<f64>,
        /// Start with a partially depleted reservoir
        #[arg(long, value_name = "UL")]
        level_ul: Option<f64>,
        /// Accept advisory warnings without confirmation
        #[arg(long, short = 'y', action = ArgAction::SetTrue)]
        yes: bool,
    },
    /// Quick health check (controller builds and a tiny dose completes)
    SelfCheck,
}
