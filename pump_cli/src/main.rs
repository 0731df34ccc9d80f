#![forbid(unsafe_code)]
#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]

mod cli;
mod infuse;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD};
use eyre::{Result, WrapErr};
use std::fs;
use std::path::Path;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let cfg = load_config(&cli.config)?;
    init_tracing(&cli, &cfg)?;
    tracing::debug!(config = %cli.config.display(), "configuration loaded");

    match cli.cmd {
        Commands::Infuse {
            volume,
            speed,
            capacity_ul,
            level_ul,
            yes,
        } => infuse::run(
            &cfg,
            infuse::InfuseArgs {
                volume_ul: volume,
                speed_ul_s: speed,
                capacity_ul,
                level_ul,
                yes,
                json: cli.json,
            },
        ),
        Commands::SelfCheck => infuse::self_check(&cfg, cli.json),
    }
}

/// Read and validate the config file, falling back to built-in defaults
/// when the file does not exist. A file that exists but fails to parse
/// or validate is an error, never a silent fallback.
fn load_config(path: &Path) -> Result<pump_config::Config> {
    if !path.exists() {
        return Ok(pump_config::Config::default());
    }
    let text = fs::read_to_string(path)
        .wrap_err_with(|| format!("reading config {}", path.display()))?;
    let cfg = pump_config::load_toml(&text)
        .wrap_err_with(|| format!("parsing config {}", path.display()))?;
    cfg.validate()
        .wrap_err_with(|| format!("validating config {}", path.display()))?;
    Ok(cfg)
}

fn init_tracing(cli: &Cli, cfg: &pump_config::Config) -> Result<()> {
    let level = cli
        .log_level
        .as_deref()
        .or(cfg.logging.level.as_deref())
        .unwrap_or("info");
    let filter =
        EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?;

    // CLI flag wins over the config file for the log sink.
    let log_file = cli
        .log_file
        .clone()
        .or_else(|| cfg.logging.file.as_ref().map(Into::into));
    let file_layer = match log_file {
        Some(path) => {
            let file = fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .wrap_err_with(|| format!("opening log file {}", path.display()))?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).with_ansi(false))
        }
        None => None,
    };

    // Logs go to stderr so `--json` event lines on stdout stay parseable.
    let registry = tracing_subscriber::registry().with(filter).with(file_layer);
    if cli.json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .init();
    }
    Ok(())
}
