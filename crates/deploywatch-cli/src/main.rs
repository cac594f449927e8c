//! monitor: watch a deployed site for status, content, and design changes.
//!
//! # Usage
//!
//! ```text
//! monitor <project-name> [--once] [--config deploywatch.toml]
//! ```

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tokio::sync::watch;
use tracing::{info, warn};

use deploywatch_core::MonitorConfig;
use deploywatch_health::HealthCheck;

const USAGE: &str = "Usage: monitor <project-name> [--once]
Example: monitor the-real-mermaids-interactive-book
Default: monitor kidsbook-dev --once";

#[derive(Parser, Debug)]
#[command(
    name = "monitor",
    about = "Deployment monitor that detects outages and design rollbacks",
    version
)]
struct Cli {
    /// Project name (used in log lines and the default log file name).
    project: Option<String>,

    /// Run a single check and exit 0 (healthy) or 1 (issues detected).
    #[arg(long)]
    once: bool,

    /// TOML config file overriding candidates, markers, and alerting.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Seconds between checks in continuous mode.
    #[arg(long)]
    interval: Option<u64>,

    /// Append-only log file (default: deployment-monitor-<project>.log).
    #[arg(long, conflicts_with = "no_log_file")]
    log_file: Option<PathBuf>,

    /// Log to stdout only.
    #[arg(long)]
    no_log_file: bool,
}

/// Defaults, then the config file, then command-line flags.
fn resolve_config(cli: &Cli, project: &str) -> anyhow::Result<MonitorConfig> {
    let mut config = match &cli.config {
        Some(path) => MonitorConfig::from_file(project, path)?,
        None => MonitorConfig::new(project),
    };
    if let Some(secs) = cli.interval {
        config.check_interval = Duration::from_secs(secs);
    }
    if let Some(path) = &cli.log_file {
        config.log_file = Some(path.clone());
    }
    if cli.no_log_file {
        config.log_file = None;
    }
    config.validate()?;
    Ok(config)
}

/// The project name, or the usage text written to `out` and exit code 1.
fn require_project(cli: &Cli, out: &mut impl Write) -> Result<String, u8> {
    match &cli.project {
        Some(project) => Ok(project.clone()),
        None => {
            let _ = writeln!(out, "{USAGE}");
            Err(1)
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let project = match require_project(&cli, &mut std::io::stdout().lock()) {
        Ok(project) => project,
        Err(code) => return Ok(ExitCode::from(code)),
    };

    let config = resolve_config(&cli, &project)?;
    let mut check = HealthCheck::new(config)?;

    if cli.once {
        let verdict = check.run_once().await;
        return Ok(ExitCode::from(verdict.exit_code()));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("shutdown signal received");
                let _ = shutdown_tx.send(true);
            }
            Err(e) => {
                warn!(error = %e, "failed to install Ctrl-C handler");
                // Keep the sender alive so the loop runs until killed.
                std::future::pending::<()>().await;
            }
        }
    });

    check.run(shutdown_rx).await;
    Ok(ExitCode::SUCCESS)
}
