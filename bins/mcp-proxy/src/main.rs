use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info};

use proxy_supervisor::{ArtifactSource, ProcessSupervisor, SupervisorConfig};

/// Supervising stdio proxy: keeps one MCP tool server running, restarts it on
/// crashes and rebuilds, and forwards stdio untouched.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    /// Command used to run the artifact (overrides config)
    #[arg(long, value_name = "CMD")]
    command: Option<String>,

    /// Artifact passed to the command (overrides config and environment)
    #[arg(long, value_name = "PATH")]
    artifact_path: Option<PathBuf>,

    /// Delay before a crash restart, in milliseconds
    #[arg(long, value_name = "N")]
    restart_delay_ms: Option<u64>,

    /// Crash restarts allowed before giving up
    #[arg(long, value_name = "N")]
    max_restart_attempts: Option<u32>,

    /// Time between SIGTERM and SIGKILL, in milliseconds
    #[arg(long, value_name = "N")]
    grace_timeout_ms: Option<u64>,

    /// Disable restarts on file changes
    #[arg(long)]
    no_watch: bool,

    /// Extra arguments appended after the artifact path
    #[arg(last = true, value_name = "EXTRA_ARGS")]
    extra_args: Vec<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = initialize_logging(args.debug) {
        eprintln!("Failed to initialize logging: {:#}", e);
        std::process::exit(1);
    }

    // Exit explicitly: the runtime would otherwise wait on the blocking stdin reader
    let code = match run(args).await {
        Ok(code) => code,
        Err(e) => {
            error!("Fatal error: {:#}", e);
            1
        }
    };
    std::process::exit(code);
}

async fn run(args: Args) -> Result<i32> {
    info!("Starting MCP proxy");

    let mut config = match &args.config {
        Some(path) => {
            info!("Config file: {}", path.display());
            SupervisorConfig::load_from_file(path)?
        }
        None => SupervisorConfig::default(),
    };

    config.apply_env_overrides();
    apply_cli_overrides(&mut config, &args);
    config.validate().context("Invalid configuration")?;

    match config.target.artifact_source {
        ArtifactSource::Environment => info!(
            "Using {} from environment: {}",
            config.target.artifact_path_env,
            config.target.artifact_path().display()
        ),
        ArtifactSource::Default => info!(
            "{} not set, using default: {}",
            config.target.artifact_path_env,
            config.target.artifact_path().display()
        ),
        source => info!(
            "Using artifact path from {}: {}",
            source,
            config.target.artifact_path().display()
        ),
    }
    info!("Target command: {}", config.target.command_line());

    let handle = ProcessSupervisor::new(config).start().await?;
    let report = handle.wait().await?;

    Ok(report.exit_code())
}

fn apply_cli_overrides(config: &mut SupervisorConfig, args: &Args) {
    if let Some(command) = &args.command {
        config.target.command = command.clone();
    }
    if let Some(path) = &args.artifact_path {
        config
            .target
            .set_artifact_path(path.clone(), ArtifactSource::CommandLine);
    }
    if let Some(ms) = args.restart_delay_ms {
        config.restart.delay = Duration::from_millis(ms);
    }
    if let Some(max) = args.max_restart_attempts {
        config.restart.max_attempts = max;
    }
    if let Some(ms) = args.grace_timeout_ms {
        config.shutdown.grace_timeout = Duration::from_millis(ms);
        config.shutdown.restart_grace_timeout = Duration::from_millis(ms);
    }
    if args.no_watch {
        config.watch.enabled = false;
    }
    if !args.extra_args.is_empty() {
        config.target.args.extend(args.extra_args.iter().cloned());
    }
}

fn initialize_logging(debug: bool) -> Result<()> {
    let level = if debug { "debug" } else { "info" };

    // stdout belongs to the child
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    Ok(())
}
