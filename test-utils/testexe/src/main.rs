use clap::Parser;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

/// Test child for mcp-proxy E2E testing
#[derive(Parser, Debug)]
#[command(name = "testexe")]
#[command(about = "Test child process for mcp-proxy testing", long_about = None)]
struct Args {
    /// Artifact path as passed by the proxy (only logged)
    artifact: Option<PathBuf>,

    /// Exit code to return when the run ends or a signal arrives
    #[arg(long, default_value = "0")]
    exit_code: i32,

    /// Milliseconds to run before exiting (0 = run until signalled)
    #[arg(long, default_value = "0")]
    run_duration_ms: u64,

    /// Copy stdin lines to stdout
    #[arg(long)]
    echo: bool,

    /// Print "started pid=<pid>" on stdout at startup
    #[arg(long)]
    banner: bool,

    /// Keep running after SIGTERM (only SIGKILL stops it)
    #[arg(long)]
    ignore_sigterm: bool,

    /// Append one line with the pid to this file at startup
    #[arg(long)]
    spawn_log: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // stdout is the data channel, logs go to stderr
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(false)
        .init();

    let args = Args::parse();
    let pid = std::process::id();
    info!(pid, "Starting testexe with args: {:?}", args);

    if let Some(path) = &args.spawn_log {
        if let Err(e) = append_line(path, &pid.to_string()) {
            error!("Failed to write spawn log {}: {}", path.display(), e);
            std::process::exit(1);
        }
    }

    // Install handlers before announcing readiness
    #[cfg(unix)]
    let signal_task = tokio::spawn(wait_for_signal(register_signals(), args.ignore_sigterm));
    #[cfg(not(unix))]
    let signal_task = tokio::spawn(async {
        let _ = tokio::signal::ctrl_c().await;
    });

    if args.banner {
        let mut stdout = tokio::io::stdout();
        let _ = stdout.write_all(format!("started pid={}\n", pid).as_bytes()).await;
        let _ = stdout.flush().await;
    }

    if args.echo {
        tokio::spawn(echo_stdin());
    }

    info!("Testexe is fully operational");

    let run_duration = args.run_duration_ms;
    let run_timer = async move {
        if run_duration > 0 {
            sleep(Duration::from_millis(run_duration)).await;
        } else {
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = run_timer => {
            info!("Run duration ({}ms) reached, exiting", run_duration);
        }
        _ = signal_task => {
            info!("Testexe received signal");
        }
    }

    info!("Testexe stopped");
    std::process::exit(args.exit_code);
}

fn append_line(path: &Path, line: &str) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{}", line)
}

async fn echo_stdin() {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    loop {
        match lines.next_line().await {
            Ok(Some(line)) => {
                debug!("Echoing {} bytes", line.len());
                if stdout.write_all(format!("{}\n", line).as_bytes()).await.is_err()
                    || stdout.flush().await.is_err()
                {
                    warn!("stdout closed, stopping echo");
                    return;
                }
            }
            Ok(None) => {
                info!("stdin closed");
                return;
            }
            Err(e) => {
                warn!("Failed to read stdin: {}", e);
                return;
            }
        }
    }
}

#[cfg(unix)]
type UnixSignals = (tokio::signal::unix::Signal, tokio::signal::unix::Signal);

#[cfg(unix)]
fn register_signals() -> UnixSignals {
    use tokio::signal::unix::{signal, SignalKind};

    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(term), Ok(int)) => (term, int),
        (Err(e), _) | (_, Err(e)) => {
            error!("Failed to setup signal handlers: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal((mut sigterm, mut sigint): UnixSignals, ignore_sigterm: bool) {
    loop {
        tokio::select! {
            _ = sigterm.recv() => {
                if ignore_sigterm {
                    warn!("Received SIGTERM, ignoring");
                    continue;
                }
                info!("Received SIGTERM");
                return;
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
                return;
            }
        }
    }
}
