mod alert;
mod cancel;
mod config;
mod gitlab;
mod listener;
mod monitor;
mod status;

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Polls a GitLab pipeline until it reaches a terminal state, then sounds a
/// repeating alarm. Type STOP_ALARM (or press Ctrl-C) to stop monitoring or
/// silence the alarm.
#[derive(Parser, Debug)]
#[command(name = "pipeline-alarm", version, about)]
struct Cli {
    /// Pipeline id or URL ending in the id
    #[arg(value_name = "PIPELINE")]
    pipeline: String,

    /// Settings file path (VS Code settings.json style)
    #[arg(value_name = "SETTINGS", default_value = ".vscode/settings.json")]
    settings: PathBuf,

    /// Seconds between status polls
    #[arg(long, default_value_t = 30)]
    interval_secs: u64,

    /// Poll attempts before giving up
    #[arg(long, default_value_t = 60)]
    max_attempts: u32,

    /// Extra logging (fetch results, cancellation, alarm lifecycle)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = config::load(&cli.settings)?;
    let provider = gitlab::GitlabProvider::new(&config)?;

    let cancel = cancel::CancelToken::new();

    // Sentinel listener on stdin for the lifetime of the process.
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    tokio::spawn(listener::listen_for_stop(stdin, cancel.clone()));

    // Ctrl-C behaves like the sentinel.
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        });
    }

    let monitor_config = monitor::MonitorConfig {
        wait_interval: Duration::from_secs(cli.interval_secs),
        max_attempts: cli.max_attempts,
    };

    tracing::info!(
        pipeline = %cli.pipeline,
        interval_secs = cli.interval_secs,
        max_attempts = cli.max_attempts,
        "starting pipeline monitoring"
    );

    let outcome = monitor::run(
        &provider,
        &cli.pipeline,
        &monitor_config,
        cancel,
        alert::default_sink(),
    )
    .await?;

    tracing::debug!(?outcome, "monitoring finished");
    Ok(())
}
