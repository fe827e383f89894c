use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use tridentd::config::Config;
use tridentd::session::stats::SessionStats;
use tridentd::session::Session;
use tridentd::sink::{Dispatch, Output};

/// Trident measurement stream collector.
#[derive(Parser)]
#[command(name = "tridentd", about)]
struct Cli {
    /// Path to the YAML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Logging verbosity level (trace, debug, info, warn, error).
    /// Overrides `log_level` from the configuration file.
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Print version information and exit.
    Version,
}

/// Build-time version info.
mod version {
    /// Release version string (set at build time).
    pub const RELEASE: &str = env!("CARGO_PKG_VERSION");

    /// Git commit hash (set at build time via env, or "unknown").
    pub fn git_commit() -> &'static str {
        option_env!("GIT_COMMIT").unwrap_or("unknown")
    }

    /// Full version string with platform info.
    pub fn full() -> String {
        format!(
            "{} (commit: {}, {}/{})",
            RELEASE,
            git_commit(),
            std::env::consts::OS,
            std::env::consts::ARCH,
        )
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if let Some(Command::Version) = &cli.command {
        println!("tridentd {}", version::full());
        return Ok(());
    }

    let cfg = match &cli.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => Config::default(),
    };

    let log_level = cli.log_level.as_deref().unwrap_or(&cfg.log_level);
    let filter = EnvFilter::try_new(log_level)
        .with_context(|| format!("invalid log level: {log_level}"))?;

    // Samples go to stdout, so logs must not.
    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let host = resolve_hostname(&cfg.hostname)?;

    info!(
        version = version::RELEASE,
        commit = version::git_commit(),
        fifo = %cfg.stream.fifo.display(),
        headings = %cfg.stream.headings.display(),
        host = %host,
        "starting tridentd",
    );

    let rt = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("building tokio runtime")?;

    rt.block_on(async { run(cfg, host).await })
}

/// Host name used in sample identifiers: the configured one, else the OS's.
fn resolve_hostname(configured: &str) -> Result<String> {
    if !configured.is_empty() {
        return Ok(configured.to_string());
    }

    let name = hostname::get().context("resolving hostname")?;

    Ok(name.to_string_lossy().into_owned())
}

async fn run(cfg: Config, host: String) -> Result<()> {
    let cancel = CancellationToken::new();
    spawn_signal_handler(cancel.clone());

    let mut session = Session::new(cfg.stream.clone());
    session.init();
    let stats = session.stats();

    let mut output = Output::new(
        cfg.output.format,
        host,
        BufWriter::new(std::io::stdout()),
    );

    let mut poll = tokio::time::interval(cfg.poll_interval);
    poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let stats_enabled = !cfg.stats_interval.is_zero();
    let stats_period = if stats_enabled {
        cfg.stats_interval
    } else {
        Duration::from_secs(3600)
    };
    let mut stats_ticker =
        tokio::time::interval_at(tokio::time::Instant::now() + stats_period, stats_period);
    stats_ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = poll.tick() => {
                match session.read(&mut output) {
                    Ok(outcome) => {
                        if outcome.samples > 0 || outcome.reset.is_some() {
                            debug!(
                                records = outcome.records,
                                samples = outcome.samples,
                                reset = ?outcome.reset,
                                "poll complete",
                            );
                        }
                    }
                    Err(e) => warn!(error = %e, "dispatching samples failed"),
                }

                if let Err(e) = output.flush() {
                    warn!(error = %e, "flushing output failed");
                }
            }
            _ = stats_ticker.tick(), if stats_enabled => {
                log_stats(&stats, stats_period);
            }
        }
    }

    session.shutdown();
    output.flush()?;

    info!("tridentd stopped");

    Ok(())
}

fn spawn_signal_handler(cancel: CancellationToken) {
    tokio::spawn(async move {
        let ctrl_c = tokio::signal::ctrl_c();
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    warn!(error = %e, "failed to register SIGTERM handler");
                    if ctrl_c.await.is_ok() {
                        info!("received SIGINT, shutting down");
                    }
                    cancel.cancel();
                    return;
                }
            };

        tokio::select! {
            _ = ctrl_c => {
                info!("received SIGINT, shutting down");
            }
            _ = sigterm.recv() => {
                info!("received SIGTERM, shutting down");
            }
        }

        cancel.cancel();
    });
}

fn log_stats(stats: &SessionStats, period: Duration) {
    let snapshot = stats.snapshot();
    if snapshot.is_empty() {
        return;
    }

    for (counter, count) in &snapshot {
        info!(
            counter = counter.as_str(),
            count,
            period_secs = period.as_secs(),
            "session stats",
        );
    }
}
