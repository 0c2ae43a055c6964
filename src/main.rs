use anyhow::Result;
use netperf::config::{AppConfig, OutputFormat};
use netperf::*;
use sysinfo::{Pid, ProcessesToUpdate, System};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::time::{Duration, MissedTickBehavior, interval};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Reads the target pid from the first stdin line; an empty line means this process.
async fn read_target_pid() -> Result<u32> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let line = lines.next_line().await?.unwrap_or_default();
    let line = line.trim();
    if line.is_empty() {
        return Ok(std::process::id());
    }
    line.parse::<u32>()
        .map_err(|e| anyhow::anyhow!("invalid process id {:?}: {}", line, e))
}

fn process_name(pid: u32) -> Option<String> {
    let pid = Pid::from_u32(pid);
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::Some(&[pid]), true);
    sys.process(pid)
        .map(|p| p.name().to_string_lossy().into_owned())
}

fn print_snapshot(output: OutputFormat, snapshot: &NetworkPerformanceSnapshot) -> Result<()> {
    match output {
        OutputFormat::Plain => println!("{}", snapshot.bytes_received_per_second),
        OutputFormat::Json => println!("{}", serde_json::to_string(snapshot)?),
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("{} starting", version::banner());
    let app_config = AppConfig::load()?;

    let target_pid = match app_config.host.target_pid {
        Some(pid) => pid,
        None => read_target_pid().await?,
    };
    match tokio::task::spawn_blocking(move || process_name(target_pid)).await? {
        Some(name) => tracing::info!(target_pid, process = %name, "monitoring process"),
        None => tracing::warn!(target_pid, "no running process with this id; rates will stay at zero"),
    }

    let reporter = ReporterBuilder::from_config(&app_config.reporter)
        .target_process_id(target_pid)
        .start()?;
    tracing::info!(session = reporter.session_name(), "reporter created");
    let mut status_rx = reporter.watch_status();

    let mut tick = interval(Duration::from_secs(app_config.host.poll_interval_secs));
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; the first read should cover a full interval.
    tick.tick().await;

    loop {
        tokio::select! {
            _ = tick.tick() => {
                let snapshot = reporter.read_and_reset()?;
                print_snapshot(app_config.host.output, &snapshot)?;
            }
            changed = status_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let status = status_rx.borrow_and_update().clone();
                match status {
                    ReporterStatus::Failed { reason } => {
                        tracing::error!(%reason, "network tracing failed; reporting zero throughput");
                    }
                    other => tracing::debug!(status = ?other, "reporter status changed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received shutdown signal");
                break;
            }
        }
    }

    reporter.close();
    Ok(())
}
