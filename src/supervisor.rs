// SPDX-License-Identifier: Apache-2.0 OR MIT
// Collector process: starts the collector, spawns workers sharing the transport

use anyhow::{Context, Result};
use std::os::fd::AsRawFd;
use std::path::{Path, PathBuf};
use tokio::process::{Child, Command};
use tokio::signal::unix::{signal, SignalKind};

use crate::config::Config;
use crate::logging::transport::TRANSPORT_FD_ENV;
use crate::logging::{CollectorLogging, CollectorStats, Logger};
use crate::{log_error, log_info, log_warning};

/// Logger used for the collector process's own messages
pub const SUPERVISOR_LOGGER: &str = "log-relay.supervisor";

#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    pub config_path: Option<PathBuf>,
    pub workers: usize,
    pub messages: usize,
}

fn load_config(path: Option<&Path>) -> Result<Config> {
    match path {
        Some(path) => Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display())),
        None => Ok(Config::default()),
    }
}

fn worker_name(index: usize) -> String {
    format!("worker.{}", index)
}

/// Spawn one `log-relay worker` child holding a copy of the producer
fn spawn_worker(
    logging: &CollectorLogging,
    program: &Path,
    name: &str,
    messages: usize,
    config_path: Option<&Path>,
) -> Result<Child> {
    // Cleared FD_CLOEXEC; our copy is closed again once the child has it.
    let shared_fd = logging
        .share_with_child()
        .context("Failed to share log transport with worker")?;

    let mut command = Command::new(program);
    command
        .arg("worker")
        .arg("--name")
        .arg(name)
        .arg("--messages")
        .arg(messages.to_string())
        .env(TRANSPORT_FD_ENV, shared_fd.as_raw_fd().to_string())
        .kill_on_drop(true);
    if let Some(path) = config_path {
        command.arg("--config").arg(path);
    }

    let child = command
        .spawn()
        .with_context(|| format!("Failed to spawn worker '{}'", name))?;
    drop(shared_fd);
    Ok(child)
}

async fn wait_for_workers(log: &Logger, children: Vec<(String, Child)>) -> Result<()> {
    for (name, mut child) in children {
        let status = child
            .wait()
            .await
            .with_context(|| format!("Failed to wait for worker '{}'", name))?;
        if status.success() {
            log_info!(log, "Worker '{}' finished", name);
        } else {
            log_error!(log, "Worker '{}' failed (status: {})", name, status);
        }
    }
    Ok(())
}

/// Run the collector until every worker exits or a signal arrives
pub async fn run(config: SupervisorConfig) -> Result<CollectorStats> {
    let source = load_config(config.config_path.as_deref())?;
    // Resolved up front: /proc/self/exe may be unreadable after a privilege drop.
    let program = std::env::current_exe().context("Failed to get current executable path")?;
    let logging = CollectorLogging::start(&source).context("Failed to start log collector")?;
    let log = logging.logger(SUPERVISOR_LOGGER);
    log_info!(log, "Collector started; spawning {} workers", config.workers);

    let mut children = Vec::with_capacity(config.workers);
    for index in 0..config.workers {
        let name = worker_name(index);
        let child = spawn_worker(
            &logging,
            &program,
            &name,
            config.messages,
            config.config_path.as_deref(),
        )?;
        children.push((name, child));
    }

    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to install SIGTERM handler")?;
    tokio::select! {
        result = wait_for_workers(&log, children) => result?,
        _ = tokio::signal::ctrl_c() => {
            log_warning!(log, "Interrupted; stopping workers");
        }
        _ = sigterm.recv() => {
            log_warning!(log, "Terminated; stopping workers");
        }
    }

    // Dropping the children above killed any that were still running.
    let stats = tokio::task::spawn_blocking(move || logging.shutdown())
        .await
        .context("Collector shutdown task failed")?
        .context("Collector did not shut down cleanly")?;
    log_info!(
        log,
        "Collector stopped ({:?}): {} records delivered, {} rejected",
        stats.reason,
        stats.delivered,
        stats.rejected
    );
    Ok(stats)
}
