// SPDX-License-Identifier: Apache-2.0 OR MIT
// Worker process: emits records through the inherited transport

use anyhow::{Context, Result};
use std::path::PathBuf;

use crate::config::Config;
use crate::logging::{EmitOptions, Severity, WorkerLogging};
use crate::log_warning;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub name: String,
    pub messages: usize,
    pub config_path: Option<PathBuf>,
}

/// Emit `messages` records and report how many were dropped
pub fn run(config: WorkerConfig) -> Result<u64> {
    let logging = WorkerLogging::from_env(&config.name)
        .context("Worker started without a usable log transport")?;
    if let Some(path) = &config.config_path {
        let source = Config::load_from_file(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
        logging
            .configure_levels(&source)
            .context("Invalid log levels in configuration")?;
    }
    logging.install_global();

    let log = logging.logger();
    let pid = std::process::id();
    for seq in 1..=config.messages {
        log_warning!(log, "message {} of {} from pid {}", seq, config.messages, pid);
    }
    log.log(
        Severity::Warning,
        &format!("{} finished", config.name),
        &EmitOptions::new().append(format!("({} messages)", config.messages)),
    );

    let dropped = logging.dropped();
    if dropped > 0 {
        logging
            .hub()
            .report(format_args!("{} records dropped on a full transport", dropped));
    }
    Ok(dropped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_without_transport_fails() {
        // The test harness never exports the transport descriptor.
        if std::env::var_os(crate::logging::transport::TRANSPORT_FD_ENV).is_some() {
            return;
        }
        let err = run(WorkerConfig {
            name: "w".into(),
            messages: 1,
            config_path: None,
        })
        .unwrap_err();
        assert!(format!("{:#}", err).contains("no transport endpoint"));
    }
}
