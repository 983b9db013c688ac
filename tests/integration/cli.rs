// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Integration tests for the log-relay binary.

use anyhow::Result;
use std::process::Command;

const BIN: &str = env!("CARGO_BIN_EXE_log-relay");

/// **Passing Test:** Records from worker processes reach the collector's file sink.
#[test]
fn test_collector_gathers_worker_processes() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let log_path = dir.path().join("relay.log");
    let config_path = dir.path().join("relay.json5");
    std::fs::write(
        &config_path,
        format!(
            r#"{{ application: {{ name: "Relay", log_level: "INFO", log_file: "{}" }} }}"#,
            log_path.display()
        ),
    )?;

    let output = Command::new(BIN)
        .arg("collector")
        .arg("--config")
        .arg(&config_path)
        .arg("--workers")
        .arg("2")
        .arg("--messages")
        .arg("3")
        .output()?;
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let content = std::fs::read_to_string(&log_path)?;
    let started = content
        .lines()
        .find(|l| l.contains(" Relay:log-relay.supervisor["))
        .expect("collector's own messages are logged");
    assert!(started.contains("<INFO>: Collector started; spawning 2 workers"));

    for worker in ["worker.0", "worker.1"] {
        let lines: Vec<&str> = content
            .lines()
            .filter(|l| l.contains(&format!(" Relay:{}[", worker)))
            .collect();
        assert_eq!(lines.len(), 4, "{content}");
        assert!(lines[0].contains("<WARNING>: message 1 of 3 from pid"));
        assert!(lines[3].ends_with(&format!("{} finished (3 messages)", worker)));
    }
    assert!(content.contains("8 records delivered, 0 rejected"), "{content}");
    Ok(())
}

/// **Passing Test:** A worker started by hand, without a transport, fails fast.
#[test]
fn test_worker_without_collector_fails() -> Result<()> {
    let output = Command::new(BIN)
        .env_remove("LOG_RELAY_TRANSPORT_FD")
        .arg("worker")
        .arg("--name")
        .arg("orphan")
        .output()?;

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("no transport endpoint"), "{stderr}");
    Ok(())
}

/// **Passing Test:** Without an `application` section the collector logs to stdout.
#[test]
fn test_collector_defaults_to_stdout() -> Result<()> {
    let output = Command::new(BIN)
        .arg("collector")
        .arg("--workers")
        .arg("1")
        .arg("--messages")
        .arg("2")
        .output()?;
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let worker_lines: Vec<&str> = stdout
        .lines()
        .filter(|l| l.starts_with("worker.0["))
        .collect();
    assert_eq!(worker_lines.len(), 3, "{stdout}");
    assert!(worker_lines[0].contains("<WARNING>: message 1 of 2"));
    Ok(())
}
