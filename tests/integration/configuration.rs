// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Sink configuration from JSON5 documents.

use log_relay::logging::sink::SinkKind;
use log_relay::logging::SinkConfigurator;
use log_relay::{Config, Level, LogError, LogHub};
use std::io::Write;

fn kinds(hub: &LogHub, logger: &str) -> Vec<SinkKind> {
    hub.bindings(logger).iter().map(|b| b.kind.clone()).collect()
}

#[test]
fn test_reconfigure_with_empty_section_removes_file_sink() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("x.log");
    let hub = LogHub::local();
    let logger = hub.logger("billing");

    let with_file = Config::parse(&format!(
        r#"{{ billing: {{ log_level: "INFO", log_file: "{}" }} }}"#,
        log_path.display()
    ))
    .unwrap();
    hub.configure(&with_file, "billing").unwrap();
    logger.info("before");

    let empty = Config::parse("{ billing: {} }").unwrap();
    hub.configure(&empty, "billing").unwrap();
    assert!(hub.bindings("billing").is_empty());
    logger.info("after");
    logger.error("after, louder");

    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains("<INFO>: before"));
    // The level set by the first section is kept.
    assert_eq!(logger.level(), Level::INFO);
}

#[test]
fn test_reconfiguring_twice_does_not_accumulate() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("app.log");
    let config = Config::parse(&format!(
        r#"{{
            application: {{ name: "Ledger" }},
            app: {{ log_stdout: true, log_file: "{}" }},
        }}"#,
        log_path.display()
    ))
    .unwrap();
    let hub = LogHub::local();
    let logger = hub.logger("app");
    logger.set_level("WARNING").unwrap();

    hub.configure(&config, "app").unwrap();
    let first = kinds(&hub, "app");
    hub.configure(&config, "app").unwrap();
    assert_eq!(kinds(&hub, "app"), first);

    logger.warning("once");
    let content = std::fs::read_to_string(&log_path).unwrap();
    assert_eq!(content.lines().count(), 1);
    assert!(content.contains(" Ledger:app["));
}

#[test]
fn test_configure_all_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = dir.path().join("relay.json5");
    let mut file = std::fs::File::create(&config_path).unwrap();
    writeln!(
        file,
        r#"{{
            // root logger
            application: {{ log_level: 20 }},
            "app.db": {{ log_level: " error ", log_server: "localhost", log_server_port: 5514 }},
        }}"#
    )
    .unwrap();
    drop(file);

    let config = Config::load_from_file(&config_path).unwrap();
    let hub = LogHub::local();
    let _db = hub.logger("app.db");
    SinkConfigurator::new()
        .with_syslog_sockets(vec![dir.path().join("no-syslog-here")])
        .configure_all(&hub, &config)
        .unwrap();

    assert_eq!(hub.logger("").level(), Level::INFO);
    assert_eq!(hub.logger("app.db").level(), Level::ERROR);
    assert_eq!(kinds(&hub, "app.db").len(), 1);
    assert!(matches!(
        &kinds(&hub, "app.db")[0],
        SinkKind::Syslog(target) if target.to_string() == "localhost:5514"
    ));
}

#[test]
fn test_invalid_level_reports_logger_name() {
    let config = Config::parse(r#"{ "app.cache": { log_level: "VERBOSE" } }"#).unwrap();
    let hub = LogHub::local();
    let err = hub.configure(&config, "app.cache").unwrap_err();

    assert!(matches!(err, LogError::InvalidLevel { .. }));
    assert_eq!(
        err.to_string(),
        "Invalid logging level 'VERBOSE' for logger 'app.cache'"
    );
}

#[test]
fn test_bad_boolean_is_config_error() {
    let config = Config::parse(r#"{ app: { log_stdout: "maybe" } }"#).unwrap();
    let hub = LogHub::local();
    let err = hub.configure(&config, "app").unwrap_err();
    assert!(matches!(err, LogError::Config(_)));
}

#[test]
fn test_reconfigure_under_concurrent_emits() {
    let dir = tempfile::tempdir().unwrap();
    let paths = [dir.path().join("a.log"), dir.path().join("b.log")];
    let configs: Vec<Config> = paths
        .iter()
        .map(|path| {
            Config::from_pairs([
                ("app", "log_level", "INFO"),
                ("app", "log_file", path.to_str().unwrap()),
            ])
        })
        .collect();
    let hub = LogHub::local();
    hub.clear_bindings("");
    hub.configure(&configs[0], "app").unwrap();

    let emitters: Vec<_> = (0..4)
        .map(|t| {
            let logger = hub.logger("app");
            std::thread::spawn(move || {
                for seq in 0..100 {
                    logger.info(&format!("record t{}-{}", t, seq));
                }
            })
        })
        .collect();
    for round in 0..50 {
        hub.configure(&configs[round % 2], "app").unwrap();
    }
    for emitter in emitters {
        emitter.join().unwrap();
    }

    let mut messages: Vec<String> = paths
        .iter()
        .filter(|path| path.exists())
        .flat_map(|path| {
            std::fs::read_to_string(path)
                .unwrap()
                .lines()
                .map(|line| line.rsplit(": ").next().unwrap().to_string())
                .collect::<Vec<_>>()
        })
        .collect();
    messages.sort();
    let mut expected: Vec<String> = (0..4)
        .flat_map(|t| (0..100).map(move |seq| format!("record t{}-{}", t, seq)))
        .collect();
    expected.sort();
    assert_eq!(messages, expected);
}
