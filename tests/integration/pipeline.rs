// SPDX-License-Identifier: Apache-2.0 OR MIT
//! End-to-end pipeline tests: loggers in worker threads forward through the
//! transport to a collector that writes to in-memory sinks.

use crate::common::{capture_hub, correlation_of};
use log_relay::logging::context::{scope, RequestContext, ThreadContext};
use log_relay::logging::{CollectorLogging, StopReason, WorkerLogging};
use log_relay::{get_logger, EmitOptions, Level, LogHub, Severity};
use std::os::unix::net::UnixDatagram;
use std::sync::Arc;
use std::time::Duration;

fn run_worker<F>(logging: &CollectorLogging, name: &'static str, body: F)
where
    F: FnOnce(&WorkerLogging) + Send + 'static,
{
    let producer = logging.producer().unwrap();
    std::thread::spawn(move || {
        let worker = WorkerLogging::new(name, Some(producer)).unwrap();
        body(&worker);
    })
    .join()
    .unwrap();
}

#[test]
fn test_long_message_arrives_as_correlated_chunks() {
    let (hub, sink, _) = capture_hub();
    let logging = CollectorLogging::start_with_hub(hub, None).unwrap();

    run_worker(&logging, "jobs", |worker| {
        worker.hub().gate().set("", Level::INFO);
        worker.logger().info(&"a".repeat(650));
    });
    let stats = logging.shutdown().unwrap();
    assert_eq!(stats.delivered, 3);

    let lines = sink.lines();
    assert_eq!(lines.len(), 3);
    let id = correlation_of(&lines[0]).unwrap().to_string();
    assert_eq!(id.len(), 6);
    assert!(id.chars().all(|c| c.is_ascii_alphanumeric()));

    let chunks: Vec<&str> = lines
        .iter()
        .map(|line| {
            assert_eq!(correlation_of(line), Some(id.as_str()));
            line.rsplit(' ').next().unwrap()
        })
        .collect();
    assert_eq!(
        chunks.iter().map(|c| c.len()).collect::<Vec<_>>(),
        vec![300, 300, 50]
    );
    assert!(lines[0].contains(" #1 "));
    assert!(lines[2].contains(" #3 "));
}

#[test]
fn test_gated_severity_writes_nothing() {
    let (hub, sink, _) = capture_hub();
    let logging = CollectorLogging::start_with_hub(hub, None).unwrap();

    run_worker(&logging, "jobs", |worker| {
        worker.logger().set_level("ERROR").unwrap();
        worker.logger().info("invisible");
        worker.logger().warning("also invisible");
    });
    let stats = logging.shutdown().unwrap();

    assert_eq!(stats.delivered, 0);
    assert!(sink.lines().is_empty());
}

#[test]
fn test_malformed_frames_are_skipped_and_reported() {
    let (hub, sink, fallback) = capture_hub();
    let logging = CollectorLogging::start_with_hub(hub, None).unwrap();

    let raw = UnixDatagram::from(logging.share_with_child().unwrap());
    raw.send(b"not a frame").unwrap();
    run_worker(&logging, "jobs", |worker| worker.logger().error("first"));
    raw.send(b"\x00\x00\x00\x00\x00\x00\x00\x04null").unwrap();
    run_worker(&logging, "jobs", |worker| worker.logger().error("second"));

    let stats = logging.shutdown().unwrap();
    assert_eq!(stats.reason, StopReason::Sentinel);
    assert_eq!(stats.rejected, 2);

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[0].ends_with("<ERROR>: first"));
    assert!(lines[1].ends_with("<ERROR>: second"));

    let reports = fallback.lines();
    assert_eq!(reports.len(), 2, "{reports:?}");
    assert!(reports.iter().all(|r| r.starts_with("log-relay: ")));
}

#[test]
fn test_per_worker_order_is_preserved() {
    let (hub, sink, _) = capture_hub();
    let logging = CollectorLogging::start_with_hub(hub, None).unwrap();

    let handles: Vec<_> = ["alpha", "beta", "gamma"]
        .into_iter()
        .map(|name| {
            let producer = logging.producer().unwrap();
            std::thread::spawn(move || {
                let worker = WorkerLogging::new(name, Some(producer)).unwrap();
                for seq in 0..50 {
                    worker.logger().error(&format!("seq {}", seq));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logging.shutdown().unwrap();

    let lines = sink.lines();
    assert_eq!(lines.len(), 150);
    for name in ["alpha", "beta", "gamma"] {
        let seqs: Vec<u32> = lines
            .iter()
            .filter(|l| l.starts_with(&format!("{}[", name)))
            .map(|l| l.rsplit(' ').next().unwrap().parse().unwrap())
            .collect();
        assert_eq!(seqs, (0..50).collect::<Vec<_>>());
    }
}

#[test]
fn test_prepend_append_and_duration_on_one_line() {
    let (hub, sink, _) = capture_hub();
    let logger = hub.logger("api");
    logger.log(
        Severity::Critical,
        "  request served  ",
        &EmitOptions::new()
            .prepend("GET /orders")
            .append("status=200")
            .duration(Duration::from_millis(1250))
            .correlation_id("ReQ001"),
    );

    let lines = sink.lines();
    assert_eq!(lines.len(), 1);
    assert!(lines[0].ends_with(
        "<CRITICAL>: (ReQ001) GET /orders request served (DURATION: 1.250s) status=200"
    ));
}

#[test]
fn test_request_context_only_on_single_lines() {
    let (hub, sink, _) = capture_hub();
    hub.set_context_provider(Arc::new(ThreadContext));
    let logger = hub.logger("api");

    let context = RequestContext::new()
        .with_item("USER", "alice")
        .with_request_id("r-1");
    scope(context, || {
        logger.error("single");
        logger.error("first\nsecond");
    });
    logger.error("outside");

    let lines = sink.lines();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].ends_with("single (USER: alice) (REQUEST-ID: r-1)"));
    assert!(!lines[1].contains("REQUEST-ID"));
    assert!(!lines[2].contains("REQUEST-ID"));
    assert!(lines[3].ends_with("<ERROR>: outside"));
}

#[test]
fn test_level_inheritance_across_hierarchy() {
    let hub = LogHub::local();
    hub.logger("app").set_level("debug").unwrap();
    hub.logger("app.db.pool").set_level("CRITICAL").unwrap();

    assert_eq!(hub.logger("app.db").level(), Level::DEBUG);
    assert_eq!(hub.logger("app.db.pool.conn").level(), Level::CRITICAL);
    assert_eq!(hub.logger("other").level(), Level::WARNING);
    assert!(hub.logger("app.web").is_enabled(Severity::Debug));
}

#[test]
fn test_global_registry_returns_same_logger() {
    let a = get_logger("registry.test");
    let b = get_logger("registry.test");
    assert!(a.same_as(&b));
    assert!(Arc::ptr_eq(a.hub(), b.hub()));
}
