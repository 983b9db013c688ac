// SPDX-License-Identifier: Apache-2.0 OR MIT
// Log record: one rendered line plus its origin

use super::Severity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One unit of log output
///
/// Created at emit time (one per formatted line), then consumed once by
/// either the local sinks or the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogRecord {
    pub logger_name: String,
    pub severity: Severity,
    pub message: String,
    pub process_id: u32,
    pub thread_name: String,
    pub timestamp: DateTime<Utc>,
}

impl LogRecord {
    /// Create a record stamped with the current process, thread and time
    pub fn new(logger_name: &str, severity: Severity, message: impl Into<String>) -> Self {
        Self {
            logger_name: logger_name.to_string(),
            severity,
            message: message.into(),
            process_id: std::process::id(),
            thread_name: current_thread_name(),
            timestamp: Utc::now(),
        }
    }
}

/// Name of the calling thread, falling back to its id for unnamed threads
fn current_thread_name() -> String {
    let thread = std::thread::current();
    match thread.name() {
        Some(name) => name.to_string(),
        None => format!("{:?}", thread.id()),
    }
}
