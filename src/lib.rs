// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Cross-process log aggregation.
//!
//! Worker processes emit records through level-gated [`Logger`]s; records
//! are formatted into bounded lines, carried over a socketpair transport
//! to a single collector and fanned out to stdout, syslog and file sinks
//! configured per logger name.
//!
//! Delivery is at most once. A record that cannot be written (full
//! transport, failing sink) is dropped and reported on the fallback
//! stream, never returned to the caller.

pub mod config;
pub mod error;
pub mod logging;
pub mod supervisor;
pub mod worker;

pub use config::{Config, ConfigSource};
pub use error::{LogError, TransportError};
pub use logging::{get_logger, EmitOptions, Level, LogHub, Logger, Severity};
