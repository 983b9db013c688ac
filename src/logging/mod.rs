// SPDX-License-Identifier: Apache-2.0 OR MIT
// Cross-process logging pipeline
//
// caller -> Logger (gate) -> MessageFormatter -> LogHub dispatch
//   Local:   sinks of the logger and its ancestors
//   Forward: Producer -> transport -> Collector -> LogHub::deliver -> sinks

#[macro_use]
mod macros;

pub mod collector;
pub mod configurator;
pub mod context;
pub mod formatter;
mod gate;
pub mod integration;
mod logger;
mod record;
mod severity;
pub mod sink;
pub mod transport;

pub use collector::{Collector, CollectorHandle, CollectorStats, PrivilegeDrop, StopReason};
pub use configurator::SinkConfigurator;
pub use context::{ContextProvider, RequestContext};
pub use formatter::{EmitOptions, MessageFormatter};
pub use gate::{lineage, parent_name, SeverityGate, DEFAULT_ROOT_LEVEL, ROOT_LOGGER};
pub use integration::{CollectorLogging, WorkerLogging};
pub use logger::{get_logger, Dispatch, LogHub, Logger, FALLBACK_PREFIX};
pub use record::LogRecord;
pub use severity::{Level, Severity};
pub use sink::{Layout, LogSink, SinkBinding, SinkKind};
pub use transport::{Consumer, Producer};
