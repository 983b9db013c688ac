// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logger handles and the LogHub that owns levels, bindings and dispatch

use super::context::ContextProvider;
use super::formatter::{EmitOptions, MessageFormatter};
use super::gate::{lineage, SeverityGate, ROOT_LOGGER};
use super::record::LogRecord;
use super::sink::{display_name, ContextFilter, Layout, SinkBinding, SinkKind, StdoutSink};
use super::transport::Producer;
use super::{Level, Severity};
use crate::error::LogError;
use std::collections::HashMap;
use std::fmt::Display;
use std::io::Write;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// Prefix for every line written to the fallback stream
pub const FALLBACK_PREFIX: &str = "log-relay: ";

/// Where formatted records go
pub enum Dispatch {
    /// Deliver to the sinks bound in this process
    Local,
    /// Forward every record over the transport to a collector
    Forward(Producer),
}

impl std::fmt::Debug for Dispatch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Dispatch::Local => write!(f, "Local"),
            Dispatch::Forward(producer) => f.debug_tuple("Forward").field(producer).finish(),
        }
    }
}

static GLOBAL: OnceLock<Arc<LogHub>> = OnceLock::new();

/// Process-wide logging state
///
/// Holds the severity gate, the sink bindings per logger name, the message
/// formatter and the registry of logger handles. Records are delivered
/// at most once: nothing is retried when a sink or the transport fails.
pub struct LogHub {
    gate: SeverityGate,
    formatter: RwLock<Arc<MessageFormatter>>,
    bindings: RwLock<HashMap<String, Arc<Vec<SinkBinding>>>>,
    dispatch: Dispatch,
    fallback: Mutex<Box<dyn Write + Send>>,
    loggers: Mutex<HashMap<String, Arc<str>>>,
}

/// Binding the root starts with, and falls back to when unconfigured
pub fn default_root_binding() -> SinkBinding {
    SinkBinding::new(
        SinkKind::Stdout,
        Layout::Simple,
        ContextFilter::default(),
        Arc::new(StdoutSink),
    )
}

impl LogHub {
    /// A local hub starts with [`default_root_binding`] on the root so an
    /// unconfigured process still writes somewhere; a forwarding hub has
    /// no bindings.
    pub fn new(dispatch: Dispatch) -> Self {
        let mut bindings = HashMap::new();
        if matches!(dispatch, Dispatch::Local) {
            bindings.insert(ROOT_LOGGER.to_string(), Arc::new(vec![default_root_binding()]));
        }
        Self {
            gate: SeverityGate::new(),
            formatter: RwLock::new(Arc::new(MessageFormatter::default())),
            bindings: RwLock::new(bindings),
            dispatch,
            fallback: Mutex::new(Box::new(std::io::stderr())),
            loggers: Mutex::new(HashMap::new()),
        }
    }

    /// Hub delivering to local sinks
    pub fn local() -> Arc<Self> {
        Arc::new(Self::new(Dispatch::Local))
    }

    /// Hub forwarding every record through `producer`
    pub fn forwarding(producer: Producer) -> Arc<Self> {
        Arc::new(Self::new(Dispatch::Forward(producer)))
    }

    /// The process-wide hub, created in local mode on first use
    pub fn global() -> Arc<Self> {
        Arc::clone(GLOBAL.get_or_init(Self::local))
    }

    /// Install `hub` as the process-wide hub
    ///
    /// Fails (returning the hub back) if one is already in place.
    pub fn install_global(hub: Arc<Self>) -> Result<(), Arc<Self>> {
        GLOBAL.set(hub)
    }

    /// Logger handle for `name`; the same name always shares one state
    pub fn logger(self: &Arc<Self>, name: &str) -> Logger {
        let mut loggers = self.loggers.lock().unwrap_or_else(|e| e.into_inner());
        let name = loggers
            .entry(name.to_string())
            .or_insert_with(|| Arc::from(name))
            .clone();
        Logger {
            name,
            hub: Arc::clone(self),
        }
    }

    /// The root logger
    pub fn root(self: &Arc<Self>) -> Logger {
        self.logger(ROOT_LOGGER)
    }

    /// Names of every logger handed out so far, sorted
    pub fn logger_names(&self) -> Vec<String> {
        let loggers = self.loggers.lock().unwrap_or_else(|e| e.into_inner());
        let mut names: Vec<String> = loggers.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn gate(&self) -> &SeverityGate {
        &self.gate
    }

    pub fn dispatch_mode(&self) -> &Dispatch {
        &self.dispatch
    }

    pub fn set_formatter(&self, formatter: MessageFormatter) {
        *self.formatter.write().unwrap_or_else(|e| e.into_inner()) = Arc::new(formatter);
    }

    /// Use `provider` for request context on single-line messages
    pub fn set_context_provider(&self, provider: Arc<dyn ContextProvider>) {
        self.set_formatter(MessageFormatter::new(provider));
    }

    /// Replace the fallback error stream (stderr by default)
    pub fn set_fallback(&self, writer: Box<dyn Write + Send>) {
        *self.fallback.lock().unwrap_or_else(|e| e.into_inner()) = writer;
    }

    /// Write one line to the fallback stream, ignoring failures
    pub fn report(&self, message: impl Display) {
        let mut fallback = self.fallback.lock().unwrap_or_else(|e| e.into_inner());
        let _ = writeln!(fallback, "{}{}", FALLBACK_PREFIX, message);
        let _ = fallback.flush();
    }

    /// Current bindings of `logger` (a consistent snapshot)
    pub fn bindings(&self, logger: &str) -> Arc<Vec<SinkBinding>> {
        let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
        bindings.get(logger).cloned().unwrap_or_default()
    }

    /// Swap in a complete new binding set for `logger`
    pub fn replace_bindings(&self, logger: &str, new: Vec<SinkBinding>) {
        let mut bindings = self.bindings.write().unwrap_or_else(|e| e.into_inner());
        if new.is_empty() {
            bindings.remove(logger);
        } else {
            bindings.insert(logger.to_string(), Arc::new(new));
        }
    }

    /// Add one binding, keeping the existing ones
    pub fn add_binding(&self, logger: &str, binding: SinkBinding) {
        let mut bindings = self.bindings.write().unwrap_or_else(|e| e.into_inner());
        let current = bindings.entry(logger.to_string()).or_default();
        let mut next = current.as_ref().clone();
        next.push(binding);
        *current = Arc::new(next);
    }

    pub fn clear_bindings(&self, logger: &str) {
        self.replace_bindings(logger, Vec::new());
    }

    /// Format and dispatch one message; the caller has already passed the gate
    fn emit(&self, logger: &str, severity: Severity, message: &str, options: &EmitOptions) {
        let formatter = Arc::clone(&self.formatter.read().unwrap_or_else(|e| e.into_inner()));
        for line in formatter.format(message, options) {
            self.dispatch(&LogRecord::new(logger, severity, line));
        }
    }

    /// Route a record according to the hub's dispatch mode
    pub fn dispatch(&self, record: &LogRecord) {
        match &self.dispatch {
            Dispatch::Local => self.deliver(record),
            Dispatch::Forward(producer) => {
                if let Err(e) = producer.send(record) {
                    self.report(format_args!(
                        "dropped record for logger '{}': {}",
                        display_name(&record.logger_name),
                        e
                    ));
                }
            }
        }
    }

    /// Deliver a record to the local sinks of its logger and its ancestors
    ///
    /// No level check happens here.
    pub fn deliver(&self, record: &LogRecord) {
        for (depth, name) in lineage(&record.logger_name).enumerate() {
            let bindings = self.bindings(name);
            for binding in bindings.iter() {
                if depth > 0 && !binding.propagate {
                    continue;
                }
                if let Err(e) = binding.deliver(record) {
                    self.report(format_args!(
                        "{} sink of logger '{}' failed: {}",
                        binding.kind,
                        display_name(name),
                        e
                    ));
                }
            }
        }
    }

    /// Flush every bound sink
    pub fn flush(&self) {
        let snapshot: Vec<Arc<Vec<SinkBinding>>> = {
            let bindings = self.bindings.read().unwrap_or_else(|e| e.into_inner());
            bindings.values().cloned().collect()
        };
        for binding in snapshot.iter().flat_map(|b| b.iter()) {
            if let Err(e) = binding.flush() {
                self.report(format_args!("{} sink flush failed: {}", binding.kind, e));
            }
        }
    }
}

impl std::fmt::Debug for LogHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogHub")
            .field("dispatch", &self.dispatch)
            .field("loggers", &self.logger_names())
            .finish()
    }
}

/// Logger handle from the process-wide hub
pub fn get_logger(name: &str) -> Logger {
    LogHub::global().logger(name)
}

/// Named logger handle
///
/// Cheap to clone. Every emit method checks the severity gate before any
/// formatting happens and never returns an error.
#[derive(Clone)]
pub struct Logger {
    name: Arc<str>,
    hub: Arc<LogHub>,
}

impl Logger {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hub(&self) -> &Arc<LogHub> {
        &self.hub
    }

    /// Whether both handles refer to the same registered logger
    pub fn same_as(&self, other: &Logger) -> bool {
        Arc::ptr_eq(&self.name, &other.name)
    }

    /// Effective level after inheritance
    pub fn level(&self) -> Level {
        self.hub.gate.effective_level(&self.name)
    }

    /// Set the level from a severity name or numeric rank
    pub fn set_level(&self, value: &str) -> Result<Level, LogError> {
        self.hub.gate.set_level(&self.name, value)
    }

    #[inline]
    pub fn is_enabled(&self, severity: Severity) -> bool {
        self.hub.gate.allowed(&self.name, severity)
    }

    /// Emit with decorations
    pub fn log(&self, severity: Severity, message: &str, options: &EmitOptions) {
        if !self.is_enabled(severity) {
            return;
        }
        self.hub.emit(&self.name, severity, message, options);
    }

    #[inline]
    pub fn critical(&self, message: &str) {
        self.log(Severity::Critical, message, &EmitOptions::default());
    }

    #[inline]
    pub fn error(&self, message: &str) {
        self.log(Severity::Error, message, &EmitOptions::default());
    }

    #[inline]
    pub fn warning(&self, message: &str) {
        self.log(Severity::Warning, message, &EmitOptions::default());
    }

    #[inline]
    pub fn info(&self, message: &str) {
        self.log(Severity::Info, message, &EmitOptions::default());
    }

    #[inline]
    pub fn debug(&self, message: &str) {
        self.log(Severity::Debug, message, &EmitOptions::default());
    }
}

impl std::fmt::Debug for Logger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Logger")
            .field("name", &display_name(&self.name))
            .field("level", &self.level())
            .finish()
    }
}
