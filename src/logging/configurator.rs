// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Attach sinks and levels to loggers from configuration sections.
//!
//! The root logger reads the `application` section; every other logger
//! reads the section carrying its own dotted name. Reconfiguring replaces
//! a logger's bindings as a whole: concurrent emits see either the old set
//! or the new one.

use super::gate::{parse_level, ROOT_LOGGER};
use super::logger::{default_root_binding, LogHub};
use super::sink::{
    ContextFilter, FileSink, Layout, SinkBinding, SinkKind, StdoutSink, SyslogSink, SyslogTarget,
    LOCAL_SYSLOG_SOCKETS,
};
use super::Level;
use crate::config::{ConfigSource, LogSection, APPLICATION_SECTION};
use crate::error::{file_sink_error, LogError};
use std::path::PathBuf;
use std::sync::Arc;

/// Builds sink bindings from configuration
#[derive(Debug, Clone)]
pub struct SinkConfigurator {
    syslog_sockets: Vec<PathBuf>,
}

impl Default for SinkConfigurator {
    fn default() -> Self {
        Self {
            syslog_sockets: LOCAL_SYSLOG_SOCKETS.iter().map(PathBuf::from).collect(),
        }
    }
}

/// Section that configures `logger`
pub fn section_for(logger: &str) -> &str {
    if logger == ROOT_LOGGER {
        APPLICATION_SECTION
    } else {
        logger
    }
}

impl SinkConfigurator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use these paths instead of the well-known local syslog sockets
    pub fn with_syslog_sockets(mut self, sockets: Vec<PathBuf>) -> Self {
        self.syslog_sockets = sockets;
        self
    }

    /// (Re)configure one logger from its section
    ///
    /// Nothing changes if the level is invalid or a sink cannot be opened.
    pub fn configure(
        &self,
        hub: &LogHub,
        source: &dyn ConfigSource,
        logger: &str,
    ) -> Result<(), LogError> {
        let section = LogSection::from_source(source, section_for(logger))?;
        let is_root = logger == ROOT_LOGGER;

        let Some(section) = section else {
            if is_root {
                // Never leave the process without output.
                hub.replace_bindings(logger, vec![default_root_binding()]);
            } else {
                hub.clear_bindings(logger);
            }
            return Ok(());
        };

        let level = match section.log_level.as_deref() {
            Some(value) => Some(parse_level(logger, value)?),
            None if is_root => Some(Level::WARNING),
            None => None,
        };

        let app_name = application_name(source)?;
        let bindings = self.build_bindings(&section, logger, ContextFilter::new(app_name))?;

        if let Some(level) = level {
            hub.gate().set(logger, level);
        }
        hub.replace_bindings(logger, bindings);
        Ok(())
    }

    /// Bindings described by `section`, in stdout, syslog, file order
    pub fn build_bindings(
        &self,
        section: &LogSection,
        logger: &str,
        filter: ContextFilter,
    ) -> Result<Vec<SinkBinding>, LogError> {
        let mut bindings = Vec::new();

        if section.log_stdout {
            bindings.push(SinkBinding::new(
                SinkKind::Stdout,
                Layout::Verbose,
                filter.clone(),
                Arc::new(StdoutSink),
            ));
        }

        if let Some(host) = section.log_server.as_deref() {
            let target = SyslogTarget::resolve_with(host, section.log_server_port, &self.syslog_sockets);
            let sink = SyslogSink::connect(target.clone()).map_err(|source| LogError::SinkOpen {
                logger: logger.to_string(),
                target: format!("syslog {}", target),
                source,
            })?;
            bindings.push(SinkBinding::new(
                SinkKind::Syslog(target),
                Layout::Verbose,
                filter.clone(),
                Arc::new(sink),
            ));
        }

        if let Some(path) = section.log_file.as_deref() {
            let sink = FileSink::open(path).map_err(|e| file_sink_error(logger, path, e))?;
            bindings.push(SinkBinding::new(
                SinkKind::File(path.to_path_buf()),
                Layout::Verbose,
                filter,
                Arc::new(sink),
            ));
        }

        Ok(bindings)
    }

    /// Configure the root, then every logger the hub knows about
    pub fn configure_all(&self, hub: &LogHub, source: &dyn ConfigSource) -> Result<(), LogError> {
        self.configure(hub, source, ROOT_LOGGER)?;
        for name in hub.logger_names() {
            if name != ROOT_LOGGER {
                self.configure(hub, source, &name)?;
            }
        }
        Ok(())
    }

    /// Apply only the `log_level` keys of the root and every known logger
    ///
    /// For forwarding hubs, whose records are written by the collector.
    pub fn configure_levels(&self, hub: &LogHub, source: &dyn ConfigSource) -> Result<(), LogError> {
        let mut names = hub.logger_names();
        names.retain(|name| name != ROOT_LOGGER);
        names.insert(0, ROOT_LOGGER.to_string());

        let mut levels = Vec::with_capacity(names.len());
        for name in names {
            let section = LogSection::from_source(source, section_for(&name))?;
            let level = match section.and_then(|s| s.log_level) {
                Some(value) => parse_level(&name, &value)?,
                None if name == ROOT_LOGGER => Level::WARNING,
                None => continue,
            };
            levels.push((name, level));
        }

        for (name, level) in levels {
            hub.gate().set(&name, level);
        }
        Ok(())
    }
}

fn application_name(source: &dyn ConfigSource) -> Result<Option<String>, LogError> {
    Ok(LogSection::from_source(source, APPLICATION_SECTION)?.and_then(|s| s.name))
}

impl LogHub {
    /// Configure one logger with the default syslog socket locations
    pub fn configure(&self, source: &dyn ConfigSource, logger: &str) -> Result<(), LogError> {
        SinkConfigurator::default().configure(self, source, logger)
    }

    /// Configure the root and every known logger
    pub fn configure_all(&self, source: &dyn ConfigSource) -> Result<(), LogError> {
        SinkConfigurator::default().configure_all(self, source)
    }
}
