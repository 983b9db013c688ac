// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Process integration helpers.
//!
//! The primary process owns a [`CollectorLogging`]: a local-dispatch hub,
//! the transport pair and the collector thread. Worker processes build a
//! [`WorkerLogging`] around an inherited producer and forward every record
//! to the collector.

use crate::config::{CollectorSection, ConfigSource};
use crate::error::{LogError, TransportError};
use crate::logging::collector::{Collector, CollectorHandle, CollectorStats, PrivilegeDrop};
use crate::logging::configurator::SinkConfigurator;
use crate::logging::transport::{channel, Producer};
use crate::logging::{Dispatch, LogHub, Logger};
use std::os::fd::OwnedFd;
use std::sync::Arc;

/// Logging for the primary (collecting) process
pub struct CollectorLogging {
    hub: Arc<LogHub>,
    producer: Producer,
    collector: Option<CollectorHandle>,
}

impl CollectorLogging {
    /// Configure a fresh hub from `source` and start the collector
    ///
    /// Drops privileges if the `collector` section names a user.
    pub fn start(source: &dyn ConfigSource) -> Result<Self, LogError> {
        let hub = LogHub::local();
        hub.configure_all(source)?;
        let privileges = PrivilegeDrop::from_section(&CollectorSection::from_source(source));
        Self::start_with_hub(hub, privileges)
    }

    /// Start a collector feeding an already configured hub
    pub fn start_with_hub(
        hub: Arc<LogHub>,
        privileges: Option<PrivilegeDrop>,
    ) -> Result<Self, LogError> {
        let (producer, consumer) = channel()?;
        let collector = Collector::new(consumer, Arc::clone(&hub))
            .with_privilege_drop(privileges)
            .spawn()?;

        Ok(Self {
            hub,
            producer,
            collector: Some(collector),
        })
    }

    pub fn hub(&self) -> &Arc<LogHub> {
        &self.hub
    }

    /// Local logger in the collecting process
    pub fn logger(&self, name: &str) -> Logger {
        self.hub.logger(name)
    }

    /// Producer for a worker running in this process (e.g. a thread)
    pub fn producer(&self) -> Result<Producer, LogError> {
        Ok(self.producer.try_clone()?)
    }

    /// Descriptor to pass to a child process; see [`Producer::share_with_child`]
    pub fn share_with_child(&self) -> Result<OwnedFd, LogError> {
        Ok(self.producer.share_with_child()?)
    }

    pub fn is_running(&self) -> bool {
        self.collector.as_ref().is_some_and(CollectorHandle::is_running)
    }

    /// Send the sentinel and wait for the collector to drain
    pub fn shutdown(mut self) -> Result<CollectorStats, LogError> {
        let collector = self.collector.take().ok_or(LogError::CollectorPanicked)?;
        collector.shutdown(&self.producer)
    }
}

impl Drop for CollectorLogging {
    fn drop(&mut self) {
        if let Some(collector) = self.collector.take() {
            let _ = collector.shutdown(&self.producer);
        }
    }
}

/// Logging for a worker process that forwards to a collector
#[derive(Debug)]
pub struct WorkerLogging {
    hub: Arc<LogHub>,
    name: String,
}

impl WorkerLogging {
    /// Build a forwarding hub; fails fast without a producer
    pub fn new(name: &str, producer: Option<Producer>) -> Result<Self, LogError> {
        let producer = producer.ok_or_else(|| LogError::MissingQueueForWorker {
            logger: name.to_string(),
        })?;
        Ok(Self {
            hub: LogHub::forwarding(producer),
            name: name.to_string(),
        })
    }

    /// Adopt the producer a parent exported through the environment
    pub fn from_env(name: &str) -> Result<Self, LogError> {
        match Producer::from_env() {
            Ok(producer) => Self::new(name, Some(producer)),
            Err(TransportError::Descriptor(_)) => Self::new(name, None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn hub(&self) -> &Arc<LogHub> {
        &self.hub
    }

    /// The worker's own logger
    pub fn logger(&self) -> Logger {
        self.hub.logger(&self.name)
    }

    /// Apply configured levels; sinks live in the collector
    pub fn configure_levels(&self, source: &dyn ConfigSource) -> Result<(), LogError> {
        let _ = self.logger();
        SinkConfigurator::default().configure_levels(&self.hub, source)
    }

    /// Records dropped because the transport stayed full
    pub fn dropped(&self) -> u64 {
        match self.hub.dispatch_mode() {
            Dispatch::Forward(producer) => producer.dropped(),
            Dispatch::Local => 0,
        }
    }

    /// Make this hub the process-wide one used by [`crate::logging::get_logger`]
    pub fn install_global(&self) -> bool {
        LogHub::install_global(Arc::clone(&self.hub)).is_ok()
    }
}
