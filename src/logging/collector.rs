// SPDX-License-Identifier: Apache-2.0 OR MIT
// Collector: drains the transport into the local sinks

use super::logger::LogHub;
use super::transport::{Consumer, Producer, Received};
use crate::config::CollectorSection;
use crate::error::LogError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread::JoinHandle;

/// Name of the collector thread
pub const COLLECTOR_THREAD_NAME: &str = "log-collector";

/// Identity the collector switches to before receiving
///
/// `setuid`/`setgid` apply to the whole process, not only the collector
/// thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrivilegeDrop {
    pub user: String,
    pub group: Option<String>,
}

impl PrivilegeDrop {
    pub fn new(user: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            group: None,
        }
    }

    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.group = Some(group.into());
        self
    }

    /// Drop described by the `collector` section, if it names a user
    pub fn from_section(section: &CollectorSection) -> Option<Self> {
        let user = section.user.clone()?;
        Some(Self {
            user,
            group: section.group.clone(),
        })
    }

    pub fn apply(&self) -> Result<(), LogError> {
        let mut request = privdrop::PrivDrop::default().user(&self.user);
        if let Some(group) = &self.group {
            request = request.group(group);
        }
        request
            .fallback_to_ids_if_names_are_numeric()
            .apply()
            .map_err(|e| {
                LogError::PrivilegeDrop(format!(
                    "{} (user '{}', group '{}')",
                    e,
                    self.user,
                    self.group.as_deref().unwrap_or("<primary>")
                ))
            })
    }
}

/// Why the receive loop ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// Shutdown sentinel received
    Sentinel,
    /// Running flag cleared
    Cancelled,
    /// Every producer closed its end
    Closed,
    /// Unrecoverable transport failure
    TransportBroken,
}

/// Summary returned when the collector finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorStats {
    pub delivered: u64,
    pub rejected: u64,
    pub reason: StopReason,
}

/// Single consumer of the transport
///
/// Each received record is delivered through the hub's sinks exactly as a
/// local emit would be, without re-checking levels. Bad records are
/// reported on the hub's fallback stream and skipped; a broken transport
/// is reported once and ends the loop.
pub struct Collector {
    consumer: Consumer,
    hub: Arc<LogHub>,
    privileges: Option<PrivilegeDrop>,
    running: Arc<AtomicBool>,
}

impl Collector {
    pub fn new(consumer: Consumer, hub: Arc<LogHub>) -> Self {
        Self {
            consumer,
            hub,
            privileges: None,
            running: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn with_privilege_drop(mut self, privileges: Option<PrivilegeDrop>) -> Self {
        self.privileges = privileges;
        self
    }

    /// Clear the returned flag to stop the loop within one poll interval
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Drop privileges, then receive on the calling thread until stopped
    pub fn run(self) -> Result<CollectorStats, LogError> {
        if let Some(privileges) = &self.privileges {
            privileges.apply()?;
        }
        Ok(self.receive_loop())
    }

    /// Run on a dedicated thread
    ///
    /// Returns only after the privilege drop has been attempted; if it
    /// failed the thread has already exited and the error is returned.
    pub fn spawn(self) -> Result<CollectorHandle, LogError> {
        let running = Arc::clone(&self.running);
        let (startup_tx, startup_rx) = mpsc::channel::<Result<(), LogError>>();

        let thread = std::thread::Builder::new()
            .name(COLLECTOR_THREAD_NAME.to_string())
            .spawn(move || {
                if let Some(privileges) = &self.privileges {
                    if let Err(e) = privileges.apply() {
                        self.hub.report(&e);
                        let _ = startup_tx.send(Err(e));
                        return None;
                    }
                }
                let _ = startup_tx.send(Ok(()));
                Some(self.receive_loop())
            })
            .map_err(LogError::CollectorSpawn)?;

        match startup_rx.recv() {
            Ok(Ok(())) => Ok(CollectorHandle {
                running,
                thread: Some(thread),
            }),
            Ok(Err(e)) => {
                let _ = thread.join();
                Err(e)
            }
            Err(_) => {
                let _ = thread.join();
                Err(LogError::CollectorPanicked)
            }
        }
    }

    fn receive_loop(mut self) -> CollectorStats {
        let mut delivered = 0;
        let mut rejected = 0;
        let mut reason = StopReason::Cancelled;

        while self.running.load(Ordering::Relaxed) {
            match self.consumer.receive() {
                Ok(Received::Record(record)) => {
                    // Register the name so a later configure_all covers it.
                    let _ = self.hub.logger(&record.logger_name);
                    self.hub.deliver(&record);
                    delivered += 1;
                }
                Ok(Received::Idle) => {}
                Ok(Received::Shutdown) => {
                    reason = StopReason::Sentinel;
                    break;
                }
                Ok(Received::Closed) => {
                    reason = StopReason::Closed;
                    break;
                }
                Err(e) if !e.is_fatal() => {
                    self.hub.report(format_args!("discarding log record: {}", e));
                    rejected += 1;
                }
                Err(e) => {
                    self.hub
                        .report(format_args!("collector stopping, {}", LogError::from(e)));
                    reason = StopReason::TransportBroken;
                    break;
                }
            }
        }

        self.running.store(false, Ordering::Relaxed);
        self.hub.flush();
        CollectorStats {
            delivered,
            rejected,
            reason,
        }
    }
}

/// Handle on a running collector thread
pub struct CollectorHandle {
    running: Arc<AtomicBool>,
    thread: Option<JoinHandle<Option<CollectorStats>>>,
}

impl CollectorHandle {
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    /// Request a stop without waiting
    pub fn cancel(&self) {
        self.running.store(false, Ordering::Relaxed);
    }

    pub fn is_running(&self) -> bool {
        self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Send the sentinel through `producer` and wait for the loop to end
    ///
    /// Everything sent before the sentinel is delivered first. If the
    /// sentinel cannot be sent the running flag is cleared instead.
    pub fn shutdown(self, producer: &Producer) -> Result<CollectorStats, LogError> {
        if producer.send_shutdown().is_err() {
            self.cancel();
        }
        self.join()
    }

    pub fn join(mut self) -> Result<CollectorStats, LogError> {
        let thread = self.thread.take().ok_or(LogError::CollectorPanicked)?;
        thread
            .join()
            .map_err(|_| LogError::CollectorPanicked)?
            .ok_or(LogError::CollectorPanicked)
    }
}

impl Drop for CollectorHandle {
    fn drop(&mut self) {
        if let Some(thread) = self.thread.take() {
            self.running.store(false, Ordering::Relaxed);
            let _ = thread.join();
        }
    }
}
