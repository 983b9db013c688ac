// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Error types for the log relay pipeline.

use std::io;
use std::path::Path;

use thiserror::Error;

use crate::config::ConfigError;

/// Errors surfaced by configuration, collector startup and the transport.
///
/// Emit operations never return these; they are reported on the fallback
/// stream instead.
#[derive(Error, Debug)]
pub enum LogError {
    #[error("Invalid logging level '{value}' for logger '{logger}'")]
    InvalidLevel { logger: String, value: String },

    #[error("log transport broken: {0}")]
    TransportBroken(#[source] io::Error),

    #[error("failed to process log record: {0}")]
    RecordProcessing(String),

    #[error("failed to drop collector privileges: {0}")]
    PrivilegeDrop(String),

    #[error("failed to start collector thread: {0}")]
    CollectorSpawn(#[source] io::Error),

    #[error("collector thread panicked")]
    CollectorPanicked,

    #[error("logger '{logger}' runs in a worker process but no transport endpoint was provided")]
    MissingQueueForWorker { logger: String },

    #[error("failed to open {target} sink for logger '{logger}': {source}")]
    SinkOpen {
        logger: String,
        target: String,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors produced by the transport endpoints.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("malformed frame: {0}")]
    Decode(String),

    #[error("frame of {size} bytes exceeds the {limit} byte transport limit")]
    Oversized { size: usize, limit: usize },

    #[error("transport closed by peer")]
    Closed,

    #[error("transport descriptor unavailable: {0}")]
    Descriptor(String),
}

impl TransportError {
    /// Whether the error leaves the channel unusable.
    ///
    /// Decode failures only affect the frame that produced them.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, TransportError::Decode(_) | TransportError::Oversized { .. })
    }
}

impl From<TransportError> for LogError {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Io(e) => LogError::TransportBroken(e),
            TransportError::Decode(msg) => LogError::RecordProcessing(msg),
            TransportError::Oversized { size, limit } => LogError::RecordProcessing(format!(
                "frame of {} bytes exceeds {} byte limit",
                size, limit
            )),
            TransportError::Closed => LogError::TransportBroken(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "transport closed by peer",
            )),
            TransportError::Descriptor(msg) => {
                LogError::TransportBroken(io::Error::new(io::ErrorKind::NotFound, msg))
            }
        }
    }
}

/// Helper for sink errors that carry a file path.
pub(crate) fn file_sink_error(logger: &str, path: &Path, source: io::Error) -> LogError {
    LogError::SinkOpen {
        logger: logger.to_string(),
        target: format!("file {}", path.display()),
        source,
    }
}
