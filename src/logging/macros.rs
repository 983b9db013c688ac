// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros: the format arguments are only evaluated past the gate

#[doc(hidden)]
#[macro_export]
macro_rules! __log_at {
    ($severity:expr, $logger:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        if logger.is_enabled($severity) {
            logger.log(
                $severity,
                &::std::format!($($arg)+),
                &$crate::logging::EmitOptions::default(),
            );
        }
    }};
}

/// Log a message with critical severity
///
/// # Examples
/// ```ignore
/// log_critical!(logger, "collector lost transport: {}", err);
/// ```
#[macro_export]
macro_rules! log_critical {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::logging::Severity::Critical, $logger, $($arg)+)
    };
}

/// Log a message with error severity
///
/// # Examples
/// ```ignore
/// log_error!(logger, "worker {} exited with {}", pid, status);
/// ```
#[macro_export]
macro_rules! log_error {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::logging::Severity::Error, $logger, $($arg)+)
    };
}

/// Log a message with warning severity
#[macro_export]
macro_rules! log_warning {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::logging::Severity::Warning, $logger, $($arg)+)
    };
}

/// Log a message with info severity
///
/// # Examples
/// ```ignore
/// log_info!(logger, "spawned {} workers", count);
/// ```
#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::logging::Severity::Info, $logger, $($arg)+)
    };
}

/// Log a message with debug severity
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)+) => {
        $crate::__log_at!($crate::logging::Severity::Debug, $logger, $($arg)+)
    };
}
