// SPDX-License-Identifier: Apache-2.0 OR MIT
// Severity gate: per-logger effective levels with dotted-name inheritance

use super::{Level, Severity};
use crate::error::LogError;
use std::collections::HashMap;
use std::sync::RwLock;

/// Name of the root logger
pub const ROOT_LOGGER: &str = "";

/// Level the root logger starts with
pub const DEFAULT_ROOT_LEVEL: Level = Level::WARNING;

/// Parent of a dotted logger name (`a.b.c` -> `a.b`, `a` -> root)
pub fn parent_name(name: &str) -> Option<&str> {
    if name == ROOT_LOGGER {
        return None;
    }
    match name.rfind('.') {
        Some(idx) => Some(&name[..idx]),
        None => Some(ROOT_LOGGER),
    }
}

/// `name` followed by each of its ancestors, ending with the root
pub fn lineage(name: &str) -> impl Iterator<Item = &str> {
    std::iter::successors(Some(name), |current| parent_name(*current))
}

/// Per-logger level state
///
/// Loggers without an explicit level inherit from their nearest ancestor.
/// The root always has a level.
pub struct SeverityGate {
    explicit: RwLock<HashMap<String, Level>>,
}

impl SeverityGate {
    pub fn new() -> Self {
        let mut explicit = HashMap::new();
        explicit.insert(ROOT_LOGGER.to_string(), DEFAULT_ROOT_LEVEL);
        Self {
            explicit: RwLock::new(explicit),
        }
    }

    /// Whether `severity` on `logger` should be formatted at all
    #[inline]
    pub fn allowed(&self, logger: &str, severity: Severity) -> bool {
        self.effective_level(logger).admits(severity)
    }

    /// Resolved level: the logger's own, or its nearest ancestor's
    pub fn effective_level(&self, logger: &str) -> Level {
        let levels = self.explicit.read().unwrap_or_else(|e| e.into_inner());
        lineage(logger)
            .find_map(|name| levels.get(name).copied())
            .unwrap_or(DEFAULT_ROOT_LEVEL)
    }

    /// Level set directly on this logger, if any
    pub fn explicit_level(&self, logger: &str) -> Option<Level> {
        let levels = self.explicit.read().unwrap_or_else(|e| e.into_inner());
        levels.get(logger).copied()
    }

    /// Set a level from a severity name or numeric rank
    ///
    /// On failure the logger keeps its previous level.
    pub fn set_level(&self, logger: &str, value: &str) -> Result<Level, LogError> {
        let level = parse_level(logger, value)?;
        self.set(logger, level);
        Ok(level)
    }

    /// Set an already-parsed level
    ///
    /// [`Level::NOTSET`] on any logger but the root removes its own level,
    /// so it inherits from its ancestors again.
    pub fn set(&self, logger: &str, level: Level) {
        let mut levels = self.explicit.write().unwrap_or_else(|e| e.into_inner());
        if level == Level::NOTSET && logger != ROOT_LOGGER {
            levels.remove(logger);
        } else {
            levels.insert(logger.to_string(), level);
        }
    }

    /// Remove the logger's own level so it inherits again
    ///
    /// The root cannot inherit; clearing it restores the default.
    pub fn clear_level(&self, logger: &str) {
        let mut levels = self.explicit.write().unwrap_or_else(|e| e.into_inner());
        if logger == ROOT_LOGGER {
            levels.insert(ROOT_LOGGER.to_string(), DEFAULT_ROOT_LEVEL);
        } else {
            levels.remove(logger);
        }
    }
}

impl Default for SeverityGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a level value, naming the logger on failure
pub fn parse_level(logger: &str, value: &str) -> Result<Level, LogError> {
    Level::parse(value).ok_or_else(|| LogError::InvalidLevel {
        logger: logger.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_name() {
        assert_eq!(parent_name("a.b.c"), Some("a.b"));
        assert_eq!(parent_name("a"), Some(ROOT_LOGGER));
        assert_eq!(parent_name(ROOT_LOGGER), None);
    }

    #[test]
    fn test_lineage() {
        let names: Vec<&str> = lineage("app.db.pool").collect();
        assert_eq!(names, vec!["app.db.pool", "app.db", "app", ""]);
    }

    #[test]
    fn test_default_root_level() {
        let gate = SeverityGate::new();
        assert_eq!(gate.effective_level(ROOT_LOGGER), Level::WARNING);
        assert_eq!(gate.effective_level("anything.below"), Level::WARNING);
        assert!(gate.allowed("app", Severity::Warning));
        assert!(!gate.allowed("app", Severity::Info));
    }

    #[test]
    fn test_inherits_nearest_ancestor() {
        let gate = SeverityGate::new();
        gate.set_level("app", "DEBUG").unwrap();
        gate.set_level("app.db", "error").unwrap();

        assert_eq!(gate.effective_level("app.web"), Level::DEBUG);
        assert_eq!(gate.effective_level("app.db.pool"), Level::ERROR);
        assert_eq!(gate.explicit_level("app.db.pool"), None);
    }

    #[test]
    fn test_numeric_level() {
        let gate = SeverityGate::new();
        gate.set_level("app", " 35 ").unwrap();
        assert!(gate.allowed("app", Severity::Error));
        assert!(!gate.allowed("app", Severity::Warning));
    }

    #[test]
    fn test_rank_zero_inherits_from_parent() {
        let gate = SeverityGate::new();
        gate.set_level("app", "ERROR").unwrap();
        gate.set_level("app.db", "DEBUG").unwrap();

        assert_eq!(gate.set_level("app.db", "0").unwrap(), Level::NOTSET);
        assert_eq!(gate.explicit_level("app.db"), None);
        assert_eq!(gate.effective_level("app.db"), Level::ERROR);
        assert!(!gate.allowed("app.db", Severity::Info));

        // The root has no parent: NOTSET there admits everything.
        gate.set_level(ROOT_LOGGER, "0").unwrap();
        assert!(gate.allowed("other", Severity::Debug));
    }

    #[test]
    fn test_rank_above_critical_blocks_everything() {
        let gate = SeverityGate::new();
        assert!(gate.set_level("app", "300").is_ok());
        assert!(!gate.allowed("app", Severity::Critical));
    }

    #[test]
    fn test_invalid_level_keeps_previous() {
        let gate = SeverityGate::new();
        gate.set_level("app", "INFO").unwrap();

        let err = gate.set_level("app", "chatty").unwrap_err();
        match err {
            LogError::InvalidLevel { logger, value } => {
                assert_eq!(logger, "app");
                assert_eq!(value, "chatty");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(gate.effective_level("app"), Level::INFO);
    }

    #[test]
    fn test_clear_level() {
        let gate = SeverityGate::new();
        gate.set("app", Level::DEBUG);
        gate.clear_level("app");
        assert_eq!(gate.effective_level("app"), Level::WARNING);

        gate.set(ROOT_LOGGER, Level::CRITICAL);
        gate.clear_level(ROOT_LOGGER);
        assert_eq!(gate.effective_level(ROOT_LOGGER), DEFAULT_ROOT_LEVEL);
    }
}
