// SPDX-License-Identifier: Apache-2.0 OR MIT
// Severity levels and numeric level thresholds

use serde::{Deserialize, Serialize};

/// Log severity levels (higher rank is more severe)
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Diagnostic detail (request traces, payload dumps)
    Debug = 10,
    /// Significant normal condition (worker started, config loaded)
    Info = 20,
    /// Something unexpected that the process recovered from
    Warning = 30,
    /// An operation failed
    Error = 40,
    /// The process cannot continue in its current state
    Critical = 50,
}

impl Severity {
    /// All severities, least severe first
    pub const ALL: [Severity; 5] = [
        Severity::Debug,
        Severity::Info,
        Severity::Warning,
        Severity::Error,
        Severity::Critical,
    ];

    /// Numeric rank (10-50)
    #[inline]
    pub const fn rank(self) -> u8 {
        self as u8
    }

    /// Severity name as static string
    pub const fn as_str(self) -> &'static str {
        match self {
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Error => "ERROR",
            Severity::Critical => "CRITICAL",
        }
    }

    /// Create from an exact rank (returns None for anything else)
    pub const fn from_rank(value: u8) -> Option<Self> {
        match value {
            10 => Some(Severity::Debug),
            20 => Some(Severity::Info),
            30 => Some(Severity::Warning),
            40 => Some(Severity::Error),
            50 => Some(Severity::Critical),
            _ => None,
        }
    }

    /// Parse a severity name, ignoring case and surrounding whitespace
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_uppercase().as_str() {
            "DEBUG" => Some(Severity::Debug),
            "INFO" => Some(Severity::Info),
            "WARNING" => Some(Severity::Warning),
            "ERROR" => Some(Severity::Error),
            "CRITICAL" => Some(Severity::Critical),
            _ => None,
        }
    }

    /// RFC 5424 severity code used in syslog priorities
    pub const fn syslog_code(self) -> u8 {
        match self {
            Severity::Critical => 2,
            Severity::Error => 3,
            Severity::Warning => 4,
            Severity::Info => 6,
            Severity::Debug => 7,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Minimum rank a logger acts on
///
/// Any rank is a valid threshold, so a level may sit between two named
/// severities (e.g. 25 admits WARNING and above).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Level(u8);

impl Level {
    /// Admits everything
    pub const NOTSET: Level = Level(0);
    pub const DEBUG: Level = Level(Severity::Debug.rank());
    pub const INFO: Level = Level(Severity::Info.rank());
    pub const WARNING: Level = Level(Severity::Warning.rank());
    pub const ERROR: Level = Level(Severity::Error.rank());
    pub const CRITICAL: Level = Level(Severity::Critical.rank());

    pub const fn from_rank(rank: u8) -> Self {
        Level(rank)
    }

    pub const fn rank(self) -> u8 {
        self.0
    }

    /// Whether a record of `severity` passes this threshold
    #[inline]
    pub const fn admits(self, severity: Severity) -> bool {
        severity.rank() >= self.0
    }

    /// Parse a numeric rank or a severity name
    ///
    /// Ranks above 255 behave like 255: nothing is admitted either way.
    /// Returns None for anything else; callers attach the logger name.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if let Ok(rank) = trimmed.parse::<u64>() {
            return Some(Level(u8::try_from(rank).unwrap_or(u8::MAX)));
        }
        Severity::from_name(trimmed).map(Level::from)
    }
}

impl From<Severity> for Level {
    fn from(severity: Severity) -> Self {
        Level(severity.rank())
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match Severity::from_rank(self.0) {
            Some(severity) => write!(f, "{}", severity),
            None if self.0 == 0 => write!(f, "NOTSET"),
            None => write!(f, "Level {}", self.0),
        }
    }
}
