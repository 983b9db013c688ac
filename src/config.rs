// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Configuration source for the log relay.
//!
//! The pipeline only needs a section-scoped key/value view of the
//! application configuration ([`ConfigSource`]). [`Config`] is the bundled
//! implementation, loaded from a JSON5 file:
//!
//! ```json5
//! {
//!     application: { name: "billing", log_level: "info", log_stdout: true },
//!     "billing.db": { log_level: "DEBUG", log_file: "/var/log/billing-db.log" },
//!     collector: { user: "nobody" },
//! }
//! ```
//!
//! Scalar values are exposed as strings; typed access goes through the
//! helpers on [`ConfigSource`] so every key is validated the same way.

use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Section holding application-wide settings and the root logger config
pub const APPLICATION_SECTION: &str = "application";

/// Section holding collector process settings (privilege drop)
pub const COLLECTOR_SECTION: &str = "collector";

/// Default syslog port when `log_server_port` is absent
pub const DEFAULT_SYSLOG_PORT: u16 = 514;

/// Section-scoped key/value configuration interface
pub trait ConfigSource: Send + Sync {
    /// Whether the named section exists (even if empty)
    fn has_section(&self, section: &str) -> bool;

    /// Raw string value of `key` in `section`
    fn get(&self, section: &str, key: &str) -> Option<String>;

    /// Names of all sections
    fn sections(&self) -> Vec<String>;

    /// Boolean value, accepting `1/yes/true/on` and `0/no/false/off`
    fn get_bool(&self, section: &str, key: &str) -> Result<Option<bool>, ConfigError> {
        let Some(raw) = self.get(section, key) else {
            return Ok(None);
        };
        match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "yes" | "true" | "on" => Ok(Some(true)),
            "0" | "no" | "false" | "off" => Ok(Some(false)),
            _ => Err(ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw,
                expected: "a boolean",
            }),
        }
    }

    /// Port-sized integer value
    fn get_u16(&self, section: &str, key: &str) -> Result<Option<u16>, ConfigError> {
        let Some(raw) = self.get(section, key) else {
            return Ok(None);
        };
        raw.trim()
            .parse::<u16>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue {
                section: section.to_string(),
                key: key.to_string(),
                value: raw,
                expected: "an integer between 0 and 65535",
            })
    }
}

/// Configuration document: section name -> key -> scalar value
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Config {
    sections: BTreeMap<String, BTreeMap<String, String>>,
}

impl Config {
    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, BTreeMap<String, Value>> =
            json5::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;

        let mut sections = BTreeMap::new();
        for (name, table) in raw {
            let mut values = BTreeMap::new();
            for (key, value) in table {
                let value = match value {
                    Value::Null => continue,
                    Value::String(s) => s,
                    Value::Bool(b) => b.to_string(),
                    Value::Number(n) => number_to_string(&n),
                    Value::Array(_) | Value::Object(_) => {
                        return Err(ConfigError::ParseError(format!(
                            "[{}] {}: expected a scalar value",
                            name, key
                        )))
                    }
                };
                values.insert(key, value);
            }
            sections.insert(name, values);
        }

        Ok(Self { sections })
    }

    /// Build a configuration from `(section, key, value)` triples
    pub fn from_pairs<'a>(
        pairs: impl IntoIterator<Item = (&'a str, &'a str, &'a str)>,
    ) -> Self {
        let mut config = Self::default();
        for (section, key, value) in pairs {
            config.set(section, key, value);
        }
        config
    }

    /// Set a single value, creating the section if needed
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        self.sections
            .entry(section.to_string())
            .or_default()
            .insert(key.to_string(), value.to_string());
    }

    /// Create an empty section
    pub fn add_section(&mut self, section: &str) {
        self.sections.entry(section.to_string()).or_default();
    }
}

// JSON5 numbers may arrive as floats; keep integral values integral so they
// parse back as ports and level ranks.
fn number_to_string(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e15 => (f as i64).to_string(),
        _ => n.to_string(),
    }
}

impl ConfigSource for Config {
    fn has_section(&self, section: &str) -> bool {
        self.sections.contains_key(section)
    }

    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section)?.get(key).cloned()
    }

    fn sections(&self) -> Vec<String> {
        self.sections.keys().cloned().collect()
    }
}

/// Typed view of one logger's section
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LogSection {
    /// Display name (only meaningful in the `application` section)
    pub name: Option<String>,
    /// Raw level value: a severity name or numeric rank
    pub log_level: Option<String>,
    pub log_stdout: bool,
    pub log_server: Option<String>,
    pub log_server_port: u16,
    pub log_file: Option<PathBuf>,
}

impl LogSection {
    /// Read the section, returning `None` when it does not exist
    pub fn from_source(
        source: &dyn ConfigSource,
        section: &str,
    ) -> Result<Option<Self>, ConfigError> {
        if !source.has_section(section) {
            return Ok(None);
        }

        let non_empty = |key: &str| source.get(section, key).filter(|v| !v.trim().is_empty());

        Ok(Some(Self {
            name: non_empty("name"),
            log_level: non_empty("log_level"),
            log_stdout: source.get_bool(section, "log_stdout")?.unwrap_or(false),
            log_server: non_empty("log_server").map(|h| h.trim().to_string()),
            log_server_port: source
                .get_u16(section, "log_server_port")?
                .unwrap_or(DEFAULT_SYSLOG_PORT),
            log_file: non_empty("log_file").map(PathBuf::from),
        }))
    }
}

/// Collector process settings
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CollectorSection {
    /// User to switch to before receiving records
    pub user: Option<String>,
    /// Group to switch to; defaults to the user's primary group
    pub group: Option<String>,
}

impl CollectorSection {
    pub fn from_source(source: &dyn ConfigSource) -> Self {
        let value = |key: &str| {
            source
                .get(COLLECTOR_SECTION, key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        Self {
            user: value("user"),
            group: value("group"),
        }
    }
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError(PathBuf, String),
    ParseError(String),
    InvalidValue {
        section: String,
        key: String,
        value: String,
        expected: &'static str,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(f, "failed to read config file '{}': {}", path.display(), msg)
            }
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::InvalidValue {
                section,
                key,
                value,
                expected,
            } => write!(
                f,
                "invalid value '{}' for [{}] {}: expected {}",
                value, section, key, expected
            ),
        }
    }
}

impl std::error::Error for ConfigError {}
