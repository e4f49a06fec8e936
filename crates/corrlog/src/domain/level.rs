//! Log levels

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{Level, Metadata};

/// Log level
///
/// Ordered by severity, so a gate set to `Warn` lets `Warn`, `Error`
/// and `Fatal` through.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Fatal,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
            Self::Fatal => "fatal",
        }
    }

    /// Parse a level name, ignoring case and surrounding whitespace
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            "fatal" => Some(Self::Fatal),
            _ => None,
        }
    }

    /// Parse a level name, falling back to `Info` for anything unrecognized
    pub fn parse_or_default(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }

    /// Whether a record at `level` passes a gate set to `self`
    pub fn allows(&self, level: LogLevel) -> bool {
        level >= *self
    }

    /// Level of a tracing callsite. `tracing` has no fatal level, so fatal
    /// records travel as `ERROR` events named `fatal`.
    pub fn from_metadata(metadata: &Metadata<'_>) -> Self {
        if *metadata.level() == Level::ERROR && metadata.name() == Self::Fatal.as_str() {
            Self::Fatal
        } else {
            Self::from(*metadata.level())
        }
    }
}

impl Default for LogLevel {
    fn default() -> Self {
        Self::Info
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Level> for LogLevel {
    fn from(level: Level) -> Self {
        match level {
            Level::TRACE => Self::Trace,
            Level::DEBUG => Self::Debug,
            Level::INFO => Self::Info,
            Level::WARN => Self::Warn,
            Level::ERROR => Self::Error,
        }
    }
}
