//! Logging configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::domain::LogLevel;
use crate::error::{LoggingError, Result};

/// Environment name that forces JSON output for file destinations
pub const PRODUCTION_ENVIRONMENT: &str = "production";

/// Default rotation size for `setup_logging_simple` (megabytes)
pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 10;

/// Default number of rotated backups for `setup_logging_simple`
pub const DEFAULT_BACKUP_COUNT: usize = 5;

/// Rotated files older than this are removed regardless of `backup_count`
pub const MAX_BACKUP_AGE_DAYS: u64 = 30;

/// Output format of a destination
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl LogFormat {
    /// Pick a format from a free-form name.
    ///
    /// Anything containing "json" (any case) is JSON; everything else,
    /// including the empty string, is text.
    pub fn from_name(name: &str) -> Self {
        if name.to_lowercase().contains("json") {
            Self::Json
        } else {
            Self::Text
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Json => "json",
        }
    }
}

/// Logging configuration.
///
/// Never mutated by this crate once handed to a setup call. Values are
/// kept as loosely typed as the documents they are read from: `level` and
/// `format` are free strings that degrade to `info` and text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LoggingConfig {
    /// trace / debug / info / warn / error / fatal
    pub level: String,

    /// "text" or "json"; anything else is text
    pub format: String,

    /// Write records to stdout
    pub console_enabled: bool,

    /// Write records to a rotating file at `file_path`
    pub file_enabled: bool,

    /// Path of the active log file. An empty path disables the file
    /// destination even when `file_enabled` is set.
    pub file_path: String,

    /// Size that triggers rotation, in megabytes
    pub max_file_size: u64,

    /// Rotated files to keep; 0 keeps all of them
    pub backup_count: usize,

    /// Deployment environment; "production" forces JSON file output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info.as_str().to_string(),
            format: LogFormat::Text.as_str().to_string(),
            console_enabled: true,
            file_enabled: false,
            file_path: String::new(),
            max_file_size: DEFAULT_MAX_FILE_SIZE_MB,
            backup_count: DEFAULT_BACKUP_COUNT,
            environment: None,
        }
    }
}

impl LoggingConfig {
    /// Console output only, at the given level
    pub fn console_only(level: impl Into<String>) -> Self {
        Self {
            level: level.into(),
            ..Self::default()
        }
    }

    /// Config used by `setup_logging_simple`: console always on, file on
    /// iff `path` is non-empty.
    pub fn simple(path: &str, level: &str) -> Self {
        Self {
            level: level.to_string(),
            file_enabled: !path.is_empty(),
            file_path: path.to_string(),
            ..Self::default()
        }
    }

    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = format.into();
        self
    }

    pub fn with_console(mut self, enabled: bool) -> Self {
        self.console_enabled = enabled;
        self
    }

    /// Enable the rotating file destination
    pub fn with_file(mut self, path: impl Into<String>, max_file_size: u64, backup_count: usize) -> Self {
        self.file_enabled = true;
        self.file_path = path.into();
        self.max_file_size = max_file_size;
        self.backup_count = backup_count;
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = Some(environment.into());
        self
    }

    /// Effective level; unparseable values are `Info`
    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse_or_default(&self.level)
    }

    pub fn log_format(&self) -> LogFormat {
        LogFormat::from_name(&self.format)
    }

    pub fn is_production(&self) -> bool {
        self.environment
            .as_deref()
            .is_some_and(|env| env.trim().eq_ignore_ascii_case(PRODUCTION_ENVIRONMENT))
    }

    /// File destination path, if the file destination is enabled and usable
    pub fn file_destination(&self) -> Option<&Path> {
        (self.file_enabled && !self.file_path.is_empty()).then(|| Path::new(&self.file_path))
    }

    /// Rotation size in bytes
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size.saturating_mul(1024 * 1024)
    }

    /// Load a config from a JSON document. Missing keys take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LoggingError::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|source| LoggingError::ParseConfig {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Build a config from `LOG_*` process variables, loading `.env` first
    /// when one is present. Unset or unparseable variables keep defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`LoggingConfig::from_env`] but reading from any lookup,
    /// so tests don't have to touch process state.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(level) = lookup("LOG_LEVEL") {
            config.level = level;
        }
        if let Some(format) = lookup("LOG_FORMAT") {
            config.format = format;
        }
        if let Some(enabled) = lookup("LOG_CONSOLE_ENABLED").and_then(|v| parse_bool(&v)) {
            config.console_enabled = enabled;
        }
        if let Some(enabled) = lookup("LOG_FILE_ENABLED").and_then(|v| parse_bool(&v)) {
            config.file_enabled = enabled;
        }
        if let Some(path) = lookup("LOG_FILE_PATH") {
            config.file_path = path;
        }
        if let Some(size) = lookup("LOG_MAX_FILE_SIZE").and_then(|v| v.trim().parse().ok()) {
            config.max_file_size = size;
        }
        if let Some(count) = lookup("LOG_BACKUP_COUNT").and_then(|v| v.trim().parse().ok()) {
            config.backup_count = count;
        }
        config.environment = lookup("ENVIRONMENT").filter(|env| !env.is_empty());

        config
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
