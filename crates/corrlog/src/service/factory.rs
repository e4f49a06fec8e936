//! Logger factory
//!
//! A factory holds one [`LoggingConfig`] and stamps out loggers from it.
//! Applications that wire their own dependencies construct a
//! [`LoggerFactory`] at the composition root and pass it down; code that
//! just wants a logger can use [`get_logger`], which goes through the
//! lazily created process-wide factory.
//!
//! Reconfiguring a factory only affects loggers created afterwards.

use parking_lot::RwLock;
use std::sync::{Arc, OnceLock};
use tracing::warn;

use crate::domain::LoggingConfig;
use crate::error::Result;
use crate::service::logger::Logger;
use crate::service::sink::{Fallback, Sink};

#[derive(Debug)]
pub struct LoggerFactory {
    config: RwLock<LoggingConfig>,
}

impl LoggerFactory {
    pub fn new(config: LoggingConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }

    /// Copy of the current configuration
    pub fn config(&self) -> LoggingConfig {
        self.config.read().clone()
    }

    /// Replace the stored configuration. `None` is ignored.
    pub fn configure(&self, config: impl Into<Option<LoggingConfig>>) {
        if let Some(config) = config.into() {
            *self.config.write() = config;
        }
    }

    /// New logger with the factory's current level and destinations.
    ///
    /// Fails when the file destination can't be opened.
    pub fn try_create_logger(&self, component: &str) -> Result<Logger> {
        let config = self.config();
        let sink = Sink::from_config(&config, Fallback::Discard)?;
        Ok(Logger::with_sink(Arc::new(sink), component))
    }

    /// New logger with the factory's current settings. If the file
    /// destination can't be opened the logger keeps the remaining
    /// destinations and a warning is emitted.
    pub fn create_logger(&self, component: &str) -> Logger {
        match self.try_create_logger(component) {
            Ok(logger) => logger,
            Err(e) => {
                warn!("Logger for {} created without file output: {}", component, e);
                let config = LoggingConfig {
                    file_enabled: false,
                    ..self.config()
                };
                let sink = Sink::from_config(&config, Fallback::Discard)
                    .unwrap_or_else(|_| Sink::with_destinations(config.log_level(), Vec::new()));
                Logger::with_sink(Arc::new(sink), component)
            }
        }
    }
}

impl Default for LoggerFactory {
    fn default() -> Self {
        Self::new(LoggingConfig::default())
    }
}

/// Process-wide factory, created with the default config on first use
pub fn global_factory() -> &'static LoggerFactory {
    static FACTORY: OnceLock<LoggerFactory> = OnceLock::new();
    FACTORY.get_or_init(LoggerFactory::default)
}

/// Logger for `component` from the process-wide factory
pub fn get_logger(component: &str) -> Logger {
    global_factory().create_logger(component)
}
