//! Process-wide default logger
//!
//! [`default_logger`] hands out one shared logger for the whole process.
//! [`setup_logging`] reconfigures it in place, so every handle obtained
//! earlier (and every logger derived from it) picks up the new level and
//! destinations.

use std::sync::OnceLock;
use tracing::info;

use crate::context::Context;
use crate::domain::{LogLevel, LoggingConfig};
use crate::error::Result;
use crate::service::logger::Logger;
use crate::service::sink::Fallback;

/// Component name of the default logger
pub const DEFAULT_COMPONENT: &str = "app";

/// The process-wide default logger, created on first use
pub fn default_logger() -> &'static Logger {
    static DEFAULT_LOGGER: OnceLock<Logger> = OnceLock::new();
    DEFAULT_LOGGER.get_or_init(|| Logger::new(DEFAULT_COMPONENT))
}

/// Reconfigure the default logger.
///
/// - Unparseable levels become `info`; unknown formats become text.
/// - Console and file destinations are independent; both may be active.
/// - With neither enabled, output stays on the console.
/// - The log directory is created if missing. Failing to create it (or to
///   open the file) is returned, and the logger keeps its previous setup.
pub fn setup_logging(config: &LoggingConfig) -> Result<()> {
    default_logger().sink().apply_config(config, Fallback::Console)?;
    info!(
        "Logging configured: level={} format={} console={} file={:?}",
        config.log_level(),
        config.log_format().as_str(),
        config.console_enabled,
        config.file_destination()
    );
    Ok(())
}

/// Console logging plus, when `path` is non-empty, a rotating file with
/// default size and backup limits.
pub fn setup_logging_simple(path: &str, level: &str) -> Result<()> {
    setup_logging(&LoggingConfig::simple(path, level))
}

/// Log through the default logger, tagging the record with the
/// correlation ID carried by `ctx`.
pub fn log_with_correlation_id(ctx: Option<&Context>, level: LogLevel, message: impl Into<String>) {
    default_logger().log_with_context(ctx, level, message);
}
