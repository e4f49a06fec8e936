//! # Corrlog
//!
//! Component-tagged structured logging with correlation IDs.
//!
//! ## Modules
//!
//! - `domain` - Levels, formats, configuration and the record type
//! - `context` - Immutable request context carrying a correlation ID
//! - `service` - Logger facade, shared sinks, destinations, file rotation,
//!   the logger factory and the process-wide default logger
//! - `error` - Errors returned by setup calls
//!
//! ## Quick start
//!
//! ```ignore
//! use corrlog::{default_logger, generate_correlation_id, setup_logging, Context, LoggingConfig};
//!
//! setup_logging(&LoggingConfig::from_env())?;
//!
//! let ctx = Context::background().with_correlation_id(generate_correlation_id());
//! default_logger()
//!     .with_field("route", "/orders")
//!     .info_with_context(Some(&ctx), "request accepted");
//! ```

pub mod context;
pub mod domain;
pub mod error;
pub mod service;

// Re-export commonly used types
pub use context::*;
pub use domain::*;
pub use error::{LoggingError, Result};
pub use service::*;
