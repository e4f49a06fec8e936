//! Log record emitted by a logger

use serde_json::{Map, Value};

use crate::domain::LogLevel;

/// Field carrying the emitting component
pub const COMPONENT_FIELD: &str = "component";

/// Field carrying the correlation ID
pub const CORRELATION_ID_FIELD: &str = "correlation_id";

/// Field written by `Logger::with_error`
pub const ERROR_FIELD: &str = "error";

/// Messages of the error's `source()` chain, outermost first
pub const ERROR_CHAIN_FIELD: &str = "error_chain";

/// Ordered set of structured fields
pub type Fields = Map<String, Value>;

/// A single structured log record.
///
/// The timestamp is taken when the record is formatted.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    pub message: String,
    pub fields: Fields,
}

impl LogRecord {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            fields: Fields::new(),
        }
    }

    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields = fields;
        self
    }

    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn component(&self) -> Option<&str> {
        self.fields.get(COMPONENT_FIELD).and_then(Value::as_str)
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.fields.get(CORRELATION_ID_FIELD).and_then(Value::as_str)
    }
}
