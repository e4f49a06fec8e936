//! Component-tagged logger facade
//!
//! A [`Logger`] is a cheap handle: a shared sink, a component name, an
//! optional correlation ID and a set of pre-bound fields. Every `with_*`
//! method returns a new handle over the same sink and leaves the original
//! untouched.
//!
//! # Usage
//!
//! ```ignore
//! let logger = Logger::new("payments").with_field("region", "eu-west-1");
//!
//! let ctx = Context::background().with_correlation_id(generate_correlation_id());
//! logger.info_with_context(Some(&ctx), "charge accepted");
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::domain::{
    Fields, LogLevel, LogRecord, LoggingConfig, COMPONENT_FIELD, CORRELATION_ID_FIELD, ERROR_CHAIN_FIELD,
    ERROR_FIELD,
};
use crate::error::Result;
use crate::service::bridge::SinkLayer;
use crate::service::sink::{Fallback, Sink};

/// Exit status used after a fatal record
pub const FATAL_EXIT_CODE: i32 = 1;

#[derive(Clone)]
pub struct Logger {
    sink: Arc<Sink>,
    component: Arc<str>,
    correlation_id: Option<Arc<str>>,
    fields: Arc<Fields>,
}

impl Logger {
    /// Logger over a fresh sink: info level, text to the console
    pub fn new(component: impl Into<String>) -> Self {
        Self::with_sink(Arc::new(Sink::new()), component)
    }

    /// Logger over an existing sink
    pub fn with_sink(sink: Arc<Sink>, component: impl Into<String>) -> Self {
        Self {
            sink,
            component: Arc::from(component.into()),
            correlation_id: None,
            fields: Arc::new(Fields::new()),
        }
    }

    /// Logger over a fresh sink built from `config`. When no destination
    /// is enabled, records are discarded.
    pub fn from_config(component: impl Into<String>, config: &LoggingConfig) -> Result<Self> {
        let sink = Sink::from_config(config, Fallback::Discard)?;
        Ok(Self::with_sink(Arc::new(sink), component))
    }

    pub fn component(&self) -> &str {
        &self.component
    }

    pub fn correlation_id(&self) -> Option<&str> {
        self.correlation_id.as_deref()
    }

    pub fn fields(&self) -> &Fields {
        &self.fields
    }

    pub fn sink(&self) -> &Arc<Sink> {
        &self.sink
    }

    /// Same sink and component, with `id` attached
    pub fn with_correlation_id(&self, id: impl Into<String>) -> Self {
        Self {
            correlation_id: Some(Arc::from(id.into())),
            ..self.clone()
        }
    }

    pub fn with_field(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = (*self.fields).clone();
        fields.insert(key.into(), value.into());
        Self {
            fields: Arc::new(fields),
            ..self.clone()
        }
    }

    pub fn with_fields<I, K, V>(&self, fields: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Value>,
    {
        let mut merged = (*self.fields).clone();
        for (key, value) in fields {
            merged.insert(key.into(), value.into());
        }
        Self {
            fields: Arc::new(merged),
            ..self.clone()
        }
    }

    /// Bind the error's message under `error`. When the error has a
    /// `source()` chain, its messages go under `error_chain`, outermost first.
    pub fn with_error<E>(&self, err: &E) -> Self
    where
        E: std::error::Error + ?Sized,
    {
        let mut chain = Vec::new();
        let mut source = err.source();
        while let Some(cause) = source {
            chain.push(Value::from(cause.to_string()));
            source = cause.source();
        }

        let logger = self.with_field(ERROR_FIELD, err.to_string());
        if chain.is_empty() {
            logger
        } else {
            logger.with_field(ERROR_CHAIN_FIELD, chain)
        }
    }

    /// Default level of the underlying sink
    pub fn level(&self) -> LogLevel {
        self.sink.level()
    }

    /// Set the default level of the underlying sink
    pub fn set_level(&self, level: LogLevel) {
        self.sink.set_level(level);
    }

    /// Whether a record at `level` from this logger's component would be written
    pub fn is_level_enabled(&self, level: LogLevel) -> bool {
        self.sink.is_enabled(&self.component, level)
    }

    /// Override the level for one component on the shared sink
    pub fn set_component_level(&self, component: &str, level: LogLevel) {
        self.sink.set_component_level(component, level);
    }

    pub fn clear_component_level(&self, component: &str) {
        self.sink.clear_component_level(component);
    }

    /// Override for `component`, falling back to the sink's default level
    pub fn effective_level(&self, component: &str) -> LogLevel {
        self.sink.effective_level(component)
    }

    /// `tracing` layer that writes into this logger's sink
    pub fn tracing_layer(&self) -> SinkLayer {
        SinkLayer::new(self.sink.clone(), self.component.to_string())
    }

    pub fn flush(&self) {
        self.sink.flush();
    }

    fn record(&self, ctx: Option<&Context>, level: LogLevel, message: String) -> LogRecord {
        let mut fields = (*self.fields).clone();
        fields.insert(COMPONENT_FIELD.to_string(), Value::from(self.component()));

        if let Some(id) = self.correlation_id() {
            fields.insert(CORRELATION_ID_FIELD.to_string(), Value::from(id));
        }

        // The context's ID wins over the one stored on the logger
        if let Some(id) = ctx.and_then(Context::correlation_id).filter(|id| !id.is_empty()) {
            fields.insert(CORRELATION_ID_FIELD.to_string(), Value::from(id));
        }

        LogRecord::new(level, message).with_fields(fields)
    }

    /// Emit one record, taking the correlation ID from `ctx` when it has one
    pub fn log_with_context(&self, ctx: Option<&Context>, level: LogLevel, message: impl Into<String>) {
        if !self.is_level_enabled(level) {
            return;
        }
        self.sink.emit(&self.record(ctx, level, message.into()));
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_with_context(None, level, message);
    }

    pub fn trace(&self, message: impl Into<String>) {
        self.log(LogLevel::Trace, message);
    }

    pub fn debug(&self, message: impl Into<String>) {
        self.log(LogLevel::Debug, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Emit at fatal level, flush, and exit the process
    pub fn fatal(&self, message: impl Into<String>) -> ! {
        self.fatal_with_context(None, message)
    }

    pub fn debug_with_context(&self, ctx: Option<&Context>, message: impl Into<String>) {
        self.log_with_context(ctx, LogLevel::Debug, message);
    }

    pub fn info_with_context(&self, ctx: Option<&Context>, message: impl Into<String>) {
        self.log_with_context(ctx, LogLevel::Info, message);
    }

    pub fn warn_with_context(&self, ctx: Option<&Context>, message: impl Into<String>) {
        self.log_with_context(ctx, LogLevel::Warn, message);
    }

    pub fn error_with_context(&self, ctx: Option<&Context>, message: impl Into<String>) {
        self.log_with_context(ctx, LogLevel::Error, message);
    }

    /// Emit at fatal level, flush every destination, and exit the process
    pub fn fatal_with_context(&self, ctx: Option<&Context>, message: impl Into<String>) -> ! {
        self.log_with_context(ctx, LogLevel::Fatal, message);
        self.sink.flush();
        std::process::exit(FATAL_EXIT_CODE)
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("component", &self.component)
            .field("correlation_id", &self.correlation_id)
            .field("fields", &self.fields)
            .field("level", &self.level())
            .finish()
    }
}
