//! `tracing` → sink bridge
//!
//! Lets an application keep using `tracing::info!` and friends while the
//! records land in the same destinations as its facade loggers:
//!
//! ```ignore
//! use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
//!
//! corrlog::setup_logging(&config)?;
//! tracing_subscriber::registry()
//!     .with(corrlog::default_logger().tracing_layer())
//!     .init();
//! ```

use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber};
use tracing_subscriber::layer::Context as LayerContext;
use tracing_subscriber::Layer;

use crate::context::Context;
use crate::domain::{Fields, LogLevel, LogRecord, COMPONENT_FIELD, CORRELATION_ID_FIELD};
use crate::service::sink::Sink;

/// Field holding the event's `tracing` target
pub const TARGET_FIELD: &str = "target";

/// Events from this crate itself are never bridged, so rotation and
/// destination diagnostics can't feed back into the sink that raised them.
const OWN_TARGET: &str = env!("CARGO_CRATE_NAME");

/// Layer that converts `tracing` events into records on a sink
pub struct SinkLayer {
    sink: Arc<Sink>,
    component: String,
}

impl SinkLayer {
    pub fn new(sink: Arc<Sink>, component: impl Into<String>) -> Self {
        Self {
            sink,
            component: component.into(),
        }
    }
}

impl fmt::Debug for SinkLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SinkLayer")
            .field("component", &self.component)
            .finish()
    }
}

impl<S> Layer<S> for SinkLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: LayerContext<'_, S>) {
        let metadata = event.metadata();
        if metadata.target().split("::").next() == Some(OWN_TARGET) {
            return;
        }

        let level = LogLevel::from(*metadata.level());
        if !self.sink.is_enabled(&self.component, level) {
            return;
        }

        let mut visitor = FieldVisitor::default();
        event.record(&mut visitor);

        let mut fields = Fields::new();
        fields.insert(TARGET_FIELD.to_string(), Value::from(metadata.target()));
        fields.extend(visitor.fields);
        fields.insert(COMPONENT_FIELD.to_string(), Value::from(self.component.as_str()));

        if let Some(id) = Context::current()
            .as_ref()
            .and_then(Context::correlation_id)
            .filter(|id| !id.is_empty())
        {
            fields.insert(CORRELATION_ID_FIELD.to_string(), Value::from(id));
        }

        let record = LogRecord::new(level, visitor.message.unwrap_or_default()).with_fields(fields);
        self.sink.emit(&record);
    }
}

#[derive(Default)]
struct FieldVisitor {
    message: Option<String>,
    fields: Fields,
}

impl FieldVisitor {
    fn insert(&mut self, field: &Field, value: Value) {
        if field.name() == "message" {
            self.message = Some(match value {
                Value::String(s) => s,
                other => other.to_string(),
            });
        } else {
            self.fields.insert(field.name().to_string(), value);
        }
    }
}

impl Visit for FieldVisitor {
    fn record_f64(&mut self, field: &Field, value: f64) {
        self.insert(field, Value::from(value));
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.insert(field, Value::from(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.insert(field, Value::from(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.insert(field, Value::from(value));
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        self.insert(field, Value::from(value));
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        self.insert(field, Value::from(format!("{value:?}")));
    }
}
