//! Records as `tracing` events
//!
//! Every record is emitted through one of six static callsites, one per
//! level. An event carries two fields: the message, and the record's
//! fields encoded as one JSON object, since `tracing` field names are
//! fixed per callsite while record field names are not.
//!
//! Gating asks the dispatcher about a short-lived copy of the callsite
//! metadata whose target is the emitting component.

use serde_json::Value;
use std::fmt;
use tracing_core::callsite::Callsite;
use tracing_core::field::{self, Field, FieldSet, Visit};
use tracing_core::metadata::Kind;
use tracing_core::subscriber::Interest;
use tracing_core::{identify_callsite, Dispatch, Event, Level, Metadata};

use crate::domain::{Fields, LogLevel, LogRecord};

pub(crate) const MESSAGE_FIELD: &str = "message";
pub(crate) const FIELDS_FIELD: &str = "fields";
const FIELD_NAMES: &[&str] = &[MESSAGE_FIELD, FIELDS_FIELD];

/// Target of the static callsites
const RECORD_TARGET: &str = "corrlog::record";

macro_rules! record_callsite {
    ($name:expr, $level:expr, $cs:ident, $meta:ident, $ty:ident) => {
        struct $ty;
        static $cs: $ty = $ty;
        static $meta: Metadata<'static> = Metadata::new(
            $name,
            RECORD_TARGET,
            $level,
            None,
            None,
            None,
            FieldSet::new(FIELD_NAMES, identify_callsite!(&$cs)),
            Kind::EVENT,
        );

        impl Callsite for $ty {
            fn set_interest(&self, _: Interest) {}

            fn metadata(&self) -> &Metadata<'_> {
                &$meta
            }
        }
    };
}

record_callsite!("trace", Level::TRACE, TRACE_CS, TRACE_META, TraceCallsite);
record_callsite!("debug", Level::DEBUG, DEBUG_CS, DEBUG_META, DebugCallsite);
record_callsite!("info", Level::INFO, INFO_CS, INFO_META, InfoCallsite);
record_callsite!("warn", Level::WARN, WARN_CS, WARN_META, WarnCallsite);
record_callsite!("error", Level::ERROR, ERROR_CS, ERROR_META, ErrorCallsite);
record_callsite!("fatal", Level::ERROR, FATAL_CS, FATAL_META, FatalCallsite);

fn callsite(level: LogLevel) -> (&'static dyn Callsite, &'static Metadata<'static>) {
    match level {
        LogLevel::Trace => (&TRACE_CS, &TRACE_META),
        LogLevel::Debug => (&DEBUG_CS, &DEBUG_META),
        LogLevel::Info => (&INFO_CS, &INFO_META),
        LogLevel::Warn => (&WARN_CS, &WARN_META),
        LogLevel::Error => (&ERROR_CS, &ERROR_META),
        LogLevel::Fatal => (&FATAL_CS, &FATAL_META),
    }
}

/// Whether `dispatch` wants a record from `component` at `level`
pub(crate) fn enabled(dispatch: &Dispatch, component: &str, level: LogLevel) -> bool {
    let (callsite, metadata) = callsite(level);
    let gate = Metadata::new(
        metadata.name(),
        component,
        *metadata.level(),
        None,
        None,
        None,
        FieldSet::new(FIELD_NAMES, identify_callsite!(callsite)),
        Kind::EVENT,
    );
    dispatch.enabled(&gate)
}

/// Hand `record` to `dispatch` as an event. The caller has already gated it.
pub(crate) fn dispatch(dispatch: &Dispatch, record: &LogRecord) {
    let (_, metadata) = callsite(record.level);
    let fields = metadata.fields();
    let (Some(message_field), Some(fields_field)) = (fields.field(MESSAGE_FIELD), fields.field(FIELDS_FIELD))
    else {
        return;
    };

    let message = record.message.as_str();
    let encoded = serde_json::to_string(&record.fields).unwrap_or_else(|_| String::from("{}"));
    let encoded = encoded.as_str();
    let values = [
        (&message_field, Some(&message as &dyn field::Value)),
        (&fields_field, Some(&encoded as &dyn field::Value)),
    ];

    dispatch.event(&Event::new(metadata, &fields.value_set(&values)));
}

/// Rebuilds a record from an event emitted by [`dispatch`]
#[derive(Default)]
pub(crate) struct RecordVisitor {
    message: String,
    fields: Fields,
}

impl RecordVisitor {
    pub(crate) fn decode(event: &Event<'_>) -> LogRecord {
        let mut visitor = Self::default();
        event.record(&mut visitor);
        LogRecord::new(LogLevel::from_metadata(event.metadata()), visitor.message).with_fields(visitor.fields)
    }
}

impl Visit for RecordVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        match field.name() {
            MESSAGE_FIELD => self.message = value.to_string(),
            FIELDS_FIELD => {
                if let Ok(Value::Object(fields)) = serde_json::from_str(value) {
                    self.fields = fields;
                }
            }
            _ => {}
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == MESSAGE_FIELD {
            self.message = format!("{value:?}");
        }
    }
}
