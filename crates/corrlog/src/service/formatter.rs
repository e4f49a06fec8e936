//! Record formatting (text and JSON lines)
//!
//! [`RecordFormat`] is the event formatter every destination layer runs.
//! Timestamps come from the layer's timer at format time.

use serde_json::{Map, Value};
use std::borrow::Cow;
use std::fmt::{self, Write as _};
use tracing::{Event, Subscriber};
use tracing_subscriber::fmt::format::{FormatEvent, FormatFields, Writer};
use tracing_subscriber::fmt::time::{ChronoUtc, FormatTime};
use tracing_subscriber::fmt::FmtContext;
use tracing_subscriber::registry::LookupSpan;

use crate::domain::{LogFormat, LogRecord, PRODUCTION_ENVIRONMENT};
use crate::service::event::RecordVisitor;

const TIME_KEY: &str = "time";
const LEVEL_KEY: &str = "level";
const MESSAGE_KEY: &str = "msg";

/// RFC 3339, UTC, millisecond precision
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

/// Formatter for console destinations
pub fn create_console_formatter(format: &str) -> LogFormat {
    LogFormat::from_name(format)
}

/// Formatter for file destinations.
///
/// A production environment always gets JSON, whatever `format` says.
pub fn create_file_formatter(format: &str, environment: Option<&str>) -> LogFormat {
    let production = environment
        .is_some_and(|env| env.trim().eq_ignore_ascii_case(PRODUCTION_ENVIRONMENT));
    if production {
        LogFormat::Json
    } else {
        LogFormat::from_name(format)
    }
}

/// Event formatter writing one record per line in a [`LogFormat`]
#[derive(Debug, Clone)]
pub struct RecordFormat {
    format: LogFormat,
    timer: ChronoUtc,
}

impl RecordFormat {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            timer: ChronoUtc::new(TIME_FORMAT.to_string()),
        }
    }
}

impl<S, N> FormatEvent<S, N> for RecordFormat
where
    S: Subscriber + for<'a> LookupSpan<'a>,
    N: for<'a> FormatFields<'a> + 'static,
{
    fn format_event(
        &self,
        _ctx: &FmtContext<'_, S, N>,
        mut writer: Writer<'_>,
        event: &Event<'_>,
    ) -> fmt::Result {
        let mut time = String::new();
        self.timer.format_time(&mut Writer::new(&mut time))?;

        let record = RecordVisitor::decode(event);
        writer.write_str(&self.format.render(&time, &record))
    }
}

impl LogFormat {
    /// Render one record as a single newline-terminated line
    pub(crate) fn render(&self, time: &str, record: &LogRecord) -> String {
        match self {
            Self::Text => format_text(time, record),
            Self::Json => format_json(time, record),
        }
    }
}

/// `time=... level=info msg="..." key=value ...`
fn format_text(time: &str, record: &LogRecord) -> String {
    let mut line = String::with_capacity(128);
    push_pair(&mut line, TIME_KEY, time);
    line.push(' ');
    push_pair(&mut line, LEVEL_KEY, record.level.as_str());
    line.push(' ');
    push_pair(&mut line, MESSAGE_KEY, &record.message);

    for (key, value) in &record.fields {
        line.push(' ');
        match value {
            Value::String(s) => push_pair(&mut line, &text_key(key), s),
            other => push_pair(&mut line, &text_key(key), &other.to_string()),
        }
    }

    line.push('\n');
    line
}

fn push_pair(line: &mut String, key: &str, value: &str) {
    line.push_str(key);
    line.push('=');
    if needs_quoting(value) {
        line.push_str(&format!("{value:?}"));
    } else {
        line.push_str(value);
    }
}

/// Characters that end a bare key or value
fn is_separator(c: char) -> bool {
    c.is_whitespace() || c == '=' || c == '"'
}

fn needs_quoting(s: &str) -> bool {
    s.is_empty() || s.chars().any(is_separator)
}

/// Keys are never quoted, so separators in a key become `_`
fn text_key(key: &str) -> Cow<'_, str> {
    if key.is_empty() {
        Cow::Borrowed("_")
    } else if key.chars().any(is_separator) {
        Cow::Owned(
            key.chars()
                .map(|c| if is_separator(c) { '_' } else { c })
                .collect(),
        )
    } else {
        Cow::Borrowed(key)
    }
}

/// One JSON object per line. Fields that collide with `time`, `level` or
/// `msg` are kept under `fields.<key>`.
fn format_json(time: &str, record: &LogRecord) -> String {
    let mut object = Map::with_capacity(record.fields.len() + 3);
    object.insert(TIME_KEY.to_string(), Value::from(time));
    object.insert(LEVEL_KEY.to_string(), Value::from(record.level.as_str()));
    object.insert(MESSAGE_KEY.to_string(), Value::from(record.message.as_str()));

    for (key, value) in &record.fields {
        let key = if matches!(key.as_str(), TIME_KEY | LEVEL_KEY | MESSAGE_KEY) {
            format!("fields.{key}")
        } else {
            key.clone()
        };
        object.insert(key, value.clone());
    }

    let mut line = Value::Object(object).to_string();
    line.push('\n');
    line
}
