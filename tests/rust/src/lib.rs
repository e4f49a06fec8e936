//! Shared test utilities and fixtures for Corrlog integration tests.

use corrlog::{Destination, LogFormat, LogLevel, Logger, Sink};
use parking_lot::Mutex;
use serde_json::Value;
use std::io::{self, Write};
use std::sync::Arc;

/// In-memory writer that can be handed to a destination and read back
#[derive(Clone, Default)]
pub struct CaptureWriter {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CaptureWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buffer.lock()).into_owned()
    }

    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }

    /// Written lines decoded as JSON records
    pub fn json_records(&self) -> Vec<Value> {
        self.lines()
            .iter()
            .map(|line| serde_json::from_str(line).expect("record is not valid JSON"))
            .collect()
    }
}

impl Write for CaptureWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.buffer.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Logger whose only destination is an in-memory JSON capture
pub fn capturing_logger(component: &str, level: LogLevel) -> (Logger, CaptureWriter) {
    let capture = CaptureWriter::new();
    let sink = Sink::with_destinations(level, vec![Destination::writer(capture.clone(), LogFormat::Json)]);
    (Logger::with_sink(Arc::new(sink), component), capture)
}

/// Read every line of a file as JSON records
pub fn read_json_records(path: &std::path::Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .expect("log file missing")
        .lines()
        .map(|line| serde_json::from_str(line).expect("record is not valid JSON"))
        .collect()
}
