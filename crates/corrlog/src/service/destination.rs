//! Output destinations
//!
//! A destination describes one output: where records go and in which
//! format. The sink turns each destination into a `fmt` layer, so console
//! text and file JSON can be active at the same time.

use parking_lot::{Mutex, MutexGuard};
use std::fmt;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::warn;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::layer::{Identity, Layer};
use tracing_subscriber::Registry;

use crate::domain::LogFormat;
use crate::service::formatter::RecordFormat;
use crate::service::rotation::RotatingFileWriter;

/// Type alias for a boxed layer
pub type DynLayer<S> = dyn Layer<S> + Send + Sync + 'static;

/// What kind of target a destination writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationKind {
    Console,
    File,
    Writer,
    Discard,
}

enum Target {
    Console,
    File(Arc<RotatingFileWriter>),
    Writer(Arc<SharedWriter>),
    Discard,
}

/// One output target plus the format used for it
pub struct Destination {
    format: LogFormat,
    target: Target,
    failed: Arc<AtomicBool>,
}

impl Destination {
    fn new(format: LogFormat, target: Target) -> Self {
        Self {
            format,
            target,
            failed: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Standard output
    pub fn console(format: LogFormat) -> Self {
        Self::new(format, Target::Console)
    }

    /// Rotating file
    pub fn file(writer: Arc<RotatingFileWriter>, format: LogFormat) -> Self {
        Self::new(format, Target::File(writer))
    }

    /// Any caller-supplied writer
    pub fn writer<W>(writer: W, format: LogFormat) -> Self
    where
        W: Write + Send + 'static,
    {
        Self::new(format, Target::Writer(Arc::new(SharedWriter(Mutex::new(Box::new(writer))))))
    }

    /// Accepts every record and keeps nothing
    pub fn discard() -> Self {
        Self::new(LogFormat::Text, Target::Discard)
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn kind(&self) -> DestinationKind {
        match self.target {
            Target::Console => DestinationKind::Console,
            Target::File(_) => DestinationKind::File,
            Target::Writer(_) => DestinationKind::Writer,
            Target::Discard => DestinationKind::Discard,
        }
    }

    /// Rotating writer behind a file destination
    pub fn file_writer(&self) -> Option<&Arc<RotatingFileWriter>> {
        match &self.target {
            Target::File(writer) => Some(writer),
            _ => None,
        }
    }

    /// Whether a write to this destination has failed
    pub fn has_failed(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }

    /// `fmt` layer writing to this destination
    pub(crate) fn layer(&self) -> Box<DynLayer<Registry>> {
        let layer = tracing_subscriber::fmt::layer::<Registry>()
            .event_format(RecordFormat::new(self.format))
            .with_ansi(false)
            .log_internal_errors(false);

        let kind = self.kind();
        let failed = self.failed.clone();
        match &self.target {
            Target::Console => Box::new(layer.with_writer(Reported::new(Arc::new(io::stdout), kind, failed))),
            Target::File(writer) => Box::new(layer.with_writer(Reported::new(writer.clone(), kind, failed))),
            Target::Writer(writer) => Box::new(layer.with_writer(Reported::new(writer.clone(), kind, failed))),
            Target::Discard => Box::new(Identity::new()),
        }
    }

    pub fn flush(&self) {
        let result = match &self.target {
            Target::Console => io::stdout().flush(),
            Target::File(writer) => writer.flush(),
            Target::Writer(writer) => writer.0.lock().flush(),
            Target::Discard => Ok(()),
        };

        if let Err(e) = result {
            report_failure(self.kind(), &self.failed, &e);
        }
    }
}

impl fmt::Debug for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut debug = f.debug_struct("Destination");
        debug.field("kind", &self.kind()).field("format", &self.format);
        if let Some(writer) = self.file_writer() {
            debug.field("path", &writer.path());
        }
        debug.finish()
    }
}

fn report_failure(kind: DestinationKind, failed: &AtomicBool, error: &io::Error) {
    if !failed.swap(true, Ordering::Relaxed) {
        warn!("Log destination {:?} failed, further errors suppressed: {}", kind, error);
    }
}

/// Caller-supplied writer, locked for the length of one record
struct SharedWriter(Mutex<Box<dyn Write + Send>>);

impl<'a> MakeWriter<'a> for SharedWriter {
    type Writer = SharedWriterGuard<'a>;

    fn make_writer(&'a self) -> Self::Writer {
        SharedWriterGuard(self.0.lock())
    }
}

struct SharedWriterGuard<'a>(MutexGuard<'a, Box<dyn Write + Send>>);

impl Write for SharedWriterGuard<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0.flush()
    }
}

/// Wraps a destination's writer so write failures are reported once and
/// otherwise swallowed
struct Reported<M> {
    inner: Arc<M>,
    kind: DestinationKind,
    failed: Arc<AtomicBool>,
}

impl<M> Reported<M> {
    fn new(inner: Arc<M>, kind: DestinationKind, failed: Arc<AtomicBool>) -> Self {
        Self { inner, kind, failed }
    }
}

impl<'a, M> MakeWriter<'a> for Reported<M>
where
    M: MakeWriter<'a> + 'a,
{
    type Writer = ReportedWriter<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        ReportedWriter {
            inner: M::make_writer(&self.inner),
            kind: self.kind,
            failed: &self.failed,
        }
    }
}

struct ReportedWriter<'a, W> {
    inner: W,
    kind: DestinationKind,
    failed: &'a AtomicBool,
}

impl<W: Write> Write for ReportedWriter<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.write(buf).map_err(|e| {
            report_failure(self.kind, self.failed, &e);
            e
        })
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush().map_err(|e| {
            report_failure(self.kind, self.failed, &e);
            e
        })
    }
}
