//! Size-based rotating log file
//!
//! The active file keeps its configured name. When the next line would push
//! it past the size limit, it is renamed to `<stem>-<timestamp>.<ext>`,
//! gzip-compressed, and a fresh file is opened in its place. Backups beyond
//! the configured count, or older than the age cutoff, are removed.
//!
//! All of this happens under the writer's mutex, so concurrent emitters
//! never interleave partial lines or write into a file being renamed.

use chrono::NaiveDateTime;
use flate2::write::GzEncoder;
use flate2::Compression;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock, Weak};
use std::time::{Duration, SystemTime};
use tracing::{debug, info, warn};
use tracing_subscriber::fmt::MakeWriter;

use crate::domain::{LoggingConfig, MAX_BACKUP_AGE_DAYS};
use crate::error::{LoggingError, Result};

/// Timestamp embedded in backup names
const BACKUP_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H-%M-%S%.9f";

/// Rotation settings for one file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationPolicy {
    /// Rotate before a write would exceed this many bytes; 0 never rotates
    pub max_size: u64,

    /// Rotated files to keep; 0 keeps all
    pub max_backups: usize,

    /// Rotated files older than this are removed
    pub max_age: Duration,

    /// Gzip rotated files
    pub compress: bool,
}

impl RotationPolicy {
    pub fn from_config(config: &LoggingConfig) -> Self {
        Self {
            max_size: config.max_file_size_bytes(),
            max_backups: config.backup_count,
            ..Self::default()
        }
    }
}

impl Default for RotationPolicy {
    fn default() -> Self {
        Self {
            max_size: crate::domain::DEFAULT_MAX_FILE_SIZE_MB * 1024 * 1024,
            max_backups: crate::domain::DEFAULT_BACKUP_COUNT,
            max_age: Duration::from_secs(MAX_BACKUP_AGE_DAYS * 24 * 60 * 60),
            compress: true,
        }
    }
}

/// Rotating file writer shared by every destination that targets the same path
#[derive(Debug)]
pub struct RotatingFileWriter {
    path: PathBuf,
    state: Mutex<WriterState>,
}

#[derive(Debug)]
struct WriterState {
    file: File,
    size: u64,
    policy: RotationPolicy,
}

impl RotatingFileWriter {
    /// Open (or create) the file at `path`, creating its directory if needed
    pub fn open(path: impl Into<PathBuf>, policy: RotationPolicy) -> Result<Self> {
        let path = path.into();

        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| LoggingError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }

        let file = open_append(&path).map_err(|source| LoggingError::OpenFile {
            path: path.clone(),
            source,
        })?;
        let size = file.metadata().map(|m| m.len()).unwrap_or(0);

        debug!("Opened log file {:?} ({} bytes)", path, size);

        Ok(Self {
            path,
            state: Mutex::new(WriterState { file, size, policy }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn policy(&self) -> RotationPolicy {
        self.state.lock().policy
    }

    pub fn set_policy(&self, policy: RotationPolicy) {
        self.state.lock().policy = policy;
    }

    /// Append one complete line, rotating first if it would not fit
    pub fn write_line(&self, line: &[u8]) -> io::Result<()> {
        let mut state = self.state.lock();
        let line_len = line.len() as u64;

        if state.policy.max_size > 0 && state.size > 0 && state.size + line_len > state.policy.max_size {
            self.rotate(&mut state)?;
        }

        state.file.write_all(line)?;
        state.size += line_len;
        Ok(())
    }

    pub fn flush(&self) -> io::Result<()> {
        self.state.lock().file.flush()
    }

    /// Force a rotation now, regardless of size
    pub fn rotate_now(&self) -> Result<()> {
        let mut state = self.state.lock();
        self.rotate(&mut state).map_err(|source| LoggingError::Rotate {
            path: self.path.clone(),
            source,
        })
    }

    fn rotate(&self, state: &mut WriterState) -> io::Result<()> {
        info!("Rotating log file {:?}", self.path);

        state.file.flush()?;

        let rotated_path = self.backup_path();
        std::fs::rename(&self.path, &rotated_path)?;

        state.file = open_append(&self.path)?;
        state.size = 0;

        if state.policy.compress {
            if let Err(e) = compress_log_file(&rotated_path) {
                warn!("Failed to compress log file {:?}: {}", rotated_path, e);
            }
        }

        if let Err(e) = self.cleanup_old_files(&state.policy) {
            warn!("Failed to prune rotated logs for {:?}: {}", self.path, e);
        }

        Ok(())
    }

    fn stem_and_ext(&self) -> (String, Option<String>) {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self.path.extension().map(|e| e.to_string_lossy().into_owned());
        (stem, ext)
    }

    fn backup_path(&self) -> PathBuf {
        let (stem, ext) = self.stem_and_ext();
        let timestamp = chrono::Utc::now().format(BACKUP_TIMESTAMP_FORMAT).to_string();
        let dir = self.path.parent().unwrap_or_else(|| Path::new(""));

        let name_for = |suffix: String| match &ext {
            Some(ext) => format!("{stem}-{timestamp}{suffix}.{ext}"),
            None => format!("{stem}-{timestamp}{suffix}"),
        };

        let mut candidate = dir.join(name_for(String::new()));
        let mut n = 1;
        while candidate.exists() || gz_path(&candidate).exists() {
            candidate = dir.join(name_for(format!("_{n}")));
            n += 1;
        }
        candidate
    }

    /// Rotated files for this writer, oldest first.
    ///
    /// Only names this writer produces count: `<stem>-<timestamp>[_n].<ext>`,
    /// optionally `.gz`, with a timestamp that parses back. Anything else in
    /// the directory is left alone.
    pub fn backups(&self) -> io::Result<Vec<PathBuf>> {
        let dir = match self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => PathBuf::from("."),
        };

        let mut backups = Vec::new();
        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path == self.path {
                continue;
            }
            let Some(key) = path
                .file_name()
                .and_then(|n| n.to_str())
                .and_then(|name| self.parse_backup_name(name))
            else {
                continue;
            };
            backups.push((key, path));
        }

        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Rotation time and collision counter encoded in a backup name
    fn parse_backup_name(&self, name: &str) -> Option<(NaiveDateTime, u32)> {
        let (stem, ext) = self.stem_and_ext();
        let name = name.strip_suffix(".gz").unwrap_or(name);
        let rest = name.strip_prefix(stem.as_str())?.strip_prefix('-')?;
        let rest = match &ext {
            Some(ext) => rest.strip_suffix(ext.as_str())?.strip_suffix('.')?,
            None => rest,
        };

        let (timestamp, n) = match rest.split_once('_') {
            Some((timestamp, n)) if !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()) => {
                (timestamp, n.parse().ok()?)
            }
            Some(_) => return None,
            None => (rest, 0),
        };

        let time = NaiveDateTime::parse_from_str(timestamp, BACKUP_TIMESTAMP_FORMAT).ok()?;
        Some((time, n))
    }

    fn cleanup_old_files(&self, policy: &RotationPolicy) -> io::Result<()> {
        let now = SystemTime::now();
        let mut kept = Vec::new();

        for path in self.backups()? {
            let expired = std::fs::metadata(&path)
                .and_then(|m| m.modified())
                .ok()
                .and_then(|modified| now.duration_since(modified).ok())
                .is_some_and(|age| age > policy.max_age);

            if expired {
                remove_backup(&path);
            } else {
                kept.push(path);
            }
        }

        if policy.max_backups > 0 && kept.len() > policy.max_backups {
            let to_remove = kept.len() - policy.max_backups;
            for path in kept.iter().take(to_remove) {
                remove_backup(path);
            }
        }

        Ok(())
    }
}

/// Each write is one formatted record, so size checks happen per record
impl Write for &RotatingFileWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.write_line(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        RotatingFileWriter::flush(self)
    }
}

impl<'a> MakeWriter<'a> for RotatingFileWriter {
    type Writer = &'a RotatingFileWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

fn gz_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".gz");
    PathBuf::from(name)
}

fn remove_backup(path: &Path) {
    if let Err(e) = std::fs::remove_file(path) {
        warn!("Failed to remove old log file {:?}: {}", path, e);
    } else {
        debug!("Removed old log file: {:?}", path);
    }
}

/// Compress a rotated log file using gzip, replacing the original
fn compress_log_file(path: &Path) -> io::Result<()> {
    let target = gz_path(path);
    let content = std::fs::read(path)?;

    let file = File::create(&target)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(&content)?;
    encoder.finish()?;

    std::fs::remove_file(path)?;

    debug!("Compressed log file: {:?} -> {:?}", path, target);
    Ok(())
}

fn open_writers() -> &'static Mutex<HashMap<PathBuf, Weak<RotatingFileWriter>>> {
    static OPEN_WRITERS: OnceLock<Mutex<HashMap<PathBuf, Weak<RotatingFileWriter>>>> = OnceLock::new();
    OPEN_WRITERS.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Writer for `path`, shared with every other live destination on the same
/// file. The newest policy wins when an existing writer is reused.
pub fn shared_writer(path: &Path, policy: RotationPolicy) -> Result<Arc<RotatingFileWriter>> {
    let key = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    };

    let mut writers = open_writers().lock();
    writers.retain(|_, writer| writer.strong_count() > 0);

    if let Some(writer) = writers.get(&key).and_then(Weak::upgrade) {
        writer.set_policy(policy);
        return Ok(writer);
    }

    let writer = Arc::new(RotatingFileWriter::open(path, policy)?);
    writers.insert(key, Arc::downgrade(&writer));
    Ok(writer)
}
