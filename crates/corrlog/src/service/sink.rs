//! Shared sink behind one or more loggers
//!
//! A sink owns the level gate and the list of destinations. Loggers derived
//! from one another (`with_field`, `with_correlation_id`, ...) all share the
//! same sink, so reconfiguring it is visible to every one of them.
//!
//! Levels are tracked per component: a default level plus an override table.
//! A record passes the gate when its level is at or above the effective level
//! of the component that emitted it.
//!
//! Underneath, a sink is a `tracing` subscriber of its own: a registry with
//! a [`ComponentFilter`] in front of one `fmt` layer per destination.
//! Records are handed to it directly, never through the global dispatcher.

use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, Dispatch};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::Registry;

use crate::domain::{LogFormat, LogLevel, LogRecord, LoggingConfig};
use crate::error::Result;
use crate::service::destination::{Destination, DynLayer};
use crate::service::event;
use crate::service::filter::{ComponentFilter, LevelTable};
use crate::service::formatter::{create_console_formatter, create_file_formatter};
use crate::service::rotation::{shared_writer, RotationPolicy};

/// What a sink falls back to when a config enables no destination
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// Keep writing to the console
    Console,
    /// Drop everything
    Discard,
}

/// Destinations and the subscriber built from them. Replaced as a whole.
struct Output {
    destinations: Vec<Arc<Destination>>,
    dispatch: Dispatch,
}

impl Output {
    fn new(levels: &Arc<RwLock<LevelTable>>, destinations: Vec<Arc<Destination>>) -> Self {
        let mut layers: Vec<Box<DynLayer<Registry>>> = Vec::with_capacity(destinations.len() + 1);
        layers.push(Box::new(ComponentFilter::new(levels.clone())));
        layers.extend(destinations.iter().map(|destination| destination.layer()));

        Self {
            destinations,
            dispatch: Dispatch::new(tracing_subscriber::registry().with(layers)),
        }
    }
}

pub struct Sink {
    levels: Arc<RwLock<LevelTable>>,
    // Lock order: `output` before `levels`
    output: RwLock<Output>,
}

impl Sink {
    /// Info level, text to the console
    pub fn new() -> Self {
        Self::with_destinations(LogLevel::Info, vec![Destination::console(LogFormat::Text)])
    }

    pub fn with_destinations(level: LogLevel, destinations: Vec<Destination>) -> Self {
        let levels = Arc::new(RwLock::new(LevelTable::new(level)));
        let output = Output::new(&levels, destinations.into_iter().map(Arc::new).collect());
        Self {
            levels,
            output: RwLock::new(output),
        }
    }

    /// Build a sink from a config
    pub fn from_config(config: &LoggingConfig, fallback: Fallback) -> Result<Self> {
        let destinations = build_destinations(config, fallback)?;
        Ok(Self::with_destinations(config.log_level(), destinations))
    }

    pub fn level(&self) -> LogLevel {
        self.levels.read().default
    }

    /// Set the default level used by components without an override
    pub fn set_level(&self, level: LogLevel) {
        self.levels.write().default = level;
    }

    pub fn set_component_level(&self, component: &str, level: LogLevel) {
        self.levels.write().components.insert(component.to_string(), level);
    }

    pub fn clear_component_level(&self, component: &str) {
        self.levels.write().components.remove(component);
    }

    /// Override for `component`, or the default level
    pub fn effective_level(&self, component: &str) -> LogLevel {
        self.levels.read().effective(component)
    }

    pub fn is_enabled(&self, component: &str, level: LogLevel) -> bool {
        event::enabled(&self.output.read().dispatch, component, level)
    }

    /// Snapshot of the current destinations
    pub fn destinations(&self) -> Vec<Arc<Destination>> {
        self.output.read().destinations.clone()
    }

    /// Replace every destination at once
    pub fn set_destinations(&self, destinations: Vec<Destination>) {
        let output = Output::new(&self.levels, destinations.into_iter().map(Arc::new).collect());
        *self.output.write() = output;
    }

    pub fn add_destination(&self, destination: Destination) {
        let mut current = self.output.write();
        let mut destinations = current.destinations.clone();
        destinations.push(Arc::new(destination));
        *current = Output::new(&self.levels, destinations);
    }

    /// Swap the default level and the destinations together. A record
    /// emitted concurrently sees either the old pair or the new one.
    pub fn reconfigure(&self, level: LogLevel, destinations: Vec<Destination>) {
        let output = Output::new(&self.levels, destinations.into_iter().map(Arc::new).collect());

        let mut current = self.output.write();
        self.levels.write().default = level;
        *current = output;
    }

    /// Apply a config in place: default level and destinations.
    ///
    /// Destinations are built before anything is swapped, so a failure
    /// (e.g. the log directory can't be created) leaves the sink as it was.
    pub fn apply_config(&self, config: &LoggingConfig, fallback: Fallback) -> Result<()> {
        let destinations = build_destinations(config, fallback)?;
        let level = config.log_level();

        debug!(
            "Applying logging config: level={} destinations={}",
            level,
            destinations.len()
        );

        self.reconfigure(level, destinations);
        Ok(())
    }

    /// Emit a record to every destination whose gate lets it through
    pub fn emit(&self, record: &LogRecord) {
        let output = self.output.read();
        if event::enabled(&output.dispatch, record.component().unwrap_or_default(), record.level) {
            event::dispatch(&output.dispatch, record);
        }
    }

    pub fn flush(&self) {
        for destination in self.destinations() {
            destination.flush();
        }
    }
}

impl Default for Sink {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("levels", &*self.levels.read())
            .field("destinations", &self.output.read().destinations)
            .finish()
    }
}

/// Destinations described by `config`
pub fn build_destinations(config: &LoggingConfig, fallback: Fallback) -> Result<Vec<Destination>> {
    let mut destinations = Vec::new();

    if config.console_enabled {
        destinations.push(Destination::console(create_console_formatter(&config.format)));
    }

    if let Some(path) = config.file_destination() {
        let writer = shared_writer(path, RotationPolicy::from_config(config))?;
        let format = create_file_formatter(&config.format, config.environment.as_deref());
        destinations.push(Destination::file(writer, format));
    }

    if destinations.is_empty() {
        destinations.push(match fallback {
            Fallback::Console => Destination::console(create_console_formatter(&config.format)),
            Fallback::Discard => Destination::discard(),
        });
    }

    Ok(destinations)
}
