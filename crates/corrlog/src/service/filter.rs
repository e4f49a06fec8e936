//! Per-component level filter
//!
//! Record events carry their component as the metadata target. The filter
//! looks the component up by exact name: an override for `auth` does not
//! govern `auth-v2`, unlike `Targets`/`EnvFilter` prefix matching.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{Metadata, Subscriber};
use tracing_core::subscriber::Interest;
use tracing_subscriber::layer::{Context, Layer};

use crate::domain::LogLevel;

/// Default level plus per-component overrides
#[derive(Debug, Clone, Default)]
pub struct LevelTable {
    pub default: LogLevel,
    pub components: HashMap<String, LogLevel>,
}

impl LevelTable {
    pub fn new(default: LogLevel) -> Self {
        Self {
            default,
            components: HashMap::new(),
        }
    }

    /// Override for `component`, or the default level
    pub fn effective(&self, component: &str) -> LogLevel {
        self.components.get(component).copied().unwrap_or(self.default)
    }
}

/// Layer that enables a record only when its level passes the effective
/// level of its component. The table is shared with the owning sink, so
/// level changes apply without rebuilding the subscriber.
#[derive(Debug, Clone)]
pub struct ComponentFilter {
    levels: Arc<RwLock<LevelTable>>,
}

impl ComponentFilter {
    pub fn new(levels: Arc<RwLock<LevelTable>>) -> Self {
        Self { levels }
    }
}

impl<S> Layer<S> for ComponentFilter
where
    S: Subscriber,
{
    // Levels change at runtime, so no callsite is ever cached as always/never.
    fn register_callsite(&self, _metadata: &'static Metadata<'static>) -> Interest {
        Interest::sometimes()
    }

    fn enabled(&self, metadata: &Metadata<'_>, _ctx: Context<'_, S>) -> bool {
        self.levels
            .read()
            .effective(metadata.target())
            .allows(LogLevel::from_metadata(metadata))
    }
}
