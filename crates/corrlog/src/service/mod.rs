//! Logging services

pub mod bridge;
pub mod destination;
mod event;
pub mod factory;
pub mod filter;
pub mod formatter;
pub mod global;
pub mod logger;
pub mod rotation;
pub mod sink;

pub use bridge::*;
pub use destination::*;
pub use factory::*;
pub use filter::*;
pub use formatter::*;
pub use global::*;
pub use logger::*;
pub use rotation::*;
pub use sink::*;
