//! Core logging types

pub mod config;
pub mod level;
pub mod record;

pub use config::*;
pub use level::*;
pub use record::*;
