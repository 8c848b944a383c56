//! CutKit Settings Crate
//!
//! Handles configuration loading, validation, and persistence.

pub mod config;
pub mod error;

pub use config::{Config, ExecutionSettings, GeometrySettings};
pub use error::{Result, SettingsError};
