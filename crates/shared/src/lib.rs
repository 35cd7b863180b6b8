//! Shared library for the MangaDex client workspace.
//!
//! This crate provides common functionality used across the workspace:
//! - Configuration management
//! - Normalized record models
//! - Logging infrastructure

pub mod config;
pub mod logging;
pub mod models;

// Re-export commonly used types
pub use config::{Config, PreferencesConfig};
pub use logging::LogConfig;
pub use models::*;

/// Common result type using anyhow::Error
pub type Result<T> = anyhow::Result<T>;
