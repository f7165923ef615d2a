//! WebPilot library
//!
//! Exposes the configuration loader, application context and CLI for
//! integration testing.

pub mod app_context;
pub mod cli;
pub mod config;

pub use app_context::AppContext;
pub use config::{AppConfig, ConfigError, DriverKind, LoadOptions, LoadedConfig};
