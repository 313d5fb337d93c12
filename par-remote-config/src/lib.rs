//! Configuration system for par-remote.
//!
//! This crate provides configuration loading, saving, and default values
//! for the remote session layer. It includes:
//!
//! - Gateway address settings
//! - Viewport scaling and dynamic-resize timing
//! - Synthetic key sequence settle delays
//! - Clipboard stream limits
//! - Preview polling and text-session cell metrics

pub mod config;
pub mod defaults;
pub mod error;
mod types;

// Re-export main types for convenience
pub use config::{
    ClipboardConfig, Config, GatewayConfig, InputConfig, PreviewConfig, SessionConfig,
    TextSessionConfig, ViewportConfig,
};
pub use error::ConfigError;
pub use types::LogLevel;
