//! # herald-common
//!
//! Shared utilities: bus configuration loaded from the environment and
//! telemetry setup.

pub mod config;
pub mod telemetry;

// Re-export commonly used types at crate root
pub use config::{BusBackend, BusConfig, ConfigError, OverflowStrategy, ReplayLimitSetting};
pub use telemetry::{
    init_tracing, init_tracing_with_config, try_init_tracing, try_init_tracing_with_config,
    LogFormat, TracingConfig, TracingError,
};
