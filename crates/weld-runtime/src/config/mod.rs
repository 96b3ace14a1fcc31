//! Configuration module for the Weld host.
//!
//! Provides figment-based configuration loading and validation for the
//! pipeline, the transport binding, drain behavior and logging.

pub mod error;
pub mod loader;
pub mod schema;
pub mod validation;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, Profile};
pub use schema::{
    LogFormat, LogLevel, LogOutput, LoggingConfig, PipelineConfig, ShutdownConfig,
    SpanEventConfig, TransportConfig, WeldConfig,
};
pub use validation::validate_config;
