//! Configuration management for catn
//!
//! Settings are layered, later layers overriding earlier ones:
//!
//! 1. Built-in defaults
//! 2. A YAML, TOML or JSON file
//! 3. `CATN_`-prefixed environment variables, `__` separating nested keys
//!    (`CATN_TRANSFER__IDLE_TIMEOUT=5`)
//!
//! Command-line values are applied by the caller on top of the result.
//!
//! # Examples
//!
//! ```rust,no_run
//! use catn_config::ConfigBuilder;
//!
//! let config = ConfigBuilder::new()
//!     .add_defaults()
//!     .add_source_file("catn0.yaml")
//!     .add_env_prefix("CATN")
//!     .build()
//!     .expect("Failed to load configuration");
//!
//! println!("Chunk size: {}", config.transfer.chunk_size.get());
//! ```

#![deny(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

use catn_types::TransferOptions;
use serde::{Deserialize, Serialize};

pub mod builder;
pub mod error;
pub mod loader;

pub use builder::ConfigBuilder;
pub use error::{ConfigError, ConfigResult};
pub use loader::ConfigLoader;

/// Main configuration structure for catn
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatnConfig {
    /// Transfer behaviour
    pub transfer: TransferOptions,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level
    pub level: String,
    /// Enable JSON formatting
    pub json_format: bool,
    /// Colored log output, only honoured when stderr is a terminal
    pub colored_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            json_format: false,
            colored_output: true,
        }
    }
}
