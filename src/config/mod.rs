//! Configuration management
//!
//! Defaults carry the values the session runs with out of the box. A TOML
//! file, if present, overrides any subset of them.

use crate::application::SessionOptions;
use crate::domain::account::AccountConfig;
use crate::domain::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub transport: TransportConfig,
    pub account: AccountConfig,
    pub session: SessionOptions,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    /// Load `path` over the defaults. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
        ::config::Config::builder()
            .add_source(::config::Config::try_from(&Config::default())?)
            .add_source(::config::File::from(path).required(false))
            .build()?
            .try_deserialize()
    }
}
