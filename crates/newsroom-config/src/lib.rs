//! Configuration system for newsroom.
//!
//! Provides TOML-based configuration with:
//! - Config file layering (user config dir + project-local overrides)
//! - Environment variable overrides for secrets and deployment settings
//! - Strict parsing: unknown keys are errors

pub mod discovery;
pub mod error;
pub mod types;

/// Application name for platform directory resolution.
pub const APP_NAME: &str = "newsroom";

pub use discovery::{
    ConfigSource, LoadedConfig, apply_env_overrides, load_config, load_config_file,
    load_config_with, user_config_dir,
};
pub use error::{ConfigError, Result};
pub use types::*;
