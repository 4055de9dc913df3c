//! Configuration types mapping to the TOML schema.
//!
//! ```toml
//! [llm]        # model providers and sampling
//! [server]     # bind address and admin credentials
//! [database]   # SQLite file
//! [retrieval]  # retry policy and fan-out
//! [cleanup]    # orphaned thread sweeper
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::{ConfigError, Result};

pub const DEFAULT_MODEL: &str = "llama3.2:latest";
pub const DEFAULT_OLLAMA_BASE_URL: &str = "http://localhost:11434/v1";
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const DEFAULT_DB_FILE: &str = "newsroom.db";

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// Every section is optional so that partial files can be layered; use the
/// accessors to read a section with defaults filled in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NewsroomConfig {
    pub llm: Option<LlmConfig>,
    pub server: Option<ServerConfig>,
    pub database: Option<DatabaseConfig>,
    pub retrieval: Option<RetrievalConfig>,
    pub cleanup: Option<CleanupConfig>,
}

impl NewsroomConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: NewsroomConfig) {
        if other.llm.is_some() {
            self.llm = other.llm;
        }
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.database.is_some() {
            self.database = other.database;
        }
        if other.retrieval.is_some() {
            self.retrieval = other.retrieval;
        }
        if other.cleanup.is_some() {
            self.cleanup = other.cleanup;
        }
    }

    pub fn llm(&self) -> LlmConfig {
        self.llm.clone().unwrap_or_default()
    }

    pub fn server(&self) -> ServerConfig {
        self.server.clone().unwrap_or_default()
    }

    pub fn database(&self) -> DatabaseConfig {
        self.database.clone().unwrap_or_default()
    }

    pub fn retrieval(&self) -> RetrievalConfig {
        self.retrieval.clone().unwrap_or_default()
    }

    pub fn cleanup(&self) -> CleanupConfig {
        self.cleanup.clone().unwrap_or_default()
    }

    /// Reject values that parse but cannot work.
    pub fn validate(&self) -> Result<()> {
        let llm = self.llm();
        if !(0.0..=2.0).contains(&llm.temperature) {
            return Err(ConfigError::invalid(
                "llm.temperature",
                "must be between 0 and 2",
            ));
        }
        if llm.max_tokens == 0 {
            return Err(ConfigError::invalid("llm.max_tokens", "must be positive"));
        }

        self.server().bind_addr()?;

        let retrieval = self.retrieval();
        if retrieval.max_attempts == 0 {
            return Err(ConfigError::invalid(
                "retrieval.max_attempts",
                "must be at least 1",
            ));
        }
        if retrieval.max_workers == 0 {
            return Err(ConfigError::invalid(
                "retrieval.max_workers",
                "must be at least 1",
            ));
        }

        if self.cleanup().interval_secs == 0 {
            return Err(ConfigError::invalid(
                "cleanup.interval_secs",
                "must be positive",
            ));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LLM
// ─────────────────────────────────────────────────────────────────────────────

/// Model provider settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LlmConfig {
    /// Enables the hosted models when set.
    pub openai_api_key: Option<String>,
    pub openai_base_url: Option<String>,
    pub ollama_base_url: String,
    /// Wire name of the model used when a request names none.
    pub default_model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            openai_api_key: None,
            openai_base_url: None,
            ollama_base_url: DEFAULT_OLLAMA_BASE_URL.to_string(),
            default_model: DEFAULT_MODEL.to_string(),
            temperature: 0.0,
            max_tokens: 4096,
            timeout_secs: 120,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub bind: String,
    pub admin_username: String,
    pub admin_password: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            admin_username: "admin".to_string(),
            admin_password: "admin".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        self.bind
            .parse()
            .map_err(|e| ConfigError::invalid("server.bind", format!("{}: {e}", self.bind)))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Database
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatabaseConfig {
    /// SQLite file. Defaults to `newsroom.db` in the platform data directory.
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    pub fn resolved_path(&self) -> PathBuf {
        match &self.path {
            Some(path) => path.clone(),
            None => dirs::data_dir()
                .map(|d| d.join(crate::APP_NAME).join(DEFAULT_DB_FILE))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_FILE)),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Retrieval
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalConfig {
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    /// Size of the process-wide retrieval worker pool.
    pub max_workers: usize,
    /// Items requested from each search backend.
    pub max_results: usize,
    pub request_timeout_secs: u64,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 1000,
            max_workers: 8,
            max_results: 5,
            request_timeout_secs: 15,
        }
    }
}

impl RetrievalConfig {
    pub fn initial_delay(&self) -> Duration {
        Duration::from_millis(self.initial_delay_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cleanup
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CleanupConfig {
    pub enabled: bool,
    pub interval_secs: u64,
    /// Ownerless threads older than this are deleted.
    pub orphan_max_age_secs: u64,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: 3600,
            orphan_max_age_secs: 3600,
        }
    }
}

impl CleanupConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn orphan_max_age(&self) -> Duration {
        Duration::from_secs(self.orphan_max_age_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_defaults() {
        let config = NewsroomConfig::from_toml("").unwrap();
        assert_eq!(config, NewsroomConfig::default());
        assert_eq!(config.llm().default_model, DEFAULT_MODEL);
        assert_eq!(config.llm().temperature, 0.0);
        assert_eq!(config.server().bind, DEFAULT_BIND);
        assert_eq!(config.retrieval().max_attempts, 3);
        assert_eq!(config.retrieval().initial_delay(), Duration::from_secs(1));
        assert_eq!(config.cleanup().interval(), Duration::from_secs(3600));
        config.validate().unwrap();
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let config = NewsroomConfig::from_toml(
            r#"
            [retrieval]
            max_workers = 2
            "#,
        )
        .unwrap();
        let retrieval = config.retrieval();
        assert_eq!(retrieval.max_workers, 2);
        assert_eq!(retrieval.max_results, 5);
    }

    #[test]
    fn test_unknown_keys_rejected() {
        assert!(NewsroomConfig::from_toml("[llm]\nmodel = \"x\"").is_err());
        assert!(NewsroomConfig::from_toml("[plugins]\nenabled = true").is_err());
    }

    #[test]
    fn test_merge_replaces_whole_sections() {
        let mut base = NewsroomConfig::from_toml(
            r#"
            [server]
            bind = "0.0.0.0:9000"
            admin_password = "s3cret"

            [cleanup]
            interval_secs = 60
            "#,
        )
        .unwrap();
        let overlay = NewsroomConfig::from_toml(
            r#"
            [server]
            bind = "127.0.0.1:7000"
            "#,
        )
        .unwrap();
        base.merge(overlay);

        assert_eq!(base.server().bind, "127.0.0.1:7000");
        assert_eq!(base.server().admin_password, "admin");
        assert_eq!(base.cleanup().interval_secs, 60);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad_bind = NewsroomConfig::from_toml("[server]\nbind = \"nowhere\"").unwrap();
        assert!(matches!(
            bad_bind.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));

        let zero_attempts = NewsroomConfig::from_toml("[retrieval]\nmax_attempts = 0").unwrap();
        assert!(zero_attempts.validate().is_err());

        let hot = NewsroomConfig::from_toml("[llm]\ntemperature = 3.5").unwrap();
        assert!(hot.validate().is_err());
    }

    #[test]
    fn test_database_path() {
        let explicit = DatabaseConfig {
            path: Some(PathBuf::from("/tmp/x.db")),
        };
        assert_eq!(explicit.resolved_path(), PathBuf::from("/tmp/x.db"));
        assert!(
            DatabaseConfig::default()
                .resolved_path()
                .ends_with(DEFAULT_DB_FILE)
        );
    }
}
