//! Config file discovery, layered merging and environment overrides.
//!
//! Resolution order (later overrides earlier):
//! 1. `<config dir>/newsroom/config.toml` (or `$NEWSROOM_CONFIG_DIR/config.toml`)
//! 2. `./newsroom.toml` (project-local)
//! 3. Environment variables
//! 4. CLI arguments (handled externally)

use std::path::{Path, PathBuf};

use crate::{ConfigError, NewsroomConfig, Result};

/// Default config filename for project-local config.
const PROJECT_CONFIG_FILE: &str = "newsroom.toml";

/// Default config filename within the user config directory.
const USER_CONFIG_FILE: &str = "config.toml";

/// Environment variable to override the config directory.
const CONFIG_DIR_ENV: &str = "NEWSROOM_CONFIG_DIR";

/// Tracks where each config layer was loaded from.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    pub path: PathBuf,
    /// Whether the file was found and loaded.
    pub loaded: bool,
}

/// Result of config discovery and loading.
#[derive(Debug, Clone)]
pub struct LoadedConfig {
    /// The merged configuration, environment applied.
    pub config: NewsroomConfig,
    /// Sources that were checked, lowest precedence first.
    pub sources: Vec<ConfigSource>,
    /// Environment variables that overrode a value.
    pub env_overrides: Vec<&'static str>,
}

impl LoadedConfig {
    /// Paths of sources that were actually loaded.
    pub fn loaded_from(&self) -> Vec<&Path> {
        self.sources
            .iter()
            .filter(|s| s.loaded)
            .map(|s| s.path.as_path())
            .collect()
    }
}

/// Load configuration from the default locations and the process
/// environment.
pub fn load_config(config_dir: Option<&Path>) -> Result<LoadedConfig> {
    load_config_with(config_dir, None, |key| std::env::var(key).ok())
}

/// Load configuration with explicit directories and environment lookup.
///
/// `config_dir` overrides both `NEWSROOM_CONFIG_DIR` and the platform
/// default; `project_dir` defaults to the working directory.
pub fn load_config_with(
    config_dir: Option<&Path>,
    project_dir: Option<&Path>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<LoadedConfig> {
    let mut config = NewsroomConfig::new();
    let mut sources = Vec::new();

    let user_config_path = match config_dir {
        Some(dir) => Some(dir.join(USER_CONFIG_FILE)),
        None => user_config_dir().map(|d| d.join(USER_CONFIG_FILE)),
    };
    if let Some(path) = user_config_path {
        sources.push(load_layer(&mut config, &path)?);
    }

    let project_path = project_dir
        .map(|d| d.join(PROJECT_CONFIG_FILE))
        .unwrap_or_else(|| PathBuf::from(PROJECT_CONFIG_FILE));
    sources.push(load_layer(&mut config, &project_path)?);

    let env_overrides = apply_env_overrides(&mut config, env);
    config.validate()?;

    for source in sources.iter().filter(|s| s.loaded) {
        tracing::debug!(path = %source.path.display(), "loaded config layer");
    }

    Ok(LoadedConfig {
        config,
        sources,
        env_overrides,
    })
}

/// Load config from a specific file path (no discovery).
pub fn load_config_file(path: &Path) -> Result<NewsroomConfig> {
    let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.display().to_string(),
        source: e,
    })?;
    toml::from_str(&contents).map_err(|e| ConfigError::ParseFile {
        path: path.display().to_string(),
        source: e,
    })
}

/// The user config directory for newsroom.
///
/// Checks `NEWSROOM_CONFIG_DIR` first, then falls back to the platform
/// default (`~/.config/newsroom` on Linux).
pub fn user_config_dir() -> Option<PathBuf> {
    if let Ok(dir) = std::env::var(CONFIG_DIR_ENV)
        && !dir.is_empty()
    {
        return Some(PathBuf::from(dir));
    }
    dirs::config_dir().map(|d| d.join(crate::APP_NAME))
}

/// Load one layer if the file exists. A file that exists but does not
/// parse is an error.
fn load_layer(config: &mut NewsroomConfig, path: &Path) -> Result<ConfigSource> {
    if !path.is_file() {
        return Ok(ConfigSource {
            path: path.to_path_buf(),
            loaded: false,
        });
    }

    config.merge(load_config_file(path)?);
    Ok(ConfigSource {
        path: path.to_path_buf(),
        loaded: true,
    })
}

/// Overlay environment variables onto `config`, field by field.
///
/// Returns the names of the variables that were applied. Empty values are
/// ignored.
pub fn apply_env_overrides(
    config: &mut NewsroomConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Vec<&'static str> {
    let lookup = |key: &'static str| env(key).filter(|v| !v.trim().is_empty());
    let mut applied = Vec::new();

    let mut llm = config.llm();
    if let Some(v) = lookup("OPENAI_API_KEY") {
        llm.openai_api_key = Some(v);
        applied.push("OPENAI_API_KEY");
    }
    if let Some(v) = lookup("OPENAI_BASE_URL") {
        llm.openai_base_url = Some(v);
        applied.push("OPENAI_BASE_URL");
    }
    if let Some(v) = lookup("OLLAMA_BASE_URL") {
        llm.ollama_base_url = v;
        applied.push("OLLAMA_BASE_URL");
    }

    let mut server = config.server();
    if let Some(v) = lookup("ADMIN_USERNAME") {
        server.admin_username = v;
        applied.push("ADMIN_USERNAME");
    }
    if let Some(v) = lookup("ADMIN_PASSWORD") {
        server.admin_password = v;
        applied.push("ADMIN_PASSWORD");
    }
    if let Some(v) = lookup("NEWSROOM_BIND") {
        server.bind = v;
        applied.push("NEWSROOM_BIND");
    }

    let mut database = config.database();
    if let Some(v) = lookup("DATABASE_PATH") {
        database.path = Some(PathBuf::from(v));
        applied.push("DATABASE_PATH");
    }

    if applied.iter().any(|k| k.starts_with("OPENAI") || k.starts_with("OLLAMA")) {
        config.llm = Some(llm);
    }
    if applied
        .iter()
        .any(|k| k.starts_with("ADMIN") || *k == "NEWSROOM_BIND")
    {
        config.server = Some(server);
    }
    if applied.contains(&"DATABASE_PATH") {
        config.database = Some(database);
    }
    applied
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_load_config_no_files() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();

        let loaded = load_config_with(Some(user.path()), Some(project.path()), no_env).unwrap();
        assert!(loaded.loaded_from().is_empty());
        assert_eq!(loaded.config, NewsroomConfig::default());
        assert!(loaded.env_overrides.is_empty());
    }

    #[test]
    fn test_load_config_layered_merge() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            user.path().join("config.toml"),
            r#"
            [llm]
            default_model = "gpt-4o"

            [cleanup]
            interval_secs = 600
            "#,
        )
        .unwrap();
        fs::write(
            project.path().join("newsroom.toml"),
            r#"
            [llm]
            default_model = "gpt-4o-mini"
            "#,
        )
        .unwrap();

        let loaded = load_config_with(Some(user.path()), Some(project.path()), no_env).unwrap();
        assert_eq!(loaded.loaded_from().len(), 2);
        assert_eq!(loaded.config.llm().default_model, "gpt-4o-mini");
        assert_eq!(loaded.config.cleanup().interval_secs, 600);
    }

    #[test]
    fn test_env_overrides_win_over_files() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(
            project.path().join("newsroom.toml"),
            r#"
            [server]
            bind = "127.0.0.1:9000"
            admin_username = "ops"
            "#,
        )
        .unwrap();

        let env = env_of(&[
            ("ADMIN_PASSWORD", "hunter2"),
            ("OPENAI_API_KEY", "sk-test"),
            ("DATABASE_PATH", "/var/lib/newsroom.db"),
            ("OLLAMA_BASE_URL", ""),
        ]);
        let loaded = load_config_with(Some(user.path()), Some(project.path()), env).unwrap();

        let server = loaded.config.server();
        assert_eq!(server.bind, "127.0.0.1:9000");
        assert_eq!(server.admin_username, "ops");
        assert_eq!(server.admin_password, "hunter2");
        assert_eq!(loaded.config.llm().openai_api_key.as_deref(), Some("sk-test"));
        assert_eq!(
            loaded.config.llm().ollama_base_url,
            crate::DEFAULT_OLLAMA_BASE_URL
        );
        assert_eq!(
            loaded.config.database().resolved_path(),
            PathBuf::from("/var/lib/newsroom.db")
        );
        assert_eq!(
            loaded.env_overrides,
            vec!["OPENAI_API_KEY", "ADMIN_PASSWORD", "DATABASE_PATH"]
        );
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let user = TempDir::new().unwrap();
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("newsroom.toml"), "[server\nbind=").unwrap();

        let err = load_config_with(Some(user.path()), Some(project.path()), no_env).unwrap_err();
        assert!(matches!(err, ConfigError::ParseFile { .. }));
    }

    #[test]
    fn test_unknown_key_in_file_is_an_error() {
        let user = TempDir::new().unwrap();
        fs::write(user.path().join("config.toml"), "[server]\nport = 8000").unwrap();

        let err = load_config_with(Some(user.path()), Some(user.path()), no_env).unwrap_err();
        assert!(err.to_string().contains("config.toml"));
    }

    #[test]
    fn test_invalid_env_value_fails_validation() {
        let user = TempDir::new().unwrap();
        let err = load_config_with(
            Some(user.path()),
            Some(user.path()),
            env_of(&[("NEWSROOM_BIND", "not-an-addr")]),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let err = load_config_file(Path::new("/nonexistent/newsroom.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::ReadFile { .. }));
    }
}
