//! Locating and reading the config directory.

use crate::env::resolve_env_vars_with;
use crate::schema::AppConfig;
use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

/// Default config file name within the config directory.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default secrets file name within the config directory.
const SECRETS_FILE_NAME: &str = "secrets.toml";

/// Resolve the schedai config directory.
/// Priority: `SCHEDAI_CONFIG_DIR` env > `~/.schedai/` > `./.schedai`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var("SCHEDAI_CONFIG_DIR") {
        return PathBuf::from(dir);
    }
    match dirs::home_dir() {
        Some(home) => home.join(".schedai"),
        None => PathBuf::from(".schedai"),
    }
}

/// Resolve the full path to the main config file.
pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Resolve the full path to the secrets file.
pub fn secrets_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(SECRETS_FILE_NAME)
}

/// Read the raw config file as a JSON value tree, before env substitution.
///
/// Returns an empty table if the file doesn't exist (first run).
pub async fn load_raw_config(path: &Path) -> Result<serde_json::Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(serde_json::Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let table: toml::Table = toml::from_str(&raw)
        .with_context(|| format!("Failed to parse config TOML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    serde_json::to_value(table).context("Failed to convert config for processing")
}

/// Load the config file, substituting `${VAR}` references from `env`.
pub async fn load_config(path: &Path, env: &HashMap<String, String>) -> Result<AppConfig> {
    let raw = load_raw_config(path).await?;
    let value = resolve_env_vars_with(&raw, env)
        .with_context(|| format!("Failed to resolve env vars in {}", path.display()))?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config values in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("schedai-io-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[tokio::test]
    async fn missing_file_yields_defaults() {
        let dir = scratch_dir();
        let config = load_config(&config_file_path(&dir), &HashMap::new())
            .await
            .unwrap();
        assert_eq!(config, AppConfig::default());
    }

    #[tokio::test]
    async fn loads_and_substitutes() {
        let dir = scratch_dir();
        let path = config_file_path(&dir);
        std::fs::write(
            &path,
            "[model]\nname = \"${SCHEDAI_IO_MODEL}\"\n\n[server]\nport = 9100\n",
        )
        .unwrap();
        let env = HashMap::from([("SCHEDAI_IO_MODEL".to_string(), "gemini-2.5-pro".to_string())]);

        let config = load_config(&path, &env).await.unwrap();
        assert_eq!(config.model.name, "gemini-2.5-pro");
        assert_eq!(config.server.port, 9100);
    }

    #[tokio::test]
    async fn malformed_toml_is_an_error() {
        let dir = scratch_dir();
        let path = config_file_path(&dir);
        std::fs::write(&path, "[server\nport = ").unwrap();
        let err = load_config(&path, &HashMap::new()).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse config TOML"));
    }
}
