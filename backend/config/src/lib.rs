//! `schedai-config`: configuration loading for the schedai gateway.
//!
//! Provides:
//! - Typed config schema with defaults for every field
//! - TOML config file loading from the config directory
//! - `${ENV_VAR}` substitution and `SCHEDAI_*` env overrides
//! - Secret stores and the fatal credential gate
//! - Config redaction for safe logging
//! - Schema validation

pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod secrets;
pub mod validation;

pub use env::{collect_referenced_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_config, load_raw_config, secrets_file_path};
pub use redact::redact;
pub use schema::AppConfig;
pub use secrets::{
    load_credential, ChainedSecrets, Credential, EnvSecrets, SecretStore, SecretsFile,
    API_KEY_NAME,
};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use anyhow::Result;
use schedai_core::ChatError;
use std::collections::HashMap;
use std::path::Path;

/// A loaded config together with its validation report.
///
/// Loading does not log; [`PreparedConfig::finish`] reports the findings, so
/// the caller can install a subscriber in between.
#[derive(Debug)]
pub struct PreparedConfig {
    pub config: AppConfig,
    pub report: ValidationReport,
}

impl PreparedConfig {
    /// Load `path`, substitute env vars, apply env overrides, and validate.
    pub async fn load(path: &Path, env: &HashMap<String, String>) -> Result<Self> {
        let config = load_config(path, env).await?;
        let config = apply_env_overrides(config, env);
        let report = validate(&config);
        Ok(Self { config, report })
    }

    /// Log every warning and error, then fail with the first error.
    pub fn finish(self) -> Result<AppConfig> {
        for warning in &self.report.warnings {
            tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
        }
        for error in &self.report.errors {
            tracing::error!(path = %error.path, message = %error.message, "Config error");
        }
        if let Some(first) = self.report.errors.first() {
            return Err(ChatError::ConfigInvalid(first.to_string()).into());
        }

        if let Ok(snapshot) = serde_json::to_value(&self.config) {
            tracing::debug!(config = %redact(&snapshot), "Effective config");
        }
        Ok(self.config)
    }
}

/// Apply `SCHEDAI_BIND`, `SCHEDAI_PORT`, `SCHEDAI_MODEL` and `SCHEDAI_LOG`.
/// Unparsable values are ignored with a warning.
pub fn apply_env_overrides(mut config: AppConfig, env: &HashMap<String, String>) -> AppConfig {
    if let Some(bind) = env.get("SCHEDAI_BIND") {
        config.server.bind = bind.clone();
    }
    if let Some(port) = env.get("SCHEDAI_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(_) => tracing::warn!(value = %port, "Ignoring invalid SCHEDAI_PORT"),
        }
    }
    if let Some(model) = env.get("SCHEDAI_MODEL") {
        config.model.name = model.clone();
    }
    if let Some(level) = env.get("SCHEDAI_LOG") {
        config.logging.level = level.clone();
    }
    config
}
