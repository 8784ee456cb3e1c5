//! Secret lookup for the remote model credential.
//!
//! Secrets come from the process environment first and then from a TOML
//! secrets file in the config directory. A secret that is absent, empty, or
//! unreadable is a fatal [`ChatError::ConfigurationMissing`].

use anyhow::{Context, Result};
use schedai_core::ChatError;
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, error, warn};

/// The one secret the gateway needs.
pub const API_KEY_NAME: &str = "GOOGLE_API_KEY";

/// An opaque credential. Never printed; read it with [`Credential::expose`].
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// A source of named secrets.
pub trait SecretStore: Send + Sync {
    /// Store name used in diagnostics.
    fn name(&self) -> String;

    /// Look up `key`. `Ok(None)` means the store is readable but lacks the key.
    fn get(&self, key: &str) -> Result<Option<String>>;
}

/// Secrets from environment variables.
pub struct EnvSecrets {
    vars: Option<HashMap<String, String>>,
}

impl EnvSecrets {
    /// Reads the live process environment on every lookup.
    pub fn new() -> Self {
        Self { vars: None }
    }

    /// A fixed snapshot, for tests.
    pub fn with_vars(vars: HashMap<String, String>) -> Self {
        Self { vars: Some(vars) }
    }
}

impl Default for EnvSecrets {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for EnvSecrets {
    fn name(&self) -> String {
        "environment".to_string()
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(match &self.vars {
            Some(vars) => vars.get(key).cloned(),
            None => std::env::var(key).ok(),
        })
    }
}

/// Secrets from a TOML file of top-level string keys:
///
/// ```toml
/// GOOGLE_API_KEY = "AIza..."
/// ```
pub struct SecretsFile {
    path: PathBuf,
}

impl SecretsFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SecretStore for SecretsFile {
    fn name(&self) -> String {
        format!("secrets file {}", self.path.display())
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Secrets file does not exist");
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read secrets file: {}", self.path.display()))?;
        let table: toml::Table = toml::from_str(&raw)
            .with_context(|| format!("Failed to parse secrets file: {}", self.path.display()))?;
        Ok(table
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::to_string))
    }
}

/// Consults each store in order; the first non-empty value wins.
pub struct ChainedSecrets {
    stores: Vec<Box<dyn SecretStore>>,
}

impl ChainedSecrets {
    pub fn new(stores: Vec<Box<dyn SecretStore>>) -> Self {
        Self { stores }
    }

    /// Environment first, then `secrets.toml` in `config_dir`.
    pub fn standard(config_dir: &Path) -> Self {
        Self::new(vec![
            Box::new(EnvSecrets::new()),
            Box::new(SecretsFile::new(crate::io::secrets_file_path(config_dir))),
        ])
    }
}

impl SecretStore for ChainedSecrets {
    fn name(&self) -> String {
        let names: Vec<String> = self.stores.iter().map(|s| s.name()).collect();
        names.join(", ")
    }

    fn get(&self, key: &str) -> Result<Option<String>> {
        for store in &self.stores {
            match store.get(key)? {
                Some(value) if !value.trim().is_empty() => return Ok(Some(value)),
                _ => continue,
            }
        }
        Ok(None)
    }
}

/// Fetch the credential named `key`, or fail with `ConfigurationMissing`.
pub fn load_credential(store: &dyn SecretStore, key: &str) -> Result<Credential, ChatError> {
    match store.get(key) {
        Ok(Some(value)) if !value.trim().is_empty() => {
            debug!(key, "Loaded credential");
            Ok(Credential(value.trim().to_string()))
        }
        Ok(_) => {
            warn!(key, stores = %store.name(), "Credential not found");
            Err(ChatError::configuration_missing(key))
        }
        Err(e) => {
            error!(key, error = %format!("{e:#}"), "Failed to read secret store");
            Err(ChatError::configuration_missing(key))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_file(contents: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("schedai-secrets-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("secrets.toml");
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn env(pairs: &[(&str, &str)]) -> EnvSecrets {
        EnvSecrets::with_vars(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn missing_secret_is_configuration_missing() {
        let err = load_credential(&env(&[]), API_KEY_NAME).unwrap_err();
        assert!(matches!(err, ChatError::ConfigurationMissing { ref key } if key == API_KEY_NAME));
        assert!(err.is_fatal());
    }

    #[test]
    fn empty_secret_counts_as_missing() {
        let err = load_credential(&env(&[(API_KEY_NAME, "   ")]), API_KEY_NAME).unwrap_err();
        assert!(matches!(err, ChatError::ConfigurationMissing { .. }));
    }

    #[test]
    fn env_wins_over_file() {
        let path = scratch_file("GOOGLE_API_KEY = \"from-file\"\n");
        let chain = ChainedSecrets::new(vec![
            Box::new(env(&[(API_KEY_NAME, "from-env")])),
            Box::new(SecretsFile::new(&path)),
        ]);
        assert_eq!(load_credential(&chain, API_KEY_NAME).unwrap().expose(), "from-env");
    }

    #[test]
    fn falls_back_to_file() {
        let path = scratch_file("GOOGLE_API_KEY = \"from-file\"\n");
        let chain = ChainedSecrets::new(vec![
            Box::new(env(&[])),
            Box::new(SecretsFile::new(&path)),
        ]);
        assert_eq!(load_credential(&chain, API_KEY_NAME).unwrap().expose(), "from-file");
    }

    #[test]
    fn malformed_file_is_configuration_missing() {
        let path = scratch_file("GOOGLE_API_KEY = ");
        let err = load_credential(&SecretsFile::new(&path), API_KEY_NAME).unwrap_err();
        assert!(matches!(err, ChatError::ConfigurationMissing { .. }));
    }

    #[test]
    fn missing_file_is_not_an_error_for_the_store() {
        let store = SecretsFile::new("/nonexistent/schedai/secrets.toml");
        assert!(store.get(API_KEY_NAME).unwrap().is_none());
    }

    #[test]
    fn credential_debug_is_redacted() {
        let cred = load_credential(&env(&[(API_KEY_NAME, "AIzaSecret")]), API_KEY_NAME).unwrap();
        assert_eq!(format!("{cred:?}"), "Credential(***)");
    }
}
