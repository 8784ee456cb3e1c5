//! Runtime configuration schema, deserialized from `config.toml`.
//!
//! Every table and field is optional; anything left out falls back to the
//! defaults below.

use serde::{Deserialize, Serialize};

pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 8501;
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_IDLE_TIMEOUT_SECS: u64 = 3600;
pub const DEFAULT_MAX_SESSIONS: u64 = 10_000;
pub const DEFAULT_LOG_LEVEL: &str = "info";

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub model: ModelConfig,
    pub assistant: AssistantConfig,
    pub session: SessionConfig,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Server
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: DEFAULT_BIND.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

// ---------------------------------------------------------------------------
// Remote model
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Model identifier, e.g. `gemini-2.5-flash`.
    pub name: String,
    pub base_url: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Assistant presentation and persona
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssistantConfig {
    pub title: String,
    pub icon: String,
    pub welcome: String,
    pub input_placeholder: String,
    /// Shown while a reply is outstanding.
    pub thinking_label: String,
    /// Replaces the built-in scheduling persona when set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persona: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            title: "Scheduling System AI".to_string(),
            icon: "📅".to_string(),
            welcome: "Welcome! I am your AI Scheduling Assistant. \
                      How can I help you organize your schedule today?"
                .to_string(),
            input_placeholder: "E.g., Schedule a 30-min sync with the marketing team \
                                tomorrow at 10 AM..."
                .to_string(),
            thinking_label: "Checking schedule...".to_string(),
            persona: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// A browser session that stays silent this long is considered ended.
    pub idle_timeout_secs: u64,
    pub max_sessions: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_IDLE_TIMEOUT_SECS,
            max_sessions: DEFAULT_MAX_SESSIONS,
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for rolling JSON log files; console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 9000

            [assistant]
            persona = "You are terse."
            "#,
        )
        .unwrap();
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.bind, DEFAULT_BIND);
        assert_eq!(config.model.name, DEFAULT_MODEL);
        assert_eq!(config.assistant.persona.as_deref(), Some("You are terse."));
        assert_eq!(config.assistant.title, "Scheduling System AI");
        assert_eq!(config.session.idle_timeout_secs, DEFAULT_IDLE_TIMEOUT_SECS);
    }

    #[test]
    fn server_addr() {
        assert_eq!(ServerConfig::default().addr(), "127.0.0.1:8501");
    }
}
