//! Config validation with field paths and user-friendly messages.

use crate::schema::AppConfig;
use thiserror::Error;

const KNOWN_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// A collection of validation errors found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate the config and return a report of all errors and warnings.
pub fn validate(config: &AppConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_model(config, &mut report);
    validate_assistant(config, &mut report);
    validate_session(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &AppConfig, report: &mut ValidationReport) {
    if config.server.bind.trim().is_empty() {
        report.error("server.bind", "Bind address cannot be empty");
    }
    if config.server.port == 0 {
        report.error("server.port", "Port must be between 1 and 65535");
    }
}

fn validate_model(config: &AppConfig, report: &mut ValidationReport) {
    if config.model.name.trim().is_empty() {
        report.error("model.name", "Model name cannot be empty");
    }
    let url = config.model.base_url.as_str();
    if !(url.starts_with("https://") || url.starts_with("http://")) {
        report.error("model.base_url", "Base URL must start with http:// or https://");
    } else if url.starts_with("http://") {
        report.warn("model.base_url", "Credential will be sent over plain HTTP");
    }
}

fn validate_assistant(config: &AppConfig, report: &mut ValidationReport) {
    if let Some(persona) = &config.assistant.persona {
        if persona.trim().is_empty() {
            report.error("assistant.persona", "Persona override cannot be empty");
        }
    }
    if config.assistant.title.trim().is_empty() {
        report.warn("assistant.title", "Chat page will have no title");
    }
}

fn validate_session(config: &AppConfig, report: &mut ValidationReport) {
    if config.session.idle_timeout_secs == 0 {
        report.error("session.idle_timeout_secs", "Idle timeout must be positive");
    }
    if config.session.max_sessions == 0 {
        report.error("session.max_sessions", "At least one session must be allowed");
    }
}

fn validate_logging(config: &AppConfig, report: &mut ValidationReport) {
    let level = config.logging.level.to_ascii_lowercase();
    if !KNOWN_LOG_LEVELS.contains(&level.as_str()) {
        report.warn(
            "logging.level",
            format!("Unknown level '{}'; treated as a filter directive", config.logging.level),
        );
    }
}
