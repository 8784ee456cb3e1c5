//! Wiring from a loaded config to a ready session manager.

use std::sync::Arc;
use std::time::Duration;

use schedai_config::schema::ModelConfig;
use schedai_config::{load_credential, AppConfig, SecretStore, API_KEY_NAME};
use schedai_core::{ChatError, ChatModel};
use schedai_providers::GeminiModel;
use schedai_session::{Persona, SessionManager, SessionSettings};
use tracing::info;

/// Build the process-wide model client. Fails with `ConfigurationMissing`
/// when the API key is absent; nothing is constructed in that case.
pub fn build_model(
    config: &ModelConfig,
    secrets: &dyn SecretStore,
) -> Result<Arc<dyn ChatModel>, ChatError> {
    let credential = load_credential(secrets, API_KEY_NAME)?;
    let model = GeminiModel::new(credential.expose())
        .with_model(&config.name)
        .with_base_url(&config.base_url);
    info!(model = %config.name, base_url = %config.base_url, "Model client ready");
    Ok(Arc::new(model))
}

pub fn session_manager(config: &AppConfig, model: Arc<dyn ChatModel>) -> SessionManager {
    let persona = Persona::from_override(config.assistant.persona.clone());
    let settings = SessionSettings {
        idle_timeout: Duration::from_secs(config.session.idle_timeout_secs),
        max_sessions: config.session.max_sessions,
    };
    SessionManager::new(model, persona, settings)
}
