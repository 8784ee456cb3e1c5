//! CLI Doctor Command
//!
//! Checks that the gateway could start, without binding or calling the model.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;
use schedai_config::{
    apply_env_overrides, collect_referenced_vars, load_config, load_credential, load_raw_config,
    validate, AppConfig, SecretStore, API_KEY_NAME,
};

/// Executes the full doctor diagnosis. Returns whether every check passed.
pub async fn run(config_path: &Path, secrets: &dyn SecretStore) -> Result<bool> {
    println!("\n🔍 Running schedai doctor...\n");

    let env: HashMap<String, String> = std::env::vars().collect();
    let config = check_config(config_path, &env).await;
    let is_ok = config.is_some() & check_credential(secrets);
    if let Some(config) = &config {
        println!("Effective settings:");
        println!("  listen   {}", config.server.addr());
        println!("  model    {}", config.model.name);
        println!("  sessions idle {}s, max {}", config.session.idle_timeout_secs, config.session.max_sessions);
    }

    println!();
    if is_ok {
        println!("✅ All checks passed! schedai is ready to serve.");
    } else {
        println!("❌ Some checks failed! Please fix the errors above.");
    }

    Ok(is_ok)
}

async fn check_config(path: &Path, env: &HashMap<String, String>) -> Option<AppConfig> {
    println!("Checking configuration:");
    if path.exists() {
        println!("  🟢 Using {}", path.display());
    } else {
        println!("  🟡 {} not found, using defaults", path.display());
    }

    if let Ok(raw) = load_raw_config(path).await {
        for (var, is_set) in referenced_vars(&raw, env) {
            if is_set {
                println!("  🟢 ${{{var}}} is set");
            } else {
                println!("  🔴 ${{{var}}} is referenced but not set");
            }
        }
    }

    let config = match load_config(path, env).await {
        Ok(config) => apply_env_overrides(config, env),
        Err(e) => {
            println!("  🔴 Failed to load: {e:#}");
            return None;
        }
    };

    let report = validate(&config);
    for warning in &report.warnings {
        println!("  🟡 {warning}");
    }
    for error in &report.errors {
        println!("  🔴 {error}");
    }
    report.is_valid().then_some(config)
}

/// Every `${VAR}` the config file references, and whether `env` has it.
fn referenced_vars(raw: &serde_json::Value, env: &HashMap<String, String>) -> Vec<(String, bool)> {
    collect_referenced_vars(raw)
        .into_iter()
        .map(|var| {
            let is_set = env.contains_key(&var);
            (var, is_set)
        })
        .collect()
}

fn check_credential(secrets: &dyn SecretStore) -> bool {
    println!("Checking secrets:");
    match load_credential(secrets, API_KEY_NAME) {
        Ok(_) => {
            println!("  🟢 {API_KEY_NAME} is set");
            true
        }
        Err(e) => {
            println!("  🔴 {e}");
            println!("     Looked in: {}", secrets.name());
            false
        }
    }
}
