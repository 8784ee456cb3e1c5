mod doctor_cmd;
mod startup;
mod status_cmd;
mod terminal_output;

use std::collections::HashMap;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};

use schedai_config::{config_dir, config_file_path, schema, validate, ChainedSecrets, PreparedConfig};
use schedai_gateway::{start_server, GatewayState};
use schedai_logging::init_logger;

use terminal_output::{note_error, note_info, note_success, note_warn};

#[derive(Parser)]
#[command(name = "schedai")]
#[command(about = "schedai: Scheduling System AI chat gateway")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the chat gateway
    Serve {
        /// Port to bind the HTTP server to
        #[arg(short, long)]
        port: Option<u16>,
        /// Address to bind the HTTP server to
        #[arg(short, long)]
        bind: Option<String>,
        /// Path to config.toml (defaults to the config directory)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Check configuration and secrets without starting
    Doctor {
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Query a running gateway
    Status {
        #[arg(short, long, default_value_t = schema::DEFAULT_PORT)]
        port: u16,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Serve { port, bind, config } => {
            let (config_path, secrets_dir) = resolve_paths(config);
            run_server(&config_path, &secrets_dir, port, bind).await?;
        }
        Commands::Doctor { config } => {
            let (config_path, secrets_dir) = resolve_paths(config);
            let secrets = ChainedSecrets::standard(&secrets_dir);
            if !doctor_cmd::run(&config_path, &secrets).await? {
                std::process::exit(1);
            }
        }
        Commands::Status { port } => status_cmd::run(port).await?,
    }

    Ok(())
}

/// The config file, and the directory its `secrets.toml` sits beside.
fn resolve_paths(config: Option<PathBuf>) -> (PathBuf, PathBuf) {
    match config {
        Some(path) => {
            let dir = path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(|| PathBuf::from("."));
            (path, dir)
        }
        None => {
            let dir = config_dir();
            (config_file_path(&dir), dir)
        }
    }
}

/// Command-line flags win over the file and environment; the result is
/// validated again so a bad flag is reported like a bad config value.
fn with_cli_overrides(
    mut prepared: PreparedConfig,
    port: Option<u16>,
    bind: Option<String>,
) -> PreparedConfig {
    if let Some(port) = port {
        prepared.config.server.port = port;
    }
    if let Some(bind) = bind {
        prepared.config.server.bind = bind;
    }
    prepared.report = validate(&prepared.config);
    prepared
}

async fn run_server(
    config_path: &Path,
    secrets_dir: &Path,
    port: Option<u16>,
    bind: Option<String>,
) -> Result<()> {
    let env: HashMap<String, String> = std::env::vars().collect();
    let prepared = match PreparedConfig::load(config_path, &env).await {
        Ok(prepared) => with_cli_overrides(prepared, port, bind),
        Err(e) => {
            note_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    };

    // The subscriber must exist before the validation report is logged.
    init_logger(
        prepared.config.logging.dir.as_deref().map(Path::new),
        &prepared.config.logging.level,
    );
    let config = match prepared.finish() {
        Ok(config) => config,
        Err(e) => {
            note_error(&format!("{e:#}"));
            std::process::exit(1);
        }
    };

    let secrets = ChainedSecrets::standard(secrets_dir);
    let model = match startup::build_model(&config.model, &secrets) {
        Ok(model) => model,
        Err(e) => {
            error!(error = %e, "Startup halted");
            note_error(&e.to_string());
            note_warn(&format!(
                "Set it in the environment or in {}",
                schedai_config::secrets_file_path(secrets_dir).display()
            ));
            std::process::exit(1);
        }
    };

    let addr: SocketAddr = config
        .server
        .addr()
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.server.addr()))?;

    info!(
        addr = %addr,
        model = %config.model.name,
        idle_timeout_secs = config.session.idle_timeout_secs,
        "Starting schedai gateway"
    );
    note_success(&format!("{} {}", config.assistant.icon, config.assistant.title));
    note_info(&format!("Open http://{addr}/ in your browser"));

    let sessions = startup::session_manager(&config, model);
    start_server(addr, GatewayState::new(sessions, config.assistant.clone())).await
}
