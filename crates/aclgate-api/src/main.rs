//! aclgate server binary
//!
//! # Usage
//!
//! ```bash
//! # With config file
//! aclgate --config config.yaml
//!
//! # With environment variables only
//! ACLGATE_STORE__BACKEND=spicedb ACLGATE_STORE__ENDPOINT=http://localhost:8443 aclgate serve
//!
//! # Print the tuples a document translates to
//! aclgate translate acl.json
//! ```

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::signal;
use tracing::{error, info};

use aclgate_api::http::{
    create_router_with_body_limit, create_router_with_observability, with_middleware, AppState,
    RouterOptions,
};
use aclgate_api::observability::{init_logging, init_metrics, LoggingConfig};
use aclgate_domain::token::StaticPartnerNames;
use aclgate_domain::{translate, AclDocument};
use aclgate_server::ServerConfig;
use aclgate_storage::{MemoryRelationshipStore, RelationshipStore, SpiceDbConfig, SpiceDbHttpStore};

/// aclgate - ACL document gateway for relationship-based authorization
#[derive(Parser, Debug)]
#[command(name = "aclgate")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
enum Command {
    /// Run the HTTP server (default)
    Serve,
    /// Print the tuples a JSON configuration document translates to
    Translate {
        /// Path to the JSON document
        file: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = if let Some(config_path) = args.config {
        ServerConfig::load(&config_path)?
    } else {
        ServerConfig::from_env()?
    };

    init_logging(LoggingConfig::from_settings(
        &config.logging.level,
        config.logging.json,
    ));

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::Translate { file } => print_translation(&file),
    }
}

/// Translates a document and writes one tuple per line to stdout.
fn print_translation(file: &Path) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("failed to read {}", file.display()))?;
    let document = AclDocument::from_json(&text)
        .with_context(|| format!("failed to parse {}", file.display()))?;
    for tuple in translate(&document) {
        println!("{tuple}");
    }
    Ok(())
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    info!(version = env!("CARGO_PKG_VERSION"), "Starting aclgate server");

    let storage: Arc<dyn RelationshipStore> = match config.store.backend.as_str() {
        "memory" => {
            info!("Using in-memory relationship store");
            Arc::new(MemoryRelationshipStore::with_default_permissions())
        }
        "spicedb" => {
            let endpoint = config
                .store
                .endpoint
                .clone()
                .ok_or_else(|| anyhow::anyhow!("store.endpoint is required for spicedb backend"))?;
            info!(%endpoint, "Using SpiceDB relationship store");
            let mut spicedb = SpiceDbConfig::new(endpoint);
            spicedb.preshared_key = config.store.preshared_key.clone();
            spicedb.timeout = config.store.timeout();
            spicedb.fully_consistent = config.store.fully_consistent;
            Arc::new(SpiceDbHttpStore::new(spicedb)?)
        }
        other => {
            error!("Unknown store backend: {}", other);
            anyhow::bail!("Unknown store backend: {}", other);
        }
    };

    let state = AppState::with_token_config(
        storage,
        config.token.settings(),
        Arc::new(StaticPartnerNames::new(config.token.partner_names.clone())),
    );

    let router = if config.metrics.enabled {
        let metrics_state = init_metrics()?;
        info!(path = %config.metrics.path, "Metrics enabled");
        let options = RouterOptions {
            body_limit: config.server.body_limit_bytes,
            metrics_path: config.metrics.path.clone(),
            request_timeout: config.server.request_timeout(),
        };
        create_router_with_observability(state, metrics_state, &options)
    } else {
        with_middleware(
            create_router_with_body_limit(state, config.server.body_limit_bytes),
            config.server.request_timeout(),
        )
    };

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    run_http_server(router, addr).await
}

/// Run the HTTP server with graceful shutdown.
async fn run_http_server(router: axum::Router, addr: SocketAddr) -> anyhow::Result<()> {
    info!(%addr, "HTTP server listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
///
/// If a handler cannot be installed, that signal source is ignored.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_args_parsing() {
        let args = Args::try_parse_from(["aclgate"]).unwrap();
        assert!(args.config.is_none());
        assert!(args.command.is_none());

        let args = Args::try_parse_from(["aclgate", "--config", "config.yaml"]).unwrap();
        assert_eq!(args.config, Some("config.yaml".to_string()));

        let args = Args::try_parse_from(["aclgate", "-c", "test.yaml", "serve"]).unwrap();
        assert_eq!(args.config, Some("test.yaml".to_string()));
        assert_eq!(args.command, Some(Command::Serve));
    }

    #[test]
    fn test_translate_subcommand() {
        let args = Args::try_parse_from(["aclgate", "translate", "acl.json"]).unwrap();
        assert_eq!(
            args.command,
            Some(Command::Translate {
                file: PathBuf::from("acl.json")
            })
        );

        assert!(Args::try_parse_from(["aclgate", "translate"]).is_err());
    }

    #[test]
    fn test_print_translation_reports_missing_file() {
        let err = print_translation(Path::new("/nonexistent/acl.json")).unwrap_err();
        assert!(err.to_string().contains("failed to read"));
    }
}
