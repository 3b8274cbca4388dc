//! Clearway - Customs Manifest Filing Gateway
//!
//! A thin web gateway that collects CBP Type 86 manifest form data and relays
//! it as JSON to a customs-filing REST API.

use anyhow::Result;
use clap::{Parser, Subcommand};
use clearway::{
    api::build_app,
    config::ClearwayConfig,
    gateway::Gateway,
    session::MemorySessionStore,
    upstream::UpstreamClient,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "clearway")]
#[command(version)]
#[command(about = "Customs manifest filing gateway")]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CLEARWAY_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the gateway server
    Serve {
        /// Host to bind to (overrides configuration)
        #[arg(long)]
        host: Option<String>,

        /// Port to listen on (overrides configuration)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Show configuration
    Config {
        /// Show default configuration
        #[arg(long)]
        default: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("clearway={},tower_http=debug", log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = if let Some(config_path) = &cli.config {
        ClearwayConfig::load(config_path)?
    } else {
        ClearwayConfig::default()
    };

    match cli.command {
        Commands::Serve { host, port } => {
            run_server(config, host, port).await?;
        }
        Commands::Config { default } => {
            show_config(if default { None } else { Some(&config) })?;
        }
    }

    Ok(())
}

async fn run_server(
    mut config: ClearwayConfig,
    host: Option<String>,
    port: Option<u16>,
) -> Result<()> {
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    let upstream = UpstreamClient::new(config.upstream.clone())?;
    let sessions = Arc::new(MemorySessionStore::new());
    let gateway = Arc::new(Gateway::with_parts(upstream, sessions.clone()));

    // Reap sessions that have sat idle past the configured window
    let max_idle_ms = config.server.session_max_idle_secs as i64 * 1000;
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            let removed = sessions.cleanup_inactive(max_idle_ms).await;
            if removed > 0 {
                tracing::debug!(removed, "cleaned up inactive sessions");
            }
        }
    });

    let app = build_app(gateway, &config.server);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!(%addr, upstream = %config.upstream.base_url, "Clearway gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
    }
}

fn show_config(config: Option<&ClearwayConfig>) -> Result<()> {
    let config = config.cloned().unwrap_or_default();
    let toml = toml::to_string_pretty(&config)?;
    println!("{}", toml);
    Ok(())
}
