//! tether-relay binary: load config, start the server, wait for Ctrl-C.

use std::path::PathBuf;

use clap::Parser;
use tether_common::TetherError;
use tether_relay::RelayServer;

#[derive(Parser)]
#[command(name = "tether-relay", about = "Session rendezvous and WebSocket relay")]
struct Args {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Interface to bind (overrides config).
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Idle session age in seconds before reaping (overrides config).
    #[arg(long)]
    session_ttl: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), TetherError> {
    let args = Args::parse();

    let mut config = tether_config::load(args.config.as_deref())?;
    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ttl) = args.session_ttl {
        config.sessions.idle_ttl_secs = ttl;
    }
    tether_config::validate(&config)?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.filter.as_str().into()),
        )
        .init();

    tracing::debug!(config = %tether_config::config_to_json(&config), "Effective config");

    let server = RelayServer::new(config);
    let handle = server.listen().await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");
    handle.shutdown().await?;
    Ok(())
}
