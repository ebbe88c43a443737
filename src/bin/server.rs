//! UDP Chat Relay Server - Entry Point
//!
//! Parses options, binds the socket and runs the relay until Ctrl-C.

use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use udp_chat::cli::ServerArgs;
use udp_chat::{ChatServer, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Use RUST_LOG env var to control log level, e.g. RUST_LOG=udp_chat=debug.
    // Logs go to stderr; stdout carries the relay's console lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("udp_chat=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ServerConfig::from(ServerArgs::parse());
    let server = ChatServer::bind(&config).await?;
    info!("UDP Chat Server listening on {}", server.local_addr()?);

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to install Ctrl-C handler: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
