//! UDP Chat Client - Entry Point
//!
//! Joins the relay and runs the interactive command loop on stdin/stdout.

use std::io::Write;

use clap::Parser;
use tokio::io::BufReader;
use tracing_subscriber::EnvFilter;

use udp_chat::cli::ClientArgs;
use udp_chat::{ClientConfig, ClientSession};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("udp_chat=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = ClientConfig::from(ClientArgs::parse());
    let session = ClientSession::connect(&config).await?;

    let stdin = BufReader::new(tokio::io::stdin());
    let end = session.start(stdin, tokio::io::stdout()).await?;
    std::io::stdout().flush()?;

    // The runtime would otherwise wait on the blocking stdin reader.
    std::process::exit(if end.is_clean() { 0 } else { 1 });
}
