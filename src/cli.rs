//! Command-line arguments for both programs

use clap::Parser;

use crate::config::{ClientConfig, ServerConfig};
use crate::message::is_valid_username;
use crate::types::{DEFAULT_ADDRESS, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, DEFAULT_WINDOW};

#[derive(Parser, Debug, Clone)]
#[command(name = "udp_chat_server", version, about = "UDP chat relay server")]
pub struct ServerArgs {
    /// The server ip or hostname
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// The server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The window size (accepted, not used by the protocol)
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    pub window: u32,

    /// Maximum number of joined users
    #[arg(long, default_value_t = DEFAULT_MAX_CLIENTS)]
    pub max_clients: usize,
}

impl From<ServerArgs> for ServerConfig {
    fn from(args: ServerArgs) -> Self {
        Self {
            address: args.address,
            port: args.port,
            window: args.window,
            max_clients: args.max_clients,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(name = "udp_chat_client", version, about = "UDP chat client")]
pub struct ClientArgs {
    /// The username of the client
    #[arg(short, long, value_parser = parse_username)]
    pub user: String,

    /// The server port
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// The server ip or hostname
    #[arg(short, long, default_value = DEFAULT_ADDRESS)]
    pub address: String,

    /// The window size (accepted, not used by the protocol)
    #[arg(short, long, default_value_t = DEFAULT_WINDOW)]
    pub window: u32,
}

impl From<ClientArgs> for ClientConfig {
    fn from(args: ClientArgs) -> Self {
        Self {
            username: args.user,
            server_address: args.address,
            server_port: args.port,
            window: args.window,
            bind: None,
        }
    }
}

fn parse_username(value: &str) -> Result<String, String> {
    if is_valid_username(value) {
        Ok(value.to_string())
    } else {
        Err("username must be a single word without whitespace".to_string())
    }
}
