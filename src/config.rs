//! Server and client configuration

use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use rand::Rng;
use tokio::net::{lookup_host, UdpSocket};
use tracing::debug;

use crate::error::AppError;
use crate::types::{DEFAULT_ADDRESS, DEFAULT_MAX_CLIENTS, DEFAULT_PORT, DEFAULT_WINDOW};

/// Range the client picks its local port from
const CLIENT_PORT_RANGE: std::ops::Range<u16> = 10000..40000;

/// Attempts before giving up on a random client port
const CLIENT_BIND_ATTEMPTS: usize = 8;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host or IP to bind
    pub address: String,
    pub port: u16,
    /// Accepted for compatibility; nothing reads it
    pub window: u32,
    pub max_clients: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            port: DEFAULT_PORT,
            window: DEFAULT_WINDOW,
            max_clients: DEFAULT_MAX_CLIENTS,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub username: String,
    /// Server host or IP
    pub server_address: String,
    pub server_port: u16,
    /// Accepted for compatibility; nothing reads it
    pub window: u32,
    /// Local address to bind; `None` picks a random port in 10000..40000
    pub bind: Option<SocketAddr>,
}

impl ClientConfig {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            server_address: DEFAULT_ADDRESS.to_string(),
            server_port: DEFAULT_PORT,
            window: DEFAULT_WINDOW,
            bind: None,
        }
    }
}

/// Resolve `host:port`, preferring an IPv4 result
pub async fn resolve(host: &str, port: u16) -> Result<SocketAddr, AppError> {
    let candidates: Vec<SocketAddr> = lookup_host((host, port))
        .await
        .map_err(|e| AppError::AddressResolution(format!("{}:{}: {}", host, port, e)))?
        .collect();

    candidates
        .iter()
        .find(|addr| addr.is_ipv4())
        .or_else(|| candidates.first())
        .copied()
        .ok_or_else(|| AppError::AddressResolution(format!("{}:{}", host, port)))
}

/// Bind the client socket
///
/// With no explicit address, tries random ports on the IPv4 wildcard.
pub async fn bind_client_socket(bind: Option<SocketAddr>) -> Result<UdpSocket, AppError> {
    if let Some(addr) = bind {
        return Ok(UdpSocket::bind(addr).await?);
    }

    let mut last_err = None;
    for _ in 0..CLIENT_BIND_ATTEMPTS {
        let port = rand::thread_rng().gen_range(CLIENT_PORT_RANGE);
        match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port)).await {
            Ok(socket) => return Ok(socket),
            Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
                debug!("Port {} in use, retrying", port);
                last_err = Some(e);
            }
            Err(e) => return Err(e.into()),
        }
    }

    Err(last_err
        .unwrap_or_else(|| io::Error::from(io::ErrorKind::AddrInUse))
        .into())
}
