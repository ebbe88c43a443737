//! UDP Chat Relay Library
//!
//! A text chat relay over raw UDP datagrams. Clients join under a unique
//! username, ask for the list of connected users, and send messages to one
//! or more users by name; the server tracks membership and forwards.
//!
//! # Layers
//! - `packet`: datagram framing with a CRC-32 checksum
//! - `message`: command word plus fields, carried as the packet payload
//! - `registry`: server-side username ↔ address map with a capacity bound
//! - `dispatcher`: pure routing from one datagram to registry changes and replies
//! - `server`: single-task UDP event loop around the dispatcher
//! - `session`: client command loop and concurrent receive loop
//!
//! # Architecture
//! The server loop is the only owner of the registry, so no locks are needed.
//! A client shares one socket between a sending task and a receiving task.
//!
//! # Example
//! ```ignore
//! use udp_chat::{ChatServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let server = ChatServer::bind(&ServerConfig::default()).await.unwrap();
//!     server.run().await.unwrap();
//! }
//! ```

pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod message;
pub mod packet;
pub mod registry;
pub mod server;
pub mod session;
pub mod types;

// Re-export main types for convenience
pub use config::{ClientConfig, ServerConfig};
pub use dispatcher::{dispatch, dispatch_datagram, Dispatch, Outbound, ServerEvent};
pub use error::{AppError, InputError, JoinRejection, MessageError, PacketError};
pub use message::{Command, Layout, Message};
pub use packet::{DecodedPacket, Packet, PacketKind};
pub use registry::ClientRegistry;
pub use server::ChatServer;
pub use session::{ClientSession, SessionStatus, UserCommand};
pub use types::SessionEnd;
