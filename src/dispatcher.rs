//! Server-side message routing
//!
//! Maps one inbound datagram to a registry mutation plus zero or more
//! outbound messages. No I/O happens here: the server loop owns the socket
//! and sends whatever a [`Dispatch`] asks for.

use std::fmt;
use std::net::SocketAddr;

use tracing::{debug, warn};

use crate::error::{JoinRejection, PacketError};
use crate::message::Message;
use crate::packet::{Packet, PacketKind};
use crate::registry::ClientRegistry;
use crate::types::display_name;

/// A message to send to `dest`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outbound {
    pub dest: SocketAddr,
    pub message: Message,
}

/// Something the server reports on its console
///
/// `Display` gives the exact console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerEvent {
    Joined(String),
    RejectedFull,
    RejectedUsernameTaken,
    Disconnected(Option<String>),
    ListRequested(Option<String>),
    Forwarded { sender: String },
    NonExistentRecipient { sender: String, recipient: String },
}

impl fmt::Display for ServerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerEvent::Joined(name) => write!(f, "join: {}", name),
            ServerEvent::RejectedFull => write!(f, "disconnected: server full"),
            ServerEvent::RejectedUsernameTaken => {
                write!(f, "disconnected: username not available")
            }
            ServerEvent::Disconnected(name) => {
                write!(f, "disconnected: {}", display_name(name.as_deref()))
            }
            ServerEvent::ListRequested(name) => {
                write!(f, "request_users_list: {}", display_name(name.as_deref()))
            }
            ServerEvent::Forwarded { sender } => write!(f, "msg: {}", sender),
            ServerEvent::NonExistentRecipient { sender, recipient } => {
                write!(f, "msg: {} to non-existent user {}", sender, recipient)
            }
        }
    }
}

/// Outcome of dispatching one datagram
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dispatch {
    pub outbound: Vec<Outbound>,
    pub events: Vec<ServerEvent>,
}

impl Dispatch {
    fn reply(dest: SocketAddr, message: Message) -> Self {
        Self {
            outbound: vec![Outbound { dest, message }],
            events: Vec::new(),
        }
    }

    fn send(&mut self, dest: SocketAddr, message: Message) {
        self.outbound.push(Outbound { dest, message });
    }

    fn event(&mut self, event: ServerEvent) {
        self.events.push(event);
    }
}

/// Decode a raw datagram and dispatch it
///
/// Malformed frames and checksum mismatches are dropped. Intact frames with
/// an unknown kind, and DATA payloads that do not decode, get the
/// "incorrect userinput format" notice. START/END/ACK are ignored.
pub fn dispatch_datagram(
    registry: &mut ClientRegistry,
    source: SocketAddr,
    bytes: &[u8],
) -> Dispatch {
    let decoded = match Packet::decode(bytes) {
        Ok(decoded) => decoded,
        Err(PacketError::UnknownKind(kind)) => {
            warn!("Unknown packet kind '{}' from {}", kind, source);
            return Dispatch::reply(source, Message::incorrect_format());
        }
        Err(e) => {
            warn!("Dropping packet from {}: {}", source, e);
            return Dispatch::default();
        }
    };

    if !decoded.checksum_valid {
        warn!(
            "Dropping packet from {}: checksum mismatch (got {})",
            source, decoded.checksum
        );
        return Dispatch::default();
    }

    if decoded.packet.kind != PacketKind::Data {
        debug!("Ignoring {} packet from {}", decoded.packet.kind, source);
        return Dispatch::default();
    }

    match Message::decode(&decoded.packet.payload) {
        Ok(message) => dispatch(registry, source, message),
        Err(e) => {
            debug!("Undecodable message from {}: {}", source, e);
            Dispatch::reply(source, Message::incorrect_format())
        }
    }
}

/// Apply one decoded message from `source` to the registry
pub fn dispatch(registry: &mut ClientRegistry, source: SocketAddr, message: Message) -> Dispatch {
    match message {
        Message::Join { username } => handle_join(registry, source, username),
        Message::Disconnect { .. } => handle_disconnect(registry, source),
        Message::ListRequest => handle_list_request(registry, source),
        Message::Send { recipients, text } => handle_send(registry, source, recipients, text),
        other => {
            debug!("Unexpected {} message from {}", other.command(), source);
            Dispatch::reply(source, Message::incorrect_format())
        }
    }
}

fn handle_join(registry: &mut ClientRegistry, source: SocketAddr, username: String) -> Dispatch {
    match registry.join(&username, source) {
        Ok(()) => {
            debug!("Total clients: {}", registry.len());
            Dispatch {
                outbound: Vec::new(),
                events: vec![ServerEvent::Joined(username)],
            }
        }
        Err(JoinRejection::Full) => {
            let mut dispatch = Dispatch::reply(source, Message::ErrServerFull);
            dispatch.event(ServerEvent::RejectedFull);
            dispatch
        }
        Err(JoinRejection::UsernameTaken) => {
            let mut dispatch = Dispatch::reply(source, Message::ErrUsernameTaken);
            dispatch.event(ServerEvent::RejectedUsernameTaken);
            dispatch
        }
    }
}

/// The username in the payload is ignored; the source address decides who leaves.
fn handle_disconnect(registry: &mut ClientRegistry, source: SocketAddr) -> Dispatch {
    let name = registry.username_of(source).map(str::to_string);
    if let Some(name) = &name {
        registry.leave(name);
    }

    let mut dispatch = Dispatch::default();
    dispatch.event(ServerEvent::Disconnected(name));
    dispatch
}

fn handle_list_request(registry: &ClientRegistry, source: SocketAddr) -> Dispatch {
    let usernames = registry.list_sorted();
    let mut dispatch = Dispatch::reply(source, Message::ListResponse { usernames });
    dispatch.event(ServerEvent::ListRequested(
        registry.username_of(source).map(str::to_string),
    ));
    dispatch
}

fn handle_send(
    registry: &ClientRegistry,
    source: SocketAddr,
    recipients: Vec<String>,
    text: String,
) -> Dispatch {
    let Some(sender) = registry.username_of(source) else {
        warn!("Message from unregistered address {}", source);
        return Dispatch::reply(source, Message::incorrect_format());
    };

    let mut dispatch = Dispatch::default();
    let mut missing = Vec::new();

    for recipient in recipients {
        match registry.lookup(&recipient) {
            Some(dest) => {
                dispatch.send(
                    dest,
                    Message::Forward {
                        sender: sender.to_string(),
                        text: text.clone(),
                    },
                );
                dispatch.event(ServerEvent::Forwarded {
                    sender: sender.to_string(),
                });
            }
            None => missing.push(recipient),
        }
    }

    for recipient in missing {
        dispatch.event(ServerEvent::NonExistentRecipient {
            sender: sender.to_string(),
            recipient,
        });
    }

    dispatch
}
