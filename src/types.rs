//! Basic type definitions and protocol constants
//!
//! Provides the values both programs must agree on:
//! - default server address, port and window size
//! - datagram and message size limits
//! - `SequenceNumber` and `SessionEnd`

/// Default server port
pub const DEFAULT_PORT: u16 = 15000;

/// Default server host
pub const DEFAULT_ADDRESS: &str = "localhost";

/// Default window size (carried on the command line, no transport semantics)
pub const DEFAULT_WINDOW: u32 = 3;

/// Default number of users the server accepts at once
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Receive-buffer size, and therefore the largest datagram either side accepts
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// Largest free-text message body, in UTF-8 bytes
pub const MAX_MESSAGE_BYTES: usize = 1500;

/// Sequence number stamped on every packet. Always zero: there is no
/// retransmission or ordering layer behind it.
pub const FIXED_SEQUENCE: SequenceNumber = 0;

/// Packet sequence number
pub type SequenceNumber = u32;

/// Why a client session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// User typed `quit` (or input reached end of file)
    Quit,
    /// Server answered the JOIN with `err_server_full`
    ServerFull,
    /// Server answered the JOIN with `err_username_unavailable`
    UsernameTaken,
    /// The socket failed while receiving
    ConnectionLost,
}

impl SessionEnd {
    /// Whether the session ended at the user's request
    pub fn is_clean(&self) -> bool {
        matches!(self, SessionEnd::Quit)
    }
}

impl std::fmt::Display for SessionEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionEnd::Quit => write!(f, "quit"),
            SessionEnd::ServerFull => write!(f, "server full"),
            SessionEnd::UsernameTaken => write!(f, "username not available"),
            SessionEnd::ConnectionLost => write!(f, "connection lost"),
        }
    }
}

/// Name shown in server output for an address that never joined
pub fn display_name(name: Option<&str>) -> &str {
    name.unwrap_or("unknown")
}
