//! Error types for the chat relay
//!
//! Defines frame, message, registry, user-input and application-level errors.
//! Uses thiserror for ergonomic error definitions.

use thiserror::Error;

/// Application-level errors
///
/// Anything that ends a server loop or a client session.
#[derive(Debug, Error)]
pub enum AppError {
    /// Socket or console IO error (fatal)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame could not be parsed
    #[error("Packet error: {0}")]
    Packet(#[from] PacketError),

    /// A payload could not be interpreted as a message
    #[error("Message error: {0}")]
    Message(#[from] MessageError),

    /// Host name did not resolve to a usable address
    #[error("Could not resolve address: {0}")]
    AddressResolution(String),

    /// Channel send error (fatal - internal channel broken)
    #[error("Channel send error")]
    ChannelSend,
}

/// Frame-level decoding errors
///
/// A checksum mismatch is not an error: the frame still decodes and the
/// result carries `checksum_valid = false`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PacketError {
    /// Bytes cannot be split into kind, sequence number, payload and checksum
    #[error("malformed packet: {0}")]
    Malformed(&'static str),

    /// Frame structure is fine but the kind tag is not one we know
    #[error("unknown packet kind '{0}'")]
    UnknownKind(String),
}

/// Errors interpreting a decoded payload as a typed message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessageError {
    /// Payload had no command word
    #[error("empty message")]
    Empty,

    /// A required field was absent
    #[error("missing field: {0}")]
    MissingField(&'static str),

    /// Count prefix was not a positive integer
    #[error("invalid count '{0}'")]
    InvalidCount(String),

    /// Fewer names followed the count than it declared
    #[error("expected {expected} names, found {found}")]
    MissingRecipients { expected: usize, found: usize },
}

/// Reasons the registry refuses a JOIN
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum JoinRejection {
    /// Registry already holds the configured maximum
    #[error("server full")]
    Full,

    /// Another client holds this username
    #[error("username not available")]
    UsernameTaken,
}

/// Local user-input errors
///
/// `Display` is the notice shown to the user; nothing goes on the network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    /// Unknown command or bad `msg` syntax
    #[error("incorrect userinput format")]
    IncorrectFormat,

    /// Message body or encoded packet is over the size budget
    #[error("Message size exceeds the maximum allowed size of {limit} bytes.")]
    MessageTooLarge { limit: usize },
}
