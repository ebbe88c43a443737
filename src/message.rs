//! Message protocol definitions
//!
//! A message is the text payload of a DATA packet:
//!
//! ```text
//! <command> <length> <body>
//! ```
//!
//! `length` is the character count of `body` and is informational only.
//! Commands without fields encode as `<command> 0`. How the body splits into
//! fields depends on the command's [`Layout`].

use std::fmt;

use crate::error::MessageError;
use crate::packet::Packet;

/// Command word at the head of every message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Command {
    Join,
    Disconnect,
    ListRequest,
    ListResponse,
    Send,
    Forward,
    ErrServerFull,
    ErrUsernameTaken,
    Notice,
    /// Any tag we do not recognize, kept verbatim
    Unknown(String),
}

impl Command {
    pub fn as_str(&self) -> &str {
        match self {
            Command::Join => "join",
            Command::Disconnect => "disconnect",
            Command::ListRequest => "request_users_list",
            Command::ListResponse => "response_users_list",
            Command::Send => "send_message",
            Command::Forward => "forward_message",
            Command::ErrServerFull => "err_server_full",
            Command::ErrUsernameTaken => "err_username_unavailable",
            Command::Notice => "notice",
            Command::Unknown(tag) => tag,
        }
    }

    pub fn parse(tag: &str) -> Self {
        match tag {
            "join" => Command::Join,
            "disconnect" => Command::Disconnect,
            "request_users_list" => Command::ListRequest,
            "response_users_list" => Command::ListResponse,
            "send_message" => Command::Send,
            "forward_message" => Command::Forward,
            "err_server_full" => Command::ErrServerFull,
            "err_username_unavailable" => Command::ErrUsernameTaken,
            "notice" => Command::Notice,
            other => Command::Unknown(other.to_string()),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field layout of a message body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// One field (a username, or a notice's text)
    Single,
    /// No fields
    Empty,
    /// Space-joined list of names
    List,
    /// Count, that many names, then free text
    Counted,
}

/// Join `command` and `fields` per `layout`
pub fn encode_message(command: &Command, layout: Layout, fields: &[&str]) -> String {
    match layout {
        Layout::Empty => format!("{} 0", command),
        Layout::Single | Layout::List | Layout::Counted => {
            let body = fields.join(" ");
            format!("{} {} {}", command, body.chars().count(), body)
        }
    }
}

/// A payload split into its command and raw fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    pub command: Command,
    /// Whitespace-separated tokens after the length token
    pub fields: Vec<String>,
}

/// Split a payload on whitespace into command and fields
pub fn decode_message(payload: &str) -> Result<RawMessage, MessageError> {
    let mut tokens = payload.split_whitespace();
    let command = Command::parse(tokens.next().ok_or(MessageError::Empty)?);
    // length token
    tokens.next();

    Ok(RawMessage {
        command,
        fields: tokens.map(str::to_string).collect(),
    })
}

/// Application-level message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// Register under a username
    Join { username: String },
    /// Leave; the server attributes this by source address
    Disconnect { username: String },
    /// Ask for the list of connected users
    ListRequest,
    /// Sorted list of connected users
    ListResponse { usernames: Vec<String> },
    /// Client → server chat message
    Send { recipients: Vec<String>, text: String },
    /// Server → client chat message
    Forward { sender: String, text: String },
    /// JOIN refused: server at capacity
    ErrServerFull,
    /// JOIN refused: username in use
    ErrUsernameTaken,
    /// Free-form warning, e.g. for unparseable input
    Notice { text: String },
    /// Command we do not understand
    Unknown { command: String, fields: Vec<String> },
}

impl Message {
    /// The "incorrect userinput format" warning
    pub fn incorrect_format() -> Self {
        Message::Notice {
            text: "incorrect userinput format".to_string(),
        }
    }

    pub fn command(&self) -> Command {
        match self {
            Message::Join { .. } => Command::Join,
            Message::Disconnect { .. } => Command::Disconnect,
            Message::ListRequest => Command::ListRequest,
            Message::ListResponse { .. } => Command::ListResponse,
            Message::Send { .. } => Command::Send,
            Message::Forward { .. } => Command::Forward,
            Message::ErrServerFull => Command::ErrServerFull,
            Message::ErrUsernameTaken => Command::ErrUsernameTaken,
            Message::Notice { .. } => Command::Notice,
            Message::Unknown { command, .. } => Command::Unknown(command.clone()),
        }
    }

    pub fn layout(&self) -> Layout {
        match self {
            Message::Join { .. } | Message::Disconnect { .. } | Message::Notice { .. } => {
                Layout::Single
            }
            Message::ListRequest | Message::ErrServerFull | Message::ErrUsernameTaken => {
                Layout::Empty
            }
            Message::ListResponse { .. } | Message::Unknown { .. } => Layout::List,
            Message::Send { .. } | Message::Forward { .. } => Layout::Counted,
        }
    }

    /// Encode to payload text
    pub fn encode(&self) -> String {
        let command = self.command();
        let layout = self.layout();
        match self {
            Message::Join { username } | Message::Disconnect { username } => {
                encode_message(&command, layout, &[username.as_str()])
            }
            Message::Notice { text } => encode_message(&command, layout, &[text.as_str()]),
            Message::ListRequest | Message::ErrServerFull | Message::ErrUsernameTaken => {
                encode_message(&command, layout, &[])
            }
            Message::ListResponse { usernames: fields } | Message::Unknown { fields, .. } => {
                let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
                encode_message(&command, layout, &fields)
            }
            Message::Send { recipients, text } => {
                let count = recipients.len().to_string();
                let mut fields = vec![count.as_str()];
                fields.extend(recipients.iter().map(String::as_str));
                fields.push(text.as_str());
                encode_message(&command, layout, &fields)
            }
            Message::Forward { sender, text } => {
                encode_message(&command, layout, &["1", sender.as_str(), text.as_str()])
            }
        }
    }

    /// Decode payload text into a typed message
    pub fn decode(payload: &str) -> Result<Self, MessageError> {
        let RawMessage { command, fields } = decode_message(payload)?;

        let message = match command {
            Command::Join => Message::Join {
                username: first_field(fields, "username")?,
            },
            Command::Disconnect => Message::Disconnect {
                username: first_field(fields, "username")?,
            },
            Command::ListRequest => Message::ListRequest,
            Command::ListResponse => Message::ListResponse { usernames: fields },
            Command::Send => {
                let (recipients, text) = split_counted(fields)?;
                Message::Send { recipients, text }
            }
            Command::Forward => {
                let (mut senders, text) = split_counted(fields)?;
                Message::Forward {
                    sender: senders.swap_remove(0),
                    text,
                }
            }
            Command::ErrServerFull => Message::ErrServerFull,
            Command::ErrUsernameTaken => Message::ErrUsernameTaken,
            Command::Notice => Message::Notice {
                text: fields.join(" "),
            },
            Command::Unknown(command) => Message::Unknown { command, fields },
        };
        Ok(message)
    }

    /// Wrap in a DATA packet
    pub fn to_packet(&self) -> Packet {
        Packet::data(self.encode())
    }
}

/// A username must be one non-empty whitespace-free token
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && !name.chars().any(char::is_whitespace)
}

fn first_field(fields: Vec<String>, name: &'static str) -> Result<String, MessageError> {
    fields
        .into_iter()
        .next()
        .ok_or(MessageError::MissingField(name))
}

/// Read the count token, then that many names, then the free-text remainder
fn split_counted(fields: Vec<String>) -> Result<(Vec<String>, String), MessageError> {
    let mut fields = fields.into_iter();
    let count_token = fields.next().ok_or(MessageError::MissingField("count"))?;
    let count = match count_token.parse::<usize>() {
        Ok(n) if n > 0 => n,
        _ => return Err(MessageError::InvalidCount(count_token)),
    };

    let names: Vec<String> = fields.by_ref().take(count).collect();
    if names.len() < count {
        return Err(MessageError::MissingRecipients {
            expected: count,
            found: names.len(),
        });
    }

    let text = fields.collect::<Vec<_>>().join(" ");
    Ok((names, text))
}
