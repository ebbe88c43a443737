//! Client session
//!
//! Two tasks share one UDP socket: the foreground command loop only sends,
//! the background receive loop only receives. Console output from both goes
//! through one channel into a printer task so lines never interleave.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::{bind_client_socket, resolve, ClientConfig};
use crate::error::{AppError, InputError};
use crate::message::Message;
use crate::packet::{Packet, PacketKind};
use crate::types::{SessionEnd, MAX_DATAGRAM_SIZE, MAX_MESSAGE_BYTES};

/// Usage shown for `help`
pub const HELP_TEXT: &str = "\
1) msg <number_of_users> <username1> <username2> ... <message>
2) list
3) help
4) quit";

/// Channel buffer size for console lines
const CONSOLE_BUFFER_SIZE: usize = 32;

/// A line typed by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserCommand {
    Help,
    List,
    Msg { recipients: Vec<String>, text: String },
    Quit,
}

impl UserCommand {
    /// Parse one input line
    ///
    /// `msg` needs a positive count, at least that many usernames, and a body
    /// of at most `MAX_MESSAGE_BYTES` UTF-8 bytes.
    pub fn parse(line: &str) -> Result<Self, InputError> {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens.as_slice() {
            ["help"] => Ok(UserCommand::Help),
            ["list"] => Ok(UserCommand::List),
            ["quit"] => Ok(UserCommand::Quit),
            ["msg", ..] => Self::parse_msg(&tokens),
            _ => Err(InputError::IncorrectFormat),
        }
    }

    fn parse_msg(tokens: &[&str]) -> Result<Self, InputError> {
        if tokens.len() < 4 {
            return Err(InputError::IncorrectFormat);
        }

        let count = match tokens[1].parse::<usize>() {
            Ok(n) if n > 0 => n,
            _ => return Err(InputError::IncorrectFormat),
        };
        if tokens.len() < 2 + count {
            return Err(InputError::IncorrectFormat);
        }

        let text = tokens[2 + count..].join(" ");
        if text.len() > MAX_MESSAGE_BYTES {
            return Err(InputError::MessageTooLarge {
                limit: MAX_MESSAGE_BYTES,
            });
        }

        Ok(UserCommand::Msg {
            recipients: tokens[2..2 + count].iter().map(|s| s.to_string()).collect(),
            text,
        })
    }
}

/// What the receive loop does with one message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Incoming {
    /// Line to print
    pub line: Option<String>,
    /// Set when the message ends the session
    pub end: Option<SessionEnd>,
}

/// Render a message from the server
pub fn handle_incoming(message: Message) -> Incoming {
    match message {
        Message::ErrServerFull => Incoming {
            line: Some("disconnected: server full".to_string()),
            end: Some(SessionEnd::ServerFull),
        },
        Message::ErrUsernameTaken => Incoming {
            line: Some("disconnected: username not available".to_string()),
            end: Some(SessionEnd::UsernameTaken),
        },
        Message::Forward { sender, text } => Incoming {
            line: Some(format!("msg: {}: {}", sender, text)),
            end: None,
        },
        Message::ListResponse { usernames } => Incoming {
            line: Some(format!("list: {}", usernames.join(" "))),
            end: None,
        },
        other => {
            debug!("Ignoring {} message", other.command());
            Incoming::default()
        }
    }
}

/// Shared view of whether a session is still open
#[derive(Debug, Clone)]
pub struct SessionStatus(Arc<AtomicBool>);

impl SessionStatus {
    pub fn is_open(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// A client's membership from JOIN until quit or rejection
#[derive(Debug)]
pub struct ClientSession {
    username: String,
    server: SocketAddr,
    socket: Arc<UdpSocket>,
    open: Arc<AtomicBool>,
}

impl ClientSession {
    /// Resolve the server and bind a local socket
    pub async fn connect(config: &ClientConfig) -> Result<Self, AppError> {
        let server = resolve(&config.server_address, config.server_port).await?;
        let socket = bind_client_socket(config.bind).await?;
        debug!(
            "Client socket {} → {} (window {}, unused)",
            socket.local_addr()?,
            server,
            config.window
        );

        Ok(Self {
            username: config.username.clone(),
            server,
            socket: Arc::new(socket),
            open: Arc::new(AtomicBool::new(true)),
        })
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    pub fn status(&self) -> SessionStatus {
        SessionStatus(Arc::clone(&self.open))
    }

    /// Encode and send one message to the server
    pub async fn send(&self, message: &Message) -> Result<(), AppError> {
        self.send_frame(&message.to_packet().encode()).await
    }

    async fn send_frame(&self, frame: &[u8]) -> Result<(), AppError> {
        self.socket.send_to(frame, self.server).await?;
        Ok(())
    }

    /// Join, then run the command loop over `input` until quit or rejection
    ///
    /// Output for the user is written line by line to `output`.
    pub async fn start<R, W>(self, input: R, output: W) -> Result<SessionEnd, AppError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (console_tx, console_rx) = mpsc::channel(CONSOLE_BUFFER_SIZE);
        let printer = tokio::spawn(print_lines(console_rx, output));

        self.send(&Message::Join {
            username: self.username.clone(),
        })
        .await?;
        info!("Joining {} as {}", self.server, self.username);

        let mut receiver = tokio::spawn(receive_loop(
            Arc::clone(&self.socket),
            self.server,
            Arc::clone(&self.open),
            console_tx.clone(),
        ));

        let result = self.command_loop(input, &console_tx, &mut receiver).await;

        receiver.abort();
        self.open.store(false, Ordering::SeqCst);
        drop(console_tx);
        match printer.await {
            Ok(Err(e)) => warn!("Console output failed: {}", e),
            Err(e) => warn!("Console task failed: {}", e),
            Ok(Ok(())) => {}
        }

        if let Ok(end) = &result {
            info!("Session ended: {}", end);
        }
        result
    }

    async fn command_loop<R>(
        &self,
        input: R,
        console: &mpsc::Sender<String>,
        receiver: &mut JoinHandle<SessionEnd>,
    ) -> Result<SessionEnd, AppError>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut lines = input.lines();

        loop {
            tokio::select! {
                finished = &mut *receiver => {
                    return Ok(finished.unwrap_or_else(|e| {
                        warn!("Receive task failed: {}", e);
                        SessionEnd::ConnectionLost
                    }));
                }
                line = lines.next_line() => {
                    let Some(line) = line? else {
                        debug!("Input closed");
                        self.send_disconnect().await?;
                        return Ok(SessionEnd::Quit);
                    };
                    if let Some(end) = self.handle_line(&line, console).await? {
                        return Ok(end);
                    }
                }
            }
        }
    }

    /// Act on one input line; returns `Some` when the session should end
    async fn handle_line(
        &self,
        line: &str,
        console: &mpsc::Sender<String>,
    ) -> Result<Option<SessionEnd>, AppError> {
        match UserCommand::parse(line) {
            Ok(UserCommand::Help) => say(console, HELP_TEXT).await?,
            Ok(UserCommand::List) => self.send(&Message::ListRequest).await?,
            Ok(UserCommand::Msg { recipients, text }) => {
                let frame = Message::Send { recipients, text }.to_packet().encode();
                if frame.len() > MAX_DATAGRAM_SIZE {
                    let err = InputError::MessageTooLarge {
                        limit: MAX_DATAGRAM_SIZE,
                    };
                    say(console, err.to_string()).await?;
                } else {
                    self.send_frame(&frame).await?;
                }
            }
            Ok(UserCommand::Quit) => {
                self.send_disconnect().await?;
                say(console, "quitting").await?;
                return Ok(Some(SessionEnd::Quit));
            }
            Err(e) => say(console, e.to_string()).await?,
        }
        Ok(None)
    }

    async fn send_disconnect(&self) -> Result<(), AppError> {
        self.send(&Message::Disconnect {
            username: self.username.clone(),
        })
        .await
    }
}

/// Background receive loop
///
/// Datagrams not sent by `server` and frames that fail to decode are
/// dropped. Ends on a rejection from the server or a socket error, marking
/// the session closed either way.
async fn receive_loop(
    socket: Arc<UdpSocket>,
    server: SocketAddr,
    open: Arc<AtomicBool>,
    console: mpsc::Sender<String>,
) -> SessionEnd {
    let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];

    let end = loop {
        let (len, source) = match socket.recv_from(&mut buf).await {
            Ok(received) => received,
            Err(e) => {
                warn!("Receive failed: {}", e);
                break SessionEnd::ConnectionLost;
            }
        };

        if source != server {
            warn!("Dropping datagram from unexpected source {}", source);
            continue;
        }

        let Some(message) = decode_datagram(&buf[..len], source) else {
            continue;
        };

        let incoming = handle_incoming(message);
        if let Some(line) = incoming.line {
            if console.send(line).await.is_err() {
                debug!("Console closed, ending receive loop");
                break SessionEnd::ConnectionLost;
            }
        }
        if let Some(end) = incoming.end {
            break end;
        }
    };

    open.store(false, Ordering::SeqCst);
    end
}

fn decode_datagram(bytes: &[u8], source: SocketAddr) -> Option<Message> {
    let decoded = match Packet::decode(bytes) {
        Ok(decoded) => decoded,
        Err(e) => {
            warn!("Dropping packet from {}: {}", source, e);
            return None;
        }
    };
    if !decoded.checksum_valid {
        warn!("Dropping packet from {}: checksum mismatch", source);
        return None;
    }
    if decoded.packet.kind != PacketKind::Data {
        return None;
    }

    match Message::decode(&decoded.packet.payload) {
        Ok(message) => Some(message),
        Err(e) => {
            debug!("Undecodable message from {}: {}", source, e);
            None
        }
    }
}

async fn say(console: &mpsc::Sender<String>, line: impl Into<String>) -> Result<(), AppError> {
    console
        .send(line.into())
        .await
        .map_err(|_| AppError::ChannelSend)
}

async fn print_lines<W>(mut lines: mpsc::Receiver<String>, mut output: W) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(line) = lines.recv().await {
        output.write_all(line.as_bytes()).await?;
        output.write_all(b"\n").await?;
        output.flush().await?;
    }
    Ok(())
}
