//! ChatServer implementation
//!
//! Single-task event loop: receive one datagram, dispatch it against the
//! registry, send whatever the dispatch produced, repeat. The loop is the
//! only owner of the registry, so no locks are needed.

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::config::{resolve, ServerConfig};
use crate::dispatcher::{dispatch_datagram, Dispatch};
use crate::error::AppError;
use crate::registry::ClientRegistry;
use crate::types::MAX_DATAGRAM_SIZE;

/// The chat relay server
pub struct ChatServer {
    socket: UdpSocket,
    registry: ClientRegistry,
}

impl ChatServer {
    /// Resolve the configured address and bind the server socket
    pub async fn bind(config: &ServerConfig) -> Result<Self, AppError> {
        let addr = resolve(&config.address, config.port).await?;
        let socket = UdpSocket::bind(addr).await?;
        debug!("Window size {} (unused)", config.window);

        Ok(Self::from_socket(socket, config.max_clients))
    }

    /// Serve on an already bound socket
    pub fn from_socket(socket: UdpSocket, max_clients: usize) -> Self {
        Self {
            socket,
            registry: ClientRegistry::new(max_clients),
        }
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.socket.local_addr()
    }

    /// Run the event loop forever
    pub async fn run(self) -> Result<(), AppError> {
        self.run_until(std::future::pending()).await
    }

    /// Run the event loop until `shutdown` resolves
    ///
    /// Receive errors are logged and the loop carries on.
    pub async fn run_until<F>(mut self, shutdown: F) -> Result<(), AppError>
    where
        F: Future<Output = ()>,
    {
        info!("ChatServer started on {}", self.local_addr()?);
        tokio::pin!(shutdown);

        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                received = self.socket.recv_from(&mut buf) => match received {
                    Ok((len, source)) => {
                        let dispatch = dispatch_datagram(&mut self.registry, source, &buf[..len]);
                        self.deliver(dispatch).await;
                    }
                    Err(e) => warn!("Receive failed: {}", e),
                },
            }
        }

        info!("ChatServer shutting down");
        Ok(())
    }

    /// Print console events and send outbound packets
    async fn deliver(&self, dispatch: Dispatch) {
        for event in &dispatch.events {
            println!("{}", event);
        }

        for outbound in dispatch.outbound {
            let frame = outbound.message.to_packet().encode();
            if let Err(e) = self.socket.send_to(&frame, outbound.dest).await {
                warn!("Failed to send to {}: {}", outbound.dest, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::oneshot;
    use tokio::time::timeout;

    use super::*;
    use crate::message::Message;
    use crate::packet::Packet;

    async fn recv_message(socket: &UdpSocket) -> Message {
        let mut buf = vec![0u8; MAX_DATAGRAM_SIZE];
        let (len, _) = timeout(Duration::from_secs(3), socket.recv_from(&mut buf))
            .await
            .expect("timed out")
            .unwrap();
        let decoded = Packet::decode(&buf[..len]).unwrap();
        assert!(decoded.checksum_valid);
        Message::decode(&decoded.packet.payload).unwrap()
    }

    #[tokio::test]
    async fn test_server_answers_list_request() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = ChatServer::from_socket(socket, 10);
        let server_addr = server.local_addr().unwrap();
        let (stop_tx, stop_rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async {
            let _ = stop_rx.await;
        }));

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let join = Message::Join {
            username: "alice".to_string(),
        };
        client
            .send_to(&join.to_packet().encode(), server_addr)
            .await
            .unwrap();
        client
            .send_to(&Message::ListRequest.to_packet().encode(), server_addr)
            .await
            .unwrap();

        assert_eq!(
            recv_message(&client).await,
            Message::ListResponse {
                usernames: vec!["alice".to_string()]
            }
        );

        stop_tx.send(()).unwrap();
        handle.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_server_survives_garbage() {
        let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let server = ChatServer::from_socket(socket, 10);
        let server_addr = server.local_addr().unwrap();
        let handle = tokio::spawn(server.run());

        let client = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        client.send_to(b"\x00\x01garbage", server_addr).await.unwrap();
        client
            .send_to(&Message::ListRequest.to_packet().encode(), server_addr)
            .await
            .unwrap();

        assert_eq!(
            recv_message(&client).await,
            Message::ListResponse { usernames: vec![] }
        );
        assert!(!handle.is_finished());
        handle.abort();
    }
}
