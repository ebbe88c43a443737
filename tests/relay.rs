use std::net::SocketAddr;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines};
use tokio::net::UdpSocket;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use udp_chat::{AppError, ChatServer, ClientConfig, ClientSession, SessionEnd};

const READ_TIMEOUT: Duration = Duration::from_secs(3);

struct TestClient {
    input: DuplexStream,
    output: Lines<BufReader<DuplexStream>>,
    handle: JoinHandle<Result<SessionEnd, AppError>>,
}

impl TestClient {
    async fn connect(name: &str, server: SocketAddr) -> Self {
        let mut config = ClientConfig::new(name);
        config.server_address = server.ip().to_string();
        config.server_port = server.port();
        config.bind = Some("127.0.0.1:0".parse().unwrap());

        let session = ClientSession::connect(&config).await.expect("connect");
        let (input, input_rx) = tokio::io::duplex(4096);
        let (output_tx, output) = tokio::io::duplex(4096);
        let handle = tokio::spawn(session.start(BufReader::new(input_rx), output_tx));

        Self {
            input,
            output: BufReader::new(output).lines(),
            handle,
        }
    }

    /// Connect and wait until the server lists us
    async fn join(name: &str, server: SocketAddr) -> Self {
        let mut client = Self::connect(name, server).await;
        client.send_line("list").await;
        let line = client.read_line("list after join").await;
        assert!(
            line.starts_with("list: ") && line.split_whitespace().any(|n| n == name),
            "{name} not listed: {line}"
        );
        client
    }

    async fn send_line(&mut self, line: &str) {
        self.input
            .write_all(format!("{line}\n").as_bytes())
            .await
            .expect("write input");
    }

    async fn read_line(&mut self, what: &str) -> String {
        timeout(READ_TIMEOUT, self.output.next_line())
            .await
            .unwrap_or_else(|_| panic!("timed out waiting for {what}"))
            .expect("read output")
            .unwrap_or_else(|| panic!("output closed waiting for {what}"))
    }

    async fn finish(self) -> SessionEnd {
        timeout(READ_TIMEOUT, self.handle)
            .await
            .expect("session did not end")
            .expect("session task panicked")
            .expect("session failed")
    }
}

async fn spawn_server(max_clients: usize) -> (SocketAddr, JoinHandle<Result<(), AppError>>) {
    let socket = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let server = ChatServer::from_socket(socket, max_clients);
    let addr = server.local_addr().unwrap();
    (addr, tokio::spawn(server.run()))
}

#[tokio::test]
async fn duplicate_username_ends_second_session() {
    let (addr, server) = spawn_server(10).await;

    let mut first = TestClient::join("alice", addr).await;
    let mut second = TestClient::connect("alice", addr).await;

    assert_eq!(
        second.read_line("username rejection").await,
        "disconnected: username not available"
    );
    assert_eq!(second.finish().await, SessionEnd::UsernameTaken);

    // First alice is still registered
    first.send_line("list").await;
    assert_eq!(first.read_line("list").await, "list: alice");

    first.send_line("quit").await;
    assert_eq!(first.read_line("quit").await, "quitting");
    assert_eq!(first.finish().await, SessionEnd::Quit);

    server.abort();
}

#[tokio::test]
async fn message_is_forwarded_to_recipient() {
    let (addr, server) = spawn_server(10).await;

    let mut alice = TestClient::join("alice", addr).await;
    let mut bob = TestClient::join("bob", addr).await;

    alice.send_line("msg 1 bob hello there").await;
    assert_eq!(
        bob.read_line("forwarded message").await,
        "msg: alice: hello there"
    );

    alice.send_line("quit").await;
    bob.send_line("quit").await;
    assert_eq!(alice.finish().await, SessionEnd::Quit);
    assert_eq!(bob.finish().await, SessionEnd::Quit);

    server.abort();
}

#[tokio::test]
async fn missing_recipients_are_skipped() {
    let (addr, server) = spawn_server(10).await;

    let mut alice = TestClient::join("alice", addr).await;
    let mut bob = TestClient::join("bob", addr).await;

    alice.send_line("msg 2 eve bob hi").await;
    assert_eq!(bob.read_line("forwarded message").await, "msg: alice: hi");

    // Alice gets nothing back for eve; her next output is her own list
    alice.send_line("list").await;
    assert_eq!(alice.read_line("list").await, "list: alice bob");

    server.abort();
}

#[tokio::test]
async fn list_is_sorted() {
    let (addr, server) = spawn_server(10).await;

    let _carol = TestClient::join("carol", addr).await;
    let mut alice = TestClient::join("alice", addr).await;
    let _bob = TestClient::join("bob", addr).await;

    alice.send_line("list").await;
    assert_eq!(alice.read_line("list").await, "list: alice bob carol");

    server.abort();
}

#[tokio::test]
async fn full_server_rejects_join() {
    let (addr, server) = spawn_server(1).await;

    let _alice = TestClient::join("alice", addr).await;
    let mut bob = TestClient::connect("bob", addr).await;

    assert_eq!(
        bob.read_line("server full").await,
        "disconnected: server full"
    );
    assert_eq!(bob.finish().await, SessionEnd::ServerFull);

    server.abort();
}

#[tokio::test]
async fn quit_frees_username() {
    let (addr, server) = spawn_server(10).await;

    let mut alice = TestClient::join("alice", addr).await;
    alice.send_line("quit").await;
    assert_eq!(alice.read_line("quit").await, "quitting");
    assert_eq!(alice.finish().await, SessionEnd::Quit);

    let mut again = TestClient::join("alice", addr).await;
    again.send_line("list").await;
    assert_eq!(again.read_line("list").await, "list: alice");

    server.abort();
}

#[tokio::test]
async fn local_input_errors_stay_local() {
    let (addr, server) = spawn_server(10).await;

    let mut alice = TestClient::join("alice", addr).await;

    alice.send_line("msg x bob hi").await;
    assert_eq!(
        alice.read_line("format notice").await,
        "incorrect userinput format"
    );

    alice.send_line(&format!("msg 1 bob {}", "a".repeat(1501))).await;
    assert_eq!(
        alice.read_line("size notice").await,
        "Message size exceeds the maximum allowed size of 1500 bytes."
    );

    alice.send_line("help").await;
    assert_eq!(
        alice.read_line("help").await,
        "1) msg <number_of_users> <username1> <username2> ... <message>"
    );

    server.abort();
}
