//! Shared bootstrap for wire-level integration tests. Each test gets its
//! own server instance on an ephemeral port — unlike
//! `MantasImb-jet_raiders/game_server/tests/support/mod.rs`'s single
//! process-wide server, this crate's tests exercise distinct lobbies
//! (duplicate-name, multi-match scenarios) so sharing one instance across
//! tests would make them interfere with each other.

use std::net::SocketAddr;
use std::sync::Arc;

use caro_server::history::HistoryStore;
use caro_server::lobby::Lobby;
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};

/// Spawns a fresh lobby + accept loop bound to an ephemeral localhost
/// port and returns the address to connect to. The history store is
/// in-memory, matching how unit tests across the crate construct a
/// `Lobby` for isolated scenarios.
pub async fn spawn_server() -> SocketAddr {
    let history = Arc::new(HistoryStore::open(":memory:").expect("open in-memory history store"));
    let lobby = Lobby::new(history, 16);
    tokio::spawn(Arc::clone(&lobby).run_broadcast_loop());

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral test port");
    let addr = listener.local_addr().expect("local addr");

    tokio::spawn(async move {
        loop {
            let Ok((stream, _)) = listener.accept().await else {
                break;
            };
            let lobby = Arc::clone(&lobby);
            tokio::spawn(async move {
                caro_server::connection::handle_connection(stream, lobby).await;
            });
        }
    });

    addr
}

/// A thin line-oriented client over a raw `TcpStream`, for driving the
/// newline-JSON wire protocol directly the way a real player's socket
/// would, without going through the reference terminal client.
pub struct TestClient {
    reader: BufReader<tokio::net::tcp::OwnedReadHalf>,
    writer: tokio::net::tcp::OwnedWriteHalf,
}

impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect to test server");
        let (reader, writer) = stream.into_split();
        Self { reader: BufReader::new(reader), writer }
    }

    pub async fn send(&mut self, frame: Value) {
        let line = format!("{}\n", frame);
        self.writer.write_all(line.as_bytes()).await.expect("write frame");
    }

    /// Reads one frame, parsed as JSON. Panics (after a generous timeout)
    /// if the connection closes or no frame arrives in time — every test
    /// using this expects a specific reply.
    pub async fn recv(&mut self) -> Value {
        let mut line = String::new();
        let fut = self.reader.read_line(&mut line);
        tokio::time::timeout(std::time::Duration::from_secs(5), fut)
            .await
            .expect("timed out waiting for a frame")
            .expect("read frame");
        serde_json::from_str(line.trim_end()).expect("frame is valid JSON")
    }

    pub async fn login(&mut self, name: &str) -> Value {
        self.send(serde_json::json!({"type": "login", "name": name})).await;
        self.recv().await
    }

    /// Asserts the server has closed its side of the connection: the next
    /// read yields EOF (0 bytes) rather than another frame.
    pub async fn expect_closed(&mut self) {
        let mut line = String::new();
        let fut = self.reader.read_line(&mut line);
        let n = tokio::time::timeout(std::time::Duration::from_secs(5), fut)
            .await
            .expect("timed out waiting for connection close")
            .expect("read after close should not error");
        assert_eq!(n, 0, "expected EOF, got more data: {line:?}");
    }
}
