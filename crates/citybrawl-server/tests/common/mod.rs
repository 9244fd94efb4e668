use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use citybrawl_server::build_app;
use citybrawl_server::config::ServerConfig;

pub type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Static files served by every test server.
pub const FIXTURE_WEB_ROOT: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/web");

pub struct TestServer {
    pub addr: SocketAddr,
    _shutdown: tokio::task::JoinHandle<()>,
}

impl TestServer {
    /// Start a test server with default limits.
    pub async fn new() -> Self {
        Self::from_config(ServerConfig::default()).await
    }

    pub async fn from_config(config: ServerConfig) -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let config = ServerConfig {
            listen_addr: addr.to_string(),
            web_root: FIXTURE_WEB_ROOT.to_string(),
            ..config
        };
        let (app, _state) = build_app(config);

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        // Give the server a moment to start accepting
        tokio::time::sleep(Duration::from_millis(20)).await;

        Self {
            addr,
            _shutdown: handle,
        }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }
}

/// Connect a WebSocket client to the given URL.
pub async fn ws_connect(url: &str) -> WsStream {
    let (stream, _) = tokio_tungstenite::connect_async(url).await.unwrap();
    stream
}

/// Send a JSON value as one text frame.
pub async fn ws_send_json(stream: &mut WsStream, value: &Value) {
    ws_send_text(stream, &value.to_string()).await;
}

/// Send arbitrary text as one frame (used for malformed payloads).
pub async fn ws_send_text(stream: &mut WsStream, text: &str) {
    stream
        .send(Message::Text(text.to_string().into()))
        .await
        .unwrap();
}

/// Send a JSON value as one binary frame.
pub async fn ws_send_binary(stream: &mut WsStream, value: &Value) {
    stream
        .send(Message::Binary(value.to_string().into_bytes().into()))
        .await
        .unwrap();
}

/// Read the next JSON message from a WebSocket stream (5s timeout).
pub async fn ws_read_json(stream: &mut WsStream) -> Value {
    let deadline = Duration::from_secs(5);
    tokio::time::timeout(deadline, next_json(stream))
        .await
        .expect("Timed out waiting for WebSocket message")
}

/// Try to read the next JSON message, returning None on timeout.
pub async fn ws_try_read_json(stream: &mut WsStream, timeout_ms: u64) -> Option<Value> {
    let deadline = Duration::from_millis(timeout_ms);
    tokio::time::timeout(deadline, next_json(stream)).await.ok()
}

async fn next_json(stream: &mut WsStream) -> Value {
    loop {
        match stream.next().await {
            Some(Ok(Message::Text(text))) => return serde_json::from_str(text.as_str()).unwrap(),
            Some(Ok(Message::Close(_))) => panic!("WebSocket closed unexpectedly"),
            Some(Err(e)) => panic!("WebSocket error: {e}"),
            None => panic!("WebSocket stream ended"),
            _ => continue,
        }
    }
}

/// Send `init` and return (own id, players snapshot) from the private reply.
pub async fn ws_join(stream: &mut WsStream, nickname: &str) -> (u64, Vec<Value>) {
    ws_send_json(stream, &json!({ "type": "init", "nickname": nickname })).await;
    let reply = ws_read_json(stream).await;
    assert_eq!(reply["type"], "init", "Expected init reply, got: {reply}");
    let id = reply["id"].as_u64().unwrap();
    let players = reply["players"].as_array().unwrap().clone();
    (id, players)
}

/// Read the next message and assert its `type`.
pub async fn ws_expect(stream: &mut WsStream, kind: &str) -> Value {
    let msg = ws_read_json(stream).await;
    assert_eq!(msg["type"], kind, "Expected {kind}, got: {msg}");
    msg
}

/// Assert nothing arrives within a short window.
pub async fn ws_expect_silence(stream: &mut WsStream) {
    if let Some(msg) = ws_try_read_json(stream, 200).await {
        panic!("Expected no message, got: {msg}");
    }
}
