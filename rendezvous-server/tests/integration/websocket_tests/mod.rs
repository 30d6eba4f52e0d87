mod test_http_routes;
mod test_websocket_session;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use rendezvous_core::SignalingMessage;
use rendezvous_server::{AppState, Coordinator, MemoryRoomStore, SocketTransport, build_routes};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn spawn_server() -> SocketAddr {
    let transport = Arc::new(SocketTransport::new());
    let coordinator = Arc::new(Coordinator::new(
        Arc::new(MemoryRoomStore::new()),
        transport.clone(),
    ));
    let app = build_routes(AppState {
        coordinator,
        registry: transport,
        dispatch_timeout: Duration::from_secs(5),
    });

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

/// Minimal HTTP/1.1 exchange. Returns the status code and body.
pub async fn http(addr: SocketAddr, method: &str, path: &str) -> Result<(u16, String)> {
    let mut stream = TcpStream::connect(addr).await?;
    let request = format!(
        "{method} {path} HTTP/1.1\r\nHost: {addr}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await?;

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await?;

    let status = raw
        .split_whitespace()
        .nth(1)
        .context("No status line")?
        .parse()?;
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    Ok((status, body))
}

pub async fn connect(addr: SocketAddr) -> Result<WsClient> {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await?;
    Ok(ws)
}

pub async fn send_json(ws: &mut WsClient, value: serde_json::Value) -> Result<()> {
    ws.send(Message::Text(value.to_string().into())).await?;
    Ok(())
}

pub async fn next_message(ws: &mut WsClient) -> Result<SignalingMessage> {
    loop {
        let msg = tokio::time::timeout(Duration::from_secs(2), ws.next())
            .await
            .context("Timeout waiting for WebSocket frame")?
            .context("WebSocket closed")??;
        if let Message::Text(text) = msg {
            return serde_json::from_str(text.as_str()).context("Undecodable frame");
        }
    }
}
