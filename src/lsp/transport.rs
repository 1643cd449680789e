//! Transport layer - stdio and WebSocket
//!
//! - stdio: for native editors
//! - WebSocket: for browser-hosted Monaco editors
//!
//! WebSocket clients send bare JSON-RPC messages, one per frame. tower-lsp
//! speaks the framed wire format (`Content-Length` headers), so each
//! connection runs the server over in-memory pipes and translates between
//! the two at the edges.

use std::net::SocketAddr;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::tungstenite::Message;
use tower_lsp::{LspService, Server};
use tracing::{info, warn};

use super::backend::LspBackend;
use super::workspace::WorkspaceConfig;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Capacity of each in-memory pipe between a socket and its server.
const PIPE_CAPACITY: usize = 64 * 1024;

const HEADER_SEPARATOR: &[u8] = b"\r\n\r\n";

/// Run the LSP server over stdio.
pub async fn run_stdio(config: WorkspaceConfig) {
    let stdin = tokio::io::stdin();
    let stdout = tokio::io::stdout();

    let (service, socket) = LspService::new(move |client| LspBackend::new(client, config));

    Server::new(stdin, stdout, socket).serve(service).await;
}

/// Run the LSP server over WebSocket. Each connection gets its own workspace.
pub async fn run_websocket(addr: SocketAddr, config: WorkspaceConfig) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "WebSocket server listening");

    loop {
        let (stream, peer) = listener.accept().await?;
        info!(%peer, "new WebSocket connection");

        let config = config.clone();
        tokio::spawn(async move {
            if let Err(e) = serve_connection(stream, config).await {
                warn!(%peer, error = %e, "WebSocket connection failed");
            }
        });
    }
}

async fn serve_connection(stream: TcpStream, config: WorkspaceConfig) -> Result<(), BoxError> {
    let ws_stream = tokio_tungstenite::accept_async(stream).await?;
    let (mut ws_write, mut ws_read) = ws_stream.split();

    let (mut to_server, server_input) = tokio::io::duplex(PIPE_CAPACITY);
    let (server_output, mut from_server) = tokio::io::duplex(PIPE_CAPACITY);

    let (service, socket) = LspService::new(move |client| LspBackend::new(client, config));
    let server = tokio::spawn(Server::new(server_input, server_output, socket).serve(service));

    let inbound = async move {
        while let Some(msg) = ws_read.next().await {
            let body = match msg {
                Ok(Message::Text(text)) => text.as_bytes().to_vec(),
                Ok(Message::Binary(data)) => data.to_vec(),
                Ok(Message::Close(_)) => break,
                Ok(_) => continue, // ping/pong
                Err(e) => {
                    warn!(error = %e, "WebSocket read error");
                    break;
                }
            };

            if to_server.write_all(&frame_message(&body)).await.is_err() {
                break;
            }
        }
    };

    let outbound = async move {
        let mut pending = Vec::new();
        let mut chunk = vec![0u8; 8 * 1024];

        loop {
            let n = match from_server.read(&mut chunk).await {
                Ok(0) | Err(_) => return,
                Ok(n) => n,
            };
            pending.extend_from_slice(&chunk[..n]);

            while let Some(body) = take_message(&mut pending) {
                if ws_write.send(Message::Text(body.into())).await.is_err() {
                    return;
                }
            }
        }
    };

    tokio::select! {
        _ = inbound => {}
        _ = outbound => {}
    }

    // Both pipe ends held by the bridge are gone, so the server sees EOF.
    server.await?;
    Ok(())
}

/// Prefix a JSON-RPC body with its `Content-Length` header.
fn frame_message(body: &[u8]) -> Vec<u8> {
    let mut framed = format!("Content-Length: {}\r\n\r\n", body.len()).into_bytes();
    framed.extend_from_slice(body);
    framed
}

/// Remove the first complete framed message from `pending` and return its body.
fn take_message(pending: &mut Vec<u8>) -> Option<String> {
    let header_end = pending
        .windows(HEADER_SEPARATOR.len())
        .position(|w| w == HEADER_SEPARATOR)?;
    let header = std::str::from_utf8(&pending[..header_end]).ok()?;
    let length = content_length(header)?;

    let body_start = header_end + HEADER_SEPARATOR.len();
    let body_end = body_start + length;
    if pending.len() < body_end {
        return None;
    }

    let body = String::from_utf8_lossy(&pending[body_start..body_end]).into_owned();
    pending.drain(..body_end);
    Some(body)
}

fn content_length(header: &str) -> Option<usize> {
    header.lines().find_map(|line| {
        let (name, value) = line.split_once(':')?;
        name.trim()
            .eq_ignore_ascii_case("content-length")
            .then(|| value.trim().parse().ok())
            .flatten()
    })
}
