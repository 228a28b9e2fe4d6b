//! Shared utilities for integration tests: a mock SOCKS5 proxy, mock HTTP
//! backends and an SMTP-like echo upstream.

#![allow(dead_code)]

use std::collections::HashMap;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, SocketAddrV4, SocketAddrV6};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;

use yamn_proxy::lifecycle::{self, Running, Shutdown};
use yamn_proxy::RelayConfig;

/// Greeting the echo upstream sends before reading anything.
pub const GREETING: &[u8] = b"220 mock ESMTP ready\r\n";

/// A running mock SOCKS5 proxy.
pub struct MockSocks {
    pub addr: SocketAddr,
    /// Every CONNECT target requested, in order.
    pub targets: Arc<Mutex<Vec<String>>>,
}

impl MockSocks {
    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

/// Start a no-auth SOCKS5 proxy.
///
/// CONNECT targets found in `overrides` are redirected to the mapped
/// address; IP targets are dialed directly; other names fail with
/// "host unreachable". No DNS is performed.
pub async fn start_socks5(overrides: HashMap<String, SocketAddr>) -> MockSocks {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let targets = Arc::new(Mutex::new(Vec::new()));
    let overrides = Arc::new(overrides);

    let seen = targets.clone();
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            let seen = seen.clone();
            let overrides = overrides.clone();
            tokio::spawn(async move {
                let _ = serve_socks5(socket, &overrides, &seen).await;
            });
        }
    });

    MockSocks { addr, targets }
}

async fn serve_socks5(
    mut client: TcpStream,
    overrides: &HashMap<String, SocketAddr>,
    seen: &Mutex<Vec<String>>,
) -> std::io::Result<()> {
    let mut header = [0u8; 2];
    client.read_exact(&mut header).await?;
    let mut methods = vec![0u8; header[1] as usize];
    client.read_exact(&mut methods).await?;
    client.write_all(&[5, 0]).await?;

    let mut request = [0u8; 4];
    client.read_exact(&mut request).await?;
    let target = match request[3] {
        1 => {
            let mut raw = [0u8; 6];
            client.read_exact(&mut raw).await?;
            let ip = Ipv4Addr::new(raw[0], raw[1], raw[2], raw[3]);
            SocketAddrV4::new(ip, u16::from_be_bytes([raw[4], raw[5]])).to_string()
        }
        3 => {
            let mut len = [0u8; 1];
            client.read_exact(&mut len).await?;
            let mut raw = vec![0u8; len[0] as usize + 2];
            client.read_exact(&mut raw).await?;
            let port = u16::from_be_bytes([raw[raw.len() - 2], raw[raw.len() - 1]]);
            let host = String::from_utf8_lossy(&raw[..raw.len() - 2]).into_owned();
            format!("{host}:{port}")
        }
        4 => {
            let mut raw = [0u8; 18];
            client.read_exact(&mut raw).await?;
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&raw[..16]);
            let port = u16::from_be_bytes([raw[16], raw[17]]);
            SocketAddrV6::new(Ipv6Addr::from(octets), port, 0, 0).to_string()
        }
        _ => return Ok(()),
    };
    seen.lock().unwrap().push(target.clone());

    let dest = overrides
        .get(&target)
        .copied()
        .or_else(|| target.parse::<SocketAddr>().ok());
    let upstream = match dest {
        Some(dest) => TcpStream::connect(dest).await.ok(),
        None => None,
    };

    let Some(mut upstream) = upstream else {
        // Host unreachable.
        client.write_all(&[5, 4, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
        return Ok(());
    };
    client.write_all(&[5, 0, 0, 1, 0, 0, 0, 0, 0, 0]).await?;
    tokio::io::copy_bidirectional(&mut client, &mut upstream).await?;
    Ok(())
}

/// A request as seen by a capturing backend.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Start a backend that records each request and answers with `body`.
pub async fn start_capturing_backend(
    body: &'static str,
) -> (SocketAddr, mpsc::UnboundedReceiver<CapturedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            let tx = tx.clone();
            tokio::spawn(async move {
                let Some(captured) = read_request(&mut socket).await else {
                    return;
                };
                let _ = tx.send(captured);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nX-Backend: mock\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    (addr, rx)
}

/// Start a backend that answers every request with `status` and no body.
pub async fn start_status_backend(status: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if read_request(&mut socket).await.is_none() {
                    return;
                }
                let response =
                    format!("HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let (head_len, method, path, headers) = loop {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);

        let mut raw_headers = [httparse::EMPTY_HEADER; 64];
        let mut req = httparse::Request::new(&mut raw_headers);
        if let httparse::Status::Complete(len) = req.parse(&buf).ok()? {
            let headers: HashMap<String, String> = req
                .headers
                .iter()
                .map(|h| {
                    (
                        h.name.to_ascii_lowercase(),
                        String::from_utf8_lossy(h.value).into_owned(),
                    )
                })
                .collect();
            break (
                len,
                req.method?.to_string(),
                req.path?.to_string(),
                headers,
            );
        }
    };

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    while buf.len() < head_len + content_length {
        let n = socket.read(&mut chunk).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    Some(CapturedRequest {
        method,
        path,
        headers,
        body: buf[head_len..head_len + content_length].to_vec(),
    })
}

/// Start an SMTP-like upstream: sends [`GREETING`], then echoes everything.
pub async fn start_echo_upstream() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((mut socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if socket.write_all(GREETING).await.is_err() {
                    return;
                }
                let (mut rd, mut wr) = socket.split();
                let _ = tokio::io::copy(&mut rd, &mut wr).await;
            });
        }
    });

    addr
}

/// An address nothing listens on.
pub fn closed_port() -> SocketAddr {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

/// Relay configuration for tests: ephemeral listen port, no companion.
pub fn test_config(proxy: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig {
        proxy_address: proxy.to_string(),
        listen_address: "127.0.0.1:0".to_string(),
        ..Default::default()
    };
    config.companion.enabled = false;
    config
}

/// Start the relay and return it with its shutdown handle.
pub async fn start_relay(config: RelayConfig) -> (Running, Shutdown) {
    let shutdown = Shutdown::new();
    let running = lifecycle::start(config, &shutdown).await.unwrap();
    (running, shutdown)
}

/// Read until the relay closes the connection, failing after `limit`.
pub async fn read_until_closed(stream: &mut TcpStream, limit: Duration) -> Vec<u8> {
    let mut out = Vec::new();
    tokio::time::timeout(limit, stream.read_to_end(&mut out))
        .await
        .expect("relay did not close the connection")
        .unwrap();
    out
}
