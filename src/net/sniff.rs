//! Protocol detection from the first bytes of a connection.
//!
//! The relay serves HTTP and opaque (SMTP) clients on the same socket. An
//! HTTP client speaks first with a request line; an SMTP client waits for
//! the server greeting, so it usually sends nothing during the
//! classification window and is treated as opaque.

use std::fmt;
use std::time::Duration;

use tokio::io::AsyncRead;
use tokio::time::timeout;
use tracing::debug;

use crate::net::prebuffered::Prebuffered;

/// Number of leading bytes inspected.
pub const SNIFF_LEN: usize = 4;

/// Leading bytes that mark an HTTP request (`CONN` covers `CONNECT`).
const HTTP_PREFIXES: [&[u8; SNIFF_LEN]; 4] = [b"GET ", b"POST", b"HEAD", b"CONN"];

/// Result of protocol detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http,
    Opaque,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Http => f.write_str("http"),
            Protocol::Opaque => f.write_str("opaque"),
        }
    }
}

/// Classifies a connection from its leading bytes.
pub fn classify(prefix: &[u8]) -> Protocol {
    match prefix.get(..SNIFF_LEN) {
        Some(head) if HTTP_PREFIXES.iter().any(|p| &p[..] == head) => Protocol::Http,
        _ => Protocol::Opaque,
    }
}

/// Waits up to `window` for the first bytes and classifies the connection.
///
/// Inspected bytes stay buffered in `reader`. A client that sends fewer than
/// [`SNIFF_LEN`] bytes in time, closes, or errors is classified as opaque.
pub async fn sniff<R>(reader: &mut Prebuffered<R>, window: Duration) -> Protocol
where
    R: AsyncRead + Unpin,
{
    match timeout(window, reader.fill_to(SNIFF_LEN)).await {
        Ok(Ok(())) => classify(reader.buffer()),
        Ok(Err(e)) => {
            debug!(error = %e, buffered = reader.buffer().len(), "Peek failed");
            Protocol::Opaque
        }
        Err(_) => {
            debug!(buffered = reader.buffer().len(), "No request within classification window");
            Protocol::Opaque
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn http_methods_are_detected() {
        for req in [
            &b"GET /pubring.mix HTTP/1.1\r\n"[..],
            b"POST /submit HTTP/1.1\r\n",
            b"HEAD / HTTP/1.0\r\n",
            b"CONNECT example.org:443 HTTP/1.1\r\n",
        ] {
            assert_eq!(classify(req), Protocol::Http, "{:?}", String::from_utf8_lossy(req));
        }
    }

    #[test]
    fn other_bytes_are_opaque() {
        for data in [
            &b"EHLO client.example\r\n"[..],
            b"PUT /x HTTP/1.1\r\n",
            b"get / HTTP/1.1\r\n",
            b"GETX",
            b"\x16\x03\x01\x02\x00",
            b"GE",
            b"",
        ] {
            assert_eq!(classify(data), Protocol::Opaque);
        }
    }

    #[tokio::test]
    async fn sniff_does_not_consume() {
        let (mut client, server) = tokio::io::duplex(256);
        client.write_all(b"POST /x HTTP/1.1\r\n").await.unwrap();

        let mut reader = Prebuffered::new(server, 1024);
        assert_eq!(sniff(&mut reader, Duration::from_secs(1)).await, Protocol::Http);

        let mut head = [0u8; 7];
        reader.read_exact(&mut head).await.unwrap();
        assert_eq!(&head, b"POST /x");
    }

    #[tokio::test]
    async fn split_prefix_is_reassembled() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut reader = Prebuffered::new(server, 1024);

        let writer = tokio::spawn(async move {
            client.write_all(b"HE").await.unwrap();
            tokio::time::sleep(Duration::from_millis(20)).await;
            client.write_all(b"AD / HTTP/1.1\r\n").await.unwrap();
            client
        });

        assert_eq!(sniff(&mut reader, Duration::from_secs(1)).await, Protocol::Http);
        drop(writer.await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn silent_client_is_opaque() {
        let (_client, server) = tokio::io::duplex(256);
        let mut reader = Prebuffered::new(server, 1024);
        assert_eq!(sniff(&mut reader, Duration::from_secs(10)).await, Protocol::Opaque);
    }

    #[tokio::test]
    async fn closed_client_is_opaque() {
        let (client, server) = tokio::io::duplex(256);
        drop(client);
        let mut reader = Prebuffered::new(server, 1024);
        assert_eq!(sniff(&mut reader, Duration::from_secs(1)).await, Protocol::Opaque);
    }
}
