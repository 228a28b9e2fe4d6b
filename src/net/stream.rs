//! Byte-stream endpoints a session can own.

use std::io;
use std::time::Duration;

use socket2::{SockRef, TcpKeepalive};
use tokio::io::{AsyncRead, AsyncWrite, DuplexStream};
use tokio::net::TcpStream;

/// A full-duplex connection usable as either end of a session.
///
/// Transport options are optional capabilities: the defaults report them as
/// unsupported and callers skip them.
pub trait ClientStream: AsyncRead + AsyncWrite + Unpin + Send + 'static {
    /// Enables TCP keep-alive probes every `interval`.
    ///
    /// Returns `Ok(false)` when the transport has no keep-alive option.
    fn enable_keepalive(&self, interval: Duration) -> io::Result<bool> {
        let _ = interval;
        Ok(false)
    }
}

impl ClientStream for TcpStream {
    fn enable_keepalive(&self, interval: Duration) -> io::Result<bool> {
        let keepalive = TcpKeepalive::new().with_time(interval);
        #[cfg(any(target_os = "linux", target_os = "macos", windows))]
        let keepalive = keepalive.with_interval(interval);
        SockRef::from(self).set_tcp_keepalive(&keepalive)?;
        Ok(true)
    }
}

impl ClientStream for DuplexStream {}
