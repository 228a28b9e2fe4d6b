//! Non-destructive read-ahead for client streams.
//!
//! [`Prebuffered`] wraps an `AsyncRead` so bytes can be inspected (protocol
//! sniffing, request head parsing) and still be delivered to whoever reads
//! the stream next.

use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{self, AsyncRead, AsyncReadExt, ReadBuf};

/// Initial capacity for the internal buffer.
const INITIAL_CAPACITY: usize = 4 * 1024;

/// A read-ahead buffer in front of an `AsyncRead`.
///
/// Reads drain the buffered bytes first, then fall through to the inner reader.
pub struct Prebuffered<R> {
    inner: R,
    buf: BytesMut,
    max_len: usize,
}

impl<R: AsyncRead + Unpin> Prebuffered<R> {
    /// Wraps `inner`, buffering at most `max_len` bytes ahead.
    pub fn new(inner: R, max_len: usize) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_CAPACITY),
            max_len,
        }
    }

    /// Wraps `inner` with `prefix` already buffered in front of it.
    pub fn with_prefix(prefix: Bytes, inner: R) -> Self {
        let max_len = prefix.len().max(INITIAL_CAPACITY);
        let mut buf = BytesMut::with_capacity(max_len);
        buf.extend_from_slice(&prefix);
        Self {
            inner,
            buf,
            max_len,
        }
    }

    /// Returns the unconsumed buffered bytes.
    pub fn buffer(&self) -> &[u8] {
        &self.buf[..]
    }

    pub fn is_full(&self) -> bool {
        self.buf.len() >= self.max_len
    }

    /// Discards `n` bytes from the front of the buffer.
    pub fn discard(&mut self, n: usize) {
        let n = n.min(self.buf.len());
        let _ = self.buf.split_to(n);
    }

    /// Buffers more data from the inner reader. Returns 0 at end of stream.
    pub async fn buffer_more(&mut self) -> io::Result<usize> {
        let max = self.max_len.saturating_sub(self.buf.len());
        let n = (&mut self.inner)
            .take(max as u64)
            .read_buf(&mut self.buf)
            .await?;
        Ok(n)
    }

    /// Buffers until at least `len` bytes are available.
    ///
    /// Fails with `UnexpectedEof` if the stream ends first.
    pub async fn fill_to(&mut self, len: usize) -> io::Result<()> {
        while self.buf.len() < len {
            if self.is_full() {
                return Err(io::Error::new(
                    io::ErrorKind::OutOfMemory,
                    "read-ahead limit reached",
                ));
            }
            if self.buffer_more().await? == 0 {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
        }
        Ok(())
    }

    /// Returns the buffer and the inner reader.
    pub fn into_parts(self) -> (Bytes, R) {
        (self.buf.freeze(), self.inner)
    }
}

impl<R: AsyncRead + Unpin> AsyncRead for Prebuffered<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        out: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        if !out.has_remaining_mut() {
            Poll::Ready(Ok(()))
        } else if !self.buf.is_empty() {
            let n = self.buf.len().min(out.remaining_mut());
            let chunk = self.buf.split_to(n);
            out.put_slice(&chunk);
            Poll::Ready(Ok(()))
        } else {
            Pin::new(&mut self.inner).poll_read(cx, out)
        }
    }
}
