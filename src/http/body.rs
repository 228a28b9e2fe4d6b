//! Streaming request bodies out of the client connection.
//!
//! Bodies are never buffered whole: the upstream transport pulls pieces from
//! the client stream as it sends them.

use std::io;

use bytes::{Bytes, BytesMut};
use futures_util::stream::{self, Stream};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

use crate::http::request::BodyKind;

/// Largest piece handed to the transport at once.
const PIECE_LEN: u64 = 16 * 1024;

/// Longest accepted chunk-size or trailer line.
const MAX_LINE_LEN: u64 = 4 * 1024;

/// Builds the outbound body for a request, or `None` when it has none.
pub fn outbound_body<R>(kind: BodyKind, reader: R) -> Option<reqwest::Body>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    match kind {
        BodyKind::Empty => None,
        BodyKind::Length(len) => Some(reqwest::Body::wrap_stream(fixed_length(reader, len))),
        BodyKind::Chunked => Some(reqwest::Body::wrap_stream(chunked(reader))),
    }
}

/// Yields exactly `len` bytes from `reader`.
pub fn fixed_length<R>(reader: R, len: u64) -> impl Stream<Item = io::Result<Bytes>> + Send
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::try_unfold((reader, len), next_fixed)
}

async fn next_fixed<R>((mut reader, remaining): (R, u64)) -> io::Result<Option<(Bytes, (R, u64))>>
where
    R: AsyncRead + Unpin,
{
    if remaining == 0 {
        return Ok(None);
    }
    let piece = read_piece(&mut reader, remaining).await?;
    let remaining = remaining - piece.len() as u64;
    Ok(Some((piece, (reader, remaining))))
}

enum Chunked<R> {
    /// Next item starts with a chunk-size line.
    Size(R),
    /// Inside a chunk with this many bytes left.
    Data(R, u64),
}

/// Decodes a `Transfer-Encoding: chunked` body, yielding the payload bytes.
pub fn chunked<R>(reader: R) -> impl Stream<Item = io::Result<Bytes>> + Send
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::try_unfold(Chunked::Size(BufReader::new(reader)), next_chunk)
}

async fn next_chunk<R>(state: Chunked<R>) -> io::Result<Option<(Bytes, Chunked<R>)>>
where
    R: AsyncBufRead + Unpin,
{
    let (mut reader, remaining) = match state {
        Chunked::Size(mut reader) => {
            let size = read_chunk_size(&mut reader).await?;
            if size == 0 {
                skip_trailers(&mut reader).await?;
                return Ok(None);
            }
            (reader, size)
        }
        Chunked::Data(reader, remaining) => (reader, remaining),
    };

    let piece = read_piece(&mut reader, remaining).await?;
    let remaining = remaining - piece.len() as u64;
    let next = if remaining == 0 {
        if !read_line(&mut reader).await?.is_empty() {
            return Err(invalid("missing CRLF after chunk data"));
        }
        Chunked::Size(reader)
    } else {
        Chunked::Data(reader, remaining)
    };
    Ok(Some((piece, next)))
}

async fn read_piece<R: AsyncRead + Unpin>(reader: &mut R, remaining: u64) -> io::Result<Bytes> {
    let want = remaining.min(PIECE_LEN);
    let mut buf = BytesMut::with_capacity(want as usize);
    let n = reader.take(want).read_buf(&mut buf).await?;
    if n == 0 {
        return Err(io::ErrorKind::UnexpectedEof.into());
    }
    Ok(buf.freeze())
}

async fn read_chunk_size<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<u64> {
    let line = read_line(reader).await?;
    let size = line.split(';').next().unwrap_or_default().trim();
    u64::from_str_radix(size, 16).map_err(|_| invalid("invalid chunk size"))
}

async fn skip_trailers<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<()> {
    while !read_line(reader).await?.is_empty() {}
    Ok(())
}

/// Reads one CRLF-terminated line and returns it without the terminator.
async fn read_line<R: AsyncBufRead + Unpin>(reader: &mut R) -> io::Result<String> {
    let mut line = Vec::new();
    reader.take(MAX_LINE_LEN).read_until(b'\n', &mut line).await?;
    if line.last() != Some(&b'\n') {
        return Err(if line.len() as u64 == MAX_LINE_LEN {
            invalid("line too long")
        } else {
            io::ErrorKind::UnexpectedEof.into()
        });
    }
    line.pop();
    if line.last() == Some(&b'\r') {
        line.pop();
    }
    String::from_utf8(line).map_err(|_| invalid("non-UTF-8 line"))
}

fn invalid(msg: &'static str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}
