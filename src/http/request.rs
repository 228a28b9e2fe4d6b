//! Request head parsing.
//!
//! # Responsibilities
//! - Read exactly one request head from the client's buffered stream
//! - Extract routing-relevant information (host, path)
//! - Decide how the request body is framed
//!
//! # Design Decisions
//! - Head bytes are parsed in place and discarded only on success; the body
//!   stays in the stream for forwarding
//! - Header size limits enforced before any body byte is touched
//! - Parse failures are reported, never answered: the caller closes

use std::io;

use http::header::{CONTENT_LENGTH, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderName, HeaderValue, Method, Uri, Version};
use thiserror::Error;
use tokio::io::AsyncRead;

use crate::net::prebuffered::Prebuffered;
use crate::routing::route_key;

/// Upper bound for the request line plus header section.
pub const MAX_HEAD_LEN: usize = 64 * 1024;

const MAX_HEADERS: usize = 100;

/// Why a request could not be read.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("invalid HTTP request: {0}")]
    Syntax(#[from] httparse::Error),

    #[error("invalid method: {0}")]
    Method(#[from] http::method::InvalidMethod),

    #[error("invalid request target: {0}")]
    Target(#[from] http::uri::InvalidUri),

    #[error("invalid header: {0}")]
    Header(String),

    #[error("invalid message framing: {0}")]
    Framing(&'static str),

    #[error("request head exceeds {MAX_HEAD_LEN} bytes")]
    TooLarge,

    #[error("connection closed before end of request head")]
    Incomplete,

    #[error("read error: {0}")]
    Io(#[from] io::Error),
}

/// How the request body is delimited on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Empty,
    Length(u64),
    Chunked,
}

/// A parsed request line and header section.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub target: Uri,
    pub version: Version,
    pub headers: HeaderMap,
}

impl RequestHead {
    /// Reads a request head and removes it from `reader`.
    ///
    /// Whatever follows the head (the body) stays buffered in `reader`.
    pub async fn read<R>(reader: &mut Prebuffered<R>) -> Result<Self, ParseError>
    where
        R: AsyncRead + Unpin,
    {
        loop {
            if let Some((len, head)) = Self::parse(reader.buffer())? {
                reader.discard(len);
                return Ok(head);
            }
            if reader.is_full() {
                return Err(ParseError::TooLarge);
            }
            if reader.buffer_more().await? == 0 {
                return Err(ParseError::Incomplete);
            }
        }
    }

    /// Parses a head from `buf`, returning `None` while it is incomplete.
    ///
    /// On success also returns the length of the head in bytes.
    pub fn parse(buf: &[u8]) -> Result<Option<(usize, Self)>, ParseError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);
        let len = match req.parse(buf)? {
            httparse::Status::Partial => return Ok(None),
            httparse::Status::Complete(len) => len,
        };

        // A complete parse always carries method, path and version.
        let method = Method::from_bytes(req.method.unwrap_or_default().as_bytes())?;
        let target: Uri = req.path.unwrap_or_default().parse()?;
        let version = match req.version {
            Some(0) => Version::HTTP_10,
            _ => Version::HTTP_11,
        };

        let mut map = HeaderMap::with_capacity(req.headers.len());
        for header in req.headers.iter() {
            let name = HeaderName::from_bytes(header.name.as_bytes())
                .map_err(|e| ParseError::Header(e.to_string()))?;
            let value = HeaderValue::from_bytes(header.value)
                .map_err(|e| ParseError::Header(e.to_string()))?;
            map.append(name, value);
        }

        Ok(Some((
            len,
            Self {
                method,
                target,
                version,
                headers: map,
            },
        )))
    }

    /// Host the client addressed: the target's authority when the request
    /// line carries one, otherwise the `Host` header.
    pub fn host(&self) -> &str {
        if let Some(authority) = self.target.authority() {
            // Drop any userinfo, keep an explicit port.
            return authority.as_str().rsplit('@').next().unwrap_or_default();
        }
        self.headers
            .get(HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or_default()
    }

    /// Request path without the query string.
    pub fn path(&self) -> &str {
        self.target.path()
    }

    /// Key for the route table.
    pub fn route_key(&self) -> String {
        route_key(self.host(), self.path())
    }

    /// Determines body framing from `Transfer-Encoding` and `Content-Length`.
    pub fn body_kind(&self) -> Result<BodyKind, ParseError> {
        if let Some(te) = self.headers.get_all(TRANSFER_ENCODING).iter().last() {
            let te = te
                .to_str()
                .map_err(|_| ParseError::Framing("non-ASCII Transfer-Encoding"))?;
            let last = te.rsplit(',').next().unwrap_or_default().trim();
            return if last.eq_ignore_ascii_case("chunked") {
                Ok(BodyKind::Chunked)
            } else {
                Err(ParseError::Framing("request body not chunked"))
            };
        }

        let mut length = None;
        for value in self.headers.get_all(CONTENT_LENGTH) {
            let parsed = value
                .to_str()
                .ok()
                .and_then(|v| v.trim().parse::<u64>().ok())
                .ok_or(ParseError::Framing("invalid Content-Length"))?;
            if length.is_some_and(|l| l != parsed) {
                return Err(ParseError::Framing("conflicting Content-Length"));
            }
            length = Some(parsed);
        }

        Ok(match length {
            None | Some(0) => BodyKind::Empty,
            Some(n) => BodyKind::Length(n),
        })
    }
}
