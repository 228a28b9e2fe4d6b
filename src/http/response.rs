//! Writing the upstream response back to the client.
//!
//! # Responsibilities
//! - Serialize status line and headers as received from upstream
//! - Stream the body without buffering it whole
//! - Re-frame the body to match the response's own headers
//!
//! # Design Decisions
//! - The transport hands us a decoded body, so a chunked response is
//!   re-chunked on the way out; everything else is copied raw
//! - The client connection closes after the response, which delimits
//!   bodies that carry neither a length nor chunking

use http::header::TRANSFER_ENCODING;
use http::{Extensions, HeaderMap, Method, StatusCode, Version};
use hyper::ext::ReasonPhrase;
use tokio::io::{self, AsyncWrite, AsyncWriteExt};

/// Reason phrase as upstream sent it. The transport only keeps phrases that
/// differ from the canonical one, so the canonical phrase fills the gap.
pub fn reason_phrase(status: StatusCode, extensions: &Extensions) -> &[u8] {
    match extensions.get::<ReasonPhrase>() {
        Some(reason) => reason.as_bytes(),
        None => status.canonical_reason().unwrap_or_default().as_bytes(),
    }
}

/// Status line and header section in wire form.
pub fn encode_head(
    version: Version,
    status: StatusCode,
    reason: &[u8],
    headers: &HeaderMap,
) -> Vec<u8> {
    let mut head = Vec::with_capacity(256);
    head.extend_from_slice(format!("{version:?} ").as_bytes());
    head.extend_from_slice(status.as_str().as_bytes());
    head.push(b' ');
    head.extend_from_slice(reason);
    head.extend_from_slice(b"\r\n");
    for (name, value) in headers {
        head.extend_from_slice(name.as_str().as_bytes());
        head.extend_from_slice(b": ");
        head.extend_from_slice(value.as_bytes());
        head.extend_from_slice(b"\r\n");
    }
    head.extend_from_slice(b"\r\n");
    head
}

/// Whether a response to `method` with `status` carries no body.
pub fn is_bodyless(method: &Method, status: StatusCode) -> bool {
    *method == Method::HEAD
        || status.is_informational()
        || status == StatusCode::NO_CONTENT
        || status == StatusCode::NOT_MODIFIED
}

fn is_chunked(headers: &HeaderMap) -> bool {
    headers
        .get_all(TRANSFER_ENCODING)
        .iter()
        .last()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.rsplit(',').next())
        .is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
}

/// Write `response` to `out`. Returns the number of body bytes relayed.
pub async fn write_response<W>(
    out: &mut W,
    mut response: reqwest::Response,
    method: &Method,
) -> io::Result<u64>
where
    W: AsyncWrite + Unpin,
{
    let status = response.status();
    let head = encode_head(
        response.version(),
        status,
        reason_phrase(status, response.extensions()),
        response.headers(),
    );
    out.write_all(&head).await?;

    let mut relayed = 0u64;
    if !is_bodyless(method, status) {
        let chunked = is_chunked(response.headers());
        while let Some(data) = response.chunk().await.map_err(io::Error::other)? {
            if data.is_empty() {
                continue;
            }
            if chunked {
                out.write_all(format!("{:x}\r\n", data.len()).as_bytes())
                    .await?;
                out.write_all(&data).await?;
                out.write_all(b"\r\n").await?;
            } else {
                out.write_all(&data).await?;
            }
            relayed += data.len() as u64;
        }
        if chunked {
            out.write_all(b"0\r\n\r\n").await?;
        }
    }

    out.flush().await?;
    Ok(relayed)
}
