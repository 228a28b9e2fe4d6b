//! Bidirectional byte pump.
//!
//! Each direction is copied by its own task. The first direction to finish,
//! cleanly or not, decides the session; the other task is aborted and both
//! streams are dropped with it.

use std::fmt;
use std::io;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::task::JoinSet;

/// One copy direction of an opaque session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToUpstream,
    UpstreamToClient,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::ClientToUpstream => f.write_str("client->upstream"),
            Direction::UpstreamToClient => f.write_str("upstream->client"),
        }
    }
}

/// The direction that ended a session and what its copy returned.
#[derive(Debug)]
pub struct Finished {
    pub direction: Direction,
    pub result: io::Result<u64>,
}

/// Copy in both directions until either one finishes.
pub async fn pump<CR, CW, UR, UW>(
    (mut client_rd, mut client_wr): (CR, CW),
    (mut upstream_rd, mut upstream_wr): (UR, UW),
) -> Finished
where
    CR: AsyncRead + Unpin + Send + 'static,
    CW: AsyncWrite + Unpin + Send + 'static,
    UR: AsyncRead + Unpin + Send + 'static,
    UW: AsyncWrite + Unpin + Send + 'static,
{
    let mut set = JoinSet::new();
    set.spawn(async move {
        let result = tokio::io::copy(&mut client_rd, &mut upstream_wr).await;
        (Direction::ClientToUpstream, result)
    });
    set.spawn(async move {
        let result = tokio::io::copy(&mut upstream_rd, &mut client_wr).await;
        (Direction::UpstreamToClient, result)
    });

    match set.join_next().await {
        Some(Ok((direction, result))) => Finished { direction, result },
        // Copy tasks neither panic nor get aborted while the set is alive.
        Some(Err(e)) => Finished {
            direction: Direction::ClientToUpstream,
            result: Err(io::Error::other(e)),
        },
        None => Finished {
            direction: Direction::ClientToUpstream,
            result: Ok(0),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn bytes_flow_both_ways() {
        let (client, relay_client) = tokio::io::duplex(64);
        let (relay_upstream, upstream) = tokio::io::duplex(64);

        let pump = tokio::spawn(pump(
            tokio::io::split(relay_client),
            tokio::io::split(relay_upstream),
        ));

        let (mut client_rd, mut client_wr) = tokio::io::split(client);
        let (mut up_rd, mut up_wr) = tokio::io::split(upstream);

        client_wr.write_all(b"EHLO a\r\n").await.unwrap();
        let mut buf = [0u8; 8];
        up_rd.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"EHLO a\r\n");

        up_wr.write_all(b"250 ok\r\n").await.unwrap();
        client_rd.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"250 ok\r\n");

        drop(up_wr);
        drop(up_rd);
        let finished = pump.await.unwrap();
        assert_eq!(finished.direction, Direction::UpstreamToClient);
        assert_eq!(finished.result.unwrap(), 8);
    }

    #[tokio::test]
    async fn client_close_ends_session() {
        let (client, relay_client) = tokio::io::duplex(64);
        let (relay_upstream, mut upstream) = tokio::io::duplex(64);

        let pump = tokio::spawn(pump(
            tokio::io::split(relay_client),
            tokio::io::split(relay_upstream),
        ));
        drop(client);

        let finished = pump.await.unwrap();
        assert_eq!(finished.direction, Direction::ClientToUpstream);

        // The aborted task dropped its half, so upstream now sees EOF.
        let mut rest = Vec::new();
        upstream.read_to_end(&mut rest).await.unwrap();
        assert!(rest.is_empty());
    }
}
