//! Length-prefixed frame I/O :
//! ```text
//! +--------+-------- ... --------+
//! | u32 LE |  up to 4 MiB body   |
//! +--------+-------- ... --------+
//! ```
//! Mirrors `original_source/worker/src/Channel/ChannelSocket.cpp`'s framing
//! loop, adapted to `tokio::io::{AsyncRead, AsyncWrite}` the way the
//! teacher drives its own sockets off async readers/writers.
//!
//! The body itself is `serde_json`, not a schema-driven binary format:
//! a `Frame`'s payload is a `serde_json::Value` whose shape isn't known
//! ahead of time (`target`/`method` pick the handler at runtime), and a
//! format like bincode can't deserialize into an untyped destination.
//! JSON-over-a-binary length prefix keeps the cheap framing while staying
//! decodable without a concrete type on the read side.

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::control::protocol::Frame;
use crate::error::FatalError;

/// Bodies larger than this are rejected before the decoder ever sees them.
const MAX_BODY_LEN: u32 = 4 * 1024 * 1024;

pub struct ChannelReader<R> {
    inner: R,
}

impl<R: AsyncRead + Unpin> ChannelReader<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Reads one frame. `Ok(None)` means the peer closed the channel
    /// cleanly; it's up to the caller to act on that, not for this reader
    /// to decide.
    pub async fn read_frame(&mut self) -> Result<Option<Frame>, FatalError> {
        let mut len_buf = [0u8; 4];
        match self.inner.read_exact(&mut len_buf).await {
            Ok(_) => {}
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => return Ok(None),
            Err(e) => return Err(FatalError::ChannelClosed(e.to_string())),
        }
        let len = u32::from_le_bytes(len_buf);
        if len > MAX_BODY_LEN {
            return Err(FatalError::ChannelClosed(format!("frame of {len} bytes exceeds 4 MiB limit")));
        }
        let mut body = vec![0u8; len as usize];
        self.inner.read_exact(&mut body).await.map_err(|e| FatalError::ChannelClosed(e.to_string()))?;
        let frame: Frame = serde_json::from_slice(&body).map_err(|e| FatalError::ChannelClosed(e.to_string()))?;
        Ok(Some(frame))
    }
}

pub struct ChannelWriter<W> {
    inner: W,
}

impl<W: AsyncWrite + Unpin> ChannelWriter<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    pub async fn write_frame(&mut self, frame: &Frame) -> Result<(), FatalError> {
        let body = serde_json::to_vec(frame).map_err(|e| FatalError::ChannelClosed(e.to_string()))?;
        if body.len() as u64 > MAX_BODY_LEN as u64 {
            return Err(FatalError::ChannelClosed(format!("frame of {} bytes exceeds 4 MiB limit", body.len())));
        }
        self.inner
            .write_all(&(body.len() as u32).to_le_bytes())
            .await
            .map_err(|e| FatalError::ChannelClosed(e.to_string()))?;
        self.inner.write_all(&body).await.map_err(|e| FatalError::ChannelClosed(e.to_string()))?;
        self.inner.flush().await.map_err(|e| FatalError::ChannelClosed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::control::protocol::{Notification, Request};

    #[tokio::test]
    async fn a_request_frame_round_trips_through_the_pipe() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = ChannelWriter::new(client);
        let mut reader = ChannelReader::new(server);

        let request = Frame::Request(Request {
            id: 7,
            method: "router.createWebRtcTransport".to_string(),
            target: "router1".to_string(),
            data: serde_json::json!({ "foo": "bar" }),
        });
        writer.write_frame(&request).await.unwrap();
        drop(writer);

        let received = reader.read_frame().await.unwrap().unwrap();
        match received {
            Frame::Request(r) => {
                assert_eq!(r.id, 7);
                assert_eq!(r.method, "router.createWebRtcTransport");
            }
            _ => panic!("expected a request frame"),
        }
    }

    #[tokio::test]
    async fn closed_pipe_yields_none_instead_of_an_error() {
        let (client, server) = tokio::io::duplex(1024);
        drop(client);
        let mut reader = ChannelReader::new(server);
        assert!(reader.read_frame().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected() {
        let (mut client, server) = tokio::io::duplex(16);
        let mut reader = ChannelReader::new(server);
        client.write_all(&(MAX_BODY_LEN + 1).to_le_bytes()).await.unwrap();
        drop(client);
        assert!(reader.read_frame().await.is_err());
    }

    #[tokio::test]
    async fn notification_frame_round_trips() {
        let (client, server) = tokio::io::duplex(1024);
        let mut writer = ChannelWriter::new(client);
        let mut reader = ChannelReader::new(server);

        let note = Frame::Notification(Notification {
            target: "producer1".to_string(),
            event: "score".to_string(),
            data: serde_json::json!({ "score": 9 }),
        });
        writer.write_frame(&note).await.unwrap();
        drop(writer);
        match reader.read_frame().await.unwrap().unwrap() {
            Frame::Notification(n) => assert_eq!(n.event, "score"),
            _ => panic!("expected a notification frame"),
        }
    }
}
