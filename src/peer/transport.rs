use super::error::PeerError;
use super::extension::{ExtensionHandshake, EXTENSION_HANDSHAKE_ID};
use super::message::{Handshake, Message, HANDSHAKE_LEN};
use bytes::{Buf, BytesMut};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Default frame bound: large enough for a full 512 KiB metadata piece
/// message with headroom.
pub const DEFAULT_MAX_FRAME: usize = 512 * 1024;

const READ_TIMEOUT: Duration = Duration::from_secs(120);
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Buffered peer wire framing over a TCP stream.
///
/// Offers handshake exchange and length-prefixed message send/receive. A
/// frame bound is fixed at construction; inbound frames declaring a larger
/// length are rejected after consuming only the 4-byte header.
pub struct PeerTransport {
    stream: TcpStream,
    read_buf: BytesMut,
    max_frame: usize,
}

impl PeerTransport {
    /// Wraps a stream with the default frame bound.
    pub fn new(stream: TcpStream) -> Self {
        Self::with_max_frame(stream, DEFAULT_MAX_FRAME)
    }

    /// Wraps a stream with an explicit frame bound.
    ///
    /// # Panics
    ///
    /// Panics if `max_frame` is smaller than the 4-byte length prefix.
    pub fn with_max_frame(stream: TcpStream, max_frame: usize) -> Self {
        assert!(max_frame >= 4, "frame bound must cover the length prefix");
        Self {
            stream,
            read_buf: BytesMut::with_capacity(32 * 1024),
            max_frame,
        }
    }

    /// Sends the 68-byte handshake.
    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        let data = handshake.encode();
        timeout(WRITE_TIMEOUT, self.stream.write_all(&data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    /// Receives and validates the peer's handshake.
    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        self.fill_buf(HANDSHAKE_LEN).await?;
        let data = self.read_buf.split_to(HANDSHAKE_LEN);
        Handshake::decode(&data)
    }

    /// Sends one length-prefixed message.
    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        let data = message.encode();
        timeout(WRITE_TIMEOUT, self.stream.write_all(&data))
            .await
            .map_err(|_| PeerError::Timeout)??;
        Ok(())
    }

    /// Receives one length-prefixed message.
    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        self.fill_buf(4).await?;

        let length = u32::from_be_bytes([
            self.read_buf[0],
            self.read_buf[1],
            self.read_buf[2],
            self.read_buf[3],
        ]) as usize;

        if length > self.max_frame {
            self.read_buf.advance(4);
            return Err(PeerError::FrameTooLarge(length));
        }

        self.fill_buf(4 + length).await?;
        let data = self.read_buf.split_to(4 + length);
        Message::decode(data.freeze())
    }

    /// Receives the extension handshake that follows the base handshake.
    ///
    /// The next frame must be an extended message with sub-id 0 carrying a
    /// bencoded dictionary.
    pub async fn receive_extended_handshake(&mut self) -> Result<ExtensionHandshake, PeerError> {
        match self.receive_message().await? {
            Message::Extended { id, payload } if id == EXTENSION_HANDSHAKE_ID => {
                ExtensionHandshake::decode(&payload)
            }
            Message::Extended { id, .. } => Err(PeerError::Extension(format!(
                "expected handshake sub-id 0, got {}",
                id
            ))),
            _ => Err(PeerError::Extension(
                "peer did not respond with an extended handshake".into(),
            )),
        }
    }

    /// Returns the remote address.
    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }

    /// Unwraps the transport, returning the underlying stream.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }

    async fn fill_buf(&mut self, len: usize) -> Result<(), PeerError> {
        while self.read_buf.len() < len {
            let n = timeout(READ_TIMEOUT, self.stream.read_buf(&mut self.read_buf))
                .await
                .map_err(|_| PeerError::Timeout)??;

            if n == 0 {
                return Err(PeerError::ConnectionClosed);
            }
        }
        Ok(())
    }
}
