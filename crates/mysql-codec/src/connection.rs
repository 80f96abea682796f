//! Framed connections for both dialects.
//!
//! The legacy dialect needs one sequence counter for both directions, so
//! unlike a split reader/writer pair the connection keeps a single
//! [`Framed`] whose codec owns the counter.

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::{SinkExt, StreamExt};
use mysql_protocol::XMessage;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio_util::codec::Framed;

use crate::error::CodecError;
use crate::legacy_codec::LegacyCodec;
use crate::message::{Message, MessageAssembler};
use crate::tagged_codec::{TaggedCodec, TaggedFrame};
use crate::transport::{Dialect, Direction, Frame, FrameActivity, FrameTransport};

/// A legacy-dialect connection.
///
/// # Example
///
/// ```rust,ignore
/// use mysql_codec::LegacyConnection;
/// use tokio::net::TcpStream;
///
/// let stream = TcpStream::connect("localhost:3306").await?;
/// let mut conn = LegacyConnection::new(stream);
/// let handshake = conn.read_message().await?;
/// ```
pub struct LegacyConnection<T> {
    framed: Framed<T, LegacyCodec>,
    assembler: MessageAssembler,
    activity: FrameActivity,
}

impl<T> LegacyConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a connection with default ceilings.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, LegacyCodec::new(), MessageAssembler::new())
    }

    /// Create a connection with a custom codec and assembler.
    pub fn with_codec(transport: T, codec: LegacyCodec, assembler: MessageAssembler) -> Self {
        Self {
            framed: Framed::new(transport, codec),
            assembler,
            activity: FrameActivity::default(),
        }
    }

    /// The sequence number the next frame will carry.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.framed.codec().sequence()
    }

    /// Reset the sequence counter for a new command.
    pub fn reset_sequence(&mut self) {
        self.framed.codec_mut().reset_sequence();
    }

    /// Read the next complete message, reassembling fragments.
    pub async fn read_message(&mut self) -> Result<Message, CodecError> {
        loop {
            match self.framed.next().await {
                Some(Ok(frame)) => {
                    if let Some(message) = self.assembler.push(frame)? {
                        self.activity
                            .record(Direction::Received, message.sequence, message.len());
                        return Ok(message);
                    }
                }
                Some(Err(e)) => return Err(e),
                None => {
                    if self.assembler.has_partial() {
                        return Err(CodecError::Truncated {
                            expected: self.assembler.buffer_len() + 1,
                            actual: self.assembler.buffer_len(),
                        });
                    }
                    return Err(CodecError::ConnectionClosed);
                }
            }
        }
    }

    /// Send a message with the current sequence number and flush it.
    pub async fn send_message(&mut self, payload: Bytes) -> Result<(), CodecError> {
        let sequence = self.sequence();
        let length = payload.len();
        self.framed.send(payload).await?;
        self.activity.record(Direction::Sent, sequence, length);
        Ok(())
    }

    /// Consume the connection and return the transport.
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }
}

#[async_trait]
impl<T> FrameTransport for LegacyConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn dialect(&self) -> Dialect {
        Dialect::Legacy
    }

    fn next_discriminant(&self) -> u8 {
        self.sequence()
    }

    fn reset_sequence(&mut self) {
        LegacyConnection::reset_sequence(self);
    }

    async fn write_frame(&mut self, discriminant: u8, payload: Bytes) -> Result<(), CodecError> {
        let expected = self.sequence();
        if discriminant != expected {
            return Err(CodecError::SequenceMismatch {
                expected,
                actual: discriminant,
            });
        }
        self.send_message(payload).await
    }

    async fn read_frame(&mut self) -> Result<Frame, CodecError> {
        let message = self.read_message().await?;
        Ok(Frame {
            discriminant: message.sequence,
            payload: message.payload,
        })
    }

    fn activity(&self) -> &FrameActivity {
        &self.activity
    }
}

impl<T> std::fmt::Debug for LegacyConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LegacyConnection")
            .field("sequence", &self.framed.codec().sequence())
            .field("has_partial_message", &self.assembler.has_partial())
            .finish_non_exhaustive()
    }
}

/// A tagged-dialect connection.
pub struct TaggedConnection<T> {
    framed: Framed<T, TaggedCodec>,
    activity: FrameActivity,
}

impl<T> TaggedConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Create a connection with the default ceiling.
    pub fn new(transport: T) -> Self {
        Self::with_codec(transport, TaggedCodec::new())
    }

    /// Create a connection with a custom codec.
    pub fn with_codec(transport: T, codec: TaggedCodec) -> Self {
        Self {
            framed: Framed::new(transport, codec),
            activity: FrameActivity::default(),
        }
    }

    /// Read the next raw frame.
    pub async fn read_tagged(&mut self) -> Result<TaggedFrame, CodecError> {
        match self.framed.next().await {
            Some(Ok(frame)) => {
                self.activity
                    .record(Direction::Received, frame.tag, frame.body.len());
                Ok(frame)
            }
            Some(Err(e)) => Err(e),
            None => Err(CodecError::ConnectionClosed),
        }
    }

    /// Write a raw frame and flush it.
    pub async fn write_tagged(&mut self, frame: TaggedFrame) -> Result<(), CodecError> {
        let (tag, length) = (frame.tag, frame.body.len());
        self.framed.send(frame).await?;
        self.activity.record(Direction::Sent, tag, length);
        Ok(())
    }

    /// Read the next frame as message type `M`.
    ///
    /// A frame carrying any other tag is reported as
    /// [`ProtocolError::UnexpectedMessage`](mysql_protocol::ProtocolError::UnexpectedMessage).
    pub async fn read_message<M: XMessage>(&mut self) -> Result<M, CodecError> {
        let frame = self.read_tagged().await?;
        Ok(M::decode_tagged(frame.tag, frame.body)?)
    }

    /// Write a typed message.
    pub async fn write_message<M: XMessage>(&mut self, message: &M) -> Result<(), CodecError> {
        self.write_tagged(TaggedFrame {
            tag: M::TAG.0,
            body: message.to_body(),
        })
        .await
    }

    /// Consume the connection and return the transport.
    pub fn into_inner(self) -> T {
        self.framed.into_inner()
    }
}

#[async_trait]
impl<T> FrameTransport for TaggedConnection<T>
where
    T: AsyncRead + AsyncWrite + Unpin + Send,
{
    fn dialect(&self) -> Dialect {
        Dialect::Tagged
    }

    fn next_discriminant(&self) -> u8 {
        0
    }

    fn reset_sequence(&mut self) {}

    async fn write_frame(&mut self, discriminant: u8, payload: Bytes) -> Result<(), CodecError> {
        self.write_tagged(TaggedFrame {
            tag: discriminant,
            body: payload,
        })
        .await
    }

    async fn read_frame(&mut self) -> Result<Frame, CodecError> {
        let frame = self.read_tagged().await?;
        Ok(Frame {
            discriminant: frame.tag,
            payload: frame.body,
        })
    }

    fn activity(&self) -> &FrameActivity {
        &self.activity
    }
}

impl<T> std::fmt::Debug for TaggedConnection<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaggedConnection").finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_protocol::{ErrorMessage, OkMessage, ProtocolError};
    use tokio::io::{AsyncReadExt, AsyncWriteExt, duplex};

    #[tokio::test]
    async fn test_legacy_sequence_advances_per_frame_pair() {
        let (client, mut server) = duplex(1024);
        let mut conn = LegacyConnection::new(client);

        conn.write_frame(0, Bytes::from_static(b"\x0e")).await.unwrap();
        let mut sent = [0u8; 5];
        server.read_exact(&mut sent).await.unwrap();
        assert_eq!(sent, [1, 0, 0, 0, 0x0e]);

        // server answers with sequence 1
        server.write_all(&[2, 0, 0, 1, 0x00, 0x00]).await.unwrap();
        let frame = conn.read_frame().await.unwrap();
        assert_eq!(frame.discriminant, 1);
        assert_eq!(&frame.payload[..], &[0, 0]);
        assert_eq!(conn.next_discriminant(), 2);

        let last = conn.activity().last_frame().unwrap();
        assert_eq!(last.direction, Direction::Received);
    }

    #[tokio::test]
    async fn test_legacy_write_with_wrong_sequence() {
        let (client, _server) = duplex(64);
        let mut conn = LegacyConnection::new(client);
        assert!(matches!(
            conn.write_frame(3, Bytes::from_static(b"x")).await,
            Err(CodecError::SequenceMismatch {
                expected: 0,
                actual: 3
            })
        ));
    }

    #[tokio::test]
    async fn test_legacy_eof_between_frames_is_closed() {
        let (client, server) = duplex(64);
        drop(server);
        let mut conn = LegacyConnection::new(client);
        assert!(matches!(
            conn.read_frame().await,
            Err(CodecError::ConnectionClosed)
        ));
    }

    #[tokio::test]
    async fn test_legacy_eof_mid_frame_is_truncated() {
        let (client, mut server) = duplex(64);
        server.write_all(&[10, 0, 0, 0, b'a', b'b']).await.unwrap();
        drop(server);
        let mut conn = LegacyConnection::new(client);
        assert!(matches!(
            conn.read_frame().await,
            Err(CodecError::Truncated { .. })
        ));
    }

    #[tokio::test]
    async fn test_tagged_ok_reads_back_and_mismatch_is_reported() {
        let (client, server) = duplex(1024);
        let mut writer = TaggedConnection::new(server);
        let mut reader = TaggedConnection::new(client);

        let ok = OkMessage {
            msg: Some("done".into()),
        };
        writer.write_message(&ok).await.unwrap();
        writer.write_message(&ok).await.unwrap();

        let read: OkMessage = reader.read_message().await.unwrap();
        assert_eq!(read, ok);

        let err = reader.read_message::<ErrorMessage>().await.unwrap_err();
        assert!(matches!(
            err,
            CodecError::Protocol(ProtocolError::UnexpectedMessage {
                expected: "Error",
                expected_tag: 1,
                actual_tag: 0
            })
        ));
    }
}
