//! Tagged-dialect frame codec.

use bytes::{Buf, Bytes, BytesMut};
use mysql_protocol::ProtocolError;
use mysql_protocol::packet::{DEFAULT_MAX_MESSAGE_SIZE, TAGGED_PREFIX_SIZE, TaggedHeader};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// A tagged frame: type tag plus structured body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedFrame {
    /// Message type tag.
    pub tag: u8,
    /// Encoded message body.
    pub body: Bytes,
}

/// Tagged frame codec for tokio-util framing.
#[derive(Debug)]
pub struct TaggedCodec {
    /// Largest declared length (tag + body) accepted.
    max_frame_size: usize,
}

impl TaggedCodec {
    /// Create a codec with the default ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_MESSAGE_SIZE,
        }
    }

    /// Set the ceiling on declared frame lengths.
    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size;
        self
    }
}

impl Default for TaggedCodec {
    fn default() -> Self {
        Self::new()
    }
}

fn peek_length(src: &[u8]) -> Option<usize> {
    let prefix: [u8; TAGGED_PREFIX_SIZE] = src.get(..TAGGED_PREFIX_SIZE)?.try_into().ok()?;
    Some(u32::from_le_bytes(prefix) as usize)
}

impl Decoder for TaggedCodec {
    type Item = TaggedFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(length) = peek_length(src) else {
            return Ok(None);
        };

        if length == 0 {
            return Err(ProtocolError::Malformed {
                what: "tagged frame",
                reason: "declared length 0 leaves no room for the type tag".into(),
            }
            .into());
        }
        if length > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        let total = TAGGED_PREFIX_SIZE + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        let mut frame = src.split_to(total);
        let header = TaggedHeader::decode(&mut frame)?;
        let body = frame.split_to(header.body_length()).freeze();
        debug_assert!(!frame.has_remaining());

        tracing::trace!(tag = header.tag, length = length, "decoded tagged frame");

        Ok(Some(TaggedFrame {
            tag: header.tag,
            body,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let expected = peek_length(src).map_or(TAGGED_PREFIX_SIZE, |len| TAGGED_PREFIX_SIZE + len);
        Err(CodecError::Truncated {
            expected,
            actual: src.len(),
        })
    }
}

impl Encoder<TaggedFrame> for TaggedCodec {
    type Error = CodecError;

    fn encode(&mut self, item: TaggedFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let length = item.body.len() + 1;
        if length > self.max_frame_size || length > u32::MAX as usize {
            return Err(CodecError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        dst.reserve(TAGGED_PREFIX_SIZE + length);
        TaggedHeader::for_body(item.tag, item.body.len() as u32).encode(dst);
        dst.extend_from_slice(&item.body);

        tracing::trace!(tag = item.tag, length = length, "encoded tagged frame");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_roundtrip() {
        let mut codec = TaggedCodec::new();
        let mut buf = BytesMut::new();
        let frame = TaggedFrame {
            tag: 11,
            body: Bytes::from_static(b"\x0a\x03abc"),
        };
        codec.encode(frame.clone(), &mut buf).unwrap();
        assert_eq!(&buf[..5], &[6, 0, 0, 0, 11]);
        assert_eq!(codec.decode(&mut buf).unwrap().unwrap(), frame);
    }

    #[test]
    fn test_empty_body() {
        let mut codec = TaggedCodec::new();
        let mut buf = BytesMut::from(&[1u8, 0, 0, 0, 0][..]);
        let frame = codec.decode(&mut buf).unwrap().unwrap();
        assert_eq!(frame.tag, 0);
        assert!(frame.body.is_empty());
    }

    #[test]
    fn test_zero_length_is_protocol_error() {
        let mut codec = TaggedCodec::new();
        let mut buf = BytesMut::from(&[0u8, 0, 0, 0, 7][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::Protocol(ProtocolError::Malformed { .. }))
        ));
    }

    #[test]
    fn test_length_above_ceiling_rejected_before_body() {
        let mut codec = TaggedCodec::new().with_max_frame_size(64);
        let mut buf = BytesMut::from(&[0x00u8, 0x10, 0, 0, 1, 2, 3][..]);
        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::FrameTooLarge { size: 4096, max: 64 })
        ));
        assert_eq!(buf.len(), 7);
    }

    #[test]
    fn test_eof_mid_frame_is_error() {
        let mut codec = TaggedCodec::new();
        let mut buf = BytesMut::from(&[10u8, 0, 0, 0, 1, 2][..]);
        assert!(codec.decode(&mut buf).unwrap().is_none());
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(CodecError::Truncated {
                expected: 14,
                actual: 6
            })
        ));
    }
}
