//! Frame header definitions for both framing dialects.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// Legacy frame header size in bytes (3-byte length + 1-byte sequence).
pub const LEGACY_HEADER_SIZE: usize = 4;

/// Largest payload a single legacy frame can carry (2^24 - 1).
pub const MAX_LEGACY_PAYLOAD: usize = 0x00FF_FFFF;

/// Tagged frame length prefix size in bytes.
pub const TAGGED_PREFIX_SIZE: usize = 4;

/// Default ceiling for a reassembled message (the server's default
/// `max_allowed_packet`).
pub const DEFAULT_MAX_MESSAGE_SIZE: usize = 16 * 1024 * 1024;

/// Legacy frame header.
///
/// ```text
/// [length: u24 LE][sequence: u8]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LegacyHeader {
    /// Payload length in bytes (excluding header).
    pub payload_length: u32,
    /// Sequence number (wraps at 255).
    pub sequence: u8,
}

impl LegacyHeader {
    /// Create a new header.
    #[must_use]
    pub const fn new(payload_length: u32, sequence: u8) -> Self {
        Self {
            payload_length,
            sequence,
        }
    }

    /// Parse a header from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < LEGACY_HEADER_SIZE {
            return Err(ProtocolError::incomplete(
                LEGACY_HEADER_SIZE,
                src.remaining(),
            ));
        }
        let payload_length = src.get_uint_le(3) as u32;
        let sequence = src.get_u8();
        Ok(Self {
            payload_length,
            sequence,
        })
    }

    /// Peek the header fields without consuming anything.
    ///
    /// Returns `None` if fewer than [`LEGACY_HEADER_SIZE`] bytes are present.
    #[must_use]
    pub fn peek(src: &[u8]) -> Option<Self> {
        if src.len() < LEGACY_HEADER_SIZE {
            return None;
        }
        Some(Self {
            payload_length: u32::from_le_bytes([src[0], src[1], src[2], 0]),
            sequence: src[3],
        })
    }

    /// Encode the header.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_uint_le(u64::from(self.payload_length), 3);
        dst.put_u8(self.sequence);
    }

    /// Encode the header to a new `Bytes` buffer.
    #[must_use]
    pub fn encode_to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(LEGACY_HEADER_SIZE);
        self.encode(&mut buf);
        buf.freeze()
    }

    /// Whether this frame is followed by a continuation fragment.
    #[must_use]
    pub const fn has_continuation(&self) -> bool {
        self.payload_length as usize == MAX_LEGACY_PAYLOAD
    }
}

/// Tagged frame header.
///
/// ```text
/// [length: u32 LE, covers tag + body][tag: u8]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggedHeader {
    /// Declared length (tag byte plus body).
    pub length: u32,
    /// Message type tag.
    pub tag: u8,
}

impl TaggedHeader {
    /// Size of the length prefix plus the tag byte.
    pub const SIZE: usize = TAGGED_PREFIX_SIZE + 1;

    /// Create a header for a body of `body_len` bytes.
    #[must_use]
    pub const fn for_body(tag: u8, body_len: u32) -> Self {
        Self {
            length: body_len + 1,
            tag,
        }
    }

    /// Parse a header from bytes.
    pub fn decode(src: &mut impl Buf) -> Result<Self, ProtocolError> {
        if src.remaining() < Self::SIZE {
            return Err(ProtocolError::incomplete(Self::SIZE, src.remaining()));
        }
        let length = src.get_u32_le();
        if length == 0 {
            return Err(ProtocolError::malformed(
                "tagged header",
                "declared length 0 leaves no room for the type tag",
            ));
        }
        let tag = src.get_u8();
        Ok(Self { length, tag })
    }

    /// Encode the header.
    pub fn encode(&self, dst: &mut impl BufMut) {
        dst.put_u32_le(self.length);
        dst.put_u8(self.tag);
    }

    /// Length of the body that follows the tag.
    #[must_use]
    pub const fn body_length(&self) -> usize {
        self.length.saturating_sub(1) as usize
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_header_roundtrip() {
        let header = LegacyHeader::new(0x0102_03, 7);
        let bytes = header.encode_to_bytes();
        assert_eq!(&bytes[..], &[0x03, 0x02, 0x01, 0x07]);

        let mut cursor = bytes.as_ref();
        assert_eq!(LegacyHeader::decode(&mut cursor).unwrap(), header);
    }

    #[test]
    fn test_legacy_header_peek() {
        assert_eq!(LegacyHeader::peek(&[1, 0]), None);
        let header = LegacyHeader::peek(&[0xFF, 0xFF, 0xFF, 3, 9]).unwrap();
        assert!(header.has_continuation());
        assert_eq!(header.sequence, 3);
    }

    #[test]
    fn test_tagged_header() {
        let header = TaggedHeader::for_body(11, 4);
        let mut buf = BytesMut::new();
        header.encode(&mut buf);
        assert_eq!(&buf[..], &[5, 0, 0, 0, 11]);

        let decoded = TaggedHeader::decode(&mut buf.freeze()).unwrap();
        assert_eq!(decoded.body_length(), 4);
        assert_eq!(decoded.tag, 11);
    }

    #[test]
    fn test_tagged_header_zero_length() {
        let mut src: &[u8] = &[0, 0, 0, 0, 1];
        assert!(matches!(
            TaggedHeader::decode(&mut src),
            Err(ProtocolError::Malformed { .. })
        ));
    }
}
