//! Legacy-dialect frame codec.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use mysql_protocol::packet::{
    DEFAULT_MAX_MESSAGE_SIZE, LEGACY_HEADER_SIZE, LegacyHeader, MAX_LEGACY_PAYLOAD,
};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::CodecError;

/// A single legacy frame as it appeared on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyFrame {
    /// Sequence number of the frame.
    pub sequence: u8,
    /// Frame payload (excluding header).
    pub payload: Bytes,
}

impl LegacyFrame {
    /// Whether a continuation fragment follows this frame.
    #[must_use]
    pub fn has_continuation(&self) -> bool {
        self.payload.len() == MAX_LEGACY_PAYLOAD
    }
}

/// Legacy frame codec for tokio-util framing.
///
/// One sequence counter is shared by the encoder and decoder: every frame
/// written or read advances it, and every frame read must carry the value
/// the counter predicts. Callers reset it at the start of each command.
///
/// Encoding takes a whole message and splits it into maximum-size
/// fragments; decoding yields individual frames for the
/// [`MessageAssembler`](crate::MessageAssembler).
#[derive(Debug)]
pub struct LegacyCodec {
    /// Largest frame payload accepted from the peer.
    max_frame_size: usize,
    /// Largest message accepted for encoding.
    max_message_size: usize,
    /// Next expected/assigned sequence number.
    sequence: u8,
}

impl LegacyCodec {
    /// Create a codec with default ceilings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_frame_size: MAX_LEGACY_PAYLOAD,
            max_message_size: DEFAULT_MAX_MESSAGE_SIZE,
            sequence: 0,
        }
    }

    /// Lower the ceiling on incoming frame payloads.
    #[must_use]
    pub fn with_max_frame_size(mut self, size: usize) -> Self {
        self.max_frame_size = size.min(MAX_LEGACY_PAYLOAD);
        self
    }

    /// Set the ceiling on outgoing messages.
    #[must_use]
    pub fn with_max_message_size(mut self, size: usize) -> Self {
        self.max_message_size = size;
        self
    }

    /// The sequence number the next frame will carry.
    #[must_use]
    pub fn sequence(&self) -> u8 {
        self.sequence
    }

    /// Reset the sequence counter for a new command.
    pub fn reset_sequence(&mut self) {
        self.sequence = 0;
    }

    fn advance_sequence(&mut self) -> u8 {
        let sequence = self.sequence;
        self.sequence = self.sequence.wrapping_add(1);
        sequence
    }
}

impl Default for LegacyCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for LegacyCodec {
    type Item = LegacyFrame;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let Some(header) = LegacyHeader::peek(src) else {
            return Ok(None);
        };

        let length = header.payload_length as usize;
        if length > self.max_frame_size {
            return Err(CodecError::FrameTooLarge {
                size: length,
                max: self.max_frame_size,
            });
        }

        let total = LEGACY_HEADER_SIZE + length;
        if src.len() < total {
            src.reserve(total - src.len());
            return Ok(None);
        }

        if header.sequence != self.sequence {
            return Err(CodecError::SequenceMismatch {
                expected: self.sequence,
                actual: header.sequence,
            });
        }
        self.advance_sequence();

        let mut frame = src.split_to(total);
        frame.advance(LEGACY_HEADER_SIZE);

        tracing::trace!(
            length = length,
            sequence = header.sequence,
            continuation = header.has_continuation(),
            "decoded legacy frame"
        );

        Ok(Some(LegacyFrame {
            sequence: header.sequence,
            payload: frame.freeze(),
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(frame) = self.decode(src)? {
            return Ok(Some(frame));
        }
        if src.is_empty() {
            return Ok(None);
        }
        let expected = LegacyHeader::peek(src).map_or(LEGACY_HEADER_SIZE, |header| {
            LEGACY_HEADER_SIZE + header.payload_length as usize
        });
        Err(CodecError::Truncated {
            expected,
            actual: src.len(),
        })
    }
}

impl Encoder<Bytes> for LegacyCodec {
    type Error = CodecError;

    fn encode(&mut self, item: Bytes, dst: &mut BytesMut) -> Result<(), Self::Error> {
        if item.len() > self.max_message_size {
            return Err(CodecError::MessageTooLarge {
                size: item.len(),
                max: self.max_message_size,
            });
        }

        let fragments = item.len() / MAX_LEGACY_PAYLOAD + 1;
        dst.reserve(item.len() + fragments * LEGACY_HEADER_SIZE);

        // A full-size fragment always announces a continuation, so content
        // that is an exact multiple ends with an empty frame.
        let mut rest = item;
        loop {
            let chunk = rest.split_to(rest.len().min(MAX_LEGACY_PAYLOAD));
            let sequence = self.advance_sequence();
            LegacyHeader::new(chunk.len() as u32, sequence).encode(dst);
            dst.put_slice(&chunk);

            tracing::trace!(
                length = chunk.len(),
                sequence = sequence,
                "encoded legacy frame"
            );

            if chunk.len() < MAX_LEGACY_PAYLOAD {
                break;
            }
        }

        Ok(())
    }
}
