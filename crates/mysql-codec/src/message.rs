//! Legacy message reassembly.
//!
//! A legacy message longer than the maximum frame payload travels as a run
//! of full-size fragments followed by one shorter (possibly empty) frame.

use bytes::{Bytes, BytesMut};
use mysql_protocol::packet::DEFAULT_MAX_MESSAGE_SIZE;

use crate::error::CodecError;
use crate::legacy_codec::LegacyFrame;

/// A complete legacy message reassembled from one or more frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Sequence number of the final frame.
    pub sequence: u8,
    /// Number of frames the message spanned.
    pub frames: usize,
    /// The complete payload.
    pub payload: Bytes,
}

impl Message {
    /// Payload length.
    #[must_use]
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

/// Reassembles legacy frames into complete messages.
#[derive(Debug)]
pub struct MessageAssembler {
    /// Accumulated fragment payloads.
    buffer: BytesMut,
    /// Fragments accumulated for the current message.
    frame_count: usize,
    /// Ceiling on a reassembled message.
    max_message_size: usize,
}

impl MessageAssembler {
    /// Create an assembler with the default message ceiling.
    #[must_use]
    pub fn new() -> Self {
        Self::with_max_message_size(DEFAULT_MAX_MESSAGE_SIZE)
    }

    /// Create an assembler with a custom message ceiling.
    #[must_use]
    pub fn with_max_message_size(max_message_size: usize) -> Self {
        Self {
            buffer: BytesMut::new(),
            frame_count: 0,
            max_message_size,
        }
    }

    /// Push a frame into the assembler.
    ///
    /// Returns `Some(Message)` if this frame completes a message, `None` if
    /// a continuation fragment is still expected.
    pub fn push(&mut self, frame: LegacyFrame) -> Result<Option<Message>, CodecError> {
        let continuation = frame.has_continuation();
        let size = self.buffer.len() + frame.payload.len();
        if size > self.max_message_size {
            self.clear();
            return Err(CodecError::MessageTooLarge {
                size,
                max: self.max_message_size,
            });
        }

        // Single-frame messages keep the frame buffer as is.
        if self.frame_count == 0 && !continuation {
            return Ok(Some(Message {
                sequence: frame.sequence,
                frames: 1,
                payload: frame.payload,
            }));
        }

        self.buffer.extend_from_slice(&frame.payload);
        self.frame_count += 1;

        tracing::trace!(
            sequence = frame.sequence,
            frame_count = self.frame_count,
            buffer_len = self.buffer.len(),
            continuation = continuation,
            "assembling message"
        );

        if continuation {
            return Ok(None);
        }

        let message = Message {
            sequence: frame.sequence,
            frames: self.frame_count,
            payload: self.buffer.split().freeze(),
        };
        self.frame_count = 0;
        Ok(Some(message))
    }

    /// Whether a partial message is buffered.
    #[must_use]
    pub fn has_partial(&self) -> bool {
        self.frame_count > 0
    }

    /// Bytes buffered for the current partial message.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial message.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.frame_count = 0;
    }
}

impl Default for MessageAssembler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use mysql_protocol::packet::MAX_LEGACY_PAYLOAD;

    fn frame(sequence: u8, payload: Vec<u8>) -> LegacyFrame {
        LegacyFrame {
            sequence,
            payload: Bytes::from(payload),
        }
    }

    #[test]
    fn test_single_frame_message() {
        let mut assembler = MessageAssembler::new();
        let message = assembler.push(frame(3, b"ok".to_vec())).unwrap().unwrap();
        assert_eq!(message.sequence, 3);
        assert_eq!(message.frames, 1);
        assert_eq!(&message.payload[..], b"ok");
        assert!(!assembler.has_partial());
    }

    #[test]
    fn test_fragmented_message() {
        let mut assembler = MessageAssembler::with_max_message_size(usize::MAX);
        assert!(
            assembler
                .push(frame(0, vec![1u8; MAX_LEGACY_PAYLOAD]))
                .unwrap()
                .is_none()
        );
        assert!(assembler.has_partial());

        let message = assembler.push(frame(1, vec![2u8; 10])).unwrap().unwrap();
        assert_eq!(message.frames, 2);
        assert_eq!(message.len(), MAX_LEGACY_PAYLOAD + 10);
        assert_eq!(message.payload[MAX_LEGACY_PAYLOAD], 2);
        assert!(!assembler.has_partial());
    }

    #[test]
    fn test_exact_multiple_terminated_by_empty_frame() {
        let mut assembler = MessageAssembler::with_max_message_size(usize::MAX);
        assert!(
            assembler
                .push(frame(0, vec![9u8; MAX_LEGACY_PAYLOAD]))
                .unwrap()
                .is_none()
        );
        let message = assembler.push(frame(1, Vec::new())).unwrap().unwrap();
        assert_eq!(message.len(), MAX_LEGACY_PAYLOAD);
        assert_eq!(message.sequence, 1);
    }

    #[test]
    fn test_message_ceiling() {
        let mut assembler = MessageAssembler::with_max_message_size(MAX_LEGACY_PAYLOAD + 4);
        assembler
            .push(frame(0, vec![0u8; MAX_LEGACY_PAYLOAD]))
            .unwrap();
        assert!(matches!(
            assembler.push(frame(1, vec![0u8; 8])),
            Err(CodecError::MessageTooLarge { .. })
        ));
        assert!(!assembler.has_partial());
    }
}
