//! Codec error types.

use thiserror::Error;

/// Errors raised by the framing layer. All of them leave the connection
/// unusable.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CodecError {
    /// Protocol structure error.
    #[error("protocol error: {0}")]
    Protocol(#[from] mysql_protocol::ProtocolError),

    /// Transport I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A frame's length prefix exceeds the configured ceiling.
    #[error("frame of {size} bytes exceeds ceiling of {max} bytes")]
    FrameTooLarge {
        /// Declared size.
        size: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// A reassembled message exceeds the configured ceiling.
    #[error("message of {size} bytes exceeds ceiling of {max} bytes")]
    MessageTooLarge {
        /// Size reached so far.
        size: usize,
        /// Configured ceiling.
        max: usize,
    },

    /// Legacy sequence numbers fell out of lockstep.
    #[error("sequence mismatch: expected {expected}, got {actual}")]
    SequenceMismatch {
        /// Sequence this side expected.
        expected: u8,
        /// Sequence found on the wire.
        actual: u8,
    },

    /// The stream ended inside a frame.
    #[error("stream closed mid-frame: expected {expected} bytes, got {actual}")]
    Truncated {
        /// Bytes the frame declared.
        expected: usize,
        /// Bytes received before the stream closed.
        actual: usize,
    },

    /// The stream ended between frames.
    #[error("connection closed")]
    ConnectionClosed,
}

impl CodecError {
    /// Whether the error came from the transport rather than the bytes on it.
    #[must_use]
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            Self::Io(_) | Self::Truncated { .. } | Self::ConnectionClosed
        )
    }
}
