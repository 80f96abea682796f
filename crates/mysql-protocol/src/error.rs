//! Protocol-level error types.

use thiserror::Error;

/// Errors raised while parsing or building protocol structures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ProtocolError {
    /// Not enough bytes to parse the structure.
    #[error("incomplete packet: expected {expected} bytes, got {actual}")]
    IncompletePacket {
        /// Bytes required.
        expected: usize,
        /// Bytes available.
        actual: usize,
    },

    /// Packet content violates the expected layout.
    #[error("malformed {what}: {reason}")]
    Malformed {
        /// Structure being parsed.
        what: &'static str,
        /// Description of the violation.
        reason: String,
    },

    /// Server speaks a handshake protocol version other than 10.
    #[error("unsupported handshake protocol version {0}")]
    UnsupportedProtocolVersion(u8),

    /// Unknown column type code in a column definition.
    #[error("unknown column type 0x{0:02x}")]
    UnknownColumnType(u8),

    /// A tagged message was read as the wrong kind.
    #[error("unexpected message: expected {expected} (tag {expected_tag}), got tag {actual_tag}")]
    UnexpectedMessage {
        /// Name of the requested message type.
        expected: &'static str,
        /// Tag of the requested message type.
        expected_tag: u8,
        /// Tag actually present on the wire.
        actual_tag: u8,
    },

    /// A charset resolved to a collation index that does not fit in the
    /// single handshake byte.
    #[error("collation index {index} for charset '{charset}' does not fit in one byte")]
    CollationOutOfRange {
        /// Requested charset name.
        charset: String,
        /// Collation index found in the map.
        index: u16,
    },

    /// Text has characters the connection charset cannot represent.
    #[error("{what} contains characters not representable in {charset}")]
    Unmappable {
        /// Field being encoded.
        what: &'static str,
        /// Target charset.
        charset: &'static str,
    },

    /// String field is not valid UTF-8.
    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
}

impl ProtocolError {
    pub(crate) fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            what,
            reason: reason.into(),
        }
    }

    pub(crate) fn incomplete(expected: usize, actual: usize) -> Self {
        Self::IncompletePacket { expected, actual }
    }
}
