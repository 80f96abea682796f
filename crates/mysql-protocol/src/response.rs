//! Generic server responses: OK, ERR and EOF packets.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::capabilities::StatusFlags;
use crate::codec::{read_lenenc_int, write_lenenc_int};
use crate::error::ProtocolError;

/// Header byte of an OK packet.
pub const OK_HEADER: u8 = 0x00;

/// Header byte of an ERR packet.
pub const ERR_HEADER: u8 = 0xFF;

/// Header byte of an EOF packet.
pub const EOF_HEADER: u8 = 0xFE;

/// EOF packets are shorter than this; a longer `0xFE` payload is a row.
const EOF_MAX_LEN: usize = 9;

/// Server reply to a command that produced no result set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkPacket {
    /// Rows changed, deleted or inserted.
    pub affected_rows: u64,
    /// Last `AUTO_INCREMENT` value generated.
    pub last_insert_id: u64,
    /// Server status after the command.
    pub status: StatusFlags,
    /// Warning count.
    pub warnings: u16,
    /// Human-readable info string.
    pub info: String,
}

impl OkPacket {
    /// Parse an OK packet, including its header byte.
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        if !src.has_remaining() {
            return Err(ProtocolError::incomplete(1, 0));
        }
        let header = src.get_u8();
        if header != OK_HEADER && header != EOF_HEADER {
            return Err(ProtocolError::malformed(
                "OK packet",
                format!("unexpected header 0x{header:02x}"),
            ));
        }
        let affected_rows = read_lenenc_int(&mut src)?.unwrap_or(0);
        let last_insert_id = read_lenenc_int(&mut src)?.unwrap_or(0);
        if src.remaining() < 4 {
            return Err(ProtocolError::incomplete(4, src.remaining()));
        }
        let status = StatusFlags::from_bits_truncate(src.get_u16_le());
        let warnings = src.get_u16_le();
        let info = String::from_utf8_lossy(&src).into_owned();
        Ok(Self {
            affected_rows,
            last_insert_id,
            status,
            warnings,
            info,
        })
    }

    /// Encode the packet (server side, used by test servers).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(16 + self.info.len());
        buf.put_u8(OK_HEADER);
        write_lenenc_int(&mut buf, self.affected_rows);
        write_lenenc_int(&mut buf, self.last_insert_id);
        buf.put_u16_le(self.status.bits());
        buf.put_u16_le(self.warnings);
        buf.put_slice(self.info.as_bytes());
        buf.freeze()
    }
}

/// Server error reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrPacket {
    /// Server error code.
    pub code: u16,
    /// Five-character SQL state (`HY000` when the server sends none).
    pub sql_state: String,
    /// Error message, verbatim.
    pub message: String,
}

impl ErrPacket {
    /// Create an error packet.
    #[must_use]
    pub fn new(code: u16, sql_state: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            sql_state: sql_state.into(),
            message: message.into(),
        }
    }

    /// Parse an ERR packet, including its header byte.
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        if src.remaining() < 3 {
            return Err(ProtocolError::incomplete(3, src.remaining()));
        }
        let header = src.get_u8();
        if header != ERR_HEADER {
            return Err(ProtocolError::malformed(
                "ERR packet",
                format!("unexpected header 0x{header:02x}"),
            ));
        }
        let code = src.get_u16_le();
        let sql_state = if src.first() == Some(&b'#') && src.remaining() >= 6 {
            src.advance(1);
            let state = src.split_to(5);
            String::from_utf8_lossy(&state).into_owned()
        } else {
            "HY000".to_string()
        };
        let message = String::from_utf8_lossy(&src).into_owned();
        Ok(Self {
            code,
            sql_state,
            message,
        })
    }

    /// Encode the packet (server side, used by test servers).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(9 + self.message.len());
        buf.put_u8(ERR_HEADER);
        buf.put_u16_le(self.code);
        buf.put_u8(b'#');
        let mut state = [b'0'; 5];
        for (dst, src) in state.iter_mut().zip(self.sql_state.bytes()) {
            *dst = src;
        }
        buf.put_slice(&state);
        buf.put_slice(self.message.as_bytes());
        buf.freeze()
    }

    /// Whether the SQL state is connection-class (`08xxx`).
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        self.sql_state.starts_with("08")
    }
}

/// End of a column-definition or row sequence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EofPacket {
    /// Warning count.
    pub warnings: u16,
    /// Server status.
    pub status: StatusFlags,
}

impl EofPacket {
    /// Whether `payload` is an EOF packet (header `0xFE`, shorter than 9 bytes).
    #[must_use]
    pub fn matches(payload: &[u8]) -> bool {
        payload.first() == Some(&EOF_HEADER) && payload.len() < EOF_MAX_LEN
    }

    /// Parse an EOF packet, including its header byte.
    pub fn decode(mut src: Bytes) -> Result<Self, ProtocolError> {
        if !Self::matches(&src) {
            return Err(ProtocolError::malformed("EOF packet", "not an EOF packet"));
        }
        src.advance(1);
        // Pre-4.1 EOF packets carry no body.
        if src.remaining() < 4 {
            return Ok(Self::default());
        }
        let warnings = src.get_u16_le();
        let status = StatusFlags::from_bits_truncate(src.get_u16_le());
        Ok(Self { warnings, status })
    }

    /// Encode the packet (server side, used by test servers).
    #[must_use]
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(5);
        buf.put_u8(EOF_HEADER);
        buf.put_u16_le(self.warnings);
        buf.put_u16_le(self.status.bits());
        buf.freeze()
    }
}

/// First reply to a command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Command completed without a result set.
    Ok(OkPacket),
    /// Command failed.
    Err(ErrPacket),
    /// A result set with this many columns follows.
    ResultSet {
        /// Number of column definitions that follow.
        column_count: u64,
    },
}

impl Response {
    /// Classify the first payload received after a command.
    pub fn decode(payload: Bytes) -> Result<Self, ProtocolError> {
        match payload.first() {
            None => Err(ProtocolError::incomplete(1, 0)),
            Some(&OK_HEADER) => OkPacket::decode(payload).map(Self::Ok),
            Some(&ERR_HEADER) => ErrPacket::decode(payload).map(Self::Err),
            Some(&0xFB) => Err(ProtocolError::malformed(
                "command response",
                "LOCAL INFILE requests are not supported",
            )),
            Some(_) => {
                let mut src = payload;
                let column_count = read_lenenc_int(&mut src)?.ok_or_else(|| {
                    ProtocolError::malformed("result set header", "NULL column count")
                })?;
                Ok(Self::ResultSet { column_count })
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_roundtrip() {
        let ok = OkPacket {
            affected_rows: 3,
            last_insert_id: 1001,
            status: StatusFlags::AUTOCOMMIT,
            warnings: 1,
            info: "Rows matched: 3".into(),
        };
        assert_eq!(OkPacket::decode(ok.encode()).unwrap(), ok);
    }

    #[test]
    fn test_err_packet_decodes_state() {
        let err = ErrPacket::new(1045, "28000", "Access denied for user 'app'");
        let decoded = ErrPacket::decode(err.encode()).unwrap();
        assert_eq!(decoded, err);
        assert!(!decoded.is_connection_error());
        assert!(ErrPacket::new(2013, "08S01", "lost").is_connection_error());
    }

    #[test]
    fn test_err_packet_without_state_marker() {
        let decoded = ErrPacket::decode(Bytes::from_static(b"\xff\x15\x04Bad handshake")).unwrap();
        assert_eq!(decoded.code, 1045);
        assert_eq!(decoded.sql_state, "HY000");
        assert_eq!(decoded.message, "Bad handshake");
    }

    #[test]
    fn test_eof_matches_only_short_payloads() {
        let eof = EofPacket {
            warnings: 0,
            status: StatusFlags::MORE_RESULTS_EXISTS,
        };
        let encoded = eof.encode();
        assert!(EofPacket::matches(&encoded));
        assert_eq!(EofPacket::decode(encoded).unwrap(), eof);
        assert!(!EofPacket::matches(&[0xFE; 12]));
    }

    #[test]
    fn test_response_classification() {
        let ok = OkPacket::default().encode();
        assert!(matches!(Response::decode(ok).unwrap(), Response::Ok(_)));
        assert_eq!(
            Response::decode(Bytes::from_static(&[0x03])).unwrap(),
            Response::ResultSet { column_count: 3 }
        );
        assert!(Response::decode(Bytes::from_static(&[0xFB, b'f'])).is_err());
    }
}
