//! Text-protocol row layout.
//!
//! A text row is one length-encoded string per column, with `0xFB` standing
//! in for NULL. Parsing only records where each value lives in the payload;
//! the bytes themselves stay in the shared buffer until a caller decodes
//! them.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::codec::{NULL_MARKER, read_lenenc_int, write_lenenc_bytes};
use crate::error::ProtocolError;

/// Location of one column value inside a row payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot {
    /// Offset of the value's first byte in the payload.
    pub offset: u32,
    /// Value length in bytes.
    pub length: u32,
    /// Whether the value is NULL.
    pub is_null: bool,
}

impl Slot {
    /// A slot pointing at `length` bytes starting at `offset`.
    #[must_use]
    pub const fn new(offset: u32, length: u32) -> Self {
        Self {
            offset,
            length,
            is_null: false,
        }
    }

    /// A NULL slot.
    #[must_use]
    pub const fn null() -> Self {
        Self {
            offset: 0,
            length: 0,
            is_null: true,
        }
    }
}

/// A parsed text row: the original payload plus one slot per column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawRow {
    /// Row payload as received.
    pub payload: Bytes,
    /// Value locations, one per column.
    pub slots: Vec<Slot>,
}

impl RawRow {
    /// Parse a text row with exactly `column_count` values.
    pub fn decode(payload: Bytes, column_count: usize) -> Result<Self, ProtocolError> {
        let total = payload.len();
        let mut cursor = payload.clone();
        let mut slots = Vec::with_capacity(column_count);

        for _ in 0..column_count {
            if cursor.first() == Some(&NULL_MARKER) {
                cursor.advance(1);
                slots.push(Slot::null());
                continue;
            }
            let len = read_lenenc_int(&mut cursor)?.unwrap_or(0);
            let len = usize::try_from(len)
                .map_err(|_| ProtocolError::malformed("text row", "value length overflow"))?;
            if cursor.remaining() < len {
                return Err(ProtocolError::incomplete(len, cursor.remaining()));
            }
            let offset = total - cursor.remaining();
            slots.push(Slot::new(offset as u32, len as u32));
            cursor.advance(len);
        }

        if cursor.has_remaining() {
            return Err(ProtocolError::malformed(
                "text row",
                format!(
                    "{} trailing bytes after {column_count} columns",
                    cursor.remaining()
                ),
            ));
        }

        Ok(Self { payload, slots })
    }

    /// Bytes of column `index`, or `None` for NULL or out-of-range.
    #[must_use]
    pub fn value(&self, index: usize) -> Option<&[u8]> {
        let slot = self.slots.get(index)?;
        if slot.is_null {
            return None;
        }
        let start = slot.offset as usize;
        self.payload.get(start..start + slot.length as usize)
    }

    /// Encode a text row (server side, used by test servers).
    #[must_use]
    pub fn encode<'a>(values: impl IntoIterator<Item = Option<&'a [u8]>>) -> Bytes {
        let mut buf = BytesMut::new();
        for value in values {
            match value {
                Some(bytes) => write_lenenc_bytes(&mut buf, bytes),
                None => buf.put_u8(NULL_MARKER),
            }
        }
        buf.freeze()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_with_null() {
        let payload = RawRow::encode([Some(&b"42"[..]), None, Some(&b""[..])]);
        let row = RawRow::decode(payload, 3).unwrap();
        assert_eq!(row.value(0), Some(&b"42"[..]));
        assert_eq!(row.value(1), None);
        assert!(row.slots[1].is_null);
        assert_eq!(row.value(2), Some(&b""[..]));
        assert_eq!(row.value(3), None);
    }

    #[test]
    fn test_decode_column_count_mismatch() {
        let payload = RawRow::encode([Some(&b"a"[..]), Some(&b"b"[..])]);
        assert!(RawRow::decode(payload.clone(), 1).is_err());
        assert!(RawRow::decode(payload, 3).is_err());
    }

    #[test]
    fn test_decode_truncated_value() {
        let payload = Bytes::from_static(&[0x05, b'a', b'b']);
        assert_eq!(
            RawRow::decode(payload, 1),
            Err(ProtocolError::IncompletePacket {
                expected: 5,
                actual: 2
            })
        );
    }
}
