//! Codec utilities for length-encoded and NUL-terminated wire fields.
//!
//! MySQL packs integers and strings in a variable-width format:
//!
//! | First byte | Meaning |
//! |------------|---------|
//! | `0x00..=0xFA` | value is the byte itself |
//! | `0xFB` | NULL (only inside rows) |
//! | `0xFC` | 2-byte LE value follows |
//! | `0xFD` | 3-byte LE value follows |
//! | `0xFE` | 8-byte LE value follows |

use bytes::{Buf, BufMut, Bytes};

use crate::error::ProtocolError;

/// Marker byte for a NULL column in a text row.
pub const NULL_MARKER: u8 = 0xFB;

fn need(src: &impl Buf, n: usize) -> Result<(), ProtocolError> {
    if src.remaining() < n {
        Err(ProtocolError::incomplete(n, src.remaining()))
    } else {
        Ok(())
    }
}

/// Read a length-encoded integer.
///
/// Returns `Ok(None)` for the NULL marker.
pub fn read_lenenc_int(src: &mut impl Buf) -> Result<Option<u64>, ProtocolError> {
    need(src, 1)?;
    let first = src.get_u8();
    let value = match first {
        0x00..=0xFA => u64::from(first),
        NULL_MARKER => return Ok(None),
        0xFC => {
            need(src, 2)?;
            u64::from(src.get_u16_le())
        }
        0xFD => {
            need(src, 3)?;
            src.get_uint_le(3)
        }
        0xFE => {
            need(src, 8)?;
            src.get_u64_le()
        }
        0xFF => {
            return Err(ProtocolError::malformed(
                "length-encoded integer",
                "0xFF is not a valid prefix",
            ));
        }
    };
    Ok(Some(value))
}

/// Read a length-encoded byte string, sharing the underlying buffer.
///
/// Returns `Ok(None)` for the NULL marker.
pub fn read_lenenc_bytes(src: &mut Bytes) -> Result<Option<Bytes>, ProtocolError> {
    let Some(len) = read_lenenc_int(src)? else {
        return Ok(None);
    };
    let len = usize::try_from(len)
        .map_err(|_| ProtocolError::malformed("length-encoded string", "length overflow"))?;
    need(src, len)?;
    Ok(Some(src.split_to(len)))
}

/// Read a length-encoded UTF-8 string. NULL decodes as an empty string.
pub fn read_lenenc_string(
    src: &mut Bytes,
    what: &'static str,
) -> Result<String, ProtocolError> {
    match read_lenenc_bytes(src)? {
        Some(bytes) => String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(what)),
        None => Ok(String::new()),
    }
}

/// Read a NUL-terminated byte string (terminator consumed, not returned).
pub fn read_null_terminated(src: &mut Bytes) -> Result<Bytes, ProtocolError> {
    let end = src
        .iter()
        .position(|&b| b == 0)
        .ok_or_else(|| ProtocolError::malformed("NUL-terminated string", "missing terminator"))?;
    let value = src.split_to(end);
    src.advance(1);
    Ok(value)
}

/// Read a NUL-terminated UTF-8 string.
pub fn read_null_terminated_string(
    src: &mut Bytes,
    what: &'static str,
) -> Result<String, ProtocolError> {
    let bytes = read_null_terminated(src)?;
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(what))
}

/// Write a length-encoded integer.
pub fn write_lenenc_int(dst: &mut impl BufMut, value: u64) {
    match value {
        0..=0xFA => dst.put_u8(value as u8),
        0xFB..=0xFFFF => {
            dst.put_u8(0xFC);
            dst.put_u16_le(value as u16);
        }
        0x1_0000..=0xFF_FFFF => {
            dst.put_u8(0xFD);
            dst.put_uint_le(value, 3);
        }
        _ => {
            dst.put_u8(0xFE);
            dst.put_u64_le(value);
        }
    }
}

/// Write a length-encoded byte string.
pub fn write_lenenc_bytes(dst: &mut impl BufMut, value: &[u8]) {
    write_lenenc_int(dst, value.len() as u64);
    dst.put_slice(value);
}

/// Write a NUL-terminated byte string.
pub fn write_null_terminated(dst: &mut impl BufMut, value: &[u8]) {
    dst.put_slice(value);
    dst.put_u8(0);
}
