//! Tagged-dialect messages.
//!
//! Each tagged frame carries a one-byte type tag followed by a body encoded
//! as protobuf fields (varint keys, varint scalars, length-delimited
//! strings). Tag values overlap between directions, so a tag only has
//! meaning together with the direction it travels in.
//!
//! ```text
//! server -> client   OK(0) ERROR(1) AUTHENTICATE_CONTINUE(3) AUTHENTICATE_OK(4)
//! client -> server   AUTHENTICATE_START(4) AUTHENTICATE_CONTINUE(5)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::ProtocolError;

/// One-byte message type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageTag(pub u8);

impl MessageTag {
    /// Server: command succeeded.
    pub const OK: Self = Self(0);
    /// Server: command failed.
    pub const ERROR: Self = Self(1);
    /// Server: authentication challenge.
    pub const SERVER_AUTHENTICATE_CONTINUE: Self = Self(3);
    /// Server: authentication succeeded.
    pub const AUTHENTICATE_OK: Self = Self(4);
    /// Client: begin authentication.
    pub const AUTHENTICATE_START: Self = Self(4);
    /// Client: answer an authentication challenge.
    pub const CLIENT_AUTHENTICATE_CONTINUE: Self = Self(5);
}

/// A typed tagged-dialect message.
pub trait XMessage: Sized {
    /// Tag that identifies this message on the wire.
    const TAG: MessageTag;
    /// Message name for diagnostics.
    const NAME: &'static str;

    /// Append the encoded body to `dst`.
    fn encode_body(&self, dst: &mut BytesMut);

    /// Decode a body whose tag has already been checked.
    fn decode_body(body: Bytes) -> Result<Self, ProtocolError>;

    /// Decode a tagged body, checking the tag first.
    fn decode_tagged(tag: u8, body: Bytes) -> Result<Self, ProtocolError> {
        if tag != Self::TAG.0 {
            return Err(ProtocolError::UnexpectedMessage {
                expected: Self::NAME,
                expected_tag: Self::TAG.0,
                actual_tag: tag,
            });
        }
        Self::decode_body(body)
    }

    /// Encode the body to a new buffer.
    fn to_body(&self) -> Bytes {
        let mut buf = BytesMut::new();
        self.encode_body(&mut buf);
        buf.freeze()
    }
}

const WIRE_VARINT: u8 = 0;
const WIRE_FIXED64: u8 = 1;
const WIRE_LEN: u8 = 2;
const WIRE_FIXED32: u8 = 5;

/// Write a base-128 varint.
pub fn write_varint(dst: &mut impl BufMut, mut value: u64) {
    while value >= 0x80 {
        dst.put_u8((value as u8 & 0x7F) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Read a base-128 varint.
pub fn read_varint(src: &mut impl Buf) -> Result<u64, ProtocolError> {
    let mut value = 0u64;
    for shift in (0..64).step_by(7) {
        if !src.has_remaining() {
            return Err(ProtocolError::malformed("varint", "truncated"));
        }
        let byte = src.get_u8();
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
    }
    Err(ProtocolError::malformed("varint", "longer than 10 bytes"))
}

fn put_key(dst: &mut BytesMut, field: u32, wire: u8) {
    write_varint(dst, (u64::from(field) << 3) | u64::from(wire));
}

fn put_uint(dst: &mut BytesMut, field: u32, value: u64) {
    put_key(dst, field, WIRE_VARINT);
    write_varint(dst, value);
}

fn put_bytes(dst: &mut BytesMut, field: u32, value: &[u8]) {
    put_key(dst, field, WIRE_LEN);
    write_varint(dst, value.len() as u64);
    dst.put_slice(value);
}

/// A decoded field value.
enum FieldValue {
    Varint(u64),
    Bytes(Bytes),
    Skipped,
}

/// Walk the fields of a message body in order.
fn for_each_field(
    mut body: Bytes,
    what: &'static str,
    mut visit: impl FnMut(u32, FieldValue) -> Result<(), ProtocolError>,
) -> Result<(), ProtocolError> {
    while body.has_remaining() {
        let key = read_varint(&mut body)?;
        let field = (key >> 3) as u32;
        let value = match (key & 0x07) as u8 {
            WIRE_VARINT => FieldValue::Varint(read_varint(&mut body)?),
            WIRE_LEN => {
                let len = read_varint(&mut body)? as usize;
                if body.remaining() < len {
                    return Err(ProtocolError::incomplete(len, body.remaining()));
                }
                FieldValue::Bytes(body.split_to(len))
            }
            WIRE_FIXED64 | WIRE_FIXED32 => {
                let width = if key & 0x07 == u64::from(WIRE_FIXED64) { 8 } else { 4 };
                if body.remaining() < width {
                    return Err(ProtocolError::incomplete(width, body.remaining()));
                }
                body.advance(width);
                FieldValue::Skipped
            }
            other => {
                return Err(ProtocolError::malformed(
                    what,
                    format!("unsupported wire type {other}"),
                ));
            }
        };
        visit(field, value)?;
    }
    Ok(())
}

fn utf8(bytes: Bytes, what: &'static str) -> Result<String, ProtocolError> {
    String::from_utf8(bytes.to_vec()).map_err(|_| ProtocolError::InvalidUtf8(what))
}

/// Generic success.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OkMessage {
    /// Optional message.
    pub msg: Option<String>,
}

impl XMessage for OkMessage {
    const TAG: MessageTag = MessageTag::OK;
    const NAME: &'static str = "Ok";

    fn encode_body(&self, dst: &mut BytesMut) {
        if let Some(msg) = &self.msg {
            put_bytes(dst, 1, msg.as_bytes());
        }
    }

    fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
        let mut msg = None;
        for_each_field(body, Self::NAME, |field, value| {
            if let (1, FieldValue::Bytes(bytes)) = (field, value) {
                msg = Some(utf8(bytes, "Ok.msg")?);
            }
            Ok(())
        })?;
        Ok(Self { msg })
    }
}

/// Error severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Severity {
    /// The session remains usable.
    #[default]
    Error,
    /// The session is closed.
    Fatal,
}

/// Server error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorMessage {
    /// Severity.
    pub severity: Severity,
    /// Server error code.
    pub code: u32,
    /// SQL state.
    pub sql_state: String,
    /// Error message.
    pub msg: String,
}

impl XMessage for ErrorMessage {
    const TAG: MessageTag = MessageTag::ERROR;
    const NAME: &'static str = "Error";

    fn encode_body(&self, dst: &mut BytesMut) {
        if self.severity == Severity::Fatal {
            put_uint(dst, 1, 1);
        }
        put_uint(dst, 2, u64::from(self.code));
        put_bytes(dst, 3, self.msg.as_bytes());
        put_bytes(dst, 4, self.sql_state.as_bytes());
    }

    fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
        let mut severity = Severity::Error;
        let mut code = None;
        let mut sql_state = String::new();
        let mut msg = String::new();
        for_each_field(body, Self::NAME, |field, value| {
            match (field, value) {
                (1, FieldValue::Varint(v)) => {
                    severity = if v == 1 { Severity::Fatal } else { Severity::Error };
                }
                (2, FieldValue::Varint(v)) => {
                    code = Some(u32::try_from(v).map_err(|_| {
                        ProtocolError::malformed("Error", "code does not fit in u32")
                    })?);
                }
                (3, FieldValue::Bytes(bytes)) => msg = utf8(bytes, "Error.msg")?,
                (4, FieldValue::Bytes(bytes)) => sql_state = utf8(bytes, "Error.sql_state")?,
                _ => {}
            }
            Ok(())
        })?;
        let code = code.ok_or_else(|| ProtocolError::malformed("Error", "missing code"))?;
        Ok(Self {
            severity,
            code,
            sql_state,
            msg,
        })
    }
}

/// Client request to begin authentication with a mechanism.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateStart {
    /// Mechanism name (`MYSQL41`, `PLAIN`, ...).
    pub mech_name: String,
    /// Mechanism-specific data.
    pub auth_data: Option<Bytes>,
    /// Initial response, if the mechanism allows one.
    pub initial_response: Option<Bytes>,
}

impl XMessage for AuthenticateStart {
    const TAG: MessageTag = MessageTag::AUTHENTICATE_START;
    const NAME: &'static str = "AuthenticateStart";

    fn encode_body(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, self.mech_name.as_bytes());
        if let Some(data) = &self.auth_data {
            put_bytes(dst, 2, data);
        }
        if let Some(data) = &self.initial_response {
            put_bytes(dst, 3, data);
        }
    }

    fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
        let mut mech_name = None;
        let mut auth_data = None;
        let mut initial_response = None;
        for_each_field(body, Self::NAME, |field, value| {
            match (field, value) {
                (1, FieldValue::Bytes(bytes)) => {
                    mech_name = Some(utf8(bytes, "AuthenticateStart.mech_name")?);
                }
                (2, FieldValue::Bytes(bytes)) => auth_data = Some(bytes),
                (3, FieldValue::Bytes(bytes)) => initial_response = Some(bytes),
                _ => {}
            }
            Ok(())
        })?;
        Ok(Self {
            mech_name: mech_name
                .ok_or_else(|| ProtocolError::malformed(Self::NAME, "missing mech_name"))?,
            auth_data,
            initial_response,
        })
    }
}

/// Server authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateContinue {
    /// Challenge data (a seed for `MYSQL41`).
    pub auth_data: Bytes,
}

impl XMessage for AuthenticateContinue {
    const TAG: MessageTag = MessageTag::SERVER_AUTHENTICATE_CONTINUE;
    const NAME: &'static str = "AuthenticateContinue";

    fn encode_body(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, &self.auth_data);
    }

    fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
        let mut auth_data = None;
        for_each_field(body, Self::NAME, |field, value| {
            if let (1, FieldValue::Bytes(bytes)) = (field, value) {
                auth_data = Some(bytes);
            }
            Ok(())
        })?;
        Ok(Self {
            auth_data: auth_data
                .ok_or_else(|| ProtocolError::malformed(Self::NAME, "missing auth_data"))?,
        })
    }
}

/// Client answer to an authentication challenge.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticateResponse {
    /// Response data.
    pub auth_data: Bytes,
}

impl XMessage for AuthenticateResponse {
    const TAG: MessageTag = MessageTag::CLIENT_AUTHENTICATE_CONTINUE;
    const NAME: &'static str = "AuthenticateResponse";

    fn encode_body(&self, dst: &mut BytesMut) {
        put_bytes(dst, 1, &self.auth_data);
    }

    fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
        AuthenticateContinue::decode_body(body).map(|m| Self {
            auth_data: m.auth_data,
        })
    }
}

/// Server confirmation that authentication succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthenticateOk {
    /// Optional final data.
    pub auth_data: Option<Bytes>,
}

impl XMessage for AuthenticateOk {
    const TAG: MessageTag = MessageTag::AUTHENTICATE_OK;
    const NAME: &'static str = "AuthenticateOk";

    fn encode_body(&self, dst: &mut BytesMut) {
        if let Some(data) = &self.auth_data {
            put_bytes(dst, 1, data);
        }
    }

    fn decode_body(body: Bytes) -> Result<Self, ProtocolError> {
        let mut auth_data = None;
        for_each_field(body, Self::NAME, |field, value| {
            if let (1, FieldValue::Bytes(bytes)) = (field, value) {
                auth_data = Some(bytes);
            }
            Ok(())
        })?;
        Ok(Self { auth_data })
    }
}
