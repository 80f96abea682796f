//! # mysql-protocol
//!
//! Pure implementation of the MySQL client/server protocol structures.
//!
//! This crate holds packet headers for both framing dialects, the
//! length-encoded primitives, handshake and command payloads, server
//! responses and column/row layouts. It contains no networking logic and
//! makes no assumptions about the async runtime; `mysql-codec` builds the
//! framing layer on top of it.
//!
//! ## Framing dialects
//!
//! ```text
//! legacy: [3-byte LE length][1-byte sequence][payload]
//! tagged: [4-byte LE length][1-byte type tag][structured body]
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use mysql_protocol::{LegacyHeader, TextEncoding, command};
//!
//! let payload = command::encode_query("SELECT 1", TextEncoding::Utf8)?;
//! let header = LegacyHeader::new(payload.len() as u32, 0);
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod capabilities;
pub mod codec;
pub mod collation;
pub mod column;
pub mod command;
pub mod error;
pub mod handshake;
pub mod message;
pub mod packet;
pub mod response;
pub mod row;

pub use capabilities::{Capabilities, StatusFlags};
pub use collation::{BINARY_COLLATION_INDEX, CharsetMap, DEFAULT_COLLATION_INDEX, TextEncoding};
pub use column::{ColumnDefinition, ColumnFlags, ColumnType};
pub use command::Command;
pub use error::ProtocolError;
pub use handshake::{AuthSwitchRequest, ChangeUser, HandshakeResponse, InitialHandshake};
pub use message::{
    AuthenticateContinue, AuthenticateOk, AuthenticateResponse, AuthenticateStart, ErrorMessage,
    MessageTag, OkMessage, Severity, XMessage,
};
pub use packet::{
    DEFAULT_MAX_MESSAGE_SIZE, LEGACY_HEADER_SIZE, LegacyHeader, MAX_LEGACY_PAYLOAD,
    TAGGED_PREFIX_SIZE, TaggedHeader,
};
pub use response::{EofPacket, ErrPacket, OkPacket, Response};
pub use row::{RawRow, Slot};
