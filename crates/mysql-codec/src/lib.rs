//! # mysql-codec
//!
//! Async framing layer for MySQL frames.
//!
//! This crate turns raw byte streams into frames for both wire dialects,
//! reassembling legacy messages split across maximum-size fragments and
//! keeping the legacy sequence counter in lockstep with the server.
//!
//! ## Architecture
//!
//! ```text
//! TCP Stream → LegacyCodec (frame + sequence) → MessageAssembler → Session
//! TCP Stream → TaggedCodec (length + tag)     → XMessage decode
//! ```
//!
//! Both connection types implement [`FrameTransport`], the single framing
//! interface the session talks to.
//!
//! ```rust,ignore
//! use mysql_codec::{FrameTransport, LegacyConnection};
//!
//! let mut conn = LegacyConnection::new(tcp_stream);
//! let handshake = conn.read_frame().await?;
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod connection;
pub mod error;
pub mod legacy_codec;
pub mod message;
pub mod tagged_codec;
pub mod transport;

pub use connection::{LegacyConnection, TaggedConnection};
pub use error::CodecError;
pub use legacy_codec::{LegacyCodec, LegacyFrame};
pub use message::{Message, MessageAssembler};
pub use tagged_codec::{TaggedCodec, TaggedFrame};
pub use transport::{Dialect, Direction, Frame, FrameActivity, FrameInfo, FrameTransport};
